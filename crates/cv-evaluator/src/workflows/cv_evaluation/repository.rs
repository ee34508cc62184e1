use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{CandidateId, CandidateRecord, EvaluationId, RunStatus, TaskId};
use super::pipeline::PipelineOutcome;

/// Stored evaluation; at most one per source record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEvaluation {
    pub id: EvaluationId,
    pub source_record_id: CandidateId,
    pub status: RunStatus,
    pub results: BTreeMap<TaskId, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PersistedEvaluation {
    /// Fresh document for `source`, fully replacing any earlier outcome.
    pub fn from_outcome(id: EvaluationId, source: &CandidateId, outcome: &PipelineOutcome) -> Self {
        Self {
            id,
            source_record_id: source.clone(),
            status: outcome.status,
            results: outcome.results.clone(),
            error: outcome.error.clone(),
        }
    }

    pub fn outcome(&self) -> PipelineOutcome {
        PipelineOutcome {
            status: self.status,
            results: self.results.clone(),
            error: self.error.clone(),
        }
    }
}

/// Keyed lookup of upstream candidate documents.
pub trait CandidateSource: Send + Sync {
    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateRecord>, RepositoryError>;
}

/// Durable record of evaluation outcomes, upserted by source record id.
pub trait ResultStore: Send + Sync {
    /// Inserts or fully replaces the evaluation for `source`, keeping any
    /// store-assigned id, and returns the canonical stored form.
    fn save(
        &self,
        source: &CandidateId,
        outcome: &PipelineOutcome,
    ) -> Result<PersistedEvaluation, RepositoryError>;

    fn fetch(&self, source: &CandidateId) -> Result<Option<PersistedEvaluation>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("repository io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("repository serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
