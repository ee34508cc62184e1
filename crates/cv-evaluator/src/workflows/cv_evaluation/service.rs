use std::sync::Arc;

use tracing::{info, warn};

use super::domain::CandidateId;
use super::pipeline::PipelineRunner;
use super::repository::{CandidateSource, PersistedEvaluation, RepositoryError, ResultStore};

/// Service composing the candidate source, the evaluation pipeline, and the result store.
pub struct EvaluationService<S, R> {
    candidates: Arc<S>,
    results: Arc<R>,
    runner: Arc<PipelineRunner>,
}

impl<S, R> EvaluationService<S, R>
where
    S: CandidateSource + 'static,
    R: ResultStore + 'static,
{
    pub fn new(candidates: Arc<S>, results: Arc<R>, runner: PipelineRunner) -> Self {
        Self {
            candidates,
            results,
            runner: Arc::new(runner),
        }
    }

    /// Run the pipeline for a candidate and persist the outcome.
    ///
    /// The store write is blocking file IO and runs on the blocking pool.
    ///
    /// Stage failures are recorded as a `failed` evaluation and returned as `Ok`; only a
    /// missing candidate or a store failure is an error.
    pub async fn evaluate(
        &self,
        document_id: &CandidateId,
    ) -> Result<PersistedEvaluation, EvaluationServiceError> {
        let record = self
            .candidates
            .fetch(document_id)
            .map_err(EvaluationServiceError::Lookup)?
            .ok_or_else(|| EvaluationServiceError::NotFound(document_id.clone()))?;

        info!(document_id = %document_id, "starting cv evaluation");
        let outcome = self.runner.run(&record).await;
        if let Some(error) = &outcome.error {
            warn!(document_id = %document_id, %error, "cv evaluation failed");
        }

        let results = Arc::clone(&self.results);
        let source = document_id.clone();
        let persisted = tokio::task::spawn_blocking(move || results.save(&source, &outcome))
            .await
            .map_err(|err| {
                EvaluationServiceError::Persistence(RepositoryError::Unavailable(format!(
                    "save task aborted: {err}"
                )))
            })?
            .map_err(EvaluationServiceError::Persistence)?;

        info!(
            document_id = %document_id,
            evaluation_id = %persisted.id.0,
            status = persisted.status.label(),
            "evaluation saved"
        );
        Ok(persisted)
    }

    /// Fetch the stored evaluation for a candidate.
    pub fn get(
        &self,
        document_id: &CandidateId,
    ) -> Result<PersistedEvaluation, EvaluationServiceError> {
        self.results
            .fetch(document_id)
            .map_err(EvaluationServiceError::Lookup)?
            .ok_or_else(|| EvaluationServiceError::NotFound(document_id.clone()))
    }
}

/// Error raised by the evaluation service.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error("no document found with ID {0}")]
    NotFound(CandidateId),
    #[error("lookup failed: {0}")]
    Lookup(#[source] RepositoryError),
    #[error("failed to save evaluation: {0}")]
    Persistence(#[source] RepositoryError),
}
