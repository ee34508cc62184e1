//! CV evaluation pipeline for National Interest Waiver candidates.
//!
//! A candidate record is assembled into one CV text, scored independently on credentials
//! and national importance, and the two scores are synthesized into a weighted
//! recommendation that is upserted against the source record.

pub mod assembler;
pub mod capability;
pub mod domain;
pub mod graph;
pub mod pipeline;
pub mod repository;
pub mod router;
pub mod rubric;
pub mod service;
pub mod stage;
pub mod store;
pub mod synthesis;

#[cfg(test)]
mod tests;

pub use assembler::{assemble, AssembledText};
pub use capability::{
    AnthropicCapability, CapabilityError, EvaluationCapability, PromptTemplate, PromptVariables,
};
pub use domain::{
    CandidateId, CandidateRecord, CvInfo, Education, EvaluationId, Publication, RunStatus, TaskId,
    WorkExperience,
};
pub use graph::{GraphError, StageRole, TaskGraph, TaskNode};
pub use pipeline::{PipelineOutcome, PipelineRunner};
pub use repository::{CandidateSource, PersistedEvaluation, RepositoryError, ResultStore};
pub use router::evaluation_router;
pub use rubric::{Rubric, RubricTier};
pub use service::{EvaluationService, EvaluationServiceError};
pub use stage::{ScoringStage, StageError, StageResult};
pub use store::{JsonFileCandidateSource, JsonFileResultStore};
pub use synthesis::{weighted_score, Rating, SynthesisStage};
