use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::assembler::{assemble, AssembledText};
use super::capability::EvaluationCapability;
use super::domain::{CandidateRecord, RunStatus, TaskId};
use super::graph::{StageRole, TaskGraph, TaskNode};
use super::rubric::Rubric;
use super::stage::{ScoringStage, StageError, StageResult};
use super::synthesis::SynthesisStage;

/// Named stage outputs of one run plus its terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutcome {
    pub status: RunStatus,
    pub results: BTreeMap<TaskId, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineOutcome {
    pub fn completed(results: BTreeMap<TaskId, String>) -> Self {
        Self {
            status: RunStatus::Completed,
            results,
            error: None,
        }
    }

    pub fn failed(results: BTreeMap<TaskId, String>, error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Failed,
            results,
            error: Some(error.into()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }
}

/// Executes the evaluation graph: assembled text fans out to both scoring stages, which
/// fan in to the synthesis stage.
pub struct PipelineRunner {
    graph: TaskGraph,
    credentials: ScoringStage,
    importance: ScoringStage,
    synthesis: SynthesisStage,
}

impl PipelineRunner {
    pub fn new(
        credentials: ScoringStage,
        importance: ScoringStage,
        synthesis: SynthesisStage,
    ) -> Self {
        Self {
            graph: TaskGraph::niw(),
            credentials,
            importance,
            synthesis,
        }
    }

    /// Standard rubrics, all three stages backed by one capability.
    pub fn standard(capability: Arc<dyn EvaluationCapability>, as_of: &str) -> Self {
        Self::new(
            ScoringStage::new(Rubric::credentials(), capability.clone()),
            ScoringStage::new(Rubric::national_importance(), capability.clone())
                .with_variable("as_of", as_of),
            SynthesisStage::new(capability),
        )
    }

    #[instrument(skip_all, fields(candidate = %record.id))]
    pub async fn run(&self, record: &CandidateRecord) -> PipelineOutcome {
        let text = assemble(record);
        self.run_text(&text).await
    }

    /// Runs layer by layer. The first failing layer aborts the run: outputs of its
    /// successful siblings are kept, downstream tasks never start.
    pub async fn run_text(&self, text: &AssembledText) -> PipelineOutcome {
        let layers = match self.graph.layers() {
            Ok(layers) => layers,
            Err(err) => return PipelineOutcome::failed(BTreeMap::new(), err.to_string()),
        };

        let mut completed: BTreeMap<TaskId, StageResult> = BTreeMap::new();
        for layer in layers {
            let outputs = join_all(
                layer
                    .iter()
                    .map(|node| self.run_task(node, text, &completed)),
            )
            .await;

            let mut failures = Vec::new();
            for (node, output) in layer.iter().zip(outputs) {
                match output {
                    Ok(result) => {
                        info!(task = %node.id, stage = %result.stage_name, "task completed");
                        completed.insert(node.id.clone(), result);
                    }
                    Err(err) => {
                        warn!(task = %node.id, error = %err, "task failed");
                        failures.push(err.to_string());
                    }
                }
            }

            if !failures.is_empty() {
                return PipelineOutcome::failed(raw_outputs(completed), failures.join("; "));
            }
        }

        PipelineOutcome::completed(raw_outputs(completed))
    }

    async fn run_task(
        &self,
        node: &TaskNode,
        text: &AssembledText,
        completed: &BTreeMap<TaskId, StageResult>,
    ) -> Result<StageResult, StageError> {
        match node.role {
            StageRole::Credentials => self.credentials.evaluate(text).await,
            StageRole::NationalImportance => self.importance.evaluate(text).await,
            StageRole::Synthesis => {
                let credentials = self.input(node, StageRole::Credentials, completed)?;
                let importance = self.input(node, StageRole::NationalImportance, completed)?;
                self.synthesis.synthesize(credentials, importance).await
            }
        }
    }

    fn input<'a>(
        &self,
        node: &TaskNode,
        role: StageRole,
        completed: &'a BTreeMap<TaskId, StageResult>,
    ) -> Result<&'a StageResult, StageError> {
        node.depends_on
            .iter()
            .find(|dependency| {
                self.graph
                    .node(dependency)
                    .is_some_and(|upstream| upstream.role == role)
            })
            .and_then(|dependency| completed.get(dependency))
            .ok_or_else(|| StageError::MissingInput {
                stage: self.synthesis.name().to_string(),
                dependency: format!("{role:?}"),
            })
    }
}

fn raw_outputs(completed: BTreeMap<TaskId, StageResult>) -> BTreeMap<TaskId, String> {
    completed
        .into_iter()
        .map(|(id, result)| (id, result.raw_output))
        .collect()
}
