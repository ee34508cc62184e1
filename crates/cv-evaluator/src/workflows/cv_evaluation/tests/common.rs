use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::workflows::cv_evaluation::capability::{
    CapabilityError, EvaluationCapability, PromptTemplate, PromptVariables,
};
use crate::workflows::cv_evaluation::domain::{
    CandidateId, CandidateRecord, CvInfo, Education, EvaluationId, Publication, WorkExperience,
};
use crate::workflows::cv_evaluation::pipeline::{PipelineOutcome, PipelineRunner};
use crate::workflows::cv_evaluation::repository::{
    CandidateSource, PersistedEvaluation, RepositoryError, ResultStore,
};
use crate::workflows::cv_evaluation::rubric::Rubric;
use crate::workflows::cv_evaluation::service::EvaluationService;
use crate::workflows::cv_evaluation::stage::ScoringStage;
use crate::workflows::cv_evaluation::synthesis::SynthesisStage;

pub(super) const CREDENTIALS_REPLY: &str =
    "Credentials Score: 8/10\nPhD from a reputable university with a solid publication record.";
pub(super) const IMPORTANCE_REPLY: &str =
    "National Importance Score: 9/10\nWork directly advances U.S. AI development.";
pub(super) const SYNTHESIS_REPLY: &str =
    "Strong academic credentials combine with work on a critical national priority.";

#[derive(Debug, Clone)]
pub(super) enum Script {
    Reply(String),
    Fail(String),
}

/// Deterministic capability answering per prompt name.
#[derive(Default)]
pub(super) struct ScriptedCapability {
    scripts: BTreeMap<String, Script>,
    delays: BTreeMap<String, Duration>,
    calls: Mutex<Vec<(String, PromptVariables)>>,
    finished: Mutex<Vec<String>>,
}

impl ScriptedCapability {
    pub(super) fn reply(mut self, prompt: &str, text: &str) -> Self {
        self.scripts
            .insert(prompt.to_string(), Script::Reply(text.to_string()));
        self
    }

    pub(super) fn fail(mut self, prompt: &str, message: &str) -> Self {
        self.scripts
            .insert(prompt.to_string(), Script::Fail(message.to_string()));
        self
    }

    /// Holds the answer to `prompt` back for `delay`.
    pub(super) fn delay(mut self, prompt: &str, delay: Duration) -> Self {
        self.delays.insert(prompt.to_string(), delay);
        self
    }

    /// Prompt names in the order their answers were returned.
    pub(super) fn finished(&self) -> Vec<String> {
        self.finished
            .lock()
            .expect("finished mutex poisoned")
            .clone()
    }

    pub(super) fn called(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub(super) fn variables_for(&self, prompt: &str) -> Option<PromptVariables> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .iter()
            .find(|(name, _)| name == prompt)
            .map(|(_, variables)| variables.clone())
    }
}

#[async_trait]
impl EvaluationCapability for ScriptedCapability {
    async fn respond(
        &self,
        template: &PromptTemplate,
        variables: &PromptVariables,
    ) -> Result<String, CapabilityError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push((template.name.clone(), variables.clone()));

        if let Some(delay) = self.delays.get(&template.name) {
            tokio::time::sleep(*delay).await;
        }
        self.finished
            .lock()
            .expect("finished mutex poisoned")
            .push(template.name.clone());

        match self.scripts.get(&template.name) {
            Some(Script::Reply(text)) => Ok(text.clone()),
            Some(Script::Fail(message)) => Err(CapabilityError::Unavailable(message.clone())),
            None => Err(CapabilityError::EmptyResponse),
        }
    }
}

pub(super) fn happy_capability() -> ScriptedCapability {
    ScriptedCapability::default()
        .reply("credentials", CREDENTIALS_REPLY)
        .reply("national_importance", IMPORTANCE_REPLY)
        .reply("synthesis", SYNTHESIS_REPLY)
}

pub(super) fn runner(capability: Arc<ScriptedCapability>) -> PipelineRunner {
    PipelineRunner::standard(capability, "July 2025")
}

/// Separate capabilities per stage, as in production deployments that pin a model per analyst.
pub(super) fn split_runner(
    credentials: Arc<ScriptedCapability>,
    importance: Arc<ScriptedCapability>,
    synthesis: Arc<ScriptedCapability>,
) -> PipelineRunner {
    PipelineRunner::new(
        ScoringStage::new(Rubric::credentials(), credentials),
        ScoringStage::new(Rubric::national_importance(), importance)
            .with_variable("as_of", "July 2025"),
        SynthesisStage::new(synthesis),
    )
}

pub(super) fn candidate_id(raw: &str) -> CandidateId {
    CandidateId(raw.to_string())
}

pub(super) fn bare_record(id: &str) -> CandidateRecord {
    CandidateRecord {
        id: candidate_id(id),
        name: None,
        cv_info: CvInfo::default(),
    }
}

pub(super) fn phd_record(id: &str) -> CandidateRecord {
    CandidateRecord {
        id: candidate_id(id),
        name: Some("Ada Rahman".to_string()),
        cv_info: CvInfo {
            summary: Some("Machine learning researcher focused on robust vision models.".to_string()),
            education: vec![Education {
                degree: Some("PhD".to_string()),
                institution: Some("X".to_string()),
                date_range: Some("2020".to_string()),
            }],
            ..CvInfo::default()
        },
    }
}

pub(super) fn full_record(id: &str) -> CandidateRecord {
    CandidateRecord {
        id: candidate_id(id),
        name: Some("Ada Rahman".to_string()),
        cv_info: CvInfo {
            summary: Some("Machine learning researcher.".to_string()),
            work_experience: vec![
                WorkExperience {
                    title: Some("Research Scientist".to_string()),
                    company: Some("Lab".to_string()),
                    date_range: Some("2020-2024".to_string()),
                    description: Some("Built detection models.".to_string()),
                },
                WorkExperience {
                    title: Some("Intern".to_string()),
                    ..WorkExperience::default()
                },
            ],
            education: vec![Education {
                degree: Some("PhD".to_string()),
                institution: Some("X".to_string()),
                date_range: Some("2020".to_string()),
            }],
            publications: vec![Publication {
                title: Some("Robust Detection".to_string()),
                venue: Some("CVPR".to_string()),
            }],
            skills: vec!["Rust".to_string(), "PyTorch".to_string()],
        },
    }
}

pub(super) fn build_service(
    capability: Arc<ScriptedCapability>,
    records: Vec<CandidateRecord>,
) -> (
    EvaluationService<MemoryCandidates, MemoryResults>,
    Arc<MemoryResults>,
) {
    let candidates = Arc::new(MemoryCandidates::with_records(records));
    let results = Arc::new(MemoryResults::default());
    let service = EvaluationService::new(candidates, results.clone(), runner(capability));
    (service, results)
}

#[derive(Default, Clone)]
pub(super) struct MemoryCandidates {
    records: Arc<Mutex<HashMap<CandidateId, CandidateRecord>>>,
}

impl MemoryCandidates {
    pub(super) fn with_records(records: Vec<CandidateRecord>) -> Self {
        let source = Self::default();
        {
            let mut guard = source.records.lock().expect("candidate mutex poisoned");
            for record in records {
                guard.insert(record.id.clone(), record);
            }
        }
        source
    }
}

impl CandidateSource for MemoryCandidates {
    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateRecord>, RepositoryError> {
        let guard = self.records.lock().expect("candidate mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryResults {
    documents: Arc<Mutex<HashMap<CandidateId, PersistedEvaluation>>>,
    saves: Arc<Mutex<usize>>,
}

impl MemoryResults {
    pub(super) fn documents(&self) -> Vec<PersistedEvaluation> {
        self.documents
            .lock()
            .expect("results mutex poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub(super) fn save_count(&self) -> usize {
        *self.saves.lock().expect("results mutex poisoned")
    }
}

impl ResultStore for MemoryResults {
    fn save(
        &self,
        source: &CandidateId,
        outcome: &PipelineOutcome,
    ) -> Result<PersistedEvaluation, RepositoryError> {
        *self.saves.lock().expect("results mutex poisoned") += 1;
        let mut guard = self.documents.lock().expect("results mutex poisoned");
        let id = guard
            .get(source)
            .map(|existing| existing.id.clone())
            .unwrap_or_else(EvaluationId::generate);
        guard.insert(
            source.clone(),
            PersistedEvaluation::from_outcome(id, source, outcome),
        );
        guard.get(source).cloned().ok_or(RepositoryError::NotFound)
    }

    fn fetch(&self, source: &CandidateId) -> Result<Option<PersistedEvaluation>, RepositoryError> {
        let guard = self.documents.lock().expect("results mutex poisoned");
        Ok(guard.get(source).cloned())
    }
}

pub(super) struct UnavailableResults;

impl ResultStore for UnavailableResults {
    fn save(
        &self,
        _source: &CandidateId,
        _outcome: &PipelineOutcome,
    ) -> Result<PersistedEvaluation, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _source: &CandidateId) -> Result<Option<PersistedEvaluation>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
