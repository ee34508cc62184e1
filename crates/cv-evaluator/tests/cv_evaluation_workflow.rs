//! End-to-end scenarios for the CV evaluation workflow.
//!
//! Scenarios drive the public service facade against the JSON file stores so the upsert
//! and failure-recording behavior is validated on disk, not only in memory.

mod common {
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use async_trait::async_trait;
    use cv_evaluator::workflows::cv_evaluation::{
        CandidateRecord, CapabilityError, EvaluationCapability, EvaluationService,
        JsonFileCandidateSource, JsonFileResultStore, PipelineRunner, PromptTemplate,
        PromptVariables,
    };

    /// Answers each prompt with a canned reply; prompts without a reply fail.
    pub(super) struct CannedCapability {
        replies: BTreeMap<&'static str, &'static str>,
    }

    impl CannedCapability {
        pub(super) fn new(replies: &[(&'static str, &'static str)]) -> Self {
            Self {
                replies: replies.iter().copied().collect(),
            }
        }
    }

    #[async_trait]
    impl EvaluationCapability for CannedCapability {
        async fn respond(
            &self,
            template: &PromptTemplate,
            _variables: &PromptVariables,
        ) -> Result<String, CapabilityError> {
            self.replies
                .get(template.name.as_str())
                .map(|reply| reply.to_string())
                .ok_or_else(|| CapabilityError::Unavailable(format!("{} offline", template.name)))
        }
    }

    pub(super) fn strong_capability() -> CannedCapability {
        CannedCapability::new(&[
            ("credentials", "Credentials Score: 8/10\nPhD with a solid publication record."),
            (
                "national_importance",
                "National Importance Score: 9/10\nWork advances U.S. AI priorities.",
            ),
            ("synthesis", "Excellent credentials in a field of critical national interest."),
        ])
    }

    pub(super) fn write_candidate(dir: &Path, id: &str, document: serde_json::Value) {
        fs::write(
            dir.join(format!("{id}.json")),
            serde_json::to_vec_pretty(&document).expect("serialize fixture"),
        )
        .expect("write fixture");
    }

    pub(super) fn phd_candidate() -> serde_json::Value {
        serde_json::json!({
            "cv_info": {
                "summary": "Researcher building trustworthy machine learning systems.",
                "education": [{ "degree": "PhD", "institution": "X", "year": "2020" }]
            }
        })
    }

    pub(super) fn service(
        candidates: &Path,
        evaluations: &Path,
        capability: CannedCapability,
    ) -> EvaluationService<JsonFileCandidateSource, JsonFileResultStore> {
        EvaluationService::new(
            Arc::new(JsonFileCandidateSource::open(candidates).expect("candidate source opens")),
            Arc::new(JsonFileResultStore::open(evaluations).expect("result store opens")),
            PipelineRunner::standard(Arc::new(capability), "July 2025"),
        )
    }

    pub(super) fn parse_record(document: serde_json::Value) -> CandidateRecord {
        serde_json::from_value(document).expect("record parses")
    }
}

use common::*;
use cv_evaluator::workflows::cv_evaluation::{
    assemble, CandidateId, EvaluationServiceError, ResultStore, RunStatus, TaskId,
};
use std::fs;

#[tokio::test]
async fn phd_candidate_is_rated_strong_and_persisted() {
    let candidates = tempfile::tempdir().expect("temp dir");
    let evaluations = tempfile::tempdir().expect("temp dir");
    write_candidate(candidates.path(), "cand-phd", phd_candidate());

    let service = service(candidates.path(), evaluations.path(), strong_capability());
    let evaluation = service
        .evaluate(&CandidateId("cand-phd".to_string()))
        .await
        .expect("evaluation runs");

    assert_eq!(evaluation.status, RunStatus::Completed);
    assert_eq!(
        evaluation.results[&TaskId::ordinal(3)]
            .lines()
            .next()
            .expect("rating line"),
        "Overall Rating: Strong Candidate for NIW (Final Score: 8.4/10)"
    );

    let stored: serde_json::Value = serde_json::from_slice(
        &fs::read(evaluations.path().join("cand-phd.json")).expect("document on disk"),
    )
    .expect("stored json");
    assert_eq!(stored["status"], "completed");
    assert_eq!(stored["source_record_id"], "cand-phd");
    assert_eq!(stored["id"], evaluation.id.0.as_str());
    assert!(stored["results"]["task_1"].is_string());
}

#[tokio::test]
async fn unknown_document_fails_before_any_write() {
    let candidates = tempfile::tempdir().expect("temp dir");
    let evaluations = tempfile::tempdir().expect("temp dir");

    let service = service(candidates.path(), evaluations.path(), strong_capability());
    let result = service
        .evaluate(&CandidateId("no-such-document".to_string()))
        .await;

    assert!(matches!(result, Err(EvaluationServiceError::NotFound(_))));
    assert_eq!(
        fs::read_dir(evaluations.path()).expect("list dir").count(),
        0
    );
}

#[tokio::test]
async fn failed_rerun_overwrites_completed_evaluation() {
    let candidates = tempfile::tempdir().expect("temp dir");
    let evaluations = tempfile::tempdir().expect("temp dir");
    write_candidate(candidates.path(), "cand-rerun", phd_candidate());
    let id = CandidateId("cand-rerun".to_string());

    let first = service(candidates.path(), evaluations.path(), strong_capability())
        .evaluate(&id)
        .await
        .expect("first run");
    assert_eq!(first.status, RunStatus::Completed);

    let offline = CannedCapability::new(&[(
        "credentials",
        "Credentials Score: 8/10\nPhD with a solid publication record.",
    )]);
    let second = service(candidates.path(), evaluations.path(), offline)
        .evaluate(&id)
        .await
        .expect("failure is recorded");

    assert_eq!(second.status, RunStatus::Failed);
    assert_eq!(second.id, first.id);
    assert!(second
        .error
        .as_deref()
        .is_some_and(|error| error.contains("national_importance offline")));
    assert!(!second.results.contains_key(&TaskId::ordinal(3)));

    let store = cv_evaluator::workflows::cv_evaluation::JsonFileResultStore::open(
        evaluations.path(),
    )
    .expect("store reopens");
    assert_eq!(store.fetch(&id).expect("fetch").expect("present"), second);
}

#[test]
fn assembled_text_uses_legacy_field_names() {
    let record = parse_record(phd_candidate());
    assert_eq!(
        assemble(&record).as_str(),
        "Curriculum Vitae\n\
\n## Professional Summary\nResearcher building trustworthy machine learning systems.\n\
\n## Education\n- PhD, X (2020)"
    );
}
