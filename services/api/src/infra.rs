use cv_evaluator::config::AppConfig;
use cv_evaluator::error::AppError;
use cv_evaluator::workflows::cv_evaluation::{
    AnthropicCapability, EvaluationService, JsonFileCandidateSource, JsonFileResultStore,
    PipelineRunner,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

pub(crate) type FileEvaluationService =
    EvaluationService<JsonFileCandidateSource, JsonFileResultStore>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Opens both stores and wires the pipeline to the configured capability.
///
/// Built once per process and shared by every request.
pub(crate) fn evaluation_service(config: &AppConfig) -> Result<FileEvaluationService, AppError> {
    let candidates = Arc::new(JsonFileCandidateSource::open(
        config.storage.candidates_dir.clone(),
    )?);
    let results = Arc::new(JsonFileResultStore::open(
        config.storage.evaluations_dir.clone(),
    )?);
    let capability = Arc::new(AnthropicCapability::new(&config.llm)?);
    let runner = PipelineRunner::standard(capability, &config.rubric.as_of);

    Ok(EvaluationService::new(candidates, results, runner))
}
