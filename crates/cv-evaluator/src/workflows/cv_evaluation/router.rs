use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{CandidateId, RunStatus};
use super::repository::{CandidateSource, ResultStore};
use super::service::{EvaluationService, EvaluationServiceError};

/// Router builder exposing the evaluation trigger and lookup endpoints.
pub fn evaluation_router<S, R>(service: Arc<EvaluationService<S, R>>) -> Router
where
    S: CandidateSource + 'static,
    R: ResultStore + 'static,
{
    Router::new()
        .route(
            "/run-cv-evaluation/:document_id",
            post(run_evaluation_handler::<S, R>),
        )
        .route(
            "/api/v1/evaluations/:document_id",
            get(evaluation_status_handler::<S, R>),
        )
        .with_state(service)
}

pub(crate) async fn run_evaluation_handler<S, R>(
    State(service): State<Arc<EvaluationService<S, R>>>,
    Path(document_id): Path<String>,
) -> Response
where
    S: CandidateSource + 'static,
    R: ResultStore + 'static,
{
    let Some(id) = CandidateId::parse(&document_id) else {
        return invalid_id_response();
    };

    match service.evaluate(&id).await {
        Ok(evaluation) if evaluation.status == RunStatus::Completed => {
            let payload = json!({
                "message": "CV evaluation completed successfully!",
                "output": evaluation,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(evaluation) => {
            let payload = json!({
                "message": format!(
                    "An error occurred during evaluation: {}",
                    evaluation.error.as_deref().unwrap_or("unknown error")
                ),
                "output": evaluation,
            });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn evaluation_status_handler<S, R>(
    State(service): State<Arc<EvaluationService<S, R>>>,
    Path(document_id): Path<String>,
) -> Response
where
    S: CandidateSource + 'static,
    R: ResultStore + 'static,
{
    let Some(id) = CandidateId::parse(&document_id) else {
        return invalid_id_response();
    };

    match service.get(&id) {
        Ok(evaluation) => (StatusCode::OK, axum::Json(evaluation)).into_response(),
        Err(err) => error_response(err),
    }
}

fn invalid_id_response() -> Response {
    let payload = json!({ "error": "document id must not be blank" });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn error_response(err: EvaluationServiceError) -> Response {
    let status = match err {
        EvaluationServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        EvaluationServiceError::Lookup(_) | EvaluationServiceError::Persistence(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
