use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use home_inventory_queue::SubmitJobResultRequest;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// POST /internal/jobs/claim
pub async fn claim(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let claimed = state.core.claim_next_job().await?;
    match claimed {
        Some(job) => Ok((StatusCode::OK, Json(job)).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// POST /internal/jobs/{jobId}/result
pub async fn submit_result(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(req): Json<SubmitJobResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.core.submit_job_result(&job_id, req).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct FailRequest {
    pub error: String,
}

/// POST /internal/jobs/{jobId}/fail
pub async fn fail(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    Json(body): Json<FailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let job = state.core.fail_job(&job_id, &body.error).await?;
    Ok(Json(job))
}
