use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use crate::error::AppError;
use crate::state::AppState;

/// GET /v1/jobs/{jobId}
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let job = state.core.queue().get_job(&job_id).await?;
    Ok(Json(job))
}
