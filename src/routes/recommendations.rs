use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use home_inventory_core::{GenerateDailyRequest, GenerateWeeklyRequest};
use home_inventory_planner::SubmitFeedbackRequest;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// GET /v1/recommendations/{householdId}/daily
pub async fn latest_daily(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let run = state
        .core
        .latest_daily(&household_id)
        .await
        .ok_or_else(|| home_inventory_shared::Error::NotFound(format!("daily run for {household_id}")))?;
    Ok(Json(run))
}

/// POST /v1/recommendations/{householdId}/daily/generate
pub async fn generate_daily(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
    body: Option<Json<GenerateDailyRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let run = state.core.generate_daily(&household_id, req).await;
    Json(run)
}

/// GET /v1/recommendations/{householdId}/weekly
pub async fn latest_weekly(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let run = state
        .core
        .latest_weekly(&household_id)
        .await
        .ok_or_else(|| home_inventory_shared::Error::NotFound(format!("weekly run for {household_id}")))?;
    Ok(Json(run))
}

/// POST /v1/recommendations/{householdId}/weekly/generate
pub async fn generate_weekly(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
    body: Option<Json<GenerateWeeklyRequest>>,
) -> impl IntoResponse {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let run = state.core.generate_weekly(&household_id, req).await;
    Json(run)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub household_id: String,
    #[serde(flatten)]
    pub feedback: SubmitFeedbackRequest,
}

/// POST /v1/recommendations/{recommendationId}/feedback
pub async fn submit_feedback(
    State(state): State<AppState>,
    Path(recommendation_id): Path<String>,
    Json(body): Json<FeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let feedback = state
        .core
        .submit_feedback(&recommendation_id, &body.household_id, body.feedback)
        .await?;
    Ok(Json(feedback))
}
