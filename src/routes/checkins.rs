use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use home_inventory_planner::SubmitMealCheckinRequest;

use crate::error::AppError;
use crate::state::AppState;

/// GET /v1/checkins/{householdId}/pending
pub async fn list_pending(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
) -> impl IntoResponse {
    let checkins = state.core.list_pending_checkins(&household_id).await;
    Json(checkins)
}

/// POST /v1/checkins/{checkinId}/submit
pub async fn submit(
    State(state): State<AppState>,
    Path(checkin_id): Path<String>,
    Json(req): Json<SubmitMealCheckinRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.core.submit_meal_checkin(&checkin_id, req).await?;
    Ok(Json(outcome))
}
