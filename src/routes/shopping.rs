use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use home_inventory_shopping::{GenerateShoppingDraftRequest, PatchShoppingDraftItemsRequest};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

/// POST /v1/shopping-drafts/{householdId}/generate
pub async fn generate(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
    body: Option<Json<GenerateShoppingDraftRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let draft = state.core.generate_shopping_draft(&household_id, req).await?;
    Ok((StatusCode::CREATED, Json(draft)))
}

/// GET /v1/shopping-drafts/{householdId}/latest
pub async fn latest(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let draft = state
        .core
        .latest_shopping_draft(&household_id)
        .await
        .ok_or_else(|| home_inventory_shared::Error::NotFound(format!("shopping draft for {household_id}")))?;
    Ok(Json(draft))
}

/// PATCH /v1/shopping-drafts/{draftId}/items
pub async fn patch_items(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
    Json(req): Json<PatchShoppingDraftItemsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.core.patch_shopping_draft_items(&draft_id, req).await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizeRequest {
    pub household_id: String,
}

/// POST /v1/shopping-drafts/{draftId}/finalize
pub async fn finalize(
    State(state): State<AppState>,
    Path(draft_id): Path<String>,
    Json(body): Json<FinalizeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let draft = state
        .core
        .finalize_shopping_draft(&body.household_id, &draft_id)
        .await?;
    Ok(Json(draft))
}
