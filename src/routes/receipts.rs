use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use home_inventory_queue::{CreateUploadRequest, EnqueueBatchRequest, EnqueueDetails};

use crate::error::AppError;
use crate::state::AppState;

/// POST /v1/receipts/upload-url
pub async fn upload_url(
    State(state): State<AppState>,
    Json(req): Json<CreateUploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = state.core.queue().create_upload(req).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /v1/receipts/{receiptUploadId}
pub async fn get_receipt(
    State(state): State<AppState>,
    Path(receipt_upload_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let receipt = state.core.queue().get_receipt(&receipt_upload_id).await?;
    Ok(Json(receipt))
}

/// POST /v1/receipts/{receiptUploadId}/process
pub async fn process(
    State(state): State<AppState>,
    Path(receipt_upload_id): Path<String>,
    Json(body): Json<ProcessRequest>,
) -> Result<impl IntoResponse, AppError> {
    let job = state
        .core
        .queue()
        .enqueue_job(&body.household_id, &receipt_upload_id, body.details)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(job)))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub household_id: String,
    #[serde(flatten)]
    pub details: EnqueueDetails,
}

/// PUT /v1/receipts/{receiptUploadId}/review
pub async fn review(
    State(state): State<AppState>,
    Path(receipt_upload_id): Path<String>,
    Json(body): Json<ReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .core
        .ledger()
        .review_receipt(&body.household_id, &receipt_upload_id, body.request)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub household_id: String,
    #[serde(flatten)]
    pub request: home_inventory_ledger::ReviewReceiptRequest,
}

/// POST /v1/receipts/batch/process
pub async fn batch_process(
    State(state): State<AppState>,
    Json(req): Json<EnqueueBatchRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = state.core.queue().enqueue_batch(req).await?;
    Ok((StatusCode::ACCEPTED, Json(result)))
}
