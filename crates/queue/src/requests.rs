use chrono::{DateTime, Utc};
use home_inventory_shared::ReceiptItemInput;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadRequest {
    pub household_id: String,
    pub filename: String,
    pub content_type: String,
}

/// Extra receipt metadata a caller may already have when enqueueing,
/// stamped onto the upload before it transitions to `processing`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueDetails {
    pub ocr_text: Option<String>,
    pub merchant_name: Option<String>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub receipt_image_data_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReceiptEntry {
    pub household_id: String,
    pub filename: String,
    pub content_type: String,
    #[serde(flatten)]
    pub details: EnqueueDetails,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueBatchRequest {
    pub receipts: Vec<BatchReceiptEntry>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchEntryResult {
    pub accepted: bool,
    pub receipt_upload_id: Option<String>,
    pub job_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueBatchResult {
    pub requested: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub results: Vec<BatchEntryResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResultRequest {
    pub merchant_name: Option<String>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub ocr_text: Option<String>,
    pub items: Vec<ReceiptItemInput>,
    pub notes: Option<String>,
}
