use chrono::{DateTime, Utc};
use home_inventory_shared::{JobStatus, ReceiptItemInput, ReceiptStatus};
use serde::{Deserialize, Serialize};

/// A receipt upload as it moves through upload, parsing, and review.
/// `items` is populated once `status` reaches `parsed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptUpload {
    pub receipt_upload_id: String,
    pub household_id: String,
    pub filename: String,
    pub content_type: String,
    pub storage_path: String,
    pub status: ReceiptStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ocr_text: Option<String>,
    pub receipt_image_data_url: Option<String>,
    pub merchant_name: Option<String>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub items: Vec<ReceiptItemInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptProcessJob {
    pub job_id: String,
    pub receipt_upload_id: String,
    pub household_id: String,
    pub status: JobStatus,
    pub attempts: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub error: Option<String>,
    pub notes: Option<String>,
}

/// Result of `createUpload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub receipt_upload_id: String,
    pub upload_url: String,
    pub path: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of `claimNextJob`: the claimed job plus its receipt snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimedJob {
    pub job: ReceiptProcessJob,
    pub receipt: ReceiptUpload,
}
