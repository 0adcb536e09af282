use chrono::{DateTime, Utc};
use home_inventory_shared::ReceiptItemInput;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewMode {
    Overwrite,
    Append,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReceiptRequest {
    pub mode: ReviewMode,
    pub items: Vec<ReceiptItemInput>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub applied: bool,
    pub events_created: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddManualItemsRequest {
    pub items: Vec<ReceiptItemInput>,
    pub purchased_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualEntryOutcome {
    pub applied: bool,
    pub lot_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideLotExpiryRequest {
    pub expires_at: DateTime<Utc>,
    pub notes: Option<String>,
}
