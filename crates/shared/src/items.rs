use serde::{Deserialize, Serialize};

use crate::{ItemCategory, Unit};

/// A single parsed receipt line (or a manual-entry line), as submitted by
/// a worker's job result, a receipt review, or a manual-entry request.
/// Shared between `home-inventory-queue` (stores it on the receipt) and
/// `home-inventory-ledger` (mutates the lot/event ledger from it).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptItemInput {
    pub item_key: String,
    pub raw_name: String,
    pub normalized_name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub category: ItemCategory,
    /// Unit price for this line, if the receipt/OCR pass captured one.
    #[serde(default)]
    pub unit_price: Option<f64>,
}
