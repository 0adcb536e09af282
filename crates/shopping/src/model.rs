use chrono::{DateTime, NaiveDate, Utc};
use home_inventory_shared::{RecommendationPriority, ShoppingDraftItemStatus, ShoppingDraftStatus, Unit};
use serde::Serialize;

use crate::pricing::PriceIntelligence;

/// One line of a shopping draft, carrying its price-intelligence fields
/// flattened alongside the quantity/status the household can edit.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingDraftItem {
    pub draft_item_id: String,
    pub item_key: String,
    pub item_name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub priority: RecommendationPriority,
    pub item_status: ShoppingDraftItemStatus,
    #[serde(flatten)]
    pub price: PriceIntelligence,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingDraft {
    pub draft_id: String,
    pub household_id: String,
    pub week_of: NaiveDate,
    pub status: ShoppingDraftStatus,
    pub source_run_id: String,
    pub items: Vec<ShoppingDraftItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchOutcome {
    pub updated: bool,
    pub draft: ShoppingDraft,
}
