use chrono::{DateTime, Utc};
use home_inventory_shared::{ExpirySource, InventoryEventType, ItemCategory, Unit};
use serde::{Deserialize, Serialize};

/// One purchase batch of an item, tracked separately so FEFO depletion can
/// tell lots of the same item apart by expiry. `created_at` breaks ties
/// when two lots share an expiry and a purchase date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLot {
    pub lot_id: String,
    pub household_id: String,
    pub item_key: String,
    pub item_name: String,
    pub quantity_remaining: f64,
    pub unit: Unit,
    pub category: ItemCategory,
    pub purchased_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expiry_estimated_at: Option<DateTime<Utc>>,
    pub expiry_source: Option<ExpirySource>,
    pub expiry_confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An append-only ledger entry recording a quantity movement against a lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEvent {
    pub event_id: String,
    pub household_id: String,
    pub lot_id: String,
    pub event_type: InventoryEventType,
    pub quantity: f64,
    pub unit: Unit,
    pub source: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
