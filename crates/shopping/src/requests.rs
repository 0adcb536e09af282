use chrono::NaiveDate;
use home_inventory_shared::ShoppingDraftItemStatus;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateShoppingDraftRequest {
    pub week_of: Option<NaiveDate>,
    pub regenerate: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShoppingDraftItemPatch {
    pub draft_item_id: String,
    pub item_status: Option<ShoppingDraftItemStatus>,
    pub quantity: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchShoppingDraftItemsRequest {
    pub household_id: String,
    pub items: Vec<ShoppingDraftItemPatch>,
    pub idempotency_key: Option<String>,
}
