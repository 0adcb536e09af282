use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use home_inventory_ledger::{OverrideLotExpiryRequest, days_until_expiry, risk_level};
use home_inventory_shared::RiskLevel;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

/// GET /v1/inventory/{householdId}
pub async fn snapshot(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
) -> impl IntoResponse {
    let lots = state.core.inventory_snapshot(&household_id).await;
    Json(lots)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualItemsRequest {
    #[serde(flatten)]
    pub request: home_inventory_ledger::AddManualItemsRequest,
}

/// POST /v1/inventory/{householdId}/manual-items
pub async fn manual_items(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
    Json(body): Json<ManualItemsRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .core
        .ledger()
        .add_manual_items(&household_id, body.request)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /v1/inventory/{householdId}/lots/{lotId}/expiry
pub async fn override_expiry(
    State(state): State<AppState>,
    Path((household_id, lot_id)): Path<(String, String)>,
    Json(req): Json<OverrideLotExpiryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let lot = state
        .core
        .ledger()
        .override_lot_expiry(&household_id, &lot_id, req)
        .await?;
    Ok(Json(lot))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpiryRiskEntry {
    lot_id: String,
    item_key: String,
    item_name: String,
    days_until_expiry: i64,
    risk_level: RiskLevel,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpiryRiskResponse {
    household_id: String,
    entries: Vec<ExpiryRiskEntry>,
}

/// GET /v1/inventory/{householdId}/expiry-risk. Assembles each active
/// lot's `daysUntilExpiry`/`riskLevel` into the ranked snapshot the route
/// returns, sorted highest risk first.
pub async fn expiry_risk(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
) -> impl IntoResponse {
    let as_of = chrono::Utc::now();
    let lots = state.core.inventory_snapshot(&household_id).await;

    let mut entries: Vec<ExpiryRiskEntry> = lots
        .iter()
        .filter(|l| l.quantity_remaining > 0.0)
        .map(|lot| {
            let expires_at = lot.expires_at.unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
            let days = days_until_expiry(expires_at, as_of);
            ExpiryRiskEntry {
                lot_id: lot.lot_id.clone(),
                item_key: lot.item_key.clone(),
                item_name: lot.item_name.clone(),
                days_until_expiry: days,
                risk_level: risk_level(days),
            }
        })
        .collect();
    entries.sort_by(|a, b| b.risk_level.cmp(&a.risk_level).then(a.days_until_expiry.cmp(&b.days_until_expiry)));

    Json(ExpiryRiskResponse { household_id, entries })
}
