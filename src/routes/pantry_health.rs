use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use home_inventory_core::PantryHealthRequest;
use serde::{Deserialize, Deserializer};

use crate::state::AppState;

/// Accepts `refresh=1`/`refresh=0` (and `true`/`false`) as query-string
/// values: axum's default bool `Query` deserialization only understands
/// the literal strings `"true"`/`"false"`, but `1`/`0` is the documented
/// query shape here.
fn deserialize_refresh<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(|s| matches!(s.as_str(), "1" | "true" | "yes")))
}

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    #[serde(default, deserialize_with = "deserialize_refresh")]
    pub refresh: Option<bool>,
}

/// GET /v1/pantry-health/{householdId}?refresh=1
pub async fn score(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
    Query(query): Query<RefreshQuery>,
) -> impl IntoResponse {
    let req = PantryHealthRequest { refresh: query.refresh };
    let score = state.core.pantry_health(&household_id, req).await;
    Json(score)
}

/// GET /v1/pantry-health/{householdId}/history
pub async fn history(
    State(state): State<AppState>,
    Path(household_id): Path<String>,
) -> impl IntoResponse {
    let history = state.core.pantry_health_history(&household_id).await;
    Json(history)
}
