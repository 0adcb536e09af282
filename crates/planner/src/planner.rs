use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use home_inventory_ledger::InventoryLot;
use home_inventory_shared::{IdKind, IdProvider, RecommendationPriority, Unit, new_id};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::model::{DailyRecommendationItem, WeeklyRecommendationItem};

/// Default deadline for an external planner call.
pub const DEFAULT_PLANNER_DEADLINE: Duration = Duration::from_secs(25);

/// Snapshot handed to a `Planner`: inventory + feedback, taken under the
/// household lock and then released before the (possibly suspending)
/// call.
pub struct PlannerInput {
    pub household_id: String,
    pub target_date: NaiveDate,
    pub lots: Vec<InventoryLot>,
    pub feedback_by_item: HashMap<String, f64>,
}

/// Narrow trait over an LLM completion call, kept as a small seam so
/// concrete provider clients stay swappable behind it.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> anyhow::Result<Value>;
}

/// Default client when no provider is configured.
pub struct NullLlmClient;

#[async_trait]
impl LlmClient for NullLlmClient {
    async fn complete(&self, _prompt: &str) -> anyhow::Result<Value> {
        Err(anyhow::anyhow!("no LLM provider configured"))
    }
}

/// A handle with a single async entry point per run type, honoring both
/// a deadline and a cancellation token: dropping the underlying call on
/// cancellation releases any waiters inside it.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn generate_daily(
        &self,
        input: &PlannerInput,
        cancel: &CancellationToken,
    ) -> (Vec<DailyRecommendationItem>, String);
    async fn generate_weekly(
        &self,
        input: &PlannerInput,
        cancel: &CancellationToken,
    ) -> (Vec<WeeklyRecommendationItem>, String);
}

fn clamp01(v: f64) -> f64 {
    v.max(0.0).min(1.0)
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Heuristic cuisine keyword guess.
fn guess_cuisine(item_name: &str) -> &'static str {
    let lower = item_name.to_lowercase();
    const CHINESE: [&str; 3] = ["rice", "soy", "tofu"];
    const ITALIAN: [&str; 3] = ["pasta", "tomato", "olive"];
    if CHINESE.iter().any(|k| lower.contains(k)) {
        "Chinese"
    } else if ITALIAN.iter().any(|k| lower.contains(k)) {
        "Italian"
    } else {
        "Mixed"
    }
}

/// Weekly low-stock threshold table.
fn low_stock_threshold(unit: Unit) -> f64 {
    match unit {
        Unit::Count => 4.0,
        Unit::Kg | Unit::L | Unit::Lb => 1.0,
        Unit::Pack | Unit::Box | Unit::Bottle => 2.0,
        _ => 2.0,
    }
}

/// Shared score formula. Only meaningfully documented for the daily
/// recommendation, but "priority by score band" on the weekly side
/// presupposes the same score, so this planner reuses it for both.
fn score_for(quantity_remaining: f64, feedback: f64) -> f64 {
    clamp01(0.45 + (quantity_remaining / 10.0).min(0.4) + 0.2 * feedback)
}

fn priority_for(score: f64) -> RecommendationPriority {
    if score > 0.8 {
        RecommendationPriority::High
    } else if score > 0.6 {
        RecommendationPriority::Medium
    } else {
        RecommendationPriority::Low
    }
}

/// Always-available heuristic planner.
pub struct HeuristicPlanner {
    ids: Arc<dyn IdProvider>,
}

impl HeuristicPlanner {
    pub fn new(ids: Arc<dyn IdProvider>) -> Self {
        Self { ids }
    }
}

#[async_trait]
impl Planner for HeuristicPlanner {
    async fn generate_daily(
        &self,
        input: &PlannerInput,
        _cancel: &CancellationToken,
    ) -> (Vec<DailyRecommendationItem>, String) {
        let mut lots: Vec<&InventoryLot> = input.lots.iter().collect();
        lots.sort_by(|a, b| {
            b.quantity_remaining
                .partial_cmp(&a.quantity_remaining)
                .unwrap_or(Ordering::Equal)
        });
        lots.truncate(4);

        let items = lots
            .into_iter()
            .map(|lot| {
                let feedback = input
                    .feedback_by_item
                    .get(&lot.item_key)
                    .copied()
                    .unwrap_or(0.0);
                let score = score_for(lot.quantity_remaining, feedback);
                let cuisine = guess_cuisine(&lot.item_name);
                DailyRecommendationItem {
                    recommendation_id: new_id(IdKind::Recommendation, &self.ids.token()),
                    item_key: lot.item_key.clone(),
                    title: format!("{cuisine} {} dinner", lot.item_name),
                    score: round3(score),
                }
            })
            .collect();
        (items, "heuristic".to_string())
    }

    async fn generate_weekly(
        &self,
        input: &PlannerInput,
        _cancel: &CancellationToken,
    ) -> (Vec<WeeklyRecommendationItem>, String) {
        let mut items: Vec<WeeklyRecommendationItem> = input
            .lots
            .iter()
            .filter_map(|lot| {
                let threshold = low_stock_threshold(lot.unit);
                if lot.quantity_remaining >= threshold {
                    return None;
                }
                let deficit = threshold - lot.quantity_remaining;
                let feedback = input
                    .feedback_by_item
                    .get(&lot.item_key)
                    .copied()
                    .unwrap_or(0.0);
                let score = score_for(lot.quantity_remaining, feedback);
                Some(WeeklyRecommendationItem {
                    recommendation_id: new_id(IdKind::Recommendation, &self.ids.token()),
                    item_key: lot.item_key.clone(),
                    item_name: lot.item_name.clone(),
                    quantity: round2(deficit + 0.5 * threshold),
                    unit: lot.unit,
                    priority: priority_for(score),
                    score: round3(score),
                })
            })
            .collect();
        items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        (items, "heuristic".to_string())
    }
}

/// Optional LLM-backed planner. Falls back to the heuristic on any
/// failure: network, timeout, cancellation, malformed JSON, or schema
/// mismatch.
pub struct ExternalPlanner<C: LlmClient> {
    client: C,
    fallback: HeuristicPlanner,
    deadline: Duration,
    model_name: String,
}

impl<C: LlmClient> ExternalPlanner<C> {
    pub fn new(client: C, ids: Arc<dyn IdProvider>, model_name: String, deadline: Duration) -> Self {
        Self {
            client,
            fallback: HeuristicPlanner::new(ids),
            deadline,
            model_name,
        }
    }

    /// Races the completion call against the deadline and the caller's
    /// cancellation token. Whichever loses is dropped, which releases any
    /// waiters inside the in-flight call.
    async fn call(&self, prompt: String, cancel: &CancellationToken) -> anyhow::Result<Value> {
        tokio::select! {
            result = self.client.complete(&prompt) => result,
            _ = tokio::time::sleep(self.deadline) => {
                Err(anyhow::anyhow!("planner call timed out after {:?}", self.deadline))
            }
            _ = cancel.cancelled() => {
                Err(anyhow::anyhow!("planner call cancelled"))
            }
        }
    }
}

#[async_trait]
impl<C: LlmClient + Sync> Planner for ExternalPlanner<C> {
    async fn generate_daily(
        &self,
        input: &PlannerInput,
        cancel: &CancellationToken,
    ) -> (Vec<DailyRecommendationItem>, String) {
        let prompt = format!(
            "generate up to 4 daily meal recommendations for household {} on {} from lots {:?} with feedback {:?}",
            input.household_id,
            input.target_date,
            input.lots.iter().map(|l| &l.item_key).collect::<Vec<_>>(),
            input.feedback_by_item
        );
        match self
            .call(prompt, cancel)
            .await
            .and_then(|v| parse_daily(v, &*self.fallback.ids))
        {
            Ok(items) => (items, self.model_name.clone()),
            Err(err) => {
                warn!(error = %err, "external planner daily generation failed, falling back to heuristic");
                self.fallback.generate_daily(input, cancel).await
            }
        }
    }

    async fn generate_weekly(
        &self,
        input: &PlannerInput,
        cancel: &CancellationToken,
    ) -> (Vec<WeeklyRecommendationItem>, String) {
        let prompt = format!(
            "generate weekly purchase recommendations for household {} on {} from lots {:?} with feedback {:?}",
            input.household_id,
            input.target_date,
            input.lots.iter().map(|l| &l.item_key).collect::<Vec<_>>(),
            input.feedback_by_item
        );
        match self
            .call(prompt, cancel)
            .await
            .and_then(|v| parse_weekly(v, &*self.fallback.ids))
        {
            Ok(items) => (items, self.model_name.clone()),
            Err(err) => {
                warn!(error = %err, "external planner weekly generation failed, falling back to heuristic");
                self.fallback.generate_weekly(input, cancel).await
            }
        }
    }
}

fn parse_daily(value: Value, ids: &dyn IdProvider) -> anyhow::Result<Vec<DailyRecommendationItem>> {
    let arr = value
        .get("items")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("malformed planner response: missing items array"))?;

    let items = arr
        .iter()
        .filter_map(|entry| {
            let item_key = entry.get("itemKey").and_then(|v| v.as_str())?.to_string();
            if item_key.is_empty() {
                return None;
            }
            let title = entry
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or(&item_key)
                .to_string();
            let score = clamp01(entry.get("score").and_then(|v| v.as_f64()).unwrap_or(0.5));
            Some(DailyRecommendationItem {
                recommendation_id: new_id(IdKind::Recommendation, &ids.token()),
                item_key,
                title,
                score: round3(score),
            })
        })
        .collect();
    Ok(items)
}

fn parse_weekly(
    value: Value,
    ids: &dyn IdProvider,
) -> anyhow::Result<Vec<WeeklyRecommendationItem>> {
    let arr = value
        .get("items")
        .and_then(|v| v.as_array())
        .ok_or_else(|| anyhow::anyhow!("malformed planner response: missing items array"))?;

    let items = arr
        .iter()
        .filter_map(|entry| {
            let item_key = entry.get("itemKey").and_then(|v| v.as_str())?.to_string();
            if item_key.is_empty() {
                return None;
            }
            let item_name = entry
                .get("itemName")
                .and_then(|v| v.as_str())
                .unwrap_or(&item_key)
                .to_string();
            let quantity = entry
                .get("quantity")
                .and_then(|v| v.as_f64())
                .unwrap_or(0.0)
                .max(0.0);
            let unit = entry
                .get("unit")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(Unit::Count);
            let priority = entry
                .get("priority")
                .and_then(|v| v.as_str())
                .and_then(|s| s.parse().ok())
                .unwrap_or(RecommendationPriority::Medium);
            let score = clamp01(entry.get("score").and_then(|v| v.as_f64()).unwrap_or(0.5));
            Some(WeeklyRecommendationItem {
                recommendation_id: new_id(IdKind::Recommendation, &ids.token()),
                item_key,
                item_name,
                quantity: round2(quantity),
                unit,
                priority,
                score: round3(score),
            })
        })
        .collect();
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use home_inventory_shared::{ExpirySource, ItemCategory};

    fn lot(item_key: &str, name: &str, qty: f64, unit: Unit) -> InventoryLot {
        InventoryLot {
            lot_id: format!("lot_{item_key}"),
            household_id: "household_main".to_string(),
            item_key: item_key.to_string(),
            item_name: name.to_string(),
            quantity_remaining: qty,
            unit,
            category: ItemCategory::Other,
            purchased_at: None,
            expires_at: None,
            expiry_estimated_at: None,
            expiry_source: Some(ExpirySource::Unknown),
            expiry_confidence: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn daily_picks_top_four_by_quantity() {
        let planner = HeuristicPlanner::new(Arc::new(home_inventory_shared::test_support::SequentialIds::new()));
        let lots = vec![
            lot("rice", "Jasmine Rice", 9.0, Unit::Kg),
            lot("tomato", "Tomato", 4.0, Unit::Count),
            lot("egg", "Egg", 12.0, Unit::Count),
            lot("milk", "Milk", 2.0, Unit::L),
            lot("bread", "Bread", 1.0, Unit::Count),
        ];
        let input = PlannerInput {
            household_id: "household_main".to_string(),
            target_date: NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
            lots,
            feedback_by_item: HashMap::new(),
        };
        let (items, model) = planner.generate_daily(&input, &CancellationToken::new()).await;
        assert_eq!(model, "heuristic");
        assert_eq!(items.len(), 4);
        assert!(!items.iter().any(|i| i.item_key == "bread"));
    }

    #[tokio::test]
    async fn weekly_flags_items_below_threshold() {
        let planner = HeuristicPlanner::new(Arc::new(home_inventory_shared::test_support::SequentialIds::new()));
        let lots = vec![lot("milk", "Milk", 0.5, Unit::L)];
        let input = PlannerInput {
            household_id: "household_main".to_string(),
            target_date: NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
            lots,
            feedback_by_item: HashMap::new(),
        };
        let (items, _) = planner.generate_weekly(&input, &CancellationToken::new()).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, round2(0.5 + 0.5 * 1.0));
    }
}
