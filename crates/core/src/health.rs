//! Pantry health composite scoring: five weighted subscores folded into
//! a single 0-100 score.

use chrono::{DateTime, Duration, Utc};
use home_inventory_ledger::{InventoryEvent, InventoryLot};
use home_inventory_planner::MealCheckin;
use home_inventory_shared::{ExpirySource, InventoryEventType, MealCheckinOutcome, MealCheckinStatus};
use serde::Serialize;

const LOW_STOCK_FRACTION_PENALTY: f64 = 35.0;
const OVERSUPPLY_FRACTION_PENALTY: f64 = 15.0;
const OVERSUPPLY_MULTIPLE: f64 = 4.0;
const COVERAGE_TARGET_CATEGORIES: usize = 6;
const WASTE_WINDOW_DAYS: i64 = 14;
const CHECKIN_WINDOW_DAYS: i64 = 7;

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn low_stock_threshold(unit: home_inventory_shared::Unit) -> f64 {
    use home_inventory_shared::Unit::*;
    match unit {
        Count => 4.0,
        Kg | L | Lb => 1.0,
        Pack | Box | Bottle => 2.0,
        _ => 2.0,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PantryHealthScore {
    pub household_id: String,
    pub as_of: DateTime<Utc>,
    pub score: f64,
    pub subscores: Subscores,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscores {
    pub stock_balance: f64,
    pub expiry_risk: f64,
    pub waste_pressure: f64,
    pub plan_adherence: f64,
    pub data_quality: f64,
}

fn stock_balance(lots: &[InventoryLot]) -> f64 {
    let active: Vec<&InventoryLot> = lots.iter().filter(|l| l.quantity_remaining > 0.0).collect();
    if active.is_empty() {
        return 30.0;
    }
    let categories: std::collections::HashSet<_> = active.iter().map(|l| l.category).collect();
    let coverage = (categories.len() as f64 / COVERAGE_TARGET_CATEGORIES as f64).min(1.0);

    let low_stock = active
        .iter()
        .filter(|l| l.quantity_remaining <= low_stock_threshold(l.unit))
        .count();
    let oversupply = active
        .iter()
        .filter(|l| l.quantity_remaining > OVERSUPPLY_MULTIPLE * low_stock_threshold(l.unit))
        .count();

    let low_fraction = low_stock as f64 / active.len() as f64;
    let over_fraction = oversupply as f64 / active.len() as f64;

    let base = 100.0 * coverage;
    let penalized = base - low_fraction * LOW_STOCK_FRACTION_PENALTY - over_fraction * OVERSUPPLY_FRACTION_PENALTY;
    penalized.clamp(0.0, 100.0)
}

fn expiry_risk(lots: &[InventoryLot], as_of: DateTime<Utc>) -> f64 {
    let active: Vec<&InventoryLot> = lots.iter().filter(|l| l.quantity_remaining > 0.0).collect();
    if active.is_empty() {
        return 100.0;
    }
    let weight_sum: f64 = active
        .iter()
        .map(|l| {
            let expires_at = l.expires_at.unwrap_or(DateTime::<Utc>::MAX_UTC);
            let days = home_inventory_ledger::days_until_expiry(expires_at, as_of);
            match home_inventory_ledger::risk_level(days) {
                home_inventory_shared::RiskLevel::Critical => 1.0,
                home_inventory_shared::RiskLevel::High => 0.6,
                home_inventory_shared::RiskLevel::Medium => 0.3,
                home_inventory_shared::RiskLevel::Low => 0.1,
            }
        })
        .sum();
    let avg_weight = weight_sum / active.len() as f64;
    (100.0 - avg_weight * 100.0).clamp(0.0, 100.0)
}

fn waste_pressure(events: &[InventoryEvent], as_of: DateTime<Utc>) -> f64 {
    let cutoff = as_of - Duration::days(WASTE_WINDOW_DAYS);
    let mut consume = 0.0;
    let mut waste = 0.0;
    for event in events {
        if event.created_at < cutoff || event.created_at > as_of {
            continue;
        }
        match event.event_type {
            InventoryEventType::Consume => consume += event.quantity,
            InventoryEventType::Waste => waste += event.quantity,
            _ => {}
        }
    }
    let denom = consume + waste;
    if denom <= 0.0 {
        return 70.0;
    }
    (100.0 * (1.0 - waste / denom)).clamp(0.0, 100.0)
}

fn plan_adherence(checkins: &[MealCheckin], as_of: DateTime<Utc>) -> f64 {
    let cutoff = as_of - Duration::days(CHECKIN_WINDOW_DAYS);
    let recent: Vec<&MealCheckin> = checkins
        .iter()
        .filter(|c| c.created_at >= cutoff && c.created_at <= as_of)
        .collect();
    if recent.is_empty() {
        return 60.0;
    }
    let total = recent.len() as f64;
    let completed = recent
        .iter()
        .filter(|c| c.status == MealCheckinStatus::Completed)
        .count() as f64;
    let needs_adjustment = recent
        .iter()
        .filter(|c| c.status == MealCheckinStatus::NeedsAdjustment)
        .count() as f64;
    let skipped = recent
        .iter()
        .filter(|c| c.outcome == Some(MealCheckinOutcome::Skipped))
        .count() as f64;

    let completion_ratio = completed / total;
    let needs_adjustment_ratio = needs_adjustment / total;
    let skipped_ratio = skipped / total;

    (completion_ratio * 100.0 - 20.0 * needs_adjustment_ratio - 10.0 * skipped_ratio).clamp(0.0, 100.0)
}

fn data_quality(lots: &[InventoryLot], events: &[InventoryEvent]) -> f64 {
    if lots.is_empty() {
        return 35.0;
    }
    let expiry_coverage =
        lots.iter().filter(|l| l.expires_at.is_some()).count() as f64 / lots.len() as f64;
    let high_confidence_coverage = lots
        .iter()
        .filter(|l| l.expiry_confidence.unwrap_or(0.0) >= 0.7 || l.expiry_source == Some(ExpirySource::Exact))
        .count() as f64
        / lots.len() as f64;
    let manual_event_ratio = if events.is_empty() {
        0.0
    } else {
        events.iter().filter(|e| e.source == "manual").count() as f64 / events.len() as f64
    };

    (35.0 + 40.0 * expiry_coverage + 25.0 * high_confidence_coverage - 15.0 * manual_event_ratio)
        .clamp(0.0, 100.0)
}

/// Composite is the weighted sum of the five subscores, each
/// independently clamped/defaulted per its own empty-input rule.
pub fn compute_pantry_health(
    household_id: &str,
    lots: &[InventoryLot],
    events: &[InventoryEvent],
    checkins: &[MealCheckin],
    as_of: DateTime<Utc>,
) -> PantryHealthScore {
    let subscores = Subscores {
        stock_balance: round3(stock_balance(lots)),
        expiry_risk: round3(expiry_risk(lots, as_of)),
        waste_pressure: round3(waste_pressure(events, as_of)),
        plan_adherence: round3(plan_adherence(checkins, as_of)),
        data_quality: round3(data_quality(lots, events)),
    };
    let score = 0.25 * subscores.stock_balance
        + 0.25 * subscores.expiry_risk
        + 0.20 * subscores.waste_pressure
        + 0.20 * subscores.plan_adherence
        + 0.10 * subscores.data_quality;

    PantryHealthScore {
        household_id: household_id.to_string(),
        as_of,
        score: round3(score),
        subscores,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inventory_defaults() {
        let as_of = "2026-02-01T00:00:00Z".parse().unwrap();
        let result = compute_pantry_health("h1", &[], &[], &[], as_of);
        assert_eq!(result.subscores.stock_balance, 30.0);
        assert_eq!(result.subscores.expiry_risk, 100.0);
        assert_eq!(result.subscores.waste_pressure, 70.0);
        assert_eq!(result.subscores.plan_adherence, 60.0);
        assert_eq!(result.subscores.data_quality, 35.0);
    }

    #[test]
    fn waste_pressure_reflects_ratio() {
        use home_inventory_shared::Unit;
        let as_of: DateTime<Utc> = "2026-02-10T00:00:00Z".parse().unwrap();
        let mk = |event_type: InventoryEventType, qty: f64| InventoryEvent {
            event_id: "event_1".to_string(),
            household_id: "h1".to_string(),
            lot_id: "lot_1".to_string(),
            event_type,
            quantity: qty,
            unit: Unit::Count,
            source: "checkin".to_string(),
            reason: None,
            created_at: as_of,
        };
        let events = vec![
            mk(InventoryEventType::Consume, 3.0),
            mk(InventoryEventType::Waste, 1.0),
        ];
        let result = compute_pantry_health("h1", &[], &events, &[], as_of);
        assert_eq!(result.subscores.waste_pressure, 75.0);
    }
}
