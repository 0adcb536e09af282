use chrono::{DateTime, Duration, Utc};
use home_inventory_shared::{ExpirySource, ItemCategory, RiskLevel};

/// Default shelf-life (days) and confidence per item category.
fn category_table(category: ItemCategory) -> (i64, f64) {
    match category {
        ItemCategory::Protein => (3, 0.70),
        ItemCategory::Produce => (7, 0.65),
        ItemCategory::Dairy => (10, 0.70),
        ItemCategory::Frozen => (120, 0.60),
        ItemCategory::Grain => (180, 0.55),
        ItemCategory::Snack => (90, 0.55),
        ItemCategory::Beverage => (30, 0.60),
        ItemCategory::Condiment => (180, 0.50),
        ItemCategory::Household => (365, 0.45),
        ItemCategory::Other => (30, 0.50),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ExpiryEstimate {
    pub expires_at: DateTime<Utc>,
    pub expiry_estimated_at: DateTime<Utc>,
    pub expiry_source: ExpirySource,
    pub expiry_confidence: f64,
}

/// Applied on lot creation (receipt, manual) when no exact override
/// exists.
pub fn estimate_lot_expiry(
    category: ItemCategory,
    purchased_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ExpiryEstimate {
    let (days, confidence) = category_table(category);
    let base = purchased_at.unwrap_or(now);
    ExpiryEstimate {
        expires_at: base + Duration::days(days),
        expiry_estimated_at: now,
        expiry_source: ExpirySource::Estimated,
        expiry_confidence: confidence,
    }
}

/// Whole days between now and `expires_at`, rounded up.
pub fn days_until_expiry(expires_at: DateTime<Utc>, as_of: DateTime<Utc>) -> i64 {
    let secs = (expires_at - as_of).num_seconds();
    (secs as f64 / 86_400.0).ceil() as i64
}

/// Buckets days-until-expiry into a risk tier.
pub fn risk_level(days: i64) -> RiskLevel {
    if days <= 2 {
        RiskLevel::Critical
    } else if days <= 5 {
        RiskLevel::High
    } else if days <= 10 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn estimate_uses_purchase_date_as_base() {
        let purchased = t("2026-02-01T00:00:00Z");
        let now = t("2026-02-08T12:00:00Z");
        let est = estimate_lot_expiry(ItemCategory::Produce, Some(purchased), now);
        assert_eq!(est.expires_at, t("2026-02-08T00:00:00Z"));
        assert_eq!(est.expiry_confidence, 0.65);
    }

    #[test]
    fn risk_thresholds_bucket_correctly() {
        assert_eq!(risk_level(0), RiskLevel::Critical);
        assert_eq!(risk_level(2), RiskLevel::Critical);
        assert_eq!(risk_level(3), RiskLevel::High);
        assert_eq!(risk_level(5), RiskLevel::High);
        assert_eq!(risk_level(6), RiskLevel::Medium);
        assert_eq!(risk_level(10), RiskLevel::Medium);
        assert_eq!(risk_level(11), RiskLevel::Low);
    }

    #[test]
    fn days_until_expiry_rounds_up() {
        let expires = t("2026-02-10T01:00:00Z");
        let as_of = t("2026-02-09T12:00:00Z");
        assert_eq!(days_until_expiry(expires, as_of), 1);
    }
}
