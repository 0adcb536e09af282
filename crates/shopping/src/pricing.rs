use chrono::{DateTime, Utc};

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

/// Price-intelligence fields for one draft item, derived from its price
/// history as of the draft's generation time.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceIntelligence {
    pub last_unit_price: Option<f64>,
    pub avg_unit_price_30d: Option<f64>,
    pub min_unit_price_90d: Option<f64>,
    pub price_trend_pct: Option<f64>,
    pub price_alert: bool,
}

/// `points` need not be sorted or deduplicated by the caller: the result
/// must be insensitive to input order.
pub fn compute_price_intelligence(
    points: &[(DateTime<Utc>, f64)],
    as_of: DateTime<Utc>,
) -> PriceIntelligence {
    if points.is_empty() {
        return PriceIntelligence::default();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by_key(|(t, _)| *t);
    let last = sorted.last().unwrap().1;

    let within_days = |t: &DateTime<Utc>, days: i64| {
        let elapsed = as_of.signed_duration_since(*t).num_days();
        (0..=days).contains(&elapsed)
    };

    let window_30d: Vec<f64> = sorted
        .iter()
        .filter(|(t, _)| within_days(t, 30))
        .map(|(_, p)| *p)
        .collect();
    let avg_30d = if window_30d.is_empty() {
        None
    } else {
        Some(window_30d.iter().sum::<f64>() / window_30d.len() as f64)
    };

    let min_90d = sorted
        .iter()
        .filter(|(t, _)| within_days(t, 90))
        .map(|(_, p)| *p)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.min(v))));

    let price_trend_pct = match avg_30d {
        Some(avg) if avg > 0.0 => Some(100.0 * (last - avg) / avg),
        _ => None,
    };

    let price_alert = price_trend_pct.map(|p| p >= 15.0).unwrap_or(false)
        || min_90d.map(|m| last >= 1.25 * m).unwrap_or(false);

    PriceIntelligence {
        last_unit_price: Some(round3(last)),
        avg_unit_price_30d: avg_30d.map(round3),
        min_unit_price_90d: min_90d.map(round3),
        price_trend_pct: price_trend_pct.map(round3),
        price_alert,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn steep_recent_rise_over_a_low_baseline_triggers_alert() {
        let points = vec![
            (t("2026-02-08T00:00:00Z"), 3.20),
            (t("2026-01-25T00:00:00Z"), 2.40),
            (t("2026-01-12T00:00:00Z"), 2.30),
        ];
        let as_of = t("2026-02-09T00:00:00Z");
        let result = compute_price_intelligence(&points, as_of);
        assert_eq!(result.last_unit_price, Some(3.20));
        assert_eq!(result.avg_unit_price_30d, Some(2.633));
        assert_eq!(result.min_unit_price_90d, Some(2.30));
        assert!(result.price_trend_pct.unwrap() > 15.0);
        assert!(result.price_alert);
    }

    #[test]
    fn insensitive_to_input_order() {
        let points = vec![
            (t("2026-01-12T00:00:00Z"), 2.30),
            (t("2026-02-08T00:00:00Z"), 3.20),
            (t("2026-01-25T00:00:00Z"), 2.40),
        ];
        let reversed: Vec<_> = points.iter().rev().cloned().collect();
        let as_of = t("2026-02-09T00:00:00Z");
        let a = compute_price_intelligence(&points, as_of);
        let b = compute_price_intelligence(&reversed, as_of);
        assert_eq!(a.last_unit_price, b.last_unit_price);
        assert_eq!(a.price_trend_pct, b.price_trend_pct);
        assert_eq!(a.price_alert, b.price_alert);
    }

    #[test]
    fn empty_series_yields_no_alert() {
        let result = compute_price_intelligence(&[], Utc::now());
        assert!(!result.price_alert);
        assert_eq!(result.last_unit_price, None);
    }
}
