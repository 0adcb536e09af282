use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Measurement unit a lot or event quantity is denominated in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Count,
    G,
    Kg,
    Ml,
    L,
    Oz,
    Lb,
    Pack,
    Box,
    Bottle,
}

/// Broad grocery category used for lot clustering, expiry estimation, and
/// pantry-health stock-balance coverage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ItemCategory {
    Grain,
    Produce,
    Protein,
    Dairy,
    Snack,
    Beverage,
    Household,
    Condiment,
    Frozen,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Uploaded,
    Processing,
    Parsed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InventoryEventType {
    Add,
    Consume,
    Adjust,
    Waste,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ExpirySource {
    Exact,
    Estimated,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MealCheckinStatus {
    Pending,
    Completed,
    NeedsAdjustment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MealCheckinOutcome {
    Made,
    Skipped,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecommendationPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FeedbackSignalType {
    Accepted,
    Rejected,
    Edited,
    Ignored,
    Consumed,
    Wasted,
}

impl FeedbackSignalType {
    /// Default `signalValue` when a client omits one.
    pub fn default_value(self) -> f64 {
        match self {
            FeedbackSignalType::Accepted => 1.0,
            FeedbackSignalType::Consumed => 0.75,
            FeedbackSignalType::Edited => 0.25,
            FeedbackSignalType::Ignored => -0.25,
            FeedbackSignalType::Rejected => -0.75,
            FeedbackSignalType::Wasted => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShoppingDraftStatus {
    Draft,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShoppingDraftItemStatus {
    Planned,
    Skipped,
    Purchased,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_signal_values_match_spec() {
        assert_eq!(FeedbackSignalType::Accepted.default_value(), 1.0);
        assert_eq!(FeedbackSignalType::Consumed.default_value(), 0.75);
        assert_eq!(FeedbackSignalType::Edited.default_value(), 0.25);
        assert_eq!(FeedbackSignalType::Ignored.default_value(), -0.25);
        assert_eq!(FeedbackSignalType::Rejected.default_value(), -0.75);
        assert_eq!(FeedbackSignalType::Wasted.default_value(), -1.0);
    }

    #[test]
    fn unit_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Unit::Kg).unwrap(), "\"kg\"");
        assert_eq!(serde_json::to_string(&Unit::Count).unwrap(), "\"count\"");
    }
}
