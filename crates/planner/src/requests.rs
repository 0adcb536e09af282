use chrono::NaiveDate;
use home_inventory_shared::{FeedbackSignalType, MealCheckinOutcome};
use serde::Deserialize;

use crate::model::MealCheckinLine;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateDailyRequest {
    pub target_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateWeeklyRequest {
    pub week_of: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    pub signal_type: FeedbackSignalType,
    pub signal_value: Option<f64>,
    pub context: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMealCheckinRequest {
    pub household_id: String,
    pub outcome: MealCheckinOutcome,
    pub lines: Option<Vec<MealCheckinLine>>,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
}
