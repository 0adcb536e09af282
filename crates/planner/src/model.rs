use chrono::{DateTime, NaiveDate, Utc};
use home_inventory_shared::{
    FeedbackSignalType, MealCheckinOutcome, MealCheckinStatus, RecommendationPriority, Unit,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunType {
    Daily,
    Weekly,
}

/// A completed recommendation pass for a household, either daily or
/// weekly, pairing the run metadata with its generated items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRun {
    pub run_id: String,
    pub household_id: String,
    pub run_type: RunType,
    pub model: String,
    pub created_at: DateTime<Utc>,
    pub target_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecommendationItem {
    pub recommendation_id: String,
    pub item_key: String,
    pub title: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRecommendationItem {
    pub recommendation_id: String,
    pub item_key: String,
    pub item_name: String,
    pub quantity: f64,
    pub unit: Unit,
    pub priority: RecommendationPriority,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRun {
    pub run: RecommendationRun,
    pub items: Vec<DailyRecommendationItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyRun {
    pub run: RecommendationRun,
    pub items: Vec<WeeklyRecommendationItem>,
}

/// A feedback signal against a previously generated recommendation item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationFeedback {
    pub feedback_id: String,
    pub recommendation_id: String,
    pub household_id: String,
    pub signal_type: FeedbackSignalType,
    pub signal_value: f64,
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealCheckinLine {
    pub item_key: String,
    pub unit: Unit,
    #[serde(default)]
    pub quantity_consumed: f64,
    #[serde(default)]
    pub quantity_wasted: f64,
}

/// A scheduled meal a household is expected to check in on, tracking
/// whether it was completed, adjusted, or skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealCheckin {
    pub checkin_id: String,
    pub recommendation_id: String,
    pub household_id: String,
    pub meal_date: NaiveDate,
    pub title: String,
    pub suggested_item_keys: Vec<String>,
    pub status: MealCheckinStatus,
    pub outcome: Option<MealCheckinOutcome>,
    pub lines: Option<Vec<MealCheckinLine>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCheckinOutcome {
    pub checkin: MealCheckin,
    pub events_created: usize,
}
