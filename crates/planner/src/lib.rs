mod engine;
mod http_client;
mod model;
mod planner;
mod requests;

pub use engine::RecommendationEngine;
pub use http_client::HttpLlmClient;
pub use model::{
    DailyRecommendationItem, DailyRun, MealCheckin, MealCheckinLine, RecommendationFeedback,
    RecommendationRun, RunType, SubmitCheckinOutcome, WeeklyRecommendationItem, WeeklyRun,
};
pub use planner::{
    DEFAULT_PLANNER_DEADLINE, ExternalPlanner, HeuristicPlanner, LlmClient, NullLlmClient, Planner,
    PlannerInput,
};
pub use requests::{
    GenerateDailyRequest, GenerateWeeklyRequest, SubmitFeedbackRequest, SubmitMealCheckinRequest,
};
