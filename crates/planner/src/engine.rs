use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use home_inventory_ledger::{DepletionLine, InventoryLot, Ledger};
use home_inventory_shared::{
    Clock, Error, FeedbackSignalType, IdKind, IdProvider, IdempotencyStore, InventoryEventType,
    MealCheckinOutcome, MealCheckinStatus, Result, new_id,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::model::{
    DailyRun, MealCheckin, MealCheckinLine, RecommendationFeedback, RecommendationRun, RunType,
    SubmitCheckinOutcome, WeeklyRun,
};
use crate::planner::{Planner, PlannerInput};
use crate::requests::{SubmitFeedbackRequest, SubmitMealCheckinRequest};

const CHECKIN_SUBMIT_SCOPE: &str = "meal_checkin_submit";

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

struct RecommendationMeta {
    item_keys: Vec<String>,
}

struct HouseholdState {
    daily_runs: Vec<DailyRun>,
    weekly_runs: HashMap<NaiveDate, WeeklyRun>,
    latest_week_of: Option<NaiveDate>,
    recommendations: HashMap<String, RecommendationMeta>,
    feedback: Vec<RecommendationFeedback>,
    checkins: HashMap<String, MealCheckin>,
    checkin_submit_idempotency: IdempotencyStore<SubmitCheckinOutcome>,
}

impl HouseholdState {
    fn new() -> Self {
        Self {
            daily_runs: Vec::new(),
            weekly_runs: HashMap::new(),
            latest_week_of: None,
            recommendations: HashMap::new(),
            feedback: Vec::new(),
            checkins: HashMap::new(),
            checkin_submit_idempotency: IdempotencyStore::new(),
        }
    }

    /// Average `signalValue` per `itemKey` over every feedback record
    /// whose recommendation touched it.
    fn feedback_by_item(&self) -> HashMap<String, f64> {
        let mut sums: HashMap<String, (f64, usize)> = HashMap::new();
        for record in &self.feedback {
            if let Some(meta) = self.recommendations.get(&record.recommendation_id) {
                for item_key in &meta.item_keys {
                    let entry = sums.entry(item_key.clone()).or_insert((0.0, 0));
                    entry.0 += record.signal_value;
                    entry.1 += 1;
                }
            }
        }
        sums.into_iter()
            .map(|(k, (sum, n))| (k, round3(sum / n as f64)))
            .collect()
    }
}

fn finalize_checkin(
    state: &mut HouseholdState,
    checkin_id: &str,
    status: MealCheckinStatus,
    outcome: MealCheckinOutcome,
    lines: Vec<MealCheckinLine>,
    notes: Option<String>,
    now: DateTime<Utc>,
) {
    if let Some(checkin) = state.checkins.get_mut(checkin_id) {
        checkin.status = status;
        checkin.outcome = Some(outcome);
        checkin.lines = if lines.is_empty() { None } else { Some(lines) };
        checkin.notes = notes;
        checkin.updated_at = now;
    }
}

fn push_implicit_feedback(
    state: &mut HouseholdState,
    recommendation_id: &str,
    household_id: &str,
    signal_type: FeedbackSignalType,
    now: DateTime<Utc>,
    ids: &dyn IdProvider,
) {
    state.feedback.push(RecommendationFeedback {
        feedback_id: new_id(IdKind::Feedback, &ids.token()),
        recommendation_id: recommendation_id.to_string(),
        household_id: household_id.to_string(),
        signal_type,
        signal_value: signal_type.default_value(),
        context: Some("implicit".to_string()),
        created_at: now,
    });
}

/// Recommendation runs, feedback aggregation, and the check-in engine,
/// sharing one per-household lock since both operate on the same
/// recommendation index.
pub struct RecommendationEngine {
    households: Mutex<HashMap<String, Arc<Mutex<HouseholdState>>>>,
    planner: Box<dyn Planner>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdProvider>,
}

impl RecommendationEngine {
    pub fn new(planner: Box<dyn Planner>, clock: Arc<dyn Clock>, ids: Arc<dyn IdProvider>) -> Self {
        Self {
            households: Mutex::new(HashMap::new()),
            planner,
            clock,
            ids,
        }
    }

    async fn household(&self, household_id: &str) -> Arc<Mutex<HouseholdState>> {
        let mut map = self.households.lock().await;
        map.entry(household_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(HouseholdState::new())))
            .clone()
    }

    /// Snapshots feedback under lock, calls the (possibly suspending)
    /// planner without holding it, then reacquires the lock to
    /// materialize the run and spawn pending check-ins.
    pub async fn generate_daily(
        &self,
        household_id: &str,
        target_date: NaiveDate,
        lots: Vec<InventoryLot>,
        cancel: &CancellationToken,
    ) -> DailyRun {
        let handle = self.household(household_id).await;
        let feedback_by_item = { handle.lock().await.feedback_by_item() };

        let input = PlannerInput {
            household_id: household_id.to_string(),
            target_date,
            lots,
            feedback_by_item,
        };
        let (items, model) = self.planner.generate_daily(&input, cancel).await;
        let now = self.clock.now();
        let run = RecommendationRun {
            run_id: new_id(IdKind::Run, &self.ids.token()),
            household_id: household_id.to_string(),
            run_type: RunType::Daily,
            model,
            created_at: now,
            target_date,
        };

        let mut state = handle.lock().await;
        for item in &items {
            state.recommendations.insert(
                item.recommendation_id.clone(),
                RecommendationMeta {
                    item_keys: vec![item.item_key.clone()],
                },
            );
            let checkin_id = new_id(IdKind::Checkin, &self.ids.token());
            state.checkins.insert(
                checkin_id.clone(),
                MealCheckin {
                    checkin_id,
                    recommendation_id: item.recommendation_id.clone(),
                    household_id: household_id.to_string(),
                    meal_date: target_date,
                    title: item.title.clone(),
                    suggested_item_keys: vec![item.item_key.clone()],
                    status: MealCheckinStatus::Pending,
                    outcome: None,
                    lines: None,
                    notes: None,
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        let result = DailyRun {
            run: run.clone(),
            items,
        };
        state.daily_runs.push(result.clone());
        debug!(household_id, run_id = %run.run_id, count = result.items.len(), "generated daily recommendations");
        result
    }

    pub async fn generate_weekly(
        &self,
        household_id: &str,
        week_of: NaiveDate,
        lots: Vec<InventoryLot>,
        cancel: &CancellationToken,
    ) -> WeeklyRun {
        let handle = self.household(household_id).await;
        let feedback_by_item = { handle.lock().await.feedback_by_item() };

        let input = PlannerInput {
            household_id: household_id.to_string(),
            target_date: week_of,
            lots,
            feedback_by_item,
        };
        let (items, model) = self.planner.generate_weekly(&input, cancel).await;
        let now = self.clock.now();
        let run = RecommendationRun {
            run_id: new_id(IdKind::Run, &self.ids.token()),
            household_id: household_id.to_string(),
            run_type: RunType::Weekly,
            model,
            created_at: now,
            target_date: week_of,
        };

        let mut state = handle.lock().await;
        for item in &items {
            state.recommendations.insert(
                item.recommendation_id.clone(),
                RecommendationMeta {
                    item_keys: vec![item.item_key.clone()],
                },
            );
        }
        let result = WeeklyRun {
            run: run.clone(),
            items,
        };
        state.weekly_runs.insert(week_of, result.clone());
        state.latest_week_of = Some(week_of);
        debug!(household_id, run_id = %run.run_id, count = result.items.len(), "generated weekly recommendations");
        result
    }

    pub async fn latest_daily(&self, household_id: &str) -> Option<DailyRun> {
        self.household(household_id).await.lock().await.daily_runs.last().cloned()
    }

    pub async fn latest_weekly(&self, household_id: &str) -> Option<WeeklyRun> {
        let state = self.household(household_id).await;
        let state = state.lock().await;
        let week_of = state.latest_week_of?;
        state.weekly_runs.get(&week_of).cloned()
    }

    /// Returns the weekly run for `week_of` if given, otherwise the most
    /// recently generated weekly run for the household.
    pub async fn weekly_for(
        &self,
        household_id: &str,
        week_of: Option<NaiveDate>,
    ) -> Option<WeeklyRun> {
        let state = self.household(household_id).await;
        let state = state.lock().await;
        let week_of = week_of.or(state.latest_week_of)?;
        state.weekly_runs.get(&week_of).cloned()
    }

    /// Cross-household access 404s naturally: a recommendation is only
    /// ever indexed under the household it was generated for.
    pub async fn submit_feedback(
        &self,
        recommendation_id: &str,
        household_id: &str,
        req: SubmitFeedbackRequest,
    ) -> Result<RecommendationFeedback> {
        let handle = self.household(household_id).await;
        let mut state = handle.lock().await;
        if !state.recommendations.contains_key(recommendation_id) {
            return Err(Error::NotFound(format!(
                "recommendation {recommendation_id}"
            )));
        }

        let signal_value = req
            .signal_value
            .map(|v| v.max(-1.0).min(1.0))
            .unwrap_or_else(|| req.signal_type.default_value());
        let feedback = RecommendationFeedback {
            feedback_id: new_id(IdKind::Feedback, &self.ids.token()),
            recommendation_id: recommendation_id.to_string(),
            household_id: household_id.to_string(),
            signal_type: req.signal_type,
            signal_value,
            context: req.context,
            created_at: self.clock.now(),
        };
        state.feedback.push(feedback.clone());
        Ok(feedback)
    }

    pub async fn list_pending_checkins(&self, household_id: &str) -> Vec<MealCheckin> {
        let handle = self.household(household_id).await;
        let state = handle.lock().await;
        state
            .checkins
            .values()
            .filter(|c| c.status == MealCheckinStatus::Pending)
            .cloned()
            .collect()
    }

    /// Every check-in ever recorded for the household, regardless of
    /// status, so callers computing adherence over completed history
    /// aren't limited to the still-pending subset.
    pub async fn list_all_checkins(&self, household_id: &str) -> Vec<MealCheckin> {
        let handle = self.household(household_id).await;
        let state = handle.lock().await;
        state.checkins.values().cloned().collect()
    }

    /// Depletes via `ledger` without holding this engine's household lock
    /// across the await.
    pub async fn submit_meal_checkin(
        &self,
        ledger: &Ledger,
        checkin_id: &str,
        req: SubmitMealCheckinRequest,
    ) -> Result<SubmitCheckinOutcome> {
        let handle = self.household(&req.household_id).await;

        if let Some(key) = &req.idempotency_key {
            let state = handle.lock().await;
            if let Some(cached) = state
                .checkin_submit_idempotency
                .get(CHECKIN_SUBMIT_SCOPE, key)
            {
                return Ok(cached);
            }
        }

        let recommendation_id = {
            let state = handle.lock().await;
            let checkin = state
                .checkins
                .get(checkin_id)
                .ok_or_else(|| Error::NotFound(format!("checkin {checkin_id}")))?;
            if checkin.household_id != req.household_id {
                return Err(Error::HouseholdMismatch);
            }
            checkin.recommendation_id.clone()
        };

        let now = self.clock.now();
        let lines = req.lines.clone().unwrap_or_default();
        let has_consume_lines = lines.iter().any(|l| l.quantity_consumed > 0.0);
        let has_waste_lines = lines.iter().any(|l| l.quantity_wasted > 0.0);
        let mut events_created = 0usize;

        match req.outcome {
            MealCheckinOutcome::Made | MealCheckinOutcome::Partial if !has_consume_lines => {
                let mut state = handle.lock().await;
                finalize_checkin(
                    &mut state,
                    checkin_id,
                    MealCheckinStatus::NeedsAdjustment,
                    req.outcome,
                    lines.clone(),
                    req.notes.clone(),
                    now,
                );
            }
            MealCheckinOutcome::Made | MealCheckinOutcome::Partial => {
                let mut stock_exhausted = false;
                for line in &lines {
                    if line.quantity_consumed > 0.0 {
                        let result = ledger
                            .deplete_fefo(
                                &req.household_id,
                                DepletionLine {
                                    item_key: line.item_key.clone(),
                                    unit: line.unit,
                                    quantity: line.quantity_consumed,
                                },
                                InventoryEventType::Consume,
                                "checkin",
                                "meal check-in consumption",
                            )
                            .await?;
                        events_created += result.events.len();
                        if result.shortfall > 0.0 {
                            stock_exhausted = true;
                        }
                    }
                    if line.quantity_wasted > 0.0 {
                        let result = ledger
                            .deplete_fefo(
                                &req.household_id,
                                DepletionLine {
                                    item_key: line.item_key.clone(),
                                    unit: line.unit,
                                    quantity: line.quantity_wasted,
                                },
                                InventoryEventType::Waste,
                                "checkin",
                                "meal check-in waste",
                            )
                            .await?;
                        events_created += result.events.len();
                    }
                }
                let status = if stock_exhausted {
                    MealCheckinStatus::NeedsAdjustment
                } else {
                    MealCheckinStatus::Completed
                };
                let mut state = handle.lock().await;
                finalize_checkin(
                    &mut state,
                    checkin_id,
                    status,
                    req.outcome,
                    lines.clone(),
                    req.notes.clone(),
                    now,
                );
                if has_consume_lines {
                    push_implicit_feedback(
                        &mut state,
                        &recommendation_id,
                        &req.household_id,
                        FeedbackSignalType::Consumed,
                        now,
                        &*self.ids,
                    );
                }
                if has_waste_lines {
                    push_implicit_feedback(
                        &mut state,
                        &recommendation_id,
                        &req.household_id,
                        FeedbackSignalType::Wasted,
                        now,
                        &*self.ids,
                    );
                }
            }
            MealCheckinOutcome::Skipped => {
                let mut state = handle.lock().await;
                finalize_checkin(
                    &mut state,
                    checkin_id,
                    MealCheckinStatus::Completed,
                    req.outcome,
                    lines.clone(),
                    req.notes.clone(),
                    now,
                );
                push_implicit_feedback(
                    &mut state,
                    &recommendation_id,
                    &req.household_id,
                    FeedbackSignalType::Ignored,
                    now,
                    &*self.ids,
                );
            }
        }

        let checkin = {
            let state = handle.lock().await;
            state
                .checkins
                .get(checkin_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("checkin {checkin_id}")))?
        };
        let outcome = SubmitCheckinOutcome {
            checkin,
            events_created,
        };

        if let Some(key) = &req.idempotency_key {
            handle
                .lock()
                .await
                .checkin_submit_idempotency
                .put(CHECKIN_SUBMIT_SCOPE, key, outcome.clone());
        }

        Ok(outcome)
    }
}
