use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use home_inventory_ledger::{InventoryEvent, InventoryLot, Ledger};
use home_inventory_planner::{
    DailyRun, MealCheckin, RecommendationEngine, RecommendationFeedback, SubmitCheckinOutcome,
    SubmitFeedbackRequest, SubmitMealCheckinRequest, WeeklyRun,
};
use home_inventory_queue::{ClaimedJob, JobQueue, ReceiptProcessJob, SubmitJobResultRequest};
use home_inventory_shared::{Clock, Error, IdProvider, Result};
use home_inventory_shopping::{
    GenerateShoppingDraftRequest, PatchOutcome, PatchShoppingDraftItemsRequest, ShoppingDraft,
    ShoppingStore,
};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::health::{PantryHealthScore, compute_pantry_health};
use crate::requests::{GenerateDailyRequest, GenerateWeeklyRequest, PantryHealthRequest};

/// Outcome of `submitJobResult` surfaced to the transport layer: the
/// updated job/receipt plus the ledger events created, if any.
/// `ledger_events` is empty on an idempotent replay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResultOutcome {
    pub job: ReceiptProcessJob,
    pub receipt: home_inventory_queue::ReceiptUpload,
    pub ledger_events: Vec<InventoryEvent>,
    pub already_applied: bool,
}

/// The composition root: holds every subsystem and the per-household
/// pantry-health history that doesn't belong to any single subsystem.
/// Constructed once per process; mutation is otherwise delegated
/// entirely to the subsystems, each of which owns its own per-household
/// lock.
pub struct HomeInventoryCore {
    queue: Arc<JobQueue>,
    ledger: Arc<Ledger>,
    recommendations: Arc<RecommendationEngine>,
    shopping: Arc<ShoppingStore>,
    pantry_health_history: Mutex<HashMap<String, Vec<PantryHealthScore>>>,
    clock: Arc<dyn Clock>,
    #[allow(dead_code)]
    ids: Arc<dyn IdProvider>,
    worker_shutdown: Mutex<Option<CancellationToken>>,
    shutdown_token: CancellationToken,
}

impl HomeInventoryCore {
    pub fn new(
        queue: Arc<JobQueue>,
        ledger: Arc<Ledger>,
        recommendations: Arc<RecommendationEngine>,
        shopping: Arc<ShoppingStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            queue,
            ledger,
            recommendations,
            shopping,
            pantry_health_history: Mutex::new(HashMap::new()),
            clock,
            ids,
            worker_shutdown: Mutex::new(None),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    pub fn recommendations(&self) -> &Arc<RecommendationEngine> {
        &self.recommendations
    }

    pub fn shopping(&self) -> &Arc<ShoppingStore> {
        &self.shopping
    }

    /// Registers the worker pool's cancellation token so `shutdown()` can
    /// signal it. Called once after the worker pool task is spawned.
    pub async fn set_worker_cancellation(&self, token: CancellationToken) {
        *self.worker_shutdown.lock().await = Some(token);
    }

    /// Cooperative shutdown: cancels the worker pool's token so
    /// in-flight claims drain instead of being interrupted mid-mutation,
    /// and cancels any in-flight planner calls so their waiters release.
    pub async fn shutdown(&self) {
        if let Some(token) = self.worker_shutdown.lock().await.take() {
            token.cancel();
            info!("worker pool shutdown signalled");
        }
        self.shutdown_token.cancel();
    }

    /// Readiness signal for the `/v1/health/ready` route: alive once a
    /// worker pool has registered its token and hasn't been cancelled.
    pub async fn worker_pool_alive(&self) -> bool {
        matches!(&*self.worker_shutdown.lock().await, Some(token) if !token.is_cancelled())
    }

    pub async fn claim_next_job(&self) -> Result<Option<ClaimedJob>> {
        self.queue.claim_next_job().await
    }

    /// Orchestrates `submitJobResult`: the queue records the result; the
    /// ledger mutation only runs when this was not an idempotent replay
    /// of an already-completed job.
    pub async fn submit_job_result(
        &self,
        job_id: &str,
        req: SubmitJobResultRequest,
    ) -> Result<JobResultOutcome> {
        let purchased_at = req.purchased_at;
        let items = req.items.clone();
        let outcome = self.queue.submit_job_result(job_id, req).await?;

        let ledger_events = if outcome.already_applied {
            Vec::new()
        } else {
            self.ledger
                .apply_receipt(
                    &outcome.receipt.household_id,
                    &outcome.receipt.receipt_upload_id,
                    &items,
                    purchased_at,
                    "receipt",
                )
                .await?
        };

        Ok(JobResultOutcome {
            job: outcome.job,
            receipt: outcome.receipt,
            ledger_events,
            already_applied: outcome.already_applied,
        })
    }

    pub async fn fail_job(&self, job_id: &str, error: &str) -> Result<ReceiptProcessJob> {
        self.queue.fail_job(job_id, error).await
    }

    pub async fn inventory_snapshot(&self, household_id: &str) -> Vec<InventoryLot> {
        self.ledger.list_lots(household_id).await
    }

    pub async fn generate_daily(
        &self,
        household_id: &str,
        req: GenerateDailyRequest,
    ) -> DailyRun {
        let target_date = req.target_date.unwrap_or_else(|| self.clock.now().date_naive());
        let lots = self.ledger.list_lots(household_id).await;
        self.recommendations
            .generate_daily(household_id, target_date, lots, &self.shutdown_token)
            .await
    }

    pub async fn generate_weekly(
        &self,
        household_id: &str,
        req: GenerateWeeklyRequest,
    ) -> WeeklyRun {
        let week_of = req.week_of.unwrap_or_else(|| self.clock.now().date_naive());
        let lots = self.ledger.list_lots(household_id).await;
        self.recommendations
            .generate_weekly(household_id, week_of, lots, &self.shutdown_token)
            .await
    }

    pub async fn latest_daily(&self, household_id: &str) -> Option<DailyRun> {
        self.recommendations.latest_daily(household_id).await
    }

    pub async fn latest_weekly(&self, household_id: &str) -> Option<WeeklyRun> {
        self.recommendations.latest_weekly(household_id).await
    }

    pub async fn submit_feedback(
        &self,
        recommendation_id: &str,
        household_id: &str,
        req: SubmitFeedbackRequest,
    ) -> Result<RecommendationFeedback> {
        self.recommendations
            .submit_feedback(recommendation_id, household_id, req)
            .await
    }

    pub async fn list_pending_checkins(&self, household_id: &str) -> Vec<MealCheckin> {
        self.recommendations.list_pending_checkins(household_id).await
    }

    pub async fn submit_meal_checkin(
        &self,
        checkin_id: &str,
        req: SubmitMealCheckinRequest,
    ) -> Result<SubmitCheckinOutcome> {
        self.recommendations
            .submit_meal_checkin(&self.ledger, checkin_id, req)
            .await
    }

    /// Builds a shopping draft from the weekly recommendation run for
    /// `req.week_of`, or the household's most recent weekly run if no
    /// week is given. Fails if no weekly run exists for that week yet.
    pub async fn generate_shopping_draft(
        &self,
        household_id: &str,
        req: GenerateShoppingDraftRequest,
    ) -> Result<ShoppingDraft> {
        let week_of = req.week_of;
        let weekly_run = self
            .recommendations
            .weekly_for(household_id, week_of)
            .await
            .ok_or_else(|| {
                Error::InvalidRequest(
                    "no weekly recommendation run exists for this household for that week"
                        .to_string(),
                )
            })?;
        self.shopping
            .generate_draft(&self.ledger, household_id, &weekly_run, req)
            .await
    }

    pub async fn latest_shopping_draft(&self, household_id: &str) -> Option<ShoppingDraft> {
        self.shopping.latest(household_id).await
    }

    pub async fn patch_shopping_draft_items(
        &self,
        draft_id: &str,
        req: PatchShoppingDraftItemsRequest,
    ) -> Result<PatchOutcome> {
        let household_id = req.household_id.clone();
        self.shopping.patch_items(&household_id, draft_id, req).await
    }

    pub async fn finalize_shopping_draft(
        &self,
        household_id: &str,
        draft_id: &str,
    ) -> Result<ShoppingDraft> {
        self.shopping.finalize(household_id, draft_id).await
    }

    /// Appends to the household's history when `refresh` is set or this
    /// is the first computation ever.
    pub async fn pantry_health(
        &self,
        household_id: &str,
        req: PantryHealthRequest,
    ) -> PantryHealthScore {
        let as_of = self.clock.now();
        let lots = self.ledger.list_lots(household_id).await;
        let events = self.ledger.list_events(household_id).await;
        let checkins = self.recommendations.list_all_checkins(household_id).await;
        let score = compute_pantry_health(household_id, &lots, &events, &checkins, as_of);

        let mut history = self.pantry_health_history.lock().await;
        let entries = history.entry(household_id.to_string()).or_default();
        if req.refresh.unwrap_or(false) || entries.is_empty() {
            entries.push(score.clone());
        }
        score
    }

    pub async fn pantry_health_history(&self, household_id: &str) -> Vec<PantryHealthScore> {
        let history = self.pantry_health_history.lock().await;
        history.get(household_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use home_inventory_planner::{HeuristicPlanner, Planner};
    use home_inventory_shared::test_support::{FixedClock, SequentialIds};

    fn core() -> HomeInventoryCore {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new("2026-02-01T00:00:00Z".parse().unwrap()));
        let ids: Arc<dyn IdProvider> = Arc::new(SequentialIds::new());
        let queue = Arc::new(JobQueue::new("https://uploads.test", 3, clock.clone(), ids.clone()));
        let ledger = Arc::new(Ledger::new(clock.clone(), ids.clone()));
        let planner: Box<dyn Planner> = Box::new(HeuristicPlanner::new(ids.clone()));
        let recommendations = Arc::new(RecommendationEngine::new(planner, clock.clone(), ids.clone()));
        let shopping = Arc::new(ShoppingStore::new(clock.clone(), ids.clone()));
        HomeInventoryCore::new(queue, ledger, recommendations, shopping, clock, ids)
    }

    #[tokio::test]
    async fn pantry_health_of_empty_household_matches_defaults() {
        let core = core();
        let score = core
            .pantry_health("house_1", PantryHealthRequest::default())
            .await;
        assert_eq!(score.score, 62.0);
        let history = core.pantry_health_history("house_1").await;
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn shopping_draft_requires_weekly_run_first() {
        let core = core();
        let err = core
            .generate_shopping_draft("house_1", GenerateShoppingDraftRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
    }
}
