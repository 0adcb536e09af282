use std::sync::Arc;
use std::time::Duration;

use home_inventory_core::HomeInventoryCore;
use home_inventory_queue::SubmitJobResultRequest;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::extractor::ReceiptExtractor;

const DEFAULT_POLL_INTERVAL_MS: u64 = 3000;
const SUBMIT_BACKOFF_BASE_MS: u64 = 250;
const SUBMIT_MAX_ATTEMPTS: u32 = 3;

/// The worker pool loop: poll `claimNextJob` at `pollIntervalMs`,
/// extract, submit with exponential backoff, and `failJob` if submission
/// never succeeds. Cooperative shutdown via a `CancellationToken` so an
/// in-flight claim is allowed to finish before the poll loop exits.
pub struct WorkerPool<E: ReceiptExtractor> {
    core: Arc<HomeInventoryCore>,
    extractor: E,
    poll_interval: Duration,
}

impl<E: ReceiptExtractor> WorkerPool<E> {
    pub fn new(core: Arc<HomeInventoryCore>, extractor: E, poll_interval_ms: Option<u64>) -> Self {
        Self {
            core,
            extractor,
            poll_interval: Duration::from_millis(poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS)),
        }
    }

    /// Runs until `cancel` fires. A sleeping poll wait is cancelled
    /// promptly; a job already claimed is always carried to completion
    /// (submit or dead-letter) before the next cancellation check.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "worker pool started");
        loop {
            if cancel.is_cancelled() {
                break;
            }

            match self.core.claim_next_job().await {
                Ok(Some(claimed)) => {
                    self.process(claimed.job.job_id, claimed.receipt).await;
                }
                Ok(None) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
                Err(err) => {
                    warn!(error = %err, "claimNextJob failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
            }
        }
        info!("worker pool stopped");
    }

    async fn process(&self, job_id: String, receipt: home_inventory_queue::ReceiptUpload) {
        let extracted = match self.extractor.extract(&receipt).await {
            Ok(extracted) => extracted,
            Err(err) => {
                warn!(job_id, error = %err, "extraction failed");
                self.dead_letter(&job_id, &err.to_string()).await;
                return;
            }
        };

        let req = SubmitJobResultRequest {
            merchant_name: extracted.merchant_name,
            purchased_at: extracted.purchased_at,
            ocr_text: receipt.ocr_text.clone(),
            items: extracted.items,
            notes: extracted.notes,
        };

        let mut last_error = String::new();
        for attempt in 1..=SUBMIT_MAX_ATTEMPTS {
            match self.core.submit_job_result(&job_id, req.clone()).await {
                Ok(_) => {
                    info!(job_id, attempt, "job result submitted");
                    return;
                }
                Err(err) => {
                    last_error = err.to_string();
                    warn!(job_id, attempt, error = %last_error, "submitJobResult failed");
                    if attempt < SUBMIT_MAX_ATTEMPTS {
                        let backoff = SUBMIT_BACKOFF_BASE_MS * 2u64.pow(attempt - 1);
                        tokio::time::sleep(Duration::from_millis(backoff)).await;
                    }
                }
            }
        }
        self.dead_letter(&job_id, &last_error).await;
    }

    async fn dead_letter(&self, job_id: &str, error: &str) {
        if let Err(err) = self.core.fail_job(job_id, error).await {
            warn!(job_id, error = %err, "failJob itself failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::HeuristicExtractor;
    use home_inventory_ledger::Ledger;
    use home_inventory_planner::{HeuristicPlanner, Planner, RecommendationEngine};
    use home_inventory_queue::{CreateUploadRequest, EnqueueDetails, JobQueue};
    use home_inventory_shared::test_support::{FixedClock, SequentialIds};
    use home_inventory_shared::{Clock, IdProvider};
    use home_inventory_shopping::ShoppingStore;

    fn build_core_with_max_attempts(max_attempts: u32) -> Arc<HomeInventoryCore> {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new("2026-02-01T00:00:00Z".parse().unwrap()));
        let ids: Arc<dyn IdProvider> = Arc::new(SequentialIds::new());
        let queue = Arc::new(JobQueue::new("https://uploads.test", max_attempts, clock.clone(), ids.clone()));
        let ledger = Arc::new(Ledger::new(clock.clone(), ids.clone()));
        let planner: Box<dyn Planner> = Box::new(HeuristicPlanner::new(ids.clone()));
        let recommendations = Arc::new(RecommendationEngine::new(planner, clock.clone(), ids.clone()));
        let shopping = Arc::new(ShoppingStore::new(clock.clone(), ids.clone()));
        Arc::new(HomeInventoryCore::new(queue, ledger, recommendations, shopping, clock, ids))
    }

    fn build_core() -> Arc<HomeInventoryCore> {
        build_core_with_max_attempts(3)
    }

    #[tokio::test]
    async fn claims_extracts_and_submits_a_queued_job() {
        let core = build_core();
        let ticket = core
            .queue()
            .create_upload(CreateUploadRequest {
                household_id: "house_1".to_string(),
                filename: "receipt.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
            })
            .await
            .unwrap();
        core.queue()
            .enqueue_job(
                "house_1",
                &ticket.receipt_upload_id,
                EnqueueDetails {
                    ocr_text: Some("2 whole milk\n3 bananas".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let pool = WorkerPool::new(core.clone(), HeuristicExtractor, Some(10));
        let claimed = core.claim_next_job().await.unwrap().unwrap();
        pool.process(claimed.job.job_id.clone(), claimed.receipt).await;

        let job = core.queue().get_job(&claimed.job.job_id).await.unwrap();
        assert_eq!(job.status, home_inventory_shared::JobStatus::Completed);
        let lots = core.inventory_snapshot("house_1").await;
        assert_eq!(lots.len(), 2);
    }

    #[tokio::test]
    async fn dead_letters_after_extraction_failures_exhaust_attempts() {
        let core = build_core_with_max_attempts(1);
        let ticket = core
            .queue()
            .create_upload(CreateUploadRequest {
                household_id: "house_1".to_string(),
                filename: "receipt.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
            })
            .await
            .unwrap();
        core.queue()
            .enqueue_job("house_1", &ticket.receipt_upload_id, EnqueueDetails::default())
            .await
            .unwrap();

        let pool = WorkerPool::new(core.clone(), HeuristicExtractor, Some(10));
        let claimed = core.claim_next_job().await.unwrap().unwrap();
        pool.process(claimed.job.job_id.clone(), claimed.receipt).await;

        let job = core.queue().get_job(&claimed.job.job_id).await.unwrap();
        assert_eq!(job.status, home_inventory_shared::JobStatus::Failed);
        let dead_letters = core.queue().list_dead_letters().await.unwrap();
        assert_eq!(dead_letters.len(), 1);
    }
}
