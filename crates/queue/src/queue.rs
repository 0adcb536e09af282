use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use home_inventory_shared::{
    Clock, Error, IdKind, IdProvider, IdempotencyStore, JobStatus, ReceiptStatus, Result,
    new_id, not_found,
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::model::{ClaimedJob, ReceiptProcessJob, ReceiptUpload, UploadTicket};
use crate::requests::{
    BatchEntryResult, CreateUploadRequest, EnqueueBatchRequest, EnqueueBatchResult,
    EnqueueDetails, SubmitJobResultRequest,
};

const UPLOAD_URL_TTL_MINUTES: i64 = 15;
const BATCH_ENQUEUE_SCOPE: &str = "batch_enqueue";

struct Inner {
    uploads: HashMap<String, ReceiptUpload>,
    jobs: HashMap<String, ReceiptProcessJob>,
    fifo: VecDeque<String>,
    dead_letters: Vec<String>,
}

/// Outcome of `submitJobResult`: the queue-side transition plus a flag
/// telling the caller (`home-inventory-core`) whether this was an
/// idempotent replay of an already-completed job, in which case it must
/// NOT re-run the ledger mutation.
pub struct SubmitOutcome {
    pub job: ReceiptProcessJob,
    pub receipt: ReceiptUpload,
    pub already_applied: bool,
}

/// The single-process, in-memory FIFO job queue plus job dictionary.
/// One mutex serializes every transition.
pub struct JobQueue {
    inner: Mutex<Inner>,
    batch_idempotency: IdempotencyStore<BatchEntryResult>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdProvider>,
    upload_origin: String,
    max_attempts: u32,
}

impl JobQueue {
    pub fn new(
        upload_origin: impl Into<String>,
        max_attempts: u32,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdProvider>,
    ) -> Self {
        Self {
            inner: Mutex::new(Inner {
                uploads: HashMap::new(),
                jobs: HashMap::new(),
                fifo: VecDeque::new(),
                dead_letters: Vec::new(),
            }),
            batch_idempotency: IdempotencyStore::new(),
            clock,
            ids,
            upload_origin: upload_origin.into(),
            max_attempts,
        }
    }

    fn sanitize_filename(name: &str) -> String {
        name.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    pub async fn create_upload(&self, req: CreateUploadRequest) -> Result<UploadTicket> {
        let now = self.clock.now();
        let receipt_upload_id = new_id(IdKind::Receipt, &self.ids.token());
        let sanitized = Self::sanitize_filename(&req.filename);
        let path = format!(
            "receipts/{}/{}/{}",
            req.household_id, receipt_upload_id, sanitized
        );
        let upload_url = format!("{}/upload/{}", self.upload_origin, receipt_upload_id);
        let expires_at = now + Duration::minutes(UPLOAD_URL_TTL_MINUTES);

        let upload = ReceiptUpload {
            receipt_upload_id: receipt_upload_id.clone(),
            household_id: req.household_id,
            filename: req.filename,
            content_type: req.content_type,
            storage_path: path.clone(),
            status: ReceiptStatus::Uploaded,
            created_at: now,
            updated_at: now,
            ocr_text: None,
            receipt_image_data_url: None,
            merchant_name: None,
            purchased_at: None,
            items: Vec::new(),
        };

        let mut inner = self.inner.lock().await;
        inner.uploads.insert(receipt_upload_id.clone(), upload);

        Ok(UploadTicket {
            receipt_upload_id,
            upload_url,
            path,
            expires_at,
        })
    }

    pub async fn enqueue_job(
        &self,
        household_id: &str,
        receipt_upload_id: &str,
        details: EnqueueDetails,
    ) -> Result<ReceiptProcessJob> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;

        let upload = inner
            .uploads
            .get_mut(receipt_upload_id)
            .ok_or_else(|| Error::NotFound(format!("receipt {receipt_upload_id}")))?;

        if upload.household_id != household_id {
            return Err(Error::HouseholdMismatch);
        }

        if let Some(ocr_text) = details.ocr_text {
            upload.ocr_text = Some(ocr_text);
        }
        if let Some(merchant_name) = details.merchant_name {
            upload.merchant_name = Some(merchant_name);
        }
        if let Some(purchased_at) = details.purchased_at {
            upload.purchased_at = Some(purchased_at);
        }
        if let Some(data_url) = details.receipt_image_data_url {
            upload.receipt_image_data_url = Some(data_url);
        }
        upload.status = ReceiptStatus::Processing;
        upload.updated_at = now;

        let job_id = new_id(IdKind::Job, &self.ids.token());
        let job = ReceiptProcessJob {
            job_id: job_id.clone(),
            receipt_upload_id: receipt_upload_id.to_string(),
            household_id: household_id.to_string(),
            status: JobStatus::Queued,
            attempts: 0,
            created_at: now,
            updated_at: now,
            error: None,
            notes: None,
        };
        inner.jobs.insert(job_id.clone(), job.clone());
        inner.fifo.push_back(job_id);

        info!(household_id, receipt_upload_id, job_id = %job.job_id, "job enqueued");
        Ok(job)
    }

    /// `idempotencyKey` is scoped to `batch_enqueue`; a repeat entry
    /// returns the original job result without re-enqueueing.
    pub async fn enqueue_batch(&self, req: EnqueueBatchRequest) -> Result<EnqueueBatchResult> {
        if req.receipts.is_empty() || req.receipts.len() > 10 {
            return Err(Error::InvalidRequest(
                "batch must contain between 1 and 10 receipts".to_string(),
            ));
        }

        let mut results = Vec::with_capacity(req.receipts.len());
        for entry in req.receipts {
            if let Some(key) = &entry.idempotency_key {
                if let Some(cached) = self.batch_idempotency.get(BATCH_ENQUEUE_SCOPE, key) {
                    results.push(cached);
                    continue;
                }
            }

            let result = self.enqueue_batch_entry(entry.clone()).await;
            if let Some(key) = &entry.idempotency_key {
                self.batch_idempotency
                    .put(BATCH_ENQUEUE_SCOPE, key, result.clone());
            }
            results.push(result);
        }

        let accepted = results.iter().filter(|r| r.accepted).count();
        let rejected = results.len() - accepted;
        Ok(EnqueueBatchResult {
            requested: results.len(),
            accepted,
            rejected,
            results,
        })
    }

    async fn enqueue_batch_entry(
        &self,
        entry: crate::requests::BatchReceiptEntry,
    ) -> BatchEntryResult {
        if entry.details.ocr_text.is_none() && entry.details.receipt_image_data_url.is_none() {
            return BatchEntryResult {
                accepted: false,
                receipt_upload_id: None,
                job_id: None,
                error: Some("one of ocrText or receiptImageDataUrl is required".to_string()),
            };
        }

        let ticket = match self
            .create_upload(CreateUploadRequest {
                household_id: entry.household_id.clone(),
                filename: entry.filename,
                content_type: entry.content_type,
            })
            .await
        {
            Ok(t) => t,
            Err(e) => {
                return BatchEntryResult {
                    accepted: false,
                    receipt_upload_id: None,
                    job_id: None,
                    error: Some(e.to_string()),
                };
            }
        };

        match self
            .enqueue_job(&entry.household_id, &ticket.receipt_upload_id, entry.details)
            .await
        {
            Ok(job) => BatchEntryResult {
                accepted: true,
                receipt_upload_id: Some(ticket.receipt_upload_id),
                job_id: Some(job.job_id),
                error: None,
            },
            Err(e) => BatchEntryResult {
                accepted: false,
                receipt_upload_id: Some(ticket.receipt_upload_id),
                job_id: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Pops the FIFO head, skipping any id whose job or upload vanished
    /// or is no longer `queued`.
    pub async fn claim_next_job(&self) -> Result<Option<ClaimedJob>> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;

        loop {
            let Some(job_id) = inner.fifo.pop_front() else {
                return Ok(None);
            };

            let Some(job) = inner.jobs.get(&job_id) else {
                continue;
            };
            if job.status != JobStatus::Queued {
                continue;
            }
            let Some(receipt) = inner.uploads.get(&job.receipt_upload_id) else {
                continue;
            };
            let receipt = receipt.clone();

            let job = inner.jobs.get_mut(&job_id).expect("checked above");
            job.status = JobStatus::Processing;
            job.attempts += 1;
            job.updated_at = now;
            let job = job.clone();

            return Ok(Some(ClaimedJob { job, receipt }));
        }
    }

    /// Returns the updated job/receipt and whether this was an
    /// idempotent replay so the caller skips the ledger mutation on
    /// replay.
    pub async fn submit_job_result(
        &self,
        job_id: &str,
        req: SubmitJobResultRequest,
    ) -> Result<SubmitOutcome> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;

        let job = inner
            .jobs
            .get(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?
            .clone();

        if job.status == JobStatus::Completed {
            let receipt = inner
                .uploads
                .get(&job.receipt_upload_id)
                .ok_or_else(|| Error::NotFound(format!("receipt {}", job.receipt_upload_id)))?
                .clone();
            return Ok(SubmitOutcome {
                job,
                receipt,
                already_applied: true,
            });
        }

        if job.status != JobStatus::Processing && job.status != JobStatus::Queued {
            not_found!("job {job_id} is not claimable");
        }

        if req.items.is_empty() {
            return Err(Error::InvalidRequest(
                "submitJobResult requires at least one item".to_string(),
            ));
        }

        let upload = inner
            .uploads
            .get_mut(&job.receipt_upload_id)
            .ok_or_else(|| Error::NotFound(format!("receipt {}", job.receipt_upload_id)))?;
        if let Some(merchant_name) = req.merchant_name {
            upload.merchant_name = Some(merchant_name);
        }
        if let Some(purchased_at) = req.purchased_at {
            upload.purchased_at = Some(purchased_at);
        }
        if let Some(ocr_text) = req.ocr_text {
            upload.ocr_text = Some(ocr_text);
        }
        upload.items = req.items;
        upload.status = ReceiptStatus::Parsed;
        upload.updated_at = now;
        let receipt = upload.clone();

        let job_mut = inner.jobs.get_mut(job_id).expect("checked above");
        job_mut.status = JobStatus::Completed;
        job_mut.error = None;
        job_mut.notes = req.notes;
        job_mut.updated_at = now;
        let job = job_mut.clone();

        Ok(SubmitOutcome {
            job,
            receipt,
            already_applied: false,
        })
    }

    pub async fn fail_job(&self, job_id: &str, error: &str) -> Result<ReceiptProcessJob> {
        let now = self.clock.now();
        let mut inner = self.inner.lock().await;

        let job = inner
            .jobs
            .get(job_id)
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))?
            .clone();

        if job.attempts < self.max_attempts {
            let job_mut = inner.jobs.get_mut(job_id).expect("checked above");
            job_mut.status = JobStatus::Queued;
            job_mut.error = Some(error.to_string());
            job_mut.updated_at = now;
            let updated = job_mut.clone();
            inner.fifo.push_back(job_id.to_string());
            warn!(job_id, attempts = updated.attempts, "job failed, requeued");
            Ok(updated)
        } else {
            let job_mut = inner.jobs.get_mut(job_id).expect("checked above");
            job_mut.status = JobStatus::Failed;
            job_mut.error = Some(error.to_string());
            job_mut.updated_at = now;
            let updated = job_mut.clone();

            if let Some(upload) = inner.uploads.get_mut(&updated.receipt_upload_id) {
                upload.status = ReceiptStatus::Failed;
                upload.updated_at = now;
            }
            inner.dead_letters.push(job_id.to_string());
            warn!(job_id, "job dead-lettered after exhausting retries");
            Ok(updated)
        }
    }

    pub async fn get_job(&self, job_id: &str) -> Result<ReceiptProcessJob> {
        let inner = self.inner.lock().await;
        inner
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("job {job_id}")))
    }

    pub async fn get_receipt(&self, receipt_upload_id: &str) -> Result<ReceiptUpload> {
        let inner = self.inner.lock().await;
        inner
            .uploads
            .get(receipt_upload_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("receipt {receipt_upload_id}")))
    }

    pub async fn list_dead_letters(&self) -> Result<Vec<ReceiptProcessJob>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .dead_letters
            .iter()
            .filter_map(|id| inner.jobs.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use home_inventory_shared::test_support::{FixedClock, SequentialIds};

    fn queue(max_attempts: u32) -> JobQueue {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new("2026-02-08T12:00:00Z".parse().unwrap()));
        let ids: Arc<dyn IdProvider> = Arc::new(SequentialIds::new());
        JobQueue::new("https://uploads.test", max_attempts, clock, ids)
    }

    async fn seed_queued_job(queue: &JobQueue) -> String {
        let ticket = queue
            .create_upload(CreateUploadRequest {
                household_id: "house_1".to_string(),
                filename: "receipt.jpg".to_string(),
                content_type: "image/jpeg".to_string(),
            })
            .await
            .unwrap();
        let job = queue
            .enqueue_job(
                "house_1",
                &ticket.receipt_upload_id,
                EnqueueDetails {
                    ocr_text: Some("Jasmine Rice 2kg".to_string()),
                    merchant_name: None,
                    purchased_at: None,
                    receipt_image_data_url: None,
                },
            )
            .await
            .unwrap();
        job.job_id
    }

    /// With `maxAttempts=2`, two failed claims dead-letter the job.
    #[tokio::test]
    async fn job_dead_letters_after_exhausting_retries() {
        let queue = queue(2);
        let job_id = seed_queued_job(&queue).await;

        let claimed = queue.claim_next_job().await.unwrap().unwrap();
        assert_eq!(claimed.job.attempts, 1);
        let job = queue.fail_job(&job_id, "ocr timeout").await.unwrap();
        assert_eq!(job.status, JobStatus::Queued);

        let claimed = queue.claim_next_job().await.unwrap().unwrap();
        assert_eq!(claimed.job.attempts, 2);
        let job = queue.fail_job(&job_id, "ocr timeout").await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);

        let dead_letters = queue.list_dead_letters().await.unwrap();
        assert_eq!(dead_letters.len(), 1);
        assert_eq!(dead_letters[0].job_id, job_id);
    }

    /// A completed job's duplicate `submitJobResult` call is a no-op
    /// replay, never transitioning the job or receipt state again.
    #[tokio::test]
    async fn submit_job_result_twice_is_idempotent() {
        let queue = queue(3);
        let job_id = seed_queued_job(&queue).await;
        queue.claim_next_job().await.unwrap();

        let req = SubmitJobResultRequest {
            merchant_name: Some("Fresh Market".to_string()),
            purchased_at: None,
            ocr_text: None,
            items: vec![home_inventory_shared::ReceiptItemInput {
                item_key: "jasmine_rice".to_string(),
                raw_name: "Jasmine Rice 2kg".to_string(),
                normalized_name: "jasmine rice".to_string(),
                quantity: 2.0,
                unit: home_inventory_shared::Unit::Kg,
                category: home_inventory_shared::ItemCategory::Grain,
                unit_price: None,
            }],
            notes: None,
        };

        let first = queue.submit_job_result(&job_id, req.clone()).await.unwrap();
        assert!(!first.already_applied);
        assert_eq!(first.job.status, JobStatus::Completed);

        let second = queue.submit_job_result(&job_id, req).await.unwrap();
        assert!(second.already_applied);
    }
}
