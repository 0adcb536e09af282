//! The worker-pool runtime: polls the job queue, runs a
//! `ReceiptExtractor`, and submits results with retry.

mod extractor;
mod pool;

pub use extractor::{ExtractedReceipt, HeuristicExtractor, ReceiptExtractor};
pub use pool::WorkerPool;
