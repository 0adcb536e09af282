//! Job queue and worker protocol: a single-process, in-memory FIFO
//! queue of receipt-processing jobs plus the receipt uploads they
//! process, with claim/result/fail and dead-lettering.

mod model;
mod queue;
mod requests;

pub use model::{ClaimedJob, ReceiptProcessJob, ReceiptUpload, UploadTicket};
pub use queue::{JobQueue, SubmitOutcome};
pub use requests::{
    BatchEntryResult, BatchReceiptEntry, CreateUploadRequest, EnqueueBatchRequest,
    EnqueueBatchResult, EnqueueDetails, SubmitJobResultRequest,
};
