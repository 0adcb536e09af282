//! Types and small services shared by every `home-inventory-*` crate:
//! prefixed ids, the domain enumerations from the data model, an
//! injectable clock/id provider pair, and the crate-wide `Error`.

mod clock;
mod enums;
mod error;
mod idempotency;
mod ids;
mod items;

pub use clock::{Clock, IdProvider, SystemClock, UuidIds};
pub use idempotency::IdempotencyStore;
pub use enums::{
    ExpirySource, FeedbackSignalType, InventoryEventType, ItemCategory, JobStatus,
    MealCheckinOutcome, MealCheckinStatus, ReceiptStatus, RecommendationPriority, RiskLevel,
    ShoppingDraftItemStatus, ShoppingDraftStatus, Unit,
};
pub use error::{Error, Result};
pub use ids::{IdKind, new_id};
pub use clock::test_support;
pub use items::ReceiptItemInput;
