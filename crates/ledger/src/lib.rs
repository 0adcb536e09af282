mod expiry;
mod ledger;
mod model;
mod requests;

pub use expiry::{ExpiryEstimate, days_until_expiry, estimate_lot_expiry, risk_level};
pub use ledger::{DepletionLine, DepletionResult, Ledger};
pub use model::{InventoryEvent, InventoryLot};
pub use requests::{
    AddManualItemsRequest, ManualEntryOutcome, OverrideLotExpiryRequest, ReviewMode,
    ReviewOutcome, ReviewReceiptRequest,
};
