mod model;
mod pricing;
mod requests;
mod store;

pub use model::{PatchOutcome, ShoppingDraft, ShoppingDraftItem};
pub use pricing::{PriceIntelligence, compute_price_intelligence};
pub use requests::{GenerateShoppingDraftRequest, PatchShoppingDraftItemsRequest, ShoppingDraftItemPatch};
pub use store::ShoppingStore;
