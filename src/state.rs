use std::sync::Arc;

use home_inventory_core::HomeInventoryCore;

/// Shared axum state: one cheaply-cloneable handle to the composition
/// root plus the worker shared-secret the internal-route middleware
/// checks against.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<HomeInventoryCore>,
    pub worker_token: Option<Arc<str>>,
}

impl AppState {
    pub fn new(core: Arc<HomeInventoryCore>, worker_token: Option<String>) -> Self {
        Self {
            core,
            worker_token: worker_token.map(|t| t.into()),
        }
    }
}
