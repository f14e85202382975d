use querygate_core::GatewayConfig;
use querygate_policy::PolicyTable;
use querygate_runtime::{Authenticator, ConnectionPool, QueryDispatcher};
use std::sync::Arc;

/// Shared application state.
///
/// Everything in here is immutable after startup; per-request data never
/// lands in it.
pub struct AppState {
    pub authenticator: Authenticator,
    pub dispatcher: QueryDispatcher,
}

impl AppState {
    pub fn new(pool: Arc<dyn ConnectionPool>, cfg: &GatewayConfig) -> Self {
        let policy = Arc::new(PolicyTable::standard());
        Self {
            authenticator: Authenticator::new(pool.clone(), policy.clone(), &cfg.auth),
            dispatcher: QueryDispatcher::new(pool, policy),
        }
    }
}
