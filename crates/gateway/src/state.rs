use std::sync::Arc;

use hubline_sessions::SessionRegistry;

use crate::hub::HubService;

/// Shared gateway runtime state, wrapped in Arc for use across handlers.
pub struct GatewayState {
    /// Path prefix of the application routes, e.g. `alixia`.
    pub app: String,
    /// Known web sessions.
    pub sessions: SessionRegistry,
    /// Where answers come from.
    pub hub: Arc<dyn HubService>,
    /// Server version string.
    pub version: String,
}

impl GatewayState {
    pub fn new(app: impl Into<String>, hub: Arc<dyn HubService>) -> Arc<Self> {
        Arc::new(Self {
            app: app.into(),
            sessions: SessionRegistry::new(),
            hub,
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }
}
