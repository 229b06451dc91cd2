//! Shared application state.

use crate::adapter::AdapterRegistry;
use crate::config::Config;
use crate::gateway::{GatewayPolicy, PredictionGateway};

/// Shared application state passed to all handlers.
pub struct AppState {
    pub config: Config,
    pub gateway: PredictionGateway,
}

impl AppState {
    pub fn new(config: Config, adapters: AdapterRegistry) -> Self {
        let policy = GatewayPolicy::from(&config.gateway);
        Self {
            config,
            gateway: PredictionGateway::new(adapters, policy),
        }
    }
}
