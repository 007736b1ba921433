//! Application State

use std::sync::Arc;

use vin_report::FulfillmentOrchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Preview, checkout and fulfillment workflow
    pub orchestrator: Arc<FulfillmentOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: FulfillmentOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}
