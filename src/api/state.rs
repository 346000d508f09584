use std::sync::Arc;

use crate::config::Config;
use crate::ledger::FjallStore;
use crate::observability::Metrics;
use crate::queue::JobBroker;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<FjallStore>,
    pub broker: Arc<JobBroker>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: FjallStore,
        broker: Arc<JobBroker>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            broker,
            metrics,
        }
    }
}
