use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::broker::TopicBroker;
use crate::services::gateway::Gateway;
use crate::state::notifications::NotificationStore;

/// Shared application state handed to every route.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let gateway = Gateway::new(NotificationStore::new(), TopicBroker::new());
        Self::with_gateway(Arc::new(gateway), config)
    }

    pub fn with_gateway(gateway: Arc<Gateway>, config: AppConfig) -> Self {
        Self { gateway, config }
    }
}
