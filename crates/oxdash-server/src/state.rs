use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use oxdash_alert::AlertService;
use oxdash_storage::AlertStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<AlertStore>,
    pub alerts: Arc<AlertService>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Wires the alert service over `store`, which also serves as the
    /// dashboard resolver.
    pub fn new(store: Arc<AlertStore>, config: ServerConfig) -> Self {
        let alerts = Arc::new(AlertService::with_options(
            store.clone(),
            store.clone(),
            config.service_options(),
        ));
        Self {
            store,
            alerts,
            start_time: Utc::now(),
            config: Arc::new(config),
        }
    }
}
