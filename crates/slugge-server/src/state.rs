use std::sync::Arc;

use slugge_engine::{AssistantConfig, AssistantService, ProcessingTracker};
use slugge_store::Database;

use crate::config::ServerConfig;
use crate::connection::ConnectionRegistry;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub tracker: Arc<ProcessingTracker>,
    pub assistant: Arc<AssistantService>,
    pub connections: Arc<ConnectionRegistry>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        db: Database,
        tracker: Arc<ProcessingTracker>,
        assistant_config: AssistantConfig,
    ) -> Self {
        Self {
            assistant: Arc::new(AssistantService::new(db.clone(), assistant_config)),
            connections: Arc::new(ConnectionRegistry::new(config.max_send_queue)),
            config: Arc::new(config),
            tracker,
            db,
        }
    }
}
