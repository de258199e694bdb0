pub mod fallback;
pub mod gateway;
pub mod lang;
pub mod media;
pub mod router;
pub mod topic;
pub mod update;

use std::sync::Arc;

use crate::bot::gateway::MessagingGateway;
use crate::bot::router::UpdateRouter;
use crate::config::AppConfig;

/// Shared application state, accessible from all HTTP handlers.
pub struct AppState {
    pub config: AppConfig,
    pub gateway: Arc<dyn MessagingGateway>,
    pub router: UpdateRouter,
}
