use std::sync::Arc;

use crate::config::styles::StyleTable;
use crate::services::orchestrator::SwapOrchestrator;

/// Which external integrations are configured, reported by `/health`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integrations {
    pub storage: bool,
    pub inference: bool,
    pub face_detection: bool,
}

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SwapOrchestrator>,
    pub styles: Arc<StyleTable>,
    pub integrations: Integrations,
}

impl AppState {
    pub fn new(
        orchestrator: SwapOrchestrator,
        styles: Arc<StyleTable>,
        integrations: Integrations,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            styles,
            integrations,
        }
    }
}
