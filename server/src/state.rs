use crate::config::Config;
use forgelib::{ArtifactStore, JobOrchestrator};
use std::sync::Arc;

/// Shared state behind every route handler.
pub struct AppState {
    pub orchestrator: JobOrchestrator,
    pub store: Arc<dyn ArtifactStore>,
    pub config: Config,
}
