mod config;
mod routes;
mod schemas;
mod state;

use crate::config::{Config, ReconBackend};
use crate::state::AppState;
use forgelib::adapter::{HttpReconstruction, ReconstructionAdapter, StubReconstruction};
use forgelib::{ArtifactStore, DiskStore, JobOrchestrator};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let router = build(config).await?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, router).await?;
    Ok(())
}

/// Wire the store, adapter and orchestrator into a ready-to-serve router.
async fn build(config: Config) -> anyhow::Result<axum::Router> {
    let store: Arc<dyn ArtifactStore> = Arc::new(
        DiskStore::open(config.artifact_dir.clone(), config.public_base_url.clone()).await?,
    );
    let adapter: Arc<dyn ReconstructionAdapter> = match &config.backend {
        ReconBackend::Stub { delay } => Arc::new(StubReconstruction::with_delay(*delay)),
        ReconBackend::Http { endpoint } => Arc::new(HttpReconstruction::new(endpoint.clone())),
    };
    let orchestrator =
        JobOrchestrator::spawn(Arc::clone(&store), adapter, config.orchestrator.clone());
    let state = Arc::new(AppState {
        orchestrator,
        store,
        config,
    });
    Ok(routes::api_routes(state))
}
