use std::sync::Arc;

use analytics_service::{
    config::AppConfig,
    metrics_server,
    narrative::{NarrativeBackend, NarrativeService, UnavailableBackend},
    observability, open_repository,
    server::{self, AppState},
};
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr)?;
    }

    let repo = open_repository(&cfg)?;

    // No text-generation provider ships with the service; narratives use
    // their fallbacks until one is wired in here.
    let backend: Box<dyn NarrativeBackend> = Box::new(UnavailableBackend);
    let narrative = Arc::new(NarrativeService::new(backend, &cfg.narrative));

    let state = AppState {
        repo,
        narrative,
        climate: cfg.climate.clone(),
    };

    server::serve(&cfg.server.bind_addr, state).await
}
