pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod fixtures;
pub mod metrics_server;
pub mod narrative;
pub mod observability;
pub mod pipeline;
pub mod reports;
pub mod server;
pub mod sinks;
pub mod sources;
pub mod transform;

use std::sync::Arc;

use resource_client::db::{DynStore, Repository};

pub use pipeline::{Envelope, IngestSummary, Pipeline};

/// Repository handle shared by the API handlers and the ingestion sink.
pub type SharedRepository = Arc<tokio::sync::Mutex<Repository<DynStore>>>;

/// Opens the configured store and seeds it with demo data on first use.
pub fn open_repository(cfg: &config::AppConfig) -> anyhow::Result<SharedRepository> {
    use anyhow::Context;
    use resource_client::db::{JsonFileStore, MemoryStore};

    let store: DynStore = match &cfg.store.path {
        Some(path) => {
            let store = JsonFileStore::open(path)
                .with_context(|| format!("failed to open store {}", path.display()))?;
            tracing::info!(path = %path.display(), "using file store");
            Box::new(store)
        }
        None => {
            tracing::warn!("no store path configured, data is kept in memory only");
            Box::new(MemoryStore::new())
        }
    };

    let mut repo = Repository::new(store);
    let seed = fixtures::SeedFixture::generate(cfg.seed.rng_seed, time::OffsetDateTime::now_utc());
    if repo.init_with_seed(&seed).context("failed to seed store")? {
        tracing::info!(rng_seed = cfg.seed.rng_seed, "store seeded with demo data");
    }

    Ok(Arc::new(tokio::sync::Mutex::new(repo)))
}
