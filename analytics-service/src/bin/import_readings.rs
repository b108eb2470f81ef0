use std::{collections::HashMap, env, sync::Arc};

use analytics_service::{
    config::AppConfig,
    observability, open_repository,
    pipeline::Pipeline,
    sinks::RepositorySink,
    sources::ReadingCsvFileSource,
    transform::{ReadingPricing, ReadingValidation},
};
use anyhow::{bail, Result};
use resource_client::domain::{NewReading, Reading};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: import_readings <csv_file_path>");
    }
    let file_path = &args[1];

    // Point ANALYTICS_CONFIG at the same file the service uses so the import
    // lands in its store.
    let cfg = AppConfig::load()?;
    let repo = open_repository(&cfg)?;

    let (meters, tariff) = {
        let repo = repo.lock().await;
        let meters: HashMap<_, _> = repo
            .meters(None)?
            .into_iter()
            .map(|m| (m.id, m.meter_type))
            .collect();
        (meters, repo.company()?.settings.tariff())
    };

    let pipeline: Pipeline<_, NewReading, Reading, _> = Pipeline {
        source: ReadingCsvFileSource::new(file_path),
        checks: vec![Arc::new(ReadingValidation)],
        stage: Arc::new(ReadingPricing::new(meters, tariff)),
        sink: RepositorySink::new(repo, cfg.ingest.batch_size),
    };

    let summary = pipeline.run().await?;
    tracing::info!(
        file = %file_path,
        accepted = summary.accepted,
        rejected = summary.rejected,
        skipped = summary.skipped,
        "import finished"
    );

    Ok(())
}
