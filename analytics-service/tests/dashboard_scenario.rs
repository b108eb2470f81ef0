use std::{io::Write, sync::Arc};

use analytics_service::{
    analytics::TrendDirection,
    config::ClimateConfig,
    dashboard::{analyze_resource, summarize, AlertLevel, DashboardInputs},
    fixtures::{SeedFixture, WATER_METER_ID},
    pipeline::Pipeline,
    sinks::RepositorySink,
    sources::ReadingCsvFileSource,
    transform::{ReadingPricing, ReadingValidation},
    SharedRepository,
};
use resource_client::db::{DynStore, JsonFileStore, MemoryStore, Repository};
use resource_client::domain::{MeterType, NewReading, Reading, Sensitivity};
use time::macros::datetime;

const WATER_CSV: &str = "ts,meter_id,value,manual\n\
2024-05-06T00:00:00Z,mtr_w_1,3000,false\n\
2024-05-13T00:00:00Z,mtr_w_1,3100,false\n\
2024-05-20T00:00:00Z,mtr_w_1,3050,false\n\
2024-05-27T00:00:00Z,mtr_w_1,-40,false\n\
2024-06-03T00:00:00Z,mtr_w_1,3200,false\n\
2024-06-03T00:00:00Z,mtr_gas_9,18,false\n\
2024-06-10T00:00:00Z,mtr_w_1,3150,false\n";

fn csv_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(WATER_CSV.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn seeded(store: DynStore) -> SharedRepository {
    let mut seed = SeedFixture::generate(42, datetime!(2024-06-12 09:00:00 UTC));
    seed.readings.clear();

    let mut repo = Repository::new(store);
    assert!(repo.init_with_seed(&seed).unwrap());
    Arc::new(tokio::sync::Mutex::new(repo))
}

async fn import(repo: SharedRepository, path: &std::path::Path) -> analytics_service::IngestSummary {
    let (meters, tariff) = {
        let repo = repo.lock().await;
        let meters = repo
            .meters(None)
            .unwrap()
            .into_iter()
            .map(|m| (m.id, m.meter_type))
            .collect();
        (meters, repo.company().unwrap().settings.tariff())
    };

    let pipeline: Pipeline<_, NewReading, Reading, _> = Pipeline {
        source: ReadingCsvFileSource::new(path),
        checks: vec![Arc::new(ReadingValidation)],
        stage: Arc::new(ReadingPricing::new(meters, tariff)),
        sink: RepositorySink::new(repo, 2),
    };
    pipeline.run().await.unwrap()
}

#[tokio::test]
async fn csv_import_feeds_the_dashboard() {
    let file = csv_file();
    let repo = seeded(Box::new(MemoryStore::new()));

    let summary = import(repo.clone(), file.path()).await;
    assert_eq!(summary.accepted, 5);
    assert_eq!(summary.rejected, 2);
    assert_eq!(summary.skipped, 0);

    let repo = repo.lock().await;
    let water = repo.readings(Some(MeterType::Water)).unwrap();
    let energy = repo.readings(Some(MeterType::Energy)).unwrap();
    let climate = repo.climate_data().unwrap();
    assert_eq!(water.len(), 5);
    assert!(energy.is_empty());
    assert!(water.iter().all(|r| r.meter_id == WATER_METER_ID && !r.manual));
    assert!((water[0].cost_estimate - 3000.0 * 25.5).abs() < 1e-9);
    assert!((water[0].carbon_estimate - 900.0).abs() < 1e-9);

    let analysis = analyze_resource(&water, Sensitivity::Balanced);
    assert_eq!(analysis.current, 3150.0);
    assert_eq!(analysis.average, 3087.5);
    assert_eq!(analysis.trend.direction, TrendDirection::Down);
    assert!((analysis.trend.percent - 1.5625).abs() < 1e-9);
    assert!(!analysis.is_anomaly);
    assert_eq!(analysis.risk, AlertLevel::Low);
    // least squares over x = 0..4: slope 40, intercept 3020
    assert!((analysis.predicted_next - 3220.0).abs() < 1e-6);

    let dashboard = summarize(
        &DashboardInputs {
            water: &water,
            energy: &energy,
            climate: &climate,
            sensitivity: Sensitivity::Balanced,
            temp_threshold: 35.0,
        },
        &ClimateConfig::default(),
    );
    // falling water, no energy, intensity 0.3 kg/m3
    assert_eq!(dashboard.efficiency_score, 100);
    assert!((dashboard.carbon.intensity - 0.3).abs() < 1e-12);
    let climate = dashboard.climate.expect("seeded climate data");
    assert_eq!(climate.current.ts, datetime!(2024-06-12 09:00:00 UTC));
}

#[tokio::test]
async fn imported_readings_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");
    let file = csv_file();

    let repo = seeded(Box::new(JsonFileStore::open(&path).unwrap()));
    import(repo, file.path()).await;

    let reopened = Repository::new(JsonFileStore::open(&path).unwrap());
    let water = reopened.readings(Some(MeterType::Water)).unwrap();
    assert_eq!(water.len(), 5);
    assert_eq!(water.last().map(|r| r.value), Some(3150.0));
}

#[tokio::test]
async fn reimporting_the_same_file_changes_nothing() {
    let file = csv_file();
    let repo = seeded(Box::new(MemoryStore::new()));
    import(repo.clone(), file.path()).await;

    let again = import(repo.clone(), file.path()).await;
    assert_eq!(again.accepted, 0);
    assert_eq!(again.skipped, 5);
    assert_eq!(again.rejected, 2);

    let water = repo.lock().await.readings(Some(MeterType::Water)).unwrap();
    assert_eq!(water.len(), 5);
    let analysis = analyze_resource(&water, Sensitivity::Balanced);
    assert_eq!(analysis.trend.direction, TrendDirection::Down);
    assert!((analysis.trend.percent - 1.5625).abs() < 1e-9);
}
