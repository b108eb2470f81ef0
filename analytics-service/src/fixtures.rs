//! Deterministic demo data for a fresh store.

use rand::{rngs::StdRng, Rng, SeedableRng};
use resource_client::db::SeedData;
use resource_client::domain::{
    ClimateSnapshot, ClimateSource, Company, CompanySettings, IndustryType, Meter, MeterType,
    NewReading, Reading, SubscriptionPlan, User, UserRole,
};
use time::{Duration, OffsetDateTime};

use crate::transform::price_reading;

const COMPANY_ID: &str = "comp_demo_01";
pub const WATER_METER_ID: &str = "mtr_w_1";
pub const ENERGY_METER_ID: &str = "mtr_e_1";

const HISTORY_WEEKS: i64 = 12;
const WATER_BASELINE: f64 = 3500.0;
const ENERGY_BASELINE: f64 = 11_000.0;
const CLIMATE_DAYS: i64 = 7;
const TRIAL_ELAPSED_DAYS: i64 = 3;

pub struct SeedFixture;

impl SeedFixture {
    /// Same `seed` and `now` always give the same data.
    pub fn generate(seed: u64, now: OffsetDateTime) -> SeedData {
        let mut rng = StdRng::seed_from_u64(seed);

        let company = Company {
            id: COMPANY_ID.to_string(),
            name: "Delta Valley Foods".to_string(),
            industry: IndustryType::Factory,
            trial_start: now - Duration::days(TRIAL_ELAPSED_DAYS),
            subscription_plan: SubscriptionPlan::Trial,
            settings: CompanySettings {
                reporting_email: "operations@deltavalley.example".to_string(),
                ..CompanySettings::default()
            },
        };

        let user = User {
            id: "usr_manager_01".to_string(),
            name: "Plant Manager".to_string(),
            email: "manager@deltavalley.example".to_string(),
            company_id: COMPANY_ID.to_string(),
            role: UserRole::Manager,
        };

        let meters = vec![
            Meter {
                id: WATER_METER_ID.to_string(),
                company_id: COMPANY_ID.to_string(),
                name: "Processing Line Water".to_string(),
                meter_type: MeterType::Water,
                unit: "m3".to_string(),
            },
            Meter {
                id: ENERGY_METER_ID.to_string(),
                company_id: COMPANY_ID.to_string(),
                name: "Main HVAC Energy".to_string(),
                meter_type: MeterType::Energy,
                unit: "kWh".to_string(),
            },
        ];

        let tariff = company.settings.tariff();
        let mut readings = Vec::with_capacity(2 * HISTORY_WEEKS as usize);
        for i in (1..=HISTORY_WEEKS).rev() {
            let ts = now - Duration::weeks(i);
            // warmer weeks draw more of both resources
            let seasonal = 1.0 + (i as f64 / 4.0).sin() * 0.1;

            let water = (WATER_BASELINE * seasonal + rng.gen_range(-100.0..100.0)).floor();
            readings.push(seed_reading(WATER_METER_ID, ts, water, MeterType::Water, &tariff));

            let energy = (ENERGY_BASELINE * seasonal + rng.gen_range(-250.0..250.0)).floor();
            readings.push(seed_reading(ENERGY_METER_ID, ts, energy, MeterType::Energy, &tariff));
        }

        let climate = (0..CLIMATE_DAYS)
            .map(|i| ClimateSnapshot {
                ts: now + Duration::days(i - 2),
                temp_c: 32.0 + rng.gen_range(0.0..5.0),
                humidity: 40.0 + rng.gen_range(0.0..20.0),
                wind_speed: 12.0,
                aqi: 65 + rng.gen_range(0..30),
                pm25: 15.0,
                condition: if i % 2 == 0 { "Clear Sky" } else { "Haze" }.to_string(),
                source: match i {
                    0 | 1 => ClimateSource::History,
                    2 => ClimateSource::Realtime,
                    _ => ClimateSource::Forecast,
                },
            })
            .collect();

        SeedData {
            company,
            user,
            meters,
            readings,
            climate,
        }
    }
}

fn seed_reading(
    meter_id: &str,
    ts: OffsetDateTime,
    value: f64,
    meter_type: MeterType,
    tariff: &resource_client::domain::TariffConfig,
) -> Reading {
    let captured = NewReading {
        meter_id: meter_id.to_string(),
        ts,
        value,
        manual: true,
    };
    price_reading(captured, meter_type, tariff)
}
