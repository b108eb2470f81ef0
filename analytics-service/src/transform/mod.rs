use std::collections::HashMap;

use resource_client::domain::{MeterType, NewReading, Reading, TariffConfig};
use time::macros::datetime;

use crate::analytics::compute_reading_cost;
use crate::pipeline::{Envelope, PipelineError, Transform};

/// Pure validation of a captured reading.
///
/// Rules:
/// - value must be finite and non-negative.
/// - ts must be within a broad sanity window [2000-01-01, 2100-01-01].
pub fn validate_reading(env: Envelope<NewReading>) -> Result<Envelope<NewReading>, PipelineError> {
    let r = &env.payload;

    if !r.value.is_finite() {
        return Err(PipelineError::Transform("value must be a finite number".to_string()));
    }
    if r.value < 0.0 {
        return Err(PipelineError::Transform("value must be non-negative".to_string()));
    }

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if r.ts < min_ts || r.ts > max_ts {
        return Err(PipelineError::Transform("timestamp out of allowed range".to_string()));
    }

    Ok(env)
}

fn hash_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

/// Content-derived reading id: the same meter, instant and value always map
/// to the same id.
pub fn reading_id(r: &NewReading) -> String {
    let mut hasher = blake3::Hasher::new();
    hash_str(&mut hasher, &r.meter_id);
    hasher.update(&r.ts.unix_timestamp_nanos().to_le_bytes());
    hasher.update(&r.value.to_bits().to_le_bytes());
    let hex = hasher.finalize().to_hex();
    format!("r_{}", &hex.as_str()[..16])
}

/// Prices a captured reading with the tariff in force.
pub fn price_reading(r: NewReading, meter_type: MeterType, tariff: &TariffConfig) -> Reading {
    let priced = compute_reading_cost(r.value, meter_type, tariff);
    Reading {
        id: reading_id(&r),
        meter_id: r.meter_id,
        ts: r.ts,
        value: r.value,
        manual: r.manual,
        cost_estimate: priced.cost,
        carbon_estimate: priced.carbon,
    }
}

#[derive(Clone, Default)]
pub struct ReadingValidation;

#[async_trait::async_trait]
impl Transform<NewReading, NewReading> for ReadingValidation {
    async fn apply(
        &self,
        input: Envelope<NewReading>,
    ) -> Result<Envelope<NewReading>, PipelineError> {
        match validate_reading(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_reading_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}

/// Pricing stage. Meter types are resolved from a snapshot taken when the
/// pipeline is built; readings for meters not in it are rejected.
#[derive(Clone)]
pub struct ReadingPricing {
    meters: HashMap<String, MeterType>,
    tariff: TariffConfig,
}

impl ReadingPricing {
    pub fn new(meters: HashMap<String, MeterType>, tariff: TariffConfig) -> Self {
        Self { meters, tariff }
    }
}

#[async_trait::async_trait]
impl Transform<NewReading, Reading> for ReadingPricing {
    async fn apply(&self, input: Envelope<NewReading>) -> Result<Envelope<Reading>, PipelineError> {
        let Some(&meter_type) = self.meters.get(&input.payload.meter_id) else {
            metrics::counter!("pricing_unknown_meter_total").increment(1);
            return Err(PipelineError::Transform(format!(
                "unknown meter '{}'",
                input.payload.meter_id
            )));
        };

        let tariff = self.tariff;
        Ok(input.map(|r| price_reading(r, meter_type, &tariff)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_client::domain::EnergyTariffModel;
    use time::macros::datetime;

    fn new_reading(value: f64) -> NewReading {
        NewReading {
            meter_id: "m-water".to_string(),
            ts: datetime!(2024-01-01 00:00:00 UTC),
            value,
            manual: true,
        }
    }

    fn tariff() -> TariffConfig {
        TariffConfig {
            water_rate_per_unit: 25.5,
            energy_tariff_model: EnergyTariffModel::Tiered,
            carbon_factor_energy: 0.457,
            carbon_factor_water: 0.3,
        }
    }

    #[test]
    fn reading_validation_accepts_valid_record() {
        let res = validate_reading(Envelope::new(new_reading(10.0)));
        assert!(res.is_ok());
    }

    #[test]
    fn reading_validation_rejects_negative_value() {
        let res = validate_reading(Envelope::new(new_reading(-0.1)));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[test]
    fn reading_validation_rejects_nan() {
        let res = validate_reading(Envelope::new(new_reading(f64::NAN)));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[test]
    fn reading_validation_rejects_out_of_range_ts() {
        let mut r = new_reading(1.0);
        r.ts = datetime!(1800-01-01 00:00:00 UTC);
        let res = validate_reading(Envelope::new(r));
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[test]
    fn reading_id_is_content_derived() {
        let a = reading_id(&new_reading(10.0));
        assert_eq!(a, reading_id(&new_reading(10.0)));
        assert_ne!(a, reading_id(&new_reading(10.5)));
        assert!(a.starts_with("r_"));
        assert_eq!(a.len(), 18);
    }

    #[test]
    fn price_reading_applies_water_tariff() {
        let r = price_reading(new_reading(100.0), MeterType::Water, &tariff());
        assert!((r.cost_estimate - 2550.0).abs() < 1e-9);
        assert!((r.carbon_estimate - 30.0).abs() < 1e-9);
        assert_eq!(r.meter_id, "m-water");
    }

    #[tokio::test]
    async fn pricing_stage_rejects_unknown_meter() {
        let stage = ReadingPricing::new(HashMap::new(), tariff());
        let res = stage.apply(Envelope::new(new_reading(1.0))).await;
        assert!(matches!(res, Err(PipelineError::Transform(_))));
    }

    #[tokio::test]
    async fn pricing_stage_prices_known_meter() {
        let meters = HashMap::from([("m-water".to_string(), MeterType::Water)]);
        let stage = ReadingPricing::new(meters, tariff());
        let env = stage.apply(Envelope::new(new_reading(2.0))).await.unwrap();
        assert!((env.payload.cost_estimate - 51.0).abs() < 1e-9);
    }
}
