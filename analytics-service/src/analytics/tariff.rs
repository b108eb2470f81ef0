use resource_client::domain::{MeterType, TariffConfig};
use serde::Serialize;

/// Units billed at the first-tier energy rate.
pub const ENERGY_TIER_LIMIT: f64 = 1000.0;
pub const ENERGY_TIER_1_RATE: f64 = 1.6;
pub const ENERGY_TIER_2_RATE: f64 = 1.9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ReadingCost {
    pub cost: f64,
    /// kgCO2e.
    pub carbon: f64,
}

/// Monetary cost and carbon mass of a single reading.
///
/// Energy is billed on the tier schedule under both tariff models. Meter
/// types without a tariff path price to zero.
pub fn compute_reading_cost(value: f64, meter_type: MeterType, tariff: &TariffConfig) -> ReadingCost {
    match meter_type {
        MeterType::Water => ReadingCost {
            cost: value * tariff.water_rate_per_unit,
            carbon: value * tariff.carbon_factor_water,
        },
        MeterType::Energy => ReadingCost {
            cost: tiered_energy_cost(value),
            carbon: value * tariff.carbon_factor_energy,
        },
        MeterType::Unknown => ReadingCost::default(),
    }
}

fn tiered_energy_cost(value: f64) -> f64 {
    if value <= ENERGY_TIER_LIMIT {
        value * ENERGY_TIER_1_RATE
    } else {
        ENERGY_TIER_LIMIT * ENERGY_TIER_1_RATE + (value - ENERGY_TIER_LIMIT) * ENERGY_TIER_2_RATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resource_client::domain::EnergyTariffModel;

    fn tariff() -> TariffConfig {
        TariffConfig {
            water_rate_per_unit: 25.5,
            energy_tariff_model: EnergyTariffModel::Tiered,
            carbon_factor_energy: 0.457,
            carbon_factor_water: 0.3,
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn water_is_billed_at_flat_rate() {
        let c = compute_reading_cost(100.0, MeterType::Water, &tariff());
        assert!(close(c.cost, 2550.0));
        assert!(close(c.carbon, 30.0));
    }

    #[test]
    fn energy_within_first_tier() {
        let c = compute_reading_cost(1000.0, MeterType::Energy, &tariff());
        assert!(close(c.cost, 1600.0));
        assert!(close(c.carbon, 457.0));
    }

    #[test]
    fn energy_above_first_tier_uses_second_rate() {
        let c = compute_reading_cost(1500.0, MeterType::Energy, &tariff());
        assert!(close(c.cost, 1600.0 + 500.0 * 1.9));
        assert!(close(c.carbon, 1500.0 * 0.457));
    }

    #[test]
    fn flat_model_still_follows_tier_schedule() {
        let mut t = tariff();
        t.energy_tariff_model = EnergyTariffModel::Flat;
        let c = compute_reading_cost(2000.0, MeterType::Energy, &t);
        assert!(close(c.cost, 1600.0 + 1900.0));
    }

    #[test]
    fn unknown_meter_type_prices_to_zero() {
        let c = compute_reading_cost(5000.0, MeterType::Unknown, &tariff());
        assert_eq!(c, ReadingCost::default());
    }

    #[test]
    fn zero_reading_costs_nothing() {
        let c = compute_reading_cost(0.0, MeterType::Energy, &tariff());
        assert_eq!(c.cost, 0.0);
        assert_eq!(c.carbon, 0.0);
    }
}
