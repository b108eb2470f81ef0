use super::round_half_up;

const ENERGY_TREND_WEIGHT: f64 = 1.5;
const WATER_TREND_WEIGHT: f64 = 1.2;
/// kgCO2e per unit above which the carbon penalty applies.
const CARBON_INTENSITY_LIMIT: f64 = 0.5;
const CARBON_PENALTY: f64 = 10.0;

/// Composite 0-100 efficiency score.
///
/// Trend inputs are signed percents: only rising consumption is penalised.
pub fn efficiency_score(energy_trend_pct: f64, water_trend_pct: f64, carbon_intensity: f64) -> u8 {
    let mut score = 100.0;

    if energy_trend_pct > 0.0 {
        score -= energy_trend_pct * ENERGY_TREND_WEIGHT;
    }
    if water_trend_pct > 0.0 {
        score -= water_trend_pct * WATER_TREND_WEIGHT;
    }
    if carbon_intensity > CARBON_INTENSITY_LIMIT {
        score -= CARBON_PENALTY;
    }

    round_half_up(score).clamp(0.0, 100.0) as u8
}
