//! Heat stress and climate-driven operational risk.
//!
//! The heat stress index is the NOAA heat index: Steadman's simple formula,
//! switching to the Rothfusz regression at 80 F with NOAA's low- and
//! high-humidity adjustments.

use serde::{Deserialize, Serialize};

use super::round_half_up;

/// Indoor baseline above which cooling load starts to rise.
pub const DEFAULT_BASE_TEMP_C: f64 = 24.0;
/// Extra cooling load, in percent, per degree above the baseline.
pub const COOLING_LOAD_PER_DEGREE_PCT: f64 = 4.5;
/// Share of a facility's energy bill attributed to HVAC.
pub const HVAC_SHARE_OF_ENERGY_COST: f64 = 0.40;

const ROTHFUSZ_THRESHOLD_F: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Extreme => "EXTREME",
        }
    }
}

fn c_to_f(c: f64) -> f64 {
    c * 9.0 / 5.0 + 32.0
}

fn f_to_c(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// Apparent temperature in C for an air temperature in C and relative
/// humidity in percent.
pub fn heat_stress_index(temp_c: f64, humidity_pct: f64) -> f64 {
    let t = c_to_f(temp_c);
    let rh = humidity_pct;

    let mut hi = 0.5 * (t + 61.0 + ((t - 68.0) * 1.2) + (rh * 0.094));

    if hi >= ROTHFUSZ_THRESHOLD_F {
        hi = -42.379 + 2.04901523 * t + 10.14333127 * rh
            - 0.22475541 * t * rh
            - 0.00683783 * t * t
            - 0.05481717 * rh * rh
            + 0.00122874 * t * t * rh
            + 0.00085282 * t * rh * rh
            - 0.00000199 * t * t * rh * rh;

        if rh < 13.0 && t > 80.0 && t < 112.0 {
            hi -= ((13.0 - rh) / 4.0) * ((17.0 - (t - 95.0).abs()) / 17.0).sqrt();
        } else if rh > 85.0 && t > 80.0 && t < 87.0 {
            hi += ((rh - 85.0) / 10.0) * ((87.0 - t) / 5.0);
        }
    }

    f_to_c(hi)
}

/// Percent increase in cooling load for a forecast temperature, to one
/// decimal place. Zero at or below `base_temp_c`.
pub fn cooling_load_prediction(forecast_temp_c: f64, base_temp_c: f64) -> f64 {
    if forecast_temp_c <= base_temp_c {
        return 0.0;
    }
    let load = (forecast_temp_c - base_temp_c) * COOLING_LOAD_PER_DEGREE_PCT;
    (load * 10.0).round() / 10.0
}

/// Added daily cost, in whole currency units, of a cooling load increase.
pub fn predicted_cost_increase(cooling_load_pct: f64, daily_energy_cost: f64) -> i64 {
    let cooling_portion = daily_energy_cost * HVAC_SHARE_OF_ENERGY_COST;
    round_half_up(cooling_portion * (cooling_load_pct / 100.0)) as i64
}

/// Weighted 0-100 operational risk: heat 50%, air quality 30%, wind 20%.
pub fn operational_risk_index(hsi: f64, aqi: u32, wind_speed: f64) -> u8 {
    let hsi_score = ((hsi - 20.0) * 3.0).clamp(0.0, 100.0);
    let aqi_score = (aqi as f64 / 3.0).clamp(0.0, 100.0);
    let wind_score = (wind_speed * 2.0).clamp(0.0, 100.0);

    round_half_up(hsi_score * 0.5 + aqi_score * 0.3 + wind_score * 0.2) as u8
}

pub fn risk_level(hsi: f64) -> RiskLevel {
    if hsi < 27.0 {
        RiskLevel::Low
    } else if hsi < 32.0 {
        RiskLevel::Moderate
    } else if hsi < 41.0 {
        RiskLevel::High
    } else {
        RiskLevel::Extreme
    }
}
