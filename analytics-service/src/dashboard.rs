//! Composition of the analytics engines into the figures the dashboard shows.

use resource_client::domain::{current_snapshot, ClimateSnapshot, Reading, Sensitivity};
use serde::Serialize;

use crate::analytics::{
    compute_trend, cooling_load_prediction, detect_anomaly, efficiency_score, heat_stress_index,
    operational_risk_index, predict_next, predicted_cost_increase, risk_level, RiskLevel, Trend,
};
use crate::config::ClimateConfig;

/// Readings preceding the latest one that make up the "usual" level.
const AVERAGE_WINDOW: usize = 4;
/// Periods per year used to annualise carbon totals.
const PERIODS_PER_YEAR: f64 = 52.0;
/// Value of one kg of avoided CO2e in reduction scenarios.
const CARBON_PRICE_PER_KG: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceAnalysis {
    pub current: f64,
    /// Mean of up to four readings before the latest; 0 without history.
    pub average: f64,
    pub trend: Trend,
    pub is_anomaly: bool,
    pub predicted_next: f64,
    pub risk: AlertLevel,
}

pub fn analyze_resource(readings: &[Reading], sensitivity: Sensitivity) -> ResourceAnalysis {
    let current = readings.last().map_or(0.0, |r| r.value);
    let history = &readings[..readings.len().saturating_sub(1)];
    let baseline = &history[history.len().saturating_sub(AVERAGE_WINDOW)..];
    let average = if baseline.is_empty() {
        0.0
    } else {
        baseline.iter().map(|r| r.value).sum::<f64>() / baseline.len() as f64
    };

    let is_anomaly = detect_anomaly(readings, sensitivity);
    ResourceAnalysis {
        current,
        average,
        trend: compute_trend(readings),
        is_anomaly,
        predicted_next: predict_next(readings),
        risk: if is_anomaly {
            AlertLevel::High
        } else {
            AlertLevel::Low
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarbonMetrics {
    pub total_kg: f64,
    pub total_tonnes: f64,
    /// kgCO2e per unit consumed across both resources.
    pub intensity: f64,
    /// Sum of the water and energy averages over their last four readings.
    pub rolling_average_kg: f64,
    /// Carbon of the latest water plus latest energy reading.
    pub current_period_kg: f64,
    /// 100 minus the relative deviation of the current period from the
    /// rolling average, in percent.
    pub stability_score: f64,
    pub projected_annual_kg: f64,
}

fn tail(readings: &[Reading], n: usize) -> &[Reading] {
    &readings[readings.len().saturating_sub(n)..]
}

fn mean_carbon(readings: &[Reading]) -> f64 {
    if readings.is_empty() {
        return 0.0;
    }
    readings.iter().map(|r| r.carbon_estimate).sum::<f64>() / readings.len() as f64
}

pub fn carbon_metrics(water: &[Reading], energy: &[Reading]) -> CarbonMetrics {
    let total_kg: f64 = water
        .iter()
        .chain(energy.iter())
        .map(|r| r.carbon_estimate)
        .sum();
    let consumed: f64 = water.iter().chain(energy.iter()).map(|r| r.value).sum();
    let intensity = if consumed > 0.0 {
        total_kg / consumed
    } else {
        0.0
    };

    let rolling_average_kg =
        mean_carbon(tail(water, AVERAGE_WINDOW)) + mean_carbon(tail(energy, AVERAGE_WINDOW));
    let current_period_kg = water.last().map_or(0.0, |r| r.carbon_estimate)
        + energy.last().map_or(0.0, |r| r.carbon_estimate);

    let deviation = if rolling_average_kg != 0.0 {
        ((current_period_kg - rolling_average_kg) / rolling_average_kg).abs()
    } else {
        0.0
    };
    let stability_score = (100.0 - deviation * 100.0).clamp(0.0, 100.0);

    let periods = energy.len().max(1) as f64;
    CarbonMetrics {
        total_kg,
        total_tonnes: total_kg / 1000.0,
        intensity,
        rolling_average_kg,
        current_period_kg,
        stability_score,
        projected_annual_kg: total_kg / periods * PERIODS_PER_YEAR,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReductionScenario {
    pub target_pct: f64,
    pub saved_carbon_kg: f64,
    pub saved_cost: f64,
    pub new_score: f64,
}

/// What-if for cutting projected annual emissions by `target_pct` percent.
pub fn reduction_scenario(metrics: &CarbonMetrics, target_pct: f64) -> ReductionScenario {
    let saved_carbon_kg = metrics.projected_annual_kg * (target_pct / 100.0);
    ReductionScenario {
        target_pct,
        saved_carbon_kg,
        saved_cost: saved_carbon_kg * CARBON_PRICE_PER_KG,
        new_score: (metrics.stability_score + target_pct / 2.0).min(100.0),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateAssessment {
    pub current: ClimateSnapshot,
    pub hsi: f64,
    pub risk_level: RiskLevel,
    pub operational_risk: u8,
    pub cooling_load_pct: f64,
    pub cost_increase: i64,
    /// Forecast days whose temperature exceeds the company alert threshold.
    pub hot_forecast_days: usize,
}

pub fn assess_climate(
    timeline: &[ClimateSnapshot],
    climate: &ClimateConfig,
    temp_threshold: f64,
) -> Option<ClimateAssessment> {
    let today = current_snapshot(timeline)?;
    let hsi = heat_stress_index(today.temp_c, today.humidity);
    let cooling_load_pct = cooling_load_prediction(today.temp_c, climate.base_temp_c);

    Some(ClimateAssessment {
        current: today.clone(),
        hsi,
        risk_level: risk_level(hsi),
        operational_risk: operational_risk_index(hsi, today.aqi, today.wind_speed),
        cooling_load_pct,
        cost_increase: predicted_cost_increase(cooling_load_pct, climate.daily_energy_cost),
        hot_forecast_days: timeline
            .iter()
            .filter(|s| s.is_forecast() && s.temp_c > temp_threshold)
            .count(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub water: ResourceAnalysis,
    pub energy: ResourceAnalysis,
    pub carbon: CarbonMetrics,
    pub efficiency_score: u8,
    pub total_cost: f64,
    pub climate: Option<ClimateAssessment>,
}

impl DashboardSummary {
    /// Combined signed change of both resources, for narrative prompts.
    pub fn consumption_direction(&self) -> &'static str {
        let combined = self.water.trend.signed_percent() + self.energy.trend.signed_percent();
        if combined > 0.0 {
            "rising consumption"
        } else if combined < 0.0 {
            "falling consumption"
        } else {
            "stable consumption"
        }
    }
}

/// Inputs for one dashboard recomputation, read from the repository.
pub struct DashboardInputs<'a> {
    pub water: &'a [Reading],
    pub energy: &'a [Reading],
    pub climate: &'a [ClimateSnapshot],
    pub sensitivity: Sensitivity,
    pub temp_threshold: f64,
}

pub fn summarize(inputs: &DashboardInputs<'_>, climate: &ClimateConfig) -> DashboardSummary {
    let water = analyze_resource(inputs.water, inputs.sensitivity);
    let energy = analyze_resource(inputs.energy, inputs.sensitivity);
    let carbon = carbon_metrics(inputs.water, inputs.energy);
    let efficiency_score = efficiency_score(
        energy.trend.signed_percent(),
        water.trend.signed_percent(),
        carbon.intensity,
    );
    let total_cost = inputs
        .water
        .iter()
        .chain(inputs.energy.iter())
        .map(|r| r.cost_estimate)
        .sum();

    tracing::debug!(
        water_anomaly = water.is_anomaly,
        energy_anomaly = energy.is_anomaly,
        efficiency_score,
        "dashboard recomputed"
    );

    DashboardSummary {
        water,
        energy,
        carbon,
        efficiency_score,
        total_cost,
        climate: assess_climate(inputs.climate, climate, inputs.temp_threshold),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::series;
    use crate::analytics::TrendDirection;
    use resource_client::domain::ClimateSource;
    use time::macros::datetime;

    fn with_carbon(values: &[f64], factor: f64) -> Vec<Reading> {
        series(values)
            .into_iter()
            .map(|mut r| {
                r.carbon_estimate = r.value * factor;
                r.cost_estimate = r.value * 2.0;
                r
            })
            .collect()
    }

    fn snapshot(temp_c: f64, source: ClimateSource) -> ClimateSnapshot {
        ClimateSnapshot {
            ts: datetime!(2024-07-01 12:00:00 UTC),
            temp_c,
            humidity: 50.0,
            wind_speed: 12.0,
            aqi: 75,
            pm25: 15.0,
            condition: "Haze".to_string(),
            source,
        }
    }

    #[test]
    fn empty_resource_defaults() {
        let a = analyze_resource(&[], Sensitivity::Balanced);
        assert_eq!(a.current, 0.0);
        assert_eq!(a.average, 0.0);
        assert_eq!(a.trend, Trend::FLAT);
        assert!(!a.is_anomaly);
        assert_eq!(a.predicted_next, 0.0);
        assert_eq!(a.risk, AlertLevel::Low);
    }

    #[test]
    fn average_excludes_latest_reading() {
        let a = analyze_resource(
            &series(&[1.0, 100.0, 200.0, 300.0, 400.0, 999.0]),
            Sensitivity::Balanced,
        );
        assert_eq!(a.current, 999.0);
        assert_eq!(a.average, 250.0);
    }

    #[test]
    fn anomaly_raises_alert_level() {
        let a = analyze_resource(&series(&[100.0, 100.0, 100.0, 200.0]), Sensitivity::Balanced);
        assert!(a.is_anomaly);
        assert_eq!(a.risk, AlertLevel::High);
        assert_eq!(a.trend.direction, TrendDirection::Up);
    }

    #[test]
    fn carbon_totals_and_projection() {
        let water = with_carbon(&[100.0, 100.0], 0.3);
        let energy = with_carbon(&[1000.0, 1000.0], 0.5);
        let m = carbon_metrics(&water, &energy);

        assert!((m.total_kg - 1060.0).abs() < 1e-9);
        assert!((m.total_tonnes - 1.06).abs() < 1e-12);
        assert!((m.intensity - 1060.0 / 2200.0).abs() < 1e-12);
        assert!((m.rolling_average_kg - 530.0).abs() < 1e-9);
        assert!((m.current_period_kg - 530.0).abs() < 1e-9);
        assert_eq!(m.stability_score, 100.0);
        assert!((m.projected_annual_kg - 1060.0 / 2.0 * 52.0).abs() < 1e-9);
    }

    #[test]
    fn carbon_metrics_without_readings() {
        let m = carbon_metrics(&[], &[]);
        assert_eq!(m.total_kg, 0.0);
        assert_eq!(m.intensity, 0.0);
        assert_eq!(m.stability_score, 100.0);
        assert_eq!(m.projected_annual_kg, 0.0);
    }

    #[test]
    fn spike_lowers_stability() {
        let energy = with_carbon(&[100.0, 100.0, 100.0, 500.0], 1.0);
        let m = carbon_metrics(&[], &energy);
        // rolling 200, current 500 -> deviation 150%
        assert_eq!(m.stability_score, 0.0);
    }

    #[test]
    fn reduction_scenario_scales_projection() {
        let m = CarbonMetrics {
            total_kg: 0.0,
            total_tonnes: 0.0,
            intensity: 0.0,
            rolling_average_kg: 0.0,
            current_period_kg: 0.0,
            stability_score: 90.0,
            projected_annual_kg: 10_000.0,
        };
        let s = reduction_scenario(&m, 30.0);
        assert!((s.saved_carbon_kg - 3000.0).abs() < 1e-9);
        assert!((s.saved_cost - 7500.0).abs() < 1e-9);
        assert_eq!(s.new_score, 100.0);
    }

    #[test]
    fn climate_assessment_uses_realtime_snapshot() {
        let timeline = vec![
            snapshot(20.0, ClimateSource::History),
            snapshot(30.0, ClimateSource::Realtime),
            snapshot(36.0, ClimateSource::Forecast),
            snapshot(34.0, ClimateSource::Forecast),
        ];
        let a = assess_climate(&timeline, &ClimateConfig::default(), 35.0).unwrap();

        assert_eq!(a.current.temp_c, 30.0);
        assert_eq!(a.cooling_load_pct, 27.0);
        assert_eq!(a.cost_increase, 173);
        assert_eq!(a.hsi, heat_stress_index(30.0, 50.0));
        assert_eq!(a.risk_level, risk_level(a.hsi));
        assert_eq!(a.operational_risk, operational_risk_index(a.hsi, 75, 12.0));
        assert_eq!(a.hot_forecast_days, 1);
    }

    #[test]
    fn no_climate_data_no_assessment() {
        assert!(assess_climate(&[], &ClimateConfig::default(), 35.0).is_none());
    }

    #[test]
    fn summary_penalises_only_rising_trends() {
        let water = with_carbon(&[100.0, 90.0], 0.3);
        let energy = with_carbon(&[100.0, 120.0], 0.4);
        let summary = summarize(
            &DashboardInputs {
                water: &water,
                energy: &energy,
                climate: &[],
                sensitivity: Sensitivity::Balanced,
                temp_threshold: 35.0,
            },
            &ClimateConfig::default(),
        );

        // energy +20% -> -30; water falling is ignored; intensity < 0.5
        assert_eq!(summary.efficiency_score, 70);
        assert!((summary.total_cost - 820.0).abs() < 1e-9);
        assert!(summary.climate.is_none());
        assert_eq!(summary.consumption_direction(), "rising consumption");
    }
}
