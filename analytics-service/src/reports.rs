use resource_client::domain::{MeterType, NewReport, ReportType};

use crate::dashboard::DashboardSummary;
use crate::narrative::{Clock, NarrativeBackend, NarrativeProfile, NarrativeRequest, NarrativeService};

/// 0-100 risk attached to a report. Climate reports carry the operational
/// risk index (0 without climate data); all others the efficiency shortfall.
pub fn report_risk_score(kind: ReportType, dashboard: &DashboardSummary) -> u8 {
    match kind {
        ReportType::ClimateRisk => dashboard
            .climate
            .as_ref()
            .map_or(0, |c| c.operational_risk),
        _ => 100 - dashboard.efficiency_score.min(100),
    }
}

pub fn build_report(
    kind: ReportType,
    title: impl Into<String>,
    summary: impl Into<String>,
    dashboard: &DashboardSummary,
) -> NewReport {
    NewReport {
        report_type: kind,
        title: title.into(),
        summary: summary.into(),
        risk_score: report_risk_score(kind, dashboard),
    }
}

/// Alert report raised when a reading is booked against a meter of this type.
pub fn instant_alert(meter_type: MeterType) -> Option<(ReportType, &'static str)> {
    match meter_type {
        MeterType::Water => Some((ReportType::WaterAlert, "Instant Water Analysis")),
        MeterType::Energy => Some((ReportType::EnergyAlert, "Instant Energy Analysis")),
        MeterType::Unknown => None,
    }
}

pub fn executive_request(dashboard: &DashboardSummary) -> NarrativeRequest {
    NarrativeRequest::ExecutiveSummary {
        total_cost: dashboard.total_cost,
        total_carbon_tonnes: dashboard.carbon.total_tonnes,
        efficiency_trend: dashboard.consumption_direction().to_string(),
    }
}

/// Builds a report whose summary is the executive narrative for `dashboard`.
pub async fn compose_report<B, C>(
    narrative: &NarrativeService<B, C>,
    profile: &NarrativeProfile,
    kind: ReportType,
    title: impl Into<String>,
    dashboard: &DashboardSummary,
) -> NewReport
where
    B: NarrativeBackend,
    C: Clock,
{
    let summary = narrative
        .narrate(&executive_request(dashboard), profile)
        .await;
    build_report(kind, title, summary.text, dashboard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::Trend;
    use crate::dashboard::{AlertLevel, CarbonMetrics, ClimateAssessment, ResourceAnalysis};
    use crate::analytics::RiskLevel;
    use resource_client::domain::{ClimateSnapshot, ClimateSource};
    use time::macros::datetime;

    fn flat_resource() -> ResourceAnalysis {
        ResourceAnalysis {
            current: 0.0,
            average: 0.0,
            trend: Trend::FLAT,
            is_anomaly: false,
            predicted_next: 0.0,
            risk: AlertLevel::Low,
        }
    }

    fn dashboard(efficiency_score: u8, climate: Option<ClimateAssessment>) -> DashboardSummary {
        DashboardSummary {
            water: flat_resource(),
            energy: flat_resource(),
            carbon: CarbonMetrics {
                total_kg: 2500.0,
                total_tonnes: 2.5,
                intensity: 0.4,
                rolling_average_kg: 0.0,
                current_period_kg: 0.0,
                stability_score: 100.0,
                projected_annual_kg: 0.0,
            },
            efficiency_score,
            total_cost: 12_000.0,
            climate,
        }
    }

    fn climate(operational_risk: u8) -> ClimateAssessment {
        ClimateAssessment {
            current: ClimateSnapshot {
                ts: datetime!(2024-07-01 12:00:00 UTC),
                temp_c: 36.0,
                humidity: 45.0,
                wind_speed: 12.0,
                aqi: 80,
                pm25: 15.0,
                condition: "Haze".to_string(),
                source: ClimateSource::Realtime,
            },
            hsi: 40.0,
            risk_level: RiskLevel::High,
            operational_risk,
            cooling_load_pct: 54.0,
            cost_increase: 346,
            hot_forecast_days: 2,
        }
    }

    #[test]
    fn resource_reports_score_efficiency_shortfall() {
        let d = dashboard(82, Some(climate(61)));
        assert_eq!(report_risk_score(ReportType::WaterAlert, &d), 18);
        assert_eq!(report_risk_score(ReportType::WeeklyExecutive, &d), 18);
    }

    #[test]
    fn climate_reports_score_operational_risk() {
        assert_eq!(
            report_risk_score(ReportType::ClimateRisk, &dashboard(82, Some(climate(61)))),
            61
        );
        assert_eq!(
            report_risk_score(ReportType::ClimateRisk, &dashboard(82, None)),
            0
        );
    }

    #[test]
    fn build_report_fills_score() {
        let r = build_report(ReportType::CarbonAudit, "Audit", "text", &dashboard(100, None));
        assert_eq!(r.report_type, ReportType::CarbonAudit);
        assert_eq!(r.title, "Audit");
        assert_eq!(r.risk_score, 0);
    }

    #[test]
    fn alerts_exist_for_known_meters_only() {
        assert_eq!(
            instant_alert(MeterType::Energy),
            Some((ReportType::EnergyAlert, "Instant Energy Analysis"))
        );
        assert!(instant_alert(MeterType::Unknown).is_none());
    }

    #[tokio::test]
    async fn composed_report_uses_narrative_fallback_when_offline() {
        let svc = NarrativeService::new(
            crate::narrative::UnavailableBackend,
            &crate::config::NarrativeConfig::default(),
        );
        let d = dashboard(90, None);
        let r = compose_report(
            &svc,
            &NarrativeProfile::default(),
            ReportType::WeeklyExecutive,
            "Weekly",
            &d,
        )
        .await;

        assert_eq!(r.summary, executive_request(&d).fallback());
        assert_eq!(r.risk_score, 10);
    }
}
