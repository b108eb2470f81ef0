use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportType {
    WaterAlert,
    EnergyAlert,
    CarbonAudit,
    ClimateRisk,
    WeeklyExecutive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Ready,
    Processing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedReport {
    pub id: String,
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
    pub title: String,
    pub summary: String,
    /// 0-100.
    pub risk_score: u8,
    pub status: ReportStatus,
}

/// Report content before the store stamps id, time and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReport {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    pub title: String,
    pub summary: String,
    pub risk_score: u8,
}
