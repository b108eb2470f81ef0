use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A priced meter reading.
///
/// `cost_estimate` and `carbon_estimate` are derived from the tariff in force
/// when the reading was created; they are never taken from user input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub id: String,
    pub meter_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub value: f64,
    pub manual: bool,
    pub cost_estimate: f64,
    pub carbon_estimate: f64,
}

/// A reading as captured, before cost and carbon are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReading {
    pub meter_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub value: f64,
    #[serde(default = "default_manual")]
    pub manual: bool,
}

fn default_manual() -> bool {
    true
}
