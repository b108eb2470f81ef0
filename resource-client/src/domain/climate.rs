use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClimateSource {
    Realtime,
    History,
    Forecast,
}

/// Weather and air-quality conditions at a facility for one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSnapshot {
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
    pub temp_c: f64,
    /// Relative humidity, 0-100.
    pub humidity: f64,
    pub wind_speed: f64,
    pub aqi: u32,
    pub pm25: f64,
    pub condition: String,
    pub source: ClimateSource,
}

impl ClimateSnapshot {
    pub fn is_forecast(&self) -> bool {
        self.source == ClimateSource::Forecast
    }
}

/// The snapshot risk scoring runs against: the first realtime entry, falling
/// back to the first entry of the timeline.
pub fn current_snapshot(timeline: &[ClimateSnapshot]) -> Option<&ClimateSnapshot> {
    timeline
        .iter()
        .find(|s| s.source == ClimateSource::Realtime)
        .or_else(|| timeline.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn snapshot(temp_c: f64, source: ClimateSource) -> ClimateSnapshot {
        ClimateSnapshot {
            ts: datetime!(2024-07-01 12:00:00 UTC),
            temp_c,
            humidity: 50.0,
            wind_speed: 12.0,
            aqi: 70,
            pm25: 15.0,
            condition: "Clear Sky".to_string(),
            source,
        }
    }

    #[test]
    fn realtime_entry_wins() {
        let timeline = vec![
            snapshot(30.0, ClimateSource::History),
            snapshot(34.0, ClimateSource::Realtime),
            snapshot(36.0, ClimateSource::Forecast),
        ];
        assert_eq!(current_snapshot(&timeline).map(|s| s.temp_c), Some(34.0));
    }

    #[test]
    fn falls_back_to_first_entry() {
        let timeline = vec![
            snapshot(30.0, ClimateSource::History),
            snapshot(36.0, ClimateSource::Forecast),
        ];
        assert_eq!(current_snapshot(&timeline).map(|s| s.temp_c), Some(30.0));
        assert!(current_snapshot(&[]).is_none());
    }

    #[test]
    fn forecast_flag_follows_source() {
        assert!(snapshot(30.0, ClimateSource::Forecast).is_forecast());
        assert!(!snapshot(30.0, ClimateSource::Realtime).is_forecast());
    }
}
