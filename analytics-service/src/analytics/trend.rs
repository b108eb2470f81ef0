use resource_client::domain::Reading;
use serde::{Deserialize, Serialize};

/// Changes within +/- this many percent count as flat.
pub const FLAT_BAND_PERCENT: f64 = 0.5;

/// Percent reported when the previous reading is zero.
const ZERO_BASELINE_PERCENT: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// Period-over-period change between the last two readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trend {
    /// Unsigned magnitude; `direction` carries the sign.
    pub percent: f64,
    pub direction: TrendDirection,
}

impl Trend {
    pub const FLAT: Trend = Trend {
        percent: 0.0,
        direction: TrendDirection::Flat,
    };

    /// Positive when rising, negative when falling, zero inside the flat band.
    pub fn signed_percent(&self) -> f64 {
        match self.direction {
            TrendDirection::Up => self.percent,
            TrendDirection::Down => -self.percent,
            TrendDirection::Flat => 0.0,
        }
    }
}

pub fn compute_trend(readings: &[Reading]) -> Trend {
    let [.., previous, current] = readings else {
        return Trend::FLAT;
    };

    if previous.value == 0.0 {
        return Trend {
            percent: ZERO_BASELINE_PERCENT,
            direction: TrendDirection::Up,
        };
    }

    let change = (current.value - previous.value) / previous.value * 100.0;
    let direction = if change > FLAT_BAND_PERCENT {
        TrendDirection::Up
    } else if change < -FLAT_BAND_PERCENT {
        TrendDirection::Down
    } else {
        TrendDirection::Flat
    };

    Trend {
        percent: change.abs(),
        direction,
    }
}
