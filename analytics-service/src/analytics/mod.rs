//! Analytics engines.
//!
//! Every function here is pure and total over its numeric domain: short or
//! degenerate inputs fall back to fixed defaults instead of erroring, so
//! callers never branch on failure. NaN or infinite inputs propagate and
//! must be rejected upstream.

pub mod anomaly;
pub mod climate;
pub mod efficiency;
pub mod forecast;
pub mod tariff;
pub mod trend;

pub use anomaly::{detect_anomaly, z_score, z_threshold};
pub use climate::{
    cooling_load_prediction, heat_stress_index, operational_risk_index, predicted_cost_increase,
    risk_level, RiskLevel,
};
pub use efficiency::efficiency_score;
pub use forecast::predict_next;
pub use tariff::{compute_reading_cost, ReadingCost};
pub use trend::{compute_trend, Trend, TrendDirection};

/// Rounds to the nearest integer with halves going towards positive infinity.
pub(crate) fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}


#[cfg(test)]
mod tests {
    use super::round_half_up;

    #[test]
    fn halves_round_towards_positive_infinity() {
        assert_eq!(round_half_up(2.5), 3.0);
        assert_eq!(round_half_up(-2.5), -2.0);
        assert_eq!(round_half_up(59.4), 59.0);
        assert_eq!(round_half_up(0.0), 0.0);
    }
}
