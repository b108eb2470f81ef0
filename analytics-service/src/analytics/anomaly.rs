use resource_client::domain::{Reading, Sensitivity};

/// Readings in the reference window, the latest one included.
pub const ANOMALY_WINDOW: usize = 4;

pub fn z_threshold(sensitivity: Sensitivity) -> f64 {
    match sensitivity {
        Sensitivity::Aggressive => 1.0,
        Sensitivity::Balanced => 1.5,
        Sensitivity::Conservative => 2.0,
    }
}

/// Distance of the latest reading from the mean of the last four readings,
/// in population standard deviations. `None` with fewer than four readings.
///
/// The latest reading is part of its own baseline, which bounds the score at
/// sqrt(3) for a four-reading window. A zero deviation divides by one.
pub fn z_score(readings: &[Reading]) -> Option<f64> {
    if readings.len() < ANOMALY_WINDOW {
        return None;
    }

    let window = &readings[readings.len() - ANOMALY_WINDOW..];
    let n = window.len() as f64;
    let mean = window.iter().map(|r| r.value).sum::<f64>() / n;
    let variance = window
        .iter()
        .map(|r| (r.value - mean).powi(2))
        .sum::<f64>()
        / n;
    let std_dev = variance.sqrt();
    let divisor = if std_dev == 0.0 { 1.0 } else { std_dev };

    let current = window[window.len() - 1].value;
    Some(((current - mean) / divisor).abs())
}

pub fn detect_anomaly(readings: &[Reading], sensitivity: Sensitivity) -> bool {
    z_score(readings).is_some_and(|z| z > z_threshold(sensitivity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::series;

    const ALL: [Sensitivity; 3] = [
        Sensitivity::Conservative,
        Sensitivity::Balanced,
        Sensitivity::Aggressive,
    ];

    #[test]
    fn fewer_than_four_readings_never_flag() {
        for s in ALL {
            assert!(!detect_anomaly(&[], s));
            assert!(!detect_anomaly(&series(&[1.0, 1_000.0, 1.0]), s));
        }
    }

    #[test]
    fn constant_series_never_flags() {
        let readings = series(&[250.0; 6]);
        assert_eq!(z_score(&readings), Some(0.0));
        for s in ALL {
            assert!(!detect_anomaly(&readings, s));
        }
    }

    #[test]
    fn spike_after_flat_baseline() {
        let readings = series(&[100.0, 100.0, 100.0, 200.0]);
        let z = z_score(&readings).unwrap();
        assert!((z - 3f64.sqrt()).abs() < 1e-9);

        assert!(detect_anomaly(&readings, Sensitivity::Aggressive));
        assert!(detect_anomaly(&readings, Sensitivity::Balanced));
        assert!(!detect_anomaly(&readings, Sensitivity::Conservative));
    }

    #[test]
    fn self_inclusive_window_caps_score() {
        let readings = series(&[10.0, 10.0, 10.0, 1_000_000.0]);
        let z = z_score(&readings).unwrap();
        assert!(z <= 3f64.sqrt() + 1e-9);
        assert!(!detect_anomaly(&readings, Sensitivity::Conservative));
    }

    #[test]
    fn tight_cluster_is_not_anomalous() {
        let readings = series(&[100.0, 110.0, 90.0, 105.0]);
        let z = z_score(&readings).unwrap();
        assert!(z < 1.0);
        for s in ALL {
            assert!(!detect_anomaly(&readings, s));
        }
    }

    #[test]
    fn older_readings_fall_outside_the_window() {
        let readings = series(&[1.0, 90_000.0, 100.0, 110.0, 90.0, 105.0]);
        assert!(!detect_anomaly(&readings, Sensitivity::Aggressive));
    }
}
