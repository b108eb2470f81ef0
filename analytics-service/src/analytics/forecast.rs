use resource_client::domain::Reading;

/// Number of most recent readings the regression is fitted over.
pub const FORECAST_WINDOW: usize = 8;

/// Ordinary least-squares line through `(index, value)` points.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LinearFit {
    slope: f64,
    intercept: f64,
}

impl LinearFit {
    /// Requires at least two points; x values are the distinct indices
    /// `0..n`, so the slope denominator is never zero.
    fn from_values(values: &[f64]) -> Self {
        let n = values.len() as f64;
        let (mut sum_x, mut sum_y, mut sum_xy, mut sum_xx) = (0.0, 0.0, 0.0, 0.0);
        for (i, &y) in values.iter().enumerate() {
            let x = i as f64;
            sum_x += x;
            sum_y += y;
            sum_xy += x * y;
            sum_xx += x * x;
        }

        let slope = (n * sum_xy - sum_x * sum_y) / (n * sum_xx - sum_x * sum_x);
        let intercept = (sum_y - slope * sum_x) / n;
        Self { slope, intercept }
    }

    fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Next reading extrapolated from the recent linear trend, never below zero.
pub fn predict_next(readings: &[Reading]) -> f64 {
    if readings.len() < 2 {
        return readings.first().map_or(0.0, |r| r.value);
    }

    let window = &readings[readings.len().saturating_sub(FORECAST_WINDOW)..];
    let values: Vec<f64> = window.iter().map(|r| r.value).collect();
    let fit = LinearFit::from_values(&values);

    fit.at(values.len() as f64).max(0.0)
}
