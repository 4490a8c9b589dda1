//! Short-horizon PM2.5 forecasting with the Holt-Winters family of exponential smoothing.
//!
//! Three tiers, chosen by how much history a sensor has accumulated:
//!
//! * **Holt-Winters additive** (level + trend + seasonal) once at least two full seasonal
//!   cycles are available;
//! * **Holt linear** (level + trend) from two points upwards;
//! * a **flat forecast** pinned to the last known value when there is less, so callers always
//!   get a drawable series.
//!
//! 95% confidence bounds widen with the square root of the forecast step, scaled by the
//! standard deviation of the one-step-ahead residuals from the training pass. The forecast is
//! recomputed from the full window on each call; nothing is maintained incrementally.
use crate::units::MicrogramsPerCubicMetre;
use anyhow::{Result, ensure};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// Residual standard deviation assumed when there is too little history to measure one (µg/m³)
const FALLBACK_RESIDUAL_STD: f64 = 3.0;

/// Floor on the measured residual standard deviation (µg/m³)
const MIN_RESIDUAL_STD: f64 = 1.0;

/// Two-sided 95% normal quantile
const Z_95: f64 = 1.96;

/// Maximum number of readings retained per sensor
const MAX_HISTORY: usize = 720;

fn default_alpha() -> f64 {
    0.3
}

fn default_beta() -> f64 {
    0.1
}

fn default_gamma() -> f64 {
    0.2
}

fn default_season_length() -> usize {
    24
}

/// Smoothing constants and seasonal period for the forecaster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingParameters {
    /// Level smoothing constant, in (0, 1)
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Trend smoothing constant, in (0, 1)
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Seasonal smoothing constant, in (0, 1)
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Observations per seasonal cycle
    #[serde(default = "default_season_length")]
    pub season_length: usize,
}

impl SmoothingParameters {
    /// Create validated smoothing parameters
    pub fn new(alpha: f64, beta: f64, gamma: f64, season_length: usize) -> Result<Self> {
        for (name, value) in [("alpha", alpha), ("beta", beta), ("gamma", gamma)] {
            ensure!(
                (0.0..1.0).contains(&value) && value > 0.0,
                "Smoothing parameter {name} must lie in (0, 1), got {value}"
            );
        }
        ensure!(
            season_length >= 2,
            "Season length must be at least 2, got {season_length}"
        );
        Ok(Self {
            alpha,
            beta,
            gamma,
            season_length,
        })
    }
}

impl Default for SmoothingParameters {
    /// Constants tuned for urban air quality with a 24-observation diurnal cycle
    fn default() -> Self {
        Self {
            alpha: default_alpha(),
            beta: default_beta(),
            gamma: default_gamma(),
            season_length: default_season_length(),
        }
    }
}

/// A rolling window of timestamped readings for one sensor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingHistory {
    observations: Vec<(DateTime<Utc>, f64)>,
}

impl ReadingHistory {
    /// An empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a reading, discarding the oldest once the window is full
    pub fn push(&mut self, timestamp: DateTime<Utc>, value: MicrogramsPerCubicMetre) {
        self.observations.push((timestamp, value.value()));
        if self.observations.len() > MAX_HISTORY {
            self.observations.remove(0);
        }
    }

    /// Number of stored readings
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether any readings are stored
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|(_, v)| *v).collect()
    }

    fn last(&self) -> Option<(DateTime<Utc>, f64)> {
        self.observations.last().copied()
    }
}

/// One step of a forecast series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Time the prediction applies to
    pub timestamp: DateTime<Utc>,
    /// Predicted PM2.5 concentration (µg/m³)
    pub predicted: f64,
    /// Lower edge of the 95% confidence band
    pub lower: f64,
    /// Upper edge of the 95% confidence band
    pub upper: f64,
}

/// An ordered forecast for one sensor
pub type ForecastSeries = Vec<ForecastPoint>;

/// Outcome of a Holt-Winters or Holt training pass
struct FittedModel {
    /// Point forecasts for steps 1..=horizon
    forecasts: Vec<f64>,
    /// Residual standard deviation of the one-step-ahead predictions
    residual_std: f64,
}

/// Holt-Winters additive seasonal smoothing.
///
/// Level is initialised to the first-season mean, trend to the average slope between the first
/// two seasons and seasonal indices to first-season deviations; the update recurrences then run
/// over the rest of the data:
///
/// ```text
/// l_t = α(y_t - s_{t-m}) + (1-α)(l_{t-1} + b_{t-1})
/// b_t = β(l_t - l_{t-1}) + (1-β)b_{t-1}
/// s_t = γ(y_t - l_t)     + (1-γ)s_{t-m}
/// ```
fn holt_winters(data: &[f64], params: &SmoothingParameters, horizon: usize) -> FittedModel {
    let m = params.season_length;
    let n = data.len();

    let level0 = data[..m].iter().sum::<f64>() / m as f64;
    let trend0 = (0..m)
        .map(|i| (data[m + i] - data[i]) / m as f64)
        .sum::<f64>()
        / m as f64;

    let mut levels = vec![level0];
    let mut trends = vec![trend0];
    let mut seasonals: Vec<f64> = data[..m].iter().map(|y| y - level0).collect();
    let mut residuals = Vec::new();

    for t in m..n {
        let y = data[t];
        let s_prev = seasonals[t - m];

        let one_step = levels.last().unwrap() + trends.last().unwrap() + s_prev;
        residuals.push(y - one_step);

        let prev_level = *levels.last().unwrap();
        let new_level =
            params.alpha * (y - s_prev) + (1.0 - params.alpha) * (prev_level + trends.last().unwrap());
        let new_trend =
            params.beta * (new_level - prev_level) + (1.0 - params.beta) * trends.last().unwrap();
        let new_seasonal = params.gamma * (y - new_level) + (1.0 - params.gamma) * s_prev;

        levels.push(new_level);
        trends.push(new_trend);
        seasonals.push(new_seasonal);
    }

    let final_level = *levels.last().unwrap();
    let final_trend = *trends.last().unwrap();
    let forecasts = (1..=horizon)
        .map(|h| {
            // Seasonal index from the most recent completed cycle
            let s_idx = seasonals.len() - m + ((h - 1) % m);
            final_level + h as f64 * final_trend + seasonals[s_idx]
        })
        .collect();

    FittedModel {
        forecasts,
        residual_std: residual_standard_deviation(&residuals),
    }
}

/// Holt's linear method: level and trend only
fn holt_linear(data: &[f64], params: &SmoothingParameters, horizon: usize) -> FittedModel {
    let mut level = data[0];
    let mut trend = data[1] - data[0];
    let mut residuals = Vec::new();

    for &y in &data[1..] {
        let one_step = level + trend;
        residuals.push(y - one_step);

        let prev_level = level;
        level = params.alpha * y + (1.0 - params.alpha) * (prev_level + trend);
        trend = params.beta * (level - prev_level) + (1.0 - params.beta) * trend;
    }

    let forecasts = (1..=horizon).map(|h| level + h as f64 * trend).collect();
    FittedModel {
        forecasts,
        residual_std: residual_standard_deviation(&residuals),
    }
}

fn residual_standard_deviation(residuals: &[f64]) -> f64 {
    if residuals.is_empty() {
        return FALLBACK_RESIDUAL_STD;
    }
    let mse = residuals.iter().map(|r| r * r).sum::<f64>() / residuals.len() as f64;
    mse.sqrt().max(MIN_RESIDUAL_STD)
}

/// Produce a forecast series from a sensor's reading history.
///
/// `step` is the spacing between forecast points. An empty history yields an empty series; a
/// single reading yields a flat forecast with wide bounds. The result is deterministic given
/// the history.
pub fn generate_forecast(
    history: &ReadingHistory,
    params: &SmoothingParameters,
    horizon: usize,
    step: TimeDelta,
) -> ForecastSeries {
    let Some((last_timestamp, last_value)) = history.last() else {
        return Vec::new();
    };

    let data = history.values();
    let model = if data.len() >= 2 * params.season_length {
        holt_winters(&data, params, horizon)
    } else if data.len() >= 2 {
        holt_linear(&data, params, horizon)
    } else {
        // Too little history to fit anything: flat forecast with wide bounds
        FittedModel {
            forecasts: vec![last_value; horizon],
            residual_std: FALLBACK_RESIDUAL_STD,
        }
    };

    (1..=horizon)
        .map(|h| {
            let predicted = model.forecasts[h - 1].max(0.0);
            let margin = Z_95 * model.residual_std * (h as f64).sqrt();
            ForecastPoint {
                timestamp: last_timestamp + step * h as i32,
                predicted,
                lower: (predicted - margin).max(0.0),
                upper: predicted + margin,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    fn history_from(values: &[f64]) -> ReadingHistory {
        let start: DateTime<Utc> = "2026-03-02T00:00:00Z".parse().unwrap();
        let mut history = ReadingHistory::new();
        for (i, &v) in values.iter().enumerate() {
            history.push(
                start + TimeDelta::hours(i as i64),
                MicrogramsPerCubicMetre(v),
            );
        }
        history
    }

    #[test]
    fn test_empty_history_empty_series() {
        let series = generate_forecast(
            &ReadingHistory::new(),
            &SmoothingParameters::default(),
            6,
            TimeDelta::minutes(30),
        );
        assert!(series.is_empty());
    }

    #[test]
    fn test_single_reading_flat_with_wide_bounds() {
        let series = generate_forecast(
            &history_from(&[25.0]),
            &SmoothingParameters::default(),
            6,
            TimeDelta::minutes(30),
        );
        assert_eq!(series.len(), 6);
        for point in &series {
            assert_approx_eq!(f64, point.predicted, 25.0);
            assert!(point.upper - point.lower >= 2.0 * Z_95 * FALLBACK_RESIDUAL_STD);
        }
    }

    #[test]
    fn test_constant_series_predicts_constant() {
        let series = generate_forecast(
            &history_from(&[30.0; 12]),
            &SmoothingParameters::default(),
            6,
            TimeDelta::minutes(30),
        );
        let mut last_width = 0.0;
        for point in &series {
            assert_approx_eq!(f64, point.predicted, 30.0, epsilon = 1e-9);
            let width = point.upper - point.lower;
            assert!(width >= last_width, "bounds narrowed over the horizon");
            last_width = width;
        }
    }

    #[test]
    fn test_trend_is_extrapolated() {
        // A steady climb should forecast above the last value
        let values: Vec<f64> = (0..20).map(|i| 10.0 + i as f64).collect();
        let series = generate_forecast(
            &history_from(&values),
            &SmoothingParameters::default(),
            4,
            TimeDelta::hours(1),
        );
        assert!(series[0].predicted > values[values.len() - 1] - 1.0);
        assert!(series[3].predicted > series[0].predicted);
    }

    #[test]
    fn test_seasonal_pattern_is_reproduced() {
        // Three full cycles of a period-4 pattern with a short season length
        let params = SmoothingParameters::new(0.3, 0.1, 0.2, 4).unwrap();
        let cycle = [10.0, 20.0, 30.0, 20.0];
        let values: Vec<f64> = cycle.iter().cycle().take(12).copied().collect();
        let series = generate_forecast(&history_from(&values), &params, 4, TimeDelta::hours(1));

        // The forecast peaks where the cycle peaks
        let peak = series
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.predicted.total_cmp(&b.1.predicted))
            .unwrap()
            .0;
        assert_eq!(peak, 2);
    }

    #[test]
    fn test_bounds_widen_with_horizon() {
        let values: Vec<f64> = (0..10).map(|i| 20.0 + (i % 3) as f64).collect();
        let series = generate_forecast(
            &history_from(&values),
            &SmoothingParameters::default(),
            6,
            TimeDelta::minutes(30),
        );
        let widths: Vec<f64> = series.iter().map(|p| p.upper - p.lower).collect();
        assert!(widths.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_timestamps_step_forward() {
        let series = generate_forecast(
            &history_from(&[20.0, 21.0, 22.0]),
            &SmoothingParameters::default(),
            3,
            TimeDelta::minutes(30),
        );
        let last_obs: DateTime<Utc> = "2026-03-02T02:00:00Z".parse().unwrap();
        assert_eq!(series[0].timestamp, last_obs + TimeDelta::minutes(30));
        assert_eq!(series[2].timestamp, last_obs + TimeDelta::minutes(90));
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(SmoothingParameters::new(0.0, 0.1, 0.2, 24).is_err());
        assert!(SmoothingParameters::new(0.3, 1.0, 0.2, 24).is_err());
        assert!(SmoothingParameters::new(0.3, 0.1, 0.2, 1).is_err());
    }

    #[test]
    fn test_history_window_is_capped() {
        let mut history = ReadingHistory::new();
        let start: DateTime<Utc> = "2026-03-02T00:00:00Z".parse().unwrap();
        for i in 0..(MAX_HISTORY + 10) {
            history.push(
                start + TimeDelta::seconds(i as i64 * 5),
                MicrogramsPerCubicMetre(10.0),
            );
        }
        assert_eq!(history.len(), MAX_HISTORY);
    }
}
