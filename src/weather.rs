//! Weather samples driving the dispersion model.
use crate::units::MetresPerSecond;
use anyhow::{Result, ensure};
use chrono::{DateTime, Utc};

/// A timestamped weather observation shared across sensors in a city.
///
/// The wind direction follows the meteorological convention: the bearing the wind blows *from*,
/// in degrees clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherSample {
    /// Observation time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Wind speed in m/s
    pub wind_speed: MetresPerSecond,
    /// Wind direction in degrees (0-360, direction the wind blows from)
    pub wind_direction: f64,
    /// Air temperature in degrees Celsius
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: f64,
}

impl WeatherSample {
    /// Create a validated weather sample.
    ///
    /// Out-of-range wind values are input errors the caller must fix at the source; coercing
    /// them into plausible-looking numbers could mislead a health decision.
    pub fn new(
        timestamp: DateTime<Utc>,
        wind_speed: f64,
        wind_direction: f64,
        temperature: f64,
        humidity: f64,
    ) -> Result<Self> {
        ensure!(
            wind_speed >= 0.0,
            "Wind speed must be non-negative, got {wind_speed} m/s"
        );
        ensure!(
            (0.0..=360.0).contains(&wind_direction),
            "Wind direction must be in the range 0-360 degrees, got {wind_direction}"
        );
        Ok(Self {
            timestamp,
            wind_speed: MetresPerSecond(wind_speed),
            wind_direction,
            temperature,
            humidity,
        })
    }
}
