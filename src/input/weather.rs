//! Code for reading weather observations from CSV files.
use crate::input::read_csv;
use crate::weather::WeatherSample;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

const WEATHER_FILE_NAME: &str = "weather.csv";

/// One weather observation as represented in the input file
#[derive(Debug, Deserialize, PartialEq)]
struct WeatherRaw {
    timestamp: DateTime<Utc>,
    wind_speed: f64,
    wind_direction: f64,
    temperature: f64,
    humidity: f64,
}

/// Reads city-wide weather samples from a CSV file.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario configuration files
///
/// # Returns
///
/// Validated samples in file order, or an error naming the offending value.
pub fn read_weather_samples(scenario_dir: &Path) -> Result<Vec<WeatherSample>> {
    let file_path = scenario_dir.join(WEATHER_FILE_NAME);
    read_csv::<WeatherRaw>(&file_path)?
        .into_iter()
        .map(|raw| {
            WeatherSample::new(
                raw.timestamp,
                raw.wind_speed,
                raw.wind_direction,
                raw.temperature,
                raw.humidity,
            )
            .with_context(|| format!("Invalid weather sample in {}", file_path.display()))
        })
        .collect()
}
