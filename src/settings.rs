//! Code for loading program settings from the scenario directory.
use crate::forecast::SmoothingParameters;
use crate::geo::Coordinate;
use crate::input::read_toml;
use crate::interpolate::GridBounds;
use crate::route::RouteConfig;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};
use std::path::Path;

const SETTINGS_FILE_NAME: &str = "airshed.toml";

fn default_resolution() -> usize {
    30
}

// Default bounds cover midtown and lower Manhattan, the area the bundled scenarios monitor
fn default_north() -> f64 {
    40.82
}

fn default_south() -> f64 {
    40.70
}

fn default_east() -> f64 {
    -73.78
}

fn default_west() -> f64 {
    -74.02
}

fn default_horizon_steps() -> usize {
    6
}

fn default_step_minutes() -> i64 {
    30
}

/// Settings for the interpolation grid
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GridSettings {
    /// Northern edge latitude of the interpolated surface
    #[serde(default = "default_north")]
    pub north: f64,
    /// Southern edge latitude
    #[serde(default = "default_south")]
    pub south: f64,
    /// Eastern edge longitude
    #[serde(default = "default_east")]
    pub east: f64,
    /// Western edge longitude
    #[serde(default = "default_west")]
    pub west: f64,
    /// Cells per axis (typically 25-50)
    #[serde(default = "default_resolution")]
    pub resolution: usize,
}

impl GridSettings {
    /// The grid's bounding box
    pub fn bounds(&self) -> GridBounds {
        GridBounds {
            north: self.north,
            south: self.south,
            east: self.east,
            west: self.west,
        }
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            north: default_north(),
            south: default_south(),
            east: default_east(),
            west: default_west(),
            resolution: default_resolution(),
        }
    }
}

/// Settings for the forecaster
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ForecastSettings {
    /// Number of forecast points to produce
    #[serde(default = "default_horizon_steps")]
    pub horizon_steps: usize,
    /// Minutes between forecast points
    #[serde(default = "default_step_minutes")]
    pub step_minutes: i64,
    /// Smoothing constants and seasonal period
    #[serde(flatten)]
    pub smoothing: SmoothingParameters,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            horizon_steps: default_horizon_steps(),
            step_minutes: default_step_minutes(),
            smoothing: SmoothingParameters::default(),
        }
    }
}

/// Settings for the router, including the optional endpoints of the scenario's route request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RouteSettings {
    /// Lattice spacing and pollution weight
    #[serde(flatten)]
    pub config: RouteConfig,
    /// Origin latitude, if the scenario requests a route
    pub from_lat: Option<f64>,
    /// Origin longitude
    pub from_lon: Option<f64>,
    /// Destination latitude
    pub to_lat: Option<f64>,
    /// Destination longitude
    pub to_lon: Option<f64>,
}

impl RouteSettings {
    /// The requested route endpoints, if the scenario configures them
    pub fn endpoints(&self) -> Option<(Coordinate, Coordinate)> {
        match (self.from_lat, self.from_lon, self.to_lat, self.to_lon) {
            (Some(from_lat), Some(from_lon), Some(to_lat), Some(to_lon)) => Some((
                Coordinate::new(from_lat, from_lon),
                Coordinate::new(to_lat, to_lon),
            )),
            _ => None,
        }
    }

    fn is_partial(&self) -> bool {
        let set = [self.from_lat, self.from_lon, self.to_lat, self.to_lon]
            .iter()
            .filter(|v| v.is_some())
            .count();
        set != 0 && set != 4
    }
}

/// Program settings from the scenario's config file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Settings {
    /// The default program log level
    #[serde(default)]
    pub log_level: Option<String>,
    /// Interpolation grid settings
    #[serde(default)]
    pub grid: GridSettings,
    /// Forecaster settings
    #[serde(default)]
    pub forecast: ForecastSettings,
    /// Router settings
    #[serde(default)]
    pub route: RouteSettings,
}

impl Settings {
    /// Read settings from the scenario directory.
    ///
    /// If the file is not present, default values for settings will be used.
    pub fn from_path(scenario_dir: &Path) -> Result<Settings> {
        let file_path = scenario_dir.join(SETTINGS_FILE_NAME);
        let settings = if file_path.is_file() {
            read_toml(&file_path)?
        } else {
            Settings::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check that all settings are internally consistent
    pub fn validate(&self) -> Result<()> {
        self.grid.bounds().validate()?;
        ensure!(
            (2..=200).contains(&self.grid.resolution),
            "Grid resolution must be between 2 and 200, got {}",
            self.grid.resolution
        );
        ensure!(
            self.forecast.horizon_steps > 0,
            "Forecast horizon must be at least 1 step"
        );
        ensure!(
            self.forecast.step_minutes > 0,
            "Forecast step must be a positive number of minutes"
        );
        // Re-validate the flattened smoothing fields read from the file
        SmoothingParameters::new(
            self.forecast.smoothing.alpha,
            self.forecast.smoothing.beta,
            self.forecast.smoothing.gamma,
            self.forecast.smoothing.season_length,
        )?;
        self.route.config.validate()?;
        ensure!(
            !self.route.is_partial(),
            "Route endpoints must give all of from_lat, from_lon, to_lat and to_lon, or none"
        );
        Ok(())
    }
}
