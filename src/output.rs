//! The module responsible for writing output data to disk.
use crate::aqi::AqiCategory;
use crate::dispersion::StabilityClass;
use crate::emission::Pollutant;
use crate::forecast::ForecastSeries;
use crate::health::RiskLevel;
use crate::interpolate::PollutionGrid;
use crate::route::RouteOutcome;
use crate::sensor::{SensorID, SensorSnapshot};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which scenario-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "airshed_results";

/// The output file name for per-cycle sensor readings
const READINGS_FILE_NAME: &str = "readings.csv";

/// The output file name for the interpolated surface
const GRID_FILE_NAME: &str = "grid.csv";

/// The output file name for per-sensor forecasts
const FORECASTS_FILE_NAME: &str = "forecasts.csv";

/// The output file name for route point sequences
const ROUTES_FILE_NAME: &str = "routes.csv";

/// The output file name for the route comparison summary
const ROUTE_SUMMARY_FILE_NAME: &str = "route_summary.csv";

/// Get the output directory for the scenario at the specified path
pub fn get_output_dir(scenario_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let scenario_dir = scenario_dir
        .canonicalize()
        .context("Could not resolve path to scenario")?;

    let scenario_name = scenario_dir
        .file_name()
        .context("Scenario cannot be in root folder")?
        .to_str()
        .context("Invalid chars in scenario dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, scenario_name].iter().collect())
}

/// Create a new output directory for the scenario, with parents
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        // already exists
        return Ok(());
    }

    fs::create_dir_all(output_dir)?;

    Ok(())
}

/// Represents a row in the readings CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ReadingRow {
    timestamp: DateTime<Utc>,
    sensor_id: SensorID,
    vehicles: u32,
    stability: StabilityClass,
    pm25: f64,
    pm10: f64,
    nox: f64,
    co: f64,
    aqi: u16,
    category: AqiCategory,
    health_score: u8,
    risk_level: RiskLevel,
    equivalent_cigarettes: f64,
}

/// Writes one row per sensor per cycle to the readings CSV file
pub struct ReadingsWriter(csv::Writer<File>);

impl ReadingsWriter {
    /// Open the readings file for writing
    pub fn create(output_dir: &Path) -> Result<Self> {
        let file_path = output_dir.join(READINGS_FILE_NAME);
        Ok(Self(csv::Writer::from_path(file_path)?))
    }

    /// Append every sensor's state for one cycle
    pub fn write_cycle(
        &mut self,
        timestamp: DateTime<Utc>,
        snapshot: &SensorSnapshot,
    ) -> Result<()> {
        for (sensor_id, point) in snapshot {
            self.0.serialize(ReadingRow {
                timestamp,
                sensor_id: sensor_id.clone(),
                vehicles: point.vehicles.total(),
                stability: point.reading.stability,
                pm25: point.reading.get(Pollutant::Pm25).value(),
                pm10: point.reading.get(Pollutant::Pm10).value(),
                nox: point.reading.get(Pollutant::NOx).value(),
                co: point.reading.get(Pollutant::Co).value(),
                aqi: point.reading.aqi,
                category: point.reading.category,
                health_score: point.health.score,
                risk_level: point.health.risk_level,
                equivalent_cigarettes: point.health.equivalent_cigarettes,
            })?;
        }
        Ok(())
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<()> {
        Ok(self.0.flush()?)
    }
}

/// Represents a row in the grid CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct GridRow {
    row: usize,
    col: usize,
    lat: f64,
    lon: f64,
    pm25: f64,
    variance: f64,
}

/// Write the interpolated surface, one row per cell
pub fn write_grid(output_dir: &Path, grid: &PollutionGrid) -> Result<()> {
    let file_path = output_dir.join(GRID_FILE_NAME);
    let mut writer = csv::Writer::from_path(file_path)?;
    for row in 0..grid.resolution {
        for col in 0..grid.resolution {
            let centre = grid.cell_centre(row, col);
            writer.serialize(GridRow {
                row,
                col,
                lat: centre.lat,
                lon: centre.lon,
                pm25: grid.values[row][col],
                variance: grid.variances[row][col],
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Represents a row in the forecasts CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct ForecastRow {
    sensor_id: SensorID,
    timestamp: DateTime<Utc>,
    predicted_pm25: f64,
    lower: f64,
    upper: f64,
}

/// Write the forecast series of every sensor
pub fn write_forecasts(
    output_dir: &Path,
    forecasts: &IndexMap<SensorID, ForecastSeries>,
) -> Result<()> {
    let file_path = output_dir.join(FORECASTS_FILE_NAME);
    let mut writer = csv::Writer::from_path(file_path)?;
    for (sensor_id, series) in forecasts {
        for point in series {
            writer.serialize(ForecastRow {
                sensor_id: sensor_id.clone(),
                timestamp: point.timestamp,
                predicted_pm25: point.predicted,
                lower: point.lower,
                upper: point.upper,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Represents a row in the routes CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RoutePointRow {
    route: String,
    seq: usize,
    lat: f64,
    lon: f64,
}

/// Represents the single row of the route summary CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct RouteSummaryRow {
    outcome: String,
    green_distance_km: f64,
    shortest_distance_km: f64,
    green_exposure: f64,
    shortest_exposure: f64,
    reduction_percent: f64,
}

/// Write the route point sequences and the comparison summary.
///
/// A `NoRoute` outcome still produces both files, with an empty point list and an explicit
/// `no_route` marker in the summary.
pub fn write_route(output_dir: &Path, outcome: &RouteOutcome) -> Result<()> {
    let mut points_writer = csv::Writer::from_path(output_dir.join(ROUTES_FILE_NAME))?;
    let mut summary_writer = csv::Writer::from_path(output_dir.join(ROUTE_SUMMARY_FILE_NAME))?;

    match outcome {
        RouteOutcome::Found(result) => {
            for (name, path) in [("green", &result.green), ("shortest", &result.shortest)] {
                for (seq, point) in path.points.iter().enumerate() {
                    points_writer.serialize(RoutePointRow {
                        route: name.to_string(),
                        seq,
                        lat: point.lat,
                        lon: point.lon,
                    })?;
                }
            }
            summary_writer.serialize(RouteSummaryRow {
                outcome: "found".to_string(),
                green_distance_km: result.green.distance.value(),
                shortest_distance_km: result.shortest.distance.value(),
                green_exposure: result.green.exposure.value(),
                shortest_exposure: result.shortest.exposure.value(),
                reduction_percent: result.exposure_reduction_percent,
            })?;
        }
        RouteOutcome::NoRoute => {
            summary_writer.serialize(RouteSummaryRow {
                outcome: "no_route".to_string(),
                green_distance_km: 0.0,
                shortest_distance_km: 0.0,
                green_exposure: 0.0,
                shortest_exposure: 0.0,
                reduction_percent: 0.0,
            })?;
        }
    }

    points_writer.flush()?;
    summary_writer.flush()?;
    Ok(())
}
