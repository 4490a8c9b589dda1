//! End-to-end test replaying the bundled downtown scenario.
use airshed::pipeline;
use airshed::settings::Settings;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Get the path to the bundled downtown scenario
fn get_scenario_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join("downtown")
}

/// Copy the scenario into `dir` so outputs land in a throwaway location
fn copy_scenario(dir: &Path) -> PathBuf {
    let target = dir.join("downtown");
    fs::create_dir(&target).unwrap();
    for entry in fs::read_dir(get_scenario_dir()).unwrap() {
        let entry = entry.unwrap();
        fs::copy(entry.path(), target.join(entry.file_name())).unwrap();
    }
    target
}

#[derive(Debug, Deserialize)]
struct ReadingRow {
    sensor_id: String,
    pm25: f64,
    aqi: u16,
    health_score: u8,
}

#[derive(Debug, Deserialize)]
struct GridRow {
    pm25: f64,
    variance: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastRow {
    predicted_pm25: f64,
    lower: f64,
    upper: f64,
}

#[derive(Debug, Deserialize)]
struct RouteSummaryRow {
    outcome: String,
    green_distance_km: f64,
    shortest_distance_km: f64,
    green_exposure: f64,
    shortest_exposure: f64,
    reduction_percent: f64,
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.deserialize().map(Result::unwrap).collect()
}

/// An integration test for the full pipeline over the bundled scenario.
#[test]
fn test_scenario_run() {
    let dir = tempdir().unwrap();
    let scenario_dir = copy_scenario(dir.path());

    // Outputs are created relative to the working directory
    std::env::set_current_dir(dir.path()).unwrap();

    let settings = Settings::from_path(&scenario_dir).unwrap();
    pipeline::run(&scenario_dir, &settings).unwrap();

    let output_dir = dir.path().join("airshed_results").join("downtown");

    // Readings: 4 cycles x 6 sensors, all physically sensible
    let readings: Vec<ReadingRow> = read_rows(&output_dir.join("readings.csv"));
    assert_eq!(readings.len(), 24);
    for row in &readings {
        assert!(row.pm25 > 0.0, "non-positive PM2.5 for {}", row.sensor_id);
        assert!(row.aqi <= 500);
        assert!(row.health_score <= 100);
    }

    // The busy cycle at Times Square (trucks 5, cars 40, buses 8, motorcycles 15 at
    // 3.6 m/s from 280 degrees) must register pollution above the urban background
    let times_square = readings
        .iter()
        .find(|row| row.sensor_id == "cam-times-square")
        .unwrap();
    assert!(times_square.pm25 > 5.0);
    assert!(times_square.aqi > 0);

    // Grid: 30x30 cells with non-negative estimates and variances
    let grid: Vec<GridRow> = read_rows(&output_dir.join("grid.csv"));
    assert_eq!(grid.len(), 900);
    for cell in &grid {
        assert!(cell.pm25 >= 0.0);
        assert!(cell.variance >= 0.0);
    }

    // Forecasts: 6 sensors x 6 horizon steps, bounds bracketing the prediction
    let forecasts: Vec<ForecastRow> = read_rows(&output_dir.join("forecasts.csv"));
    assert_eq!(forecasts.len(), 36);
    for point in &forecasts {
        assert!(point.lower <= point.predicted_pm25);
        assert!(point.predicted_pm25 <= point.upper);
    }

    // Route: found, with the green route no worse on exposure and no shorter than allowed
    let summaries: Vec<RouteSummaryRow> = read_rows(&output_dir.join("route_summary.csv"));
    assert_eq!(summaries.len(), 1);
    let summary = &summaries[0];
    assert_eq!(summary.outcome, "found");
    assert!(summary.green_distance_km > 0.0);
    assert!(summary.green_exposure <= summary.shortest_exposure + 1e-9);
    assert!(summary.green_distance_km >= summary.shortest_distance_km - 1e-9);
    assert!(summary.reduction_percent >= 0.0);

    // Run metadata is written alongside the results
    assert!(output_dir.join("metadata.toml").is_file());
}
