//! The replay pipeline: observations in, surfaces, forecasts and routes out.
//!
//! Each distinct traffic timestamp is one sampling cycle. A cycle pairs every reporting
//! sensor's counts with the latest weather sample at or before the cycle time (weather refreshes
//! on a slower cadence than traffic, so samples are carried forward), computes emission rates,
//! dispersion readings and health metrics, and appends to each sensor's forecast history.
//! Sensors silent in a cycle keep their last-known-good state rather than blocking the cycle.
//!
//! After the final cycle the snapshot is frozen and handed to the interpolator, the forecaster
//! and (when endpoints are configured) the router, and all results are written as CSVs.
use crate::emission::calculate_emission_rate;
use crate::forecast::{ForecastSeries, ReadingHistory, generate_forecast};
use crate::health::calculate_health;
use crate::input::{Scenario, load_scenario, traffic::TrafficRecord};
use crate::interpolate::{PollutionGrid, build_grid};
use crate::output;
use crate::output::metadata::write_metadata;
use crate::pollution::calculate_reading;
use crate::route::{RouteOutcome, find_green_route};
use crate::sensor::{SensorID, SensorPoint, SensorSnapshot};
use crate::settings::Settings;
use crate::traffic::VehicleCounts;
use crate::weather::WeatherSample;
use anyhow::{Context, Result, ensure};
use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use log::{info, warn};
use std::collections::BTreeMap;
use std::path::Path;

/// Group traffic records into cycles by timestamp, in chronological order
fn group_cycles(records: &[TrafficRecord]) -> BTreeMap<DateTime<Utc>, Vec<&TrafficRecord>> {
    let mut cycles: BTreeMap<DateTime<Utc>, Vec<&TrafficRecord>> = BTreeMap::new();
    for record in records {
        cycles.entry(record.timestamp).or_default().push(record);
    }
    cycles
}

/// The latest weather sample at or before `timestamp`.
///
/// `samples` must be sorted by time. Returns `None` before the first sample.
fn weather_at<'a>(
    samples: &'a [WeatherSample],
    timestamp: DateTime<Utc>,
) -> Option<&'a WeatherSample> {
    samples
        .iter()
        .take_while(|sample| sample.timestamp <= timestamp)
        .last()
}

/// Compute one sensor's state for a cycle
fn process_sensor(
    scenario: &Scenario,
    sensor_id: &SensorID,
    counts: VehicleCounts,
    weather: &WeatherSample,
) -> SensorPoint {
    let site = scenario.sites[sensor_id].clone();
    let emission = calculate_emission_rate(&counts, &scenario.emission_factors);
    let reading = calculate_reading(&emission, weather);
    let health = calculate_health(&reading);
    SensorPoint {
        site,
        vehicles: counts,
        weather: *weather,
        emission,
        reading,
        health,
    }
}

/// Build the interpolated surface from a snapshot's PM2.5 readings
pub fn grid_from_snapshot(snapshot: &SensorSnapshot, settings: &Settings) -> Result<PollutionGrid> {
    let (sites, values): (Vec<_>, Vec<_>) = snapshot
        .values()
        .map(|point| (point.site.coordinate, point.reading.pm25()))
        .unzip();
    build_grid(
        &sites,
        &values,
        &settings.grid.bounds(),
        settings.grid.resolution,
    )
}

/// Replay a scenario through the full pipeline and write all outputs.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing the scenario configuration and observation files
/// * `settings` - Program settings for this run
pub fn run(scenario_dir: &Path, settings: &Settings) -> Result<()> {
    let scenario = load_scenario(scenario_dir).context("Failed to load scenario.")?;
    info!(
        "Loaded scenario with {} sensors, {} traffic records and {} weather samples",
        scenario.sites.len(),
        scenario.traffic.len(),
        scenario.weather.len()
    );

    let output_dir = output::get_output_dir(scenario_dir)?;
    output::create_output_directory(&output_dir).context("Failed to create output directory.")?;

    let mut weather_samples = scenario.weather.clone();
    weather_samples.sort_by_key(|sample| sample.timestamp);

    let mut readings_writer = output::ReadingsWriter::create(&output_dir)?;
    let mut snapshot = SensorSnapshot::new();
    let mut histories: IndexMap<SensorID, ReadingHistory> = IndexMap::new();
    let mut last_cycle_timestamp = None;

    let cycles = group_cycles(&scenario.traffic);
    ensure!(!cycles.is_empty(), "Scenario contains no traffic cycles");

    for (timestamp, records) in &cycles {
        let Some(weather) = weather_at(&weather_samples, *timestamp) else {
            warn!("No weather sample at or before {timestamp}: skipping cycle");
            continue;
        };

        // Aggregate this cycle's counts per sensor; unknown class labels drop out here
        let mut cycle_counts: IndexMap<SensorID, Vec<(&str, u32)>> = IndexMap::new();
        for record in records {
            cycle_counts
                .entry(record.sensor_id.clone())
                .or_default()
                .push((record.vehicle_class.as_str(), record.count));
        }
        for (sensor_id, pairs) in cycle_counts {
            let counts = VehicleCounts::from_labelled_counts(pairs);
            let point = process_sensor(&scenario, &sensor_id, counts, weather);
            histories
                .entry(sensor_id.clone())
                .or_default()
                .push(*timestamp, point.reading.pm25());
            snapshot.insert(sensor_id, point);
        }

        readings_writer.write_cycle(*timestamp, &snapshot)?;
        last_cycle_timestamp = Some(*timestamp);
    }
    readings_writer.flush()?;

    ensure!(
        !snapshot.is_empty(),
        "No cycle produced any readings (missing weather coverage?)"
    );
    info!(
        "Replayed {} cycles over {} sensors",
        cycles.len(),
        snapshot.len()
    );

    // The final snapshot is the consistent state all derived products are built from
    let grid = grid_from_snapshot(&snapshot, settings)?;
    output::write_grid(&output_dir, &grid)?;

    let step = TimeDelta::minutes(settings.forecast.step_minutes);
    let forecasts: IndexMap<SensorID, ForecastSeries> = histories
        .iter()
        .map(|(sensor_id, history)| {
            let series = generate_forecast(
                history,
                &settings.forecast.smoothing,
                settings.forecast.horizon_steps,
                step,
            );
            (sensor_id.clone(), series)
        })
        .collect();
    output::write_forecasts(&output_dir, &forecasts)?;

    if let Some((from, to)) = settings.route.endpoints() {
        let outcome = find_green_route(&from, &to, &grid, &settings.route.config)?;
        match &outcome {
            RouteOutcome::Found(result) => info!(
                "Green route: {:.2} km, exposure reduced by {:.1}%",
                result.green.distance.value(),
                result.exposure_reduction_percent
            ),
            RouteOutcome::NoRoute => warn!("No route between the configured endpoints"),
        }
        output::write_route(&output_dir, &outcome)?;
    }

    write_metadata(&output_dir, scenario_dir)?;
    if let Some(timestamp) = last_cycle_timestamp {
        info!("Final cycle at {timestamp}; results written to {}", output_dir.display());
    }

    Ok(())
}
