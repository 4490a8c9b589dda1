//! The command line interface for the pipeline.
use crate::geo::Coordinate;
use crate::settings::Settings;
use crate::{log, pipeline};
use ::log::info;
use anyhow::{Context, Result, ensure};
use clap::{Parser, Subcommand};
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the bundled example scenarios.
pub const SCENARIOS_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/scenarios");

#[derive(Parser)]
#[command(version, about)]
/// The command line interface for the pipeline.
pub struct Cli {
    #[command(subcommand)]
    /// The available commands.
    pub command: Commands,
}

#[derive(Subcommand)]
/// The available commands.
pub enum Commands {
    /// Replay a scenario through the pipeline.
    Run {
        #[arg(help = "Path to the scenario directory")]
        /// Path to the scenario directory.
        scenario_dir: PathBuf,
    },
    /// Replay a scenario and compute a route between two points.
    Route {
        #[arg(help = "Path to the scenario directory")]
        /// Path to the scenario directory.
        scenario_dir: PathBuf,
        /// Origin as "lat,lon".
        #[arg(long)]
        from: String,
        /// Destination as "lat,lon".
        #[arg(long)]
        to: String,
    },
    /// Manage example scenarios.
    Example {
        #[command(subcommand)]
        /// The available subcommands for managing example scenarios.
        subcommand: ExampleSubcommands,
    },
}

#[derive(Subcommand)]
/// The available subcommands for managing example scenarios.
pub enum ExampleSubcommands {
    /// List available examples.
    List,
    /// Run an example.
    Run {
        /// The name of the example to run.
        name: String,
    },
}

/// Parse a "lat,lon" argument into a coordinate
fn parse_coordinate(arg: &str) -> Result<Coordinate> {
    let parts: Vec<&str> = arg.split(',').collect();
    ensure!(
        parts.len() == 2,
        "Coordinate must be given as \"lat,lon\", got \"{arg}\""
    );
    let lat = parts[0]
        .trim()
        .parse()
        .with_context(|| format!("Invalid latitude \"{}\"", parts[0]))?;
    let lon = parts[1]
        .trim()
        .parse()
        .with_context(|| format!("Invalid longitude \"{}\"", parts[1]))?;
    Ok(Coordinate::new(lat, lon))
}

/// Handle the `run` command.
pub fn handle_run_command(scenario_dir: &Path) -> Result<()> {
    let settings = Settings::from_path(scenario_dir)?;
    log::init(settings.log_level.as_deref()).context("Failed to initialize logging.")?;
    pipeline::run(scenario_dir, &settings)
}

/// Handle the `route` command.
///
/// Runs the full pipeline with the route endpoints from the command line taking precedence over
/// any configured in the scenario's settings file.
pub fn handle_route_command(scenario_dir: &Path, from: &str, to: &str) -> Result<()> {
    let from = parse_coordinate(from)?;
    let to = parse_coordinate(to)?;

    let mut settings = Settings::from_path(scenario_dir)?;
    settings.route.from_lat = Some(from.lat);
    settings.route.from_lon = Some(from.lon);
    settings.route.to_lat = Some(to.lat);
    settings.route.to_lon = Some(to.lon);

    log::init(settings.log_level.as_deref()).context("Failed to initialize logging.")?;
    pipeline::run(scenario_dir, &settings)
}

/// Handle the `example run` command.
pub fn handle_example_run_command(name: &str) -> Result<()> {
    // Find the subdirectory in SCENARIOS_DIR whose name matches `name`.
    let sub_dir = SCENARIOS_DIR.get_dir(name).context("Scenario not found.")?;

    // Copy the bundled scenario files to a temporary directory
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    for entry in sub_dir.entries() {
        match entry {
            DirEntry::File(f) => {
                let file_name = f.path().file_name().unwrap();
                let file_path = temp_dir.path().join(file_name);
                fs::write(&file_path, f.contents())?;
            }
            DirEntry::Dir(_) => {
                return Err(anyhow::anyhow!("Nested directories are not supported."));
            }
        }
    }

    info!("Running example scenario: {}", name);
    handle_run_command(temp_dir.path())
}

/// Handle the `example list` command.
pub fn handle_example_list_command() -> Result<()> {
    for entry in SCENARIOS_DIR.dirs() {
        println!("{}", entry.path().display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_parse_coordinate() {
        let coordinate = parse_coordinate("40.752, -73.99").unwrap();
        assert_approx_eq!(f64, coordinate.lat, 40.752);
        assert_approx_eq!(f64, coordinate.lon, -73.99);
    }

    #[test]
    fn test_parse_coordinate_rejects_garbage() {
        assert!(parse_coordinate("40.752").is_err());
        assert!(parse_coordinate("north,south").is_err());
    }

    #[test]
    fn test_bundled_scenarios_are_listed() {
        assert!(SCENARIOS_DIR.get_dir("downtown").is_some());
    }
}
