//! Code for reading the emission factor table from CSV files.
use crate::emission::{EmissionFactorTable, Pollutant};
use crate::input::read_csv;
use crate::traffic::VehicleClass;
use crate::units::GramsPerSecond;
use anyhow::{Result, ensure};
use serde::Deserialize;
use std::path::Path;

const EMISSION_FACTORS_FILE_NAME: &str = "emission_factors.csv";

/// One factor table entry as represented in the input file.
///
/// `vehicle_class` and `pollutant` parse strictly here: a typo in the reference table is a
/// configuration error, unlike a novel label in the traffic stream.
#[derive(Debug, Deserialize, PartialEq)]
struct EmissionFactorRaw {
    vehicle_class: VehicleClass,
    pollutant: Pollutant,
    grams_per_second: f64,
}

/// Reads the emission factor table from a CSV file.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario configuration files
///
/// # Returns
///
/// The populated factor table, or an error for negative or duplicate entries.
pub fn read_emission_factors(scenario_dir: &Path) -> Result<EmissionFactorTable> {
    let file_path = scenario_dir.join(EMISSION_FACTORS_FILE_NAME);
    let mut table = EmissionFactorTable::new();
    let mut seen = std::collections::HashSet::new();
    for raw in read_csv::<EmissionFactorRaw>(&file_path)? {
        ensure!(
            raw.grams_per_second >= 0.0,
            "Emission factor for {:?}/{:?} must be non-negative, got {}",
            raw.vehicle_class,
            raw.pollutant,
            raw.grams_per_second
        );
        ensure!(
            seen.insert((raw.vehicle_class, raw.pollutant)),
            "Duplicate emission factor for {:?}/{:?} in {}",
            raw.vehicle_class,
            raw.pollutant,
            file_path.display()
        );
        table.insert(
            raw.vehicle_class,
            raw.pollutant,
            GramsPerSecond(raw.grams_per_second),
        );
    }
    Ok(table)
}
