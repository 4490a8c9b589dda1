//! Common routines for reading scenario input files.
use crate::id::{HasID, IDLike};
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

pub mod emission_factor;
pub mod sensor;
pub mod traffic;
pub mod weather;

use crate::emission::EmissionFactorTable;
use crate::sensor::SensorSiteMap;
use emission_factor::read_emission_factors;
use sensor::read_sensor_sites;
use traffic::{TrafficRecord, read_traffic_records};
use weather::read_weather_samples;

/// Read a series of type `T`s from a CSV file into a `Vec<T>`.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<T: DeserializeOwned>(file_path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(file_path)
        .with_context(|| format!("Could not open {}", file_path.display()))?;

    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: T =
            result.with_context(|| format!("Error reading {}", file_path.display()))?;
        records.push(record);
    }

    ensure!(
        !records.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(records)
}

/// Read a CSV file of records with unique IDs into a map keyed by ID, preserving file order.
pub fn read_csv_id_file<ID: IDLike, T>(file_path: &Path) -> Result<IndexMap<ID, T>>
where
    T: HasID<ID> + DeserializeOwned,
{
    let mut map = IndexMap::new();
    for record in read_csv::<T>(file_path)? {
        let id = record.get_id().clone();
        ensure!(
            map.insert(id.clone(), record).is_none(),
            "Duplicate ID {} in {}",
            id,
            file_path.display()
        );
    }

    Ok(map)
}

/// Parse a TOML file into the given type.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let contents = fs::read_to_string(file_path)
        .with_context(|| format!("Could not read {}", file_path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Could not parse {}", file_path.display()))
}

/// All observation data for one scenario, loaded up front
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// Known sensor sites
    pub sites: SensorSiteMap,
    /// Static emission factor table
    pub emission_factors: EmissionFactorTable,
    /// Timestamped per-class vehicle counts, in file order
    pub traffic: Vec<TrafficRecord>,
    /// Timestamped weather samples, in file order
    pub weather: Vec<crate::weather::WeatherSample>,
}

/// Load a complete scenario from the given directory.
///
/// Expects `sensors.csv`, `emission_factors.csv`, `traffic.csv` and `weather.csv`. Traffic
/// records referring to unknown sensors are input errors; unknown vehicle class labels are
/// tolerated downstream.
pub fn load_scenario(scenario_dir: &Path) -> Result<Scenario> {
    let sites = read_sensor_sites(scenario_dir)?;
    let emission_factors = read_emission_factors(scenario_dir)?;
    let traffic = read_traffic_records(scenario_dir, &sites)?;
    let weather = read_weather_samples(scenario_dir)?;

    Ok(Scenario {
        sites,
        emission_factors,
        traffic,
        weather,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use serde::Deserialize;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    use crate::id::{GenericID, define_id_getter};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: GenericID,
        value: f64,
    }
    define_id_getter! {Row, GenericID}

    #[test]
    fn test_read_csv() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("rows.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id,value\na,1.0\nb,2.0").unwrap();
        }
        let rows: Vec<Row> = read_csv(&file_path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].value, 2.0);
    }

    #[test]
    fn test_read_csv_empty_file_rejected() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("rows.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id,value").unwrap();
        }
        let result: Result<Vec<Row>> = read_csv(&file_path);
        assert_error!(
            result,
            format!("CSV file {} cannot be empty", file_path.display())
        );
    }

    #[test]
    fn test_read_csv_id_file_duplicate_rejected() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("rows.csv");
        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "id,value\na,1.0\na,2.0").unwrap();
        }
        let result: Result<IndexMap<GenericID, Row>> = read_csv_id_file(&file_path);
        assert_error!(
            result,
            format!("Duplicate ID a in {}", file_path.display())
        );
    }
}
