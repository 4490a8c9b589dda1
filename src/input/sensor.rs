//! Code for reading sensor site definitions from CSV files.
use crate::geo::Coordinate;
use crate::id::define_id_getter;
use crate::input::read_csv_id_file;
use crate::sensor::{SensorID, SensorSite, SensorSiteMap};
use anyhow::{Result, ensure};
use serde::Deserialize;
use std::path::Path;

const SENSORS_FILE_NAME: &str = "sensors.csv";

/// A sensor site as represented in the input file
#[derive(Debug, Deserialize, PartialEq)]
struct SensorSiteRaw {
    id: SensorID,
    name: String,
    lat: f64,
    lon: f64,
}
define_id_getter! {SensorSiteRaw, SensorID}

impl SensorSiteRaw {
    fn into_site(self) -> Result<SensorSite> {
        ensure!(
            (-90.0..=90.0).contains(&self.lat),
            "Sensor {}: latitude {} out of range",
            self.id,
            self.lat
        );
        ensure!(
            (-180.0..=180.0).contains(&self.lon),
            "Sensor {}: longitude {} out of range",
            self.id,
            self.lon
        );
        Ok(SensorSite {
            id: self.id,
            name: self.name,
            coordinate: Coordinate::new(self.lat, self.lon),
        })
    }
}

/// Reads sensor sites from a CSV file.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario configuration files
///
/// # Returns
///
/// A map of sites keyed by sensor ID, in file order, or an error.
pub fn read_sensor_sites(scenario_dir: &Path) -> Result<SensorSiteMap> {
    let file_path = scenario_dir.join(SENSORS_FILE_NAME);
    read_csv_id_file::<SensorID, SensorSiteRaw>(&file_path)?
        .into_values()
        .map(|raw| {
            let site = raw.into_site()?;
            Ok((site.id.clone(), site))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    /// Create an example sensors file in dir_path
    fn create_sensors_file(dir_path: &Path, contents: &str) {
        let file_path = dir_path.join(SENSORS_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[test]
    fn test_read_sensor_sites() {
        let dir = tempdir().unwrap();
        create_sensors_file(
            dir.path(),
            "id,name,lat,lon
cam-times-square,Times Square,40.7580,-73.9855
cam-union-square,Union Square,40.7359,-73.9911",
        );
        let sites = read_sensor_sites(dir.path()).unwrap();
        assert_eq!(sites.len(), 2);
        let site = &sites["cam-times-square"];
        assert_eq!(site.name, "Times Square");
        assert_eq!(site.coordinate, Coordinate::new(40.7580, -73.9855));
    }

    #[test]
    fn test_out_of_range_latitude_rejected() {
        let dir = tempdir().unwrap();
        create_sensors_file(dir.path(), "id,name,lat,lon\ncam-1,Broken,95.0,-73.99");
        assert_error!(
            read_sensor_sites(dir.path()),
            "Sensor cam-1: latitude 95 out of range"
        );
    }
}
