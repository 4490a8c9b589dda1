//! Code for reading timestamped traffic observations from CSV files.
use crate::input::read_csv;
use crate::sensor::{SensorID, SensorSiteMap};
use anyhow::{Result, ensure};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;

const TRAFFIC_FILE_NAME: &str = "traffic.csv";

/// One detector observation: a count for one vehicle class at one sensor and time.
///
/// The class is kept as the detector's raw label; matching against known classes (and dropping
/// unknown ones) happens when counts are aggregated, so a detector that grows new labels keeps
/// replaying cleanly.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TrafficRecord {
    /// Observation time (UTC)
    pub timestamp: DateTime<Utc>,
    /// The reporting sensor
    pub sensor_id: SensorID,
    /// Detector label for the vehicle class
    pub vehicle_class: String,
    /// Number of vehicles observed
    pub count: u32,
}

/// Reads traffic observations from a CSV file.
///
/// # Arguments
///
/// * `scenario_dir` - Folder containing scenario configuration files
/// * `sites` - Known sensor sites; records for unknown sensors are input errors
///
/// # Returns
///
/// The observations in file order, or an error.
pub fn read_traffic_records(
    scenario_dir: &Path,
    sites: &SensorSiteMap,
) -> Result<Vec<TrafficRecord>> {
    let file_path = scenario_dir.join(TRAFFIC_FILE_NAME);
    let records = read_csv::<TrafficRecord>(&file_path)?;
    for record in &records {
        ensure!(
            sites.contains_key(&record.sensor_id),
            "Traffic record for unknown sensor {} in {}",
            record.sensor_id,
            file_path.display()
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::sites;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;

    fn create_traffic_file(dir_path: &Path, contents: &str) {
        let file_path = dir_path.join(TRAFFIC_FILE_NAME);
        let mut file = File::create(file_path).unwrap();
        writeln!(file, "{contents}").unwrap();
    }

    #[rstest]
    fn test_read_traffic_records(sites: SensorSiteMap) {
        let dir = tempfile::tempdir().unwrap();
        create_traffic_file(
            dir.path(),
            "timestamp,sensor_id,vehicle_class,count
2026-03-02T08:00:00Z,cam-north,car,40
2026-03-02T08:00:00Z,cam-north,truck,5
2026-03-02T08:00:00Z,cam-south,rickshaw,3",
        );
        let records = read_traffic_records(dir.path(), &sites).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].count, 5);
        // Unknown class labels load fine; they are filtered during aggregation
        assert_eq!(records[2].vehicle_class, "rickshaw");
    }

    #[rstest]
    fn test_unknown_sensor_rejected(sites: SensorSiteMap) {
        let dir = tempfile::tempdir().unwrap();
        create_traffic_file(
            dir.path(),
            "timestamp,sensor_id,vehicle_class,count\n2026-03-02T08:00:00Z,cam-mystery,car,40",
        );
        assert!(read_traffic_records(dir.path(), &sites).is_err());
    }

    #[rstest]
    fn test_negative_count_rejected(sites: SensorSiteMap) {
        let dir = tempfile::tempdir().unwrap();
        create_traffic_file(
            dir.path(),
            "timestamp,sensor_id,vehicle_class,count\n2026-03-02T08:00:00Z,cam-north,car,-4",
        );
        assert!(read_traffic_records(dir.path(), &sites).is_err());
    }
}
