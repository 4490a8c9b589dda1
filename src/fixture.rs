//! Fixtures for tests

use crate::emission::{EmissionFactorTable, calculate_emission_rate};
use crate::geo::Coordinate;
use crate::health::calculate_health;
use crate::pollution::calculate_reading;
use crate::sensor::{SensorPoint, SensorSite, SensorSiteMap, SensorSnapshot};
use crate::traffic::VehicleCounts;
use crate::weather::WeatherSample;
use chrono::{DateTime, Utc};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// The timestamp the fixture observations share
pub fn fixture_timestamp() -> DateTime<Utc> {
    "2026-03-02T08:00:00Z".parse().unwrap()
}

#[fixture]
pub fn weather() -> WeatherSample {
    WeatherSample::new(fixture_timestamp(), 3.6, 280.0, 18.0, 55.0).unwrap()
}

#[fixture]
pub fn sites() -> SensorSiteMap {
    [
        SensorSite {
            id: "cam-north".into(),
            name: "North Gate".to_string(),
            coordinate: Coordinate::new(40.7680, -73.9815),
        },
        SensorSite {
            id: "cam-south".into(),
            name: "South Gate".to_string(),
            coordinate: Coordinate::new(40.7359, -73.9911),
        },
    ]
    .into_iter()
    .map(|site| (site.id.clone(), site))
    .collect()
}

#[fixture]
pub fn snapshot(sites: SensorSiteMap, weather: WeatherSample) -> SensorSnapshot {
    let factors = EmissionFactorTable::default();
    sites
        .into_values()
        .map(|site| {
            let counts =
                VehicleCounts::from_labelled_counts([("car", 40), ("truck", 5), ("bus", 8)]);
            let emission = calculate_emission_rate(&counts, &factors);
            let reading = calculate_reading(&emission, &weather);
            let health = calculate_health(&reading);
            (
                site.id.clone(),
                SensorPoint {
                    site,
                    vehicles: counts,
                    weather,
                    emission,
                    reading,
                    health,
                },
            )
        })
        .collect()
}
