//! Pollution readings at the monitored receptor point of a sensor.
//!
//! A reading is a pure function of the emission rate, the weather sample and the fixed receptor
//! geometry (50 m downwind of the road at breathing height): the plume concentration per
//! pollutant plus typical urban background levels, with deterministic temperature and humidity
//! corrections, and the derived AQI.
use crate::aqi::{AqiCategory, aqi_category, pm25_to_aqi};
use crate::dispersion::{
    RECEPTOR_DOWNWIND, RECEPTOR_HEIGHT, Receptor, SOURCE_HEIGHT, StabilityClass,
    plume_concentration,
};
use crate::emission::{EmissionRate, Pollutant};
use crate::units::{Metres, MicrogramsPerCubicMetre};
use crate::weather::WeatherSample;
use chrono::Timelike;
use indexmap::IndexMap;

/// Typical urban background concentration added on top of the local plume (µg/m³)
fn background(pollutant: Pollutant) -> MicrogramsPerCubicMetre {
    let value = match pollutant {
        Pollutant::Pm25 => 5.0,
        Pollutant::Pm10 => 12.0,
        Pollutant::NOx => 15.0,
        Pollutant::Co => 200.0,
    };
    MicrogramsPerCubicMetre(value)
}

/// Lower bound on reported concentrations: ambient air is never perfectly clean (µg/m³)
fn ambient_floor(pollutant: Pollutant) -> MicrogramsPerCubicMetre {
    let value = match pollutant {
        Pollutant::Pm25 => 1.0,
        Pollutant::Pm10 => 2.0,
        Pollutant::NOx => 2.0,
        Pollutant::Co => 50.0,
    };
    MicrogramsPerCubicMetre(value)
}

/// Concentration per pollutant at one receptor plus the derived AQI
#[derive(Debug, Clone, PartialEq)]
pub struct PollutionReading {
    concentrations: IndexMap<Pollutant, MicrogramsPerCubicMetre>,
    /// Air Quality Index (0-500) derived from the PM2.5 concentration
    pub aqi: u16,
    /// EPA health concern category for the AQI
    pub category: AqiCategory,
    /// The stability class the dispersion ran under
    pub stability: StabilityClass,
}

impl PollutionReading {
    /// Build a reading from per-pollutant concentrations
    pub fn from_concentrations(
        concentrations: IndexMap<Pollutant, MicrogramsPerCubicMetre>,
        stability: StabilityClass,
    ) -> Self {
        let aqi = pm25_to_aqi(
            concentrations
                .get(&Pollutant::Pm25)
                .copied()
                .unwrap_or(MicrogramsPerCubicMetre(0.0)),
        );
        Self {
            concentrations,
            aqi,
            category: aqi_category(aqi),
            stability,
        }
    }

    /// The concentration of the given pollutant (zero if absent)
    pub fn get(&self, pollutant: Pollutant) -> MicrogramsPerCubicMetre {
        self.concentrations
            .get(&pollutant)
            .copied()
            .unwrap_or(MicrogramsPerCubicMetre(0.0))
    }

    /// The PM2.5 concentration, the pollutant the surface, forecasts and routing run on
    pub fn pm25(&self) -> MicrogramsPerCubicMetre {
        self.get(Pollutant::Pm25)
    }
}

/// Compute the pollution reading at a sensor's receptor for one sampling cycle.
///
/// Deterministic given its inputs; calling it twice with the same emission rate and weather
/// sample yields the identical reading.
pub fn calculate_reading(emission: &EmissionRate, weather: &WeatherSample) -> PollutionReading {
    let stability = StabilityClass::from_conditions(weather.wind_speed, weather.timestamp.hour());
    let receptor = Receptor {
        downwind: RECEPTOR_DOWNWIND,
        crosswind: Metres(0.0),
        height: RECEPTOR_HEIGHT,
    };

    // Warmer air accelerates photochemical NOx production; humid air promotes particulate
    // formation.
    let temperature_factor = 1.0 + (weather.temperature - 20.0).max(0.0) * 0.01;
    let humidity_factor = 1.0 + (weather.humidity - 60.0).max(0.0) * 0.005;

    let concentrations = emission
        .iter()
        .map(|(pollutant, rate)| {
            let plume =
                plume_concentration(rate, weather.wind_speed, receptor, SOURCE_HEIGHT, stability);
            let mut value = (plume + background(pollutant)).value();
            value *= match pollutant {
                Pollutant::NOx => temperature_factor,
                Pollutant::Pm25 | Pollutant::Pm10 => humidity_factor,
                Pollutant::Co => 1.0,
            };
            (
                pollutant,
                MicrogramsPerCubicMetre(value).max(ambient_floor(pollutant)),
            )
        })
        .collect();

    PollutionReading::from_concentrations(concentrations, stability)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emission::{EmissionFactorTable, calculate_emission_rate};
    use crate::traffic::VehicleCounts;
    use crate::units::GramsPerSecond;
    use chrono::{DateTime, Utc};
    use float_cmp::assert_approx_eq;
    use strum::IntoEnumIterator;

    fn ts() -> DateTime<Utc> {
        "2026-03-02T12:00:00Z".parse().unwrap()
    }

    fn zero_emission() -> EmissionRate {
        Pollutant::iter()
            .map(|p| (p, GramsPerSecond(0.0)))
            .collect()
    }

    #[test]
    fn test_zero_emission_gives_background() {
        let weather = WeatherSample::new(ts(), 3.0, 180.0, 18.0, 50.0).unwrap();
        let reading = calculate_reading(&zero_emission(), &weather);
        assert_approx_eq!(f64, reading.pm25().value(), 5.0);
        assert_approx_eq!(f64, reading.get(Pollutant::Co).value(), 200.0);
    }

    #[test]
    fn test_reading_is_deterministic() {
        let weather = WeatherSample::new(ts(), 3.6, 280.0, 24.0, 70.0).unwrap();
        let counts = VehicleCounts::from_labelled_counts([("truck", 5), ("car", 40)]);
        let emission = calculate_emission_rate(&counts, &EmissionFactorTable::default());
        assert_eq!(
            calculate_reading(&emission, &weather),
            calculate_reading(&emission, &weather)
        );
    }

    #[test]
    fn test_warm_weather_raises_nox() {
        let emission = zero_emission();
        let cool = WeatherSample::new(ts(), 3.0, 180.0, 15.0, 50.0).unwrap();
        let warm = WeatherSample::new(ts(), 3.0, 180.0, 30.0, 50.0).unwrap();
        let nox_cool = calculate_reading(&emission, &cool).get(Pollutant::NOx);
        let nox_warm = calculate_reading(&emission, &warm).get(Pollutant::NOx);
        assert!(nox_warm > nox_cool);
        // 10 degrees over the 20 degree threshold is a 10% uplift
        assert_approx_eq!(f64, nox_warm.value(), 15.0 * 1.1);
    }

    #[test]
    fn test_humid_weather_raises_particulates() {
        let emission = zero_emission();
        let dry = WeatherSample::new(ts(), 3.0, 180.0, 18.0, 40.0).unwrap();
        let humid = WeatherSample::new(ts(), 3.0, 180.0, 18.0, 90.0).unwrap();
        assert!(
            calculate_reading(&emission, &humid).pm25() > calculate_reading(&emission, &dry).pm25()
        );
    }

    #[test]
    fn test_aqi_matches_pm25() {
        let weather = WeatherSample::new(ts(), 1.0, 90.0, 18.0, 50.0).unwrap();
        let counts = VehicleCounts::from_labelled_counts([("truck", 50), ("bus", 30)]);
        let emission = calculate_emission_rate(&counts, &EmissionFactorTable::default());
        let reading = calculate_reading(&emission, &weather);
        assert_eq!(reading.aqi, pm25_to_aqi(reading.pm25()));
        assert_eq!(reading.category, aqi_category(reading.aqi));
    }
}
