//! Emission rate computation from vehicle counts and per-class emission factors.
//!
//! Factors are grams per vehicle per second at typical urban stop-and-go speeds, derived from
//! EPA AP-42 and MOVES reference data. The factor table is loaded once at startup; the defaults
//! below back the bundled scenarios and the test fixtures.
use crate::traffic::{VehicleClass, VehicleCounts};
use crate::units::GramsPerSecond;
use indexmap::IndexMap;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use strum::EnumIter;

/// A pollutant species tracked by the pipeline
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    SerializeLabeledStringEnum,
    DeserializeLabeledStringEnum,
)]
pub enum Pollutant {
    /// Fine particulate matter (diameter < 2.5 µm)
    #[string = "pm25"]
    Pm25,
    /// Coarse particulate matter (diameter < 10 µm)
    #[string = "pm10"]
    Pm10,
    /// Nitrogen oxides
    #[string = "nox"]
    NOx,
    /// Carbon monoxide
    #[string = "co"]
    Co,
}

/// Per-class, per-pollutant emission factors in g/vehicle/s
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionFactorTable(IndexMap<(VehicleClass, Pollutant), GramsPerSecond>);

impl EmissionFactorTable {
    /// An empty factor table
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Set the factor for a class/pollutant pair
    pub fn insert(&mut self, class: VehicleClass, pollutant: Pollutant, factor: GramsPerSecond) {
        self.0.insert((class, pollutant), factor);
    }

    /// The factor for a class/pollutant pair.
    ///
    /// A missing entry contributes nothing rather than failing: a class without a factor behaves
    /// like a class the detector never reported.
    pub fn get(&self, class: VehicleClass, pollutant: Pollutant) -> GramsPerSecond {
        self.0
            .get(&(class, pollutant))
            .copied()
            .unwrap_or(GramsPerSecond(0.0))
    }

    /// Number of (class, pollutant) entries in the table
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for EmissionFactorTable {
    /// Reference factors approximated from EPA AP-42 and MOVES for urban traffic (~25 km/h)
    fn default() -> Self {
        use Pollutant::{Co, NOx, Pm10, Pm25};
        use VehicleClass::{Bus, Car, Motorcycle, Truck};

        let factors = [
            (Truck, Pm25, 0.070),
            (Truck, Pm10, 0.120),
            (Truck, NOx, 2.50),
            (Truck, Co, 1.80),
            (Car, Pm25, 0.005),
            (Car, Pm10, 0.010),
            (Car, NOx, 0.15),
            (Car, Co, 1.20),
            (Bus, Pm25, 0.055),
            (Bus, Pm10, 0.095),
            (Bus, NOx, 2.10),
            (Bus, Co, 1.50),
            (Motorcycle, Pm25, 0.008),
            (Motorcycle, Pm10, 0.015),
            (Motorcycle, NOx, 0.10),
            (Motorcycle, Co, 2.50),
        ];

        Self(
            factors
                .into_iter()
                .map(|(class, pollutant, factor)| ((class, pollutant), GramsPerSecond(factor)))
                .collect(),
        )
    }
}

/// Source emission rates in g/s per pollutant, fixed once computed for a counts snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionRate(IndexMap<Pollutant, GramsPerSecond>);

impl EmissionRate {
    /// The emission rate for the given pollutant (zero if absent)
    pub fn get(&self, pollutant: Pollutant) -> GramsPerSecond {
        self.0
            .get(&pollutant)
            .copied()
            .unwrap_or(GramsPerSecond(0.0))
    }

    /// Iterate over (pollutant, rate) pairs
    pub fn iter(&self) -> impl Iterator<Item = (Pollutant, GramsPerSecond)> + '_ {
        self.0.iter().map(|(pollutant, rate)| (*pollutant, *rate))
    }
}

impl FromIterator<(Pollutant, GramsPerSecond)> for EmissionRate {
    fn from_iter<I: IntoIterator<Item = (Pollutant, GramsPerSecond)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Total source emission rate per pollutant for one sampling cycle.
///
/// For each pollutant this is the sum of count × factor over all vehicle classes. The function
/// is pure and total: classes with no factor (or no counts) simply contribute zero.
pub fn calculate_emission_rate(
    counts: &VehicleCounts,
    factors: &EmissionFactorTable,
) -> EmissionRate {
    use strum::IntoEnumIterator;

    Pollutant::iter()
        .map(|pollutant| {
            let rate = counts
                .iter()
                .map(|(class, count)| GramsPerSecond(count as f64 * factors.get(class, pollutant).value()))
                .sum();
            (pollutant, rate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn test_zero_counts_zero_rate() {
        let rate = calculate_emission_rate(&VehicleCounts::new(), &EmissionFactorTable::default());
        for pollutant in Pollutant::iter() {
            assert_approx_eq!(f64, rate.get(pollutant).value(), 0.0);
        }
    }

    #[test]
    fn test_single_class_rate() {
        let counts = [(VehicleClass::Truck, 10)].into_iter().collect();
        let rate = calculate_emission_rate(&counts, &EmissionFactorTable::default());
        assert_approx_eq!(f64, rate.get(Pollutant::Pm25).value(), 0.70);
        assert_approx_eq!(f64, rate.get(Pollutant::NOx).value(), 25.0);
    }

    #[test]
    fn test_rates_sum_across_classes() {
        let counts: VehicleCounts = [(VehicleClass::Car, 40), (VehicleClass::Bus, 8)]
            .into_iter()
            .collect();
        let rate = calculate_emission_rate(&counts, &EmissionFactorTable::default());
        // 40 * 0.005 + 8 * 0.055
        assert_approx_eq!(f64, rate.get(Pollutant::Pm25).value(), 0.64, epsilon = 1e-12);
    }

    #[test]
    fn test_class_without_factors_contributes_zero() {
        let mut factors = EmissionFactorTable::new();
        factors.insert(VehicleClass::Car, Pollutant::Pm25, GramsPerSecond(0.005));

        let counts: VehicleCounts = [(VehicleClass::Car, 10), (VehicleClass::Truck, 10)]
            .into_iter()
            .collect();
        let rate = calculate_emission_rate(&counts, &factors);
        assert_approx_eq!(f64, rate.get(Pollutant::Pm25).value(), 0.05);
        assert_approx_eq!(f64, rate.get(Pollutant::Co).value(), 0.0);
    }
}
