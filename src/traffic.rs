//! Vehicle classes and per-cycle traffic counts supplied by the external detector.
use indexmap::IndexMap;
use log::warn;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use strum::{EnumIter, IntoEnumIterator};
use unicase::UniCase;

/// A vehicle class recognised by the emission factor table
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
pub enum VehicleClass {
    /// Heavy goods vehicles
    #[string = "truck"]
    Truck,
    /// Passenger cars
    #[string = "car"]
    Car,
    /// Buses and coaches
    #[string = "bus"]
    Bus,
    /// Motorcycles and mopeds
    #[string = "motorcycle"]
    Motorcycle,
}

impl VehicleClass {
    /// The canonical label for this class, as it appears in input files
    pub fn label(&self) -> &'static str {
        match self {
            VehicleClass::Truck => "truck",
            VehicleClass::Car => "car",
            VehicleClass::Bus => "bus",
            VehicleClass::Motorcycle => "motorcycle",
        }
    }

    /// Match a detector label against the known classes, ignoring case.
    ///
    /// Returns `None` for labels the detector emits that we have no factors for.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = UniCase::new(label);
        VehicleClass::iter().find(|class| UniCase::new(class.label()) == label)
    }
}

/// Vehicle counts per class at one sensor for one sampling cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VehicleCounts(IndexMap<VehicleClass, u32>);

impl VehicleCounts {
    /// An empty set of counts
    pub fn new() -> Self {
        Self::default()
    }

    /// Build counts from detector (label, count) pairs.
    ///
    /// Unknown labels contribute nothing: a detector that grows a new class must not corrupt the
    /// emission totals for the classes we do know. Repeated labels accumulate.
    pub fn from_labelled_counts<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, u32)>,
    {
        let mut counts = IndexMap::new();
        for (label, count) in pairs {
            match VehicleClass::from_label(label) {
                Some(class) => *counts.entry(class).or_insert(0) += count,
                None => warn!("Ignoring unrecognised vehicle class '{label}'"),
            }
        }
        Self(counts)
    }

    /// Add to the count for a single class
    pub fn insert(&mut self, class: VehicleClass, count: u32) {
        *self.0.entry(class).or_insert(0) += count;
    }

    /// The count for the given class (zero if absent)
    pub fn get(&self, class: VehicleClass) -> u32 {
        self.0.get(&class).copied().unwrap_or(0)
    }

    /// The total number of vehicles across all classes
    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    /// Iterate over (class, count) pairs
    pub fn iter(&self) -> impl Iterator<Item = (VehicleClass, u32)> + '_ {
        self.0.iter().map(|(class, count)| (*class, *count))
    }
}

impl FromIterator<(VehicleClass, u32)> for VehicleCounts {
    fn from_iter<I: IntoIterator<Item = (VehicleClass, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_case_insensitive() {
        assert_eq!(VehicleClass::from_label("Car"), Some(VehicleClass::Car));
        assert_eq!(VehicleClass::from_label("TRUCK"), Some(VehicleClass::Truck));
        assert_eq!(VehicleClass::from_label("rickshaw"), None);
    }

    #[test]
    fn test_unknown_labels_are_dropped() {
        let counts =
            VehicleCounts::from_labelled_counts([("car", 10), ("rickshaw", 7), ("bus", 2)]);
        assert_eq!(counts.get(VehicleClass::Car), 10);
        assert_eq!(counts.get(VehicleClass::Bus), 2);
        assert_eq!(counts.total(), 12);
    }

    #[test]
    fn test_repeated_labels_accumulate() {
        let counts = VehicleCounts::from_labelled_counts([("car", 3), ("CAR", 4)]);
        assert_eq!(counts.get(VehicleClass::Car), 7);
    }

    #[test]
    fn test_missing_class_is_zero() {
        let counts = VehicleCounts::from_labelled_counts([("bus", 1)]);
        assert_eq!(counts.get(VehicleClass::Motorcycle), 0);
    }
}
