//! Sensor sites and the per-cycle snapshot of their computed state.
use crate::emission::EmissionRate;
use crate::geo::Coordinate;
use crate::health::HealthSummary;
use crate::id::define_id_type;
use crate::pollution::PollutionReading;
use crate::traffic::VehicleCounts;
use crate::weather::WeatherSample;
use indexmap::IndexMap;

define_id_type! {SensorID}

/// A monitored location: a traffic camera paired with a virtual receptor
#[derive(Debug, Clone, PartialEq)]
pub struct SensorSite {
    /// Unique sensor identifier
    pub id: SensorID,
    /// Human-readable location name
    pub name: String,
    /// Geographic position of the site
    pub coordinate: Coordinate,
}

/// The known sensor sites, keyed by ID in input-file order
pub type SensorSiteMap = IndexMap<SensorID, SensorSite>;

/// One sensor's full state at the end of a sampling cycle
#[derive(Debug, Clone, PartialEq)]
pub struct SensorPoint {
    /// The site this state belongs to
    pub site: SensorSite,
    /// Vehicle counts observed this cycle
    pub vehicles: VehicleCounts,
    /// Weather sample in effect this cycle
    pub weather: WeatherSample,
    /// Emission rates derived from the counts
    pub emission: EmissionRate,
    /// Computed pollution reading at the receptor
    pub reading: PollutionReading,
    /// Health metrics derived from the reading
    pub health: HealthSummary,
}

/// An immutable snapshot of every sensor's state for one cycle.
///
/// The interpolator and router operate on a snapshot passed by reference, so a grid build always
/// sees readings taken in the same cycle; concurrent consumers can share it freely.
pub type SensorSnapshot = IndexMap<SensorID, SensorPoint>;
