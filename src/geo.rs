//! Geographic primitives: coordinates and great-circle distances.
use crate::units::{Kilometres, Metres};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres
const MEAN_EARTH_RADIUS_KM: f64 = 6371.0;

/// Metres per degree of latitude (and of longitude at the equator)
const METRES_PER_DEGREE: f64 = 111_320.0;

/// A geographic point in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in decimal degrees (positive north)
    pub lat: f64,
    /// Longitude in decimal degrees (positive east)
    pub lon: f64,
}

impl Coordinate {
    /// Create a new coordinate
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// The midpoint between two coordinates.
    ///
    /// Arithmetic mean is accurate enough at street scale; the router samples pollution at edge
    /// midpoints a few hundred metres apart.
    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        Coordinate {
            lat: (self.lat + other.lat) / 2.0,
            lon: (self.lon + other.lon) / 2.0,
        }
    }
}

/// Great-circle distance between two points via the haversine formula
pub fn haversine(a: &Coordinate, b: &Coordinate) -> Kilometres {
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    Kilometres(MEAN_EARTH_RADIUS_KM * c)
}

/// Great-circle distance in metres (used by the variogram and kriging system)
pub fn haversine_metres(a: &Coordinate, b: &Coordinate) -> Metres {
    haversine(a, b).to_metres()
}

/// The local east/north offset in metres from `origin` to `target`.
///
/// Uses the equirectangular approximation with the longitude step scaled by cos(latitude), which
/// is accurate at the sub-city scales the dispersion model operates over.
pub fn local_offset_metres(origin: &Coordinate, target: &Coordinate) -> (Metres, Metres) {
    let east = (target.lon - origin.lon) * METRES_PER_DEGREE * origin.lat.to_radians().cos();
    let north = (target.lat - origin.lat) * METRES_PER_DEGREE;
    (Metres(east), Metres(north))
}
