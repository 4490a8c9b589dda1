//! Gaussian plume dispersion of a point source's emissions.
//!
//! Implements the standard plume equation with ground reflection:
//!
//! ```text
//! C(x,y,z) = Q / (2π·u·σy·σz) · exp(-y²/2σy²) · [exp(-(z-H)²/2σz²) + exp(-(z+H)²/2σz²)]
//! ```
//!
//! where x is downwind distance, y crosswind distance, z receptor height and H the effective
//! source height. The dispersion coefficients σy and σz are Pasquill-Gifford power laws with
//! stability-class-specific parameters from Turner (1994) curve fits.
//!
//! The plume does not propagate upwind: concentration is defined as zero for x ≤ 0, including
//! at the exact source point where σy and σz vanish.
use crate::geo::{Coordinate, local_offset_metres};
use crate::units::{GramsPerSecond, MetresPerSecond, Metres, MicrogramsPerCubicMetre};
use crate::weather::WeatherSample;
use chrono::Timelike;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};
use strum::EnumIter;

/// Wind speed floor applied to avoid the 1/u singularity in calm conditions (m/s)
pub const MIN_WIND_SPEED: MetresPerSecond = MetresPerSecond(0.5);

/// Floor for σy/σz so the exponent arguments stay finite as x approaches the source (m)
const MIN_SIGMA: f64 = 1e-3;

/// Receptor height above ground: the breathing zone (m)
pub const RECEPTOR_HEIGHT: Metres = Metres(1.5);

/// Effective source height of a vehicle tailpipe (m)
pub const SOURCE_HEIGHT: Metres = Metres(0.5);

/// Representative downwind distance from the road to the monitored receptor (m)
pub const RECEPTOR_DOWNWIND: Metres = Metres(50.0);

/// Pasquill-Gifford atmospheric stability class.
///
/// A is extremely unstable (strong vertical mixing), F moderately stable (weak mixing). The
/// class selects the σy/σz coefficient set; out-of-range classes are unrepresentable, and a bad
/// class label in serialised data fails at parse time rather than silently defaulting.
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
pub enum StabilityClass {
    /// Extremely unstable
    #[string = "A"]
    A,
    /// Moderately unstable
    #[string = "B"]
    B,
    /// Slightly unstable
    #[string = "C"]
    C,
    /// Neutral
    #[string = "D"]
    D,
    /// Slightly stable
    #[string = "E"]
    E,
    /// Moderately stable
    #[string = "F"]
    F,
}

/// Coefficients of the σ(x) power laws, with x in km and σ in km
struct SigmaCoefficients {
    sy_c: f64,
    sy_e: f64,
    sz_c: f64,
    sz_e: f64,
}

impl StabilityClass {
    /// Classify atmospheric stability from wind speed and hour of day (UTC).
    ///
    /// The hour stands in for insolation: daytime heating destabilises the boundary layer while
    /// clear nights stabilise it. Calm or low wind gives the more extreme class in either
    /// regime; at 5 m/s and above conditions are neutral around the clock.
    pub fn from_conditions(wind_speed: MetresPerSecond, hour: u32) -> Self {
        let u = wind_speed.value();
        let is_daytime = (7..=18).contains(&hour);
        if is_daytime {
            if u < 2.0 {
                StabilityClass::A
            } else if u < 3.0 {
                StabilityClass::B
            } else if u < 5.0 {
                StabilityClass::C
            } else {
                StabilityClass::D
            }
        } else if u < 3.0 {
            StabilityClass::F
        } else if u < 5.0 {
            StabilityClass::E
        } else {
            StabilityClass::D
        }
    }

    /// Turner (1994) curve-fit coefficients for this class
    fn sigma_coefficients(&self) -> SigmaCoefficients {
        let (sy_c, sy_e, sz_c, sz_e) = match self {
            StabilityClass::A => (0.22, 0.94, 0.20, 0.94),
            StabilityClass::B => (0.16, 0.92, 0.12, 0.92),
            StabilityClass::C => (0.11, 0.91, 0.08, 0.85),
            StabilityClass::D => (0.08, 0.89, 0.06, 0.82),
            StabilityClass::E => (0.06, 0.86, 0.03, 0.78),
            StabilityClass::F => (0.04, 0.83, 0.016, 0.72),
        };
        SigmaCoefficients {
            sy_c,
            sy_e,
            sz_c,
            sz_e,
        }
    }
}

/// Receptor position in the wind-aligned frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Receptor {
    /// Downwind distance from the source (positive in the direction the wind blows to)
    pub downwind: Metres,
    /// Crosswind distance from the plume centreline
    pub crosswind: Metres,
    /// Height above ground
    pub height: Metres,
}

/// Rotate a local east/north offset into the wind-aligned frame.
///
/// `wind_direction` is the meteorological FROM bearing, so the downwind axis points the
/// opposite way: a receptor lies downwind when it sits in the direction the wind blows *to*.
pub fn wind_frame(east: Metres, north: Metres, wind_direction: f64) -> (Metres, Metres) {
    let wind_rad = wind_direction.to_radians();
    let downwind = -(east.value() * wind_rad.sin() + north.value() * wind_rad.cos());
    let crosswind = east.value() * wind_rad.cos() - north.value() * wind_rad.sin();
    (Metres(downwind), Metres(crosswind))
}

/// Concentration at a receptor from a single point source.
///
/// Returns µg/m³. Zero for receptors at or upwind of the source. Wind speed below
/// [`MIN_WIND_SPEED`] is clamped to it.
pub fn plume_concentration(
    emission_rate: GramsPerSecond,
    wind_speed: MetresPerSecond,
    receptor: Receptor,
    source_height: Metres,
    stability: StabilityClass,
) -> MicrogramsPerCubicMetre {
    let x = receptor.downwind.value();
    if x <= 0.0 {
        return MicrogramsPerCubicMetre(0.0);
    }

    let coefficients = stability.sigma_coefficients();
    let x_km = x / 1000.0;
    let sigma_y = (coefficients.sy_c * x_km.powf(coefficients.sy_e) * 1000.0).max(MIN_SIGMA);
    let sigma_z = (coefficients.sz_c * x_km.powf(coefficients.sz_e) * 1000.0).max(MIN_SIGMA);
    let u = wind_speed.max(MIN_WIND_SPEED).value();

    let y = receptor.crosswind.value();
    let z = receptor.height.value();
    let h = source_height.value();

    let coefficient = emission_rate.value() / (2.0 * std::f64::consts::PI * u * sigma_y * sigma_z);
    let lateral = (-0.5 * (y / sigma_y).powi(2)).exp();
    // Second exponential is the ground reflection term
    let vertical =
        (-0.5 * ((z - h) / sigma_z).powi(2)).exp() + (-0.5 * ((z + h) / sigma_z).powi(2)).exp();

    // g/m³ -> µg/m³
    MicrogramsPerCubicMetre(coefficient * lateral * vertical * 1e6)
}

/// Concentration at a geographic receptor from a source under the given weather.
///
/// Combines the local-offset projection, the wind-frame rotation and the plume equation; the
/// stability class is derived from the sample's wind speed and hour.
pub fn concentration_from_source(
    source: &Coordinate,
    emission_rate: GramsPerSecond,
    weather: &WeatherSample,
    target: &Coordinate,
    receptor_height: Metres,
) -> MicrogramsPerCubicMetre {
    let stability = StabilityClass::from_conditions(weather.wind_speed, weather.timestamp.hour());
    let (east, north) = local_offset_metres(source, target);
    let (downwind, crosswind) = wind_frame(east, north, weather.wind_direction);
    plume_concentration(
        emission_rate,
        weather.wind_speed,
        Receptor {
            downwind,
            crosswind,
            height: receptor_height,
        },
        SOURCE_HEIGHT,
        stability,
    )
}
