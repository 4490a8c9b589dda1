//! US EPA Air Quality Index derivation from PM2.5 concentration.
//!
//! Uses the standard piecewise linear interpolation between the EPA breakpoints
//! (40 CFR Part 58, Appendix G). Concentrations above the top breakpoint saturate at 500.
use crate::units::MicrogramsPerCubicMetre;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// EPA PM2.5 breakpoints: (concentration low, concentration high, AQI low, AQI high)
const PM25_BREAKPOINTS: [(f64, f64, u16, u16); 6] = [
    (0.0, 12.0, 0, 50),
    (12.1, 35.4, 51, 100),
    (35.5, 55.4, 101, 150),
    (55.5, 150.4, 151, 200),
    (150.5, 250.4, 201, 300),
    (250.5, 500.4, 301, 500),
];

/// EPA health concern category for an AQI value
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum AqiCategory {
    /// AQI 0-50
    #[string = "Good"]
    Good,
    /// AQI 51-100
    #[string = "Moderate"]
    Moderate,
    /// AQI 101-150
    #[string = "Unhealthy for Sensitive Groups"]
    UnhealthyForSensitiveGroups,
    /// AQI 151-200
    #[string = "Unhealthy"]
    Unhealthy,
    /// AQI 201-300
    #[string = "Very Unhealthy"]
    VeryUnhealthy,
    /// AQI 301-500
    #[string = "Hazardous"]
    Hazardous,
}

/// Convert a PM2.5 concentration to the 0-500 AQI scale.
///
/// Negative inputs are treated as zero; the result is monotonic non-decreasing in the
/// concentration within every breakpoint segment.
pub fn pm25_to_aqi(pm25: MicrogramsPerCubicMetre) -> u16 {
    let pm25 = pm25.value().max(0.0);
    for (bp_lo, bp_hi, aqi_lo, aqi_hi) in PM25_BREAKPOINTS {
        if pm25 <= bp_hi {
            let aqi = f64::from(aqi_hi - aqi_lo) / (bp_hi - bp_lo) * (pm25 - bp_lo)
                + f64::from(aqi_lo);
            return aqi.round() as u16;
        }
    }
    500
}

/// The health concern category for an AQI value
pub fn aqi_category(aqi: u16) -> AqiCategory {
    match aqi {
        0..=50 => AqiCategory::Good,
        51..=100 => AqiCategory::Moderate,
        101..=150 => AqiCategory::UnhealthyForSensitiveGroups,
        151..=200 => AqiCategory::Unhealthy,
        201..=300 => AqiCategory::VeryUnhealthy,
        _ => AqiCategory::Hazardous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, 0)]
    #[case(12.0, 50)]
    #[case(35.4, 100)]
    #[case(55.4, 150)]
    #[case(150.4, 200)]
    #[case(250.4, 300)]
    #[case(500.4, 500)]
    #[case(9999.0, 500)]
    fn test_breakpoint_endpoints(#[case] pm25: f64, #[case] expected: u16) {
        assert_eq!(pm25_to_aqi(MicrogramsPerCubicMetre(pm25)), expected);
    }

    #[test]
    fn test_negative_concentration_is_zero() {
        assert_eq!(pm25_to_aqi(MicrogramsPerCubicMetre(-5.0)), 0);
    }

    #[test]
    fn test_monotonic_within_segments() {
        let mut last = 0;
        for i in 0..=5000 {
            let aqi = pm25_to_aqi(MicrogramsPerCubicMetre(i as f64 / 10.0));
            assert!(aqi >= last, "AQI decreased at {} ug/m3", i as f64 / 10.0);
            last = aqi;
        }
    }

    #[rstest]
    #[case(30, AqiCategory::Good)]
    #[case(75, AqiCategory::Moderate)]
    #[case(120, AqiCategory::UnhealthyForSensitiveGroups)]
    #[case(180, AqiCategory::Unhealthy)]
    #[case(250, AqiCategory::VeryUnhealthy)]
    #[case(400, AqiCategory::Hazardous)]
    fn test_categories(#[case] aqi: u16, #[case] expected: AqiCategory) {
        assert_eq!(aqi_category(aqi), expected);
    }
}
