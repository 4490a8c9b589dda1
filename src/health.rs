//! Health impact metrics derived from pollution readings.
//!
//! The score is a 0-100 composite (100 = healthiest) built from capped penalties for each
//! pollutant's excess over its WHO 2021 annual-mean guideline. Cigarette equivalence follows the
//! Berkeley Earth rule of thumb: breathing 22 µg/m³ of PM2.5 for 24 hours is one cigarette.
use crate::emission::Pollutant;
use crate::pollution::PollutionReading;
use serde_string_enum::{DeserializeLabeledStringEnum, SerializeLabeledStringEnum};

/// WHO 2021 annual-mean guideline for PM2.5 (µg/m³)
const WHO_PM25_GUIDELINE: f64 = 5.0;

/// WHO 2021 annual-mean guideline for PM10 (µg/m³)
const WHO_PM10_GUIDELINE: f64 = 15.0;

/// WHO 2021 annual-mean guideline for NO2, applied to the NOx concentration (µg/m³)
const WHO_NOX_GUIDELINE: f64 = 10.0;

/// PM2.5 concentration over 24 h equivalent to smoking one cigarette (µg/m³)
const PM25_PER_CIGARETTE: f64 = 22.0;

/// Categorical risk level aligned with the AQI health concern bands
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, SerializeLabeledStringEnum, DeserializeLabeledStringEnum,
)]
pub enum RiskLevel {
    /// Score 80-100
    #[string = "Low"]
    Low,
    /// Score 60-79
    #[string = "Moderate"]
    Moderate,
    /// Score 40-59
    #[string = "High"]
    High,
    /// Score 20-39
    #[string = "Very High"]
    VeryHigh,
    /// Score 0-19
    #[string = "Severe"]
    Severe,
}

/// Health metrics for one sensor's current reading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthSummary {
    /// Composite health score, 0-100 (100 = healthiest)
    pub score: u8,
    /// Categorical risk level derived from the score
    pub risk_level: RiskLevel,
    /// Equivalent daily cigarette consumption from the PM2.5 level
    pub equivalent_cigarettes: f64,
}

/// Compute the composite health score for a reading.
///
/// Penalties are linear in the excess ratio over each guideline and capped so that PM2.5 (the
/// most harmful pollutant) dominates: up to 40 points, with up to 15 each for PM10 and NOx.
fn health_score(reading: &PollutionReading) -> u8 {
    let mut score = 100.0;

    let pm25 = reading.get(Pollutant::Pm25).value();
    if pm25 > WHO_PM25_GUIDELINE {
        let excess_ratio = (pm25 - WHO_PM25_GUIDELINE) / WHO_PM25_GUIDELINE;
        score -= (excess_ratio * 10.0).min(40.0);
    }

    let pm10 = reading.get(Pollutant::Pm10).value();
    if pm10 > WHO_PM10_GUIDELINE {
        let excess_ratio = (pm10 - WHO_PM10_GUIDELINE) / WHO_PM10_GUIDELINE;
        score -= (excess_ratio * 5.0).min(15.0);
    }

    let nox = reading.get(Pollutant::NOx).value();
    if nox > WHO_NOX_GUIDELINE {
        let excess_ratio = (nox - WHO_NOX_GUIDELINE) / WHO_NOX_GUIDELINE;
        score -= (excess_ratio * 4.0).min(15.0);
    }

    score.clamp(0.0, 100.0).round() as u8
}

/// Map a health score to its risk level
fn risk_level(score: u8) -> RiskLevel {
    match score {
        80..=100 => RiskLevel::Low,
        60..=79 => RiskLevel::Moderate,
        40..=59 => RiskLevel::High,
        20..=39 => RiskLevel::VeryHigh,
        _ => RiskLevel::Severe,
    }
}

/// Equivalent daily cigarettes for a PM2.5 concentration sustained over `hours`
fn cigarette_equivalent(pm25: f64, hours: f64) -> f64 {
    if pm25 <= 0.0 || hours <= 0.0 {
        return 0.0;
    }
    pm25 / PM25_PER_CIGARETTE * (hours / 24.0)
}

/// Compute health metrics from a pollution reading
pub fn calculate_health(reading: &PollutionReading) -> HealthSummary {
    let score = health_score(reading);
    HealthSummary {
        score,
        risk_level: risk_level(score),
        equivalent_cigarettes: cigarette_equivalent(reading.get(Pollutant::Pm25).value(), 24.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispersion::StabilityClass;
    use crate::units::MicrogramsPerCubicMetre;
    use float_cmp::assert_approx_eq;
    use indexmap::IndexMap;
    use rstest::rstest;

    fn reading(pm25: f64, pm10: f64, nox: f64) -> PollutionReading {
        let concentrations: IndexMap<_, _> = [
            (Pollutant::Pm25, MicrogramsPerCubicMetre(pm25)),
            (Pollutant::Pm10, MicrogramsPerCubicMetre(pm10)),
            (Pollutant::NOx, MicrogramsPerCubicMetre(nox)),
            (Pollutant::Co, MicrogramsPerCubicMetre(200.0)),
        ]
        .into_iter()
        .collect();
        PollutionReading::from_concentrations(concentrations, StabilityClass::D)
    }

    #[test]
    fn test_clean_air_scores_100() {
        let summary = calculate_health(&reading(4.0, 10.0, 8.0));
        assert_eq!(summary.score, 100);
        assert_eq!(summary.risk_level, RiskLevel::Low);
    }

    #[test]
    fn test_penalties_are_capped() {
        // Extreme pollution exhausts all three caps: 100 - 40 - 15 - 15
        let summary = calculate_health(&reading(500.0, 500.0, 500.0));
        assert_eq!(summary.score, 30);
        assert_eq!(summary.risk_level, RiskLevel::VeryHigh);
    }

    #[test]
    fn test_score_decreases_with_pollution() {
        let low = calculate_health(&reading(10.0, 20.0, 15.0));
        let high = calculate_health(&reading(40.0, 60.0, 40.0));
        assert!(high.score < low.score);
    }

    #[rstest]
    #[case(85, RiskLevel::Low)]
    #[case(65, RiskLevel::Moderate)]
    #[case(45, RiskLevel::High)]
    #[case(25, RiskLevel::VeryHigh)]
    #[case(5, RiskLevel::Severe)]
    fn test_risk_levels(#[case] score: u8, #[case] expected: RiskLevel) {
        assert_eq!(risk_level(score), expected);
    }

    #[test]
    fn test_cigarette_equivalent() {
        assert_approx_eq!(f64, cigarette_equivalent(22.0, 24.0), 1.0);
        assert_approx_eq!(f64, cigarette_equivalent(11.0, 24.0), 0.5);
        assert_approx_eq!(f64, cigarette_equivalent(0.0, 24.0), 0.0);
    }
}
