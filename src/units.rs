#![allow(missing_docs)]

//! This module defines the physical quantity types used across the pipeline.

/// Represents a dimensionless quantity.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, derive_more::Add, derive_more::Sub)]
pub struct Dimensionless(pub f64);

impl std::ops::Mul for Dimensionless {
    type Output = Dimensionless;

    fn mul(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless::from(self.0 * rhs.0)
    }
}

impl std::ops::Div for Dimensionless {
    type Output = Dimensionless;

    fn div(self, rhs: Dimensionless) -> Self::Output {
        Dimensionless::from(self.0 / rhs.0)
    }
}

impl From<f64> for Dimensionless {
    fn from(val: f64) -> Self {
        Self(val)
    }
}

impl From<Dimensionless> for f64 {
    fn from(val: Dimensionless) -> Self {
        val.0
    }
}

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(Debug, Clone, Copy, PartialEq, PartialOrd, derive_more::Add, derive_more::Sub)]
        pub struct $name(pub f64);

        impl $name {
            /// Creates a new instance of the unit type from a f64 value.
            pub fn from(val: f64) -> Self {
                Self(val)
            }

            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Returns the larger of two quantities.
            pub fn max(self, other: Self) -> Self {
                Self(self.0.max(other.0))
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name::from(self.0 * rhs.0)
            }
        }

        impl std::ops::Mul<$name> for Dimensionless {
            type Output = $name;
            fn mul(self, rhs: $name) -> $name {
                $name::from(self.0 * rhs.0)
            }
        }

        impl std::ops::Div<Dimensionless> for $name {
            type Output = $name;
            fn div(self, rhs: Dimensionless) -> $name {
                $name::from(self.0 / rhs.0)
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = $name>>(iter: I) -> $name {
                $name::from(iter.map(|v| v.0).sum())
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::from(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::from(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::from(self.0 / rhs.0)
            }
        }
    };
}

// Base quantities
unit_struct!(GramsPerSecond);
unit_struct!(MicrogramsPerCubicMetre);
unit_struct!(MetresPerSecond);
unit_struct!(Metres);
unit_struct!(Kilometres);

// Derived quantities
unit_struct!(ExposureDose);

// An exposure dose is a concentration inhaled over a travelled distance
impl_mul!(MicrogramsPerCubicMetre, Kilometres, ExposureDose);
impl_div!(ExposureDose, Kilometres, MicrogramsPerCubicMetre);

impl Metres {
    /// Convert to kilometres.
    pub fn to_kilometres(self) -> Kilometres {
        Kilometres(self.0 / 1000.0)
    }
}

impl Kilometres {
    /// Convert to metres.
    pub fn to_metres(self) -> Metres {
        Metres(self.0 * 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn test_exposure_dose_arithmetic() {
        let dose = MicrogramsPerCubicMetre(30.0) * Kilometres(2.0);
        assert_approx_eq!(f64, dose.value(), 60.0);
        let mean = dose / Kilometres(2.0);
        assert_approx_eq!(f64, mean.value(), 30.0);
    }

    #[test]
    fn test_metre_kilometre_conversion() {
        assert_approx_eq!(f64, Metres(1500.0).to_kilometres().value(), 1.5);
        assert_approx_eq!(f64, Kilometres(1.5).to_metres().value(), 1500.0);
    }
}
