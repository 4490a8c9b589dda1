//! Ordinary kriging of sensor readings onto a continuous pollution surface.
//!
//! The interpolator fits a spherical variogram to the empirical semivariogram of the current
//! readings, then solves the ordinary kriging system at every grid cell:
//!
//! ```text
//! | γ(x1,x1) ... γ(x1,xN)  1 |   | λ1 |   | γ(x1,x0) |
//! |    ...        ...      . | · | .. | = |    ...    |
//! | γ(xN,x1) ... γ(xN,xN)  1 |   | λN |   | γ(xN,x0) |
//! |    1     ...    1      0 |   | µ  |   |    1      |
//! ```
//!
//! The final row enforces Σλᵢ = 1 (unbiasedness) via the Lagrange multiplier µ. The estimate is
//! Σλᵢ·z(xᵢ) and the kriging variance λᵀγ₀ + µ. Degenerate configurations (fewer than two
//! distinct sites, or a singular system) fall back to the mean reading with maximal (sill)
//! variance so a surface is always available for display.
use crate::geo::{Coordinate, haversine_metres};
use crate::units::{Metres, MicrogramsPerCubicMetre};
use anyhow::{Result, ensure};
use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

/// Number of lag bins for the empirical semivariogram
const VARIOGRAM_LAGS: usize = 10;

/// Minimum lag bin width (m)
const MIN_LAG_WIDTH: f64 = 10.0;

/// Minimum fitted range (m)
const MIN_RANGE: f64 = 100.0;

/// Sites closer than this are treated as coincident (m)
const COINCIDENT_DISTANCE: f64 = 0.1;

/// Fitted parameters of a spherical variogram model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariogramModel {
    /// Semivariance at vanishing lag (measurement noise plus micro-scale variation)
    pub nugget: f64,
    /// Total semivariance plateau reached beyond the range
    pub sill: f64,
    /// Lag distance at which the model saturates at the sill
    pub range: Metres,
}

impl VariogramModel {
    /// Evaluate the spherical model at lag `h`.
    ///
    /// Zero at zero lag, rises to the sill at the range and stays there beyond it.
    pub fn evaluate(&self, h: Metres) -> f64 {
        let h = h.value();
        if h <= 0.0 {
            return 0.0;
        }
        let a = self.range.value().max(1.0);
        let partial_sill = self.sill - self.nugget;
        if h <= a {
            let hr = h / a;
            self.nugget + partial_sill * (1.5 * hr - 0.5 * hr.powi(3))
        } else {
            self.sill
        }
    }
}

/// Fit a spherical variogram to readings at the given sites.
///
/// Uses Matheron's classical estimator binned into [`VARIOGRAM_LAGS`] lags, then a
/// method-of-moments fit: the nugget extrapolated from the first lag, the sill from the larger
/// of the peak semivariance and the sample variance, and the range from the first lag reaching
/// 95% of the sill.
pub fn fit_variogram(sites: &[Coordinate], values: &[f64]) -> VariogramModel {
    let n = sites.len();
    if n < 2 {
        return VariogramModel {
            nugget: 0.0,
            sill: 1.0,
            range: Metres(1000.0),
        };
    }

    // All pairwise distances and squared differences
    let pairs: Vec<(f64, f64)> = (0..n)
        .tuple_combinations()
        .map(|(i, j)| {
            let d = haversine_metres(&sites[i], &sites[j]).value();
            let sq_diff = (values[i] - values[j]).powi(2);
            (d, sq_diff)
        })
        .collect();

    let max_dist = pairs.iter().map(|(d, _)| *d).fold(0.0, f64::max);
    let lag_width = (max_dist / VARIOGRAM_LAGS as f64).max(MIN_LAG_WIDTH);

    // Matheron estimator per lag bin: γ(h) = Σ(zᵢ-zⱼ)² / 2N(h)
    let mut lag_centres = Vec::new();
    let mut gamma_values = Vec::new();
    for lag in 0..VARIOGRAM_LAGS {
        let h_low = lag as f64 * lag_width;
        let h_high = h_low + lag_width;
        let bin: Vec<f64> = pairs
            .iter()
            .filter(|(d, _)| (h_low..h_high).contains(d))
            .map(|(_, sq_diff)| *sq_diff)
            .collect();
        if !bin.is_empty() {
            lag_centres.push((h_low + h_high) / 2.0);
            gamma_values.push(bin.iter().sum::<f64>() / (2.0 * bin.len() as f64));
        }
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let sample_variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;

    if gamma_values.is_empty() {
        return VariogramModel {
            nugget: 0.0,
            sill: sample_variance.max(1.0),
            range: Metres(if max_dist > 0.0 {
                (max_dist * 0.5).max(MIN_RANGE)
            } else {
                1000.0
            }),
        };
    }

    let gamma_max = gamma_values.iter().copied().fold(0.0, f64::max);
    let sill = gamma_max.max(sample_variance).max(1.0);
    let nugget = (gamma_values[0] * 0.5).max(0.0);

    // Range: first lag at which the semivariance saturates
    let range = lag_centres
        .iter()
        .zip(&gamma_values)
        .find(|&(_, &g)| g >= 0.95 * sill)
        .map_or(max_dist * 0.5, |(centre, _)| *centre)
        .max(MIN_RANGE);

    VariogramModel {
        nugget,
        sill,
        range: Metres(range),
    }
}

/// Geographic bounding box of the interpolation grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridBounds {
    /// Northern edge latitude
    pub north: f64,
    /// Southern edge latitude
    pub south: f64,
    /// Eastern edge longitude
    pub east: f64,
    /// Western edge longitude
    pub west: f64,
}

impl GridBounds {
    /// Check the box is non-empty
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.north > self.south,
            "Grid bounds invalid: north ({}) must exceed south ({})",
            self.north,
            self.south
        );
        ensure!(
            self.east > self.west,
            "Grid bounds invalid: east ({}) must exceed west ({})",
            self.east,
            self.west
        );
        Ok(())
    }
}

/// An interpolated pollution surface with per-cell estimation variance
#[derive(Debug, Clone, PartialEq)]
pub struct PollutionGrid {
    /// Geographic extent of the grid
    pub bounds: GridBounds,
    /// Number of cells along each axis
    pub resolution: usize,
    /// Row-major concentration estimates; row 0 is the northern edge
    pub values: Vec<Vec<f64>>,
    /// Row-major kriging variances
    pub variances: Vec<Vec<f64>>,
}

impl PollutionGrid {
    /// The geographic centre of the cell at (row, col)
    pub fn cell_centre(&self, row: usize, col: usize) -> Coordinate {
        let lat_step = (self.bounds.north - self.bounds.south) / self.resolution as f64;
        let lon_step = (self.bounds.east - self.bounds.west) / self.resolution as f64;
        Coordinate {
            lat: self.bounds.north - (row as f64 + 0.5) * lat_step,
            lon: self.bounds.west + (col as f64 + 0.5) * lon_step,
        }
    }

    /// The concentration at the cell nearest to `point`.
    ///
    /// Points outside the bounds clamp to the nearest edge cell, so callers sampling slightly
    /// beyond the surface (the router's padded search box) see the boundary value rather than a
    /// hole.
    pub fn sample(&self, point: &Coordinate) -> MicrogramsPerCubicMetre {
        let lat_step = (self.bounds.north - self.bounds.south) / self.resolution as f64;
        let lon_step = (self.bounds.east - self.bounds.west) / self.resolution as f64;
        let row = ((self.bounds.north - point.lat) / lat_step - 0.5).round();
        let col = ((point.lon - self.bounds.west) / lon_step - 0.5).round();
        let row = (row.max(0.0) as usize).min(self.resolution - 1);
        let col = (col.max(0.0) as usize).min(self.resolution - 1);
        MicrogramsPerCubicMetre(self.values[row][col])
    }
}

/// Solve the ordinary kriging system for one target point.
///
/// Returns `(estimate, variance)`, or `None` if the system is singular or produced non-finite
/// results (degenerate site configuration).
fn krige_at(
    sites: &[Coordinate],
    values: &[f64],
    model: &VariogramModel,
    target: &Coordinate,
) -> Option<(f64, f64)> {
    let n = sites.len();
    let size = n + 1;

    // Kriging matrix: γ between sites, bordered by the unbiasedness constraint
    let mut matrix = DMatrix::zeros(size, size);
    for i in 0..n {
        for j in (i + 1)..n {
            let gamma = model.evaluate(haversine_metres(&sites[i], &sites[j]));
            matrix[(i, j)] = gamma;
            matrix[(j, i)] = gamma;
        }
        matrix[(i, n)] = 1.0;
        matrix[(n, i)] = 1.0;
    }

    let mut rhs = DVector::zeros(size);
    for i in 0..n {
        rhs[i] = model.evaluate(haversine_metres(&sites[i], target));
    }
    rhs[n] = 1.0;

    let solution = matrix.lu().solve(&rhs)?;
    if solution.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let estimate: f64 = (0..n).map(|i| solution[i] * values[i]).sum();
    let lagrange = solution[n];
    let variance: f64 = (0..n).map(|i| solution[i] * rhs[i]).sum::<f64>() + lagrange;

    Some((estimate.max(0.0), variance.max(0.0)))
}

/// Count sites that are pairwise farther apart than the coincidence threshold
fn count_distinct(sites: &[Coordinate]) -> usize {
    let mut distinct: Vec<&Coordinate> = Vec::new();
    for site in sites {
        if distinct
            .iter()
            .all(|kept| haversine_metres(kept, site).value() > COINCIDENT_DISTANCE)
        {
            distinct.push(site);
        }
    }
    distinct.len()
}

/// Build the interpolated pollution surface from the current readings.
///
/// `sites` and `values` must be index-aligned; the caller passes a consistent snapshot so every
/// cell is estimated from readings of the same cycle. With fewer than two distinct sites (or a
/// singular system at some cell) the affected estimates fall back to the mean reading with the
/// sill as variance.
pub fn build_grid(
    sites: &[Coordinate],
    values: &[MicrogramsPerCubicMetre],
    bounds: &GridBounds,
    resolution: usize,
) -> Result<PollutionGrid> {
    bounds.validate()?;
    ensure!(resolution >= 2, "Grid resolution must be at least 2");
    ensure!(
        sites.len() == values.len(),
        "Site and reading counts differ: {} vs {}",
        sites.len(),
        values.len()
    );

    let raw_values: Vec<f64> = values.iter().map(|v| v.value()).collect();
    let mean = if raw_values.is_empty() {
        0.0
    } else {
        raw_values.iter().sum::<f64>() / raw_values.len() as f64
    };

    let model = fit_variogram(sites, &raw_values);
    let degenerate = count_distinct(sites) < 2;
    if degenerate {
        log::warn!(
            "Degenerate sensor configuration ({} distinct sites): falling back to mean estimate",
            count_distinct(sites)
        );
    } else {
        log::debug!(
            "Fitted variogram: nugget={:.2}, sill={:.2}, range={:.0}m",
            model.nugget,
            model.sill,
            model.range.value()
        );
    }

    let mut grid = PollutionGrid {
        bounds: *bounds,
        resolution,
        values: vec![vec![0.0; resolution]; resolution],
        variances: vec![vec![0.0; resolution]; resolution],
    };

    for row in 0..resolution {
        for col in 0..resolution {
            let target = grid.cell_centre(row, col);
            let (estimate, variance) = if degenerate {
                (mean, model.sill)
            } else {
                krige_at(sites, &raw_values, &model, &target).unwrap_or((mean, model.sill))
            };
            grid.values[row][col] = estimate;
            grid.variances[row][col] = variance;
        }
    }

    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn bounds() -> GridBounds {
        GridBounds {
            north: 40.82,
            south: 40.70,
            east: -73.78,
            west: -74.02,
        }
    }

    fn spread_sites() -> Vec<Coordinate> {
        vec![
            Coordinate::new(40.72, -74.00),
            Coordinate::new(40.75, -73.95),
            Coordinate::new(40.78, -73.88),
            Coordinate::new(40.71, -73.85),
            Coordinate::new(40.80, -73.99),
            Coordinate::new(40.76, -73.81),
        ]
    }

    #[test]
    fn test_variogram_model_shape() {
        let model = VariogramModel {
            nugget: 0.5,
            sill: 4.0,
            range: Metres(1000.0),
        };
        // Zero at the origin, saturated at the sill beyond the range
        assert_approx_eq!(f64, model.evaluate(Metres(0.0)), 0.0);
        assert_approx_eq!(f64, model.evaluate(Metres(1000.0)), 4.0);
        assert_approx_eq!(f64, model.evaluate(Metres(5000.0)), 4.0);
        // Rises monotonically in between
        let quarter = model.evaluate(Metres(250.0));
        let half = model.evaluate(Metres(500.0));
        assert!(model.nugget < quarter && quarter < half && half < model.sill);
    }

    #[test]
    fn test_fit_variogram_reduces_to_nugget_and_saturates() {
        let sites = spread_sites();
        let values = [30.0, 45.0, 20.0, 55.0, 35.0, 40.0];
        let model = fit_variogram(&sites, &values);
        assert!(model.nugget >= 0.0);
        assert!(model.sill >= model.nugget);
        assert!(model.range.value() >= MIN_RANGE);
        assert_approx_eq!(f64, model.evaluate(Metres(0.0)), 0.0);
        assert_approx_eq!(
            f64,
            model.evaluate(model.range + Metres(1.0)),
            model.sill,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_kriging_weights_sum_to_one() {
        let sites = spread_sites();
        let values = [30.0, 45.0, 20.0, 55.0, 35.0, 40.0];
        let model = fit_variogram(&sites, &values);
        let target = Coordinate::new(40.755, -73.91);

        // Re-solve the system directly to inspect the weights
        let n = sites.len();
        let mut matrix = DMatrix::zeros(n + 1, n + 1);
        for i in 0..n {
            for j in (i + 1)..n {
                let gamma = model.evaluate(haversine_metres(&sites[i], &sites[j]));
                matrix[(i, j)] = gamma;
                matrix[(j, i)] = gamma;
            }
            matrix[(i, n)] = 1.0;
            matrix[(n, i)] = 1.0;
        }
        let mut rhs = DVector::zeros(n + 1);
        for i in 0..n {
            rhs[i] = model.evaluate(haversine_metres(&sites[i], &target));
        }
        rhs[n] = 1.0;

        let solution = matrix.lu().solve(&rhs).unwrap();
        let weight_sum: f64 = (0..n).map(|i| solution[i]).sum();
        assert_approx_eq!(f64, weight_sum, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_exact_interpolation_at_sensor() {
        let sites = spread_sites();
        let values = [30.0, 45.0, 20.0, 55.0, 35.0, 40.0];
        let model = fit_variogram(&sites, &values);
        for (site, value) in sites.iter().zip(&values) {
            let (estimate, variance) = krige_at(&sites, &values, &model, site).unwrap();
            assert_approx_eq!(f64, estimate, *value, epsilon = 1e-6);
            assert_approx_eq!(f64, variance, 0.0, epsilon = 1e-6);
        }
    }

    #[rstest]
    fn test_uniform_readings_give_uniform_grid(bounds: GridBounds) {
        let sites = spread_sites();
        let values = vec![MicrogramsPerCubicMetre(30.0); sites.len()];
        let grid = build_grid(&sites, &values, &bounds, 10).unwrap();
        // The all-equal fit clamps the sill at 1.0, so every estimate is exactly the shared
        // reading and the uncertainty stays near the (zero) nugget.
        for row in 0..10 {
            for col in 0..10 {
                assert_approx_eq!(f64, grid.values[row][col], 30.0, epsilon = 1e-6);
                assert!(grid.variances[row][col] < 1.5);
            }
        }
    }

    #[rstest]
    fn test_single_site_falls_back_to_mean(bounds: GridBounds) {
        let sites = vec![Coordinate::new(40.75, -73.95)];
        let values = vec![MicrogramsPerCubicMetre(42.0)];
        let grid = build_grid(&sites, &values, &bounds, 5).unwrap();
        for row in 0..5 {
            for col in 0..5 {
                assert_approx_eq!(f64, grid.values[row][col], 42.0);
                assert!(grid.variances[row][col] > 0.0);
            }
        }
    }

    #[rstest]
    fn test_coincident_sites_fall_back_to_mean(bounds: GridBounds) {
        let site = Coordinate::new(40.75, -73.95);
        let sites = vec![site, site, site];
        let values = vec![
            MicrogramsPerCubicMetre(10.0),
            MicrogramsPerCubicMetre(20.0),
            MicrogramsPerCubicMetre(30.0),
        ];
        let grid = build_grid(&sites, &values, &bounds, 5).unwrap();
        assert_approx_eq!(f64, grid.values[2][2], 20.0);
    }

    #[rstest]
    fn test_estimates_are_non_negative(bounds: GridBounds) {
        let sites = spread_sites();
        let values: Vec<_> = [5.0, 80.0, 3.0, 90.0, 4.0, 85.0]
            .into_iter()
            .map(MicrogramsPerCubicMetre)
            .collect();
        let grid = build_grid(&sites, &values, &bounds, 15).unwrap();
        for row in &grid.values {
            for &value in row {
                assert!(value >= 0.0);
            }
        }
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        let bounds = GridBounds {
            north: 40.70,
            south: 40.82,
            east: -73.78,
            west: -74.02,
        };
        assert!(
            build_grid(&[], &[], &bounds, 5)
                .unwrap_err()
                .to_string()
                .contains("north")
        );
    }

    #[rstest]
    fn test_sample_clamps_to_edges(bounds: GridBounds) {
        let sites = spread_sites();
        let values = vec![MicrogramsPerCubicMetre(30.0); sites.len()];
        let grid = build_grid(&sites, &values, &bounds, 10).unwrap();
        // A point well outside the box still samples the nearest edge cell
        let outside = Coordinate::new(41.5, -75.0);
        assert_approx_eq!(f64, grid.sample(&outside).value(), 30.0, epsilon = 1e-6);
    }
}
