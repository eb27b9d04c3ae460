//! Inverse-square point-source fitting.
//!
//! An alternate path that skips binning entirely: the normalised metric of
//! every raw sample is modelled as `C / d²`, where `d` is the distance from
//! the sample to the source, and `(x, y, z, C)` is found by bounded
//! Levenberg-Marquardt starting at the centre of the search box.
//!
//! Steps are projected back into the box before being evaluated. The solver
//! makes a single attempt and always reports its final parameters together
//! with a [`SolverStatus`]; callers that need a hard failure use
//! [`PointSourceFit::ensure_converged`].

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::core::{Point3, Sample};
use crate::error::{LocateError, Result};

/// Number of model parameters (x, y, z, C).
const PARAMS: usize = 4;

/// Squared distances are floored here so a sample at the source stays finite.
const MIN_DISTANCE_SQ: f64 = 1e-12;

// ============================================================================
// Search box
// ============================================================================

/// Box constraint on `(x, y, z, C)`.
///
/// Serialised as `[[x_lo, y_lo, z_lo, c_lo], [x_hi, y_hi, z_hi, c_hi]]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[[f64; 4]; 2]", into = "[[f64; 4]; 2]")]
pub struct SearchBounds {
    lower: [f64; PARAMS],
    upper: [f64; PARAMS],
}

impl SearchBounds {
    /// Validated bounds
    pub fn new(lower: [f64; PARAMS], upper: [f64; PARAMS]) -> Result<Self> {
        for index in 0..PARAMS {
            let (lo, hi) = (lower[index], upper[index]);
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(LocateError::InvalidBounds {
                    index,
                    lower: lo,
                    upper: hi,
                });
            }
        }
        Ok(Self { lower, upper })
    }

    /// Bounds already known to be ordered
    pub(crate) const fn from_ordered(lower: [f64; PARAMS], upper: [f64; PARAMS]) -> Self {
        Self { lower, upper }
    }

    /// Lower corner
    pub fn lower(&self) -> [f64; PARAMS] {
        self.lower
    }

    /// Upper corner
    pub fn upper(&self) -> [f64; PARAMS] {
        self.upper
    }

    /// Centre of the box (initial guess)
    pub fn midpoint(&self) -> [f64; PARAMS] {
        std::array::from_fn(|i| 0.5 * (self.lower[i] + self.upper[i]))
    }

    /// True if `params` lie inside the box
    pub fn contains(&self, params: &[f64; PARAMS]) -> bool {
        (0..PARAMS).all(|i| self.lower[i] <= params[i] && params[i] <= self.upper[i])
    }

    fn project(&self, params: &mut [f64; PARAMS]) {
        for (i, p) in params.iter_mut().enumerate() {
            *p = p.clamp(self.lower[i], self.upper[i]);
        }
    }
}

impl TryFrom<[[f64; PARAMS]; 2]> for SearchBounds {
    type Error = LocateError;

    fn try_from([lower, upper]: [[f64; PARAMS]; 2]) -> Result<Self> {
        SearchBounds::new(lower, upper)
    }
}

impl From<SearchBounds> for [[f64; PARAMS]; 2] {
    fn from(bounds: SearchBounds) -> Self {
        [bounds.lower, bounds.upper]
    }
}

// ============================================================================
// Configuration and result
// ============================================================================

/// Configuration for the point-source solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointSourceConfig {
    /// Maximum number of iterations.
    /// Default: 200
    pub max_iterations: usize,

    /// Stop when an accepted step lowers the cost by less than this fraction.
    /// Default: 1e-12
    pub cost_tolerance: f64,

    /// Stop when the projected step is shorter than this (relative to the
    /// parameter norm).
    /// Default: 1e-10
    pub step_tolerance: f64,

    /// Stop when the largest gradient component falls below this.
    /// Default: 1e-12
    pub gradient_tolerance: f64,

    /// Initial LM damping factor (λ).
    /// Default: 1e-3
    pub lm_initial_lambda: f64,

    /// Factor to scale λ up (on bad step) or down (on good step).
    /// Default: 10.0
    pub lm_lambda_factor: f64,

    /// Maximum λ; exceeding it means no step can reduce the cost.
    /// Default: 1e12
    pub lm_max_lambda: f64,
}

impl Default for PointSourceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            cost_tolerance: 1e-12,
            step_tolerance: 1e-10,
            gradient_tolerance: 1e-12,
            lm_initial_lambda: 1e-3,
            lm_lambda_factor: 10.0,
            lm_max_lambda: 1e12,
        }
    }
}

impl PointSourceConfig {
    /// Builder-style setter for maximum iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Builder-style setter for the relative cost tolerance.
    pub fn with_cost_tolerance(mut self, tolerance: f64) -> Self {
        self.cost_tolerance = tolerance;
        self
    }

    /// Builder-style setter for the initial damping factor.
    pub fn with_initial_lambda(mut self, lambda: f64) -> Self {
        self.lm_initial_lambda = lambda;
        self
    }
}

/// Why the solver stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverStatus {
    /// A cost, step or gradient tolerance was met
    Converged,
    /// Iteration budget exhausted
    MaxIterations,
    /// Damping grew past its limit without finding a better point
    Stalled,
}

/// Fitted point source.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSourceFit {
    /// Source position
    pub source: Point3,
    /// Scale constant `C`
    pub scale: f64,
    /// Final cost, ½ Σ r²
    pub cost: f64,
    /// Iterations performed
    pub iterations: usize,
    /// Termination reason
    pub status: SolverStatus,
}

impl PointSourceFit {
    /// True if the solver met a tolerance
    #[inline]
    pub fn converged(&self) -> bool {
        self.status == SolverStatus::Converged
    }

    /// The fit, or [`LocateError::SolverNonConvergence`] if it did not converge.
    pub fn ensure_converged(self) -> Result<Self> {
        if self.converged() {
            Ok(self)
        } else {
            Err(LocateError::SolverNonConvergence {
                iterations: self.iterations,
                cost: self.cost,
            })
        }
    }
}

// ============================================================================
// Solver
// ============================================================================

/// Bounded LM fitter for the inverse-square model.
#[derive(Clone, Debug, Default)]
pub struct PointSourceFitter {
    config: PointSourceConfig,
}

impl PointSourceFitter {
    /// Create a fitter
    pub fn new(config: PointSourceConfig) -> Self {
        Self { config }
    }

    /// Fit `(x, y, z, C)` to `samples` inside `bounds`.
    ///
    /// Fewer samples than parameters is allowed: the damped normal
    /// equations stay solvable and the solver settles on one of the
    /// exact fits.
    pub fn fit(&self, samples: &[Sample], bounds: &SearchBounds) -> Result<PointSourceFit> {
        if samples.is_empty() {
            return Err(LocateError::InsufficientPoints {
                required: 1,
                found: 0,
            });
        }

        let max_metric = samples
            .iter()
            .map(|s| s.metric)
            .fold(f64::NEG_INFINITY, f64::max);
        if !max_metric.is_finite() || max_metric == 0.0 {
            return Err(LocateError::InvalidMetric(format!(
                "cannot normalise by maximum {}",
                max_metric
            )));
        }
        let positions: Vec<Point3> = samples.iter().map(|s| s.position).collect();
        let targets: Vec<f64> = samples.iter().map(|s| s.metric / max_metric).collect();

        let mut params = bounds.midpoint();
        let (mut residuals, mut jacobian) = evaluate(&positions, &targets, &params);
        let mut cost = 0.5 * residuals.norm_squared();
        let mut lambda = self.config.lm_initial_lambda;
        let mut status = SolverStatus::MaxIterations;
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            iterations += 1;

            let gradient = jacobian.transpose() * &residuals;
            if gradient.amax() < self.config.gradient_tolerance {
                status = SolverStatus::Converged;
                break;
            }

            let jtj = jacobian.transpose() * &jacobian;
            let mut damped = jtj.clone();
            for i in 0..PARAMS {
                damped[(i, i)] += lambda * jtj[(i, i)].max(1e-12);
            }

            let Ok(delta) = damped.svd(true, true).solve(&(-&gradient), 1e-15) else {
                status = SolverStatus::Stalled;
                break;
            };

            let mut trial = params;
            for i in 0..PARAMS {
                trial[i] += delta[i];
            }
            bounds.project(&mut trial);

            let step = DVector::from_fn(PARAMS, |i, _| trial[i] - params[i]);
            let param_norm = params.iter().map(|p| p * p).sum::<f64>().sqrt();
            if step.norm() <= self.config.step_tolerance * (param_norm + self.config.step_tolerance) {
                status = SolverStatus::Converged;
                break;
            }

            let (trial_residuals, trial_jacobian) = evaluate(&positions, &targets, &trial);
            let trial_cost = 0.5 * trial_residuals.norm_squared();

            if trial_cost < cost {
                let reduction = cost - trial_cost;
                params = trial;
                residuals = trial_residuals;
                jacobian = trial_jacobian;
                cost = trial_cost;
                lambda /= self.config.lm_lambda_factor;

                if reduction <= self.config.cost_tolerance * cost.max(f64::MIN_POSITIVE) {
                    status = SolverStatus::Converged;
                    break;
                }
            } else {
                lambda *= self.config.lm_lambda_factor;
                if lambda > self.config.lm_max_lambda {
                    status = SolverStatus::Stalled;
                    break;
                }
            }
        }

        let fit = PointSourceFit {
            source: Point3::new(params[0], params[1], params[2]),
            scale: params[3],
            cost,
            iterations,
            status,
        };

        if fit.converged() {
            log::debug!(
                "Point source: converged in {} iterations, cost {:.3e}",
                iterations,
                cost
            );
        } else {
            log::warn!(
                "Point source: {:?} after {} iterations, cost {:.3e}",
                status,
                iterations,
                cost
            );
        }

        Ok(fit)
    }
}

/// Fit with the default solver configuration.
pub fn fit_point_source(samples: &[Sample], bounds: &SearchBounds) -> Result<PointSourceFit> {
    PointSourceFitter::default().fit(samples, bounds)
}

/// Residuals `C/d² - target` and their Jacobian w.r.t. `(x, y, z, C)`.
fn evaluate(
    positions: &[Point3],
    targets: &[f64],
    params: &[f64; PARAMS],
) -> (DVector<f64>, DMatrix<f64>) {
    let n = positions.len();
    let source = Point3::new(params[0], params[1], params[2]);
    let scale = params[3];

    let mut residuals = DVector::zeros(n);
    let mut jacobian = DMatrix::zeros(n, PARAMS);

    for (i, (p, &target)) in positions.iter().zip(targets).enumerate() {
        let offset = *p - source;
        let d2 = offset.dot(&offset).max(MIN_DISTANCE_SQ);
        let inv_d2 = 1.0 / d2;

        residuals[i] = scale * inv_d2 - target;

        let k = 2.0 * scale * inv_d2 * inv_d2;
        jacobian[(i, 0)] = k * offset.x;
        jacobian[(i, 1)] = k * offset.y;
        jacobian[(i, 2)] = k * offset.z;
        jacobian[(i, 3)] = inv_d2;
    }

    (residuals, jacobian)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Samples on two horizontal 5x5 grids one unit above and below `source`,
    /// with metric `strength / d²`.
    fn inverse_square_samples(source: Point3, strength: f64) -> Vec<Sample> {
        let mut samples = Vec::new();
        for dz in [-1.0, 1.0] {
            for i in -2..=2 {
                for j in -2..=2 {
                    let p = Point3::new(source.x + i as f64, source.y + j as f64, source.z + dz);
                    samples.push(Sample::new(p, strength / p.distance_squared(&source)));
                }
            }
        }
        samples
    }

    #[test]
    fn test_recovers_source_from_offset_start() {
        let source = Point3::new(2.0, 3.0, 1.0);
        let samples = inverse_square_samples(source, 40.0);
        // Midpoint (2.5, 3.5, 1.0, 1.0); the nearest samples are 1 unit
        // away, so the normalised scale is exactly 1
        let bounds = SearchBounds::new([1.0, 2.0, 0.0, 0.0], [4.0, 5.0, 2.0, 2.0]).unwrap();

        let fit = fit_point_source(&samples, &bounds).unwrap();

        assert!(fit.converged(), "status {:?}", fit.status);
        assert_relative_eq!(fit.source.x, 2.0, epsilon = 1e-4);
        assert_relative_eq!(fit.source.y, 3.0, epsilon = 1e-4);
        assert_relative_eq!(fit.source.z, 1.0, epsilon = 1e-4);
        assert_relative_eq!(fit.scale, 1.0, epsilon = 1e-4);
        assert!(fit.cost < 1e-10);
    }

    #[test]
    fn test_solution_stays_inside_bounds() {
        let source = Point3::new(2.0, 3.0, 1.0);
        let samples = inverse_square_samples(source, 10.0);
        let bounds = SearchBounds::new([3.0, 2.0, 0.0, 0.0], [4.0, 5.0, 2.0, 2.0]).unwrap();

        let fit = fit_point_source(&samples, &bounds).unwrap();
        let params = [fit.source.x, fit.source.y, fit.source.z, fit.scale];

        assert!(bounds.contains(&params));
        assert_relative_eq!(fit.source.x, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn test_three_samples_underdetermined() {
        // Receivers at x = 4 around a source at the origin with C = 1
        let samples = [
            Sample::new(Point3::new(4.0, 0.0, 0.0), 1.0 / 16.0),
            Sample::new(Point3::new(4.0, 3.0, 0.0), 1.0 / 25.0),
            Sample::new(Point3::new(4.0, -3.0, 0.0), 1.0 / 25.0),
        ];
        let bounds = SearchBounds::new([-10.0, -10.0, -1.0, 0.0], [10.0, 10.0, 1.0, 1e10]).unwrap();

        let fit = fit_point_source(&samples, &bounds).unwrap();

        assert!(fit.converged(), "status {:?}", fit.status);
        assert_relative_eq!(fit.source.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(fit.source.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(fit.source.z, 0.0, epsilon = 1e-6);
        // Normalised by the strongest metric, 1/16
        assert_relative_eq!(fit.scale, 16.0, epsilon = 1e-6);
        assert!(fit.cost < 1e-12);
    }

    #[test]
    fn test_ensure_converged() {
        let fit = PointSourceFit {
            source: Point3::ZERO,
            scale: 1.0,
            cost: 0.5,
            iterations: 3,
            status: SolverStatus::MaxIterations,
        };
        assert!(matches!(
            fit.ensure_converged(),
            Err(LocateError::SolverNonConvergence { iterations: 3, .. })
        ));
    }

    #[test]
    fn test_input_validation() {
        let bounds = SearchBounds::new([0.0; 4], [1.0; 4]).unwrap();
        assert!(matches!(
            fit_point_source(&[], &bounds),
            Err(LocateError::InsufficientPoints { required: 1, found: 0 })
        ));

        let silent = vec![Sample::new(Point3::ZERO, 0.0); 5];
        assert!(matches!(
            fit_point_source(&silent, &bounds),
            Err(LocateError::InvalidMetric(_))
        ));

        assert!(matches!(
            SearchBounds::new([0.0, 5.0, 0.0, 0.0], [1.0, 4.0, 1.0, 1.0]),
            Err(LocateError::InvalidBounds { index: 1, .. })
        ));
    }

    #[test]
    fn test_bounds_midpoint() {
        let bounds = SearchBounds::new([-10.0, -10.0, -1.0, 0.0], [10.0, 10.0, 1.0, 1e10]).unwrap();
        assert_eq!(bounds.midpoint(), [0.0, 0.0, 0.0, 5e9]);
    }
}
