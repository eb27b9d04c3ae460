//! Robust 3D line fitting with ground intersection.
//!
//! Per-layer candidates are joined into one line by random sample consensus:
//! each trial fits a line through two candidates, scores every candidate by
//! its perpendicular distance to that line, and the best trial's inliers are
//! refit by principal direction. The final line is then intersected with
//! the ground plane.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::core::Point3;
use crate::error::{LocateError, Result};

use super::line3d::FittedLine3D;

/// How competing trials are ranked
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusSelection {
    /// Lowest median residual; ties go to more inliers, then lower mean residual
    #[default]
    LeastMedian,
    /// Most inliers; ties go to lower mean residual
    MostInliers,
}

/// Configuration for robust line fitting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFitConfig {
    /// Inlier distance threshold.
    /// Default: 5.0
    pub residual_threshold: f64,

    /// Maximum number of two-point trials.
    /// When the candidates form no more distinct pairs than this, every
    /// pair is tried instead of sampling.
    /// Default: 100
    pub max_trials: usize,

    /// Seed for pair sampling.
    /// Default: 42
    pub seed: u64,

    /// Trial ranking rule.
    /// Default: least median
    pub selection: ConsensusSelection,
}

impl Default for LineFitConfig {
    fn default() -> Self {
        Self {
            residual_threshold: 5.0,
            max_trials: 100,
            seed: 42,
            selection: ConsensusSelection::LeastMedian,
        }
    }
}

impl LineFitConfig {
    /// Builder-style setter for the inlier threshold.
    pub fn with_residual_threshold(mut self, threshold: f64) -> Self {
        self.residual_threshold = threshold;
        self
    }

    /// Builder-style setter for maximum trials.
    pub fn with_max_trials(mut self, trials: usize) -> Self {
        self.max_trials = trials;
        self
    }

    /// Builder-style setter for the sampling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder-style setter for trial ranking.
    pub fn with_selection(mut self, selection: ConsensusSelection) -> Self {
        self.selection = selection;
        self
    }
}

/// Result of a robust line fit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineFitResult {
    /// Line refit on the winning inliers
    pub line: FittedLine3D,
    /// Crossing with the ground plane
    pub intersection: Point3,
    /// Inlier flag per candidate, in input order
    pub inliers: Vec<bool>,
    /// Trials evaluated
    pub trials: usize,
    /// Mean perpendicular distance of the inliers to the final line
    pub mean_inlier_distance: f64,
}

impl LineFitResult {
    /// Number of inliers
    pub fn inlier_count(&self) -> usize {
        self.inliers.iter().filter(|&&i| i).count()
    }
}

/// Score of one trial line
#[derive(Clone, Copy, Debug)]
struct TrialScore {
    median: f64,
    mean: f64,
    inliers: usize,
}

impl TrialScore {
    fn evaluate(line: &FittedLine3D, points: &[Point3], threshold: f64, mask: &mut [bool]) -> Self {
        let mut distances: Vec<f64> = points.iter().map(|p| line.distance(p)).collect();
        let mut inliers = 0;
        for (flag, &d) in mask.iter_mut().zip(&distances) {
            *flag = d <= threshold;
            inliers += *flag as usize;
        }
        let mean = distances.iter().sum::<f64>() / distances.len() as f64;
        distances.sort_by(f64::total_cmp);
        let mid = distances.len() / 2;
        let median = if distances.len() % 2 == 1 {
            distances[mid]
        } else {
            0.5 * (distances[mid - 1] + distances[mid])
        };
        Self {
            median,
            mean,
            inliers,
        }
    }

    fn beats(&self, other: &TrialScore, selection: ConsensusSelection) -> bool {
        match selection {
            ConsensusSelection::LeastMedian => {
                if self.median != other.median {
                    return self.median < other.median;
                }
                if self.inliers != other.inliers {
                    return self.inliers > other.inliers;
                }
                self.mean < other.mean
            }
            ConsensusSelection::MostInliers => {
                if self.inliers != other.inliers {
                    return self.inliers > other.inliers;
                }
                self.mean < other.mean
            }
        }
    }
}

/// Consensus line fitter
#[derive(Clone, Debug, Default)]
pub struct RobustLineFitter {
    config: LineFitConfig,
}

impl RobustLineFitter {
    /// Create a fitter
    pub fn new(config: LineFitConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &LineFitConfig {
        &self.config
    }

    /// Fit a line through `candidates` and intersect it with `z = ground_elevation`.
    pub fn fit(&self, candidates: &[Point3], ground_elevation: f64) -> Result<LineFitResult> {
        let n = candidates.len();
        if n < 2 {
            return Err(LocateError::InsufficientPoints {
                required: 2,
                found: n,
            });
        }

        // Canonical order so the result does not depend on input order
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            let (pa, pb) = (&candidates[a], &candidates[b]);
            pa.x.total_cmp(&pb.x)
                .then(pa.y.total_cmp(&pb.y))
                .then(pa.z.total_cmp(&pb.z))
        });
        let points: Vec<Point3> = order.iter().map(|&i| candidates[i]).collect();

        let mut best: Option<(TrialScore, Vec<bool>)> = None;
        let mut mask = vec![false; n];
        let mut trials = 0;

        for (i, j) in self.trial_pairs(n) {
            if points[i] == points[j] {
                continue;
            }
            let Ok(line) = FittedLine3D::fit(&[points[i], points[j]]) else {
                continue;
            };
            trials += 1;

            let score = TrialScore::evaluate(&line, &points, self.config.residual_threshold, &mut mask);
            let better = match &best {
                None => true,
                Some((incumbent, _)) => score.beats(incumbent, self.config.selection),
            };
            if better {
                best = Some((score, mask.clone()));
            }
        }

        let Some((score, sorted_mask)) = best else {
            return Err(LocateError::DegenerateDirection(
                "every sampled pair of candidates is coincident",
            ));
        };

        let inlier_points: Vec<Point3> = points
            .iter()
            .zip(&sorted_mask)
            .filter(|&(_, &inlier)| inlier)
            .map(|(p, _)| *p)
            .collect();
        let line = FittedLine3D::fit(&inlier_points)?.canonical();
        let intersection = line.intersect_horizontal(ground_elevation)?;
        let mean_inlier_distance = inlier_points.iter().map(|p| line.distance(p)).sum::<f64>()
            / inlier_points.len() as f64;

        let mut inliers = vec![false; n];
        for (sorted_idx, &input_idx) in order.iter().enumerate() {
            inliers[input_idx] = sorted_mask[sorted_idx];
        }

        log::info!(
            "Line fit: {}/{} inliers after {} trials (median residual {:.3}), ground crossing ({:.6}, {:.6}, {:.1})",
            score.inliers,
            n,
            trials,
            score.median,
            intersection.x,
            intersection.y,
            intersection.z
        );

        Ok(LineFitResult {
            line,
            intersection,
            inliers,
            trials,
            mean_inlier_distance,
        })
    }

    /// Index pairs to try, in a fixed order.
    fn trial_pairs(&self, n: usize) -> Vec<(usize, usize)> {
        let distinct_pairs = n * (n - 1) / 2;
        if distinct_pairs <= self.config.max_trials {
            return (0..n)
                .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
                .collect();
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        (0..self.config.max_trials)
            .map(|_| {
                let idx1 = rng.random_range(0..n);
                let mut idx2 = rng.random_range(0..n);
                while idx2 == idx1 {
                    idx2 = rng.random_range(0..n);
                }
                (idx1, idx2)
            })
            .collect()
    }
}

/// Fit with the default configuration.
pub fn fit_line(candidates: &[Point3], ground_elevation: f64) -> Result<LineFitResult> {
    RobustLineFitter::default().fit(candidates, ground_elevation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scenario() -> Vec<Point3> {
        [
            (1.0, 1.0, 80.0),
            (2.0, 2.0, 83.0),
            (3.0, 3.0, 85.0),
            (4.0, 4.0, 77.0),
            (5.0, 5.0, 95.0),
            (6.0, 6.0, 90.0),
            (7.0, 7.0, 92.0),
            (50.0, 50.0, 300.0),
            (60.0, 60.0, -100.0),
        ]
        .into_iter()
        .map(Point3::from)
        .collect()
    }

    #[test]
    fn test_rejects_extreme_outliers() {
        let result = fit_line(&scenario(), 77.0).unwrap();

        assert!(!result.inliers[7]);
        assert!(!result.inliers[8]);
        assert!(result.inlier_count() >= 5);

        // Candidates lie in the x = y plane, so does the fitted line
        let hit = result.intersection;
        assert_relative_eq!(hit.x, hit.y, epsilon = 1e-6);
        assert!(hit.x > -3.0 && hit.x < 5.0, "intersection x = {}", hit.x);
        assert_relative_eq!(hit.z, 77.0);
        assert!(result.line.direction.z > 0.0);
    }

    #[test]
    fn test_result_independent_of_input_order() {
        let points = scenario();
        let forward = fit_line(&points, 77.0).unwrap();

        let mut reversed = points.clone();
        reversed.reverse();
        let backward = fit_line(&reversed, 77.0).unwrap();

        assert_eq!(forward.line, backward.line);
        assert_eq!(forward.intersection, backward.intersection);
        let mut mask = backward.inliers.clone();
        mask.reverse();
        assert_eq!(forward.inliers, mask);
    }

    #[test]
    fn test_sampled_trials_are_reproducible() {
        let points: Vec<Point3> = (0..30)
            .map(|i| {
                let t = i as f64;
                let noise = if i % 2 == 0 { 0.3 } else { -0.3 };
                Point3::new(t + noise, 2.0 * t, 100.0 + 3.0 * t)
            })
            .collect();
        let fitter = RobustLineFitter::new(LineFitConfig::default().with_max_trials(50));

        let a = fitter.fit(&points, 100.0).unwrap();
        let b = fitter.fit(&points, 100.0).unwrap();

        assert_eq!(a, b);
        assert_eq!(a.trials, 50);
        assert_eq!(a.inlier_count(), 30);
        assert_relative_eq!(a.intersection.y, 0.0, epsilon = 0.5);
    }

    #[test]
    fn test_most_inliers_selection() {
        let fitter = RobustLineFitter::new(
            LineFitConfig::default().with_selection(ConsensusSelection::MostInliers),
        );
        let points: Vec<Point3> = (0..6).map(|i| Point3::new(0.0, 0.0, i as f64 * 10.0)).collect();

        let result = fitter.fit(&points, 0.0).unwrap();
        assert_eq!(result.inlier_count(), 6);
        assert_eq!(result.trials, 15);
        assert_relative_eq!(result.line.direction.z, 1.0);
    }

    #[test]
    fn test_insufficient_and_degenerate() {
        assert!(matches!(
            fit_line(&[Point3::ZERO], 0.0),
            Err(LocateError::InsufficientPoints { required: 2, found: 1 })
        ));

        let same = vec![Point3::new(1.0, 2.0, 3.0); 4];
        assert!(matches!(
            fit_line(&same, 0.0),
            Err(LocateError::DegenerateDirection(_))
        ));

        let flat = vec![Point3::new(0.0, 0.0, 10.0), Point3::new(5.0, 0.0, 10.0)];
        assert!(matches!(
            fit_line(&flat, 0.0),
            Err(LocateError::DegenerateDirection(_))
        ));
    }
}
