//! End-to-end location pipeline.
//!
//! Chains the estimation stages over two datasets:
//!
//! ```text
//! A, B ─► positioned difference ─► flatten ─► layers ─► per-layer locate ─► line fit
//!                                     │                        │                │
//!                                  summary                candidates       intersection
//! ```
//!
//! The result is an immutable [`LocationReport`]; rendering and logging
//! read from it without touching the pipeline.

use serde::{Deserialize, Serialize};

use crate::core::{Dataset, Point3};
use crate::error::Result;
use crate::fitting::{LineFitConfig, LineFitResult, RobustLineFitter};
use crate::grid::{DifferencePoints, DifferenceSummary, difference_with_positions};
use crate::layers::{DEFAULT_LAYER_COUNT_THRESHOLD, LayerBand, segment};
use crate::locate::{LayerLocation, LocatorConfig, StrongSignalLocator};

/// Pipeline parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bins per axis for the shared difference grid
    pub difference_bins: [usize; 3],
    /// Samples per rounded altitude needed to seed a layer
    pub layer_count_threshold: u32,
    /// Ground elevation for the line intersection
    pub ground_elevation: f64,
    /// Per-layer locator
    pub locator: LocatorConfig,
    /// Robust line fit
    pub line_fit: LineFitConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            difference_bins: [20, 20, 20],
            layer_count_threshold: DEFAULT_LAYER_COUNT_THRESHOLD,
            ground_elevation: 77.0,
            locator: LocatorConfig::default(),
            line_fit: LineFitConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Set difference grid bins
    pub fn with_difference_bins(mut self, bins: [usize; 3]) -> Self {
        self.difference_bins = bins;
        self
    }

    /// Set layer count threshold
    pub fn with_layer_count_threshold(mut self, threshold: u32) -> Self {
        self.layer_count_threshold = threshold;
        self
    }

    /// Set ground elevation
    pub fn with_ground_elevation(mut self, elevation: f64) -> Self {
        self.ground_elevation = elevation;
        self
    }

    /// Set locator config
    pub fn with_locator(mut self, locator: LocatorConfig) -> Self {
        self.locator = locator;
        self
    }

    /// Set line fit config
    pub fn with_line_fit(mut self, line_fit: LineFitConfig) -> Self {
        self.line_fit = line_fit;
        self
    }
}

/// What one altitude band produced
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerOutcome {
    /// Lowest seed altitude
    pub min_altitude: f64,
    /// Highest seed altitude
    pub max_altitude: f64,
    /// Number of difference points in the band
    pub member_count: usize,
    /// Mean altitude of the members
    pub mean_altitude: Option<f64>,
    /// Locator diagnostics
    pub location: LayerLocation,
}

impl LayerOutcome {
    fn new(band: &LayerBand, altitudes: &[f64], location: LayerLocation) -> Self {
        Self {
            min_altitude: band.min_altitude,
            max_altitude: band.max_altitude,
            member_count: band.members.len(),
            mean_altitude: band.mean_altitude(altitudes),
            location,
        }
    }

    /// 3D candidate, if the band produced one
    pub fn candidate(&self) -> Option<Point3> {
        Some(self.location.position?.at_altitude(self.mean_altitude?))
    }
}

/// Everything the pipeline computed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationReport {
    /// Sign distribution of the difference values
    pub summary: DifferenceSummary,
    /// One outcome per band, ascending altitude
    pub layers: Vec<LayerOutcome>,
    /// Accepted per-layer candidates, ascending altitude
    pub candidates: Vec<Point3>,
    /// Robust line and its ground intersection
    pub line_fit: LineFitResult,
    /// Flattened difference points
    pub points: DifferencePoints,
}

impl LocationReport {
    /// Estimated source location on the ground plane
    #[inline]
    pub fn intersection(&self) -> Point3 {
        self.line_fit.intersection
    }
}

/// Runs the estimation stages end to end
#[derive(Clone, Debug, Default)]
pub struct LocatePipeline {
    config: PipelineConfig,
}

impl LocatePipeline {
    /// Create a pipeline
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Locate the source from a signal-present dataset `a` and a baseline `b`.
    ///
    /// Fails if differencing fails or fewer than two layers yield a candidate.
    pub fn run(&self, a: &Dataset, b: &Dataset) -> Result<LocationReport> {
        let config = &self.config;

        let positioned = difference_with_positions(a, b, config.difference_bins)?;
        let points = positioned.to_points();

        let summary = points.summary();
        log::info!(
            "Difference '{}' - '{}': {} above zero, {} below zero, {} non-finite, mean {:?}",
            a.label,
            b.label,
            summary.above_zero,
            summary.below_zero,
            summary.non_finite,
            summary.mean
        );

        let altitudes = points.altitudes();
        let bands = segment(&altitudes, config.layer_count_threshold);
        log::info!("Found {} altitude layers", bands.len());

        let locator = StrongSignalLocator::new(config.locator.clone());
        let mut layers = Vec::with_capacity(bands.len());
        let mut candidates = Vec::new();
        for band in &bands {
            let members = points.select(&band.members);
            let xs: Vec<f64> = members.positions.iter().map(|p| p.x).collect();
            let ys: Vec<f64> = members.positions.iter().map(|p| p.y).collect();
            let location = locator.locate_detailed(&xs, &ys, &members.values)?;

            let outcome = LayerOutcome::new(band, &altitudes, location);
            match outcome.candidate() {
                Some(candidate) => {
                    log::info!(
                        "Layer [{}, {}]: candidate ({:.6}, {:.6}, {:.2}) from {} points",
                        band.min_altitude,
                        band.max_altitude,
                        candidate.x,
                        candidate.y,
                        candidate.z,
                        location.selected
                    );
                    candidates.push(candidate);
                }
                None => log::debug!(
                    "Layer [{}, {}]: no candidate",
                    band.min_altitude,
                    band.max_altitude
                ),
            }
            layers.push(outcome);
        }

        let line_fit =
            RobustLineFitter::new(config.line_fit.clone()).fit(&candidates, config.ground_elevation)?;
        let hit = line_fit.intersection;
        log::info!(
            "Ground intersection at ({:.6}, {:.6}, {:.2}), {} of {} candidates inliers",
            hit.x,
            hit.y,
            hit.z,
            line_fit.inlier_count(),
            candidates.len()
        );

        Ok(LocationReport {
            summary,
            layers,
            candidates,
            line_fit,
            points,
        })
    }
}
