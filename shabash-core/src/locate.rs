//! Per-layer 2D source locator.
//!
//! Within one altitude layer the source is taken to sit under the centroid
//! of the strong-signal points. "Strong" defaults to a fixed difference of
//! 70 or more. A high percentile of the layer's values is always computed
//! and reported, and can be switched in as the threshold instead.

use serde::{Deserialize, Serialize};

use crate::core::PlanarPoint;
use crate::error::{LocateError, Result};

/// Which threshold selects strong-signal points
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// `value >= selection_threshold`
    #[default]
    Fixed,
    /// `value >= percentile(values, percentile)`
    Percentile,
}

/// Locator parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Threshold selection mode
    pub threshold_mode: ThresholdMode,
    /// Fixed selection threshold (inclusive)
    pub selection_threshold: f64,
    /// Percentile computed per layer (0-100)
    pub percentile: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            threshold_mode: ThresholdMode::Fixed,
            selection_threshold: 70.0,
            percentile: 97.0,
        }
    }
}

impl LocatorConfig {
    /// Set threshold mode
    pub fn with_threshold_mode(mut self, mode: ThresholdMode) -> Self {
        self.threshold_mode = mode;
        self
    }

    /// Set fixed selection threshold
    pub fn with_selection_threshold(mut self, threshold: f64) -> Self {
        self.selection_threshold = threshold;
        self
    }

    /// Set percentile
    pub fn with_percentile(mut self, percentile: f64) -> Self {
        self.percentile = percentile;
        self
    }
}

/// Outcome of locating one layer
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerLocation {
    /// Centroid of the selected points, `None` if nothing was selected
    pub position: Option<PlanarPoint>,
    /// Configured percentile of the layer's values
    pub percentile_value: Option<f64>,
    /// Threshold actually applied
    pub threshold: Option<f64>,
    /// Number of points selected
    pub selected: usize,
}

/// Centroid-of-strong-signal locator
#[derive(Clone, Debug, Default)]
pub struct StrongSignalLocator {
    config: LocatorConfig,
}

impl StrongSignalLocator {
    /// Create a locator
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    /// Configuration in use
    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Estimated (x, y), or `None` when no point passes the threshold
    pub fn locate(&self, xs: &[f64], ys: &[f64], values: &[f64]) -> Result<Option<PlanarPoint>> {
        Ok(self.locate_detailed(xs, ys, values)?.position)
    }

    /// Estimate plus diagnostics
    pub fn locate_detailed(&self, xs: &[f64], ys: &[f64], values: &[f64]) -> Result<LayerLocation> {
        if ys.len() != xs.len() {
            return Err(LocateError::shape("ys", xs.len(), ys.len()));
        }
        if values.len() != xs.len() {
            return Err(LocateError::shape("values", xs.len(), values.len()));
        }

        let percentile_value = percentile(values, self.config.percentile);
        let threshold = match self.config.threshold_mode {
            ThresholdMode::Fixed => Some(self.config.selection_threshold),
            ThresholdMode::Percentile => percentile_value,
        };

        let (mut sum_x, mut sum_y, mut selected) = (0.0, 0.0, 0usize);
        if let Some(t) = threshold {
            for ((&x, &y), _) in xs.iter().zip(ys).zip(values).filter(|(_, v)| **v >= t) {
                sum_x += x;
                sum_y += y;
                selected += 1;
            }
        }

        let position = (selected > 0).then(|| {
            PlanarPoint::new(sum_x / selected as f64, sum_y / selected as f64)
        });

        log::debug!(
            "Locator: {} points, p{} = {:?}, threshold {:?}, selected {}",
            values.len(),
            self.config.percentile,
            percentile_value,
            threshold,
            selected
        );

        Ok(LayerLocation {
            position,
            percentile_value,
            threshold,
            selected,
        })
    }
}

/// Locate with the default configuration (fixed threshold 70).
pub fn locate(xs: &[f64], ys: &[f64], values: &[f64]) -> Result<Option<PlanarPoint>> {
    StrongSignalLocator::default().locate(xs, ys, values)
}

/// `q`-th percentile (0-100) with linear interpolation between order
/// statistics. NaN values are ignored; `None` if nothing remains.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
