//! Per-axis bin edges with standard histogram semantics.

use serde::{Deserialize, Serialize};

use crate::core::Point3;
use crate::error::{LocateError, Result};

/// Strictly increasing bin boundaries for one axis.
///
/// `N + 1` edges define `N` half-open bins `[e[i], e[i+1])`; the last bin is
/// closed on the right so the maximum value is counted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BinEdges {
    edges: Vec<f64>,
}

impl BinEdges {
    /// Wrap explicit edges, validating order and finiteness.
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 {
            return Err(LocateError::InvalidBins(format!(
                "need at least 2 edges, got {}",
                edges.len()
            )));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(LocateError::InvalidBins("edges must be finite".into()));
        }
        if edges.windows(2).any(|w| w[1] <= w[0]) {
            return Err(LocateError::InvalidBins(
                "edges must be strictly increasing".into(),
            ));
        }
        Ok(Self { edges })
    }

    /// `bins` equal-width bins spanning `[min, max]`.
    ///
    /// A zero-width range is widened to `[min - 0.5, max + 0.5]`.
    pub fn uniform(min: f64, max: f64, bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(LocateError::InvalidBins("bin count must be positive".into()));
        }
        if !min.is_finite() || !max.is_finite() || max < min {
            return Err(LocateError::InvalidBins(format!(
                "invalid range [{}, {}]",
                min, max
            )));
        }
        let (lo, hi) = if min == max {
            (min - 0.5, max + 0.5)
        } else {
            (min, max)
        };

        let step = (hi - lo) / bins as f64;
        let mut edges: Vec<f64> = (0..=bins).map(|i| lo + i as f64 * step).collect();
        edges[bins] = hi;
        Self::new(edges)
    }

    /// Number of bins (edges - 1)
    #[inline]
    pub fn bin_count(&self) -> usize {
        self.edges.len() - 1
    }

    /// Raw edge values
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.edges
    }

    /// Lowest edge
    #[inline]
    pub fn min(&self) -> f64 {
        self.edges[0]
    }

    /// Highest edge
    #[inline]
    pub fn max(&self) -> f64 {
        self.edges[self.edges.len() - 1]
    }

    /// Bin containing `value`, or `None` if outside the edges (or NaN).
    pub fn locate(&self, value: f64) -> Option<usize> {
        if !(value >= self.min() && value <= self.max()) {
            return None;
        }
        if value == self.max() {
            return Some(self.bin_count() - 1);
        }
        // First edge strictly greater than value, minus one.
        Some(self.edges.partition_point(|&e| e <= value) - 1)
    }

    /// Centre of bin `i`
    #[inline]
    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.edges[i] + self.edges[i + 1])
    }

    /// Centres of all bins
    pub fn centers(&self) -> Vec<f64> {
        (0..self.bin_count()).map(|i| self.center(i)).collect()
    }
}

/// Edges for all three axes spanning the union of the given point sets.
///
/// NaN coordinates are ignored when computing the range.
pub fn edges_spanning(point_sets: &[&[Point3]], bins: [usize; 3]) -> Result<[BinEdges; 3]> {
    let mut min = [f64::INFINITY; 3];
    let mut max = [f64::NEG_INFINITY; 3];
    let mut seen = false;

    for p in point_sets.iter().flat_map(|set| set.iter()) {
        for axis in 0..3 {
            let v = p.axis(axis);
            if v.is_nan() {
                continue;
            }
            min[axis] = min[axis].min(v);
            max[axis] = max[axis].max(v);
        }
        seen = true;
    }

    if !seen || (0..3).any(|a| min[a] > max[a]) {
        return Err(LocateError::EmptyDataset(
            "no finite positions to derive bin edges from".into(),
        ));
    }

    Ok([
        BinEdges::uniform(min[0], max[0], bins[0])?,
        BinEdges::uniform(min[1], max[1], bins[1])?,
        BinEdges::uniform(min[2], max[2], bins[2])?,
    ])
}
