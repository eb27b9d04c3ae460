//! Grid binning of weighted 3D point clouds.

use crate::core::Point3;
use crate::error::{LocateError, Result};

use super::edges::{BinEdges, edges_spanning};
use super::storage::Grid;

/// How the grid edges are chosen
#[derive(Clone, Debug)]
pub enum Binning {
    /// Equal-width bins per axis spanning the points' own min/max
    Counts([usize; 3]),
    /// Externally supplied edges (shared-grid use)
    Edges([BinEdges; 3]),
}

impl From<[usize; 3]> for Binning {
    fn from(bins: [usize; 3]) -> Self {
        Binning::Counts(bins)
    }
}

/// Bin `points` with `weights` into an average-value grid.
///
/// Points outside the edges (possible only with [`Binning::Edges`]) and
/// points with NaN coordinates are not counted.
pub fn bin(points: &[Point3], weights: &[f64], binning: impl Into<Binning>) -> Result<Grid> {
    bin_into(points, weights, binning.into(), false)
}

/// Like [`bin`], but also accumulates the mean raw position per cell.
pub fn bin_with_positions(
    points: &[Point3],
    weights: &[f64],
    binning: impl Into<Binning>,
) -> Result<Grid> {
    bin_into(points, weights, binning.into(), true)
}

fn bin_into(
    points: &[Point3],
    weights: &[f64],
    binning: Binning,
    track_positions: bool,
) -> Result<Grid> {
    if points.len() != weights.len() {
        return Err(LocateError::shape("weights", points.len(), weights.len()));
    }

    let edges = match binning {
        Binning::Counts(bins) => edges_spanning(&[points], bins)?,
        Binning::Edges(edges) => edges,
    };

    let mut grid = Grid::empty(edges, track_positions);
    let mut dropped = 0usize;
    for (p, &w) in points.iter().zip(weights) {
        if !grid.insert(p, w) {
            dropped += 1;
        }
    }

    if dropped > 0 {
        log::debug!("Binning: {} of {} points outside grid", dropped, points.len());
    }

    Ok(grid)
}
