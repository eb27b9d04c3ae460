//! Dual-grid differencing.
//!
//! Two datasets are binned onto one shared set of edges spanning their
//! union range, then compared cell by cell:
//!
//! ```text
//!   dataset A ──┐                    ┌── avg A ──┐
//!               ├── shared edges ────┤           ├── A - B (both present)
//!   dataset B ──┘                    └── avg B ──┘   None  (otherwise)
//! ```
//!
//! The position-aware variant also keeps each side's mean raw position per
//! cell so later stages work on sample geometry instead of bin centres.

use serde::{Deserialize, Serialize};

use crate::core::{Dataset, Point3};
use crate::error::{LocateError, Result};

use super::binner::{Binning, bin, bin_with_positions};
use super::edges::{BinEdges, edges_spanning};
use super::storage::{CellIndex, Grid, GridShape};

// ============================================================================
// Difference grid
// ============================================================================

/// Per-cell `avgA - avgB` over shared edges. `None` where either side is empty.
#[derive(Clone, Debug)]
pub struct DifferenceGrid {
    edges: [BinEdges; 3],
    shape: GridShape,
    values: Vec<Option<f64>>,
}

impl DifferenceGrid {
    /// Subtract two grids built on identical edges
    pub fn between(a: &Grid, b: &Grid) -> Result<Self> {
        if a.edges() != b.edges() {
            return Err(LocateError::InvalidBins(
                "grids must share identical edges".into(),
            ));
        }
        let values = a
            .averages()
            .into_iter()
            .zip(b.averages())
            .map(|(va, vb)| Some(va? - vb?))
            .collect();
        Ok(Self {
            edges: a.edges().clone(),
            shape: a.shape(),
            values,
        })
    }

    /// Per-axis edges
    #[inline]
    pub fn edges(&self) -> &[BinEdges; 3] {
        &self.edges
    }

    /// Grid dimensions
    #[inline]
    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Difference in a cell
    #[inline]
    pub fn get(&self, cell: CellIndex) -> Option<f64> {
        self.values[self.shape.flat(cell)]
    }

    /// All cells in row-major order
    #[inline]
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Cells holding a value
    pub fn occupied_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    /// Flatten to (bin centre, value) points, skipping empty cells
    pub fn to_points(&self) -> DifferencePoints {
        let mut points = DifferencePoints::default();
        for (offset, value) in self.values.iter().enumerate() {
            if let Some(v) = *value {
                let [i, j, k] = self.shape.unflat(offset);
                let center = Point3::new(
                    self.edges[0].center(i),
                    self.edges[1].center(j),
                    self.edges[2].center(k),
                );
                points.push(center, v);
            }
        }
        points
    }
}

// ============================================================================
// Position-aware difference
// ============================================================================

/// A cell where both datasets have data, resolved to sample geometry.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBin {
    /// Cell index
    pub cell: CellIndex,
    /// Mean raw position of dataset A's samples in the cell
    pub position_a: Point3,
    /// Mean raw position of dataset B's samples in the cell
    pub position_b: Point3,
    /// `avgA - avgB`
    pub value: f64,
}

impl ResolvedBin {
    /// Midpoint of both sides' mean positions
    #[inline]
    pub fn position(&self) -> Point3 {
        self.position_a.midpoint(&self.position_b)
    }
}

/// Difference grid plus the resolved position of every shared cell.
#[derive(Clone, Debug)]
pub struct PositionedDifference {
    /// Plain per-cell difference
    pub grid: DifferenceGrid,
    /// Cells with data on both sides, in row-major order
    pub bins: Vec<ResolvedBin>,
}

impl PositionedDifference {
    /// Flatten to (resolved position, value) points
    pub fn to_points(&self) -> DifferencePoints {
        let mut points = DifferencePoints::with_capacity(self.bins.len());
        for bin in &self.bins {
            points.push(bin.position(), bin.value);
        }
        points
    }
}

// ============================================================================
// Flattened points
// ============================================================================

/// Flattened difference values with their positions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DifferencePoints {
    /// Positions (bin centres or resolved positions)
    pub positions: Vec<Point3>,
    /// Difference values, parallel to `positions`
    pub values: Vec<f64>,
}

impl DifferencePoints {
    /// Empty collection with reserved capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    /// Append one point
    #[inline]
    pub fn push(&mut self, position: Point3, value: f64) {
        self.positions.push(position);
        self.values.push(value);
    }

    /// Number of points
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// True if there are no points
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Z coordinate of every point
    pub fn altitudes(&self) -> Vec<f64> {
        self.positions.iter().map(|p| p.z).collect()
    }

    /// Points at the given indices
    pub fn select(&self, indices: &[usize]) -> DifferencePoints {
        let mut out = DifferencePoints::with_capacity(indices.len());
        for &i in indices {
            out.push(self.positions[i], self.values[i]);
        }
        out
    }

    /// Sign counts and mean of the finite values; NaN and infinite values
    /// are counted apart and left out of the mean
    pub fn summary(&self) -> DifferenceSummary {
        let mut summary = DifferenceSummary::default();
        let mut sum = 0.0;
        for &v in &self.values {
            if !v.is_finite() {
                summary.non_finite += 1;
                continue;
            }
            if v > 0.0 {
                summary.above_zero += 1;
            } else if v < 0.0 {
                summary.below_zero += 1;
            } else {
                summary.zero += 1;
            }
            sum += v;
        }
        let finite = summary.above_zero + summary.below_zero + summary.zero;
        if finite > 0 {
            summary.mean = Some(sum / finite as f64);
        }
        summary
    }
}

/// Sign distribution of a difference cloud
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DifferenceSummary {
    /// Values greater than zero
    pub above_zero: usize,
    /// Values less than zero
    pub below_zero: usize,
    /// Values exactly zero
    pub zero: usize,
    /// NaN or infinite values
    pub non_finite: usize,
    /// Mean value, `None` when empty
    pub mean: Option<f64>,
}

// ============================================================================
// Operations
// ============================================================================

/// Edges spanning `[min(A, B), max(A, B)]` on each axis.
pub fn shared_edges(a: &Dataset, b: &Dataset, bins: [usize; 3]) -> Result<[BinEdges; 3]> {
    edges_spanning(&[&a.positions(), &b.positions()], bins)
}

/// Bin both datasets onto shared edges and subtract B from A per cell.
pub fn difference(a: &Dataset, b: &Dataset, bins: [usize; 3]) -> Result<DifferenceGrid> {
    let edges = shared_edges(a, b, bins)?;
    let grid_a = bin(&a.positions(), &a.metrics(), Binning::Edges(edges.clone()))?;
    let grid_b = bin(&b.positions(), &b.metrics(), Binning::Edges(edges))?;
    DifferenceGrid::between(&grid_a, &grid_b)
}

/// Position-aware [`difference`]: every cell with data on both sides is
/// resolved to the midpoint of the two datasets' mean raw positions.
pub fn difference_with_positions(
    a: &Dataset,
    b: &Dataset,
    bins: [usize; 3],
) -> Result<PositionedDifference> {
    let edges = shared_edges(a, b, bins)?;
    let grid_a = bin_with_positions(&a.positions(), &a.metrics(), Binning::Edges(edges.clone()))?;
    let grid_b = bin_with_positions(&b.positions(), &b.metrics(), Binning::Edges(edges))?;
    let grid = DifferenceGrid::between(&grid_a, &grid_b)?;

    let shape = grid.shape();
    let bins = grid
        .values()
        .iter()
        .enumerate()
        .filter_map(|(offset, value)| {
            let value = (*value)?;
            let cell = shape.unflat(offset);
            Some(ResolvedBin {
                cell,
                position_a: grid_a.mean_position(cell)?,
                position_b: grid_b.mean_position(cell)?,
                value,
            })
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Difference: {} shared cells of {} ({} in A, {} in B)",
        bins.len(),
        shape.cell_count(),
        grid_a.occupied().count(),
        grid_b.occupied().count()
    );

    Ok(PositionedDifference { grid, bins })
}
