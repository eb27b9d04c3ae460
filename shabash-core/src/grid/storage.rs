//! Fixed-size 3D bin storage.
//!
//! Cells live in flat vectors addressed by `(i, j, k)` in row-major order,
//! allocated once from the edge counts and never resized.

use serde::{Deserialize, Serialize};

use crate::core::Point3;

use super::edges::BinEdges;

/// Cell index along (x, y, z)
pub type CellIndex = [usize; 3];

/// Grid dimensions in bins per axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridShape {
    /// Bins along x
    pub nx: usize,
    /// Bins along y
    pub ny: usize,
    /// Bins along z
    pub nz: usize,
}

impl GridShape {
    /// Shape implied by per-axis edges
    pub fn from_edges(edges: &[BinEdges; 3]) -> Self {
        Self {
            nx: edges[0].bin_count(),
            ny: edges[1].bin_count(),
            nz: edges[2].bin_count(),
        }
    }

    /// Total number of cells
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Flat offset of a cell
    #[inline]
    pub fn flat(&self, [i, j, k]: CellIndex) -> usize {
        (i * self.ny + j) * self.nz + k
    }

    /// Cell index of a flat offset
    #[inline]
    pub fn unflat(&self, offset: usize) -> CellIndex {
        let k = offset % self.nz;
        let j = (offset / self.nz) % self.ny;
        let i = offset / (self.nz * self.ny);
        [i, j, k]
    }

    /// True if the index addresses a cell of this shape
    #[inline]
    pub fn contains(&self, [i, j, k]: CellIndex) -> bool {
        i < self.nx && j < self.ny && k < self.nz
    }
}

/// Binned samples: per-cell count, metric sum and optional position sum.
#[derive(Clone, Debug)]
pub struct Grid {
    edges: [BinEdges; 3],
    shape: GridShape,
    counts: Vec<u32>,
    sums: Vec<f64>,
    position_sums: Option<Vec<Point3>>,
}

impl Grid {
    /// Empty grid over the given edges
    pub fn empty(edges: [BinEdges; 3], track_positions: bool) -> Self {
        let shape = GridShape::from_edges(&edges);
        let cells = shape.cell_count();
        Self {
            edges,
            shape,
            counts: vec![0; cells],
            sums: vec![0.0; cells],
            position_sums: track_positions.then(|| vec![Point3::ZERO; cells]),
        }
    }

    /// Cell that contains `position`, if any
    pub fn cell_of(&self, position: &Point3) -> Option<CellIndex> {
        Some([
            self.edges[0].locate(position.x)?,
            self.edges[1].locate(position.y)?,
            self.edges[2].locate(position.z)?,
        ])
    }

    /// Add one sample. Returns false if the position lies outside the grid.
    pub fn insert(&mut self, position: &Point3, weight: f64) -> bool {
        let Some(cell) = self.cell_of(position) else {
            return false;
        };
        let idx = self.shape.flat(cell);
        self.counts[idx] += 1;
        self.sums[idx] += weight;
        if let Some(ref mut positions) = self.position_sums {
            positions[idx] = positions[idx] + *position;
        }
        true
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

    /// True if mean positions are tracked
    #[inline]
    pub fn tracks_positions(&self) -> bool {
        self.position_sums.is_some()
    }

    /// Samples in a cell
    #[inline]
    pub fn count(&self, cell: CellIndex) -> u32 {
        self.counts[self.shape.flat(cell)]
    }

    /// Metric sum in a cell
    #[inline]
    pub fn sum(&self, cell: CellIndex) -> f64 {
        self.sums[self.shape.flat(cell)]
    }

    /// Total samples across all cells
    pub fn total_count(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// Average metric, `None` for an empty cell
    #[inline]
    pub fn average(&self, cell: CellIndex) -> Option<f64> {
        self.average_at(self.shape.flat(cell))
    }

    /// Mean sample position, `None` for an empty cell or when positions
    /// are not tracked
    #[inline]
    pub fn mean_position(&self, cell: CellIndex) -> Option<Point3> {
        self.mean_position_at(self.shape.flat(cell))
    }

    /// Geometric centre of a cell
    pub fn cell_center(&self, [i, j, k]: CellIndex) -> Point3 {
        Point3::new(
            self.edges[0].center(i),
            self.edges[1].center(j),
            self.edges[2].center(k),
        )
    }

    /// Average metric of every cell in row-major order
    pub fn averages(&self) -> Vec<Option<f64>> {
        (0..self.counts.len()).map(|i| self.average_at(i)).collect()
    }

    /// Occupied cells in row-major order with their average metric
    pub fn occupied(&self) -> impl Iterator<Item = (CellIndex, f64)> + '_ {
        (0..self.counts.len())
            .filter_map(move |i| self.average_at(i).map(|avg| (self.shape.unflat(i), avg)))
    }

    #[inline]
    fn average_at(&self, idx: usize) -> Option<f64> {
        match self.counts[idx] {
            0 => None,
            n => Some(self.sums[idx] / n as f64),
        }
    }

    #[inline]
    fn mean_position_at(&self, idx: usize) -> Option<Point3> {
        let positions = self.position_sums.as_ref()?;
        match self.counts[idx] {
            0 => None,
            n => Some(positions[idx] * (1.0 / n as f64)),
        }
    }
}
