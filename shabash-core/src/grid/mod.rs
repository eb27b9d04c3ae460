//! Grid binning and dual-grid differencing.
//!
//! - [`BinEdges`]: per-axis edges with histogram semantics
//! - [`Grid`]: fixed arena of per-cell counts, sums and position sums
//! - [`bin`] / [`bin_with_positions`]: point cloud to grid
//! - [`difference`] / [`difference_with_positions`]: A minus B on shared edges

mod binner;
mod difference;
mod edges;
mod storage;

pub use binner::{Binning, bin, bin_with_positions};
pub use difference::{
    DifferenceGrid, DifferencePoints, DifferenceSummary, PositionedDifference, ResolvedBin,
    difference, difference_with_positions, shared_edges,
};
pub use edges::{BinEdges, edges_spanning};
pub use storage::{CellIndex, Grid, GridShape};
