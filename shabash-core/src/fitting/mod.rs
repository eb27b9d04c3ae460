//! Line and point-source fitting.
//!
//! - [`FittedLine3D`]: total-least-squares line via principal direction
//! - [`RobustLineFitter`]: consensus line through per-layer candidates
//! - [`PointSourceFitter`]: inverse-square source fit on raw samples

mod line3d;
mod point_source;
mod ransac;

pub use line3d::FittedLine3D;
pub use point_source::{
    PointSourceConfig, PointSourceFit, PointSourceFitter, SearchBounds, SolverStatus,
    fit_point_source,
};
pub use ransac::{ConsensusSelection, LineFitConfig, LineFitResult, RobustLineFitter, fit_line};
