//! Error types for shabash-core

/// Result type alias
pub type Result<T> = std::result::Result<T, LocateError>;

/// Estimation failures.
///
/// Missing data is never an error here: empty grid cells and layers without
/// a candidate are carried as `None` through the pipeline.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocateError {
    /// Parallel arrays differ in length
    #[error("Shape mismatch: {what} has {actual} entries, expected {expected}")]
    ShapeMismatch {
        /// Which input was mismatched
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        actual: usize,
    },

    /// Not enough points for the requested fit
    #[error("Insufficient points: need at least {required}, got {found}")]
    InsufficientPoints {
        /// Minimum required
        required: usize,
        /// Points supplied
        found: usize,
    },

    /// Fitted line has no usable direction (parallel to the ground plane or
    /// built from coincident points)
    #[error("Degenerate line direction: {0}")]
    DegenerateDirection(&'static str),

    /// Nonlinear least squares stopped without meeting its tolerances
    #[error("Solver did not converge after {iterations} iterations (cost {cost:.6})")]
    SolverNonConvergence {
        /// Iterations performed
        iterations: usize,
        /// Final cost
        cost: f64,
    },

    /// Dataset has no samples where at least one is required
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// Bin count of zero or malformed edges
    #[error("Invalid bins: {0}")]
    InvalidBins(String),

    /// Search box with lower > upper on some axis
    #[error("Invalid bounds on parameter {index}: lower {lower} > upper {upper}")]
    InvalidBounds {
        /// Parameter index (x, y, z, C)
        index: usize,
        /// Lower bound
        lower: f64,
        /// Upper bound
        upper: f64,
    },

    /// Metric values cannot be normalised
    #[error("Invalid metric: {0}")]
    InvalidMetric(String),
}

impl LocateError {
    /// Shorthand for a length mismatch between parallel inputs
    pub(crate) fn shape(what: &'static str, expected: usize, actual: usize) -> Self {
        LocateError::ShapeMismatch {
            what,
            expected,
            actual,
        }
    }
}
