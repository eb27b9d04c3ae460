//! # Shabash
//!
//! RF source geolocation from sparse receiver telemetry.
//!
//! ## Overview
//!
//! A receiver flies passes at a handful of altitudes while logging its
//! position and a signal-quality metric. Two such passes (source on and
//! source off, or uplink and downlink) are compared cell by cell, and the
//! strongest differences in each altitude layer point at the source:
//!
//! - **Grid binning**: irregular 3D samples into per-cell count, sum and mean position
//! - **Differencing**: A minus B on shared edges, empty cells stay empty
//! - **Layering**: commonly flown altitudes grouped into bands
//! - **Per-layer locating**: centroid of strong-signal points in each band
//! - **Line fitting**: consensus 3D line through the layer candidates, crossed with the ground
//! - **Point-source fitting**: bounded inverse-square fit on raw samples
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shabash_core::{LocatePipeline, ShabashConfig};
//!
//! let config = ShabashConfig::load_default()?;
//! let profile = config.active_profile()?;
//!
//! let pipeline = LocatePipeline::new(profile.to_pipeline_config());
//! let report = pipeline.run(&source_on, &source_off)?;
//!
//! println!("Source near {:?}", report.intersection());
//! ```
//!
//! ## Coordinate System
//!
//! Positions are `(x, y, z)` = (longitude, latitude, metres above sea level).
//! Nothing here projects to a metric frame; distances mix degrees and metres
//! exactly as the telemetry reports them.

#![warn(missing_docs)]

// Core types
pub mod core;

// Error types
pub mod error;

// Grid binning and differencing
pub mod grid;

// Altitude layers
pub mod layers;

// Per-layer locator
pub mod locate;

// Line and point-source fitting
pub mod fitting;

// Unified configuration
pub mod config;

// End-to-end pipeline
pub mod pipeline;

// Export (SVG)
pub mod io;

// Re-export commonly used types
pub use core::{Dataset, PlanarPoint, Point3, Sample};

pub use error::{LocateError, Result};

pub use grid::{
    BinEdges, DifferenceGrid, DifferencePoints, DifferenceSummary, Grid, PositionedDifference,
    bin, bin_with_positions, difference, difference_with_positions,
};

pub use layers::{LayerBand, segment};

pub use locate::{LayerLocation, LocatorConfig, StrongSignalLocator, ThresholdMode, locate};

pub use fitting::{
    ConsensusSelection, FittedLine3D, LineFitConfig, LineFitResult, PointSourceConfig,
    PointSourceFit, PointSourceFitter, RobustLineFitter, SearchBounds, SolverStatus, fit_line,
    fit_point_source,
};

pub use config::{ConfigLoadError, MetricSource, ProfileConfig, ShabashConfig};

pub use pipeline::{LayerOutcome, LocatePipeline, LocationReport, PipelineConfig};

pub use io::{SvgConfig, SvgVisualizer};
