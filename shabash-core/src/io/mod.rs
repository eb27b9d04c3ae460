//! Result export.
//!
//! ## SVG Visualization
//!
//! ```rust,ignore
//! use shabash_core::io::{SvgConfig, SvgVisualizer};
//! use std::path::Path;
//!
//! let report = pipeline.run(&on, &off)?;
//! SvgVisualizer::new(&report, SvgConfig::default())
//!     .with_title("Field run")
//!     .with_expected_source(profile.shown_source())
//!     .save(Path::new("report.svg"))?;
//! ```

pub mod svg;

pub use svg::{SvgColorScheme, SvgConfig, SvgVisualizer, value_color};
