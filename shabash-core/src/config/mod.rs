//! Profile-based configuration loading.
//!
//! A single YAML file holds any number of named profiles; the top-level
//! `config` key selects the active one.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shabash_core::config::ShabashConfig;
//!
//! // Load from default path (configs/csv_lines_config.yaml)
//! let config = ShabashConfig::load_default()?;
//! let profile = config.active_profile()?;
//!
//! // Convert to the runtime pipeline config
//! let pipeline_config = profile.to_pipeline_config();
//! ```
//!
//! ## Example YAML
//!
//! ```yaml
//! config: field
//! field:
//!   data: downlink            # downlink | uplink | rssi
//!   graphs:
//!     - title: source on
//!       files:
//!         - csv_file_path: recordings/on.csv
//!           start_row: 0
//!           end_row: 2000
//!     - title: source off
//!       files:
//!         - csv_file_path: recordings/off.csv
//!   histogram_bins_difference_graph: [20, 20, 20]
//!   filter_middle_info: true  # keep <= low_info_ceil or >= high_info_floor
//!   low_info_ceil: 20
//!   high_info_floor: 80
//!   ground_asl: 77
//!   line_fit:
//!     residual_threshold: 5.0
//!     max_trials: 100
//!     seed: 42
//!     selection: least_median
//! ```
//!
//! Floating point values accept YAML integers.

mod defaults;
mod error;
mod profile;
mod shabash;

pub use error::ConfigLoadError;
pub use profile::{CsvFileSection, GraphSection, MetricSource, ProfileConfig};
pub use shabash::{DEFAULT_PROFILE, ShabashConfig};
