//! Per-profile settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::Point3;
use crate::fitting::{LineFitConfig, PointSourceConfig, SearchBounds};
use crate::locate::LocatorConfig;
use crate::pipeline::PipelineConfig;

use super::defaults;

/// Which telemetry column becomes the sample metric
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricSource {
    /// `downLinkPercent`
    #[default]
    Downlink,
    /// `upLinkPercent`
    Uplink,
    /// Strongest `rssi` in `signalInterference`
    Rssi,
}

/// One CSV file (or a row range of it) contributing to a graph
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CsvFileSection {
    /// Path to the CSV recording
    pub csv_file_path: PathBuf,

    /// First data row to use (inclusive)
    #[serde(default)]
    pub start_row: Option<usize>,

    /// Data row to stop at (exclusive)
    #[serde(default)]
    pub end_row: Option<usize>,
}

/// A dataset assembled from one or more CSV files
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSection {
    /// Label shown in logs and plots
    #[serde(default)]
    pub title: String,

    /// Files concatenated in order
    #[serde(default)]
    pub files: Vec<CsvFileSection>,
}

/// Settings for one named profile
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    /// Metric source
    #[serde(default)]
    pub data: MetricSource,

    /// Graphs; the first two are differenced as A - B
    #[serde(default)]
    pub graphs: Vec<GraphSection>,

    /// Bins per axis when binning a single graph
    #[serde(default = "defaults::histogram_bins")]
    pub histogram_bins: [usize; 3],

    /// Bins per axis for the shared difference grid
    #[serde(default = "defaults::histogram_bins_difference")]
    pub histogram_bins_difference_graph: [usize; 3],

    /// Drop mid-range metrics on load
    #[serde(default)]
    pub filter_middle_info: bool,

    /// Metrics at or above this survive the mid-range filter
    #[serde(default = "defaults::high_info_floor")]
    pub high_info_floor: f64,

    /// Metrics at or below this survive the mid-range filter
    #[serde(default = "defaults::low_info_ceil")]
    pub low_info_ceil: f64,

    /// Point-source search box
    #[serde(default = "defaults::search_bounds")]
    pub find_shabash_bounds: SearchBounds,

    /// Ground elevation (ASL) for the line intersection
    #[serde(default = "defaults::ground_asl", alias = "ground_elevation")]
    pub ground_asl: f64,

    /// Samples per rounded altitude needed to seed a layer
    #[serde(default = "defaults::layer_count_threshold")]
    pub layer_count_threshold: u32,

    /// Per-layer locator
    #[serde(default)]
    pub locator: LocatorConfig,

    /// Robust line fit
    #[serde(default)]
    pub line_fit: LineFitConfig,

    /// Point-source solver
    #[serde(default)]
    pub point_source: PointSourceConfig,

    /// Draw the configured source location on plots
    #[serde(default)]
    pub show_shabash: bool,

    /// Configured (expected) source location, [lon, lat, asl]
    #[serde(default)]
    pub shabash_loc: Option<[f64; 3]>,

    /// Surveyed source location, [lon, lat, asl]
    #[serde(default)]
    pub real_shabash_loc: Option<[f64; 3]>,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            data: MetricSource::Downlink,
            graphs: Vec::new(),
            histogram_bins: defaults::histogram_bins(),
            histogram_bins_difference_graph: defaults::histogram_bins_difference(),
            filter_middle_info: false,
            high_info_floor: defaults::high_info_floor(),
            low_info_ceil: defaults::low_info_ceil(),
            find_shabash_bounds: defaults::search_bounds(),
            ground_asl: defaults::ground_asl(),
            layer_count_threshold: defaults::layer_count_threshold(),
            locator: LocatorConfig::default(),
            line_fit: LineFitConfig::default(),
            point_source: PointSourceConfig::default(),
            show_shabash: false,
            shabash_loc: None,
            real_shabash_loc: None,
        }
    }
}

impl ProfileConfig {
    /// True if a sample with this metric passes the mid-range filter
    pub fn keeps_metric(&self, metric: f64) -> bool {
        !self.filter_middle_info || metric <= self.low_info_ceil || self.high_info_floor <= metric
    }

    /// Configured source location, only when `show_shabash` is set
    pub fn shown_source(&self) -> Option<Point3> {
        if self.show_shabash {
            self.shabash_loc.map(|[x, y, z]| Point3::new(x, y, z))
        } else {
            None
        }
    }

    /// Surveyed source location
    pub fn real_source(&self) -> Option<Point3> {
        self.real_shabash_loc.map(|[x, y, z]| Point3::new(x, y, z))
    }

    /// Convert to the pipeline's runtime config
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            difference_bins: self.histogram_bins_difference_graph,
            layer_count_threshold: self.layer_count_threshold,
            ground_elevation: self.ground_asl,
            locator: self.locator.clone(),
            line_fit: self.line_fit.clone(),
        }
    }
}
