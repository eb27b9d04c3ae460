//! Default value functions for serde deserialization.

use crate::fitting::SearchBounds;

pub fn histogram_bins() -> [usize; 3] {
    [10, 10, 10]
}

pub fn histogram_bins_difference() -> [usize; 3] {
    [20, 20, 20]
}

pub fn high_info_floor() -> f64 {
    80.0
}

pub fn low_info_ceil() -> f64 {
    20.0
}

pub fn ground_asl() -> f64 {
    77.0
}

pub fn layer_count_threshold() -> u32 {
    crate::layers::DEFAULT_LAYER_COUNT_THRESHOLD
}

pub fn search_bounds() -> SearchBounds {
    // Whole-globe lon/lat, 0-1000 m ASL, any positive scale
    SearchBounds::from_ordered([-180.0, -90.0, 0.0, 0.0], [180.0, 90.0, 1000.0, 1e10])
}
