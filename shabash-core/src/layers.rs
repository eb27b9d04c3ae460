//! Altitude layer segmentation.
//!
//! Receiver passes tend to be flown at a handful of fixed altitudes. Rounded
//! altitudes that occur at least `count_threshold` times seed a band,
//! neighbouring seeds (one unit apart) merge, and each band then collects
//! every point within one unit of its bounds from the unrounded altitudes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Default minimum number of samples at a rounded altitude to seed a band.
pub const DEFAULT_LAYER_COUNT_THRESHOLD: u32 = 30;

/// Tolerance around a band's bounds when collecting members.
const MEMBER_TOLERANCE: f64 = 1.0;

/// A contiguous altitude band and the indices of the points inside it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerBand {
    /// Lowest seed altitude (rounded)
    pub min_altitude: f64,
    /// Highest seed altitude (rounded)
    pub max_altitude: f64,
    /// Indices into the segmented altitude array
    pub members: Vec<usize>,
}

impl LayerBand {
    /// True if `altitude` falls in the band's tolerance window
    #[inline]
    pub fn admits(&self, altitude: f64) -> bool {
        self.min_altitude - MEMBER_TOLERANCE <= altitude
            && altitude <= self.max_altitude + MEMBER_TOLERANCE
    }

    /// True if no point fell inside the band
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Mean altitude of the members, `None` if the band is empty
    pub fn mean_altitude(&self, altitudes: &[f64]) -> Option<f64> {
        if self.members.is_empty() {
            return None;
        }
        let sum: f64 = self.members.iter().map(|&i| altitudes[i]).sum();
        Some(sum / self.members.len() as f64)
    }
}

/// Split `altitudes` into bands of commonly observed altitudes.
///
/// Bands come back in ascending altitude order. Rounding is half-to-even.
/// Non-finite altitudes neither seed nor join a band. Members of adjacent
/// bands may overlap when the gap between them is exactly two units.
pub fn segment(altitudes: &[f64], count_threshold: u32) -> Vec<LayerBand> {
    let mut frequency: BTreeMap<i64, u32> = BTreeMap::new();
    for &alt in altitudes.iter().filter(|a| a.is_finite()) {
        *frequency.entry(alt.round_ties_even() as i64).or_insert(0) += 1;
    }

    let mut bounds: Vec<(i64, i64)> = Vec::new();
    for (&height, _) in frequency.iter().filter(|&(_, &n)| n >= count_threshold) {
        match bounds.last_mut() {
            Some((_, max)) if height - *max == 1 => *max = height,
            _ => bounds.push((height, height)),
        }
    }

    bounds
        .into_iter()
        .map(|(min, max)| {
            let mut band = LayerBand {
                min_altitude: min as f64,
                max_altitude: max as f64,
                members: Vec::new(),
            };
            band.members = altitudes
                .iter()
                .enumerate()
                .filter(|&(_, &alt)| band.admits(alt))
                .map(|(i, _)| i)
                .collect();
            band
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn repeated(values: &[(f64, usize)]) -> Vec<f64> {
        values
            .iter()
            .flat_map(|&(v, n)| std::iter::repeat_n(v, n))
            .collect()
    }

    #[test]
    fn test_adjacent_heights_merge() {
        let altitudes = repeated(&[(100.0, 3), (101.2, 3), (105.0, 3), (110.0, 1)]);
        let bands = segment(&altitudes, 3);

        assert_eq!(bands.len(), 2);
        assert_eq!((bands[0].min_altitude, bands[0].max_altitude), (100.0, 101.0));
        assert_eq!(bands[0].members, (0..6).collect::<Vec<_>>());
        assert_eq!((bands[1].min_altitude, bands[1].max_altitude), (105.0, 105.0));
        assert_eq!(bands[1].members, vec![6, 7, 8]);
    }

    #[test]
    fn test_gap_of_two_splits_and_members_use_raw_altitudes() {
        // 101 is not a seed but lies within one unit of both bands
        let altitudes = repeated(&[(100.0, 2), (102.0, 2), (101.0, 1), (98.9, 1)]);
        let bands = segment(&altitudes, 2);

        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].members, vec![0, 1, 4]);
        assert_eq!(bands[1].members, vec![2, 3, 4]);
        assert!(!bands[0].members.contains(&5));
    }

    #[test]
    fn test_round_half_to_even() {
        // 100.5 rounds to 100, 101.5 rounds to 102
        let altitudes = repeated(&[(100.5, 2), (101.5, 2)]);
        let bands = segment(&altitudes, 2);

        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].min_altitude, 100.0);
        assert_eq!(bands[1].min_altitude, 102.0);
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let altitudes: Vec<f64> = (0..400).map(|i| 80.0 + (i % 7) as f64 * 1.7).collect();
        let first = segment(&altitudes, 30);
        let second = segment(&altitudes, 30);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_below_threshold_and_nan() {
        let altitudes = vec![f64::NAN, f64::NAN, f64::NAN, 5.0];
        assert!(segment(&altitudes, 2).is_empty());
        assert!(segment(&[], DEFAULT_LAYER_COUNT_THRESHOLD).is_empty());
    }

    #[test]
    fn test_mean_altitude() {
        let altitudes = vec![99.5, 100.0, 100.5, 200.0];
        let band = LayerBand {
            min_altitude: 100.0,
            max_altitude: 100.0,
            members: vec![0, 1, 2],
        };
        assert_relative_eq!(band.mean_altitude(&altitudes).unwrap(), 100.0);

        let empty = LayerBand {
            members: Vec::new(),
            ..band
        };
        assert_eq!(empty.mean_altitude(&altitudes), None);
    }
}
