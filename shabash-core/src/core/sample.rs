//! Telemetry samples and datasets.

use serde::{Deserialize, Serialize};

use super::point::Point3;

/// One receiver observation: where it was and how strong the signal looked.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Receiver position (lon, lat, asl)
    pub position: Point3,
    /// Signal-quality metric (percentage, dBm or derived index)
    pub metric: f64,
}

impl Sample {
    /// Create a new sample
    #[inline]
    pub fn new(position: Point3, metric: f64) -> Self {
        Self { position, metric }
    }
}

/// Ordered samples from a single pass (e.g. "transmitter on").
///
/// Order carries no meaning to any algorithm; only membership and per-axis
/// values matter.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Human-readable label (graph title)
    pub label: String,
    /// Samples in load order
    pub samples: Vec<Sample>,
}

impl Dataset {
    /// Create a dataset from samples
    pub fn new(label: impl Into<String>, samples: Vec<Sample>) -> Self {
        Self {
            label: label.into(),
            samples,
        }
    }

    /// Number of samples
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True if the dataset has no samples
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Positions in sample order
    pub fn positions(&self) -> Vec<Point3> {
        self.samples.iter().map(|s| s.position).collect()
    }

    /// Metrics in sample order
    pub fn metrics(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.metric).collect()
    }

    /// Append another dataset's samples
    pub fn extend(&mut self, other: Dataset) {
        self.samples.extend(other.samples);
    }

    /// Dataset `a` followed by `b` with its metrics negated.
    ///
    /// Used as an "instant" cross-check input for the point-source fitter:
    /// signal-present samples push the source estimate toward them while
    /// signal-absent samples push it away.
    pub fn signed_union(a: &Dataset, b: &Dataset) -> Dataset {
        let samples = a
            .samples
            .iter()
            .copied()
            .chain(
                b.samples
                    .iter()
                    .map(|s| Sample::new(s.position, -s.metric)),
            )
            .collect();
        Dataset::new(format!("{} - {}", a.label, b.label), samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_union() {
        let a = Dataset::new("on", vec![Sample::new(Point3::new(0.0, 0.0, 0.0), 10.0)]);
        let b = Dataset::new(
            "off",
            vec![
                Sample::new(Point3::new(1.0, 0.0, 0.0), 4.0),
                Sample::new(Point3::new(2.0, 0.0, 0.0), -2.0),
            ],
        );

        let union = Dataset::signed_union(&a, &b);
        assert_eq!(union.label, "on - off");
        assert_eq!(union.metrics(), vec![10.0, -4.0, 2.0]);
        assert_eq!(union.positions()[2], Point3::new(2.0, 0.0, 0.0));
    }
}
