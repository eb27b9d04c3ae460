//! Test utilities for shabash-core.
//!
//! Synthetic receiver passes flown as square lattices at fixed altitudes.

#![allow(dead_code)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use shabash_core::{Dataset, Point3, Sample};

/// Altitudes of the synthetic passes; the top one carries a decoy.
pub const PASS_ALTITUDES: [f64; 4] = [100.0, 120.0, 140.0, 160.0];

/// Ground elevation used by the synthetic scenario.
pub const GROUND: f64 = 77.0;

/// Metric on the signal-present pass near the source.
pub const STRONG: f64 = 100.0;

/// Metric everywhere else.
pub const BACKGROUND: f64 = 20.0;

/// Centre of the strong-signal disc at altitude `z`.
///
/// The disc drifts by 0.05 per unit of altitude away from (5, 5) at the
/// ground, except at 160 where a decoy sits in the far corner.
pub fn strong_centre(z: f64) -> (f64, f64) {
    if z >= 160.0 {
        return (1.5, 8.5);
    }
    let t = 0.05 * (z - GROUND);
    (5.0 + t, 5.0 + t)
}

/// Square lattice from (0, 0) to (n * step, n * step) at each altitude.
pub fn lattice_pass(
    label: &str,
    altitudes: &[f64],
    step: f64,
    n: usize,
    metric: impl Fn(f64, f64, f64) -> f64,
) -> Dataset {
    let mut samples = Vec::with_capacity(altitudes.len() * (n + 1) * (n + 1));
    for &z in altitudes {
        for i in 0..=n {
            for j in 0..=n {
                let (x, y) = (i as f64 * step, j as f64 * step);
                samples.push(Sample::new(Point3::new(x, y, z), metric(x, y, z)));
            }
        }
    }
    Dataset::new(label, samples)
}

/// Signal-present pass: strong within radius 2 of the drifting centre.
pub fn source_on() -> Dataset {
    lattice_pass("source on", &PASS_ALTITUDES, 0.5, 20, |x, y, z| {
        let (cx, cy) = strong_centre(z);
        if (x - cx).hypot(y - cy) <= 2.0 {
            STRONG
        } else {
            BACKGROUND
        }
    })
}

/// Baseline pass over the same lattice.
pub fn source_off() -> Dataset {
    lattice_pass("source off", &PASS_ALTITUDES, 0.5, 20, |_, _, _| BACKGROUND)
}

/// Same samples in a seeded random order.
pub fn shuffled(dataset: &Dataset, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut samples = dataset.samples.clone();
    samples.shuffle(&mut rng);
    Dataset::new(dataset.label.clone(), samples)
}

/// Inverse-square field of a source at `source` with scale `c`, sampled on a lattice.
pub fn inverse_square_pass(source: Point3, c: f64) -> Dataset {
    lattice_pass("field", &[1.0, 3.0, 5.0], 1.0, 6, |x, y, z| {
        c / Point3::new(x, y, z).distance_squared(&source)
    })
}
