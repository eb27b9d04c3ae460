//! Foundation types shared by every stage.

mod point;
mod sample;

pub use point::{PlanarPoint, Point3};
pub use sample::{Dataset, Sample};
