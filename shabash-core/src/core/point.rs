//! Point types for receiver positions and source estimates.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// Position in 3D (longitude, latitude, altitude above sea level, or a local
/// Cartesian equivalent).
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    /// X coordinate (longitude / east)
    pub x: f64,
    /// Y coordinate (latitude / north)
    pub y: f64,
    /// Z coordinate (altitude above sea level)
    pub z: f64,
}

impl Point3 {
    /// Create a new point
    #[inline]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Origin
    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Component access by axis index (0 = x, 1 = y, 2 = z)
    #[inline]
    pub fn axis(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    /// Dot product treating both points as vectors
    #[inline]
    pub fn dot(&self, other: &Point3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Vector length
    #[inline]
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Squared distance (avoids sqrt)
    #[inline]
    pub fn distance_squared(&self, other: &Point3) -> f64 {
        (*self - *other).dot(&(*self - *other))
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance(&self, other: &Point3) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Midpoint between two points
    #[inline]
    pub fn midpoint(&self, other: &Point3) -> Point3 {
        (*self + *other) * 0.5
    }

    /// Unit vector in the same direction, `None` for a zero-length vector
    #[inline]
    pub fn normalized(&self) -> Option<Point3> {
        let n = self.norm();
        if n > f64::EPSILON && n.is_finite() {
            Some(*self * (1.0 / n))
        } else {
            None
        }
    }

    /// True if every component is finite
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Horizontal projection
    #[inline]
    pub fn planar(&self) -> PlanarPoint {
        PlanarPoint::new(self.x, self.y)
    }
}

impl From<(f64, f64, f64)> for Point3 {
    #[inline]
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Point3::new(x, y, z)
    }
}

impl From<Point3> for (f64, f64, f64) {
    #[inline]
    fn from(p: Point3) -> Self {
        (p.x, p.y, p.z)
    }
}

impl Add for Point3 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Point3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Point3 {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Point3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self {
        Point3::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

/// Horizontal (x, y) position produced by the per-layer locator
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct PlanarPoint {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl PlanarPoint {
    /// Create a new planar point
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Lift to 3D at the given altitude
    #[inline]
    pub fn at_altitude(&self, z: f64) -> Point3 {
        Point3::new(self.x, self.y, z)
    }

    /// Euclidean distance to another planar point
    #[inline]
    pub fn distance(&self, other: &PlanarPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_point_arithmetic() {
        let a = Point3::new(1.0, 2.0, 3.0);
        let b = Point3::new(4.0, 6.0, 3.0);

        assert_eq!(b - a, Point3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_eq!(a.midpoint(&b), Point3::new(2.5, 4.0, 3.0));
    }

    #[test]
    fn test_normalized_zero_vector() {
        assert!(Point3::ZERO.normalized().is_none());

        let unit = Point3::new(0.0, 3.0, 4.0).normalized().unwrap();
        assert_relative_eq!(unit.norm(), 1.0);
        assert_relative_eq!(unit.z, 0.8);
    }

    #[test]
    fn test_planar_distance() {
        let p = Point3::new(4.0, 5.0, 100.0).planar();
        assert_relative_eq!(p.distance(&PlanarPoint::new(1.0, 1.0)), 5.0);
        assert_eq!(p.at_altitude(77.0), Point3::new(4.0, 5.0, 77.0));
    }
}
