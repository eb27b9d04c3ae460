//! 3D lines fitted by principal direction.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::core::Point3;
use crate::error::{LocateError, Result};

/// Below this |direction.z| a line counts as parallel to a horizontal plane.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Infinite line through `point` along unit `direction`.
///
/// The direction sign carries no meaning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedLine3D {
    /// A point on the line (centroid for fitted lines)
    pub point: Point3,
    /// Unit direction
    pub direction: Point3,
}

impl FittedLine3D {
    /// Line through `point` along `direction` (normalised here)
    pub fn new(point: Point3, direction: Point3) -> Result<Self> {
        let direction = direction
            .normalized()
            .ok_or(LocateError::DegenerateDirection("zero-length direction"))?;
        Ok(Self { point, direction })
    }

    /// Total-least-squares line through `points`.
    ///
    /// Passes through the centroid along the top right-singular vector of
    /// the centred point matrix.
    pub fn fit(points: &[Point3]) -> Result<Self> {
        if points.len() < 2 {
            return Err(LocateError::InsufficientPoints {
                required: 2,
                found: points.len(),
            });
        }

        let n = points.len() as f64;
        let centroid = points.iter().fold(Point3::ZERO, |acc, p| acc + *p) * (1.0 / n);
        let centered = DMatrix::from_fn(points.len(), 3, |r, c| points[r].axis(c) - centroid.axis(c));

        let svd = centered.svd(false, true);
        let v_t = svd
            .v_t
            .ok_or(LocateError::DegenerateDirection("SVD produced no right-singular vectors"))?;
        let top = svd.singular_values.imax();
        if svd.singular_values[top] <= f64::EPSILON {
            return Err(LocateError::DegenerateDirection("points are coincident"));
        }

        let direction = Point3::new(v_t[(top, 0)], v_t[(top, 1)], v_t[(top, 2)]);
        Self::new(centroid, direction)
    }

    /// Same line with a canonical direction sign: z >= 0, or the first
    /// non-zero component positive when z is zero.
    pub fn canonical(self) -> Self {
        let d = self.direction;
        let flip = if d.z != 0.0 {
            d.z < 0.0
        } else if d.x != 0.0 {
            d.x < 0.0
        } else {
            d.y < 0.0
        };
        if flip {
            Self {
                point: self.point,
                direction: d * -1.0,
            }
        } else {
            self
        }
    }

    /// Point at parameter `t`
    #[inline]
    pub fn point_at(&self, t: f64) -> Point3 {
        self.point + self.direction * t
    }

    /// Orthogonal projection of `p` onto the line
    #[inline]
    pub fn project(&self, p: &Point3) -> Point3 {
        self.point_at((*p - self.point).dot(&self.direction))
    }

    /// Perpendicular distance from `p` to the line
    #[inline]
    pub fn distance(&self, p: &Point3) -> f64 {
        p.distance(&self.project(p))
    }

    /// Where the line crosses the horizontal plane `z = elevation`.
    pub fn intersect_horizontal(&self, elevation: f64) -> Result<Point3> {
        if self.direction.z.abs() < PARALLEL_EPSILON {
            return Err(LocateError::DegenerateDirection(
                "line is parallel to the ground plane",
            ));
        }
        let t = (elevation - self.point.z) / self.direction.z;
        let hit = self.point_at(t);
        // Pin z exactly to the plane
        Ok(Point3::new(hit.x, hit.y, elevation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ground_intersection() {
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let line = FittedLine3D::new(Point3::ZERO, Point3::new(s, 0.0, s)).unwrap();

        let hit = line.intersect_horizontal(5.0).unwrap();
        assert_relative_eq!(hit.x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(hit.y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(hit.z, 5.0);
    }

    #[test]
    fn test_parallel_line_has_no_intersection() {
        let line = FittedLine3D::new(Point3::new(0.0, 0.0, 10.0), Point3::new(1.0, 1.0, 0.0)).unwrap();
        assert!(matches!(
            line.intersect_horizontal(77.0),
            Err(LocateError::DegenerateDirection(_))
        ));
    }

    #[test]
    fn test_fit_collinear_points() {
        let points: Vec<Point3> = (0..5)
            .map(|i| Point3::new(1.0 + i as f64, 2.0 - 2.0 * i as f64, 3.0 * i as f64))
            .collect();
        let line = FittedLine3D::fit(&points).unwrap().canonical();

        let expected = Point3::new(1.0, -2.0, 3.0).normalized().unwrap();
        assert_relative_eq!(line.direction.x, expected.x, epsilon = 1e-9);
        assert_relative_eq!(line.direction.y, expected.y, epsilon = 1e-9);
        assert_relative_eq!(line.direction.z, expected.z, epsilon = 1e-9);
        assert_relative_eq!(line.point.x, 3.0, epsilon = 1e-12);
        for p in &points {
            assert!(line.distance(p) < 1e-9);
        }
    }

    #[test]
    fn test_fit_two_points_matches_segment() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(0.0, 3.0, 4.0);
        let line = FittedLine3D::fit(&[a, b]).unwrap().canonical();

        assert_relative_eq!(line.direction.y, 0.6, epsilon = 1e-12);
        assert_relative_eq!(line.direction.z, 0.8, epsilon = 1e-12);
        assert_eq!(line.point, Point3::new(0.0, 1.5, 2.0));
    }

    #[test]
    fn test_fit_rejects_degenerate_input() {
        let p = Point3::new(1.0, 1.0, 1.0);
        assert!(matches!(
            FittedLine3D::fit(&[p]),
            Err(LocateError::InsufficientPoints { required: 2, found: 1 })
        ));
        assert!(matches!(
            FittedLine3D::fit(&[p, p]),
            Err(LocateError::DegenerateDirection(_))
        ));
    }

    #[test]
    fn test_perpendicular_distance() {
        let line = FittedLine3D::new(Point3::ZERO, Point3::new(0.0, 0.0, 1.0)).unwrap();
        assert_relative_eq!(line.distance(&Point3::new(3.0, 4.0, 100.0)), 5.0);
        assert_eq!(line.project(&Point3::new(3.0, 4.0, 100.0)), Point3::new(0.0, 0.0, 100.0));
    }
}
