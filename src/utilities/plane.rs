use glam::Vec3;

use super::math_helper::DEGENERATE_LENGTH_SQUARED;

/// A plane stored as `normal · p + offset = 0`. The normal is unit length for
/// every plane produced by the constructors below.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    #[inline(always)]
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self { normal, offset }
    }

    /// Plane with the given normal passing through the given point.
    #[inline(always)]
    pub fn from_point_normal(normal: Vec3, point: Vec3) -> Self {
        Self {
            normal,
            offset: -normal.dot(point),
        }
    }

    /// Plane through three points, wound so the normal follows the right hand
    /// rule. Returns None for a zero-area triangle instead of a NaN normal.
    pub fn try_from_points(p0: Vec3, p1: Vec3, p2: Vec3) -> Option<Self> {
        let n = (p1 - p0).cross(p2 - p0);
        let mag2 = n.dot(n);
        if mag2 <= DEGENERATE_LENGTH_SQUARED {
            return None;
        }
        let normal = n * (1.0 / mag2.sqrt());
        Some(Self {
            normal,
            offset: -normal.dot(p0),
        })
    }

    /// Signed distance of the point from the plane.
    #[inline(always)]
    pub fn evaluate(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.offset
    }

    /// The same plane facing the other way.
    #[inline(always)]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            offset: -self.offset,
        }
    }

    /// A point on the plane (the projection of the origin).
    #[inline(always)]
    pub fn point_on_plane(&self) -> Vec3 {
        self.normal * -self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn from_points_winding_and_offset() {
        let plane = Plane::try_from_points(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, -1.0),
        )
        .unwrap();
        assert_relative_eq!(plane.normal, Vec3::Y, epsilon = 1.0e-6);
        assert_relative_eq!(plane.evaluate(Vec3::new(5.0, 3.0, 2.0)), 2.0, epsilon = 1.0e-6);
        assert_relative_eq!(plane.evaluate(plane.point_on_plane()), 0.0, epsilon = 1.0e-6);
    }

    #[test]
    fn zero_area_face_is_inactive() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!(Plane::try_from_points(p, p, Vec3::new(4.0, 5.0, 6.0)).is_none());
    }

    #[test]
    fn flipped_negates_distance() {
        let plane = Plane::from_point_normal(Vec3::Z, Vec3::new(0.0, 0.0, 2.0));
        let p = Vec3::new(1.0, 1.0, 5.0);
        assert_relative_eq!(plane.evaluate(p), -plane.flipped().evaluate(p));
    }
}
