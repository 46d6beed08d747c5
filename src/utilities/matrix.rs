use glam::{Mat3, Quat, Vec3};

use super::plane::Plane;

/// A rigid transform: rotation plus position. This is the 4x3 matrix every
/// query hands in for each shape; the rotation part must be orthonormal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub rotation: Mat3,
    pub position: Vec3,
}

impl Matrix {
    pub const IDENTITY: Self = Self {
        rotation: Mat3::IDENTITY,
        position: Vec3::ZERO,
    };

    #[inline(always)]
    pub fn new(rotation: Mat3, position: Vec3) -> Self {
        Self { rotation, position }
    }

    #[inline(always)]
    pub fn from_translation(position: Vec3) -> Self {
        Self {
            rotation: Mat3::IDENTITY,
            position,
        }
    }

    #[inline(always)]
    pub fn from_quat_translation(rotation: Quat, position: Vec3) -> Self {
        Self {
            rotation: Mat3::from_quat(rotation),
            position,
        }
    }

    #[inline(always)]
    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.position
    }

    #[inline(always)]
    pub fn untransform_point(&self, point: Vec3) -> Vec3 {
        self.rotation.transpose() * (point - self.position)
    }

    #[inline(always)]
    pub fn rotate_vector(&self, v: Vec3) -> Vec3 {
        self.rotation * v
    }

    #[inline(always)]
    pub fn unrotate_vector(&self, v: Vec3) -> Vec3 {
        self.rotation.transpose() * v
    }

    /// Inverse of a rigid transform; relies on the rotation being orthonormal.
    #[inline]
    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.transpose();
        Self {
            rotation,
            position: rotation * -self.position,
        }
    }

    /// Expresses `other` in the local frame of `self`.
    #[inline]
    pub fn relative_to(&self, other: &Matrix) -> Self {
        let rotation = self.rotation.transpose();
        Self {
            rotation: rotation * other.rotation,
            position: rotation * (other.position - self.position),
        }
    }

    /// Transforms a plane from the local frame of this matrix to the outer
    /// frame.
    #[inline]
    pub fn transform_plane(&self, plane: &Plane) -> Plane {
        let normal = self.rotate_vector(plane.normal);
        Plane::new(normal, plane.offset - normal.dot(self.position))
    }

    /// Transforms a plane from the outer frame into the local frame of this
    /// matrix.
    #[inline]
    pub fn untransform_plane(&self, plane: &Plane) -> Plane {
        Plane::new(
            self.unrotate_vector(plane.normal),
            plane.evaluate(self.position),
        )
    }

    /// True when the transform is a finite rigid motion: all lanes finite and
    /// the rotation orthonormal within tolerance. Queries reject anything
    /// else before touching the geometry.
    pub fn is_rigid(&self) -> bool {
        if !self.position.is_finite() {
            return false;
        }
        let x = self.rotation.x_axis;
        let y = self.rotation.y_axis;
        let z = self.rotation.z_axis;
        if !(x.is_finite() && y.is_finite() && z.is_finite()) {
            return false;
        }
        const UNIT_TOL: f32 = 1.0e-3;
        if (x.length_squared() - 1.0).abs() > UNIT_TOL
            || (y.length_squared() - 1.0).abs() > UNIT_TOL
            || (z.length_squared() - 1.0).abs() > UNIT_TOL
        {
            return false;
        }
        x.dot(y).abs() < UNIT_TOL && y.dot(z).abs() < UNIT_TOL && x.cross(y).dot(z) > 0.999
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn transform_round_trip() {
        let m = Matrix::from_quat_translation(
            Quat::from_rotation_y(0.7),
            Vec3::new(1.0, -2.0, 3.0),
        );
        let p = Vec3::new(0.3, 0.6, -0.9);
        assert_relative_eq!(m.untransform_point(m.transform_point(p)), p, epsilon = 1.0e-6);
        assert_relative_eq!(
            m.inverse().transform_point(m.transform_point(p)),
            p,
            epsilon = 1.0e-6
        );
    }

    #[test]
    fn relative_to_matches_inverse_product() {
        let a = Matrix::from_quat_translation(Quat::from_rotation_z(0.3), Vec3::new(5.0, 0.0, 0.0));
        let b = Matrix::from_quat_translation(Quat::from_rotation_x(-1.1), Vec3::new(0.0, 2.0, 1.0));
        let local = a.relative_to(&b);
        let p = Vec3::new(0.2, 0.4, 0.8);
        assert_relative_eq!(
            a.transform_point(local.transform_point(p)),
            b.transform_point(p),
            epsilon = 1.0e-5
        );
    }

    #[test]
    fn plane_transform_preserves_distance() {
        let m = Matrix::from_quat_translation(Quat::from_rotation_x(0.4), Vec3::new(0.0, 3.0, 0.0));
        let plane = Plane::from_point_normal(Vec3::Y, Vec3::new(0.0, 1.0, 0.0));
        let p = Vec3::new(1.0, 2.0, 3.0);
        let world = m.transform_plane(&plane);
        assert_relative_eq!(
            world.evaluate(m.transform_point(p)),
            plane.evaluate(p),
            epsilon = 1.0e-5
        );
        let back = m.untransform_plane(&world);
        assert_relative_eq!(back.normal, plane.normal, epsilon = 1.0e-6);
        assert_relative_eq!(back.offset, plane.offset, epsilon = 1.0e-5);
    }

    #[test]
    fn rejects_non_rigid_rotation() {
        assert!(Matrix::IDENTITY.is_rigid());
        let scaled = Matrix::new(Mat3::from_diagonal(Vec3::splat(2.0)), Vec3::ZERO);
        assert!(!scaled.is_rigid());
        let nan = Matrix::from_translation(Vec3::new(f32::NAN, 0.0, 0.0));
        assert!(!nan.is_rigid());
    }
}
