use glam::Vec3;

use crate::utilities::bounding_box::{BoundingBox, AABB_PADDING};
use crate::utilities::matrix::Matrix;
use crate::utilities::plane::Plane;

use super::ray::RayCastResult;
use super::shape::MassProperties;

/// Collision shape representing a sphere centered on its local origin.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereShape {
    pub radius: f32,
}

impl SphereShape {
    #[inline(always)]
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }

    #[inline(always)]
    pub fn support_vertex(&self, direction: Vec3) -> Vec3 {
        direction * self.radius
    }

    pub fn calc_aabb(&self, matrix: &Matrix) -> BoundingBox {
        let extent = Vec3::splat(self.radius);
        BoundingBox::new(matrix.position - extent, matrix.position + extent)
            .inflate(AABB_PADDING)
    }

    /// Segment cast against the sphere surface in local space.
    pub fn ray_cast(&self, p0: Vec3, p1: Vec3) -> RayCastResult {
        let dp = p1 - p0;
        let a = dp.dot(dp);
        if a < 1.0e-12 {
            return RayCastResult::miss();
        }
        let b = p0.dot(dp);
        let c = p0.dot(p0) - self.radius * self.radius;
        if b > 0.0 && c > 0.0 {
            // Outside and pointing away.
            return RayCastResult::miss();
        }
        let discriminant = b * b - a * c;
        if discriminant < 0.0 {
            return RayCastResult::miss();
        }
        let t = (-b - discriminant.sqrt()) / a;
        if !(0.0..=1.0).contains(&t) {
            return RayCastResult::miss();
        }
        RayCastResult::hit(t, (p0 + dp * t) / self.radius)
    }

    /// A sphere touches a plane on a single point, so the section is the
    /// projection of the center when the plane is within one radius.
    pub fn calculate_plane_intersection(
        &self,
        normal: Vec3,
        point: Vec3,
        out: &mut Vec<Vec3>,
    ) -> bool {
        out.clear();
        let plane = Plane::from_point_normal(normal, point);
        let dist = plane.evaluate(Vec3::ZERO);
        if dist.abs() > self.radius + 1.0e-3 {
            return false;
        }
        out.push(normal * -dist);
        false
    }

    /// Unit-density solid sphere integrals.
    pub fn calculate_mass_properties(&self) -> MassProperties {
        let r = self.radius;
        let volume = (4.0 / 3.0) * std::f32::consts::PI * r * r * r;
        let inertia = Vec3::splat(volume * (2.0 / 5.0) * r * r);
        MassProperties {
            volume,
            inertia,
            cross_inertia: Vec3::ZERO,
            center_of_mass: Vec3::ZERO,
        }
    }

    #[inline(always)]
    pub fn max_radius(&self) -> f32 {
        self.radius
    }

    #[inline(always)]
    pub fn min_radius(&self) -> f32 {
        self.radius
    }
}
