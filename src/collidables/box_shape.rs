use glam::Vec3;

use crate::utilities::bounding_box::{BoundingBox, AABB_PADDING};
use crate::utilities::math_helper::binary_sign;
use crate::utilities::matrix::Matrix;
use crate::utilities::plane::Plane;

use super::ray::RayCastResult;
use super::shape::MassProperties;
use super::tessellation::{unit_box, unit_box_vertex};

/// Collision shape representing a rectangular solid centered on its local
/// origin.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxShape {
    /// Half of the box extent along each local axis.
    pub half_extents: Vec3,
}

impl BoxShape {
    /// Creates a box from its full side lengths.
    #[inline(always)]
    pub fn new(size_x: f32, size_y: f32, size_z: f32) -> Self {
        Self {
            half_extents: Vec3::new(size_x, size_y, size_z) * 0.5,
        }
    }

    #[inline(always)]
    pub fn from_half_extents(half_extents: Vec3) -> Self {
        Self { half_extents }
    }

    /// Local point of maximum projection onto the direction. Branchless sign
    /// select per axis.
    #[inline(always)]
    pub fn support_vertex(&self, direction: Vec3) -> Vec3 {
        Vec3::new(
            binary_sign(direction.x) * self.half_extents.x,
            binary_sign(direction.y) * self.half_extents.y,
            binary_sign(direction.z) * self.half_extents.z,
        )
    }

    pub fn calc_aabb(&self, matrix: &Matrix) -> BoundingBox {
        let r = &matrix.rotation;
        let h = self.half_extents;
        let extent = Vec3::new(
            r.x_axis.x.abs() * h.x + r.y_axis.x.abs() * h.y + r.z_axis.x.abs() * h.z,
            r.x_axis.y.abs() * h.x + r.y_axis.y.abs() * h.y + r.z_axis.y.abs() * h.z,
            r.x_axis.z.abs() * h.x + r.y_axis.z.abs() * h.y + r.z_axis.z.abs() * h.z,
        );
        BoundingBox::new(matrix.position - extent, matrix.position + extent)
            .inflate(AABB_PADDING)
    }

    /// Segment cast against the box surface in local space, slab by slab.
    pub fn ray_cast(&self, p0: Vec3, p1: Vec3) -> RayCastResult {
        let dp = p1 - p0;
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;
        let mut normal = Vec3::ZERO;

        for axis in 0..3 {
            let origin = p0[axis];
            let dir = dp[axis];
            let half = self.half_extents[axis];
            if dir.abs() < 1.0e-8 {
                if origin < -half || origin > half {
                    return RayCastResult::miss();
                }
                continue;
            }
            let inv = 1.0 / dir;
            let mut t0 = (-half - origin) * inv;
            let mut t1 = (half - origin) * inv;
            let mut axis_normal = Vec3::ZERO;
            axis_normal[axis] = -binary_sign(dir);
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            if t0 > t_min {
                t_min = t0;
                normal = axis_normal;
            }
            t_max = t_max.min(t1);
            if t_min > t_max {
                return RayCastResult::miss();
            }
        }

        // A segment starting inside reports no hit, matching the other
        // primitives.
        if normal == Vec3::ZERO {
            return RayCastResult::miss();
        }
        RayCastResult::hit(t_min, normal)
    }

    /// Cross-section polygon of the box at the plane, walking the shared
    /// half-edge topology. Returns true when the section degenerated to an
    /// edge or vertex.
    pub fn calculate_plane_intersection(
        &self,
        normal: Vec3,
        point: Vec3,
        out: &mut Vec<Vec3>,
    ) -> bool {
        let plane = Plane::from_point_normal(normal, point);
        let half = self.half_extents;
        let vertex_of = move |i: usize| unit_box_vertex(i, half);
        unit_box().plane_intersection(&vertex_of, &plane, out);
        !out.is_empty() && out.len() <= 2
    }

    /// Unit-density volume integrals of the rectangular solid.
    pub fn calculate_mass_properties(&self) -> MassProperties {
        let size = self.half_extents * 2.0;
        let volume = size.x * size.y * size.z;
        let coeff = volume / 12.0;
        MassProperties {
            volume,
            inertia: Vec3::new(
                coeff * (size.y * size.y + size.z * size.z),
                coeff * (size.x * size.x + size.z * size.z),
                coeff * (size.x * size.x + size.y * size.y),
            ),
            cross_inertia: Vec3::ZERO,
            center_of_mass: Vec3::ZERO,
        }
    }

    /// Radius of the circumscribed sphere.
    #[inline(always)]
    pub fn max_radius(&self) -> f32 {
        self.half_extents.length()
    }

    /// Radius of the inscribed sphere.
    #[inline(always)]
    pub fn min_radius(&self) -> f32 {
        self.half_extents.min_element()
    }
}
