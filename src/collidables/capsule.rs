use glam::Vec3;

use crate::utilities::bounding_box::{BoundingBox, AABB_PADDING};
use crate::utilities::math_helper::binary_sign;
use crate::utilities::matrix::Matrix;
use crate::utilities::plane::Plane;

use super::ray::RayCastResult;
use super::shape::MassProperties;
use super::tessellation::unit_sphere;

/// Collision shape representing a sphere-expanded line segment. The internal
/// segment runs along the local x axis.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleShape {
    /// Spherical expansion applied to the internal line segment.
    pub radius: f32,
    /// Half of the internal segment length along the local x axis.
    pub half_height: f32,
}

impl CapsuleShape {
    /// Creates a capsule from its radius and the full length of the internal
    /// segment.
    #[inline(always)]
    pub fn new(radius: f32, height: f32) -> Self {
        Self {
            radius,
            half_height: height * 0.5,
        }
    }

    /// The sign of the direction's x lane picks an end sphere center; the
    /// rest is the sphere support.
    #[inline(always)]
    pub fn support_vertex(&self, direction: Vec3) -> Vec3 {
        let mut support = direction * self.radius;
        support.x += binary_sign(direction.x) * self.half_height;
        support
    }

    pub fn calc_aabb(&self, matrix: &Matrix) -> BoundingBox {
        let axis = matrix.rotation.x_axis * self.half_height;
        let extent = axis.abs() + Vec3::splat(self.radius);
        BoundingBox::new(matrix.position - extent, matrix.position + extent)
            .inflate(AABB_PADDING)
    }

    /// Segment cast against the capsule surface in local space: cylinder side
    /// first, then whichever end cap the side hit clamps to.
    pub fn ray_cast(&self, p0: Vec3, p1: Vec3) -> RayCastResult {
        let dp = p1 - p0;
        let radius2 = self.radius * self.radius;

        // Radial components around the x axis.
        let oh = Vec3::new(0.0, p0.y, p0.z);
        let dh = Vec3::new(0.0, dp.y, dp.z);
        let a = dh.dot(dh);
        let b = oh.dot(dh);
        let c = oh.dot(oh) - radius2;

        let sphere_x;
        if a > 1.0e-8 {
            if b > 0.0 && c > 0.0 {
                return RayCastResult::miss();
            }
            let discriminant = b * b - a * c;
            if discriminant < 0.0 {
                return RayCastResult::miss();
            }
            let t = (-b - discriminant.sqrt()) / a;
            let hit_x = p0.x + dp.x * t;
            if hit_x < -self.half_height {
                sphere_x = -self.half_height;
            } else if hit_x > self.half_height {
                sphere_x = self.half_height;
            } else {
                if !(0.0..=1.0).contains(&t) {
                    return RayCastResult::miss();
                }
                let hit = p0 + dp * t;
                return RayCastResult::hit(t, Vec3::new(0.0, hit.y, hit.z) / self.radius);
            }
        } else {
            // Parallel to the axis; only a cap can be hit.
            if c > 0.0 {
                return RayCastResult::miss();
            }
            sphere_x = if dp.x > 0.0 {
                -self.half_height
            } else {
                self.half_height
            };
        }

        let os = p0 - Vec3::new(sphere_x, 0.0, 0.0);
        let cap_a = dp.dot(dp);
        if cap_a < 1.0e-12 {
            return RayCastResult::miss();
        }
        let cap_b = os.dot(dp);
        let cap_c = os.dot(os) - radius2;
        if cap_b > 0.0 && cap_c > 0.0 {
            return RayCastResult::miss();
        }
        let cap_discriminant = cap_b * cap_b - cap_a * cap_c;
        if cap_discriminant < 0.0 {
            return RayCastResult::miss();
        }
        let t = (-cap_b - cap_discriminant.sqrt()) / cap_a;
        if !(0.0..=1.0).contains(&t) {
            return RayCastResult::miss();
        }
        RayCastResult::hit(t, (os + dp * t) / self.radius)
    }

    /// Cross-section polygon at the plane, walking the shared unit sphere
    /// tessellation with each cap shifted along the axis. Returns true when
    /// the section degenerated to an edge or vertex.
    pub fn calculate_plane_intersection(
        &self,
        normal: Vec3,
        point: Vec3,
        out: &mut Vec<Vec3>,
    ) -> bool {
        let plane = Plane::from_point_normal(normal, point);
        let sphere = unit_sphere();
        let radius = self.radius;
        let half_height = self.half_height;
        let vertex_of = move |i: usize| sphere.capsule_vertex(i, radius, half_height);
        sphere.topology.plane_intersection(&vertex_of, &plane, out);
        !out.is_empty() && out.len() <= 2
    }

    /// Unit-density integrals: cylinder plus two half-sphere caps offset
    /// along the x axis.
    pub fn calculate_mass_properties(&self) -> MassProperties {
        let r = self.radius;
        let h = self.half_height;
        let r2 = r * r;
        let h2 = h * h;
        let cylinder_volume = 2.0 * h * r2 * std::f32::consts::PI;
        let sphere_volume = (4.0 / 3.0) * r2 * r * std::f32::consts::PI;
        let volume = cylinder_volume + sphere_volume;

        // Axial term: cylinder about its axis plus the cap spheres.
        let axial = cylinder_volume * 0.5 * r2 + sphere_volume * 0.4 * r2;
        // Transverse terms pick up the parallel-axis shift of the caps.
        let transverse = cylinder_volume * ((3.0 / 12.0) * r2 + (4.0 / 12.0) * h2)
            + sphere_volume * (0.4 * r2 + (6.0 / 8.0) * r * h + h2);

        MassProperties {
            volume,
            inertia: Vec3::new(axial, transverse, transverse),
            cross_inertia: Vec3::ZERO,
            center_of_mass: Vec3::ZERO,
        }
    }

    #[inline(always)]
    pub fn max_radius(&self) -> f32 {
        self.half_height + self.radius
    }

    #[inline(always)]
    pub fn min_radius(&self) -> f32 {
        self.radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn support_vertex_selects_end_sphere() {
        let capsule = CapsuleShape::new(0.5, 4.0);
        let dir = Vec3::new(0.6, 0.8, 0.0);
        let support = capsule.support_vertex(dir);
        assert_relative_eq!(support, Vec3::new(2.0 + 0.3, 0.4, 0.0), epsilon = 1.0e-6);
        let dir = Vec3::new(-0.6, 0.8, 0.0);
        let support = capsule.support_vertex(dir);
        assert_relative_eq!(support, Vec3::new(-2.0 - 0.3, 0.4, 0.0), epsilon = 1.0e-6);
    }

    #[test]
    fn ray_cast_cylinder_side() {
        let capsule = CapsuleShape::new(1.0, 4.0);
        let result = capsule.ray_cast(Vec3::new(0.5, -3.0, 0.0), Vec3::new(0.5, 3.0, 0.0));
        assert!(result.is_hit());
        assert_relative_eq!(result.t, 2.0 / 6.0, epsilon = 1.0e-5);
        assert_relative_eq!(result.normal, Vec3::new(0.0, -1.0, 0.0), epsilon = 1.0e-5);
    }

    #[test]
    fn ray_cast_end_cap() {
        let capsule = CapsuleShape::new(1.0, 4.0);
        let result = capsule.ray_cast(Vec3::new(6.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.0));
        assert!(result.is_hit());
        assert_relative_eq!(result.t, 0.5, epsilon = 1.0e-5);
        assert_relative_eq!(result.normal, Vec3::new(1.0, 0.0, 0.0), epsilon = 1.0e-5);
    }

    #[test]
    fn ray_cast_parallel_miss() {
        let capsule = CapsuleShape::new(1.0, 4.0);
        assert!(!capsule
            .ray_cast(Vec3::new(-6.0, 2.0, 0.0), Vec3::new(6.0, 2.0, 0.0))
            .is_hit());
    }

    #[test]
    fn plane_section_cuts_barrel() {
        let capsule = CapsuleShape::new(1.0, 4.0);
        let mut out = Vec::new();
        let degenerate = capsule.calculate_plane_intersection(Vec3::X, Vec3::ZERO, &mut out);
        assert!(!degenerate);
        // The section is a ring of the tessellated barrel around the axis.
        assert!(out.len() >= 4);
        for p in &out {
            let radial = (p.y * p.y + p.z * p.z).sqrt();
            assert_relative_eq!(p.x, 0.0, epsilon = 1.0e-5);
            assert_relative_eq!(radial, 1.0, epsilon = 1.0e-4);
        }
    }

    #[test]
    fn mass_properties_reduce_to_sphere_without_segment() {
        let capsule = CapsuleShape::new(1.5, 0.0);
        let props = capsule.calculate_mass_properties();
        let sphere = crate::collidables::sphere::SphereShape::new(1.5).calculate_mass_properties();
        assert_relative_eq!(props.volume, sphere.volume, epsilon = 1.0e-4);
        assert_relative_eq!(props.inertia.x, sphere.inertia.x, epsilon = 1.0e-3);
        assert_relative_eq!(props.inertia.y, sphere.inertia.y, epsilon = 1.0e-3);
    }
}
