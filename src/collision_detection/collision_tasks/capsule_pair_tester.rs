use glam::Vec3;

use crate::collidables::capsule::CapsuleShape;
use crate::collidables::sphere::SphereShape;
use crate::collision_detection::contact::ContactPoint;
use crate::collision_detection::contact_solver::{
    IMPULSIVE_CONTACT_PENETRATION, RESTING_CONTACT_PENETRATION,
};
use crate::utilities::math_helper::{point_to_segment, segment_to_segment};
use crate::utilities::matrix::Matrix;

use super::sphere_pair_tester::sphere_sphere_collision;

/// Pair tester for capsule versus sphere: the sphere collides with the
/// nearest point of the capsule's internal segment.
pub struct CapsuleSphereTester;

impl CapsuleSphereTester {
    pub fn test(
        capsule: &CapsuleShape,
        capsule_matrix: &Matrix,
        sphere: &SphereShape,
        sphere_matrix: &Matrix,
        padding: f32,
        is_trigger: bool,
        out: &mut Vec<ContactPoint>,
    ) -> bool {
        let p0 = capsule_matrix.transform_point(Vec3::new(-capsule.half_height, 0.0, 0.0));
        let p1 = capsule_matrix.transform_point(Vec3::new(capsule.half_height, 0.0, 0.0));
        let center = sphere_matrix.position;
        let on_axis = point_to_segment(center, p0, p1);
        sphere_sphere_collision(
            on_axis,
            capsule.radius,
            center,
            sphere.radius,
            padding,
            is_trigger,
            out,
        )
    }
}

/// Pair tester for capsule versus capsule. Nearly parallel overlapping
/// segments produce a two-contact line manifold; everything else reduces to
/// the sphere pair at the mutual closest points.
pub struct CapsulePairTester;

impl CapsulePairTester {
    pub fn test(
        a: &CapsuleShape,
        matrix_a: &Matrix,
        b: &CapsuleShape,
        matrix_b: &Matrix,
        padding: f32,
        is_trigger: bool,
        out: &mut Vec<ContactPoint>,
    ) -> bool {
        let mut p0 = matrix_a.transform_point(Vec3::new(-a.half_height, 0.0, 0.0));
        let mut p1 = matrix_a.transform_point(Vec3::new(a.half_height, 0.0, 0.0));
        let q0 = matrix_b.transform_point(Vec3::new(-b.half_height, 0.0, 0.0));
        let q1 = matrix_b.transform_point(Vec3::new(b.half_height, 0.0, 0.0));

        let mut p10 = (p1 - p0) * (1.0 / ((p1 - p0).length_squared() + 1.0e-8).sqrt());
        let q10 = (q1 - q0) * (1.0 / ((q1 - q0).length_squared() + 1.0e-8).sqrt());
        let dot = q10.dot(p10);

        if dot.abs() > 0.998 {
            // Parallel axes: compare the projected intervals.
            let mut pl0 = p0.dot(p10);
            let mut pl1 = p1.dot(p10);
            let mut ql0 = q0.dot(p10);
            let mut ql1 = q1.dot(p10);
            if pl0 > pl1 {
                std::mem::swap(&mut pl0, &mut pl1);
                std::mem::swap(&mut p0, &mut p1);
                p10 = -p10;
            }
            let (mut qe0, mut qe1) = (q0, q1);
            if ql0 > ql1 {
                std::mem::swap(&mut ql0, &mut ql1);
                std::mem::swap(&mut qe0, &mut qe1);
            }

            if ql0 >= pl1 {
                // Disjoint intervals: end cap against end cap.
                return sphere_sphere_collision(
                    p1, a.radius, qe0, b.radius, padding, is_trigger, out,
                );
            } else if ql1 <= pl0 {
                return sphere_sphere_collision(
                    p0, a.radius, qe1, b.radius, padding, is_trigger, out,
                );
            }

            // Overlapping interval: a two-point line contact.
            let projected_q = p0 + p10 * (qe0 - p0).dot(p10);
            let dir = qe0 - projected_q;
            let mag2 = dir.length_squared();
            if mag2 < 1.0e-4 {
                return false;
            }
            let mag = mag2.sqrt();
            let dist = mag - (a.radius + b.radius + padding);
            if dist > -RESTING_CONTACT_PENETRATION {
                return false;
            }
            if is_trigger {
                return true;
            }
            let penetration = (dist.abs() - IMPULSIVE_CONTACT_PENETRATION).max(0.0);
            let normal = dir * (-1.0 / mag);
            let radial = dir * 0.5;
            let clip0 = ql0.max(pl0);
            let clip1 = ql1.min(pl1);
            for clip in [clip0, clip1] {
                out.push(ContactPoint {
                    point: p0 + p10 * (clip - pl0) + radial,
                    normal,
                    penetration,
                    user_id: 0,
                    is_edge_contact: false,
                });
            }
            false
        } else {
            let (c0, c1) = segment_to_segment(p0, p1, q0, q1);
            sphere_sphere_collision(c0, a.radius, c1, b.radius, padding, is_trigger, out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;

    #[test]
    fn sphere_on_capsule_side() {
        let capsule = CapsuleShape::new(0.5, 4.0);
        let sphere = SphereShape::new(0.5);
        let mut out = Vec::new();
        CapsuleSphereTester::test(
            &capsule,
            &Matrix::IDENTITY,
            &sphere,
            &Matrix::from_translation(Vec3::new(1.0, 0.8, 0.0)),
            0.0,
            false,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        // Nearest axis point is (1, 0, 0); the sphere sits 0.8 above it with
        // combined radius 1.
        assert_relative_eq!(out[0].normal, Vec3::new(0.0, -1.0, 0.0), epsilon = 1.0e-5);
        assert_relative_eq!(out[0].penetration, 0.2, epsilon = 1.0e-2);
    }

    #[test]
    fn parallel_capsules_make_line_contact() {
        let a = CapsuleShape::new(0.5, 4.0);
        let b = CapsuleShape::new(0.5, 4.0);
        let mut out = Vec::new();
        // Side by side, shifted half a length along the axis, slightly
        // overlapping radially.
        CapsulePairTester::test(
            &a,
            &Matrix::IDENTITY,
            &b,
            &Matrix::from_translation(Vec3::new(1.0, 0.9, 0.0)),
            0.0,
            false,
            &mut out,
        );
        assert_eq!(out.len(), 2);
        for contact in &out {
            assert_relative_eq!(contact.normal, Vec3::new(0.0, -1.0, 0.0), epsilon = 1.0e-5);
            assert_relative_eq!(contact.penetration, 0.1, epsilon = 1.0e-2);
            assert_relative_eq!(contact.point.y, 0.45, epsilon = 1.0e-5);
        }
        // The overlap interval is x in [-1, 2].
        let mut xs: Vec<f32> = out.iter().map(|c| c.point.x).collect();
        xs.sort_by(f32::total_cmp);
        assert_relative_eq!(xs[0], -1.0, epsilon = 1.0e-4);
        assert_relative_eq!(xs[1], 2.0, epsilon = 1.0e-4);
    }

    #[test]
    fn crossed_capsules_reduce_to_sphere_contact() {
        let a = CapsuleShape::new(0.5, 4.0);
        let b = CapsuleShape::new(0.5, 4.0);
        let mut out = Vec::new();
        CapsulePairTester::test(
            &a,
            &Matrix::IDENTITY,
            &b,
            &Matrix::from_quat_translation(
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
                Vec3::new(0.0, 0.9, 0.0),
            ),
            0.0,
            false,
            &mut out,
        );
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, Vec3::new(0.0, -1.0, 0.0), epsilon = 1.0e-4);
        assert_relative_eq!(out[0].penetration, 0.1, epsilon = 1.0e-2);
    }

    #[test]
    fn parallel_disjoint_intervals_use_end_caps() {
        let a = CapsuleShape::new(0.5, 2.0);
        let b = CapsuleShape::new(0.5, 2.0);
        let mut out = Vec::new();
        CapsulePairTester::test(
            &a,
            &Matrix::IDENTITY,
            &b,
            &Matrix::from_translation(Vec3::new(2.9, 0.0, 0.0)),
            0.0,
            false,
            &mut out,
        );
        // End spheres at (1,0,0) and (1.9,0,0), overlap 0.1.
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].normal, Vec3::new(-1.0, 0.0, 0.0), epsilon = 1.0e-5);
        assert_relative_eq!(out[0].penetration, 0.1, epsilon = 1.0e-2);
    }
}
