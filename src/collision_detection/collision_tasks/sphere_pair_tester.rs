use glam::Vec3;

use crate::collidables::sphere::SphereShape;
use crate::collision_detection::contact::ContactPoint;
use crate::collision_detection::contact_solver::{
    IMPULSIVE_CONTACT_PENETRATION, RESTING_CONTACT_PENETRATION,
};
use crate::utilities::matrix::Matrix;

/// Core sphere-versus-sphere contact used directly for sphere pairs and as
/// the tail of every capsule closed form. Works entirely in world space.
/// Returns true when a trigger overlap was detected; contacts go to `out`.
pub(crate) fn sphere_sphere_collision(
    center0: Vec3,
    radius0: f32,
    center1: Vec3,
    radius1: f32,
    padding: f32,
    is_trigger: bool,
    out: &mut Vec<ContactPoint>,
) -> bool {
    let dir = center1 - center0;
    let mag2 = dir.length_squared();
    if mag2 < 1.0e-4 {
        // Both centers at the same spot; pick an arbitrary up axis so the
        // solver downstream still gets a usable contact.
        if is_trigger {
            return true;
        }
        out.push(ContactPoint {
            normal: Vec3::Y,
            point: center0 + Vec3::Y * radius0,
            penetration: 0.01,
            user_id: 0,
            is_edge_contact: false,
        });
        return false;
    }

    let mag = mag2.sqrt();
    let dist = mag - (radius0 + radius1 + padding);
    if dist > -RESTING_CONTACT_PENETRATION {
        return false;
    }
    if is_trigger {
        return true;
    }

    let penetration = (dist.abs() - IMPULSIVE_CONTACT_PENETRATION).max(0.0);
    let normal = dir * (-1.0 / mag);
    out.push(ContactPoint {
        normal,
        point: center0 - normal * (mag * 0.5),
        penetration,
        user_id: 0,
        is_edge_contact: false,
    });
    false
}

/// Pair tester for sphere versus sphere.
pub struct SpherePairTester;

impl SpherePairTester {
    pub fn test(
        a: &SphereShape,
        matrix_a: &Matrix,
        b: &SphereShape,
        matrix_b: &Matrix,
        padding: f32,
        is_trigger: bool,
        out: &mut Vec<ContactPoint>,
    ) -> bool {
        sphere_sphere_collision(
            matrix_a.position,
            a.radius,
            matrix_b.position,
            b.radius,
            padding,
            is_trigger,
            out,
        )
    }
}
