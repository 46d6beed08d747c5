use glam::Vec3;

use crate::collidables::box_shape::BoxShape;
use crate::collidables::sphere::SphereShape;
use crate::collision_detection::contact::ContactPoint;
use crate::collision_detection::contact_solver::{
    IMPULSIVE_CONTACT_PENETRATION, RESTING_CONTACT_PENETRATION,
};
use crate::utilities::matrix::Matrix;

/// Outcome of the closed-form box-sphere test.
pub enum SphereBoxOutcome {
    /// The closed form handled the pair; the flag reports trigger overlap.
    Done(bool),
    /// The sphere center is inside the box; the general solver must take
    /// over to find the minimum escape direction.
    DeepCenter,
}

/// Pair tester for box versus sphere: classifies the sphere center against
/// the box's faces, edges and corners, each region having its own closed
/// form. Reported normals point from the sphere toward the box.
pub struct SphereBoxTester;

impl SphereBoxTester {
    pub fn test(
        box_shape: &BoxShape,
        box_matrix: &Matrix,
        sphere: &SphereShape,
        sphere_matrix: &Matrix,
        padding: f32,
        is_trigger: bool,
        out: &mut Vec<ContactPoint>,
    ) -> SphereBoxOutcome {
        let size = box_shape.half_extents;
        let radius = sphere.radius + padding;
        let center = box_matrix.untransform_point(sphere_matrix.position);

        let code_x = region_code(center.x, size.x);
        let code_y = region_code(center.y, size.y);
        let code_z = region_code(center.z, size.z);
        let outside_axes =
            (code_x != 0) as u32 + (code_y != 0) as u32 + (code_z != 0) as u32;
        if outside_axes == 0 {
            return SphereBoxOutcome::DeepCenter;
        }

        let dist;
        let normal;
        let mut point = center;
        if outside_axes == 1 {
            // Face region: the normal is the face axis itself.
            let (axis, code) = if code_x != 0 {
                (0, code_x)
            } else if code_y != 0 {
                (1, code_y)
            } else {
                (2, code_z)
            };
            let mut n = Vec3::ZERO;
            if code == 2 {
                dist = (center[axis] - radius) - size[axis];
                n[axis] = -1.0;
                point[axis] = size[axis] + (dist + padding) * 0.5;
            } else {
                dist = -((center[axis] + radius) + size[axis]);
                n[axis] = 1.0;
                point[axis] = -size[axis] - (dist + padding) * 0.5;
            }
            normal = n;
            if dist > -RESTING_CONTACT_PENETRATION {
                return SphereBoxOutcome::Done(false);
            }
        } else {
            // Edge or corner region: the normal runs from the center to the
            // nearest point of the box on the outside axes.
            let clamped = center.clamp(-size, size);
            let delta = clamped - center;
            let mag2 = delta.length_squared();
            if mag2 < 1.0e-24 {
                return SphereBoxOutcome::Done(false);
            }
            let n = delta * (1.0 / mag2.sqrt());
            dist = n.dot(delta) - radius;
            if dist > -RESTING_CONTACT_PENETRATION {
                return SphereBoxOutcome::Done(false);
            }
            normal = n;
            point += normal * (radius + (dist - padding) * 0.5);
        }

        if is_trigger {
            return SphereBoxOutcome::Done(true);
        }

        let penetration = (dist.abs() - IMPULSIVE_CONTACT_PENETRATION).max(0.0);
        out.push(ContactPoint {
            point: box_matrix.transform_point(point),
            normal: box_matrix.rotate_vector(normal),
            penetration,
            user_id: 0,
            is_edge_contact: false,
        });
        SphereBoxOutcome::Done(false)
    }
}

#[inline(always)]
fn region_code(value: f32, half: f32) -> u32 {
    if value < -half {
        1
    } else if value > half {
        2
    } else {
        0
    }
}
