use glam::Vec3;

use crate::collidables::mesh::RayCastPrefilter;
use crate::collidables::ray::RayCastResult;
use crate::collidables::shape::{ConvexShape, Shape, ShapeKind};
use crate::utilities::matrix::Matrix;

use super::collision_tasks::capsule_pair_tester::{CapsulePairTester, CapsuleSphereTester};
use super::collision_tasks::convex_pair_tester::ConvexPairTester;
use super::collision_tasks::mesh_tester::MeshTester;
use super::collision_tasks::sphere_box_tester::{SphereBoxOutcome, SphereBoxTester};
use super::collision_tasks::sphere_pair_tester::SpherePairTester;
use super::error::CollisionError;
use super::query::CollisionQuery;
use super::scratch::ScratchPool;

/// Narrow-phase entry point. Routes each shape pair to its cheapest capable
/// tester: closed forms for the simple pairs, the Minkowski solver for
/// everything convex, and the per-face pipeline for triangle soups. Owns the
/// per-thread scratch slots; queries from distinct thread indices may run
/// concurrently.
pub struct NarrowPhase {
    scratch: ScratchPool,
}

impl NarrowPhase {
    pub fn new() -> Self {
        Self {
            scratch: ScratchPool::new(),
        }
    }

    /// Runs one contact query and returns the number of contacts written to
    /// `query.contacts`. Trigger overlap and time of impact come back on the
    /// query as well.
    pub fn calculate_contacts(&self, query: &mut CollisionQuery<'_>) -> Result<usize, CollisionError> {
        query.validate()?;
        if query.thread_index >= self.scratch.slot_count() {
            return Err(CollisionError::InvalidThreadIndex(query.thread_index));
        }
        query.contacts.clear();
        query.in_trigger_volume = false;
        query.time_of_impact = None;
        if query.max_contacts == 0 {
            return Ok(0);
        }

        match (query.shape_a, query.shape_b) {
            (Shape::Convex(a), Shape::Convex(b)) => self.convex_pair(query, a, b),
            (Shape::Convex(a), Shape::Mesh(_)) => self.mesh_pair(query, a, false),
            (Shape::Mesh(_), Shape::Convex(b)) => self.mesh_pair(query, b, true),
            (Shape::Mesh(_), Shape::Mesh(_)) => {
                // Soup versus soup never generates contacts; static level
                // geometry does not collide with itself.
                log::debug!("mesh-mesh pair dispatched, reporting no contacts");
                Ok(0)
            }
        }
    }

    fn convex_pair(
        &self,
        query: &mut CollisionQuery<'_>,
        a: &ConvexShape,
        b: &ConvexShape,
    ) -> Result<usize, CollisionError> {
        if query.continue_collision {
            let outcome = ConvexPairTester::test_continue(
                a,
                &query.matrix_a,
                query.velocity_a,
                b,
                &query.matrix_b,
                query.velocity_b,
                query.timestep,
                query.penetration_padding,
                query.is_trigger_volume,
                query.max_contacts,
                &mut query.contacts,
            );
            match outcome {
                Ok(outcome) => {
                    query.in_trigger_volume = outcome.in_trigger;
                    query.time_of_impact = outcome
                        .time_of_impact
                        .map(|t| normalized_impact_time(t, query.timestep));
                }
                Err(error) => {
                    log::debug!("continuous convex pair: {error}");
                }
            }
            return Ok(query.contacts.len());
        }

        let mut swapped = false;
        let in_trigger = match (a.kind(), b.kind()) {
            (ShapeKind::Sphere, ShapeKind::Sphere) => {
                let (ConvexShape::Sphere(sa), ConvexShape::Sphere(sb)) = (a, b) else {
                    unreachable!()
                };
                SpherePairTester::test(
                    sa,
                    &query.matrix_a,
                    sb,
                    &query.matrix_b,
                    query.penetration_padding,
                    query.is_trigger_volume,
                    &mut query.contacts,
                )
            }
            (ShapeKind::Capsule, ShapeKind::Sphere) => {
                let (ConvexShape::Capsule(ca), ConvexShape::Sphere(sb)) = (a, b) else {
                    unreachable!()
                };
                CapsuleSphereTester::test(
                    ca,
                    &query.matrix_a,
                    sb,
                    &query.matrix_b,
                    query.penetration_padding,
                    query.is_trigger_volume,
                    &mut query.contacts,
                )
            }
            (ShapeKind::Sphere, ShapeKind::Capsule) => {
                let (ConvexShape::Sphere(sa), ConvexShape::Capsule(cb)) = (a, b) else {
                    unreachable!()
                };
                swapped = true;
                CapsuleSphereTester::test(
                    cb,
                    &query.matrix_b,
                    sa,
                    &query.matrix_a,
                    query.penetration_padding,
                    query.is_trigger_volume,
                    &mut query.contacts,
                )
            }
            (ShapeKind::Capsule, ShapeKind::Capsule) => {
                let (ConvexShape::Capsule(ca), ConvexShape::Capsule(cb)) = (a, b) else {
                    unreachable!()
                };
                CapsulePairTester::test(
                    ca,
                    &query.matrix_a,
                    cb,
                    &query.matrix_b,
                    query.penetration_padding,
                    query.is_trigger_volume,
                    &mut query.contacts,
                )
            }
            (ShapeKind::Box, ShapeKind::Sphere) => {
                let (ConvexShape::Box(ba), ConvexShape::Sphere(sb)) = (a, b) else {
                    unreachable!()
                };
                match SphereBoxTester::test(
                    ba,
                    &query.matrix_a,
                    sb,
                    &query.matrix_b,
                    query.penetration_padding,
                    query.is_trigger_volume,
                    &mut query.contacts,
                ) {
                    SphereBoxOutcome::Done(in_trigger) => in_trigger,
                    SphereBoxOutcome::DeepCenter => self.general_convex(query, a, b),
                }
            }
            (ShapeKind::Sphere, ShapeKind::Box) => {
                let (ConvexShape::Sphere(sa), ConvexShape::Box(bb)) = (a, b) else {
                    unreachable!()
                };
                swapped = true;
                match SphereBoxTester::test(
                    bb,
                    &query.matrix_b,
                    sa,
                    &query.matrix_a,
                    query.penetration_padding,
                    query.is_trigger_volume,
                    &mut query.contacts,
                ) {
                    SphereBoxOutcome::Done(in_trigger) => in_trigger,
                    SphereBoxOutcome::DeepCenter => {
                        swapped = false;
                        self.general_convex(query, a, b)
                    }
                }
            }
            _ => self.general_convex(query, a, b),
        };

        if swapped {
            for contact in query.contacts.iter_mut() {
                contact.normal = -contact.normal;
            }
        }
        query.in_trigger_volume = in_trigger;
        Ok(query.contacts.len())
    }

    fn general_convex(
        &self,
        query: &mut CollisionQuery<'_>,
        a: &ConvexShape,
        b: &ConvexShape,
    ) -> bool {
        match ConvexPairTester::test(
            a,
            &query.matrix_a,
            b,
            &query.matrix_b,
            query.penetration_padding,
            query.is_trigger_volume,
            query.max_contacts,
            &mut query.contacts,
        ) {
            Ok(in_trigger) => in_trigger,
            Err(error) => {
                log::debug!("convex pair solver: {error}");
                query.contacts.clear();
                false
            }
        }
    }

    fn mesh_pair(
        &self,
        query: &mut CollisionQuery<'_>,
        convex: &ConvexShape,
        swapped: bool,
    ) -> Result<usize, CollisionError> {
        let (convex_matrix, convex_veloc, mesh_matrix, mesh_veloc) = if swapped {
            (query.matrix_b, query.velocity_b, query.matrix_a, query.velocity_a)
        } else {
            (query.matrix_a, query.velocity_a, query.matrix_b, query.velocity_b)
        };
        let mesh_shape = if swapped { query.shape_a } else { query.shape_b };
        let mesh = mesh_shape.as_mesh().expect("mesh operand");
        // One in-flight query per thread index is the caller's contract.
        let scratch = unsafe { self.scratch.scratch(query.thread_index) };

        if query.continue_collision {
            let (time, in_trigger) = MeshTester::test_continue(
                convex,
                &convex_matrix,
                convex_veloc,
                mesh,
                &mesh_matrix,
                mesh_veloc,
                query.timestep,
                query.penetration_padding,
                query.is_trigger_volume,
                query.max_contacts,
                scratch,
                &mut query.contacts,
            );
            query.in_trigger_volume = in_trigger;
            query.time_of_impact = time.map(|t| normalized_impact_time(t, query.timestep));
        } else {
            query.in_trigger_volume = MeshTester::test(
                convex,
                &convex_matrix,
                mesh,
                &mesh_matrix,
                query.penetration_padding,
                query.is_trigger_volume,
                query.max_contacts,
                scratch,
                &mut query.contacts,
            );
        }

        if swapped {
            for contact in query.contacts.iter_mut() {
                contact.normal = -contact.normal;
            }
        }
        Ok(query.contacts.len())
    }

    /// Closest points between two separated convex shapes: the witness point
    /// on each shape and the direction from A's point toward B's. None when
    /// the shapes overlap or the pair has no convex closed distance.
    pub fn closest_points(
        &self,
        shape_a: &Shape,
        matrix_a: &Matrix,
        shape_b: &Shape,
        matrix_b: &Matrix,
    ) -> Result<Option<(Vec3, Vec3, Vec3)>, CollisionError> {
        if !matrix_a.is_rigid() || !matrix_b.is_rigid() {
            return Err(CollisionError::InvalidTransform);
        }
        let (Some(a), Some(b)) = (shape_a.as_convex(), shape_b.as_convex()) else {
            return Ok(None);
        };
        match ConvexPairTester::closest_points(a, matrix_a, b, matrix_b) {
            Ok(result) => Ok(result),
            Err(error) => {
                log::debug!("closest points solver: {error}");
                Ok(None)
            }
        }
    }

    /// World-space segment cast against a placed shape. The prefilter can
    /// reject mesh faces by id before any geometric test; a filter decision
    /// for the whole shape belongs to the caller. Misses report the
    /// [`RAY_CAST_MISS`] sentinel fraction.
    ///
    /// [`RAY_CAST_MISS`]: crate::collidables::ray::RAY_CAST_MISS
    pub fn ray_cast(
        &self,
        shape: &Shape,
        matrix: &Matrix,
        p0: Vec3,
        p1: Vec3,
        prefilter: Option<RayCastPrefilter<'_>>,
    ) -> Result<RayCastResult, CollisionError> {
        if !matrix.is_rigid() || !p0.is_finite() || !p1.is_finite() {
            return Err(CollisionError::InvalidTransform);
        }
        let local_p0 = matrix.untransform_point(p0);
        let local_p1 = matrix.untransform_point(p1);
        let mut result = match shape {
            Shape::Convex(convex) => convex.ray_cast(local_p0, local_p1),
            Shape::Mesh(mesh) => mesh.ray_cast(local_p0, local_p1, prefilter),
        };
        if result.is_hit() {
            result.normal = matrix.rotate_vector(result.normal);
        }
        Ok(result)
    }
}

impl Default for NarrowPhase {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps an absolute impact time to the [0, 1] fraction of the step.
#[inline]
fn normalized_impact_time(time: f32, timestep: f32) -> f32 {
    if timestep > 0.0 {
        (time / timestep).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collidables::box_shape::BoxShape;
    use crate::collidables::sphere::SphereShape;
    use approx::assert_relative_eq;

    #[test]
    fn dispatch_routes_sphere_pair() {
        let narrow_phase = NarrowPhase::new();
        let a = Shape::from(SphereShape::new(1.0));
        let b = Shape::from(SphereShape::new(1.0));
        let mut query = CollisionQuery::new(
            &a,
            Matrix::IDENTITY,
            &b,
            Matrix::from_translation(Vec3::new(1.5, 0.0, 0.0)),
        );
        let count = narrow_phase.calculate_contacts(&mut query).unwrap();
        assert_eq!(count, 1);
        assert_relative_eq!(query.contacts[0].normal, Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn swapped_pair_flips_normals() {
        let narrow_phase = NarrowPhase::new();
        let box_shape = Shape::from(BoxShape::new(2.0, 2.0, 2.0));
        let sphere = Shape::from(SphereShape::new(0.5));

        let mut forward = CollisionQuery::new(
            &box_shape,
            Matrix::IDENTITY,
            &sphere,
            Matrix::from_translation(Vec3::new(1.2, 0.0, 0.0)),
        );
        narrow_phase.calculate_contacts(&mut forward).unwrap();

        let mut swapped = CollisionQuery::new(
            &sphere,
            Matrix::from_translation(Vec3::new(1.2, 0.0, 0.0)),
            &box_shape,
            Matrix::IDENTITY,
        );
        narrow_phase.calculate_contacts(&mut swapped).unwrap();

        assert_eq!(forward.contacts.len(), 1);
        assert_eq!(swapped.contacts.len(), 1);
        assert_relative_eq!(
            forward.contacts[0].normal,
            -swapped.contacts[0].normal,
            epsilon = 1.0e-6
        );
        assert_relative_eq!(
            forward.contacts[0].point,
            swapped.contacts[0].point,
            epsilon = 1.0e-5
        );
    }

    #[test]
    fn invalid_thread_index_is_rejected() {
        let narrow_phase = NarrowPhase::new();
        let a = Shape::from(SphereShape::new(1.0));
        let b = Shape::from(SphereShape::new(1.0));
        let mut query = CollisionQuery::new(&a, Matrix::IDENTITY, &b, Matrix::IDENTITY);
        query.thread_index = 1024;
        assert_eq!(
            narrow_phase.calculate_contacts(&mut query),
            Err(CollisionError::InvalidThreadIndex(1024))
        );
    }

    #[test]
    fn ray_cast_through_world_transform() {
        let narrow_phase = NarrowPhase::new();
        let shape = Shape::from(SphereShape::new(1.0));
        let matrix = Matrix::from_translation(Vec3::new(0.0, 5.0, 0.0));
        let result = narrow_phase
            .ray_cast(
                &shape,
                &matrix,
                Vec3::new(0.0, 8.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
                None,
            )
            .unwrap();
        assert!(result.is_hit());
        assert_relative_eq!(result.t, 2.0 / 6.0, epsilon = 1.0e-5);
        assert_relative_eq!(result.normal, Vec3::Y, epsilon = 1.0e-5);
    }
}
