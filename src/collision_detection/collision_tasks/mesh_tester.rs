use glam::Vec3;

use crate::collidables::convex_polygon::ConvexPolygon;
use crate::collidables::mesh::MeshShape;
use crate::collidables::shape::ConvexShape;
use crate::collision_detection::contact::{
    filter_polygon_edge_contacts, reduce_contacts, ContactPoint,
};
use crate::collision_detection::contact_solver::{ContactSolver, ConvexRef};
use crate::collision_detection::scratch::ThreadScratch;
use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::matrix::Matrix;

/// Contact accumulation across many faces re-reduces once this many pile up.
const REDUCE_BATCH: usize = 24;

/// Faces whose impact time lands within this window of the best one still
/// contribute contacts.
const CONTINUE_TIME_SLACK: f32 = 1.0e-4;

/// Pair tester for a convex shape against a triangle soup. Each candidate
/// face becomes a transient polygon view and runs through the same contact
/// solver as a real convex shape.
pub struct MeshTester;

impl MeshTester {
    #[allow(clippy::too_many_arguments)]
    pub fn test(
        shape: &ConvexShape,
        shape_matrix: &Matrix,
        mesh: &MeshShape,
        mesh_matrix: &Matrix,
        padding: f32,
        is_trigger: bool,
        max_contacts: usize,
        scratch: &mut ThreadScratch,
        out: &mut Vec<ContactPoint>,
    ) -> bool {
        out.clear();
        let local_matrix = shape_matrix.relative_to(mesh_matrix);
        let shape_in_mesh = mesh_matrix.relative_to(shape_matrix);
        collect_candidate_faces(shape, &shape_in_mesh, Vec3::ZERO, 0.0, mesh, scratch);

        let clip_size = shape_clip_size(shape);
        let mut in_trigger = false;
        let mut since_reduce = 0usize;

        let faces = std::mem::take(&mut scratch.faces);
        let mut face_contacts: Vec<ContactPoint> = Vec::new();
        for &face in &faces {
            if out.len() >= max_contacts {
                break;
            }
            let polygon = &mut scratch.polygon;
            polygon.set_from_face(mesh, face as usize);
            if !polygon.quick_test(shape, &local_matrix, padding) {
                continue;
            }
            beam_clip_if_oversized(polygon, &shape_in_mesh, clip_size);

            let polygon = &scratch.polygon;
            let mut solver = ContactSolver::with_local_matrix(
                ConvexRef::Shape(shape),
                ConvexRef::Polygon(polygon),
                shape_matrix,
                local_matrix,
                padding,
            );
            let count_left = max_contacts - out.len();
            match solver.hull_hull_contacts(
                polygon.face_id,
                is_trigger,
                count_left,
                &mut face_contacts,
            ) {
                Ok(trigger_hit) => in_trigger |= trigger_hit,
                Err(error) => {
                    log::debug!("mesh face {face}: {error}");
                    continue;
                }
            }
            if face_contacts.is_empty() {
                continue;
            }
            polygon.clip_contacts(&mut face_contacts, mesh_matrix);
            since_reduce += face_contacts.len();
            out.append(&mut face_contacts);
            if since_reduce > REDUCE_BATCH {
                reduce_contacts(out, (max_contacts / 4).max(4));
                since_reduce = 0;
            }
        }
        scratch.faces = faces;

        filter_polygon_edge_contacts(out);
        reduce_contacts(out, max_contacts);
        in_trigger
    }

    /// Continuous convex-versus-soup query. The sphere case uses the
    /// closed-form moving point contact; other shapes sweep the solver
    /// against each candidate face. Returns the earliest impact time.
    #[allow(clippy::too_many_arguments)]
    pub fn test_continue(
        shape: &ConvexShape,
        shape_matrix: &Matrix,
        shape_veloc: Vec3,
        mesh: &MeshShape,
        mesh_matrix: &Matrix,
        mesh_veloc: Vec3,
        timestep: f32,
        padding: f32,
        is_trigger: bool,
        max_contacts: usize,
        scratch: &mut ThreadScratch,
        out: &mut Vec<ContactPoint>,
    ) -> (Option<f32>, bool) {
        out.clear();
        let shape_in_mesh = mesh_matrix.relative_to(shape_matrix);
        let veloc_in_mesh = mesh_matrix.unrotate_vector(shape_veloc - mesh_veloc);
        collect_candidate_faces(
            shape,
            &shape_in_mesh,
            veloc_in_mesh,
            timestep,
            mesh,
            scratch,
        );

        if let ConvexShape::Sphere(sphere) = shape {
            let faces = std::mem::take(&mut scratch.faces);
            let mut best_time: Option<f32> = None;
            let mut in_trigger = false;
            for &face in &faces {
                scratch.polygon.set_from_face(mesh, face as usize);
                let polygon = &scratch.polygon;
                let Some((time, contact)) = polygon.moving_point_to_polygon_contact(
                    shape_in_mesh.position,
                    veloc_in_mesh,
                    sphere.radius,
                    timestep,
                ) else {
                    continue;
                };
                if best_time.map_or(false, |best| time > best + CONTINUE_TIME_SLACK) {
                    continue;
                }
                if best_time.map_or(true, |best| time < best - CONTINUE_TIME_SLACK) {
                    out.clear();
                }
                best_time = Some(best_time.map_or(time, |best| best.min(time)));
                if is_trigger {
                    in_trigger = true;
                    continue;
                }
                let mut contacts = [contact];
                polygon.clip_contacts(&mut contacts, mesh_matrix);
                let mut contact = contacts[0];
                contact.point =
                    mesh_matrix.transform_point(contact.point) + mesh_veloc * time;
                contact.normal = mesh_matrix.rotate_vector(contact.normal);
                out.push(contact);
            }
            scratch.faces = faces;
            filter_polygon_edge_contacts(out);
            reduce_contacts(out, max_contacts);
            return (best_time, in_trigger);
        }

        let local_matrix = shape_matrix.relative_to(mesh_matrix);
        let faces = std::mem::take(&mut scratch.faces);
        let mut best_time: Option<f32> = None;
        let mut in_trigger = false;
        let mut face_contacts: Vec<ContactPoint> = Vec::new();
        for &face in &faces {
            let polygon = &mut scratch.polygon;
            polygon.set_from_face(mesh, face as usize);
            let local_rel = shape_matrix.unrotate_vector(mesh_veloc - shape_veloc);
            if !polygon.quick_test_continue(shape, &local_matrix, local_rel, timestep, padding) {
                continue;
            }

            let polygon = &scratch.polygon;
            let mut solver = ContactSolver::with_local_matrix(
                ConvexRef::Shape(shape),
                ConvexRef::Polygon(polygon),
                shape_matrix,
                local_matrix,
                padding,
            );
            solver.calculate_velocities(shape_veloc, mesh_veloc);
            let outcome = match solver.hull_hull_continue_contacts(
                timestep,
                polygon.face_id,
                is_trigger,
                max_contacts,
                &mut face_contacts,
            ) {
                Ok(outcome) => outcome,
                Err(error) => {
                    log::debug!("mesh face {face}: {error}");
                    continue;
                }
            };
            in_trigger |= outcome.in_trigger;
            let Some(time) = outcome.time_of_impact else {
                continue;
            };
            if best_time.map_or(false, |best| time > best + CONTINUE_TIME_SLACK) {
                continue;
            }
            if best_time.map_or(true, |best| time < best - CONTINUE_TIME_SLACK) {
                out.clear();
            }
            best_time = Some(best_time.map_or(time, |best| best.min(time)));
            polygon.clip_contacts(&mut face_contacts, mesh_matrix);
            out.append(&mut face_contacts);
        }
        scratch.faces = faces;

        filter_polygon_edge_contacts(out);
        reduce_contacts(out, max_contacts);
        (best_time, in_trigger)
    }
}

/// Mesh faces overlapping the shape's bounds in mesh-local space, swept by
/// the relative motion for continuous queries.
fn collect_candidate_faces(
    shape: &ConvexShape,
    shape_in_mesh: &Matrix,
    veloc_in_mesh: Vec3,
    timestep: f32,
    mesh: &MeshShape,
    scratch: &mut ThreadScratch,
) {
    let aabb = shape.calc_aabb(shape_in_mesh);
    let sweep = veloc_in_mesh * timestep;
    let swept = BoundingBox::new(aabb.min.min(aabb.min + sweep), aabb.max.max(aabb.max + sweep));
    mesh.collect_faces(&swept, &mut scratch.faces);
}

/// Faces much larger than the shape get clipped to a bounded beam around the
/// shape's footprint before the solver sees them.
fn beam_clip_if_oversized(polygon: &mut ConvexPolygon, shape_in_mesh: &Matrix, clip_size: f32) {
    let origin = polygon.vertices[0];
    let face_size = polygon
        .vertices
        .iter()
        .map(|v| (*v - origin).length())
        .fold(0.0, f32::max);
    if face_size > clip_size {
        let center = shape_in_mesh.position
            - polygon.normal * polygon.normal.dot(shape_in_mesh.position - origin);
        polygon.beam_clipping(center, clip_size);
    }
}

fn shape_clip_size(shape: &ConvexShape) -> f32 {
    (shape.max_radius() * 4.0 + 1.0).max(32.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collidables::box_shape::BoxShape;
    use crate::collidables::capsule::CapsuleShape;
    use crate::collidables::sphere::SphereShape;
    use approx::assert_relative_eq;

    // A 2x2 ground quad in the xz plane made of two triangles, normals +y.
    fn ground_mesh() -> MeshShape {
        MeshShape::new(
            vec![
                Vec3::new(-2.0, 0.0, -2.0),
                Vec3::new(-2.0, 0.0, 2.0),
                Vec3::new(2.0, 0.0, 2.0),
                Vec3::new(2.0, 0.0, -2.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn sphere_resting_on_ground_mesh() {
        let shape = ConvexShape::Sphere(SphereShape::new(0.5));
        let mesh = ground_mesh();
        let mut scratch = ThreadScratch::default();
        let mut out = Vec::new();
        let in_trigger = MeshTester::test(
            &shape,
            &Matrix::from_translation(Vec3::new(0.5, 0.4, 0.5)),
            &mesh,
            &Matrix::IDENTITY,
            0.0,
            false,
            16,
            &mut scratch,
            &mut out,
        );
        assert!(!in_trigger);
        assert!(!out.is_empty());
        for contact in &out {
            assert_relative_eq!(contact.normal, Vec3::Y, epsilon = 5.0e-2);
            assert!(contact.penetration >= 0.0);
            // The contact sits on the mid-surface between sphere and face.
            assert_relative_eq!(contact.point.y, 0.0, epsilon = 1.0e-1);
        }
    }

    #[test]
    fn box_on_mesh_seam_keeps_single_surface() {
        let shape = ConvexShape::Box(BoxShape::new(1.0, 1.0, 1.0));
        let mesh = ground_mesh();
        let mut scratch = ThreadScratch::default();
        let mut out = Vec::new();
        // Centered over the shared diagonal edge, slightly sunk in.
        MeshTester::test(
            &shape,
            &Matrix::from_translation(Vec3::new(0.0, 0.45, 0.0)),
            &mesh,
            &Matrix::IDENTITY,
            0.0,
            false,
            16,
            &mut scratch,
            &mut out,
        );
        assert!(!out.is_empty());
        for contact in &out {
            // Both faces are coplanar; every surviving contact must agree on
            // the up normal regardless of which triangle produced it.
            assert_relative_eq!(contact.normal, Vec3::Y, epsilon = 5.0e-2);
        }
    }

    #[test]
    fn capsule_across_edge_blends_normal() {
        // A long thin capsule lying across the border edge of a single
        // triangle pair, edge-on: contacts flagged as edge contacts with the
        // blended (coplanar) normal.
        let shape = ConvexShape::Capsule(CapsuleShape::new(0.25, 6.0));
        let mesh = ground_mesh();
        let mut scratch = ThreadScratch::default();
        let mut out = Vec::new();
        MeshTester::test(
            &shape,
            &Matrix::from_translation(Vec3::new(0.0, 0.2, 0.0)),
            &mesh,
            &Matrix::IDENTITY,
            0.0,
            false,
            16,
            &mut scratch,
            &mut out,
        );
        assert!(!out.is_empty());
        for contact in &out {
            assert_relative_eq!(contact.normal, Vec3::Y, epsilon = 5.0e-2);
        }
    }

    #[test]
    fn trigger_mesh_query_reports_overlap() {
        let shape = ConvexShape::Sphere(SphereShape::new(0.5));
        let mesh = ground_mesh();
        let mut scratch = ThreadScratch::default();
        let mut out = Vec::new();
        let in_trigger = MeshTester::test(
            &shape,
            &Matrix::from_translation(Vec3::new(0.0, 0.25, 0.0)),
            &mesh,
            &Matrix::IDENTITY,
            0.0,
            true,
            16,
            &mut scratch,
            &mut out,
        );
        assert!(in_trigger);
        assert!(out.is_empty());
    }

    #[test]
    fn moving_sphere_hits_mesh_within_step() {
        let shape = ConvexShape::Sphere(SphereShape::new(0.5));
        let mesh = ground_mesh();
        let mut scratch = ThreadScratch::default();
        let mut out = Vec::new();
        let (time, in_trigger) = MeshTester::test_continue(
            &shape,
            &Matrix::from_translation(Vec3::new(0.0, 2.0, 0.0)),
            Vec3::new(0.0, -10.0, 0.0),
            &mesh,
            &Matrix::IDENTITY,
            Vec3::ZERO,
            0.5,
            0.0,
            false,
            4,
            &mut scratch,
            &mut out,
        );
        assert!(!in_trigger);
        let time = time.expect("sphere lands inside the step");
        assert_relative_eq!(time, 0.15, epsilon = 1.0e-3);
        assert!(!out.is_empty());
        assert_relative_eq!(out[0].normal, Vec3::Y, epsilon = 1.0e-4);
        assert_relative_eq!(out[0].point.y, 0.0, epsilon = 1.0e-3);
    }

    #[test]
    fn separated_sphere_mesh_is_empty() {
        let shape = ConvexShape::Sphere(SphereShape::new(0.5));
        let mesh = ground_mesh();
        let mut scratch = ThreadScratch::default();
        let mut out = Vec::new();
        MeshTester::test(
            &shape,
            &Matrix::from_translation(Vec3::new(0.0, 3.0, 0.0)),
            &mesh,
            &Matrix::IDENTITY,
            0.0,
            false,
            16,
            &mut scratch,
            &mut out,
        );
        assert!(out.is_empty());
    }
}
