use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::utilities::plane::Plane;

use super::{
    ClipFace, ContactSolver, IMPULSIVE_CONTACT_PENETRATION, MINK_MAX_FACES, MINK_MAX_POINTS,
};

/// Improvement threshold ending the expansion: once no support point
/// advances the best face by more than this, the face is the answer.
const EXPANSION_TOLERANCE: f32 = IMPULSIVE_CONTACT_PENETRATION / 16.0;

struct EpaFace {
    vertices: [u16; 3],
    plane: Plane,
    alive: bool,
}

/// Heap entry keyed by the face plane offset. Offsets are negative for a
/// polytope enclosing the origin, so the max-heap surfaces the face closest
/// to the origin.
struct HeapEntry {
    offset: f32,
    face: u16,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset
    }
}
impl Eq for HeapEntry {}
impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.offset.total_cmp(&other.offset)
    }
}

impl<'a> ContactSolver<'a> {
    /// Expands the terminal simplex into a polytope of the Minkowski
    /// difference until the face nearest the origin stops improving, and
    /// returns that face as the contact plane. Requires the origin to be
    /// enclosed by the first four hull vertices. Budget overflow freezes on
    /// the best face found rather than running on.
    pub(crate) fn calculate_clip_plane(&mut self) -> Option<ClipFace> {
        debug_assert!(self.vertex_index == 4);

        let mut faces: Vec<EpaFace> = Vec::with_capacity(64);
        let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(64);

        for row in &self.tables.face_index {
            let vertices = [row[0] as u16, row[1] as u16, row[2] as u16];
            push_face(&mut faces, &mut heap, self, vertices);
        }

        let mut cycling_mem = [f32::MAX; 4];
        let mut cycling = 0usize;

        while let Some(entry) = heap.pop() {
            let face_id = entry.face as usize;
            if !faces[face_id].alive {
                continue;
            }
            let plane = faces[face_id].plane;
            let clip_face = ClipFace {
                plane,
                vertices: [
                    faces[face_id].vertices[0] as usize,
                    faces[face_id].vertices[1] as usize,
                    faces[face_id].vertices[2] as usize,
                ],
            };

            if self.vertex_index >= MINK_MAX_POINTS || faces.len() >= MINK_MAX_FACES - 4 {
                // Out of budget; the current face is the best known answer.
                log::debug!(
                    "polytope expansion budget exhausted ({} vertices, {} faces)",
                    self.vertex_index,
                    faces.len()
                );
                return Some(clip_face);
            }

            let entry_index = self.vertex_index;
            self.calc_support_vertex(plane.normal, entry_index);
            let p = self.hull[entry_index];
            self.vertex_index += 1;
            let mut dist = plane.evaluate(p);

            // A flat-lining support distance means round-off is feeding the
            // same points back; accept the face.
            cycling_mem[cycling] = dist;
            cycling = (cycling + 1) & 3;
            if cycling_mem
                .iter()
                .all(|d| (dist - d).abs() < 1.0e-6)
            {
                dist = 0.0;
            }

            if dist < EXPANSION_TOLERANCE {
                return Some(clip_face);
            }

            // Carve out every face visible from the new point and stitch the
            // silhouette boundary to it.
            let mut boundary: Vec<(u16, u16)> = Vec::new();
            for face in faces.iter_mut() {
                if face.alive && face.plane.evaluate(p) > 0.0 {
                    face.alive = false;
                    let [a, b, c] = face.vertices;
                    toggle_boundary_edge(&mut boundary, a, b);
                    toggle_boundary_edge(&mut boundary, b, c);
                    toggle_boundary_edge(&mut boundary, c, a);
                }
            }
            if boundary.is_empty() {
                // The new point did not see past its own face; the polytope
                // cannot grow here.
                return Some(clip_face);
            }
            let new_vertex = entry_index as u16;
            for (a, b) in boundary {
                push_face(&mut faces, &mut heap, self, [a, b, new_vertex]);
            }
        }

        // The heap drained without converging; there is no usable face.
        log::debug!("polytope expansion exhausted its face heap");
        None
    }
}

/// Directed silhouette-edge bookkeeping: an edge shared by two dead faces
/// appears in both directions and cancels; a boundary edge survives once.
fn toggle_boundary_edge(boundary: &mut Vec<(u16, u16)>, a: u16, b: u16) {
    if let Some(pos) = boundary.iter().position(|&(x, y)| x == b && y == a) {
        boundary.swap_remove(pos);
    } else {
        boundary.push((a, b));
    }
}

fn push_face(
    faces: &mut Vec<EpaFace>,
    heap: &mut BinaryHeap<HeapEntry>,
    solver: &ContactSolver<'_>,
    vertices: [u16; 3],
) {
    let face_id = faces.len() as u16;
    match Plane::try_from_points(
        solver.hull[vertices[0] as usize],
        solver.hull[vertices[1] as usize],
        solver.hull[vertices[2] as usize],
    ) {
        Some(plane) => {
            heap.push(HeapEntry {
                offset: plane.offset,
                face: face_id,
            });
            faces.push(EpaFace {
                vertices,
                plane,
                alive: true,
            });
        }
        None => {
            // Zero-area face: kept alive so the silhouette stays closed, but
            // never expanded. The inactive plane can never see a point.
            faces.push(EpaFace {
                vertices,
                plane: Plane::new(glam::Vec3::ZERO, 0.0),
                alive: true,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collidables::box_shape::BoxShape;
    use crate::collidables::shape::ConvexShape;
    use crate::collidables::sphere::SphereShape;
    use crate::collision_detection::contact_solver::{ConvexRef, GjkResult};
    use crate::utilities::matrix::Matrix;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn penetration_face(a: &ConvexShape, b: &ConvexShape, offset: Vec3) -> ClipFace {
        let mut solver = ContactSolver::new(
            ConvexRef::Shape(a),
            ConvexRef::Shape(b),
            &Matrix::IDENTITY,
            &Matrix::from_translation(offset),
            0.0,
        );
        assert_eq!(
            solver.calc_separating_plane().unwrap(),
            GjkResult::Intersecting
        );
        solver.calculate_clip_plane().expect("penetrating pair")
    }

    #[test]
    fn sphere_pair_penetration_depth() {
        let a = ConvexShape::Sphere(SphereShape::new(1.0));
        let b = ConvexShape::Sphere(SphereShape::new(1.0));
        let face = penetration_face(&a, &b, Vec3::new(1.5, 0.0, 0.0));
        // Overlap of 0.5 along +x: the closest hull face sits at x = 0.5
        // with an outward +x normal, so the offset is about -0.5.
        assert_relative_eq!(face.plane.normal.x, 1.0, epsilon = 0.05);
        assert_relative_eq!(face.plane.offset, -0.5, epsilon = 0.05);
    }

    #[test]
    fn box_sphere_penetration_depth() {
        let a = ConvexShape::Box(BoxShape::new(2.0, 2.0, 2.0));
        let b = ConvexShape::Sphere(SphereShape::new(0.5));
        let face = penetration_face(&a, &b, Vec3::new(1.2, 0.0, 0.0));
        assert_relative_eq!(face.plane.normal.x, 1.0, epsilon = 0.05);
        assert_relative_eq!(face.plane.offset, -0.3, epsilon = 0.05);
    }

    #[test]
    fn deep_box_pair_terminates_within_budget() {
        let a = ConvexShape::Box(BoxShape::new(2.0, 2.0, 2.0));
        let b = ConvexShape::Box(BoxShape::new(2.0, 2.0, 2.0));
        let face = penetration_face(&a, &b, Vec3::new(0.1, 0.05, 0.0));
        // Nearly centered overlap: the minimum escape is about one full
        // extent minus the offset.
        assert!(face.plane.offset < -1.0);
        assert!(face.plane.offset > -2.1);
    }
}
