use glam::Vec3;

use crate::collision_detection::contact::{reduce_contacts, ContactPoint};
use crate::utilities::math_helper::{segment_to_segment, DENOMINATOR_GUARD};
use crate::utilities::plane::Plane;

use super::{
    ClipFace, ContactSolver, GjkResult, MinkError, DISTANCE_TOLERANCE,
    IMPULSIVE_CONTACT_PENETRATION, ROBUST_PLANE_CLIP,
};

/// At most this many contacts come out of the general polygon clipper.
const MAX_CLIPPED_CONTACTS: usize = 8;

struct Section {
    points: Vec<Vec3>,
    is_edge: bool,
}

impl<'a> ContactSolver<'a> {
    /// Discrete contact generation. Returns true when a trigger volume
    /// overlap was detected (contacts suppressed).
    pub(crate) fn hull_hull_contacts(
        &mut self,
        contact_id: u32,
        is_trigger: bool,
        max_contacts: usize,
        out: &mut Vec<ContactPoint>,
    ) -> Result<bool, MinkError> {
        out.clear();
        match self.calc_separating_plane()? {
            GjkResult::Intersecting => {
                if is_trigger {
                    return Ok(true);
                }
                if let Some(face) = self.calculate_clip_plane() {
                    self.calculate_contacts(&face, contact_id, max_contacts, out);
                }
                Ok(false)
            }
            GjkResult::Disjoint(row) => {
                let idx = self.tables.face_index[row];
                let Some(plane) =
                    Plane::try_from_points(self.hull[idx[0]], self.hull[idx[1]], self.hull[idx[2]])
                else {
                    return Ok(false);
                };
                // Separated, but near enough that the padding shell counts
                // as contact: translate the floating shape onto the surface
                // and clip as if touching.
                if plane.offset < self.penetration_padding {
                    let step = plane.normal * -(plane.offset + IMPULSIVE_CONTACT_PENETRATION);
                    self.hull[idx[0]] -= step;
                    self.aver[idx[0]] += step;
                    self.matrix.position += step;
                    let step_world = self.reference_matrix.rotate_vector(step);

                    let face = ClipFace {
                        plane,
                        vertices: [idx[0], idx[1], idx[2]],
                    };
                    self.calculate_contacts(&face, contact_id, max_contacts, out);

                    if is_trigger {
                        out.clear();
                        return Ok(true);
                    }
                    let half_step = step_world * 0.5;
                    for contact in out.iter_mut() {
                        contact.point -= half_step;
                    }
                }
                Ok(false)
            }
        }
    }

    /// Builds the contact manifold for the winning face plane: clips both
    /// shapes at the mid contact plane and intersects the two section
    /// polygons. Vertex and edge sections short-circuit to closed forms.
    pub(crate) fn calculate_contacts(
        &mut self,
        face: &ClipFace,
        contact_id: u32,
        max_contacts: usize,
        out: &mut Vec<ContactPoint>,
    ) {
        out.clear();
        if max_contacts == 0 {
            return;
        }
        let plane = face.plane;
        let penetration = plane.offset - self.penetration_padding;
        let dist = (-(penetration + IMPULSIVE_CONTACT_PENETRATION)).max(0.0);

        // The contact patch lives on the mid-surface between the two shapes.
        let mid = plane.normal.dot(self.aver[face.vertices[0]]) * 0.5;
        let clip_normal = -plane.normal;
        let clip_point = plane.normal * mid;

        let section1 = self.reference_section(clip_normal, clip_point, false);
        if section1.points.is_empty() {
            return;
        }
        let section2 = self.floating_section(clip_normal, clip_point, false);
        if section2.points.is_empty() {
            return;
        }

        let reference_matrix = self.reference_matrix;
        let world_normal = reference_matrix.rotate_vector(clip_normal);
        let is_edge = section1.is_edge || section2.is_edge;
        let mut emit = move |point: Vec3, out: &mut Vec<ContactPoint>| {
            out.push(ContactPoint {
                point: reference_matrix.transform_point(point),
                normal: world_normal,
                penetration: dist,
                user_id: contact_id,
                is_edge_contact: is_edge,
            });
        };

        let count1 = section1.points.len();
        let count2 = section2.points.len();
        if count1 == 1 {
            emit(section1.points[0], out);
        } else if count2 == 1 {
            emit(section2.points[0], out);
        } else if count1 == 2 && count2 == 2 {
            two_edge_contacts(
                section1.points[0],
                section1.points[1],
                section2.points[0],
                section2.points[1],
                &mut |p| emit(p, out),
            );
        } else {
            let mut points = Vec::new();
            calculate_convex_shape_intersection(
                clip_normal,
                &section1.points,
                &section2.points,
                &mut points,
            );
            if points.is_empty() {
                // Numerical failure of the direct clip; redo both sections
                // through the support-seeded path and clip again.
                let section1 = self.reference_section(clip_normal, clip_point, true);
                let section2 = self.floating_section(clip_normal, clip_point, true);
                if !section1.points.is_empty() && !section2.points.is_empty() {
                    calculate_convex_shape_intersection(
                        clip_normal,
                        &section1.points,
                        &section2.points,
                        &mut points,
                    );
                }
            }
            for p in points {
                emit(p, out);
            }
        }

        reduce_contacts(out, max_contacts.min(MAX_CLIPPED_CONTACTS));
    }

    /// Cross-section of the reference shape at the clip plane, in reference
    /// local space. When the direct section comes back empty (or `force` is
    /// set), the plane is re-seeded from the deepest support point and the
    /// section is slid back onto the true clip plane.
    fn reference_section(&self, clip_normal: Vec3, clip_point: Vec3, force: bool) -> Section {
        let reference = self.reference;
        let mut points = Vec::new();
        let mut is_edge = false;
        if !force {
            is_edge = reference.calculate_plane_intersection(clip_normal, clip_point, &mut points);
        }
        if points.is_empty() {
            let support = reference.support_vertex(-clip_normal);
            let seeded = support + clip_normal * ROBUST_PLANE_CLIP;
            is_edge = reference.calculate_plane_intersection(clip_normal, seeded, &mut points);
            let err = clip_normal * clip_normal.dot(clip_point - seeded);
            for p in points.iter_mut() {
                *p += err;
            }
        }
        Section { points, is_edge }
    }

    /// Cross-section of the floating shape, computed in its own frame and
    /// mapped back into reference local space.
    fn floating_section(&self, clip_normal: Vec3, clip_point: Vec3, force: bool) -> Section {
        let floating = self.floating;
        let clip_plane = self
            .matrix
            .untransform_plane(&Plane::from_point_normal(clip_normal, clip_point));
        let local_point = clip_plane.point_on_plane();

        let mut points = Vec::new();
        let mut is_edge = false;
        if !force {
            is_edge =
                floating.calculate_plane_intersection(clip_plane.normal, local_point, &mut points);
        }
        if points.is_empty() {
            let support = floating.support_vertex(-clip_plane.normal);
            let seeded = support + clip_plane.normal * ROBUST_PLANE_CLIP;
            is_edge = floating.calculate_plane_intersection(clip_plane.normal, seeded, &mut points);
            let err = clip_plane.normal * clip_plane.normal.dot(local_point - seeded);
            for p in points.iter_mut() {
                *p += err;
            }
        }
        for p in points.iter_mut() {
            *p = self.matrix.transform_point(*p);
        }
        Section { points, is_edge }
    }

    /// Witness points of a separated pair. Returns the world-space closest
    /// point on each shape and the direction from A's point toward B's, or
    /// None when the shapes intersect.
    pub(crate) fn calculate_closest_points(&mut self) -> Result<Option<(Vec3, Vec3, Vec3)>, MinkError> {
        let GjkResult::Disjoint(row) = self.calc_separating_plane()? else {
            return Ok(None);
        };

        // Restart the descent from the separating face triangle.
        let idx = self.tables.face_index[row];
        let hull = [self.hull[idx[0]], self.hull[idx[1]], self.hull[idx[2]]];
        let aver = [self.aver[idx[0]], self.aver[idx[1]], self.aver[idx[2]]];
        for i in 0..3 {
            self.hull[i] = hull[i];
            self.aver[i] = aver[i];
        }
        self.vertex_index = 3;

        let origin = Vec3::ZERO;
        let mut dir0 = Vec3::ZERO;
        let mut v = self.reduce_triangle(origin);
        for _ in 0..32 {
            if self.vertex_index >= 4 {
                break;
            }
            let dist2 = v.length_squared();
            let mut dir = dir0;
            let mut dist = 0.0;
            if dist2 > 1.0e-12 {
                dir = v * -(1.0 / dist2.sqrt());
                if dir0.dot(dir) < 0.9995 {
                    self.calc_support_vertex(dir, self.vertex_index);
                    let w = self.hull[self.vertex_index];
                    dist = dir.dot(w - v);
                }
            }
            dir0 = dir;

            if dist < DISTANCE_TOLERANCE * 0.5 {
                let (contact_a, contact_b) = self.witness_points(origin);
                let point_a = self
                    .reference_matrix
                    .transform_point(contact_a * 0.5);
                let point_b = self
                    .reference_matrix
                    .transform_point(contact_b * 0.5);
                let normal = self.reference_matrix.rotate_vector(dir);
                return Ok(Some((point_a, point_b, normal)));
            }

            self.vertex_index += 1;
            v = match self.vertex_index {
                2 => self.reduce_line(origin),
                3 => self.reduce_triangle(origin),
                _ => self.reduce_tetrahedron(origin),
            };
        }
        Ok(None)
    }

    /// Reconstructs the two shape-space witness points from the reduced
    /// simplex, as unhalved sums (`a + b ± (a - b)`).
    fn witness_points(&self, origin: Vec3) -> (Vec3, Vec3) {
        match self.vertex_index {
            1 => (
                self.hull[0] + self.aver[0],
                self.aver[0] - self.hull[0],
            ),
            2 => {
                let dp = self.hull[1] - self.hull[0];
                let alpha1 = -(self.hull[0] - origin).dot(dp) / (dp.dot(dp) + DENOMINATOR_GUARD);
                let alpha1 = alpha1.clamp(0.0, 1.0);
                let alpha0 = 1.0 - alpha1;
                (
                    (self.hull[0] + self.aver[0]) * alpha0 + (self.hull[1] + self.aver[1]) * alpha1,
                    (self.aver[0] - self.hull[0]) * alpha0 + (self.aver[1] - self.hull[1]) * alpha1,
                )
            }
            _ => {
                let p0 = self.hull[0];
                let p10 = self.hull[1] - p0;
                let p20 = self.hull[2] - p0;
                let a11 = p10.dot(p10);
                let a22 = p20.dot(p20);
                let a21 = p10.dot(p20);
                let b1 = -p10.dot(p0 - origin);
                let b2 = -p20.dot(p0 - origin);
                let den = a11 * a22 - a21 * a21;
                let (alpha0, alpha1, alpha2);
                if den > 1.0e-7 {
                    let inv = 1.0 / den;
                    alpha1 = (b1 * a22 - a21 * b2) * inv;
                    alpha2 = (a11 * b2 - b1 * a21) * inv;
                    alpha0 = 1.0 - alpha1 - alpha2;
                } else {
                    alpha0 = 0.33;
                    alpha1 = 0.33;
                    alpha2 = 0.33;
                }
                (
                    (self.hull[0] + self.aver[0]) * alpha0
                        + (self.hull[1] + self.aver[1]) * alpha1
                        + (self.hull[2] + self.aver[2]) * alpha2,
                    (self.aver[0] - self.hull[0]) * alpha0
                        + (self.aver[1] - self.hull[1]) * alpha1
                        + (self.aver[2] - self.hull[2]) * alpha2,
                )
            }
        }
    }
}

/// The 2x2 case: both sections are segments. Nearly parallel segments clip
/// to their shared interval and produce two contacts; crossing segments
/// produce one at the mutual closest point.
fn two_edge_contacts(
    p0: Vec3,
    p1: Vec3,
    q0: Vec3,
    q1: Vec3,
    emit: &mut dyn FnMut(Vec3),
) {
    let mut p0 = p0;
    let mut p1 = p1;
    let p10 = (p1 - p0) * (1.0 / ((p1 - p0).length_squared() + 1.0e-8).sqrt());
    let q10 = (q1 - q0) * (1.0 / ((q1 - q0).length_squared() + 1.0e-8).sqrt());
    let dot = q10.dot(p10);
    if dot.abs() > 0.998 {
        let mut dir = p10;
        let mut pl0 = p0.dot(dir);
        let mut pl1 = p1.dot(dir);
        let mut ql0 = q0.dot(dir);
        let mut ql1 = q1.dot(dir);
        if pl0 > pl1 {
            std::mem::swap(&mut pl0, &mut pl1);
            std::mem::swap(&mut p0, &mut p1);
            dir = -dir;
        }
        if ql0 > ql1 {
            std::mem::swap(&mut ql0, &mut ql1);
        }
        if !(ql0 > pl1 || ql1 < pl0) {
            let clip0 = ql0.max(pl0);
            let clip1 = ql1.min(pl1);
            emit(p0 + dir * (clip0 - pl0));
            emit(p0 + dir * (clip1 - pl0));
        }
    } else {
        let (c0, c1) = segment_to_segment(p0, p1, q0, q1);
        emit((c0 + c1) * 0.5);
    }
}

/// Sutherland-Hodgman intersection of two section polygons lying on the clip
/// plane, both wound counterclockwise about `clip_normal`. Segments are
/// clipped against the polygon; two polygons clip area against area.
fn calculate_convex_shape_intersection(
    clip_normal: Vec3,
    shape1: &[Vec3],
    shape2: &[Vec3],
    out: &mut Vec<Vec3>,
) {
    out.clear();
    if shape2.len() <= 2 {
        clip_segment_against_polygon(clip_normal, shape1, shape2, out);
        return;
    }
    if shape1.len() <= 2 {
        clip_segment_against_polygon(clip_normal, shape2, shape1, out);
        return;
    }

    let mut polygon: Vec<Vec3> = shape2.to_vec();
    let mut scratch: Vec<Vec3> = Vec::with_capacity(polygon.len() + shape1.len());
    let count1 = shape1.len();
    let mut i0 = count1 - 1;
    for i1 in 0..count1 {
        let edge_plane = edge_half_space(clip_normal, shape1[i0], shape1[i1]);
        i0 = i1;

        scratch.clear();
        let count = polygon.len();
        if count == 0 {
            break;
        }
        let mut side0 = edge_plane.evaluate(polygon[count - 1]);
        let mut j0 = count - 1;
        for j1 in 0..count {
            let side1 = edge_plane.evaluate(polygon[j1]);
            if side0 >= 0.0 {
                scratch.push(polygon[j0]);
                if side1 < 0.0 {
                    scratch.push(split_edge(polygon[j0], polygon[j1], side0, side1));
                }
            } else if side1 >= 0.0 {
                scratch.push(split_edge(polygon[j0], polygon[j1], side0, side1));
            }
            side0 = side1;
            j0 = j1;
        }
        std::mem::swap(&mut polygon, &mut scratch);
    }
    *out = polygon;
}

/// Clips a 1-2 point section against a polygon's edge half-spaces.
fn clip_segment_against_polygon(
    clip_normal: Vec3,
    polygon: &[Vec3],
    segment: &[Vec3],
    out: &mut Vec<Vec3>,
) {
    out.clear();
    if polygon.len() < 3 || segment.is_empty() {
        return;
    }
    let mut s0 = segment[0];
    let mut s1 = *segment.last().unwrap();
    let count = polygon.len();
    let mut i0 = count - 1;
    for i1 in 0..count {
        let edge_plane = edge_half_space(clip_normal, polygon[i0], polygon[i1]);
        i0 = i1;
        let side0 = edge_plane.evaluate(s0);
        let side1 = edge_plane.evaluate(s1);
        if side0 < 0.0 && side1 < 0.0 {
            return;
        }
        if side0 < 0.0 {
            s0 = split_edge(s0, s1, side0, side1);
        } else if side1 < 0.0 {
            s1 = split_edge(s0, s1, side0, side1);
        }
    }
    out.push(s0);
    if (s1 - s0).length_squared() > 1.0e-12 {
        out.push(s1);
    }
}

#[inline]
fn edge_half_space(clip_normal: Vec3, p0: Vec3, p1: Vec3) -> Plane {
    let n = clip_normal.cross(p1 - p0);
    Plane::new(n, -n.dot(p0))
}

#[inline]
fn split_edge(p0: Vec3, p1: Vec3, side0: f32, side1: f32) -> Vec3 {
    let den = side0 - side1;
    let den = if den.abs() < 1.0e-24 {
        1.0e-24f32.copysign(den)
    } else {
        den
    };
    p0 + (p1 - p0) * (side0 / den).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn polygon_intersection_of_offset_squares() {
        let a = [
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, -1.0),
        ];
        // Same square shifted by (1, 1) in the plane.
        let b: Vec<Vec3> = a.iter().map(|p| *p + Vec3::new(1.0, 0.0, 1.0)).collect();
        let mut out = Vec::new();
        calculate_convex_shape_intersection(Vec3::Y, &a, &b, &mut out);
        assert_eq!(out.len(), 4);
        for p in &out {
            assert!((0.0..=1.0).contains(&p.x));
            assert!((0.0..=1.0).contains(&p.z));
        }
    }

    #[test]
    fn polygon_intersection_disjoint_is_empty() {
        let a = [
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, -1.0),
        ];
        let b: Vec<Vec3> = a.iter().map(|p| *p + Vec3::new(5.0, 0.0, 0.0)).collect();
        let mut out = Vec::new();
        calculate_convex_shape_intersection(Vec3::Y, &a, &b, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn segment_clips_against_polygon() {
        let square = [
            Vec3::new(-1.0, 0.0, -1.0),
            Vec3::new(-1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, -1.0),
        ];
        let segment = [Vec3::new(-5.0, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0)];
        let mut out = Vec::new();
        calculate_convex_shape_intersection(Vec3::Y, &square, &segment, &mut out);
        assert_eq!(out.len(), 2);
        for p in &out {
            assert_relative_eq!(p.x.abs(), 1.0, epsilon = 1.0e-5);
            assert_relative_eq!(p.z, 0.0, epsilon = 1.0e-6);
        }
    }

    #[test]
    fn parallel_edge_overlap_gives_two_contacts() {
        let mut points = Vec::new();
        two_edge_contacts(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-0.25, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            &mut |p| points.push(p),
        );
        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0], Vec3::new(-0.25, 0.0, 0.0), epsilon = 1.0e-5);
        assert_relative_eq!(points[1], Vec3::new(1.0, 0.0, 0.0), epsilon = 1.0e-5);
    }

    #[test]
    fn crossing_edges_give_midpoint_contact() {
        let mut points = Vec::new();
        two_edge_contacts(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, -1.0),
            Vec3::new(0.0, 1.0, 1.0),
            &mut |p| points.push(p),
        );
        assert_eq!(points.len(), 1);
        assert_relative_eq!(points[0], Vec3::new(0.0, 0.5, 0.0), epsilon = 1.0e-5);
    }
}
