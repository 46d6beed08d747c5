use glam::Vec3;

use crate::collision_detection::contact::ContactPoint;
use crate::utilities::math_helper::{point_to_segment, DENOMINATOR_GUARD};
use crate::utilities::matrix::Matrix;
use crate::utilities::plane::Plane;

use super::half_edge::enforce_winding;
use super::mesh::MeshShape;
use super::shape::ConvexShape;

/// Upper bound on the vertex count of a clipped face polygon. Beam clipping
/// keeps every downstream loop inside this budget.
pub const MAX_FACE_VERTICES: usize = 32;

/// Cosine threshold deciding whether two faces meeting at an edge form one
/// smooth surface. Shallower seams blend normals; sharper ones are genuine
/// creases and keep their contacts untouched.
pub const COPLANAR_SEAM_COS: f32 = 0.9659;

/// Clip normal alignment beyond which a face section is the whole polygon
/// rather than a crossing segment.
const FACE_SECTION_COS: f32 = 0.9995;

/// Transient convex view over one face of a triangle soup. The contact
/// solver consumes it through the same support/plane-section surface as the
/// true primitives and cannot tell the difference. One instance lives in
/// each per-thread scratch slot and is refilled for every candidate face.
#[derive(Debug, Clone, Default)]
pub struct ConvexPolygon {
    /// Face vertices in mesh-local space.
    pub vertices: Vec<Vec3>,
    /// Unit face normal.
    pub normal: Vec3,
    /// Normal of the neighbor across each edge `vertices[i] -> vertices[i+1]`.
    pub adjacent_normals: Vec<Vec3>,
    /// User id reported on contacts generated against this face.
    pub face_id: u32,
}

impl ConvexPolygon {
    pub fn new() -> Self {
        Self {
            vertices: Vec::with_capacity(MAX_FACE_VERTICES),
            normal: Vec3::ZERO,
            adjacent_normals: Vec::with_capacity(MAX_FACE_VERTICES),
            face_id: 0,
        }
    }

    /// Refills the view from a mesh face.
    pub fn set_from_face(&mut self, mesh: &MeshShape, face: usize) {
        self.vertices.clear();
        self.adjacent_normals.clear();
        let [p0, p1, p2] = mesh.face_vertices(face);
        self.vertices.extend([p0, p1, p2]);
        self.normal = mesh.face_normal(face);
        for edge in 0..3 {
            self.adjacent_normals.push(mesh.adjacent_normal(face, edge));
        }
        self.face_id = mesh.face_id(face);
    }

    /// Extremal vertex along the direction. A flat polygon has no interior,
    /// so this scans the loop.
    pub fn support_vertex(&self, direction: Vec3) -> Vec3 {
        let mut best = self.vertices[0];
        let mut best_dot = direction.dot(best);
        for v in &self.vertices[1..] {
            let d = direction.dot(*v);
            if d > best_dot {
                best_dot = d;
                best = *v;
            }
        }
        best
    }

    /// Cross-section of the flat polygon at a plane. Nearly coplanar planes
    /// return the whole loop (a face contact); anything else clips the
    /// boundary down to the crossing segment and flags an edge feature.
    pub fn calculate_plane_intersection(
        &self,
        normal: Vec3,
        point: Vec3,
        out: &mut Vec<Vec3>,
    ) -> bool {
        out.clear();
        let alignment = normal.dot(self.normal);
        if alignment.abs() > FACE_SECTION_COS {
            out.extend(self.vertices.iter().copied());
            enforce_winding(normal, out);
            return false;
        }

        let plane = Plane::from_point_normal(normal, point);
        let count = self.vertices.len();
        let mut side0 = plane.evaluate(self.vertices[count - 1]);
        let mut i0 = count - 1;
        for i1 in 0..count {
            let side1 = plane.evaluate(self.vertices[i1]);
            if (side0 < 0.0) != (side1 < 0.0) {
                let p0 = self.vertices[i0];
                let p1 = self.vertices[i1];
                let t = side0 / (side0 - side1 + DENOMINATOR_GUARD.copysign(side0 - side1));
                out.push(p0 + (p1 - p0) * t.clamp(0.0, 1.0));
            }
            side0 = side1;
            i0 = i1;
        }
        !out.is_empty()
    }

    /// Separating-axis prefilter along the face normal. `matrix` maps this
    /// polygon's mesh-local frame into the convex shape's local frame.
    /// Returns false when the face cannot produce a contact: separated in
    /// front beyond the padding, or entirely behind the one-sided face.
    pub fn quick_test(&self, shape: &ConvexShape, matrix: &Matrix, padding: f32) -> bool {
        let (front, back) = self.normal_extents(shape, matrix);
        front <= padding && back >= -1.0e-3
    }

    /// Continuous variant: also admits faces the relative motion can reach
    /// within the timestep.
    pub fn quick_test_continue(
        &self,
        shape: &ConvexShape,
        matrix: &Matrix,
        local_rel_veloc: Vec3,
        timestep: f32,
        padding: f32,
    ) -> bool {
        let (front, back) = self.normal_extents(shape, matrix);
        if back < -1.0e-3 {
            return false;
        }
        if front <= padding {
            return true;
        }
        // Gap closing speed of the shape toward the face plane. The relative
        // velocity is the face's motion in the shape's frame.
        let normal = matrix.rotate_vector(self.normal);
        let closing = normal.dot(local_rel_veloc);
        closing > 0.0 && front - closing * timestep <= padding
    }

    /// Lowest and highest extent of the shape relative to the face plane,
    /// measured along the face normal in the shape's local frame.
    fn normal_extents(&self, shape: &ConvexShape, matrix: &Matrix) -> (f32, f32) {
        let normal = matrix.rotate_vector(self.normal);
        let plane_offset = normal.dot(matrix.transform_point(self.vertices[0]));
        let front = normal.dot(shape.support_vertex(-normal)) - plane_offset;
        let back = normal.dot(shape.support_vertex(normal)) - plane_offset;
        (front, back)
    }

    /// Clips the polygon to a square beam of the given half size around a
    /// center point on the face. Oversized level-geometry faces get bounded
    /// before the solver sees them, keeping fixed buffers safe. Clipped
    /// edges lose their seam adjacency and fall back to the face normal.
    pub fn beam_clipping(&mut self, center: Vec3, size: f32) {
        let tangent = (self.vertices[1] - self.vertices[0]).normalize_or_zero();
        if tangent == Vec3::ZERO {
            return;
        }
        let bitangent = self.normal.cross(tangent);

        let planes = [
            Plane::from_point_normal(tangent, center - tangent * size),
            Plane::from_point_normal(-tangent, center + tangent * size),
            Plane::from_point_normal(bitangent, center - bitangent * size),
            Plane::from_point_normal(-bitangent, center + bitangent * size),
        ];

        let mut polygon: Vec<Vec3> = self.vertices.clone();
        let mut clipped = false;
        let mut scratch: Vec<Vec3> = Vec::with_capacity(MAX_FACE_VERTICES);
        for plane in &planes {
            scratch.clear();
            let count = polygon.len();
            if count == 0 {
                break;
            }
            let mut side0 = plane.evaluate(polygon[count - 1]);
            let mut i0 = count - 1;
            for i1 in 0..count {
                let side1 = plane.evaluate(polygon[i1]);
                if side0 >= 0.0 {
                    scratch.push(polygon[i0]);
                    if side1 < 0.0 {
                        let t = side0 / (side0 - side1 + DENOMINATOR_GUARD);
                        scratch.push(polygon[i0] + (polygon[i1] - polygon[i0]) * t);
                        clipped = true;
                    }
                } else if side1 >= 0.0 {
                    let t = side0 / (side0 - side1 - DENOMINATOR_GUARD);
                    scratch.push(polygon[i0] + (polygon[i1] - polygon[i0]) * t);
                    clipped = true;
                }
                side0 = side1;
                i0 = i1;
            }
            std::mem::swap(&mut polygon, &mut scratch);
        }

        if clipped && polygon.len() >= 3 {
            polygon.truncate(MAX_FACE_VERTICES);
            self.vertices = polygon;
            self.adjacent_normals.clear();
            self.adjacent_normals
                .resize(self.vertices.len(), self.normal);
        }
    }

    /// Post-pass over contacts generated against this face. Edge contacts on
    /// a shallow seam take the blended neighbor normal so a body sliding
    /// across near-coplanar triangles sees one continuous surface; contacts
    /// on a genuine crease keep the normal the solver produced.
    pub fn clip_contacts(&self, contacts: &mut [ContactPoint], soup_matrix: &Matrix) {
        for contact in contacts.iter_mut() {
            if !contact.is_edge_contact {
                continue;
            }
            let local = soup_matrix.untransform_point(contact.point);
            let edge = self.nearest_edge(local);
            let adjacent = self.adjacent_normals[edge];
            if adjacent.dot(self.normal) > COPLANAR_SEAM_COS {
                let blended = (adjacent + self.normal).normalize_or_zero();
                if blended != Vec3::ZERO {
                    contact.normal = soup_matrix.rotate_vector(blended);
                }
            }
        }
    }

    fn nearest_edge(&self, point: Vec3) -> usize {
        let count = self.vertices.len();
        let mut best = 0;
        let mut best_dist = f32::MAX;
        for i in 0..count {
            let p0 = self.vertices[i];
            let p1 = self.vertices[(i + 1) % count];
            let closest = point_to_segment(point, p0, p1);
            let dist = (closest - point).length_squared();
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best
    }

    /// Continuous contact of a moving sphere against this face, all in
    /// mesh-local space. `veloc` is the sphere's velocity relative to the
    /// mesh. Returns the impact time within [0, timestep] and the contact.
    pub fn moving_point_to_polygon_contact(
        &self,
        center: Vec3,
        veloc: Vec3,
        radius: f32,
        timestep: f32,
    ) -> Option<(f32, ContactPoint)> {
        let normal = self.normal;
        let height = normal.dot(center - self.vertices[0]);
        if height < 0.0 {
            // Behind the one-sided face.
            return None;
        }
        let approach = normal.dot(veloc);

        // Face interior first: slide the sphere down to the plane and check
        // the touch point against the edges.
        if approach < -1.0e-8 {
            let t = ((height - radius) / -approach).max(0.0);
            if t <= timestep {
                let touch = center + veloc * t - normal * radius;
                if self.point_inside(touch) {
                    let contact = ContactPoint {
                        point: touch,
                        normal,
                        penetration: (radius - height.min(radius)).max(0.0),
                        user_id: self.face_id,
                        is_edge_contact: false,
                    };
                    return Some((t, contact));
                }
            }
        } else if height <= radius && self.point_inside(center - normal * height) {
            // Already touching and not approaching; report the resting
            // contact at time zero.
            let contact = ContactPoint {
                point: center - normal * height,
                normal,
                penetration: radius - height,
                user_id: self.face_id,
                is_edge_contact: false,
            };
            return Some((0.0, contact));
        }

        // The closed-form face path degenerated or the touch point fell
        // outside; enumerate edges and vertices.
        let count = self.vertices.len();
        let mut best: Option<(f32, ContactPoint)> = None;
        for i in 0..count {
            let p0 = self.vertices[i];
            let p1 = self.vertices[(i + 1) % count];
            if let Some((t, point)) =
                moving_sphere_to_edge_contact(p0, p1, center, veloc, radius, timestep)
            {
                if best.map_or(true, |(bt, _)| t < bt) {
                    let sphere_center = center + veloc * t;
                    let contact_normal = (sphere_center - point) / radius;
                    best = Some((
                        t,
                        ContactPoint {
                            point,
                            normal: contact_normal,
                            penetration: 0.0,
                            user_id: self.face_id,
                            is_edge_contact: true,
                        },
                    ));
                }
            }
        }
        best
    }

    /// Projects the point onto the face plane implicitly and tests it against
    /// every edge half-space.
    fn point_inside(&self, point: Vec3) -> bool {
        let count = self.vertices.len();
        for i in 0..count {
            let p0 = self.vertices[i];
            let p1 = self.vertices[(i + 1) % count];
            let edge_normal = self.normal.cross(p1 - p0);
            if edge_normal.dot(point - p0) < 0.0 {
                return false;
            }
        }
        true
    }
}

/// Analytic swept-sphere-versus-segment impact. Returns the impact time and
/// the contact point on the segment. Degenerate sweeps (velocity parallel to
/// the edge, vanishing edge) fall back to the endpoint sweep.
pub fn moving_sphere_to_edge_contact(
    p0: Vec3,
    p1: Vec3,
    center: Vec3,
    veloc: Vec3,
    radius: f32,
    timestep: f32,
) -> Option<(f32, Vec3)> {
    let axis = p1 - p0;
    let axis_len2 = axis.length_squared();
    if axis_len2 > DENOMINATOR_GUARD {
        let u = axis / axis_len2.sqrt();
        let w0 = center - p0;
        let w_perp = w0 - u * w0.dot(u);
        let v_perp = veloc - u * veloc.dot(u);
        let a = v_perp.length_squared();
        if a > 1.0e-12 {
            let b = w_perp.dot(v_perp);
            let c = w_perp.length_squared() - radius * radius;
            if c <= 0.0 {
                // Already within one radius of the line; clamp to the
                // segment to see whether it is a genuine edge touch.
                let closest = point_to_segment(center, p0, p1);
                if (closest - center).length_squared() <= radius * radius {
                    return Some((0.0, closest));
                }
            } else {
                let discriminant = b * b - a * c;
                if discriminant >= 0.0 {
                    let t = (-b - discriminant.sqrt()) / a;
                    if t >= 0.0 && t <= timestep {
                        let s = (w0 + veloc * t).dot(u);
                        if s >= 0.0 && s * s <= axis_len2 {
                            return Some((t, p0 + u * s));
                        }
                    }
                }
            }
        }
    }

    // Endpoint sweep covers the degenerate paths.
    let mut best: Option<(f32, Vec3)> = None;
    for p in [p0, p1] {
        let w = center - p;
        let a = veloc.length_squared();
        if a < 1.0e-12 {
            continue;
        }
        let b = w.dot(veloc);
        let c = w.length_squared() - radius * radius;
        let discriminant = b * b - a * c;
        if discriminant < 0.0 {
            continue;
        }
        let t = (-b - discriminant.sqrt()) / a;
        if t >= 0.0 && t <= timestep && best.map_or(true, |(bt, _)| t < bt) {
            best = Some((t, p));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collidables::sphere::SphereShape;
    use approx::assert_relative_eq;

    fn unit_face() -> ConvexPolygon {
        ConvexPolygon {
            vertices: vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(-1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, -1.0),
            ],
            normal: Vec3::Y,
            adjacent_normals: vec![Vec3::Y; 4],
            face_id: 7,
        }
    }

    #[test]
    fn support_vertex_scans_loop() {
        let face = unit_face();
        let support = face.support_vertex(Vec3::new(0.7, 0.0, 0.7).normalize());
        assert_relative_eq!(support, Vec3::new(1.0, 0.0, 1.0));
    }

    #[test]
    fn coplanar_plane_returns_whole_face() {
        let face = unit_face();
        let mut out = Vec::new();
        let is_edge = face.calculate_plane_intersection(Vec3::Y, Vec3::ZERO, &mut out);
        assert!(!is_edge);
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn crossing_plane_returns_edge_segment() {
        let face = unit_face();
        let mut out = Vec::new();
        let is_edge = face.calculate_plane_intersection(Vec3::X, Vec3::ZERO, &mut out);
        assert!(is_edge);
        assert_eq!(out.len(), 2);
        for p in &out {
            assert_relative_eq!(p.x, 0.0, epsilon = 1.0e-6);
            assert_relative_eq!(p.z.abs(), 1.0, epsilon = 1.0e-6);
        }
    }

    #[test]
    fn quick_test_culls_separated_and_backfacing() {
        let face = unit_face();
        let sphere = ConvexShape::Sphere(SphereShape::new(0.5));
        // Shape local frame: face transformed so the sphere hovers above it.
        let touching = Matrix::from_translation(Vec3::new(0.0, -0.4, 0.0));
        assert!(face.quick_test(&sphere, &touching, 0.0));
        let separated = Matrix::from_translation(Vec3::new(0.0, -3.0, 0.0));
        assert!(!face.quick_test(&sphere, &separated, 0.0));
        let behind = Matrix::from_translation(Vec3::new(0.0, 3.0, 0.0));
        assert!(!face.quick_test(&sphere, &behind, 0.0));
    }

    #[test]
    fn quick_test_continue_admits_reachable_faces() {
        let face = unit_face();
        let sphere = ConvexShape::Sphere(SphereShape::new(0.5));
        let separated = Matrix::from_translation(Vec3::new(0.0, -3.0, 0.0));
        // Face approaching the sphere at 40 units/s closes the 2.5 gap.
        let closing = separated.rotation * Vec3::new(0.0, 40.0, 0.0);
        assert!(face.quick_test_continue(&sphere, &separated, closing, 0.1, 0.0));
        let receding = -closing;
        assert!(!face.quick_test_continue(&sphere, &separated, receding, 0.1, 0.0));
    }

    #[test]
    fn beam_clipping_bounds_oversized_faces() {
        let mut face = ConvexPolygon {
            vertices: vec![
                Vec3::new(-100.0, 0.0, -100.0),
                Vec3::new(-100.0, 0.0, 100.0),
                Vec3::new(100.0, 0.0, 100.0),
                Vec3::new(100.0, 0.0, -100.0),
            ],
            normal: Vec3::Y,
            adjacent_normals: vec![Vec3::Y; 4],
            face_id: 0,
        };
        face.beam_clipping(Vec3::ZERO, 2.0);
        assert!(face.vertices.len() >= 3);
        for v in &face.vertices {
            assert!(v.x.abs() <= 2.0 + 1.0e-3);
            assert!(v.z.abs() <= 2.0 + 1.0e-3);
        }
    }

    #[test]
    fn clip_contacts_blends_shallow_seams_only() {
        let mut face = unit_face();
        // Neighbor across edge 2 (x = +1) tilted 10 degrees: shallow seam.
        let shallow = Vec3::new(10.0f32.to_radians().sin(), 10.0f32.to_radians().cos(), 0.0);
        face.adjacent_normals[2] = shallow;
        let solver_normal = Vec3::new(0.8, 0.6, 0.0).normalize();
        let mut contacts = [ContactPoint {
            point: Vec3::new(1.0, 0.0, 0.0),
            normal: solver_normal,
            is_edge_contact: true,
            ..Default::default()
        }];
        face.clip_contacts(&mut contacts, &Matrix::IDENTITY);
        let blended = (shallow + Vec3::Y).normalize();
        assert_relative_eq!(contacts[0].normal, blended, epsilon = 1.0e-5);

        // A square crease keeps the solver normal.
        face.adjacent_normals[2] = Vec3::X;
        contacts[0].normal = solver_normal;
        face.clip_contacts(&mut contacts, &Matrix::IDENTITY);
        assert_relative_eq!(contacts[0].normal, solver_normal, epsilon = 1.0e-6);
    }

    #[test]
    fn moving_sphere_lands_on_face_interior() {
        let face = unit_face();
        let (t, contact) = face
            .moving_point_to_polygon_contact(
                Vec3::new(0.25, 2.0, 0.25),
                Vec3::new(0.0, -10.0, 0.0),
                0.5,
                1.0,
            )
            .unwrap();
        assert_relative_eq!(t, 0.15, epsilon = 1.0e-4);
        assert_relative_eq!(contact.point, Vec3::new(0.25, 0.0, 0.25), epsilon = 1.0e-4);
        assert_relative_eq!(contact.normal, Vec3::Y, epsilon = 1.0e-6);
        assert!(!contact.is_edge_contact);
    }

    #[test]
    fn moving_sphere_clips_to_edge() {
        let face = unit_face();
        // Falling outside the face boundary, grazing the x = 1 edge.
        let result = face.moving_point_to_polygon_contact(
            Vec3::new(1.3, 2.0, 0.0),
            Vec3::new(0.0, -10.0, 0.0),
            0.5,
            1.0,
        );
        let (t, contact) = result.unwrap();
        assert!(contact.is_edge_contact);
        assert_relative_eq!(contact.point, Vec3::new(1.0, 0.0, 0.0), epsilon = 1.0e-4);
        // Sphere center at impact sits radius away from the edge.
        let center = Vec3::new(1.3, 2.0, 0.0) + Vec3::new(0.0, -10.0, 0.0) * t;
        assert_relative_eq!((center - contact.point).length(), 0.5, epsilon = 1.0e-4);
        assert!(contact.normal.dot(Vec3::Y) > 0.0);
    }

    #[test]
    fn moving_sphere_ignores_receding_motion() {
        let face = unit_face();
        assert!(face
            .moving_point_to_polygon_contact(
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(0.0, 5.0, 0.0),
                0.5,
                1.0,
            )
            .is_none());
    }
}
