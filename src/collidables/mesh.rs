use std::collections::HashMap;

use glam::Vec3;

use crate::utilities::bounding_box::{BoundingBox, AABB_PADDING};
use crate::utilities::math_helper::DEGENERATE_LENGTH_SQUARED;
use crate::utilities::matrix::Matrix;

use super::ray::RayCastResult;

/// Callback that can reject a mesh face before the geometric ray test runs.
/// Receives the face id; returning false skips the face.
pub type RayCastPrefilter<'a> = &'a dyn Fn(u32) -> bool;

/// Triangle-soup collision shape wrapping static level geometry. Not convex:
/// queries decompose it into per-face [`ConvexPolygon`] views, so the type
/// exposes no support function at all.
///
/// [`ConvexPolygon`]: super::convex_polygon::ConvexPolygon
#[derive(Debug, Clone)]
pub struct MeshShape {
    pub(crate) vertices: Vec<Vec3>,
    pub(crate) triangles: Vec<[u32; 3]>,
    pub(crate) normals: Vec<Vec3>,
    /// Adjacent face index across each triangle edge, -1 at open borders.
    pub(crate) adjacency: Vec<[i32; 3]>,
    pub(crate) face_ids: Vec<u32>,
    local_aabb: BoundingBox,
}

impl MeshShape {
    /// Builds the soup and precomputes face normals plus per-edge adjacency.
    /// Face ids default to the face index; see [`MeshShape::with_face_ids`].
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        let normals = triangles
            .iter()
            .map(|t| {
                let e0 = vertices[t[1] as usize] - vertices[t[0] as usize];
                let e1 = vertices[t[2] as usize] - vertices[t[0] as usize];
                let n = e0.cross(e1);
                let mag2 = n.length_squared();
                if mag2 > DEGENERATE_LENGTH_SQUARED {
                    n / mag2.sqrt()
                } else {
                    // Zero-area face; it can never pass the quick test.
                    Vec3::ZERO
                }
            })
            .collect();

        let mut edge_map: HashMap<(u32, u32), (usize, usize)> = HashMap::new();
        let mut adjacency = vec![[-1i32; 3]; triangles.len()];
        for (face, t) in triangles.iter().enumerate() {
            for edge in 0..3 {
                let v0 = t[edge];
                let v1 = t[(edge + 1) % 3];
                if let Some(&(other_face, other_edge)) = edge_map.get(&(v1, v0)) {
                    adjacency[face][edge] = other_face as i32;
                    adjacency[other_face][other_edge] = face as i32;
                } else {
                    edge_map.insert((v0, v1), (face, edge));
                }
            }
        }

        let local_aabb = BoundingBox::from_points(vertices.iter().copied());
        let face_ids = (0..triangles.len() as u32).collect();
        Self {
            vertices,
            triangles,
            normals,
            adjacency,
            face_ids,
            local_aabb,
        }
    }

    /// Replaces the per-face user ids reported on contacts and ray hits.
    pub fn with_face_ids(mut self, face_ids: Vec<u32>) -> Self {
        debug_assert_eq!(face_ids.len(), self.triangles.len());
        self.face_ids = face_ids;
        self
    }

    #[inline(always)]
    pub fn face_count(&self) -> usize {
        self.triangles.len()
    }

    #[inline(always)]
    pub fn vertex(&self, index: u32) -> Vec3 {
        self.vertices[index as usize]
    }

    #[inline(always)]
    pub fn face_vertices(&self, face: usize) -> [Vec3; 3] {
        let t = self.triangles[face];
        [
            self.vertices[t[0] as usize],
            self.vertices[t[1] as usize],
            self.vertices[t[2] as usize],
        ]
    }

    #[inline(always)]
    pub fn face_normal(&self, face: usize) -> Vec3 {
        self.normals[face]
    }

    #[inline(always)]
    pub fn face_id(&self, face: usize) -> u32 {
        self.face_ids[face]
    }

    /// Normal of the face across the given edge, or the face's own normal at
    /// an open border.
    #[inline(always)]
    pub fn adjacent_normal(&self, face: usize, edge: usize) -> Vec3 {
        let other = self.adjacency[face][edge];
        if other >= 0 {
            self.normals[other as usize]
        } else {
            self.normals[face]
        }
    }

    /// Collects indices of faces whose bounds overlap the query box, given in
    /// mesh-local space. Candidate extraction only; the caller still runs
    /// exact tests.
    pub fn collect_faces(&self, query: &BoundingBox, out: &mut Vec<u32>) {
        out.clear();
        if !self.local_aabb.overlaps(query) {
            return;
        }
        for (face, _) in self.triangles.iter().enumerate() {
            let [p0, p1, p2] = self.face_vertices(face);
            let face_box = BoundingBox::from_points([p0, p1, p2]);
            if face_box.overlaps(query) {
                out.push(face as u32);
            }
        }
    }

    pub fn calc_aabb(&self, matrix: &Matrix) -> BoundingBox {
        let b = &self.local_aabb;
        let corners = (0..8).map(|i| {
            matrix.transform_point(Vec3::new(
                if i & 1 != 0 { b.max.x } else { b.min.x },
                if i & 2 != 0 { b.max.y } else { b.min.y },
                if i & 4 != 0 { b.max.z } else { b.min.z },
            ))
        });
        BoundingBox::from_points(corners).inflate(AABB_PADDING)
    }

    /// Segment cast over the soup in mesh-local space. Front faces only;
    /// the prefilter can reject faces by id before the geometric test.
    pub fn ray_cast(
        &self,
        p0: Vec3,
        p1: Vec3,
        prefilter: Option<RayCastPrefilter<'_>>,
    ) -> RayCastResult {
        let dp = p1 - p0;
        let mut best = RayCastResult::miss();
        for face in 0..self.triangles.len() {
            if let Some(filter) = prefilter {
                if !filter(self.face_ids[face]) {
                    continue;
                }
            }
            let [v0, v1, v2] = self.face_vertices(face);
            let e1 = v1 - v0;
            let e2 = v2 - v0;
            let h = dp.cross(e2);
            let det = e1.dot(h);
            // Front faces only.
            if det < 1.0e-10 {
                continue;
            }
            let inv = 1.0 / det;
            let s = p0 - v0;
            let u = s.dot(h) * inv;
            if !(0.0..=1.0).contains(&u) {
                continue;
            }
            let q = s.cross(e1);
            let v = dp.dot(q) * inv;
            if v < 0.0 || u + v > 1.0 {
                continue;
            }
            let t = e2.dot(q) * inv;
            if t >= 0.0 && t <= 1.0 && t < best.t {
                best = RayCastResult::hit(t, self.normals[face]);
            }
        }
        best
    }
}
