use std::collections::HashMap;

use glam::Vec3;

use crate::utilities::math_helper::DENOMINATOR_GUARD;
use crate::utilities::plane::Plane;

/// Half edge record. Twin, next and prev are stable indices into the owning
/// [`ConvexTopology`] arena, never pointers.
#[derive(Debug, Clone, Copy)]
pub struct SimplexEdge {
    pub vertex: u16,
    pub twin: u16,
    pub next: u16,
    pub prev: u16,
}

const UNPAIRED: u16 = u16::MAX;

/// Connectivity of a convex polytope boundary as a doubly connected edge
/// list. Built once per shape class and shared read-only by every instance;
/// per-instance geometry is supplied through a vertex accessor at query time.
#[derive(Debug)]
pub struct ConvexTopology {
    pub edges: Vec<SimplexEdge>,
    pub vertex_count: usize,
    /// Starting edge for the support hill climb, one per direction octant.
    support_quadrant: [u16; 8],
}

impl ConvexTopology {
    /// Builds the arena from outward-wound polygonal faces. Every edge must
    /// have exactly one twin; open or non-manifold input is a construction
    /// bug in the caller.
    pub fn from_faces(vertices: &[Vec3], faces: &[Vec<u16>]) -> Self {
        let mut edges: Vec<SimplexEdge> = Vec::new();
        let mut pair_map: HashMap<(u16, u16), u16> = HashMap::new();

        for face in faces {
            let base = edges.len() as u16;
            let n = face.len() as u16;
            debug_assert!(n >= 3);
            for i in 0..n {
                edges.push(SimplexEdge {
                    vertex: face[i as usize],
                    twin: UNPAIRED,
                    next: base + (i + 1) % n,
                    prev: base + (i + n - 1) % n,
                });
            }
            for i in 0..n {
                let id = base + i;
                let v0 = face[i as usize];
                let v1 = face[((i + 1) % n) as usize];
                if let Some(&twin) = pair_map.get(&(v1, v0)) {
                    edges[id as usize].twin = twin;
                    edges[twin as usize].twin = id;
                } else {
                    pair_map.insert((v0, v1), id);
                }
            }
        }
        debug_assert!(edges.iter().all(|e| e.twin != UNPAIRED));

        let mut topology = Self {
            edges,
            vertex_count: vertices.len(),
            support_quadrant: [0; 8],
        };
        for octant in 0..8 {
            let dir = Vec3::new(
                if octant & 1 != 0 { -1.0 } else { 1.0 },
                if octant & 2 != 0 { -1.0 } else { 1.0 },
                if octant & 4 != 0 { -1.0 } else { 1.0 },
            );
            let mut best = 0usize;
            let mut best_dot = dir.dot(vertices[0]);
            for (i, v) in vertices.iter().enumerate().skip(1) {
                let d = dir.dot(*v);
                if d > best_dot {
                    best_dot = d;
                    best = i;
                }
            }
            let edge = topology
                .edges
                .iter()
                .position(|e| e.vertex as usize == best)
                .unwrap_or(0);
            topology.support_quadrant[octant] = edge as u16;
        }
        topology
    }

    #[inline(always)]
    pub fn octant_index(dir: Vec3) -> usize {
        (dir.x < 0.0) as usize | (((dir.y < 0.0) as usize) << 1) | (((dir.z < 0.0) as usize) << 2)
    }

    /// Head vertex of an edge (the tail of its twin).
    #[inline(always)]
    pub fn head(&self, edge: u16) -> u16 {
        self.edges[self.edges[edge as usize].twin as usize].vertex
    }

    /// Hill climbs the one-skeleton to an edge whose tail is the vertex of
    /// maximum projection onto the direction. The per-octant start table
    /// replaces a full vertex scan.
    pub fn support_edge<F: Fn(usize) -> Vec3>(&self, vertex_of: &F, dir: Vec3) -> u16 {
        let mut edge = self.support_quadrant[Self::octant_index(dir)];
        let mut best = dir.dot(vertex_of(self.edges[edge as usize].vertex as usize));
        let mut guard = self.edges.len();
        'climb: while guard > 0 {
            guard -= 1;
            let mut ptr = edge;
            loop {
                let head = self.head(ptr);
                let d = dir.dot(vertex_of(head as usize));
                if d > best {
                    best = d;
                    edge = self.edges[ptr as usize].twin;
                    continue 'climb;
                }
                ptr = self.edges[self.edges[ptr as usize].twin as usize].next;
                if ptr == edge {
                    break 'climb;
                }
            }
        }
        edge
    }

    /// Cross-section of the polytope at the given plane, as an ordered vertex
    /// loop wound counterclockwise about the plane normal. Returns an empty
    /// section when the plane does not cut the polytope.
    pub fn plane_intersection<F: Fn(usize) -> Vec3>(
        &self,
        vertex_of: &F,
        plane: &Plane,
        out: &mut Vec<Vec3>,
    ) {
        out.clear();

        // The walk needs vertices on both sides of the plane.
        let top = self.support_edge(vertex_of, plane.normal);
        let top_side = plane.evaluate(vertex_of(self.edges[top as usize].vertex as usize));
        if top_side < 0.0 {
            return;
        }
        let bottom = self.support_edge(vertex_of, -plane.normal);
        let bottom_side = plane.evaluate(vertex_of(self.edges[bottom as usize].vertex as usize));
        if bottom_side >= 0.0 {
            return;
        }

        // Descend from the top vertex until an edge crosses to the negative
        // side. The plane distance is linear over the boundary, so a strictly
        // descending neighbor always exists away from the minimum.
        let mut first = UNPAIRED;
        let mut edge = top;
        let mut side0 = top_side;
        let mut guard = self.edges.len();
        'descend: while guard > 0 {
            guard -= 1;
            let mut ptr = edge;
            let mut descend = UNPAIRED;
            let mut descend_side = side0;
            loop {
                let head_side = plane.evaluate(vertex_of(self.head(ptr) as usize));
                if head_side < 0.0 {
                    first = ptr;
                    break 'descend;
                }
                if head_side < descend_side {
                    descend_side = head_side;
                    descend = ptr;
                }
                ptr = self.edges[self.edges[ptr as usize].twin as usize].next;
                if ptr == edge {
                    break;
                }
            }
            if descend == UNPAIRED {
                return;
            }
            edge = self.edges[descend as usize].twin;
            side0 = descend_side;
        }
        if first == UNPAIRED {
            return;
        }

        // Walk the crossing loop face by face. Each iteration emits the
        // intersection point of the current crossing edge and jumps to the
        // next face through the edge that crosses back.
        let mut e = first;
        let mut guard = 2 * self.edges.len();
        loop {
            guard -= 1;
            let p0 = vertex_of(self.edges[e as usize].vertex as usize);
            let p1 = vertex_of(self.head(e) as usize);
            let s0 = plane.evaluate(p0);
            let s1 = plane.evaluate(p1);
            let t = s0 / (s0 - s1 + DENOMINATOR_GUARD);
            out.push(p0 + (p1 - p0) * t.clamp(0.0, 1.0));

            let mut f = self.edges[e as usize].next;
            let mut tail_side = s1;
            let mut face_guard = self.edges.len();
            loop {
                let head_side = plane.evaluate(vertex_of(self.head(f) as usize));
                if tail_side < 0.0 && head_side >= 0.0 {
                    break;
                }
                tail_side = head_side;
                f = self.edges[f as usize].next;
                face_guard -= 1;
                if face_guard == 0 {
                    enforce_winding(plane.normal, out);
                    return;
                }
            }
            e = self.edges[f as usize].twin;
            if e == first || guard == 0 {
                break;
            }
        }

        enforce_winding(plane.normal, out);
    }
}

/// Reverses the loop in place if it is wound clockwise about the normal.
pub fn enforce_winding(normal: Vec3, points: &mut [Vec3]) {
    if points.len() < 3 {
        return;
    }
    let p0 = points[0];
    let mut area = Vec3::ZERO;
    for i in 1..points.len() - 1 {
        area += (points[i] - p0).cross(points[i + 1] - p0);
    }
    if area.dot(normal) < 0.0 {
        points.reverse();
    }
}
