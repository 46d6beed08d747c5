use std::sync::OnceLock;

use glam::Vec3;

use super::half_edge::ConvexTopology;

/// Longitudinal segment count of the shared unit sphere tessellation.
pub const SPHERE_LONGITUDE_COUNT: usize = 8;
/// Latitudinal band count. Even, so the tessellation splits cleanly at the
/// equator into the two capsule caps.
pub const SPHERE_LATITUDE_COUNT: usize = 6;

/// Vertex `i` of the canonical box, scaled by the given half extents. Bit 0
/// selects the x sign, bit 1 the y sign, bit 2 the z sign.
#[inline(always)]
pub fn unit_box_vertex(i: usize, half_extents: Vec3) -> Vec3 {
    Vec3::new(
        if i & 1 != 0 { half_extents.x } else { -half_extents.x },
        if i & 2 != 0 { half_extents.y } else { -half_extents.y },
        if i & 4 != 0 { half_extents.z } else { -half_extents.z },
    )
}

/// Half-edge topology of a box, built once and shared by every box instance.
pub fn unit_box() -> &'static ConvexTopology {
    static TOPOLOGY: OnceLock<ConvexTopology> = OnceLock::new();
    TOPOLOGY.get_or_init(|| {
        let vertices: Vec<Vec3> = (0..8).map(|i| unit_box_vertex(i, Vec3::ONE)).collect();
        let faces: Vec<Vec<u16>> = vec![
            vec![1, 3, 7, 5], // +x
            vec![0, 4, 6, 2], // -x
            vec![2, 6, 7, 3], // +y
            vec![0, 1, 5, 4], // -y
            vec![4, 5, 7, 6], // +z
            vec![0, 2, 3, 1], // -z
        ];
        ConvexTopology::from_faces(&vertices, &faces)
    })
}

/// Shared tessellation of the unit sphere, split at the equator so a capsule
/// can shift each half along its axis. `directions[i]` is the unit vertex
/// position; `end_sign[i]` tells which capsule end the vertex belongs to.
pub struct TessellatedSphere {
    pub topology: ConvexTopology,
    pub directions: Vec<Vec3>,
    pub end_sign: Vec<f32>,
}

impl TessellatedSphere {
    /// Vertex position for a capsule with the given radius and half height
    /// along the local x axis. A zero half height degenerates to the sphere.
    #[inline(always)]
    pub fn capsule_vertex(&self, i: usize, radius: f32, half_height: f32) -> Vec3 {
        let mut p = self.directions[i] * radius;
        p.x += self.end_sign[i] * half_height;
        p
    }
}

fn build_unit_sphere() -> TessellatedSphere {
    let lat = SPHERE_LATITUDE_COUNT;
    let long = SPHERE_LONGITUDE_COUNT;
    let mut directions = Vec::new();
    let mut end_sign = Vec::new();

    // +x pole, latitude rings with the equator duplicated, -x pole. The
    // duplicate equator ring carries the opposite end sign so the cylinder
    // band between the two copies becomes the capsule barrel.
    directions.push(Vec3::X);
    end_sign.push(1.0);
    let mut ring_base = Vec::new();
    for i in 1..lat {
        let theta = std::f32::consts::PI * i as f32 / lat as f32;
        let (sin_t, cos_t) = theta.sin_cos();
        let copies = if i == lat / 2 { 2 } else { 1 };
        for copy in 0..copies {
            ring_base.push(directions.len());
            let sign = if i < lat / 2 || (i == lat / 2 && copy == 0) {
                1.0
            } else {
                -1.0
            };
            for j in 0..long {
                let phi = std::f32::consts::TAU * j as f32 / long as f32;
                let (sin_p, cos_p) = phi.sin_cos();
                directions.push(Vec3::new(cos_t, sin_t * cos_p, sin_t * sin_p));
                end_sign.push(sign);
            }
        }
    }
    let south = directions.len();
    directions.push(-Vec3::X);
    end_sign.push(-1.0);

    let ring = |r: usize, j: usize| (ring_base[r] + j % long) as u16;
    let ring_count = ring_base.len();
    let mut faces: Vec<Vec<u16>> = Vec::new();
    for j in 0..long {
        faces.push(vec![0, ring(0, j), ring(0, j + 1)]);
    }
    for r in 0..ring_count - 1 {
        for j in 0..long {
            faces.push(vec![ring(r, j), ring(r + 1, j), ring(r + 1, j + 1), ring(r, j + 1)]);
        }
    }
    for j in 0..long {
        faces.push(vec![
            south as u16,
            ring(ring_count - 1, j + 1),
            ring(ring_count - 1, j),
        ]);
    }

    TessellatedSphere {
        topology: ConvexTopology::from_faces(&directions, &faces),
        directions,
        end_sign,
    }
}

/// The process-wide unit sphere tessellation. Built on first use, immutable
/// afterwards; shape construction never needs to synchronize beyond the
/// `OnceLock` first access.
pub fn unit_sphere() -> &'static TessellatedSphere {
    static SPHERE: OnceLock<TessellatedSphere> = OnceLock::new();
    SPHERE.get_or_init(build_unit_sphere)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_tessellation_is_closed_and_unit() {
        let sphere = unit_sphere();
        let expected = 2 + (SPHERE_LATITUDE_COUNT) * SPHERE_LONGITUDE_COUNT;
        assert_eq!(sphere.directions.len(), expected);
        for d in &sphere.directions {
            assert!((d.length() - 1.0).abs() < 1.0e-5);
        }
        for (i, e) in sphere.topology.edges.iter().enumerate() {
            assert_eq!(sphere.topology.edges[e.twin as usize].twin as usize, i);
        }
    }

    #[test]
    fn capsule_vertices_shift_along_x() {
        let sphere = unit_sphere();
        for i in 0..sphere.directions.len() {
            let p = sphere.capsule_vertex(i, 0.5, 2.0);
            // Every vertex sits on one of the end spheres.
            let center = Vec3::X * sphere.end_sign[i] * 2.0;
            assert!(((p - center).length() - 0.5).abs() < 1.0e-5);
        }
    }

    #[test]
    fn end_signs_split_at_equator() {
        let sphere = unit_sphere();
        for i in 0..sphere.directions.len() {
            if sphere.directions[i].x > 1.0e-5 {
                assert_eq!(sphere.end_sign[i], 1.0);
            }
            if sphere.directions[i].x < -1.0e-5 {
                assert_eq!(sphere.end_sign[i], -1.0);
            }
        }
    }
}
