use std::sync::OnceLock;

use glam::Vec3;

/// Immutable lookup data the Minkowski solver reads on every query: the
/// support probe directions used to seed a non-degenerate tetrahedron, and
/// the face/vertex layout of that tetrahedron. Built once and handed to each
/// solver by reference; nothing here is ever mutated after construction.
pub struct SolverTables {
    /// Fourteen unit directions: the eight cube corners plus the six axes.
    pub probe_directions: [Vec3; 14],
    /// The four faces of the simplex tetrahedron. The first three entries of
    /// each row are the face vertices, wound so the face normal points away
    /// from the fourth entry (the opposite vertex).
    pub face_index: [[usize; 4]; 4],
}

pub fn solver_tables() -> &'static SolverTables {
    static TABLES: OnceLock<SolverTables> = OnceLock::new();
    TABLES.get_or_init(|| {
        let raw = [
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(0.0, 0.0, -1.0),
        ];
        let mut probe_directions = [Vec3::ZERO; 14];
        for (slot, dir) in probe_directions.iter_mut().zip(raw) {
            *slot = dir.normalize();
        }
        SolverTables {
            probe_directions,
            face_index: [[0, 1, 2, 3], [1, 0, 3, 2], [0, 2, 3, 1], [2, 1, 3, 0]],
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_directions_are_unit_and_cover_octants() {
        let tables = solver_tables();
        for dir in &tables.probe_directions {
            assert!((dir.length() - 1.0).abs() < 1.0e-6);
        }
        // Every octant has at least one probe.
        for octant in 0..8 {
            let sx = if octant & 1 != 0 { -1.0f32 } else { 1.0 };
            let sy = if octant & 2 != 0 { -1.0f32 } else { 1.0 };
            let sz = if octant & 4 != 0 { -1.0f32 } else { 1.0 };
            assert!(tables
                .probe_directions
                .iter()
                .any(|d| d.x * sx >= 0.0 && d.y * sy >= 0.0 && d.z * sz >= 0.0));
        }
    }

    #[test]
    fn face_rows_partition_the_tetrahedron() {
        let tables = solver_tables();
        for row in &tables.face_index {
            let mut seen = [false; 4];
            for &v in row {
                seen[v] = true;
            }
            assert_eq!(seen, [true; 4]);
        }
    }
}
