use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::box_shape::BoxShape;
use super::capsule::CapsuleShape;
use super::mesh::MeshShape;
use super::shape::{ConvexShape, Shape};
use super::sphere::SphereShape;

/// Fixed binary header written for every shape: a kind tag plus four float
/// lanes of shape dimensions. Floats are stored in the host's native
/// representation, the same persistence format level data uses on disk.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ShapeRecord {
    kind: u32,
    dimensions: [f32; 4],
}

const KIND_BOX: u32 = 0;
const KIND_SPHERE: u32 = 1;
const KIND_CAPSULE: u32 = 2;
const KIND_MESH: u32 = 3;

/// Mesh payload header following a `ShapeRecord` with the mesh kind.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MeshRecord {
    vertex_count: u32,
    triangle_count: u32,
}

impl Shape {
    /// Writes the shape as a small binary record through the caller's byte
    /// sink. The sink sees one or more contiguous chunks.
    pub fn serialize(&self, sink: &mut dyn FnMut(&[u8])) {
        match self {
            Shape::Convex(ConvexShape::Box(shape)) => {
                let h = shape.half_extents;
                let record = ShapeRecord {
                    kind: KIND_BOX,
                    dimensions: [h.x, h.y, h.z, 0.0],
                };
                sink(bytemuck::bytes_of(&record));
            }
            Shape::Convex(ConvexShape::Sphere(shape)) => {
                let record = ShapeRecord {
                    kind: KIND_SPHERE,
                    dimensions: [shape.radius, 0.0, 0.0, 0.0],
                };
                sink(bytemuck::bytes_of(&record));
            }
            Shape::Convex(ConvexShape::Capsule(shape)) => {
                let record = ShapeRecord {
                    kind: KIND_CAPSULE,
                    dimensions: [shape.radius, shape.half_height, 0.0, 0.0],
                };
                sink(bytemuck::bytes_of(&record));
            }
            Shape::Mesh(mesh) => {
                let record = ShapeRecord {
                    kind: KIND_MESH,
                    dimensions: [0.0; 4],
                };
                sink(bytemuck::bytes_of(&record));
                let header = MeshRecord {
                    vertex_count: mesh.vertices.len() as u32,
                    triangle_count: mesh.triangles.len() as u32,
                };
                sink(bytemuck::bytes_of(&header));
                for v in &mesh.vertices {
                    sink(bytemuck::bytes_of(&[v.x, v.y, v.z]));
                }
                for t in &mesh.triangles {
                    sink(bytemuck::bytes_of(t));
                }
                sink(bytemuck::cast_slice(&mesh.face_ids));
            }
        }
    }

    /// Reads a shape back from a byte source. The source must fill the
    /// buffer it is handed; an unknown kind tag returns None.
    pub fn deserialize(source: &mut dyn FnMut(&mut [u8])) -> Option<Shape> {
        let mut record = ShapeRecord::zeroed();
        source(bytemuck::bytes_of_mut(&mut record));
        let d = record.dimensions;
        match record.kind {
            KIND_BOX => Some(Shape::Convex(ConvexShape::Box(BoxShape::from_half_extents(
                Vec3::new(d[0], d[1], d[2]),
            )))),
            KIND_SPHERE => Some(Shape::Convex(ConvexShape::Sphere(SphereShape::new(d[0])))),
            KIND_CAPSULE => Some(Shape::Convex(ConvexShape::Capsule(CapsuleShape {
                radius: d[0],
                half_height: d[1],
            }))),
            KIND_MESH => {
                let mut header = MeshRecord::zeroed();
                source(bytemuck::bytes_of_mut(&mut header));
                let mut vertices = Vec::with_capacity(header.vertex_count as usize);
                for _ in 0..header.vertex_count {
                    let mut lanes = [0.0f32; 3];
                    source(bytemuck::cast_slice_mut(&mut lanes));
                    vertices.push(Vec3::from_array(lanes));
                }
                let mut triangles = Vec::with_capacity(header.triangle_count as usize);
                for _ in 0..header.triangle_count {
                    let mut indices = [0u32; 3];
                    source(bytemuck::cast_slice_mut(&mut indices));
                    triangles.push(indices);
                }
                let mut face_ids = vec![0u32; header.triangle_count as usize];
                source(bytemuck::cast_slice_mut(&mut face_ids));
                Some(Shape::Mesh(
                    MeshShape::new(vertices, triangles).with_face_ids(face_ids),
                ))
            }
            _ => None,
        }
    }
}
