pub mod half_edge;
pub mod ray;
pub mod shape;
pub mod tessellation;

// Convex shape primitives
pub mod box_shape;
pub mod capsule;
pub mod sphere;

// Polygon soup and the per-query face view
pub mod convex_polygon;
pub mod mesh;

pub mod serialization;
