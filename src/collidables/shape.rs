use glam::Vec3;

use crate::utilities::bounding_box::BoundingBox;
use crate::utilities::matrix::Matrix;

use super::box_shape::BoxShape;
use super::capsule::CapsuleShape;
use super::mesh::MeshShape;
use super::ray::RayCastResult;
use super::sphere::SphereShape;

/// Unit-density volume integrals of a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassProperties {
    pub volume: f32,
    /// Diagonal of the inertia tensor about the local axes.
    pub inertia: Vec3,
    /// Off-diagonal inertia terms (xy, xz, yz). Zero for the primitives,
    /// whose principal axes coincide with the local frame.
    pub cross_inertia: Vec3,
    pub center_of_mass: Vec3,
}

/// Discriminant used by the pair dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Box,
    Sphere,
    Capsule,
    Mesh,
}

/// A convex collision shape. Every variant carries the full operation set;
/// there is no "unimplemented" runtime case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConvexShape {
    Box(BoxShape),
    Sphere(SphereShape),
    Capsule(CapsuleShape),
}

impl ConvexShape {
    #[inline(always)]
    pub fn kind(&self) -> ShapeKind {
        match self {
            ConvexShape::Box(_) => ShapeKind::Box,
            ConvexShape::Sphere(_) => ShapeKind::Sphere,
            ConvexShape::Capsule(_) => ShapeKind::Capsule,
        }
    }

    /// Local point of maximum projection onto the direction. The direction
    /// is expected to be unit length; release builds trust the caller.
    #[inline(always)]
    pub fn support_vertex(&self, direction: Vec3) -> Vec3 {
        debug_assert!((direction.length_squared() - 1.0).abs() < 1.0e-3);
        match self {
            ConvexShape::Box(shape) => shape.support_vertex(direction),
            ConvexShape::Sphere(shape) => shape.support_vertex(direction),
            ConvexShape::Capsule(shape) => shape.support_vertex(direction),
        }
    }

    pub fn calc_aabb(&self, matrix: &Matrix) -> BoundingBox {
        match self {
            ConvexShape::Box(shape) => shape.calc_aabb(matrix),
            ConvexShape::Sphere(shape) => shape.calc_aabb(matrix),
            ConvexShape::Capsule(shape) => shape.calc_aabb(matrix),
        }
    }

    /// Local-space segment cast; misses report the [`RAY_CAST_MISS`]
    /// sentinel fraction.
    ///
    /// [`RAY_CAST_MISS`]: super::ray::RAY_CAST_MISS
    pub fn ray_cast(&self, p0: Vec3, p1: Vec3) -> RayCastResult {
        match self {
            ConvexShape::Box(shape) => shape.ray_cast(p0, p1),
            ConvexShape::Sphere(shape) => shape.ray_cast(p0, p1),
            ConvexShape::Capsule(shape) => shape.ray_cast(p0, p1),
        }
    }

    /// Cross-section polygon at a plane, written into `out`. Returns true
    /// when the section degenerated to an edge or vertex contact feature.
    pub fn calculate_plane_intersection(
        &self,
        normal: Vec3,
        point: Vec3,
        out: &mut Vec<Vec3>,
    ) -> bool {
        match self {
            ConvexShape::Box(shape) => shape.calculate_plane_intersection(normal, point, out),
            ConvexShape::Sphere(shape) => shape.calculate_plane_intersection(normal, point, out),
            ConvexShape::Capsule(shape) => shape.calculate_plane_intersection(normal, point, out),
        }
    }

    pub fn calculate_mass_properties(&self) -> MassProperties {
        match self {
            ConvexShape::Box(shape) => shape.calculate_mass_properties(),
            ConvexShape::Sphere(shape) => shape.calculate_mass_properties(),
            ConvexShape::Capsule(shape) => shape.calculate_mass_properties(),
        }
    }

    /// Radius of the circumscribed sphere.
    pub fn max_radius(&self) -> f32 {
        match self {
            ConvexShape::Box(shape) => shape.max_radius(),
            ConvexShape::Sphere(shape) => shape.max_radius(),
            ConvexShape::Capsule(shape) => shape.max_radius(),
        }
    }

    /// Radius of the inscribed sphere.
    pub fn min_radius(&self) -> f32 {
        match self {
            ConvexShape::Box(shape) => shape.min_radius(),
            ConvexShape::Sphere(shape) => shape.min_radius(),
            ConvexShape::Capsule(shape) => shape.min_radius(),
        }
    }
}

/// Any collision shape the dispatch layer accepts. The mesh variant is not
/// convex and deliberately exposes no support function; mesh queries go
/// through per-face [`ConvexPolygon`] views instead.
///
/// [`ConvexPolygon`]: super::convex_polygon::ConvexPolygon
#[derive(Debug, Clone)]
pub enum Shape {
    Convex(ConvexShape),
    Mesh(MeshShape),
}

impl Shape {
    #[inline(always)]
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Convex(convex) => convex.kind(),
            Shape::Mesh(_) => ShapeKind::Mesh,
        }
    }

    #[inline(always)]
    pub fn as_convex(&self) -> Option<&ConvexShape> {
        match self {
            Shape::Convex(convex) => Some(convex),
            Shape::Mesh(_) => None,
        }
    }

    #[inline(always)]
    pub fn as_mesh(&self) -> Option<&MeshShape> {
        match self {
            Shape::Mesh(mesh) => Some(mesh),
            Shape::Convex(_) => None,
        }
    }

    pub fn calc_aabb(&self, matrix: &Matrix) -> BoundingBox {
        match self {
            Shape::Convex(convex) => convex.calc_aabb(matrix),
            Shape::Mesh(mesh) => mesh.calc_aabb(matrix),
        }
    }
}

impl From<BoxShape> for Shape {
    fn from(shape: BoxShape) -> Self {
        Shape::Convex(ConvexShape::Box(shape))
    }
}

impl From<SphereShape> for Shape {
    fn from(shape: SphereShape) -> Self {
        Shape::Convex(ConvexShape::Sphere(shape))
    }
}

impl From<CapsuleShape> for Shape {
    fn from(shape: CapsuleShape) -> Self {
        Shape::Convex(ConvexShape::Capsule(shape))
    }
}

impl From<MeshShape> for Shape {
    fn from(shape: MeshShape) -> Self {
        Shape::Mesh(shape)
    }
}
