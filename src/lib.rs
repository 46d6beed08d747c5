//! Narrow phase collision detection for rigid body simulation.
//!
//! Given two collision shapes and their placement in space, the crate decides
//! whether they intersect or are separated and, when they intersect, computes
//! a minimal contact manifold (points, normals, penetration depths) ready for
//! a constraint solver. Continuous (swept) queries report the earliest time of
//! impact within a timestep so fast bodies cannot tunnel through thin
//! geometry.
//!
//! The crate owns no bodies, broad phase, or integrator; callers hand in shape
//! references, world transforms, and velocities through a [`CollisionQuery`]
//! and read back contact records.

pub mod collidables;
pub mod collision_detection;
pub mod utilities;

pub use collidables::box_shape::BoxShape;
pub use collidables::capsule::CapsuleShape;
pub use collidables::convex_polygon::ConvexPolygon;
pub use collidables::mesh::MeshShape;
pub use collidables::ray::{RayCastResult, RAY_CAST_MISS};
pub use collidables::shape::{ConvexShape, MassProperties, Shape};
pub use collidables::sphere::SphereShape;
pub use collision_detection::collision_task_registry::NarrowPhase;
pub use collision_detection::contact::ContactPoint;
pub use collision_detection::error::CollisionError;
pub use collision_detection::query::CollisionQuery;
pub use utilities::bounding_box::BoundingBox;
pub use utilities::matrix::Matrix;
pub use utilities::plane::Plane;
