//! Minkowski-difference contact solver.
//!
//! Works in the local space of the reference shape: the Minkowski difference
//! of the pair is sampled through support points, a tetrahedral simplex
//! certifies separation or containment of the origin, and an expanding
//! polytope recovers the minimum-penetration face when the shapes overlap.
//! All working state lives in the solver value itself, so queries are
//! reentrant and safe to run from independent threads.

pub mod tables;

mod contacts;
mod continuous;
mod polytope;
mod separating;

pub use continuous::ContinueOutcome;

use glam::Vec3;
use thiserror::Error;

use crate::collidables::convex_polygon::ConvexPolygon;
use crate::collidables::shape::ConvexShape;
use crate::utilities::math_helper::{point_to_triangle, DENOMINATOR_GUARD};
use crate::utilities::matrix::Matrix;
use crate::utilities::plane::Plane;

use tables::{solver_tables, SolverTables};

/// Hard cap on Minkowski support points per query.
pub const MINK_MAX_POINTS: usize = 64;
pub(crate) const MINK_MAX_POINTS_SIZE: usize = MINK_MAX_POINTS + 16;
/// Hard cap on polytope faces per query.
pub const MINK_MAX_FACES: usize = MINK_MAX_POINTS * 4;

pub(crate) const UPDATE_SEPARATING_PLANE_MAX_ITERATION: usize = 32;
pub(crate) const FALLBACK_SEPARATING_PLANE_ITERATIONS: usize = 32;

pub(crate) const DISTANCE_TOLERANCE: f32 = 1.0e-3;
pub(crate) const DISTANCE_TOLERANCE_ZERO: f32 = 1.0e-24;
pub(crate) const UPDATE_SEPARATING_PLANE_DISTANCE_TOLERANCE: f32 = DISTANCE_TOLERANCE * 1.0e-1;
pub(crate) const FALLBACK_SEPARATING_DIST_TOLERANCE: f32 = 1.0e-6;

pub(crate) const ROBUST_PLANE_CLIP: f32 = 1.0 / 256.0;
pub(crate) const CALCULATE_SEPARATING_PLANE_ERROR: f32 = ROBUST_PLANE_CLIP * 2.0;
pub(crate) const CALCULATE_SEPARATING_PLANE_ERROR1: f32 = ROBUST_PLANE_CLIP * 0.5;

/// Separation below which a resting contact is still generated.
pub const RESTING_CONTACT_PENETRATION: f32 = 1.0 / 256.0;
/// Slop subtracted from reported penetration depths; keeps resolved contacts
/// from oscillating across the surface.
pub const IMPULSIVE_CONTACT_PENETRATION: f32 = 1.0 / 256.0;

/// The solver could not make geometric sense of the pair (a zero-extent
/// Minkowski difference, typically a zero-volume shape). Callers treat it as
/// "no contact, do not retry".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("degenerate shape pair in contact solver")]
pub struct MinkError;

/// Outcome of the separating-plane search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GjkResult {
    /// The origin is inside the Minkowski difference.
    Intersecting,
    /// Separated; the payload names the separating face row of the simplex.
    Disjoint(usize),
}

/// A polytope face selected as the contact plane, with the hull slots of its
/// three vertices.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClipFace {
    pub plane: Plane,
    pub vertices: [usize; 3],
}

/// One operand of the solver: either a convex primitive or a mesh-face view.
/// The solver itself cannot tell which it is working on.
#[derive(Clone, Copy)]
pub enum ConvexRef<'a> {
    Shape(&'a ConvexShape),
    Polygon(&'a ConvexPolygon),
}

impl<'a> ConvexRef<'a> {
    #[inline(always)]
    pub fn support_vertex(&self, direction: Vec3) -> Vec3 {
        match self {
            ConvexRef::Shape(shape) => shape.support_vertex(direction),
            ConvexRef::Polygon(polygon) => polygon.support_vertex(direction),
        }
    }

    #[inline(always)]
    pub fn calculate_plane_intersection(
        &self,
        normal: Vec3,
        point: Vec3,
        out: &mut Vec<Vec3>,
    ) -> bool {
        match self {
            ConvexRef::Shape(shape) => shape.calculate_plane_intersection(normal, point, out),
            ConvexRef::Polygon(polygon) => {
                polygon.calculate_plane_intersection(normal, point, out)
            }
        }
    }

    pub fn max_radius(&self) -> f32 {
        match self {
            ConvexRef::Shape(shape) => shape.max_radius(),
            ConvexRef::Polygon(polygon) => polygon
                .vertices
                .iter()
                .map(|v| v.length())
                .fold(0.0, f32::max),
        }
    }
}

/// Per-query contact solver state. Stack allocated, never shared.
pub struct ContactSolver<'a> {
    pub(crate) tables: &'static SolverTables,
    pub(crate) reference: ConvexRef<'a>,
    pub(crate) floating: ConvexRef<'a>,
    /// Floating shape's local frame expressed in the reference local frame.
    pub(crate) matrix: Matrix,
    /// Reference local frame expressed in world space.
    pub(crate) reference_matrix: Matrix,
    pub(crate) penetration_padding: f32,
    /// Velocity of the floating body relative to the reference body, in the
    /// reference local frame. Zero for discrete queries.
    pub(crate) local_rel_veloc: Vec3,
    /// World velocity of the reference body, used to place continuous
    /// contacts at the impact time.
    pub(crate) reference_veloc: Vec3,
    /// Minkowski difference support points (`a - b`).
    pub(crate) hull: [Vec3; MINK_MAX_POINTS_SIZE],
    /// Support point sums (`a + b`), halved later to recover witnesses.
    pub(crate) aver: [Vec3; MINK_MAX_POINTS_SIZE],
    pub(crate) vertex_index: usize,
}

impl<'a> ContactSolver<'a> {
    pub fn new(
        reference: ConvexRef<'a>,
        floating: ConvexRef<'a>,
        reference_matrix: &Matrix,
        floating_matrix: &Matrix,
        penetration_padding: f32,
    ) -> Self {
        Self {
            tables: solver_tables(),
            reference,
            floating,
            matrix: reference_matrix.relative_to(floating_matrix),
            reference_matrix: *reference_matrix,
            penetration_padding,
            local_rel_veloc: Vec3::ZERO,
            reference_veloc: Vec3::ZERO,
            hull: [Vec3::ZERO; MINK_MAX_POINTS_SIZE],
            aver: [Vec3::ZERO; MINK_MAX_POINTS_SIZE],
            vertex_index: 0,
        }
    }

    /// Builds a solver whose floating operand already lives in the reference
    /// frame through the given local matrix; the mesh path uses this with
    /// per-face polygon views.
    pub fn with_local_matrix(
        reference: ConvexRef<'a>,
        floating: ConvexRef<'a>,
        reference_matrix: &Matrix,
        local_matrix: Matrix,
        penetration_padding: f32,
    ) -> Self {
        Self {
            tables: solver_tables(),
            reference,
            floating,
            matrix: local_matrix,
            reference_matrix: *reference_matrix,
            penetration_padding,
            local_rel_veloc: Vec3::ZERO,
            reference_veloc: Vec3::ZERO,
            hull: [Vec3::ZERO; MINK_MAX_POINTS_SIZE],
            aver: [Vec3::ZERO; MINK_MAX_POINTS_SIZE],
            vertex_index: 0,
        }
    }

    /// Samples the Minkowski difference along a unit direction into the given
    /// vertex slot.
    #[inline]
    pub(crate) fn calc_support_vertex(&mut self, dir: Vec3, entry: usize) {
        debug_assert!(dir.length_squared() > 0.999);
        let p = self.reference.support_vertex(dir);
        let dir1 = self.matrix.unrotate_vector(-dir);
        let q = self.matrix.transform_point(self.floating.support_vertex(dir1));
        self.hull[entry] = p - q;
        self.aver[entry] = p + q;
    }

    /// Signed-volume orientation test of the first four hull vertices.
    #[inline]
    pub(crate) fn check_tetra_volume(&self) -> bool {
        let e0 = self.hull[1] - self.hull[0];
        let e1 = self.hull[2] - self.hull[0];
        let e2 = self.hull[3] - self.hull[0];
        e1.cross(e0).dot(e2) >= 0.0
    }

    pub(crate) fn swap_vertices(&mut self, a: usize, b: usize) {
        self.hull.swap(a, b);
        self.aver.swap(a, b);
    }

    /// Shrinks the segment [0, 1] to the feature closest to the origin and
    /// returns that closest point.
    pub(crate) fn reduce_line(&mut self, origin: Vec3) -> Vec3 {
        let p0 = self.hull[0];
        let p1 = self.hull[1];
        let dp = p1 - p0;
        let alpha = (origin - p0).dot(dp) / (dp.dot(dp) + DENOMINATOR_GUARD);
        if alpha > 1.0 {
            self.vertex_index = 1;
            self.hull[0] = self.hull[1];
            self.aver[0] = self.aver[1];
            p1
        } else if alpha < 0.0 {
            self.vertex_index = 1;
            p0
        } else {
            p0 + dp * alpha
        }
    }

    /// Shrinks the triangle [0, 1, 2] to the feature closest to the origin
    /// and returns that closest point.
    pub(crate) fn reduce_triangle(&mut self, origin: Vec3) -> Vec3 {
        let p0 = self.hull[0];
        let p1 = self.hull[1];
        let p2 = self.hull[2];

        let p10 = p1 - p0;
        let p20 = p2 - p0;
        let p_p0 = origin - p0;

        let alpha1 = p10.dot(p_p0);
        let alpha2 = p20.dot(p_p0);
        if alpha1 <= 0.0 && alpha2 <= 0.0 {
            self.vertex_index = 1;
            return p0;
        }

        let p_p1 = origin - p1;
        let alpha3 = p10.dot(p_p1);
        let alpha4 = p20.dot(p_p1);
        if alpha3 >= 0.0 && alpha4 <= alpha3 {
            self.vertex_index = 1;
            self.hull[0] = p1;
            self.aver[0] = self.aver[1];
            return p1;
        }

        let vc = alpha1 * alpha4 - alpha3 * alpha2;
        if vc <= 0.0 && alpha1 >= 0.0 && alpha3 <= 0.0 {
            let t = alpha1 / (alpha1 - alpha3);
            self.vertex_index = 2;
            return p0 * (1.0 - t) + p1 * t;
        }

        let p_p2 = origin - p2;
        let alpha5 = p10.dot(p_p2);
        let alpha6 = p20.dot(p_p2);
        if alpha6 >= 0.0 && alpha5 <= alpha6 {
            self.vertex_index = 1;
            self.hull[0] = p2;
            self.aver[0] = self.aver[2];
            return p2;
        }

        let vb = alpha5 * alpha2 - alpha1 * alpha6;
        if vb <= 0.0 && alpha2 >= 0.0 && alpha6 <= 0.0 {
            let t = alpha2 / (alpha2 - alpha6);
            self.vertex_index = 2;
            self.hull[1] = p2;
            self.aver[1] = self.aver[2];
            return p0 * (1.0 - t) + p2 * t;
        }

        let va = alpha3 * alpha6 - alpha5 * alpha4;
        if va <= 0.0 && (alpha4 - alpha3) >= 0.0 && (alpha5 - alpha6) >= 0.0 {
            let t = (alpha4 - alpha3) / ((alpha4 - alpha3) + (alpha5 - alpha6));
            self.vertex_index = 2;
            self.hull[0] = p2;
            self.aver[0] = self.aver[2];
            return p1 * (1.0 - t) + p2 * t;
        }

        let den = 1.0 / (va + vb + vc);
        let t = vb * den;
        let s = vc * den;
        self.vertex_index = 3;
        p0 + p10 * t + p20 * s
    }

    /// Shrinks the tetrahedron [0..4] to the feature closest to the origin
    /// and returns that closest point. The origin being inside every face
    /// keeps all four vertices.
    pub(crate) fn reduce_tetrahedron(&mut self, origin: Vec3) -> Vec3 {
        let mut closest = origin;
        let mut selected: Option<[usize; 3]> = None;
        let mut min_dist = f32::MAX;
        for row in &self.tables.face_index {
            let i0 = row[0];
            let i1 = row[1];
            let i2 = row[2];
            let p0 = self.hull[i0];
            let p1 = self.hull[i1];
            let p2 = self.hull[i2];
            let volume = (origin - p0).dot((p1 - p0).cross(p2 - p0));
            if volume < 0.0 {
                let q = point_to_triangle(origin, p0, p1, p2);
                let dist = (q - origin).length_squared();
                if dist < min_dist {
                    min_dist = dist;
                    closest = q;
                    selected = Some([i0, i1, i2]);
                }
            }
        }

        if let Some([i0, i1, i2]) = selected {
            let hull = [self.hull[i0], self.hull[i1], self.hull[i2]];
            let aver = [self.aver[i0], self.aver[i1], self.aver[i2]];
            for i in 0..3 {
                self.hull[i] = hull[i];
                self.aver[i] = aver[i];
            }
            return self.reduce_triangle(origin);
        }
        closest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collidables::sphere::SphereShape;
    use approx::assert_relative_eq;

    fn sphere_pair<'a>(
        a: &'a ConvexShape,
        b: &'a ConvexShape,
        offset: Vec3,
    ) -> ContactSolver<'a> {
        ContactSolver::new(
            ConvexRef::Shape(a),
            ConvexRef::Shape(b),
            &Matrix::IDENTITY,
            &Matrix::from_translation(offset),
            0.0,
        )
    }

    #[test]
    fn support_sampling_matches_minkowski_difference() {
        let a = ConvexShape::Sphere(SphereShape::new(1.0));
        let b = ConvexShape::Sphere(SphereShape::new(0.5));
        let mut solver = sphere_pair(&a, &b, Vec3::new(3.0, 0.0, 0.0));
        solver.calc_support_vertex(Vec3::X, 0);
        // Farthest point of A - B along +x: 1 - (3 - 0.5).
        assert_relative_eq!(solver.hull[0], Vec3::new(-1.5, 0.0, 0.0), epsilon = 1.0e-6);
        // Sum recovers the two witnesses: a = (1,0,0), b = (2.5,0,0).
        assert_relative_eq!(solver.aver[0], Vec3::new(3.5, 0.0, 0.0), epsilon = 1.0e-6);
    }

    #[test]
    fn reduce_line_clamps_to_vertices() {
        let a = ConvexShape::Sphere(SphereShape::new(1.0));
        let b = ConvexShape::Sphere(SphereShape::new(1.0));
        let mut solver = sphere_pair(&a, &b, Vec3::new(5.0, 0.0, 0.0));
        solver.hull[0] = Vec3::new(1.0, 1.0, 0.0);
        solver.hull[1] = Vec3::new(2.0, 1.0, 0.0);
        solver.vertex_index = 2;
        let v = solver.reduce_line(Vec3::ZERO);
        assert_relative_eq!(v, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(solver.vertex_index, 1);
    }

    #[test]
    fn reduce_triangle_interior_projection() {
        let a = ConvexShape::Sphere(SphereShape::new(1.0));
        let b = ConvexShape::Sphere(SphereShape::new(1.0));
        let mut solver = sphere_pair(&a, &b, Vec3::new(5.0, 0.0, 0.0));
        solver.hull[0] = Vec3::new(-1.0, -1.0, 2.0);
        solver.hull[1] = Vec3::new(3.0, -1.0, 2.0);
        solver.hull[2] = Vec3::new(-1.0, 3.0, 2.0);
        solver.vertex_index = 3;
        let v = solver.reduce_triangle(Vec3::ZERO);
        assert_relative_eq!(v, Vec3::new(0.0, 0.0, 2.0), epsilon = 1.0e-6);
        assert_eq!(solver.vertex_index, 3);
    }

    #[test]
    fn reduce_tetrahedron_keeps_enclosing_simplex() {
        let a = ConvexShape::Sphere(SphereShape::new(1.0));
        let b = ConvexShape::Sphere(SphereShape::new(1.0));
        let mut solver = sphere_pair(&a, &b, Vec3::new(5.0, 0.0, 0.0));
        solver.hull[0] = Vec3::new(-1.0, -1.0, -1.0);
        solver.hull[1] = Vec3::new(4.0, -1.0, -1.0);
        solver.hull[2] = Vec3::new(-1.0, 4.0, -1.0);
        solver.hull[3] = Vec3::new(-1.0, -1.0, 4.0);
        if !solver.check_tetra_volume() {
            solver.swap_vertices(1, 2);
        }
        solver.vertex_index = 4;
        let v = solver.reduce_tetrahedron(Vec3::ZERO);
        assert_relative_eq!(v, Vec3::ZERO, epsilon = 1.0e-6);
        assert_eq!(solver.vertex_index, 4);
    }
}
