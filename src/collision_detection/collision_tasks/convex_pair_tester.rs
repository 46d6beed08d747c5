use glam::Vec3;

use crate::collidables::shape::ConvexShape;
use crate::collision_detection::contact::ContactPoint;
use crate::collision_detection::contact_solver::{
    ContactSolver, ContinueOutcome, ConvexRef, MinkError,
};
use crate::utilities::matrix::Matrix;

/// Continuous queries cap their manifold lower than discrete ones; the
/// impact instant has at most a face worth of contacts.
const MAX_CONTINUE_CONTACTS: usize = 16;

/// General convex pair tester: everything without a cheaper closed form runs
/// through the Minkowski contact solver.
pub struct ConvexPairTester;

impl ConvexPairTester {
    pub fn test(
        a: &ConvexShape,
        matrix_a: &Matrix,
        b: &ConvexShape,
        matrix_b: &Matrix,
        padding: f32,
        is_trigger: bool,
        max_contacts: usize,
        out: &mut Vec<ContactPoint>,
    ) -> Result<bool, MinkError> {
        let mut solver = ContactSolver::new(
            ConvexRef::Shape(a),
            ConvexRef::Shape(b),
            matrix_a,
            matrix_b,
            padding,
        );
        solver.hull_hull_contacts(0, is_trigger, max_contacts, out)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn test_continue(
        a: &ConvexShape,
        matrix_a: &Matrix,
        velocity_a: Vec3,
        b: &ConvexShape,
        matrix_b: &Matrix,
        velocity_b: Vec3,
        timestep: f32,
        padding: f32,
        is_trigger: bool,
        max_contacts: usize,
        out: &mut Vec<ContactPoint>,
    ) -> Result<ContinueOutcome, MinkError> {
        let mut solver = ContactSolver::new(
            ConvexRef::Shape(a),
            ConvexRef::Shape(b),
            matrix_a,
            matrix_b,
            padding,
        );
        solver.calculate_velocities(velocity_a, velocity_b);
        solver.hull_hull_continue_contacts(
            timestep,
            0,
            is_trigger,
            max_contacts.min(MAX_CONTINUE_CONTACTS),
            out,
        )
    }

    /// Witness points of a separated pair, for distance queries.
    pub fn closest_points(
        a: &ConvexShape,
        matrix_a: &Matrix,
        b: &ConvexShape,
        matrix_b: &Matrix,
    ) -> Result<Option<(Vec3, Vec3, Vec3)>, MinkError> {
        let mut solver = ContactSolver::new(
            ConvexRef::Shape(a),
            ConvexRef::Shape(b),
            matrix_a,
            matrix_b,
            0.0,
        );
        solver.calculate_closest_points()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collidables::box_shape::BoxShape;
    use crate::collidables::sphere::SphereShape;
    use approx::assert_relative_eq;

    #[test]
    fn box_pair_face_manifold() {
        let a = ConvexShape::Box(BoxShape::new(2.0, 2.0, 2.0));
        let b = ConvexShape::Box(BoxShape::new(2.0, 2.0, 2.0));
        let mut out = Vec::new();
        // Stacked with 0.2 overlap.
        let in_trigger = ConvexPairTester::test(
            &a,
            &Matrix::IDENTITY,
            &b,
            &Matrix::from_translation(Vec3::new(0.0, 1.8, 0.0)),
            0.0,
            false,
            16,
            &mut out,
        )
        .unwrap();
        assert!(!in_trigger);
        assert!(out.len() >= 3, "face contact expected, got {}", out.len());
        for contact in &out {
            assert_relative_eq!(contact.normal, Vec3::new(0.0, -1.0, 0.0), epsilon = 2.0e-2);
            assert_relative_eq!(contact.penetration, 0.2, epsilon = 2.0e-2);
            assert_relative_eq!(contact.point.y, 0.9, epsilon = 5.0e-2);
        }
    }

    #[test]
    fn sphere_pair_through_general_solver() {
        let a = ConvexShape::Sphere(SphereShape::new(1.0));
        let b = ConvexShape::Sphere(SphereShape::new(1.0));
        let mut out = Vec::new();
        ConvexPairTester::test(
            &a,
            &Matrix::IDENTITY,
            &b,
            &Matrix::from_translation(Vec3::new(1.5, 0.0, 0.0)),
            0.0,
            false,
            4,
            &mut out,
        )
        .unwrap();
        assert_eq!(out.len(), 1);
        let contact = out[0];
        assert_relative_eq!(contact.normal, Vec3::new(-1.0, 0.0, 0.0), epsilon = 5.0e-2);
        assert_relative_eq!(contact.penetration, 0.5, epsilon = 5.0e-2);
        assert_relative_eq!(contact.point.x, 0.75, epsilon = 5.0e-2);
    }

    #[test]
    fn separated_pair_is_empty_without_padding() {
        let a = ConvexShape::Box(BoxShape::new(2.0, 2.0, 2.0));
        let b = ConvexShape::Box(BoxShape::new(2.0, 2.0, 2.0));
        let mut out = Vec::new();
        ConvexPairTester::test(
            &a,
            &Matrix::IDENTITY,
            &b,
            &Matrix::from_translation(Vec3::new(0.0, 2.5, 0.0)),
            0.0,
            false,
            16,
            &mut out,
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn near_contact_within_padding_generates_contacts() {
        let a = ConvexShape::Box(BoxShape::new(2.0, 2.0, 2.0));
        let b = ConvexShape::Box(BoxShape::new(2.0, 2.0, 2.0));
        let mut out = Vec::new();
        ConvexPairTester::test(
            &a,
            &Matrix::IDENTITY,
            &b,
            &Matrix::from_translation(Vec3::new(0.0, 2.05, 0.0)),
            0.1,
            false,
            16,
            &mut out,
        )
        .unwrap();
        assert!(!out.is_empty());
        for contact in &out {
            assert_relative_eq!(contact.normal, Vec3::new(0.0, -1.0, 0.0), epsilon = 2.0e-2);
        }
    }

    #[test]
    fn falling_box_time_of_impact() {
        let a = ConvexShape::Box(BoxShape::new(1.0, 1.0, 1.0));
        let ground = ConvexShape::Box(BoxShape::new(10.0, 1.0, 10.0));
        let mut out = Vec::new();
        // Gap of 0.5 below the falling box, closing at 10 per second.
        let outcome = ConvexPairTester::test_continue(
            &a,
            &Matrix::from_translation(Vec3::new(0.0, 1.5, 0.0)),
            Vec3::new(0.0, -10.0, 0.0),
            &ground,
            &Matrix::IDENTITY,
            Vec3::ZERO,
            0.1,
            0.0,
            false,
            16,
            &mut out,
        )
        .unwrap();
        let toi = outcome.time_of_impact.expect("impact inside the step");
        assert!(toi > 0.0 && toi < 0.1, "toi = {toi}");
        assert_relative_eq!(toi, 0.05, epsilon = 1.0e-2);
        assert!(!out.is_empty());
        for contact in &out {
            assert_relative_eq!(contact.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 2.0e-2);
            // Contact sits at the ground surface, following the fallen body.
            assert_relative_eq!(contact.point.y, 0.5, epsilon = 5.0e-2);
        }
    }

    #[test]
    fn receding_pair_has_no_impact() {
        let a = ConvexShape::Box(BoxShape::new(1.0, 1.0, 1.0));
        let ground = ConvexShape::Box(BoxShape::new(10.0, 1.0, 10.0));
        let mut out = Vec::new();
        let outcome = ConvexPairTester::test_continue(
            &a,
            &Matrix::from_translation(Vec3::new(0.0, 1.5, 0.0)),
            Vec3::new(0.0, 10.0, 0.0),
            &ground,
            &Matrix::IDENTITY,
            Vec3::ZERO,
            0.1,
            0.0,
            false,
            16,
            &mut out,
        )
        .unwrap();
        assert!(outcome.time_of_impact.is_none());
        assert!(out.is_empty());
    }

    #[test]
    fn closest_points_of_separated_spheres() {
        let a = ConvexShape::Sphere(SphereShape::new(1.0));
        let b = ConvexShape::Sphere(SphereShape::new(1.0));
        let result = ConvexPairTester::closest_points(
            &a,
            &Matrix::IDENTITY,
            &b,
            &Matrix::from_translation(Vec3::new(4.0, 0.0, 0.0)),
        )
        .unwrap()
        .expect("pair is separated");
        let (point_a, point_b, normal) = result;
        assert_relative_eq!(point_a, Vec3::new(1.0, 0.0, 0.0), epsilon = 2.0e-2);
        assert_relative_eq!(point_b, Vec3::new(3.0, 0.0, 0.0), epsilon = 2.0e-2);
        assert_relative_eq!(normal, Vec3::new(1.0, 0.0, 0.0), epsilon = 2.0e-2);
    }
}
