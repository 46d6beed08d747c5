use glam::Vec3;

use crate::collidables::shape::Shape;
use crate::utilities::matrix::Matrix;

use super::contact::ContactPoint;
use super::error::CollisionError;

/// Everything one narrow-phase query needs, supplied by the simulation loop.
/// The bundle is a view: the caller owns the shapes and reads the results
/// back out of `contacts` after the call.
pub struct CollisionQuery<'a> {
    pub shape_a: &'a Shape,
    pub shape_b: &'a Shape,
    pub matrix_a: Matrix,
    pub matrix_b: Matrix,
    /// Linear velocities, used by continuous queries.
    pub velocity_a: Vec3,
    pub velocity_b: Vec3,
    /// Angular velocities. Carried for the caller's bound expansion; the
    /// sweep itself advances along the linear relative velocity.
    pub omega_a: Vec3,
    pub omega_b: Vec3,
    /// Timestep covered by a continuous query, in seconds.
    pub timestep: f32,
    /// Run a swept (time-of-impact) query instead of a discrete one.
    pub continue_collision: bool,
    /// Suppress contact generation, only report boolean overlap.
    pub is_trigger_volume: bool,
    /// Extra shell around the shapes treated as contact.
    pub penetration_padding: f32,
    /// Contact capacity; the query never reports more than this.
    pub max_contacts: usize,
    /// Scratch slot for this query; one slot per concurrent caller thread.
    pub thread_index: usize,

    /// Output: generated contacts, newest query's results only.
    pub contacts: Vec<ContactPoint>,
    /// Output: set when a trigger volume query saw an overlap.
    pub in_trigger_volume: bool,
    /// Output: fraction of the timestep at which a continuous query hit,
    /// in [0, 1]. None when no impact occurs within the step.
    pub time_of_impact: Option<f32>,
}

impl<'a> CollisionQuery<'a> {
    pub fn new(shape_a: &'a Shape, matrix_a: Matrix, shape_b: &'a Shape, matrix_b: Matrix) -> Self {
        Self {
            shape_a,
            shape_b,
            matrix_a,
            matrix_b,
            velocity_a: Vec3::ZERO,
            velocity_b: Vec3::ZERO,
            omega_a: Vec3::ZERO,
            omega_b: Vec3::ZERO,
            timestep: 0.0,
            continue_collision: false,
            is_trigger_volume: false,
            penetration_padding: 0.0,
            max_contacts: 16,
            thread_index: 0,
            contacts: Vec::new(),
            in_trigger_volume: false,
            time_of_impact: None,
        }
    }

    /// Enables a continuous query over the given timestep with the two body
    /// velocities.
    pub fn with_continuous(mut self, velocity_a: Vec3, velocity_b: Vec3, timestep: f32) -> Self {
        self.velocity_a = velocity_a;
        self.velocity_b = velocity_b;
        self.timestep = timestep;
        self.continue_collision = true;
        self
    }

    /// Checks every externally supplied precondition that release builds
    /// must not trust silently: transforms and velocities reachable from
    /// user input get recoverable errors, not undefined arithmetic.
    pub(crate) fn validate(&self) -> Result<(), CollisionError> {
        if !self.matrix_a.is_rigid() || !self.matrix_b.is_rigid() {
            return Err(CollisionError::InvalidTransform);
        }
        if self.continue_collision {
            let finite = self.velocity_a.is_finite()
                && self.velocity_b.is_finite()
                && self.omega_a.is_finite()
                && self.omega_b.is_finite()
                && self.timestep.is_finite();
            if !finite {
                return Err(CollisionError::InvalidVelocity);
            }
        }
        Ok(())
    }
}
