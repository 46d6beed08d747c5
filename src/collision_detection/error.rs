use thiserror::Error;

/// Failures a caller can actually cause. Geometric degeneracy inside the
/// algorithms never surfaces here; it resolves to zero contacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollisionError {
    /// A shape transform is not a finite rigid motion.
    #[error("shape transform is not a finite rigid motion")]
    InvalidTransform,
    /// A velocity passed to a continuous query is not finite.
    #[error("velocity is not finite")]
    InvalidVelocity,
    /// The caller-supplied thread index exceeds the configured slot count.
    #[error("thread index {0} exceeds the scratch slot count")]
    InvalidThreadIndex(usize),
}
