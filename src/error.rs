//! Typed errors raised by the sampling kernel.

/// Errors raised by the sampling kernel.
///
/// Degenerate curves and numeric edge cases are not errors: they are
/// recovered locally (uniform fallback, clamped temperature) so a live
/// session always has something to sample from.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KernelError {
    /// Malformed energy range or grid size.
    #[error("invalid energy range [{min}, {max}] with {count} points")]
    InvalidRange { min: f64, max: f64, count: usize },

    /// A curve is not aligned to the energy grid.
    #[error("curve length must be {expected}, but is {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// A particle was about to receive a NaN or infinite energy.
    #[error("particle {id} would be assigned non-finite energy {energy}")]
    NonFiniteEnergy { id: usize, energy: f64 },
}
