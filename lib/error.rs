//! Error type shared by all lattice operator constructions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarkerError {
    /// Backing storage or requested lattice has an unusable shape.
    #[error("invalid shape: expected {expected:?}, got {got:?}")]
    InvalidShape { expected: (usize, usize), got: (usize, usize) },

    /// Operator dimensions disagree with each other or with the lattice.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A lattice size was needed but none was given or remembered.
    #[error("no lattice size supplied and none remembered from a previous hamiltonian")]
    MissingLatticeSize,

    /// A gauge potential returned something other than a planar vector.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Hermitian diagonalization failed, even after symmetrization.
    #[error("eigendecomposition failed to converge: {0}")]
    ConvergenceFailure(String),

    /// A numerical parameter is outside its valid range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The operation cannot be carried out on this lattice geometry.
    #[error("unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    /// Two evolution specifiers were given the same output name.
    #[error("duplicate evolution binding '{0}'")]
    DuplicateBinding(String),
}

pub type MarkerResult<T> = Result<T, MarkerError>;
