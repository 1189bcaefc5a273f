//! Linear algebra utilities.
//!
//! The optimizers solve the damped normal equations `(H + λI) δ = -g` of the trajectory
//! problem. `H` is assembled as a faer sparse matrix and factorized with a sparse
//! Cholesky decomposition; see [`SparseCholeskySolver`].

use thiserror::Error;

pub mod cholesky;

pub use cholesky::SparseCholeskySolver;

/// Result type for linear algebra operations
pub type LinAlgResult<T> = Result<T, LinAlgError>;

/// Errors raised by the linear solvers
#[derive(Debug, Clone, Error)]
pub enum LinAlgError {
    /// Numeric or symbolic factorization failed, even after regularization
    #[error("Factorization failed: {0}")]
    FactorizationFailed(String),

    /// A sparse matrix could not be built from its triplets
    #[error("Sparse matrix creation failed: {0}")]
    SparseMatrixCreation(String),

    /// Inconsistent dimensions
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
