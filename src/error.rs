//! Error types for the apex-planner library
//!
//! This module provides the main error and result types used throughout the library.
//! All errors use the `thiserror` crate for automatic trait implementations.
//!
//! Solver nonconvergence is not an error: optimizers report it through
//! [`OptimizationStatus`](crate::optimizer::OptimizationStatus) together with the best
//! trajectory found.

use crate::{linalg::LinAlgError, sdf::SdfError};
use thiserror::Error;

/// Main result type used throughout the apex-planner library
pub type PlannerResult<T> = Result<T, PlannerError>;

/// Main error type for the apex-planner library
#[derive(Debug, Clone, Error)]
pub enum PlannerError {
    /// Inconsistent sizes or invalid settings, detected before any solving
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Linear algebra related errors
    #[error("Linear algebra error: {0}")]
    LinearAlgebra(String),

    /// Signed distance field construction or query errors
    #[error("SDF error: {0}")]
    Sdf(String),
}

// Convert module-specific errors to PlannerError

impl From<LinAlgError> for PlannerError {
    fn from(err: LinAlgError) -> Self {
        PlannerError::LinearAlgebra(err.to_string())
    }
}

impl From<SdfError> for PlannerError {
    fn from(err: SdfError) -> Self {
        PlannerError::Sdf(err.to_string())
    }
}
