//! Factor implementations for the trajectory factor graph
//!
//! Every factor reads one or more knots and produces a residual vector, plus optionally
//! its Jacobian with respect to the stacked knot tangents. For a factor connected to
//! knots `k₁ … k_m` the Jacobian has one column block per knot, in connection order,
//! and each block is laid out as `[∂/∂pose | ∂/∂velocity]`.
//!
//! # Available factors
//!
//! - [`BoundaryFactor`]: pins a knot to a given pose and velocity
//! - [`GaussianProcessPriorFactor`]: constant-velocity smoothness between adjacent knots
//! - [`ObstacleFactor`]: hinge clearance cost of the robot body at a knot
//! - [`ObstacleFactorGP`]: the same cost at a GP-interpolated state between two knots
//! - [`JointLimitFactor`]: hinge cost keeping joint positions inside limits
//! - [`VelocityLimitFactor`]: hinge cost keeping velocities inside limits

use crate::core::Knot;
use crate::manifold::Manifold;
use nalgebra::{DMatrix, DVector};

pub mod boundary_factor;
pub mod gp_prior_factor;
pub mod limit_factor;
pub mod obstacle_factor;

pub use boundary_factor::BoundaryFactor;
pub use gp_prior_factor::GaussianProcessPriorFactor;
pub use limit_factor::{JointLimitFactor, VelocityLimitFactor, hinge_limit};
pub use obstacle_factor::{ObstacleCost, ObstacleFactor, ObstacleFactorGP, hinge_loss};

/// Trait for factors in the trajectory graph.
///
/// Factors do not own or point at knots; the residual block wrapping a factor holds the
/// knot indices and hands the factor the knots in that order.
pub trait Factor<P: Manifold>: Send + Sync {
    /// Compute the residual and, if requested, the Jacobian.
    ///
    /// # Arguments
    ///
    /// * `knots` - The connected knots, in the order given when the block was added
    /// * `compute_jacobian` - Whether to compute the Jacobian
    ///
    /// # Returns
    ///
    /// Tuple of `(residual, Option<jacobian>)`, the Jacobian being
    /// `dimension() × Σ knot tangent widths`
    fn linearize(
        &self,
        knots: &[&Knot<P>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>);

    /// Residual dimension
    fn dimension(&self) -> usize;
}
