//! Manifold representations for the configuration spaces a trajectory lives on.
//!
//! Trajectory knots carry a pose that is not always a plain vector: a fixed-base arm
//! lives in Rⁿ, while a mobile manipulator lives in SE(2) × Rⁿ. This module provides:
//! - **Rⁿ**: joint vectors (`DVector<f64>`)
//! - **SE(2)**: rigid transformations in 2D
//! - **SE(2) × Rⁿ**: a mobile base carrying a joint vector ([`Pose2Vector`])
//!
//! Manifold      | dim   | X ∈ M                 | T_X M       | X ⊕ τ           | Y ⊖ X
//! ------------- | ----- | --------------------- | ----------- | --------------- | ----------------
//! n-D vector    | n     | v ∈ Rⁿ                | τ ∈ Rⁿ      | v + τ           | y - x
//! Rigid motion  | 3     | M = [R t; 0 1]        | [ρ, θ] ∈ R³ | M ∘ Exp(τ)      | Log(X⁻¹ ∘ Y)
//! Mobile arm    | 3 + n | (M, q)                | [ρ, θ, τ_q] | (M ⊕ τ_M, q+τ_q)| (Y_M ⊖ X_M, y_q - x_q)
//!
//! The plus/minus conventions follow the [manif](https://github.com/artivis/manif) C++
//! library: perturbations are right (local) perturbations, and every operation can
//! optionally return its Jacobians with respect to each input.

use nalgebra::{DMatrix, DVector};
use std::fmt::Debug;

pub mod pose2_vector;
pub mod se2;

pub use pose2_vector::Pose2Vector;
pub use se2::SE2;

/// Configuration space of a robot, as seen by the trajectory optimizer.
///
/// Implementors are the pose types stored in trajectory knots. The optimizer only needs
/// the tangent dimension and the `plus`/`minus` retraction pair with Jacobians; the
/// joint accessors are used by the joint limit cost, which acts on the Euclidean joint
/// block of the tangent space.
pub trait Manifold: Clone + Debug + Send + Sync + 'static {
    /// Dimension of the tangent space at this element.
    fn tangent_dim(&self) -> usize;

    /// Right-plus: `self ⊕ delta`.
    ///
    /// # Arguments
    /// * `delta` - Tangent increment, of length [`Manifold::tangent_dim`]
    /// * `jacobian_self` - Optional output for ∂(self ⊕ delta)/∂self
    /// * `jacobian_delta` - Optional output for ∂(self ⊕ delta)/∂delta
    fn plus(
        &self,
        delta: &DVector<f64>,
        jacobian_self: Option<&mut DMatrix<f64>>,
        jacobian_delta: Option<&mut DMatrix<f64>>,
    ) -> Self;

    /// Right-minus: `self ⊖ other`, the tangent that takes `other` to `self`.
    ///
    /// # Arguments
    /// * `other` - Reference element
    /// * `jacobian_self` - Optional output for ∂(self ⊖ other)/∂self
    /// * `jacobian_other` - Optional output for ∂(self ⊖ other)/∂other
    fn minus(
        &self,
        other: &Self,
        jacobian_self: Option<&mut DMatrix<f64>>,
        jacobian_other: Option<&mut DMatrix<f64>>,
    ) -> DVector<f64>;

    /// Joint positions carried by this element.
    fn joint_values(&self) -> DVector<f64>;

    /// Offset of the joint block inside the tangent vector.
    fn joint_offset(&self) -> usize;
}

impl Manifold for DVector<f64> {
    fn tangent_dim(&self) -> usize {
        self.len()
    }

    fn plus(
        &self,
        delta: &DVector<f64>,
        jacobian_self: Option<&mut DMatrix<f64>>,
        jacobian_delta: Option<&mut DMatrix<f64>>,
    ) -> Self {
        let n = self.len();
        if let Some(j) = jacobian_self {
            *j = DMatrix::identity(n, n);
        }
        if let Some(j) = jacobian_delta {
            *j = DMatrix::identity(n, n);
        }
        self + delta
    }

    fn minus(
        &self,
        other: &Self,
        jacobian_self: Option<&mut DMatrix<f64>>,
        jacobian_other: Option<&mut DMatrix<f64>>,
    ) -> DVector<f64> {
        let n = self.len();
        if let Some(j) = jacobian_self {
            *j = DMatrix::identity(n, n);
        }
        if let Some(j) = jacobian_other {
            *j = -DMatrix::identity(n, n);
        }
        self - other
    }

    fn joint_values(&self) -> DVector<f64> {
        self.clone()
    }

    fn joint_offset(&self) -> usize {
        0
    }
}
