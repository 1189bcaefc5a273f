//! Joint position and velocity limit factors.
//!
//! Both are hinge costs that start acting a `threshold` before the limit is reached, so
//! the optimizer keeps a safety margin from the hard bound.

use super::Factor;
use crate::core::Knot;
use crate::manifold::Manifold;
use nalgebra::{DMatrix, DVector};

/// Hinge cost keeping `value` inside `[lower + threshold, upper - threshold]`.
///
/// # Returns
///
/// `(cost, ∂cost/∂value)`
pub fn hinge_limit(value: f64, lower: f64, upper: f64, threshold: f64) -> (f64, f64) {
    if value < lower + threshold {
        (lower + threshold - value, -1.0)
    } else if value > upper - threshold {
        (value - upper + threshold, 1.0)
    } else {
        (0.0, 0.0)
    }
}

/// Joint position limits on the joint block of a knot pose.
///
/// For a mobile manipulator only the arm joints are limited; the base pose is free.
#[derive(Debug, Clone)]
pub struct JointLimitFactor {
    lower: DVector<f64>,
    upper: DVector<f64>,
    threshold: DVector<f64>,
}

impl JointLimitFactor {
    pub fn new(lower: DVector<f64>, upper: DVector<f64>, threshold: DVector<f64>) -> Self {
        Self {
            lower,
            upper,
            threshold,
        }
    }
}

impl<P: Manifold> Factor<P> for JointLimitFactor {
    fn linearize(
        &self,
        knots: &[&Knot<P>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let knot = knots[0];
        let joints = knot.pose.joint_values();
        let offset = knot.pose.joint_offset();

        let mut residual = DVector::zeros(joints.len());
        let mut jac = compute_jacobian.then(|| DMatrix::zeros(joints.len(), knot.tangent_dim()));
        for i in 0..joints.len() {
            let (cost, slope) =
                hinge_limit(joints[i], self.lower[i], self.upper[i], self.threshold[i]);
            residual[i] = cost;
            if let Some(jac) = jac.as_mut() {
                jac[(i, offset + i)] = slope;
            }
        }
        (residual, jac)
    }

    fn dimension(&self) -> usize {
        self.lower.len()
    }
}

/// Symmetric velocity limits `|v_i| ≤ limit_i` on a knot velocity.
#[derive(Debug, Clone)]
pub struct VelocityLimitFactor {
    limits: DVector<f64>,
    threshold: DVector<f64>,
}

impl VelocityLimitFactor {
    pub fn new(limits: DVector<f64>, threshold: DVector<f64>) -> Self {
        Self { limits, threshold }
    }
}

impl<P: Manifold> Factor<P> for VelocityLimitFactor {
    fn linearize(
        &self,
        knots: &[&Knot<P>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let knot = knots[0];
        let pose_dim = knot.pose.tangent_dim();
        let n = knot.velocity.len();

        let mut residual = DVector::zeros(n);
        let mut jac = compute_jacobian.then(|| DMatrix::zeros(n, knot.tangent_dim()));
        for i in 0..n {
            let (cost, slope) = hinge_limit(
                knot.velocity[i],
                -self.limits[i],
                self.limits[i],
                self.threshold[i],
            );
            residual[i] = cost;
            if let Some(jac) = jac.as_mut() {
                jac[(i, pose_dim + i)] = slope;
            }
        }
        (residual, jac)
    }

    fn dimension(&self) -> usize {
        self.limits.len()
    }
}
