//! Boundary factor pinning a knot to a known state.

use super::Factor;
use crate::core::Knot;
use crate::manifold::Manifold;
use nalgebra::{DMatrix, DVector};

/// Residual `[pose ⊖ target_pose; velocity - target_velocity]` on a single knot.
///
/// Used with [`NoiseModel::Constrained`](crate::core::NoiseModel::Constrained) for the
/// start and goal states, which removes the knot from the optimization.
#[derive(Debug, Clone)]
pub struct BoundaryFactor<P: Manifold> {
    pose: P,
    velocity: DVector<f64>,
}

impl<P: Manifold> BoundaryFactor<P> {
    pub fn new(pose: P, velocity: DVector<f64>) -> Self {
        Self { pose, velocity }
    }

    pub fn pose(&self) -> &P {
        &self.pose
    }

    pub fn velocity(&self) -> &DVector<f64> {
        &self.velocity
    }
}

impl<P: Manifold> Factor<P> for BoundaryFactor<P> {
    fn linearize(
        &self,
        knots: &[&Knot<P>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let knot = knots[0];
        let pose_dim = self.pose.tangent_dim();
        let vel_dim = self.velocity.len();

        let mut j_pose = DMatrix::zeros(0, 0);
        let pose_error = knot.pose.minus(
            &self.pose,
            compute_jacobian.then_some(&mut j_pose),
            None,
        );

        let mut residual = DVector::zeros(pose_dim + vel_dim);
        residual.rows_mut(0, pose_dim).copy_from(&pose_error);
        residual
            .rows_mut(pose_dim, vel_dim)
            .copy_from(&(&knot.velocity - &self.velocity));

        let jacobian = compute_jacobian.then(|| {
            let mut jac = DMatrix::zeros(pose_dim + vel_dim, pose_dim + vel_dim);
            jac.view_mut((0, 0), (pose_dim, pose_dim)).copy_from(&j_pose);
            jac.view_mut((pose_dim, pose_dim), (vel_dim, vel_dim))
                .fill_with_identity();
            jac
        });
        (residual, jacobian)
    }

    fn dimension(&self) -> usize {
        self.pose.tangent_dim() + self.velocity.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::test_utils::{analytic_jacobian, numerical_jacobian};
    use crate::manifold::{Pose2Vector, SE2};
    use nalgebra::dvector;

    #[test]
    fn test_boundary_residual_vector() {
        let factor = BoundaryFactor::new(dvector![1.0, 2.0], dvector![0.0, 0.5]);
        let knot = Knot::new(dvector![1.5, 1.0], dvector![0.1, 0.5]);
        let (residual, _) = factor.linearize(&[&knot], false);
        assert!((residual - dvector![0.5, -1.0, 0.1, 0.0]).norm() < 1e-12);
        assert_eq!(factor.dimension(), 4);
    }

    #[test]
    fn test_boundary_zero_at_target() {
        let target = Pose2Vector::new(SE2::from_xy_angle(0.3, -0.2, 0.7), dvector![0.1, 0.4]);
        let velocity = dvector![0.2, 0.0, 0.1, -0.3, 0.0];
        let factor = BoundaryFactor::new(target.clone(), velocity.clone());
        let knot = Knot::new(target, velocity);
        let (residual, _) = factor.linearize(&[&knot], false);
        assert!(residual.norm() < 1e-12);
    }

    #[test]
    fn test_boundary_jacobian_on_mobile_pose() {
        let target = Pose2Vector::new(SE2::from_xy_angle(0.3, -0.2, 0.7), dvector![0.1, 0.4]);
        let factor = BoundaryFactor::new(target, DVector::zeros(5));
        let knot = Knot::new(
            Pose2Vector::new(SE2::from_xy_angle(1.0, 0.5, -0.4), dvector![0.6, -0.2]),
            dvector![0.3, -0.1, 0.2, 0.0, 0.5],
        );
        let analytic = analytic_jacobian(&factor, &[knot.clone()]);
        let numeric = numerical_jacobian(&factor, &[knot]);
        assert!((analytic - numeric).norm() < 1e-6);
    }
}
