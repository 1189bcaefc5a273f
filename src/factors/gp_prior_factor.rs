//! Constant-velocity Gaussian process prior between two consecutive knots.
//!
//! With `r = p₂ ⊖ p₁` the error is
//!
//! ```text
//! e = [ Δt·v₁ - r ]
//!     [ v₁ - v₂   ]
//! ```
//!
//! which is zero exactly when the robot moves from `p₁` with constant velocity for
//! `Δt`. The factor is paired with a Gaussian noise model whose information matrix is
//! `Q⁻¹(Δt)` from [`calc_q_inv`](crate::gp::calc_q_inv).

use super::Factor;
use crate::core::Knot;
use crate::manifold::Manifold;
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, Copy)]
pub struct GaussianProcessPriorFactor {
    delta_t: f64,
    dof: usize,
}

impl GaussianProcessPriorFactor {
    pub fn new(dof: usize, delta_t: f64) -> Self {
        Self { delta_t, dof }
    }

    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }
}

impl<P: Manifold> Factor<P> for GaussianProcessPriorFactor {
    fn linearize(
        &self,
        knots: &[&Knot<P>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let (k1, k2) = (knots[0], knots[1]);
        let n = self.dof;

        let mut j_r_p2 = DMatrix::zeros(0, 0);
        let mut j_r_p1 = DMatrix::zeros(0, 0);
        let r = if compute_jacobian {
            k2.pose.minus(&k1.pose, Some(&mut j_r_p2), Some(&mut j_r_p1))
        } else {
            k2.pose.minus(&k1.pose, None, None)
        };

        let mut residual = DVector::zeros(2 * n);
        residual
            .rows_mut(0, n)
            .copy_from(&(&k1.velocity * self.delta_t - r));
        residual
            .rows_mut(n, n)
            .copy_from(&(&k1.velocity - &k2.velocity));

        let jacobian = compute_jacobian.then(|| {
            let identity = DMatrix::<f64>::identity(n, n);
            // Columns: [p₁ | v₁ | p₂ | v₂]
            let mut jac = DMatrix::zeros(2 * n, 4 * n);
            jac.view_mut((0, 0), (n, n)).copy_from(&-&j_r_p1);
            jac.view_mut((0, n), (n, n))
                .copy_from(&(&identity * self.delta_t));
            jac.view_mut((0, 2 * n), (n, n)).copy_from(&-&j_r_p2);
            jac.view_mut((n, n), (n, n)).copy_from(&identity);
            jac.view_mut((n, 3 * n), (n, n)).copy_from(&-&identity);
            jac
        });
        (residual, jacobian)
    }

    fn dimension(&self) -> usize {
        2 * self.dof
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NoiseModel;
    use crate::factors::test_utils::{analytic_jacobian, numerical_jacobian};
    use crate::gp::calc_q_inv;
    use crate::manifold::{Pose2Vector, SE2};
    use nalgebra::dvector;

    #[test]
    fn test_zero_error_on_constant_velocity() {
        let factor = GaussianProcessPriorFactor::new(2, 0.5);
        let k1 = Knot::new(dvector![0.0, 1.0], dvector![2.0, -1.0]);
        let k2 = Knot::new(dvector![1.0, 0.5], dvector![2.0, -1.0]);
        let (residual, _) = factor.linearize(&[&k1, &k2], false);
        assert!(residual.norm() < 1e-12);
    }

    #[test]
    fn test_whitened_error_matches_quadratic_form() {
        let dt = 0.25;
        let factor = GaussianProcessPriorFactor::new(1, dt);
        let k1 = Knot::new(dvector![0.0], dvector![0.0]);
        let k2 = Knot::new(dvector![1.0], dvector![1.0]);
        let (residual, _) = factor.linearize(&[&k1, &k2], false);

        let q_inv = calc_q_inv(&DMatrix::identity(1, 1), dt);
        let noise = NoiseModel::from_information(q_inv.clone()).unwrap();
        let whitened = noise.whiten(&residual);
        let expected = (residual.transpose() * &q_inv * &residual)[(0, 0)];
        assert!((whitened.norm_squared() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_jacobian_vector_space() {
        let factor = GaussianProcessPriorFactor::new(3, 0.4);
        let k1 = Knot::new(dvector![0.1, -0.3, 0.5], dvector![0.2, 0.0, -0.1]);
        let k2 = Knot::new(dvector![0.4, 0.2, 0.1], dvector![-0.3, 0.5, 0.2]);
        let analytic = analytic_jacobian(&factor, &[k1.clone(), k2.clone()]);
        let numeric = numerical_jacobian(&factor, &[k1, k2]);
        assert!((analytic - numeric).norm() < 1e-6);
    }

    #[test]
    fn test_jacobian_mobile_pose() {
        let factor = GaussianProcessPriorFactor::new(4, 0.3);
        let k1 = Knot::new(
            Pose2Vector::new(SE2::from_xy_angle(0.0, 0.2, 0.3), dvector![0.1]),
            dvector![0.5, 0.1, 0.2, -0.4],
        );
        let k2 = Knot::new(
            Pose2Vector::new(SE2::from_xy_angle(0.4, 0.1, 0.9), dvector![-0.2]),
            dvector![0.3, 0.0, -0.1, 0.2],
        );
        let analytic = analytic_jacobian(&factor, &[k1.clone(), k2.clone()]);
        let numeric = numerical_jacobian(&factor, &[k1, k2]);
        assert!((analytic - numeric).norm() < 1e-6);
    }
}
