//! Gaussian-process motion prior: the constant-velocity (white-noise-on-acceleration)
//! model.
//!
//! The state is `x = [p; v]` and the acceleration is driven by white noise with power
//! spectral density `Q_c`. Over an interval `t`:
//!
//! ```text
//! Φ(t) = [[I, tI], [0, I]]
//! Q(t) = [[t³/3 Q_c, t²/2 Q_c], [t²/2 Q_c, t Q_c]]
//! Q(t)⁻¹ = [[12/t³ Q_c⁻¹, -6/t² Q_c⁻¹], [-6/t² Q_c⁻¹, 4/t Q_c⁻¹]]
//! ```
//!
//! Conditioning the process on two knots gives the interpolation operators
//! `Λ(τ) = Φ(τ) - Q(τ) Φ(Δt-τ)ᵀ Q(Δt)⁻¹ Φ(Δt)` and `Ψ(τ) = Q(τ) Φ(Δt-τ)ᵀ Q(Δt)⁻¹`,
//! implemented in closed form by [`GaussianProcessInterpolator`].

use nalgebra::{DMatrix, Matrix2};

pub mod interpolator;

pub use interpolator::{GaussianProcessInterpolator, InterpolationJacobians};

/// Expand a 2×2 scalar pattern into `[[a00 M, a01 M], [a10 M, a11 M]]`.
pub(crate) fn kron(pattern: &Matrix2<f64>, block: &DMatrix<f64>) -> DMatrix<f64> {
    let n = block.nrows();
    let mut result = DMatrix::zeros(2 * n, 2 * n);
    for i in 0..2 {
        for j in 0..2 {
            result
                .view_mut((i * n, j * n), (n, n))
                .copy_from(&(block * pattern[(i, j)]));
        }
    }
    result
}

/// Process noise covariance `Q(tau)`.
pub fn calc_q(qc: &DMatrix<f64>, tau: f64) -> DMatrix<f64> {
    let pattern = Matrix2::new(
        tau.powi(3) / 3.0,
        tau.powi(2) / 2.0,
        tau.powi(2) / 2.0,
        tau,
    );
    kron(&pattern, qc)
}

/// Inverse process noise covariance `Q(tau)⁻¹`, from the inverse of `Q_c`.
pub fn calc_q_inv(qc_inv: &DMatrix<f64>, tau: f64) -> DMatrix<f64> {
    let pattern = Matrix2::new(
        12.0 / tau.powi(3),
        -6.0 / tau.powi(2),
        -6.0 / tau.powi(2),
        4.0 / tau,
    );
    kron(&pattern, qc_inv)
}

/// State transition `Φ(tau)` for `dof` joints.
pub fn calc_phi(dof: usize, tau: f64) -> DMatrix<f64> {
    kron(&Matrix2::new(1.0, tau, 0.0, 1.0), &DMatrix::identity(dof, dof))
}

/// `Ψ(tau)` from the matrix formula, for an interval of length `delta_t`.
pub fn calc_psi(qc: &DMatrix<f64>, delta_t: f64, tau: f64) -> Option<DMatrix<f64>> {
    let dof = qc.nrows();
    let qc_inv = qc.clone().try_inverse()?;
    Some(
        calc_q(qc, tau)
            * calc_phi(dof, delta_t - tau).transpose()
            * calc_q_inv(&qc_inv, delta_t),
    )
}

/// `Λ(tau)` from the matrix formula, for an interval of length `delta_t`.
pub fn calc_lambda(qc: &DMatrix<f64>, delta_t: f64, tau: f64) -> Option<DMatrix<f64>> {
    let dof = qc.nrows();
    let psi = calc_psi(qc, delta_t, tau)?;
    Some(calc_phi(dof, tau) - psi * calc_phi(dof, delta_t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dmatrix;

    #[test]
    fn test_q_times_q_inv_is_identity() {
        let qc = dmatrix![2.0, 0.3; 0.3, 0.5];
        let qc_inv = qc.clone().try_inverse().unwrap();
        let product = calc_q(&qc, 0.4) * calc_q_inv(&qc_inv, 0.4);
        assert!((product - DMatrix::identity(4, 4)).norm() < 1e-9);
    }

    #[test]
    fn test_phi_composes() {
        let phi = calc_phi(2, 0.3) * calc_phi(2, 0.2);
        assert!((phi - calc_phi(2, 0.5)).norm() < 1e-12);
    }

    #[test]
    fn test_lambda_psi_boundaries() {
        let qc = DMatrix::identity(3, 3);
        let dt = 0.25;
        let lambda_start = calc_lambda(&qc, dt, 1e-9).unwrap();
        let psi_start = calc_psi(&qc, dt, 1e-9).unwrap();
        assert!((lambda_start - DMatrix::identity(6, 6)).norm() < 1e-6);
        assert!(psi_start.norm() < 1e-6);

        let lambda_end = calc_lambda(&qc, dt, dt).unwrap();
        let psi_end = calc_psi(&qc, dt, dt).unwrap();
        assert!(lambda_end.norm() < 1e-9);
        assert!((psi_end - DMatrix::identity(6, 6)).norm() < 1e-9);
    }
}
