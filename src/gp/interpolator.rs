//! Closed-form GP interpolation between two trajectory knots.
//!
//! For the constant-velocity prior `Q_c` cancels out of `Λ` and `Ψ`, leaving 2×2 scalar
//! patterns (times the identity) that coincide with the cubic Hermite basis. With
//! `s = τ/Δt`:
//!
//! ```text
//! Λ = [[2s³ - 3s² + 1, (s³ - 2s² + s)Δt], [(6s² - 6s)/Δt, 3s² - 4s + 1]]
//! Ψ = [[-2s³ + 3s²,    (s³ - s²)Δt],      [(6s - 6s²)/Δt, 3s² - 2s]]
//! ```
//!
//! On a manifold the interpolated state is expressed relative to the first knot:
//!
//! ```text
//! r    = p₂ ⊖ p₁
//! p(τ) = p₁ ⊕ (Λ₀₁ v₁ + Ψ₀₀ r + Ψ₀₁ v₂)
//! v(τ) = Λ₁₁ v₁ + Ψ₁₀ r + Ψ₁₁ v₂
//! ```

use crate::manifold::Manifold;
use nalgebra::{DMatrix, DVector, Matrix2};

/// Jacobians of an interpolated state, ordered `[pose₁, velocity₁, pose₂, velocity₂]`.
#[derive(Debug, Clone)]
pub struct InterpolationJacobians {
    pub pose: [DMatrix<f64>; 4],
    pub velocity: [DMatrix<f64>; 4],
}

impl InterpolationJacobians {
    fn empty() -> Self {
        let zero = || DMatrix::zeros(0, 0);
        Self {
            pose: [zero(), zero(), zero(), zero()],
            velocity: [zero(), zero(), zero(), zero()],
        }
    }
}

impl Default for InterpolationJacobians {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GaussianProcessInterpolator {
    delta_t: f64,
    fraction: f64,
    lambda: Matrix2<f64>,
    psi: Matrix2<f64>,
}

impl GaussianProcessInterpolator {
    /// # Arguments
    /// * `delta_t` - Interval between the two knots
    /// * `fraction` - Position inside the interval, in [0, 1]
    pub fn new(delta_t: f64, fraction: f64) -> Self {
        let s = fraction;
        let (s2, s3) = (s * s, s * s * s);
        let lambda = Matrix2::new(
            2.0 * s3 - 3.0 * s2 + 1.0,
            (s3 - 2.0 * s2 + s) * delta_t,
            (6.0 * s2 - 6.0 * s) / delta_t,
            3.0 * s2 - 4.0 * s + 1.0,
        );
        let psi = Matrix2::new(
            -2.0 * s3 + 3.0 * s2,
            (s3 - s2) * delta_t,
            (6.0 * s - 6.0 * s2) / delta_t,
            3.0 * s2 - 2.0 * s,
        );
        Self {
            delta_t,
            fraction,
            lambda,
            psi,
        }
    }

    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Scalar pattern of `Λ`; the full operator is `Λ ⊗ I`.
    pub fn lambda(&self) -> &Matrix2<f64> {
        &self.lambda
    }

    /// Scalar pattern of `Ψ`; the full operator is `Ψ ⊗ I`.
    pub fn psi(&self) -> &Matrix2<f64> {
        &self.psi
    }

    /// Interpolated pose and velocity between `(pose1, vel1)` and `(pose2, vel2)`.
    pub fn interpolate<P: Manifold>(
        &self,
        pose1: &P,
        vel1: &DVector<f64>,
        pose2: &P,
        vel2: &DVector<f64>,
        jacobians: Option<&mut InterpolationJacobians>,
    ) -> (P, DVector<f64>) {
        let dim = pose1.tangent_dim();
        let mut j_r_p2 = DMatrix::zeros(0, 0);
        let mut j_r_p1 = DMatrix::zeros(0, 0);
        let r = pose2.minus(pose1, Some(&mut j_r_p2), Some(&mut j_r_p1));

        let xi = vel1 * self.lambda[(0, 1)] + &r * self.psi[(0, 0)] + vel2 * self.psi[(0, 1)];
        let mut j_plus_p1 = DMatrix::zeros(0, 0);
        let mut j_plus_xi = DMatrix::zeros(0, 0);
        let pose = pose1.plus(&xi, Some(&mut j_plus_p1), Some(&mut j_plus_xi));
        let velocity =
            vel1 * self.lambda[(1, 1)] + &r * self.psi[(1, 0)] + vel2 * self.psi[(1, 1)];

        if let Some(jac) = jacobians {
            let identity = DMatrix::<f64>::identity(dim, dim);
            jac.pose = [
                &j_plus_p1 + &j_plus_xi * (&j_r_p1 * self.psi[(0, 0)]),
                &j_plus_xi * self.lambda[(0, 1)],
                &j_plus_xi * (&j_r_p2 * self.psi[(0, 0)]),
                &j_plus_xi * self.psi[(0, 1)],
            ];
            jac.velocity = [
                &j_r_p1 * self.psi[(1, 0)],
                &identity * self.lambda[(1, 1)],
                &j_r_p2 * self.psi[(1, 0)],
                &identity * self.psi[(1, 1)],
            ];
        }
        (pose, velocity)
    }
}
