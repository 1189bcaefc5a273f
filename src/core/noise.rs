//! Noise models.
//!
//! A noise model turns a raw factor residual `r` into a whitened residual `W r`, so that
//! every factor contributes `½ ‖W r‖²` to the total error and `W J` to the linear system.

use crate::error::{PlannerError, PlannerResult};
use nalgebra::{DMatrix, DVector};

#[derive(Debug, Clone, PartialEq)]
pub enum NoiseModel {
    /// Same standard deviation on every residual component
    Isotropic { sigma: f64 },
    /// Full covariance, stored as the upper-triangular square root of the information
    Gaussian { sqrt_information: DMatrix<f64> },
    /// Hard equality. The problem holds the knots of a constrained block fixed, so the
    /// block never enters the linear system; its residual is counted unweighted.
    Constrained,
}

impl NoiseModel {
    pub fn isotropic(sigma: f64) -> PlannerResult<Self> {
        if !(sigma > 0.0 && sigma.is_finite()) {
            return Err(PlannerError::InvalidConfiguration(format!(
                "noise sigma must be positive, got {sigma}"
            )));
        }
        Ok(NoiseModel::Isotropic { sigma })
    }

    /// Gaussian model from an information (inverse covariance) matrix.
    pub fn from_information(information: DMatrix<f64>) -> PlannerResult<Self> {
        let cholesky = information.cholesky().ok_or_else(|| {
            PlannerError::InvalidConfiguration(
                "information matrix is not positive definite".to_string(),
            )
        })?;
        // Λ = L Lᵀ, so ‖Lᵀ r‖² = rᵀ Λ r
        Ok(NoiseModel::Gaussian {
            sqrt_information: cholesky.l().transpose(),
        })
    }

    pub fn is_constrained(&self) -> bool {
        matches!(self, NoiseModel::Constrained)
    }

    pub fn whiten(&self, residual: &DVector<f64>) -> DVector<f64> {
        match self {
            NoiseModel::Isotropic { sigma } => residual / *sigma,
            NoiseModel::Gaussian { sqrt_information } => sqrt_information * residual,
            NoiseModel::Constrained => residual.clone(),
        }
    }

    pub fn whiten_jacobian(&self, jacobian: &DMatrix<f64>) -> DMatrix<f64> {
        match self {
            NoiseModel::Isotropic { sigma } => jacobian / *sigma,
            NoiseModel::Gaussian { sqrt_information } => sqrt_information * jacobian,
            NoiseModel::Constrained => jacobian.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{dmatrix, dvector};

    #[test]
    fn test_isotropic_whitening() {
        let noise = NoiseModel::isotropic(0.5).unwrap();
        assert_eq!(noise.whiten(&dvector![1.0, -2.0]), dvector![2.0, -4.0]);
        assert!(NoiseModel::isotropic(0.0).is_err());
        assert!(NoiseModel::isotropic(-1.0).is_err());
    }

    #[test]
    fn test_gaussian_whitening_matches_mahalanobis() {
        let information = dmatrix![4.0, 1.0; 1.0, 3.0];
        let noise = NoiseModel::from_information(information.clone()).unwrap();
        let r = dvector![0.7, -1.3];
        let whitened = noise.whiten(&r);
        let mahalanobis = (r.transpose() * &information * &r)[(0, 0)];
        assert!((whitened.norm_squared() - mahalanobis).abs() < 1e-12);
    }

    #[test]
    fn test_non_positive_information_rejected() {
        assert!(NoiseModel::from_information(dmatrix![1.0, 2.0; 2.0, 1.0]).is_err());
    }
}
