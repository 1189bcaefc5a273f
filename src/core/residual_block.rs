use nalgebra::{DMatrix, DVector};

use crate::core::{Knot, NoiseModel, Trajectory};
use crate::factors::Factor;
use crate::manifold::Manifold;

pub struct ResidualBlock<'a, P: Manifold> {
    pub knot_indices: Vec<usize>,
    pub factor: Box<dyn Factor<P> + 'a>,
    pub noise_model: NoiseModel,
}

impl<'a, P: Manifold> ResidualBlock<'a, P> {
    pub fn new(
        knot_indices: &[usize],
        factor: Box<dyn Factor<P> + 'a>,
        noise_model: NoiseModel,
    ) -> Self {
        ResidualBlock {
            knot_indices: knot_indices.to_vec(),
            factor,
            noise_model,
        }
    }

    fn gather<'t>(&self, trajectory: &'t Trajectory<P>) -> Vec<&'t Knot<P>> {
        self.knot_indices
            .iter()
            .map(|&i| trajectory.knot(i))
            .collect()
    }

    /// Whitened residual.
    pub fn residual(&self, trajectory: &Trajectory<P>) -> DVector<f64> {
        let knots = self.gather(trajectory);
        let (residual, _) = self.factor.linearize(&knots, false);
        self.noise_model.whiten(&residual)
    }

    /// Whitened residual and Jacobian.
    pub fn residual_and_jacobian(
        &self,
        trajectory: &Trajectory<P>,
    ) -> (DVector<f64>, DMatrix<f64>) {
        let knots = self.gather(trajectory);
        let (residual, jacobian) = self.factor.linearize(&knots, true);
        let width: usize = knots.iter().map(|k| k.tangent_dim()).sum();
        let jacobian = jacobian.unwrap_or_else(|| DMatrix::zeros(residual.len(), width));
        (
            self.noise_model.whiten(&residual),
            self.noise_model.whiten_jacobian(&jacobian),
        )
    }
}
