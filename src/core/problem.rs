//! Trajectory least-squares problem.
//!
//! A [`Problem`] is a list of residual blocks over the knots of one trajectory plus the
//! set of knots held fixed. Each iteration it is linearized into the normal equations
//! `H δ = -g` with `H = Jᵀ J` and `g = Jᵀ r` (whitened), assembled as a faer sparse
//! matrix whose block columns are the free knots.

use std::collections::HashSet;

use faer::Mat;
use faer::sparse::{SparseColMat, Triplet};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;

use crate::core::{NoiseModel, ResidualBlock, Trajectory};
use crate::error::PlannerResult;
use crate::factors::Factor;
use crate::linalg::LinAlgError;
use crate::manifold::Manifold;

/// Column layout of the free knots in the linear system.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotLayout {
    offsets: Vec<Option<usize>>,
    num_columns: usize,
}

impl KnotLayout {
    pub fn new<P: Manifold>(trajectory: &Trajectory<P>, fixed_knots: &HashSet<usize>) -> Self {
        let mut offsets = Vec::with_capacity(trajectory.len());
        let mut num_columns = 0;
        for (index, knot) in trajectory.iter().enumerate() {
            if fixed_knots.contains(&index) {
                offsets.push(None);
            } else {
                offsets.push(Some(num_columns));
                num_columns += knot.tangent_dim();
            }
        }
        Self {
            offsets,
            num_columns,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.num_columns
    }

    /// First column of knot `index`, or `None` when the knot is fixed.
    pub fn offset(&self, index: usize) -> Option<usize> {
        self.offsets.get(index).copied().flatten()
    }

    /// Apply a stacked step to every free knot.
    pub fn retract<P: Manifold>(
        &self,
        trajectory: &Trajectory<P>,
        step: &Mat<f64>,
    ) -> Trajectory<P> {
        trajectory
            .iter()
            .enumerate()
            .map(|(index, knot)| match self.offset(index) {
                Some(offset) => {
                    let delta =
                        DVector::from_fn(knot.tangent_dim(), |r, _| step[(offset + r, 0)]);
                    knot.retract(&delta)
                }
                None => knot.clone(),
            })
            .collect()
    }
}

/// Normal equations of one linearization.
pub struct LinearizedSystem {
    /// `H = Jᵀ J`, both triangles stored
    pub hessian: SparseColMat<usize, f64>,
    /// `g = Jᵀ r`
    pub gradient: Mat<f64>,
    /// `½ Σ ‖W r‖²` at the linearization point
    pub cost: f64,
    hessian_entries: Vec<Triplet<usize, usize, f64>>,
}

impl LinearizedSystem {
    pub fn num_columns(&self) -> usize {
        self.gradient.nrows()
    }

    pub fn gradient_norm(&self) -> f64 {
        self.gradient.norm_l2()
    }

    /// `gᵀ δ`
    pub fn gradient_dot(&self, step: &Mat<f64>) -> f64 {
        (0..self.num_columns())
            .map(|i| self.gradient[(i, 0)] * step[(i, 0)])
            .sum()
    }

    /// `δᵀ H δ`
    pub fn quadratic_form(&self, step: &Mat<f64>) -> f64 {
        self.hessian_entries
            .iter()
            .map(|t| t.val * step[(t.row, 0)] * step[(t.col, 0)])
            .sum()
    }

    /// Decrease of the local model `½‖r + J δ‖²` for the step `δ`.
    pub fn predicted_reduction(&self, step: &Mat<f64>) -> f64 {
        -self.gradient_dot(step) - 0.5 * self.quadratic_form(step)
    }
}

/// Per-block contribution, gathered in parallel and merged afterwards.
struct BlockContribution {
    cost: f64,
    hessian: Vec<Triplet<usize, usize, f64>>,
    gradient: Vec<(usize, f64)>,
}

pub struct Problem<'a, P: Manifold> {
    pub total_residual_dimension: usize,
    residual_blocks: Vec<ResidualBlock<'a, P>>,
    fixed_knots: HashSet<usize>,
}

impl<P: Manifold> Default for Problem<'_, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, P: Manifold> Problem<'a, P> {
    pub fn new() -> Self {
        Problem {
            total_residual_dimension: 0,
            residual_blocks: Vec::new(),
            fixed_knots: HashSet::new(),
        }
    }

    /// Add a factor over `knot_indices`. Knots touched by a
    /// [`NoiseModel::Constrained`] block are fixed.
    pub fn add_residual_block(
        &mut self,
        knot_indices: &[usize],
        factor: Box<dyn Factor<P> + 'a>,
        noise_model: NoiseModel,
    ) {
        let dimension = factor.dimension();
        if noise_model.is_constrained() {
            self.fixed_knots.extend(knot_indices.iter().copied());
        }
        self.residual_blocks.push(ResidualBlock::new(knot_indices, factor, noise_model));
        self.total_residual_dimension += dimension;
    }

    pub fn fix_knot(&mut self, index: usize) {
        self.fixed_knots.insert(index);
    }

    pub fn is_fixed(&self, index: usize) -> bool {
        self.fixed_knots.contains(&index)
    }

    pub fn num_residual_blocks(&self) -> usize {
        self.residual_blocks.len()
    }

    /// Total error `½ Σ ‖W r‖²`.
    pub fn error(&self, trajectory: &Trajectory<P>) -> f64 {
        0.5 * self
            .residual_blocks
            .par_iter()
            .map(|block| block.residual(trajectory).norm_squared())
            .sum::<f64>()
    }

    pub fn knot_layout(&self, trajectory: &Trajectory<P>) -> KnotLayout {
        KnotLayout::new(trajectory, &self.fixed_knots)
    }

    /// Linearize every residual block and assemble the normal equations.
    pub fn linearize(
        &self,
        trajectory: &Trajectory<P>,
        layout: &KnotLayout,
    ) -> PlannerResult<LinearizedSystem> {
        let contributions: Vec<BlockContribution> = self
            .residual_blocks
            .par_iter()
            .map(|block| Self::linearize_block(block, trajectory, layout))
            .collect();

        let n = layout.num_columns();
        let mut cost = 0.0;
        let mut gradient = Mat::<f64>::zeros(n, 1);
        let mut hessian_entries = Vec::new();
        for contribution in contributions {
            cost += contribution.cost;
            for (row, value) in contribution.gradient {
                gradient[(row, 0)] += value;
            }
            hessian_entries.extend(contribution.hessian);
        }

        let hessian = SparseColMat::try_new_from_triplets(n, n, &hessian_entries).map_err(|e| {
            LinAlgError::SparseMatrixCreation(format!("Failed to assemble Hessian: {e:?}"))
        })?;

        Ok(LinearizedSystem {
            hessian,
            gradient,
            cost,
            hessian_entries,
        })
    }

    fn linearize_block(
        block: &ResidualBlock<'a, P>,
        trajectory: &Trajectory<P>,
        layout: &KnotLayout,
    ) -> BlockContribution {
        // (global column, local column, width) of each free knot in this block
        let mut spans = Vec::with_capacity(block.knot_indices.len());
        let mut local = 0;
        for &index in &block.knot_indices {
            let width = trajectory.knot(index).tangent_dim();
            if let Some(offset) = layout.offset(index) {
                spans.push((offset, local, width));
            }
            local += width;
        }

        if spans.is_empty() {
            return BlockContribution {
                cost: 0.5 * block.residual(trajectory).norm_squared(),
                hessian: Vec::new(),
                gradient: Vec::new(),
            };
        }

        let (residual, jacobian): (DVector<f64>, DMatrix<f64>) =
            block.residual_and_jacobian(trajectory);
        let mut hessian = Vec::new();
        let mut gradient = Vec::new();
        for &(offset_a, local_a, width_a) in &spans {
            let jac_a = jacobian.columns(local_a, width_a);
            let g = jac_a.transpose() * &residual;
            gradient.extend((0..width_a).map(|i| (offset_a + i, g[i])));

            for &(offset_b, local_b, width_b) in &spans {
                let h = jac_a.transpose() * jacobian.columns(local_b, width_b);
                for c in 0..width_b {
                    for r in 0..width_a {
                        hessian.push(Triplet::new(offset_a + r, offset_b + c, h[(r, c)]));
                    }
                }
            }
        }

        BlockContribution {
            cost: 0.5 * residual.norm_squared(),
            hessian,
            gradient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Knot;
    use nalgebra::dvector;

    /// Pulls a 1-D knot pose towards a target: r = pose - target.
    struct PullFactor {
        target: f64,
    }

    impl Factor<DVector<f64>> for PullFactor {
        fn linearize(
            &self,
            knots: &[&Knot<DVector<f64>>],
            compute_jacobian: bool,
        ) -> (DVector<f64>, Option<DMatrix<f64>>) {
            let r = dvector![knots[0].pose[0] - self.target];
            let jac = compute_jacobian.then(|| DMatrix::from_row_slice(1, 2, &[1.0, 0.0]));
            (r, jac)
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    /// r = pose_b - pose_a
    struct DifferenceFactor;

    impl Factor<DVector<f64>> for DifferenceFactor {
        fn linearize(
            &self,
            knots: &[&Knot<DVector<f64>>],
            compute_jacobian: bool,
        ) -> (DVector<f64>, Option<DMatrix<f64>>) {
            let r = dvector![knots[1].pose[0] - knots[0].pose[0]];
            let jac = compute_jacobian
                .then(|| DMatrix::from_row_slice(1, 4, &[-1.0, 0.0, 1.0, 0.0]));
            (r, jac)
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    fn three_knots() -> Trajectory<DVector<f64>> {
        (0..3)
            .map(|i| Knot::new(dvector![i as f64], dvector![0.0]))
            .collect()
    }

    #[test]
    fn test_error_sums_whitened_residuals() {
        let mut problem: Problem<DVector<f64>> = Problem::new();
        problem.add_residual_block(
            &[1],
            Box::new(PullFactor { target: 3.0 }),
            NoiseModel::isotropic(0.5).unwrap(),
        );
        // r = 1 - 3 = -2, whitened -4, error 8
        assert!((problem.error(&three_knots()) - 8.0).abs() < 1e-12);
        assert_eq!(problem.total_residual_dimension, 1);
    }

    #[test]
    fn test_layout_skips_fixed_knots() {
        let mut problem: Problem<DVector<f64>> = Problem::new();
        problem.fix_knot(0);
        let layout = problem.knot_layout(&three_knots());
        assert_eq!(layout.offset(0), None);
        assert_eq!(layout.offset(1), Some(0));
        assert_eq!(layout.offset(2), Some(2));
        assert_eq!(layout.num_columns(), 4);
    }

    #[test]
    fn test_constrained_block_fixes_knots() {
        let mut problem: Problem<DVector<f64>> = Problem::new();
        problem.add_residual_block(
            &[2],
            Box::new(PullFactor { target: 2.0 }),
            NoiseModel::Constrained,
        );
        assert!(problem.is_fixed(2));
        assert!(!problem.is_fixed(1));
        assert_eq!(problem.num_residual_blocks(), 1);
    }

    #[test]
    fn test_linearize_assembles_normal_equations() {
        let mut problem: Problem<DVector<f64>> = Problem::new();
        problem.fix_knot(0);
        let noise = NoiseModel::isotropic(1.0).unwrap();
        problem.add_residual_block(&[0, 1], Box::new(DifferenceFactor), noise.clone());
        problem.add_residual_block(&[1, 2], Box::new(DifferenceFactor), noise.clone());
        problem.add_residual_block(&[2], Box::new(PullFactor { target: 0.0 }), noise);

        let trajectory = three_knots();
        let layout = problem.knot_layout(&trajectory);
        let system = problem.linearize(&trajectory, &layout).unwrap();

        // residuals: 1, 1, 2 -> cost 3
        assert!((system.cost - 3.0).abs() < 1e-12);
        assert!((system.cost - problem.error(&trajectory)).abs() < 1e-12);
        // g over pose columns of knots 1 and 2: [1 - 1, 1 + 2]
        assert!((system.gradient[(0, 0)] - 0.0).abs() < 1e-12);
        assert!((system.gradient[(2, 0)] - 3.0).abs() < 1e-12);

        let mut step = Mat::<f64>::zeros(4, 1);
        step[(0, 0)] = 1.0;
        step[(2, 0)] = 1.0;
        // H restricted to pose columns: [[2, -1], [-1, 2]]
        assert!((system.quadratic_form(&step) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_retract_moves_only_free_knots() {
        let mut problem: Problem<DVector<f64>> = Problem::new();
        problem.fix_knot(1);
        let trajectory = three_knots();
        let layout = problem.knot_layout(&trajectory);
        let step = Mat::from_fn(layout.num_columns(), 1, |i, _| i as f64 + 1.0);
        let moved = layout.retract(&trajectory, &step);
        assert_eq!(moved.knot(0).pose, dvector![1.0]);
        assert_eq!(moved.knot(0).velocity, dvector![2.0]);
        assert_eq!(moved.knot(1), trajectory.knot(1));
        assert_eq!(moved.knot(2).pose, dvector![5.0]);
    }
}
