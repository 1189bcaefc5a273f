//! Gauss-Newton optimization algorithm implementation
//!
//! The Gauss-Newton algorithm is an iterative method for solving non-linear least squares problems.
//! It approximates the Hessian using only first-order derivatives and takes the full step
//! `H δ = -g` every iteration. Nothing guarantees the cost decreases, so the best iterate is
//! tracked and returned.

use crate::core::{Problem, Trajectory};
use crate::error::PlannerResult;
use crate::linalg::SparseCholeskySolver;
use crate::manifold::Manifold;
use crate::optimizer::{
    ConvergenceInfo, OptimizationStatus, OptimizerConfig, Solver, SolverResult, check_convergence,
    check_initial, unchanged_result,
};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Gauss-Newton solver for nonlinear least squares optimization.
pub struct GaussNewton {
    config: OptimizerConfig,
}

impl GaussNewton {
    /// Create a new Gauss-Newton solver with default configuration.
    pub fn new() -> Self {
        Self::with_config(OptimizerConfig::default())
    }

    /// Create a new Gauss-Newton solver with the given configuration.
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Minimize `problem` starting from `initial`.
    pub fn minimize<P: Manifold>(
        &mut self,
        problem: &Problem<'_, P>,
        initial: &Trajectory<P>,
    ) -> PlannerResult<SolverResult<Trajectory<P>>> {
        let start_time = Instant::now();
        let initial_cost = problem.error(initial);
        if let Some(status) = check_initial(&self.config, problem, initial, initial_cost) {
            return Ok(unchanged_result(initial, initial_cost, status, start_time.elapsed()));
        }

        let layout = problem.knot_layout(initial);
        let mut linear_solver = SparseCholeskySolver::new();
        let mut current = initial.clone();
        let mut current_cost = initial_cost;
        let mut best = initial.clone();
        let mut best_cost = initial_cost;
        let mut iteration = 0;
        let mut cost_evaluations = 1;
        let mut jacobian_evaluations = 0;
        let mut final_gradient_norm;
        let mut final_parameter_update_norm = 0.0;

        if self.config.verbose {
            info!(
                "Starting Gauss-Newton: {} unknowns, {} residual blocks, initial cost {:.6e}",
                layout.num_columns(),
                problem.num_residual_blocks(),
                initial_cost
            );
        }

        let status = loop {
            iteration += 1;
            let system = problem.linearize(&current, &layout)?;
            jacobian_evaluations += 1;
            final_gradient_norm = system.gradient_norm();

            let step = match linear_solver.solve_normal_equation(&system.hessian, &system.gradient)
            {
                Ok(step) => step,
                Err(e) => {
                    warn!("Gauss-Newton stopped at iteration {}: {}", iteration, e);
                    break OptimizationStatus::NumericalFailure;
                }
            };
            final_parameter_update_norm = step.norm_l2();

            let candidate = layout.retract(&current, &step);
            let new_cost = problem.error(&candidate);
            cost_evaluations += 1;
            if !new_cost.is_finite() {
                warn!(
                    "Gauss-Newton stopped at iteration {}: non-finite cost",
                    iteration
                );
                break OptimizationStatus::NumericalFailure;
            }

            debug!(
                "Iteration {}: cost = {:.6e}, reduction = {:.6e}, step_norm = {:.6e}, gradient_norm = {:.6e}",
                iteration,
                new_cost,
                current_cost - new_cost,
                final_parameter_update_norm,
                final_gradient_norm
            );

            if new_cost < best_cost {
                best = candidate.clone();
                best_cost = new_cost;
            }
            let previous_cost = current_cost;
            current = candidate;
            current_cost = new_cost;

            if let Some(status) = check_convergence(
                &self.config,
                iteration,
                previous_cost,
                new_cost,
                start_time.elapsed(),
            ) {
                break status;
            }
        };

        let elapsed = start_time.elapsed();
        if self.config.verbose {
            info!(
                "Gauss-Newton finished: {} after {} iterations, cost {:.6e} -> {:.6e} in {:?}",
                status, iteration, initial_cost, best_cost, elapsed
            );
        } else {
            debug!(
                "Gauss-Newton finished: {} after {} iterations, cost {:.6e} -> {:.6e}",
                status, iteration, initial_cost, best_cost
            );
        }

        Ok(SolverResult {
            parameters: best,
            status,
            init_cost: initial_cost,
            final_cost: best_cost,
            iterations: iteration,
            elapsed_time: elapsed,
            convergence_info: Some(ConvergenceInfo {
                final_gradient_norm,
                final_parameter_update_norm,
                cost_evaluations,
                jacobian_evaluations,
            }),
        })
    }
}

impl Default for GaussNewton {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for GaussNewton {
    type Config = OptimizerConfig;

    fn new(config: Self::Config) -> Self {
        Self::with_config(config)
    }

    fn minimize<P: Manifold>(
        &mut self,
        problem: &Problem<'_, P>,
        initial: &Trajectory<P>,
    ) -> PlannerResult<SolverResult<Trajectory<P>>> {
        GaussNewton::minimize(self, problem, initial)
    }
}
