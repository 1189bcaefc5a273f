//! Levenberg-Marquardt algorithm implementation.
//!
//! The Levenberg-Marquardt algorithm is a popular optimization method for
//! nonlinear least squares problems. It interpolates between the Gauss-Newton
//! algorithm and gradient descent by adding a damping parameter.
//!
//! This implementation includes:
//! - Adaptive damping from the gain ratio (actual vs predicted reduction)
//! - Rejected steps retried within the same iteration at higher damping
//! - Regularized sparse Cholesky factorization
//! - An optimization summary logged at the end of the run

use crate::core::{Problem, Trajectory};
use crate::error::PlannerResult;
use crate::linalg::SparseCholeskySolver;
use crate::manifold::Manifold;
use crate::optimizer::{
    ConvergenceInfo, OptimizationStatus, OptimizerConfig, Solver, SolverResult, check_convergence,
    check_initial, unchanged_result,
};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Summary statistics for the Levenberg-Marquardt optimization process.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardtSummary {
    /// Initial cost value
    pub initial_cost: f64,
    /// Final cost value
    pub final_cost: f64,
    /// Total number of iterations performed
    pub iterations: usize,
    /// Number of successful steps (cost decreased)
    pub successful_steps: usize,
    /// Number of unsuccessful steps (cost increased, damping increased)
    pub unsuccessful_steps: usize,
    /// Final damping parameter value
    pub final_damping: f64,
    /// Maximum gradient norm encountered
    pub max_gradient_norm: f64,
    /// Final gradient norm
    pub final_gradient_norm: f64,
    /// Final parameter update norm
    pub final_parameter_update_norm: f64,
    /// Total time elapsed
    pub total_time: Duration,
    /// Why the run stopped
    pub status: OptimizationStatus,
}

impl fmt::Display for LevenbergMarquardtSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Levenberg-Marquardt Optimization Summary ===")?;
        writeln!(f, "Status:                    {}", self.status)?;
        writeln!(f, "Initial cost:              {:.6e}", self.initial_cost)?;
        writeln!(f, "Final cost:                {:.6e}", self.final_cost)?;
        writeln!(
            f,
            "Cost reduction:            {:.6e} ({:.2}%)",
            self.initial_cost - self.final_cost,
            100.0 * (self.initial_cost - self.final_cost) / self.initial_cost.max(1e-12)
        )?;
        writeln!(f, "Total iterations:          {}", self.iterations)?;
        writeln!(f, "Successful steps:          {}", self.successful_steps)?;
        writeln!(f, "Unsuccessful steps:        {}", self.unsuccessful_steps)?;
        writeln!(f, "Final damping parameter:   {:.6e}", self.final_damping)?;
        writeln!(
            f,
            "Max gradient norm:         {:.6e}",
            self.max_gradient_norm
        )?;
        writeln!(
            f,
            "Final gradient norm:       {:.6e}",
            self.final_gradient_norm
        )?;
        writeln!(
            f,
            "Final param update norm:   {:.6e}",
            self.final_parameter_update_norm
        )?;
        write!(f, "Total time:                {:?}", self.total_time)
    }
}

/// Levenberg-Marquardt solver for nonlinear least squares optimization.
pub struct LevenbergMarquardt {
    config: OptimizerConfig,
    damping: f64,
    damping_min: f64,
    damping_max: f64,
    damping_increase_factor: f64,
    damping_decrease_factor: f64,
    min_step_quality: f64,
    good_step_quality: f64,
}

impl LevenbergMarquardt {
    /// Create a new Levenberg-Marquardt solver with default configuration.
    pub fn new() -> Self {
        Self::with_config(OptimizerConfig::default())
    }

    /// Create a new Levenberg-Marquardt solver with the given configuration.
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self {
            config,
            damping: 1e-3,
            damping_min: 1e-12,
            damping_max: 1e12,
            damping_increase_factor: 10.0,
            damping_decrease_factor: 0.3,
            min_step_quality: 0.0,
            good_step_quality: 0.75,
        }
    }

    /// Set the initial damping parameter.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the damping parameter bounds.
    pub fn with_damping_bounds(mut self, min: f64, max: f64) -> Self {
        self.damping_min = min;
        self.damping_max = max;
        self
    }

    /// Set the damping adjustment factors.
    pub fn with_damping_factors(mut self, increase: f64, decrease: f64) -> Self {
        self.damping_increase_factor = increase;
        self.damping_decrease_factor = decrease;
        self
    }

    /// Set the gain ratio thresholds for accepting a step and for relaxing the damping.
    pub fn with_step_quality(mut self, min_quality: f64, good_quality: f64) -> Self {
        self.min_step_quality = min_quality;
        self.good_step_quality = good_quality;
        self
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    /// Update damping parameter based on step quality
    fn update_damping(&mut self, rho: f64) -> bool {
        if rho > self.good_step_quality {
            // Good step, decrease damping
            self.damping = (self.damping * self.damping_decrease_factor).max(self.damping_min);
            true
        } else if rho >= self.min_step_quality {
            // Acceptable step, keep damping unchanged
            true
        } else {
            // Poor step (or NaN cost), increase damping
            self.damping = (self.damping * self.damping_increase_factor).min(self.damping_max);
            false
        }
    }

    /// Compute step quality ratio (actual vs predicted reduction)
    fn compute_step_quality(current_cost: f64, new_cost: f64, predicted_reduction: f64) -> f64 {
        let actual_reduction = current_cost - new_cost;
        if predicted_reduction.abs() < 1e-15 {
            if actual_reduction >= 0.0 { 1.0 } else { -1.0 }
        } else {
            actual_reduction / predicted_reduction
        }
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
        let mut iteration = 0;
        let mut cost_evaluations = 1;
        let mut jacobian_evaluations = 0;
        let mut successful_steps = 0;
        let mut unsuccessful_steps = 0;
        let mut max_gradient_norm: f64 = 0.0;
        let mut final_gradient_norm;
        let mut final_parameter_update_norm = 0.0;

        if self.config.verbose {
            info!(
                "Starting Levenberg-Marquardt: {} unknowns, {} residual blocks, initial cost {:.6e}",
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
            max_gradient_norm = max_gradient_norm.max(final_gradient_norm);

            // Retry with increasing damping until a step is accepted or damping saturates
            let accepted = loop {
                let step = match linear_solver.solve_augmented_equation(
                    &system.hessian,
                    &system.gradient,
                    self.damping,
                ) {
                    Ok(step) => step,
                    Err(e) => {
                        debug!("Augmented solve failed at damping {:.3e}: {}", self.damping, e);
                        if self.damping >= self.damping_max {
                            break None;
                        }
                        self.damping =
                            (self.damping * self.damping_increase_factor).min(self.damping_max);
                        continue;
                    }
                };

                let step_norm = step.norm_l2();
                let predicted_reduction = system.predicted_reduction(&step);
                let candidate = layout.retract(&current, &step);
                let new_cost = problem.error(&candidate);
                cost_evaluations += 1;

                let rho = Self::compute_step_quality(current_cost, new_cost, predicted_reduction);
                if self.update_damping(rho) {
                    successful_steps += 1;
                    break Some((candidate, new_cost, step_norm, rho));
                }

                unsuccessful_steps += 1;
                debug!(
                    "Iteration {}: rejected step, cost {:.6e}, rho = {:.3}, damping -> {:.3e}",
                    iteration, new_cost, rho, self.damping
                );
                if self.damping >= self.damping_max {
                    break None;
                }
            };

            let Some((candidate, new_cost, step_norm, rho)) = accepted else {
                warn!(
                    "Levenberg-Marquardt stopped at iteration {}: damping saturated at {:.3e}",
                    iteration, self.damping
                );
                break OptimizationStatus::NumericalFailure;
            };

            final_parameter_update_norm = step_norm;
            debug!(
                "Iteration {}: cost = {:.6e}, reduction = {:.6e}, damping = {:.6e}, step_norm = {:.6e}, rho = {:.3}",
                iteration,
                new_cost,
                current_cost - new_cost,
                self.damping,
                step_norm,
                rho
            );

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
        let summary = LevenbergMarquardtSummary {
            initial_cost,
            final_cost: current_cost,
            iterations: iteration,
            successful_steps,
            unsuccessful_steps,
            final_damping: self.damping,
            max_gradient_norm,
            final_gradient_norm,
            final_parameter_update_norm,
            total_time: elapsed,
            status: status.clone(),
        };
        if self.config.verbose {
            info!("\n{}", summary);
        } else {
            debug!("\n{}", summary);
        }

        // Accepted steps never increase the cost, so the current iterate is the best one
        Ok(SolverResult {
            parameters: current,
            status,
            init_cost: initial_cost,
            final_cost: current_cost,
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

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for LevenbergMarquardt {
    type Config = OptimizerConfig;

    fn new(config: Self::Config) -> Self {
        Self::with_config(config)
    }

    fn minimize<P: Manifold>(
        &mut self,
        problem: &Problem<'_, P>,
        initial: &Trajectory<P>,
    ) -> PlannerResult<SolverResult<Trajectory<P>>> {
        LevenbergMarquardt::minimize(self, problem, initial)
    }
}
