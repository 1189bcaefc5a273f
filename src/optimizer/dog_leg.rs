//! Dog Leg optimization algorithm implementation.
//!
//! The Dog Leg algorithm is a trust region method that combines the Gauss-Newton
//! direction with the steepest descent direction to find an optimal step within
//! a trust region:
//!
//! - the Gauss-Newton step `δ_gn` solves `H δ = -g`
//! - the Cauchy point `δ_sd = -α g`, `α = gᵀg / gᵀHg`, minimizes the model along `-g`
//! - inside the region `δ_gn` is taken; otherwise the step follows the polyline
//!   `0 → δ_sd → δ_gn` up to the region boundary

use crate::core::{LinearizedSystem, Problem, Trajectory};
use crate::error::PlannerResult;
use crate::linalg::SparseCholeskySolver;
use crate::manifold::Manifold;
use crate::optimizer::{
    ConvergenceInfo, OptimizationStatus, OptimizerConfig, Solver, SolverResult, check_convergence,
    check_initial, unchanged_result,
};
use faer::Mat;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Dog Leg solver for nonlinear least squares optimization.
pub struct DogLeg {
    config: OptimizerConfig,
    trust_region_radius: f64,
    trust_region_min: f64,
    trust_region_max: f64,
    trust_region_increase_factor: f64,
    trust_region_decrease_factor: f64,
}

impl DogLeg {
    /// Create a new Dog Leg solver with default configuration.
    pub fn new() -> Self {
        Self::with_config(OptimizerConfig::default())
    }

    /// Create a new Dog Leg solver with the given configuration.
    pub fn with_config(config: OptimizerConfig) -> Self {
        Self {
            config,
            trust_region_radius: 1.0,
            trust_region_min: 1e-12,
            trust_region_max: 1e12,
            trust_region_increase_factor: 2.0,
            trust_region_decrease_factor: 0.5,
        }
    }

    /// Set the initial trust region radius.
    pub fn with_trust_region_radius(mut self, radius: f64) -> Self {
        self.trust_region_radius = radius;
        self
    }

    /// Set the trust region radius bounds.
    pub fn with_trust_region_bounds(mut self, min: f64, max: f64) -> Self {
        self.trust_region_min = min;
        self.trust_region_max = max;
        self
    }

    /// Set the trust region adjustment factors.
    pub fn with_trust_region_factors(mut self, increase: f64, decrease: f64) -> Self {
        self.trust_region_increase_factor = increase;
        self.trust_region_decrease_factor = decrease;
        self
    }

    pub fn trust_region_radius(&self) -> f64 {
        self.trust_region_radius
    }

    /// Update trust region radius based on step quality
    fn update_trust_region(&mut self, rho: f64, step_norm: f64) {
        if rho > 0.75 {
            // Good step, let the region grow past the step just taken
            self.trust_region_radius = self
                .trust_region_radius
                .max(step_norm * self.trust_region_increase_factor)
                .min(self.trust_region_max);
        } else if rho < 0.25 || !rho.is_finite() {
            // Poor step, shrink around it
            self.trust_region_radius = step_norm * self.trust_region_decrease_factor;
        }
        // For 0.25 <= rho <= 0.75, keep trust region unchanged
    }

    /// Cauchy point `-α g` of the quadratic model.
    fn cauchy_point(system: &LinearizedSystem) -> Mat<f64> {
        let g = &system.gradient;
        let g_norm_sq = system.gradient_dot(g);
        let curvature = system.quadratic_form(g);
        let alpha = if curvature > 0.0 {
            g_norm_sq / curvature
        } else {
            // No positive curvature along g: fall back to a unit-length descent step
            1.0 / g_norm_sq.sqrt()
        };
        Mat::from_fn(g.nrows(), 1, |i, _| -alpha * g[(i, 0)])
    }

    /// Powell dogleg step for the current radius.
    fn dogleg_step(
        &self,
        gauss_newton: Option<&Mat<f64>>,
        steepest_descent: &Mat<f64>,
    ) -> Mat<f64> {
        let radius = self.trust_region_radius;
        if let Some(gn) = gauss_newton
            && gn.norm_l2() <= radius
        {
            return gn.clone();
        }

        let n = steepest_descent.nrows();
        let sd_norm = steepest_descent.norm_l2();
        let gn = match gauss_newton {
            Some(gn) if sd_norm < radius => gn,
            None if sd_norm <= radius => return steepest_descent.clone(),
            _ => {
                let scale = radius / sd_norm;
                return Mat::from_fn(n, 1, |i, _| scale * steepest_descent[(i, 0)]);
            }
        };

        // Find β ∈ [0, 1] with ‖δ_sd + β (δ_gn - δ_sd)‖ = radius
        let diff = Mat::from_fn(n, 1, |i, _| gn[(i, 0)] - steepest_descent[(i, 0)]);
        let a = diff.norm_l2().powi(2);
        let b = 2.0
            * (0..diff.nrows())
                .map(|i| steepest_descent[(i, 0)] * diff[(i, 0)])
                .sum::<f64>();
        let c = sd_norm * sd_norm - radius * radius;
        let beta = if a > 0.0 {
            ((-b + (b * b - 4.0 * a * c).max(0.0).sqrt()) / (2.0 * a)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Mat::from_fn(n, 1, |i, _| steepest_descent[(i, 0)] + beta * diff[(i, 0)])
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
        let mut final_gradient_norm;
        let mut final_parameter_update_norm = 0.0;

        if self.config.verbose {
            info!(
                "Starting Dog Leg: {} unknowns, {} residual blocks, initial cost {:.6e}, radius {:.3e}",
                layout.num_columns(),
                problem.num_residual_blocks(),
                initial_cost,
                self.trust_region_radius
            );
        }

        let status = loop {
            iteration += 1;
            let system = problem.linearize(&current, &layout)?;
            jacobian_evaluations += 1;
            final_gradient_norm = system.gradient_norm();
            if final_gradient_norm == 0.0 {
                break OptimizationStatus::Converged;
            }

            let gauss_newton =
                match linear_solver.solve_normal_equation(&system.hessian, &system.gradient) {
                    Ok(step) => Some(step),
                    Err(e) => {
                        debug!("Gauss-Newton step unavailable, using steepest descent: {}", e);
                        None
                    }
                };
            let steepest_descent = Self::cauchy_point(&system);

            // Shrink the region until the step decreases the cost
            let accepted = loop {
                let step = self.dogleg_step(gauss_newton.as_ref(), &steepest_descent);
                let step_norm = step.norm_l2();
                let predicted_reduction = system.predicted_reduction(&step);
                let candidate = layout.retract(&current, &step);
                let new_cost = problem.error(&candidate);
                cost_evaluations += 1;

                let actual_reduction = current_cost - new_cost;
                let rho = if predicted_reduction > 0.0 {
                    actual_reduction / predicted_reduction
                } else {
                    f64::NAN
                };
                self.update_trust_region(rho, step_norm);

                if new_cost.is_finite() && actual_reduction >= 0.0 {
                    break Some((candidate, new_cost, step_norm, rho));
                }
                debug!(
                    "Iteration {}: rejected step, cost {:.6e}, radius -> {:.3e}",
                    iteration, new_cost, self.trust_region_radius
                );
                if self.trust_region_radius < self.trust_region_min {
                    break None;
                }
            };

            let Some((candidate, new_cost, step_norm, rho)) = accepted else {
                warn!(
                    "Dog Leg stopped at iteration {}: trust region collapsed to {:.3e}",
                    iteration, self.trust_region_radius
                );
                break OptimizationStatus::NumericalFailure;
            };

            final_parameter_update_norm = step_norm;
            debug!(
                "Iteration {}: cost = {:.6e}, reduction = {:.6e}, radius = {:.6e}, step_norm = {:.6e}, rho = {:.3}",
                iteration,
                new_cost,
                current_cost - new_cost,
                self.trust_region_radius,
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
        if self.config.verbose {
            info!(
                "Dog Leg finished: {} after {} iterations, cost {:.6e} -> {:.6e} in {:?}",
                status, iteration, initial_cost, current_cost, elapsed
            );
        } else {
            debug!(
                "Dog Leg finished: {} after {} iterations, cost {:.6e} -> {:.6e}",
                status, iteration, initial_cost, current_cost
            );
        }

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

impl Default for DogLeg {
    fn default() -> Self {
        Self::new()
    }
}

impl Solver for DogLeg {
    type Config = OptimizerConfig;

    fn new(config: Self::Config) -> Self {
        Self::with_config(config)
    }

    fn minimize<P: Manifold>(
        &mut self,
        problem: &Problem<'_, P>,
        initial: &Trajectory<P>,
    ) -> PlannerResult<SolverResult<Trajectory<P>>> {
        DogLeg::minimize(self, problem, initial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::test_problems::rosenbrock_problem;

    fn column(values: &[f64]) -> Mat<f64> {
        Mat::from_fn(values.len(), 1, |i, _| values[i])
    }

    #[test]
    fn test_dog_leg_creation() {
        let solver = DogLeg::new();
        assert!(solver.trust_region_radius() > 0.0);
    }

    #[test]
    fn test_trust_region_configuration() {
        let solver = DogLeg::new()
            .with_trust_region_radius(2.0)
            .with_trust_region_bounds(1e-15, 1e15)
            .with_trust_region_factors(3.0, 0.25);

        assert_eq!(solver.trust_region_radius, 2.0);
        assert_eq!(solver.trust_region_min, 1e-15);
        assert_eq!(solver.trust_region_max, 1e15);
        assert_eq!(solver.trust_region_increase_factor, 3.0);
        assert_eq!(solver.trust_region_decrease_factor, 0.25);
    }

    #[test]
    fn test_dogleg_step_regions() {
        let solver = DogLeg::new().with_trust_region_radius(1.0);
        let sd = column(&[0.5, 0.0]);

        // Gauss-Newton point inside the region
        let gn = column(&[0.3, 0.4]);
        let step = solver.dogleg_step(Some(&gn), &sd);
        assert!((step[(0, 0)] - 0.3).abs() < 1e-12);

        // Both outside: scaled steepest descent
        let far_sd = column(&[2.0, 0.0]);
        let far_gn = column(&[3.0, 3.0]);
        let step = solver.dogleg_step(Some(&far_gn), &far_sd);
        assert!((step[(0, 0)] - 1.0).abs() < 1e-12);
        assert!(step[(1, 0)].abs() < 1e-12);

        // Blend lands on the boundary
        let gn = column(&[0.5, 2.0]);
        let step = solver.dogleg_step(Some(&gn), &sd);
        assert!((step.norm_l2() - 1.0).abs() < 1e-12);
        assert!((step[(0, 0)] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_trust_region_update() {
        let mut solver = DogLeg::new();
        solver.update_trust_region(0.9, 0.8);
        assert!((solver.trust_region_radius - 1.6).abs() < 1e-12);
        solver.update_trust_region(0.5, 0.8);
        assert!((solver.trust_region_radius - 1.6).abs() < 1e-12);
        solver.update_trust_region(0.1, 0.8);
        assert!((solver.trust_region_radius - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_rosenbrock_optimization() {
        let (problem, initial) = rosenbrock_problem([-1.2, 1.0]);
        let config = OptimizerConfig::new()
            .with_max_iterations(500)
            .with_relative_error_tol(0.0)
            .with_absolute_error_tol(0.0)
            .with_error_tol(1e-16);
        let result = DogLeg::with_config(config)
            .minimize(&problem, &initial)
            .unwrap();

        let pose = &result.parameters.knot(0).pose;
        assert!((pose[0] - 1.0).abs() < 1e-4);
        assert!((pose[1] - 1.0).abs() < 1e-4);
        assert!(result.final_cost < result.init_cost);
    }
}
