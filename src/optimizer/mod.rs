//! Optimization solvers for the trajectory least-squares problem.
//!
//! This module provides three iterative algorithms over the sparse normal equations
//! produced by [`Problem::linearize`]:
//! - Levenberg-Marquardt algorithm
//! - Gauss-Newton algorithm
//! - Dog Leg algorithm (Powell's trust-region dogleg)
//!
//! All three share the same stopping rule and always hand back the best trajectory
//! seen, whatever the reason they stopped.

use crate::core::{Problem, Trajectory};
use crate::error::PlannerResult;
use crate::manifold::Manifold;
use std::fmt;
use std::time::Duration;

pub mod dog_leg;
pub mod gauss_newton;
pub mod levenberg_marquardt;

pub use dog_leg::DogLeg;
pub use gauss_newton::GaussNewton;
pub use levenberg_marquardt::LevenbergMarquardt;

/// Type of optimization solver algorithm to use
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerType {
    /// Levenberg-Marquardt algorithm (robust, adaptive damping)
    #[default]
    LevenbergMarquardt,
    /// Gauss-Newton algorithm (fast convergence, may be unstable)
    GaussNewton,
    /// Dog Leg algorithm (trust region method)
    DogLeg,
}

impl fmt::Display for OptimizerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerType::LevenbergMarquardt => write!(f, "Levenberg-Marquardt"),
            OptimizerType::GaussNewton => write!(f, "Gauss-Newton"),
            OptimizerType::DogLeg => write!(f, "Dog Leg"),
        }
    }
}

/// Optimizer settings shared by all algorithms.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Type of optimizer algorithm to use
    pub optimizer_type: OptimizerType,
    /// Maximum number of iterations
    pub max_iterations: usize,
    /// Stop when the error decreases by less than this fraction of the current error
    pub relative_error_tol: f64,
    /// Stop when the error decreases by less than this amount
    pub absolute_error_tol: f64,
    /// Stop when the error itself falls to or below this value
    pub error_tol: f64,
    /// Timeout duration
    pub timeout: Option<Duration>,
    /// Log progress at INFO level instead of DEBUG
    pub verbose: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            optimizer_type: OptimizerType::default(),
            max_iterations: 100,
            relative_error_tol: 1e-2,
            absolute_error_tol: 1e-5,
            error_tol: 0.0,
            timeout: None,
            verbose: false,
        }
    }
}

impl OptimizerConfig {
    /// Create a new solver configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the optimizer algorithm type
    pub fn with_optimizer_type(mut self, optimizer_type: OptimizerType) -> Self {
        self.optimizer_type = optimizer_type;
        self
    }

    /// Set the maximum number of iterations
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the relative error decrease tolerance
    pub fn with_relative_error_tol(mut self, relative_error_tol: f64) -> Self {
        self.relative_error_tol = relative_error_tol;
        self
    }

    /// Set the absolute error decrease tolerance
    pub fn with_absolute_error_tol(mut self, absolute_error_tol: f64) -> Self {
        self.absolute_error_tol = absolute_error_tol;
        self
    }

    /// Set the absolute error tolerance
    pub fn with_error_tol(mut self, error_tol: f64) -> Self {
        self.error_tol = error_tol;
        self
    }

    /// Set the timeout duration
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enable or disable verbose logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl fmt::Display for OptimizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OptimizerConfig {{ optimizer_type: {}, max_iterations: {}, relative_error_tol: {}, absolute_error_tol: {}, error_tol: {}, timeout: {:?}, verbose: {} }}",
            self.optimizer_type,
            self.max_iterations,
            self.relative_error_tol,
            self.absolute_error_tol,
            self.error_tol,
            self.timeout,
            self.verbose
        )
    }
}

/// Detailed convergence information.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceInfo {
    /// Final gradient norm
    pub final_gradient_norm: f64,
    /// Final parameter update norm
    pub final_parameter_update_norm: f64,
    /// Cost function evaluation count
    pub cost_evaluations: usize,
    /// Jacobian evaluation count
    pub jacobian_evaluations: usize,
}

impl fmt::Display for ConvergenceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Final gradient norm: {:.2e}, Final parameter update norm: {:.2e}, Cost evaluations: {}, Jacobian evaluations: {}",
            self.final_gradient_norm,
            self.final_parameter_update_norm,
            self.cost_evaluations,
            self.jacobian_evaluations
        )
    }
}

/// Status of an optimization process
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptimizationStatus {
    /// Error decrease fell below the relative or absolute tolerance
    Converged,
    /// Maximum number of iterations reached
    MaxIterationsReached,
    /// Error fell to or below the absolute error tolerance
    CostToleranceReached,
    /// Linear solve failed or damping/trust region saturated
    NumericalFailure,
    /// Timeout reached
    Timeout,
}

impl fmt::Display for OptimizationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationStatus::Converged => write!(f, "Converged"),
            OptimizationStatus::MaxIterationsReached => write!(f, "Maximum iterations reached"),
            OptimizationStatus::CostToleranceReached => write!(f, "Cost tolerance reached"),
            OptimizationStatus::NumericalFailure => write!(f, "Numerical failure"),
            OptimizationStatus::Timeout => write!(f, "Timeout"),
        }
    }
}

/// Result of a solver execution.
#[derive(Debug, Clone)]
pub struct SolverResult<T> {
    /// Final parameters
    pub parameters: T,
    /// Final optimization status
    pub status: OptimizationStatus,
    /// Initial cost value
    pub init_cost: f64,
    /// Final cost value
    pub final_cost: f64,
    /// Number of iterations performed
    pub iterations: usize,
    /// Total time elapsed
    pub elapsed_time: Duration,
    /// Convergence statistics
    pub convergence_info: Option<ConvergenceInfo>,
}

impl<T> SolverResult<T> {
    /// Whether the run ended on a tolerance rather than a limit or a failure.
    pub fn is_converged(&self) -> bool {
        matches!(
            self.status,
            OptimizationStatus::Converged | OptimizationStatus::CostToleranceReached
        )
    }
}

/// Core trait for optimization solvers.
pub trait Solver {
    /// Configuration type for this solver
    type Config;

    /// Create a new solver with the given configuration
    fn new(config: Self::Config) -> Self;

    /// Minimize the problem starting from `initial`, returning the best trajectory seen.
    fn minimize<P: Manifold>(
        &mut self,
        problem: &Problem<'_, P>,
        initial: &Trajectory<P>,
    ) -> PlannerResult<SolverResult<Trajectory<P>>>;
}

/// Run the algorithm selected by `config.optimizer_type`.
pub fn optimize<P: Manifold>(
    problem: &Problem<'_, P>,
    initial: &Trajectory<P>,
    config: &OptimizerConfig,
) -> PlannerResult<SolverResult<Trajectory<P>>> {
    match config.optimizer_type {
        OptimizerType::LevenbergMarquardt => {
            run_solver::<LevenbergMarquardt, P>(problem, initial, config)
        }
        OptimizerType::GaussNewton => run_solver::<GaussNewton, P>(problem, initial, config),
        OptimizerType::DogLeg => run_solver::<DogLeg, P>(problem, initial, config),
    }
}

/// Build solver `S` from `config` and minimize.
pub fn run_solver<S, P>(
    problem: &Problem<'_, P>,
    initial: &Trajectory<P>,
    config: &OptimizerConfig,
) -> PlannerResult<SolverResult<Trajectory<P>>>
where
    S: Solver<Config = OptimizerConfig>,
    P: Manifold,
{
    let mut solver = <S as Solver>::new(config.clone());
    solver.minimize(problem, initial)
}

/// Stopping rule applied after every accepted iteration.
///
/// Tolerances are checked first, so a run that converges on its last allowed iteration
/// reports convergence rather than the iteration cap.
pub(crate) fn check_convergence(
    config: &OptimizerConfig,
    iteration: usize,
    current_error: f64,
    new_error: f64,
    elapsed: Duration,
) -> Option<OptimizationStatus> {
    if new_error <= config.error_tol {
        return Some(OptimizationStatus::CostToleranceReached);
    }

    let absolute_decrease = current_error - new_error;
    let relative_decrease = if current_error > 0.0 {
        absolute_decrease / current_error
    } else {
        0.0
    };
    if absolute_decrease <= config.absolute_error_tol
        || relative_decrease <= config.relative_error_tol
    {
        return Some(OptimizationStatus::Converged);
    }

    if let Some(timeout) = config.timeout
        && elapsed >= timeout
    {
        return Some(OptimizationStatus::Timeout);
    }

    if iteration >= config.max_iterations {
        return Some(OptimizationStatus::MaxIterationsReached);
    }

    None
}

/// Outcome of a run that stops before the first iteration.
pub(crate) fn check_initial<P: Manifold>(
    config: &OptimizerConfig,
    problem: &Problem<'_, P>,
    initial: &Trajectory<P>,
    initial_cost: f64,
) -> Option<OptimizationStatus> {
    if initial_cost <= config.error_tol {
        return Some(OptimizationStatus::CostToleranceReached);
    }
    if problem.knot_layout(initial).num_columns() == 0 {
        return Some(OptimizationStatus::Converged);
    }
    if config.max_iterations == 0 {
        return Some(OptimizationStatus::MaxIterationsReached);
    }
    None
}

/// Result for a run that stops before iterating.
pub(crate) fn unchanged_result<P: Manifold>(
    initial: &Trajectory<P>,
    cost: f64,
    status: OptimizationStatus,
    elapsed: Duration,
) -> SolverResult<Trajectory<P>> {
    SolverResult {
        parameters: initial.clone(),
        status,
        init_cost: cost,
        final_cost: cost,
        iterations: 0,
        elapsed_time: elapsed,
        convergence_info: Some(ConvergenceInfo {
            cost_evaluations: 1,
            ..Default::default()
        }),
    }
}

#[cfg(test)]
pub(crate) mod test_problems {
    use crate::core::{Knot, NoiseModel, Problem, Trajectory};
    use crate::factors::Factor;
    use nalgebra::{DMatrix, DVector, dvector};

    /// Rosenbrock residuals on the pose of one knot, plus a pull of its velocity to zero.
    pub struct RosenbrockFactor;

    impl Factor<DVector<f64>> for RosenbrockFactor {
        fn linearize(
            &self,
            knots: &[&Knot<DVector<f64>>],
            compute_jacobian: bool,
        ) -> (DVector<f64>, Option<DMatrix<f64>>) {
            let knot = knots[0];
            let (x, y) = (knot.pose[0], knot.pose[1]);
            let residual = dvector![
                10.0 * (y - x * x),
                1.0 - x,
                knot.velocity[0],
                knot.velocity[1]
            ];
            let jacobian = compute_jacobian.then(|| {
                DMatrix::from_row_slice(
                    4,
                    4,
                    &[
                        -20.0 * x, 10.0, 0.0, 0.0, //
                        -1.0, 0.0, 0.0, 0.0, //
                        0.0, 0.0, 1.0, 0.0, //
                        0.0, 0.0, 0.0, 1.0,
                    ],
                )
            });
            (residual, jacobian)
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    pub fn rosenbrock_problem(
        start: [f64; 2],
    ) -> (Problem<'static, DVector<f64>>, Trajectory<DVector<f64>>) {
        let mut problem = Problem::new();
        problem.add_residual_block(
            &[0],
            Box::new(RosenbrockFactor),
            NoiseModel::isotropic(1.0).unwrap(),
        );
        let initial = Trajectory::new(vec![Knot::new(
            dvector![start[0], start[1]],
            dvector![0.5, 0.5],
        )]);
        (problem, initial)
    }
}
