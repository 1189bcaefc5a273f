//! Trajectory optimization settings.

use crate::optimizer::OptimizerConfig;
use nalgebra::{DMatrix, DVector};

/// Joint position limits, applied to the joint block of every knot pose.
#[derive(Debug, Clone, PartialEq)]
pub struct JointLimits {
    pub lower: DVector<f64>,
    pub upper: DVector<f64>,
    /// Safety margin inside the limits at which the cost starts acting
    pub threshold: DVector<f64>,
    pub sigma: f64,
}

impl JointLimits {
    /// Limits with a zero safety margin and a sigma of `1e-3`.
    pub fn new(lower: DVector<f64>, upper: DVector<f64>) -> Self {
        let threshold = DVector::zeros(lower.len());
        Self {
            lower,
            upper,
            threshold,
            sigma: 1e-3,
        }
    }

    pub fn with_threshold(mut self, threshold: DVector<f64>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }
}

/// Symmetric velocity limits `|v_i| ≤ limits_i`, applied to every knot velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct VelocityLimits {
    pub limits: DVector<f64>,
    pub threshold: DVector<f64>,
    pub sigma: f64,
}

impl VelocityLimits {
    pub fn new(limits: DVector<f64>) -> Self {
        let threshold = DVector::zeros(limits.len());
        Self {
            limits,
            threshold,
            sigma: 1e-3,
        }
    }

    pub fn with_threshold(mut self, threshold: DVector<f64>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }
}

/// Settings of one batch trajectory optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajOptimizerConfig {
    /// Robot tangent dimension
    pub dof: usize,
    /// Number of intervals `N`; the trajectory has `N + 1` knots
    pub total_step: usize,
    /// Duration of the whole trajectory
    pub total_time: f64,
    /// Power spectral density `Q_c` of the constant-velocity prior (`dof × dof`)
    pub qc: DMatrix<f64>,
    /// Clearance `ε` added to every sphere radius
    pub epsilon: f64,
    /// Isotropic sigma of the obstacle factors; smaller weights obstacles more
    pub cost_sigma: f64,
    /// Number `M` of interpolated states checked inside every interval
    pub obs_check_inter: usize,
    /// Whether interpolated states are checked at all
    pub interpolated_checking: bool,
    pub joint_limits: Option<JointLimits>,
    pub velocity_limits: Option<VelocityLimits>,
    pub optimizer: OptimizerConfig,
}

impl TrajOptimizerConfig {
    pub fn new(dof: usize) -> Self {
        Self {
            dof,
            total_step: 10,
            total_time: 1.0,
            qc: DMatrix::identity(dof, dof),
            epsilon: 0.2,
            cost_sigma: 0.1,
            obs_check_inter: 0,
            interpolated_checking: true,
            joint_limits: None,
            velocity_limits: None,
            optimizer: OptimizerConfig::default(),
        }
    }

    pub fn with_total_step(mut self, total_step: usize) -> Self {
        self.total_step = total_step;
        self
    }

    pub fn with_total_time(mut self, total_time: f64) -> Self {
        self.total_time = total_time;
        self
    }

    pub fn with_qc(mut self, qc: DMatrix<f64>) -> Self {
        self.qc = qc;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_cost_sigma(mut self, cost_sigma: f64) -> Self {
        self.cost_sigma = cost_sigma;
        self
    }

    pub fn with_obs_check_inter(mut self, obs_check_inter: usize) -> Self {
        self.obs_check_inter = obs_check_inter;
        self
    }

    pub fn with_interpolated_checking(mut self, enabled: bool) -> Self {
        self.interpolated_checking = enabled;
        self
    }

    pub fn with_joint_limits(mut self, limits: JointLimits) -> Self {
        self.joint_limits = Some(limits);
        self
    }

    pub fn with_velocity_limits(mut self, limits: VelocityLimits) -> Self {
        self.velocity_limits = Some(limits);
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Time between consecutive knots.
    pub fn delta_t(&self) -> f64 {
        self.total_time / self.total_step as f64
    }

    /// Whether obstacle factors are placed between knots.
    pub fn checks_interpolated_states(&self) -> bool {
        self.interpolated_checking && self.obs_check_inter > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::OptimizerType;
    use nalgebra::dvector;

    #[test]
    fn test_defaults() {
        let config = TrajOptimizerConfig::new(3);
        assert_eq!(config.total_step, 10);
        assert_eq!(config.total_time, 1.0);
        assert_eq!(config.qc, DMatrix::identity(3, 3));
        assert_eq!(config.epsilon, 0.2);
        assert_eq!(config.cost_sigma, 0.1);
        assert_eq!(config.obs_check_inter, 0);
        assert!(config.interpolated_checking);
        assert!(!config.checks_interpolated_states());
        assert!(config.joint_limits.is_none());
        assert!((config.delta_t() - 0.1).abs() < 1e-15);
    }

    #[test]
    fn test_builder() {
        let config = TrajOptimizerConfig::new(2)
            .with_total_step(4)
            .with_total_time(2.0)
            .with_obs_check_inter(3)
            .with_velocity_limits(VelocityLimits::new(dvector![1.0, 1.0]).with_sigma(0.01))
            .with_optimizer(OptimizerConfig::new().with_optimizer_type(OptimizerType::DogLeg));

        assert_eq!(config.delta_t(), 0.5);
        assert!(config.checks_interpolated_states());
        assert_eq!(config.velocity_limits.as_ref().map(|l| l.sigma), Some(0.01));
        assert_eq!(config.optimizer.optimizer_type, OptimizerType::DogLeg);
        assert!(
            !config
                .with_interpolated_checking(false)
                .checks_interpolated_states()
        );
    }
}
