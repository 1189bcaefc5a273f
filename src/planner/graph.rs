//! Factor graph assembly for batch trajectory optimization.
//!
//! For `N = total_step` intervals the graph holds, over knots `0..=N`:
//!
//! - hard boundary factors on knots `0` and `N` (both knots are fixed)
//! - a constant-velocity GP prior on every interval, weighted by `Q(Δt)⁻¹`
//! - an obstacle factor on every knot
//! - `M = obs_check_inter` interpolated obstacle factors per interval at `τ = j/(M+1)`,
//!   when interpolated checking is enabled
//! - optional joint position and velocity limit factors on every knot

use crate::core::{NoiseModel, Problem, Trajectory};
use crate::error::{PlannerError, PlannerResult};
use crate::factors::{
    BoundaryFactor, GaussianProcessPriorFactor, JointLimitFactor, ObstacleCost, ObstacleFactor,
    ObstacleFactorGP, VelocityLimitFactor,
};
use crate::gp::calc_q_inv;
use crate::kinematics::RobotModel;
use crate::manifold::Manifold;
use crate::planner::TrajOptimizerConfig;
use crate::sdf::SignedDistanceField;
use nalgebra::DVector;
use tracing::debug;

fn invalid(message: String) -> PlannerError {
    PlannerError::InvalidConfiguration(message)
}

/// Check settings and boundary conditions against the robot before anything is built.
pub fn validate_inputs<R: RobotModel>(
    robot: &R,
    start_conf: &R::Pose,
    start_vel: &DVector<f64>,
    end_conf: &R::Pose,
    end_vel: &DVector<f64>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<()> {
    let dof = robot.dof();
    if config.total_step < 1 {
        return Err(invalid("total_step must be at least 1".to_string()));
    }
    if !(config.total_time > 0.0 && config.total_time.is_finite()) {
        return Err(invalid(format!(
            "total_time must be positive, got {}",
            config.total_time
        )));
    }
    if config.dof != dof {
        return Err(invalid(format!(
            "settings are for {} DOF, robot has {}",
            config.dof, dof
        )));
    }
    for (name, actual) in [
        ("start configuration", start_conf.tangent_dim()),
        ("start velocity", start_vel.len()),
        ("end configuration", end_conf.tangent_dim()),
        ("end velocity", end_vel.len()),
    ] {
        if actual != dof {
            return Err(invalid(format!(
                "{name} has dimension {actual}, robot has {dof} DOF"
            )));
        }
    }
    if config.qc.shape() != (dof, dof) {
        return Err(invalid(format!(
            "Qc is {}x{}, expected {dof}x{dof}",
            config.qc.nrows(),
            config.qc.ncols()
        )));
    }
    if !(config.epsilon >= 0.0 && config.epsilon.is_finite()) {
        return Err(invalid(format!(
            "epsilon must be non-negative, got {}",
            config.epsilon
        )));
    }
    if !(config.cost_sigma > 0.0 && config.cost_sigma.is_finite()) {
        return Err(invalid(format!(
            "cost_sigma must be positive, got {}",
            config.cost_sigma
        )));
    }

    if let Some(limits) = &config.joint_limits {
        let joints = start_conf.joint_values().len();
        if limits.lower.len() != joints
            || limits.upper.len() != joints
            || limits.threshold.len() != joints
        {
            return Err(invalid(format!(
                "joint limits must have {joints} entries"
            )));
        }
        if limits.lower.iter().zip(limits.upper.iter()).any(|(l, u)| l > u) {
            return Err(invalid("joint lower limit above upper limit".to_string()));
        }
        if !(limits.sigma > 0.0) {
            return Err(invalid(format!(
                "joint limit sigma must be positive, got {}",
                limits.sigma
            )));
        }
    }
    if let Some(limits) = &config.velocity_limits {
        if limits.limits.len() != dof || limits.threshold.len() != dof {
            return Err(invalid(format!("velocity limits must have {dof} entries")));
        }
        if limits.limits.iter().any(|l| *l < 0.0) {
            return Err(invalid("velocity limits must be non-negative".to_string()));
        }
        if !(limits.sigma > 0.0) {
            return Err(invalid(format!(
                "velocity limit sigma must be positive, got {}",
                limits.sigma
            )));
        }
    }
    Ok(())
}

/// Check that an initial guess matches the settings.
pub fn validate_initial_values<P: Manifold>(
    init_values: &Trajectory<P>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<()> {
    if init_values.len() != config.total_step + 1 {
        return Err(invalid(format!(
            "initial trajectory has {} knots, expected {}",
            init_values.len(),
            config.total_step + 1
        )));
    }
    for (index, knot) in init_values.iter().enumerate() {
        if knot.pose.tangent_dim() != config.dof || knot.velocity.len() != config.dof {
            return Err(invalid(format!(
                "initial knot {index} has pose dimension {} and velocity dimension {}, expected {}",
                knot.pose.tangent_dim(),
                knot.velocity.len(),
                config.dof
            )));
        }
    }
    Ok(())
}

/// Build the trajectory factor graph.
///
/// The returned problem borrows `robot` and `sdf`; evaluate it on any trajectory of
/// `total_step + 1` knots with [`Problem::error`].
pub fn build_problem<'a, R, S>(
    robot: &'a R,
    sdf: &'a S,
    start_conf: &R::Pose,
    start_vel: &DVector<f64>,
    end_conf: &R::Pose,
    end_vel: &DVector<f64>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<Problem<'a, R::Pose>>
where
    R: RobotModel,
    S: SignedDistanceField,
{
    validate_inputs(robot, start_conf, start_vel, end_conf, end_vel, config)?;

    let dof = robot.dof();
    let total_step = config.total_step;
    let delta_t = config.delta_t();
    let mut problem = Problem::new();

    // Boundary conditions
    problem.add_residual_block(
        &[0],
        Box::new(BoundaryFactor::new(start_conf.clone(), start_vel.clone())),
        NoiseModel::Constrained,
    );
    problem.add_residual_block(
        &[total_step],
        Box::new(BoundaryFactor::new(end_conf.clone(), end_vel.clone())),
        NoiseModel::Constrained,
    );

    // GP prior
    let qc_inv = config
        .qc
        .clone()
        .try_inverse()
        .ok_or_else(|| invalid("Qc is not invertible".to_string()))?;
    let prior_noise = NoiseModel::from_information(calc_q_inv(&qc_inv, delta_t))?;
    for i in 0..total_step {
        problem.add_residual_block(
            &[i, i + 1],
            Box::new(GaussianProcessPriorFactor::new(dof, delta_t)),
            prior_noise.clone(),
        );
    }

    // Obstacles
    let cost = ObstacleCost::new(robot, sdf, config.epsilon);
    let obstacle_noise = NoiseModel::isotropic(config.cost_sigma)?;
    for i in 0..=total_step {
        problem.add_residual_block(
            &[i],
            Box::new(ObstacleFactor::new(cost)),
            obstacle_noise.clone(),
        );
    }
    if config.checks_interpolated_states() {
        let inter = config.obs_check_inter;
        for i in 0..total_step {
            for j in 1..=inter {
                let fraction = j as f64 / (inter + 1) as f64;
                problem.add_residual_block(
                    &[i, i + 1],
                    Box::new(ObstacleFactorGP::new(cost, delta_t, fraction)),
                    obstacle_noise.clone(),
                );
            }
        }
    }

    // Limits
    if let Some(limits) = &config.joint_limits {
        let noise = NoiseModel::isotropic(limits.sigma)?;
        for i in 0..=total_step {
            problem.add_residual_block(
                &[i],
                Box::new(JointLimitFactor::new(
                    limits.lower.clone(),
                    limits.upper.clone(),
                    limits.threshold.clone(),
                )),
                noise.clone(),
            );
        }
    }
    if let Some(limits) = &config.velocity_limits {
        let noise = NoiseModel::isotropic(limits.sigma)?;
        for i in 0..=total_step {
            problem.add_residual_block(
                &[i],
                Box::new(VelocityLimitFactor::new(
                    limits.limits.clone(),
                    limits.threshold.clone(),
                )),
                noise.clone(),
            );
        }
    }

    debug!(
        "Built trajectory graph: {} knots, {} residual blocks, {} residual rows",
        total_step + 1,
        problem.num_residual_blocks(),
        problem.total_residual_dimension
    );
    Ok(problem)
}
