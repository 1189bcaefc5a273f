//! Batch trajectory optimization entry points.
//!
//! [`batch_traj_optimize`] and [`collision_cost`] are generic over the robot model and
//! the signed distance field. The named functions below instantiate them for the
//! supported robot/field pairs:
//!
//! | Function suffix         | Robot                   | Field          |
//! | ----------------------- | ----------------------- | -------------- |
//! | `_2d_arm`               | [`ArmModel`]            | [`PlanarSdf`]  |
//! | `_3d_arm`               | [`ArmModel`]            | [`SpatialSdf`] |
//! | `_pose2_mobile_arm_2d`  | [`Pose2MobileArmModel`] | [`PlanarSdf`]  |
//! | `_pose2_mobile_arm`     | [`Pose2MobileArmModel`] | [`SpatialSdf`] |

use crate::core::{Knot, Trajectory};
use crate::error::{PlannerError, PlannerResult};
use crate::factors::ObstacleCost;
use crate::gp::GaussianProcessInterpolator;
use crate::kinematics::{ArmModel, Pose2MobileArmModel, RobotModel};
use crate::manifold::Pose2Vector;
use crate::optimizer::{SolverResult, optimize};
use crate::planner::TrajOptimizerConfig;
use crate::planner::graph::{build_problem, validate_initial_values};
use crate::sdf::{PlanarSdf, SignedDistanceField, SpatialSdf};
use nalgebra::DVector;
use tracing::{debug, info};

/// Optimize a trajectory from `start` to `end` around the obstacles of `sdf`.
///
/// `init_values` is only read: it is cloned, its first and last knots are overwritten with
/// the boundary states, and the copy is optimized. The result holds the best trajectory
/// the configured optimizer reached, whatever the reason it stopped.
///
/// # Errors
///
/// [`PlannerError::InvalidConfiguration`](crate::error::PlannerError::InvalidConfiguration)
/// when the settings, boundary states or initial guess do not match the robot.
#[allow(clippy::too_many_arguments)]
pub fn batch_traj_optimize<R, S>(
    robot: &R,
    sdf: &S,
    start_conf: &R::Pose,
    start_vel: &DVector<f64>,
    end_conf: &R::Pose,
    end_vel: &DVector<f64>,
    init_values: &Trajectory<R::Pose>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<SolverResult<Trajectory<R::Pose>>>
where
    R: RobotModel,
    S: SignedDistanceField,
{
    let problem = build_problem(robot, sdf, start_conf, start_vel, end_conf, end_vel, config)?;
    validate_initial_values(init_values, config)?;

    let mut initial = init_values.clone();
    *initial.knot_mut(0) = Knot::new(start_conf.clone(), start_vel.clone());
    *initial.knot_mut(config.total_step) = Knot::new(end_conf.clone(), end_vel.clone());

    let result = optimize(&problem, &initial, &config.optimizer)?;
    if config.optimizer.verbose {
        info!(
            "{} finished: {} after {} iterations, error {:.6e} -> {:.6e}",
            config.optimizer.optimizer_type,
            result.status,
            result.iterations,
            result.init_cost,
            result.final_cost
        );
    } else {
        debug!(
            "{} finished: {} after {} iterations, error {:.6e} -> {:.6e}",
            config.optimizer.optimizer_type,
            result.status,
            result.iterations,
            result.init_cost,
            result.final_cost
        );
    }
    Ok(result)
}

/// Total unweighted obstacle hinge cost of `trajectory`.
///
/// Sums the cost of every body sphere at every knot and, when interpolated checking is
/// enabled, at the `obs_check_inter` interpolated states of every interval. The result is
/// zero exactly when no obstacle factor of the corresponding graph is active.
pub fn collision_cost<R, S>(
    robot: &R,
    sdf: &S,
    trajectory: &Trajectory<R::Pose>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<f64>
where
    R: RobotModel,
    S: SignedDistanceField,
{
    if config.dof != robot.dof() {
        return Err(PlannerError::InvalidConfiguration(format!(
            "settings are for {} DOF, robot has {}",
            config.dof,
            robot.dof()
        )));
    }
    validate_initial_values(trajectory, config)?;

    let cost = ObstacleCost::new(robot, sdf, config.epsilon);
    let mut total: f64 = trajectory.poses().map(|pose| cost.total_cost(pose)).sum();

    if config.checks_interpolated_states() {
        let delta_t = config.delta_t();
        let inter = config.obs_check_inter;
        let interpolators: Vec<GaussianProcessInterpolator> = (1..=inter)
            .map(|j| GaussianProcessInterpolator::new(delta_t, j as f64 / (inter + 1) as f64))
            .collect();
        for pair in trajectory.knots().windows(2) {
            let (k1, k2) = (&pair[0], &pair[1]);
            for interpolator in &interpolators {
                let (pose, _) = interpolator.interpolate(
                    &k1.pose,
                    &k1.velocity,
                    &k2.pose,
                    &k2.velocity,
                    None,
                );
                total += cost.total_cost(&pose);
            }
        }
    }
    Ok(total)
}

/// [`batch_traj_optimize`] for a fixed-base arm in a planar field.
#[allow(clippy::too_many_arguments)]
pub fn batch_traj_optimize_2d_arm(
    arm: &ArmModel,
    sdf: &PlanarSdf,
    start_conf: &DVector<f64>,
    start_vel: &DVector<f64>,
    end_conf: &DVector<f64>,
    end_vel: &DVector<f64>,
    init_values: &Trajectory<DVector<f64>>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<SolverResult<Trajectory<DVector<f64>>>> {
    batch_traj_optimize(
        arm,
        sdf,
        start_conf,
        start_vel,
        end_conf,
        end_vel,
        init_values,
        config,
    )
}

/// [`batch_traj_optimize`] for a fixed-base arm in a 3D voxel field.
#[allow(clippy::too_many_arguments)]
pub fn batch_traj_optimize_3d_arm(
    arm: &ArmModel,
    sdf: &SpatialSdf,
    start_conf: &DVector<f64>,
    start_vel: &DVector<f64>,
    end_conf: &DVector<f64>,
    end_vel: &DVector<f64>,
    init_values: &Trajectory<DVector<f64>>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<SolverResult<Trajectory<DVector<f64>>>> {
    batch_traj_optimize(
        arm,
        sdf,
        start_conf,
        start_vel,
        end_conf,
        end_vel,
        init_values,
        config,
    )
}

/// [`batch_traj_optimize`] for an SE(2) mobile manipulator in a planar field.
#[allow(clippy::too_many_arguments)]
pub fn batch_traj_optimize_pose2_mobile_arm_2d(
    marm: &Pose2MobileArmModel,
    sdf: &PlanarSdf,
    start_conf: &Pose2Vector,
    start_vel: &DVector<f64>,
    end_conf: &Pose2Vector,
    end_vel: &DVector<f64>,
    init_values: &Trajectory<Pose2Vector>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<SolverResult<Trajectory<Pose2Vector>>> {
    batch_traj_optimize(
        marm,
        sdf,
        start_conf,
        start_vel,
        end_conf,
        end_vel,
        init_values,
        config,
    )
}

/// [`batch_traj_optimize`] for an SE(2) mobile manipulator in a 3D voxel field.
#[allow(clippy::too_many_arguments)]
pub fn batch_traj_optimize_pose2_mobile_arm(
    marm: &Pose2MobileArmModel,
    sdf: &SpatialSdf,
    start_conf: &Pose2Vector,
    start_vel: &DVector<f64>,
    end_conf: &Pose2Vector,
    end_vel: &DVector<f64>,
    init_values: &Trajectory<Pose2Vector>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<SolverResult<Trajectory<Pose2Vector>>> {
    batch_traj_optimize(
        marm,
        sdf,
        start_conf,
        start_vel,
        end_conf,
        end_vel,
        init_values,
        config,
    )
}

/// [`collision_cost`] for a fixed-base arm in a planar field.
pub fn collision_cost_2d_arm(
    arm: &ArmModel,
    sdf: &PlanarSdf,
    trajectory: &Trajectory<DVector<f64>>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<f64> {
    collision_cost(arm, sdf, trajectory, config)
}

/// [`collision_cost`] for a fixed-base arm in a 3D voxel field.
pub fn collision_cost_3d_arm(
    arm: &ArmModel,
    sdf: &SpatialSdf,
    trajectory: &Trajectory<DVector<f64>>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<f64> {
    collision_cost(arm, sdf, trajectory, config)
}

/// [`collision_cost`] for an SE(2) mobile manipulator in a planar field.
pub fn collision_cost_pose2_mobile_arm_2d(
    marm: &Pose2MobileArmModel,
    sdf: &PlanarSdf,
    trajectory: &Trajectory<Pose2Vector>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<f64> {
    collision_cost(marm, sdf, trajectory, config)
}

/// [`collision_cost`] for an SE(2) mobile manipulator in a 3D voxel field.
pub fn collision_cost_pose2_mobile_arm(
    marm: &Pose2MobileArmModel,
    sdf: &SpatialSdf,
    trajectory: &Trajectory<Pose2Vector>,
    config: &TrajOptimizerConfig,
) -> PlannerResult<f64> {
    collision_cost(marm, sdf, trajectory, config)
}
