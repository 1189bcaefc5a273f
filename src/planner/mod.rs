//! GPMP2-style batch trajectory planning.
//!
//! A trajectory is a sequence of `(pose, velocity)` knots evenly spaced in time. Planning
//! builds a factor graph over the knots (boundary conditions, constant-velocity GP prior,
//! obstacle clearance, optional limits) and hands it to one of the nonlinear least-squares
//! optimizers.
//!
//! ```no_run
//! use apex_planner::kinematics::{Arm, ArmModel, BodySphere};
//! use apex_planner::planner::{TrajOptimizerConfig, batch_traj_optimize_2d_arm, init_straight_line};
//! use apex_planner::sdf::PlanarSdf;
//! use nalgebra::{DVector, Vector2, Vector3, dvector};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let arm = Arm::planar(dvector![1.0, 1.0])?;
//! let robot = ArmModel::new(arm, vec![BodySphere::new(1, 0.1, Vector3::zeros())])?;
//! let sdf = PlanarSdf::from_fn(Vector2::new(-3.0, -3.0), 0.05, 121, 121, |x, y| {
//!     ((x - 1.0).powi(2) + (y - 1.0).powi(2)).sqrt() - 0.3
//! })?;
//!
//! let start = dvector![0.0, 0.0];
//! let end = dvector![1.5, 0.0];
//! let zero = DVector::zeros(2);
//! let config = TrajOptimizerConfig::new(2).with_obs_check_inter(5);
//! let init = init_straight_line(&start, &end, config.total_step, config.total_time)?;
//!
//! let result = batch_traj_optimize_2d_arm(&robot, &sdf, &start, &zero, &end, &zero, &init, &config)?;
//! println!("{}: error {:.3e}", result.status, result.final_cost);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod graph;
pub mod traj_utils;

pub use batch::{
    batch_traj_optimize, batch_traj_optimize_2d_arm, batch_traj_optimize_3d_arm,
    batch_traj_optimize_pose2_mobile_arm, batch_traj_optimize_pose2_mobile_arm_2d,
    collision_cost, collision_cost_2d_arm, collision_cost_3d_arm,
    collision_cost_pose2_mobile_arm, collision_cost_pose2_mobile_arm_2d,
};
pub use config::{JointLimits, TrajOptimizerConfig, VelocityLimits};
pub use graph::{build_problem, validate_initial_values, validate_inputs};
pub use traj_utils::{init_straight_line, interpolate_trajectory};
