//! Optimizer comparison on representative planning problems
//!
//! Runs Gauss-Newton, Levenberg-Marquardt and Dog Leg on the same trajectory problems
//! and reports wall-clock time, iterations, final error and residual collision cost.
//!
//! ## Scenarios
//! - Planar two-link arm swinging past a disc obstacle (bilinear planar field)
//! - Planar three-link arm with a tighter clearance and more intervals
//! - SE(2) mobile base with a two-link arm driving around the same disc
//!
//! ## Timing Methodology
//! - Field sampling, robot construction and initialization are excluded from timing
//! - Each configuration is run 5 times and the elapsed time is averaged
//!
//! Run with `cargo bench --bench solver_comparison`; `RUST_LOG=apex_planner=debug` adds
//! per-iteration logs.

use std::error::Error;
use std::f64::consts::{FRAC_PI_2, PI};
use std::hint::black_box;
use std::time::{Duration, Instant};
use tracing::info;

use apex_planner::core::Trajectory;
use apex_planner::init_logger;
use apex_planner::kinematics::{Arm, ArmModel, BodySphere, Pose2MobileArm, Pose2MobileArmModel};
use apex_planner::manifold::{Pose2Vector, SE2};
use apex_planner::optimizer::{OptimizerConfig, OptimizerType, SolverResult};
use apex_planner::planner::{
    JointLimits, TrajOptimizerConfig, batch_traj_optimize_2d_arm,
    batch_traj_optimize_pose2_mobile_arm_2d, collision_cost_2d_arm,
    collision_cost_pose2_mobile_arm_2d, init_straight_line,
};
use apex_planner::sdf::PlanarSdf;
use nalgebra::{DVector, Isometry3, Vector2, Vector3, dvector};

const NUM_RUNS: usize = 5;

const OPTIMIZERS: [OptimizerType; 3] = [
    OptimizerType::GaussNewton,
    OptimizerType::LevenbergMarquardt,
    OptimizerType::DogLeg,
];

struct BenchmarkResult {
    scenario: &'static str,
    optimizer: OptimizerType,
    elapsed: Duration,
    iterations: usize,
    status: String,
    init_cost: f64,
    final_cost: f64,
    collision_cost: f64,
}

/// Disc of radius 0.3 centered at (1.2, 1.2), sampled on [-4, 4]².
fn disc_field() -> Result<PlanarSdf, Box<dyn Error>> {
    let sdf = PlanarSdf::from_fn(Vector2::new(-4.0, -4.0), 0.02, 401, 401, |x, y| {
        ((x - 1.2).powi(2) + (y - 1.2).powi(2)).sqrt() - 0.3
    })?;
    Ok(sdf)
}

/// Spheres spaced evenly along every link of a planar arm.
fn planar_arm(link_lengths: DVector<f64>, per_link: usize) -> Result<ArmModel, Box<dyn Error>> {
    let mut spheres = Vec::new();
    for (link, length) in link_lengths.iter().enumerate() {
        for k in 0..per_link {
            let offset = -length * k as f64 / per_link as f64;
            spheres.push(BodySphere::new(link, 0.05, Vector3::new(offset, 0.0, 0.0)));
        }
    }
    Ok(ArmModel::new(Arm::planar(link_lengths)?, spheres)?)
}

fn average<T>(runs: &[SolverResult<T>]) -> Duration {
    runs.iter().map(|r| r.elapsed_time).sum::<Duration>() / runs.len().max(1) as u32
}

fn run_arm_scenario(
    scenario: &'static str,
    robot: &ArmModel,
    sdf: &PlanarSdf,
    end: DVector<f64>,
    config: TrajOptimizerConfig,
) -> Result<Vec<BenchmarkResult>, Box<dyn Error>> {
    let start = DVector::zeros(robot.arm().dof());
    let zero = DVector::zeros(robot.arm().dof());
    let init = init_straight_line(&start, &end, config.total_step, config.total_time)?;

    let mut results = Vec::new();
    for optimizer in OPTIMIZERS {
        let config = config
            .clone()
            .with_optimizer(OptimizerConfig::new().with_optimizer_type(optimizer));

        let mut runs = Vec::with_capacity(NUM_RUNS);
        for _ in 0..NUM_RUNS {
            let result = batch_traj_optimize_2d_arm(
                black_box(robot),
                sdf,
                &start,
                &zero,
                &end,
                &zero,
                &init,
                &config,
            )?;
            runs.push(result);
        }

        let elapsed = average(&runs);
        if let Some(last) = runs.pop() {
            let collision_cost = collision_cost_2d_arm(robot, sdf, &last.parameters, &config)?;
            results.push(BenchmarkResult {
                scenario,
                optimizer,
                elapsed,
                iterations: last.iterations,
                status: last.status.to_string(),
                init_cost: last.init_cost,
                final_cost: last.final_cost,
                collision_cost,
            });
        }
    }
    Ok(results)
}

fn run_mobile_scenario(sdf: &PlanarSdf) -> Result<Vec<BenchmarkResult>, Box<dyn Error>> {
    let arm = Arm::planar(dvector![0.5, 0.5])?;
    let spheres = vec![
        BodySphere::new(0, 0.3, Vector3::zeros()),
        BodySphere::new(1, 0.05, Vector3::new(-0.25, 0.0, 0.0)),
        BodySphere::new(1, 0.05, Vector3::zeros()),
        BodySphere::new(2, 0.05, Vector3::new(-0.25, 0.0, 0.0)),
        BodySphere::new(2, 0.05, Vector3::zeros()),
    ];
    let robot =
        Pose2MobileArmModel::new(Pose2MobileArm::new(arm, Isometry3::identity()), spheres)?;

    let config = TrajOptimizerConfig::new(5)
        .with_total_step(20)
        .with_total_time(10.0)
        .with_obs_check_inter(3)
        .with_joint_limits(JointLimits::new(dvector![-PI, -PI], dvector![PI, PI]));

    let start = Pose2Vector::new(SE2::from_xy_angle(0.0, 0.0, 0.0), dvector![0.0, 0.0]);
    let end = Pose2Vector::new(SE2::from_xy_angle(2.4, 2.4, FRAC_PI_2), dvector![0.5, -0.5]);
    let zero = DVector::zeros(5);
    let init: Trajectory<Pose2Vector> =
        init_straight_line(&start, &end, config.total_step, config.total_time)?;

    let mut results = Vec::new();
    for optimizer in OPTIMIZERS {
        let config = config
            .clone()
            .with_optimizer(OptimizerConfig::new().with_optimizer_type(optimizer));

        let mut runs = Vec::with_capacity(NUM_RUNS);
        for _ in 0..NUM_RUNS {
            runs.push(batch_traj_optimize_pose2_mobile_arm_2d(
                black_box(&robot),
                sdf,
                &start,
                &zero,
                &end,
                &zero,
                &init,
                &config,
            )?);
        }

        let elapsed = average(&runs);
        if let Some(last) = runs.pop() {
            let collision_cost =
                collision_cost_pose2_mobile_arm_2d(&robot, sdf, &last.parameters, &config)?;
            results.push(BenchmarkResult {
                scenario: "mobile-arm",
                optimizer,
                elapsed,
                iterations: last.iterations,
                status: last.status.to_string(),
                init_cost: last.init_cost,
                final_cost: last.final_cost,
                collision_cost,
            });
        }
    }
    Ok(results)
}

fn main() -> Result<(), Box<dyn Error>> {
    init_logger();

    info!("Starting optimizer comparison benchmark...");
    info!("Running each configuration {NUM_RUNS} times and averaging results...");

    let setup = Instant::now();
    let sdf = disc_field()?;
    let two_link = planar_arm(dvector![1.0, 1.0], 4)?;
    let three_link = planar_arm(dvector![0.8, 0.7, 0.5], 3)?;
    info!("Setup took {:.2} ms", setup.elapsed().as_secs_f64() * 1e3);

    let mut all_results = Vec::new();
    all_results.extend(run_arm_scenario(
        "2-link-arm",
        &two_link,
        &sdf,
        dvector![FRAC_PI_2, 0.0],
        TrajOptimizerConfig::new(2)
            .with_total_step(10)
            .with_total_time(5.0)
            .with_obs_check_inter(5),
    )?);
    all_results.extend(run_arm_scenario(
        "3-link-arm",
        &three_link,
        &sdf,
        dvector![FRAC_PI_2, 0.3, -0.3],
        TrajOptimizerConfig::new(3)
            .with_total_step(30)
            .with_total_time(5.0)
            .with_epsilon(0.1)
            .with_obs_check_inter(2),
    )?);
    all_results.extend(run_mobile_scenario(&sdf)?);

    info!("{}", "=".repeat(118));
    info!(
        "{:<12} {:<22} {:<12} {:<8} {:<24} {:<12} {:<12} {:<12}",
        "Scenario",
        "Optimizer",
        "Time (ms)",
        "Iters",
        "Status",
        "Init error",
        "Final error",
        "Collision"
    );
    info!("{}", "-".repeat(118));
    for result in &all_results {
        info!(
            "{:<12} {:<22} {:<12.3} {:<8} {:<24} {:<12.4e} {:<12.4e} {:<12.4e}",
            result.scenario,
            result.optimizer.to_string(),
            result.elapsed.as_secs_f64() * 1e3,
            result.iterations,
            result.status,
            result.init_cost,
            result.final_cost,
            result.collision_cost
        );
    }
    info!("{}", "=".repeat(118));
    Ok(())
}
