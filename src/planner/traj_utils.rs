//! Trajectory initialization and densification helpers.

use crate::core::{Knot, Trajectory};
use crate::error::{PlannerError, PlannerResult};
use crate::gp::GaussianProcessInterpolator;
use crate::manifold::Manifold;

/// Constant-velocity trajectory from `start` to `end` with `total_step + 1` knots.
///
/// Knot `i` is `start ⊕ (i/N)(end ⊖ start)` and every knot carries the velocity
/// `(end ⊖ start) / total_time`.
pub fn init_straight_line<P: Manifold>(
    start: &P,
    end: &P,
    total_step: usize,
    total_time: f64,
) -> PlannerResult<Trajectory<P>> {
    if total_step < 1 {
        return Err(PlannerError::InvalidConfiguration(
            "total_step must be at least 1".to_string(),
        ));
    }
    if !(total_time > 0.0 && total_time.is_finite()) {
        return Err(PlannerError::InvalidConfiguration(format!(
            "total_time must be positive, got {total_time}"
        )));
    }
    if start.tangent_dim() != end.tangent_dim() {
        return Err(PlannerError::InvalidConfiguration(format!(
            "start has dimension {}, end has dimension {}",
            start.tangent_dim(),
            end.tangent_dim()
        )));
    }

    let delta = end.minus(start, None, None);
    let velocity = &delta / total_time;
    Ok((0..=total_step)
        .map(|i| {
            let fraction = i as f64 / total_step as f64;
            Knot::new(start.plus(&(&delta * fraction), None, None), velocity.clone())
        })
        .collect())
}

/// Insert `inter_steps` GP-interpolated states into every interval of `trajectory`.
///
/// The result has `N·(inter_steps + 1) + 1` knots; the input knots are kept unchanged.
pub fn interpolate_trajectory<P: Manifold>(
    trajectory: &Trajectory<P>,
    total_time: f64,
    inter_steps: usize,
) -> PlannerResult<Trajectory<P>> {
    if trajectory.is_empty() {
        return Err(PlannerError::InvalidConfiguration(
            "cannot interpolate an empty trajectory".to_string(),
        ));
    }
    if !(total_time > 0.0 && total_time.is_finite()) {
        return Err(PlannerError::InvalidConfiguration(format!(
            "total_time must be positive, got {total_time}"
        )));
    }
    if trajectory.len() == 1 || inter_steps == 0 {
        return Ok(trajectory.clone());
    }

    let delta_t = total_time / trajectory.total_step() as f64;
    let interpolators: Vec<GaussianProcessInterpolator> = (1..=inter_steps)
        .map(|j| GaussianProcessInterpolator::new(delta_t, j as f64 / (inter_steps + 1) as f64))
        .collect();

    let mut knots = Vec::with_capacity(trajectory.total_step() * (inter_steps + 1) + 1);
    for pair in trajectory.knots().windows(2) {
        let (k1, k2) = (&pair[0], &pair[1]);
        knots.push(k1.clone());
        for interpolator in &interpolators {
            let (pose, velocity) =
                interpolator.interpolate(&k1.pose, &k1.velocity, &k2.pose, &k2.velocity, None);
            knots.push(Knot::new(pose, velocity));
        }
    }
    knots.extend(trajectory.knots().last().cloned());
    Ok(Trajectory::new(knots))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifold::{Pose2Vector, SE2};
    use nalgebra::dvector;

    #[test]
    fn test_straight_line_vector() {
        let trajectory =
            init_straight_line(&dvector![0.0, 1.0], &dvector![2.0, -1.0], 4, 2.0).unwrap();
        assert_eq!(trajectory.len(), 5);
        assert!((&trajectory.knot(2).pose - dvector![1.0, 0.0]).norm() < 1e-12);
        assert!((&trajectory.knot(4).pose - dvector![2.0, -1.0]).norm() < 1e-12);
        for velocity in trajectory.velocities() {
            assert!((velocity - dvector![1.0, -1.0]).norm() < 1e-12);
        }
    }

    #[test]
    fn test_straight_line_mobile_reaches_goal() {
        let start = Pose2Vector::new(SE2::from_xy_angle(0.0, 0.0, 0.0), dvector![0.0]);
        let end = Pose2Vector::new(SE2::from_xy_angle(1.0, 2.0, 1.2), dvector![0.5]);
        let trajectory = init_straight_line(&start, &end, 5, 1.0).unwrap();
        let last = &trajectory.knot(5).pose;
        assert!(last.minus(&end, None, None).norm() < 1e-9);
    }

    #[test]
    fn test_straight_line_rejects_bad_settings() {
        let a = dvector![0.0];
        assert!(init_straight_line(&a, &a, 0, 1.0).is_err());
        assert!(init_straight_line(&a, &a, 3, 0.0).is_err());
        assert!(init_straight_line(&a, &dvector![0.0, 1.0], 3, 1.0).is_err());
    }

    #[test]
    fn test_interpolate_straight_line() {
        let coarse =
            init_straight_line(&dvector![0.0, 0.0], &dvector![3.0, 6.0], 3, 3.0).unwrap();
        let dense = interpolate_trajectory(&coarse, 3.0, 2).unwrap();
        assert_eq!(dense.len(), 10);

        // A constant-velocity line is reproduced exactly by the GP interpolation
        let expected = init_straight_line(&dvector![0.0, 0.0], &dvector![3.0, 6.0], 9, 3.0)
            .unwrap();
        for (a, b) in dense.iter().zip(expected.iter()) {
            assert!((&a.pose - &b.pose).norm() < 1e-9);
            assert!((&a.velocity - &b.velocity).norm() < 1e-9);
        }
        assert_eq!(dense.knot(3), coarse.knot(1));
    }

    #[test]
    fn test_interpolate_single_knot() {
        let single = init_straight_line(&dvector![1.0], &dvector![1.0], 1, 1.0)
            .unwrap()
            .into_knots()
            .into_iter()
            .take(1)
            .collect::<Trajectory<_>>();
        assert_eq!(interpolate_trajectory(&single, 1.0, 3).unwrap(), single);
    }
}
