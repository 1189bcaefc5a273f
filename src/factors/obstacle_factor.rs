//! Obstacle clearance factors.
//!
//! The robot body is approximated by spheres. For sphere `k` with center `c_k` and
//! radius `r_k`, the clearance cost is the hinge
//!
//! ```text
//! h_k = ε + r_k - d(c_k)   if d(c_k) < ε + r_k
//!       0                  otherwise
//! ```
//!
//! where `d` is the signed distance field. [`ObstacleFactor`] applies the cost at a knot;
//! [`ObstacleFactorGP`] applies it at a GP-interpolated state between two knots, so that
//! collisions between knots are also penalized.

use super::Factor;
use crate::core::Knot;
use crate::gp::{GaussianProcessInterpolator, InterpolationJacobians};
use crate::kinematics::RobotModel;
use crate::manifold::Manifold;
use crate::sdf::{SdfSample, SignedDistanceField};
use nalgebra::{DMatrix, DVector, Matrix3xX, Vector3};
use tracing::debug;

/// Hinge loss on a signed distance.
///
/// # Returns
///
/// `(cost, ∂cost/∂distance)`
pub fn hinge_loss(distance: f64, eps_plus_radius: f64) -> (f64, f64) {
    if distance < eps_plus_radius {
        (eps_plus_radius - distance, -1.0)
    } else {
        (0.0, 0.0)
    }
}

/// Per-sphere clearance cost of a robot against a signed distance field.
pub struct ObstacleCost<'a, R: RobotModel, S: SignedDistanceField> {
    robot: &'a R,
    sdf: &'a S,
    epsilon: f64,
}

// Manual impls: the derives would require `R: Clone` and `S: Clone`.
impl<R: RobotModel, S: SignedDistanceField> Clone for ObstacleCost<'_, R, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R: RobotModel, S: SignedDistanceField> Copy for ObstacleCost<'_, R, S> {}

impl<'a, R: RobotModel, S: SignedDistanceField> ObstacleCost<'a, R, S> {
    pub fn new(robot: &'a R, sdf: &'a S, epsilon: f64) -> Self {
        Self {
            robot,
            sdf,
            epsilon,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn nr_spheres(&self) -> usize {
        self.robot.nr_body_spheres()
    }

    pub fn dof(&self) -> usize {
        self.robot.dof()
    }

    /// Hinge cost of every body sphere at `pose`.
    ///
    /// When `jacobian` is given it receives the `K × dof` derivative of the costs with
    /// respect to a tangent perturbation of `pose`.
    pub fn evaluate(
        &self,
        pose: &R::Pose,
        jacobian: Option<&mut DMatrix<f64>>,
    ) -> DVector<f64> {
        let nr_spheres = self.robot.nr_body_spheres();
        let mut center_jacobians = Vec::new();
        let centers = self.robot.sphere_centers(
            pose,
            jacobian.is_some().then_some(&mut center_jacobians),
        );

        let mut costs = DVector::zeros(nr_spheres);
        let mut gradients: Vec<Option<Vector3<f64>>> = Vec::with_capacity(nr_spheres);
        for (k, center) in centers.iter().enumerate() {
            let sample = self.query(center);
            let (cost, slope) =
                hinge_loss(sample.distance, self.epsilon + self.robot.sphere_radius(k));
            costs[k] = cost;
            gradients.push((slope != 0.0).then(|| sample.gradient * slope));
        }

        if let Some(jac) = jacobian {
            *jac = DMatrix::zeros(nr_spheres, self.robot.dof());
            for (k, gradient) in gradients.iter().enumerate() {
                if let Some(gradient) = gradient {
                    let center_jacobian: &Matrix3xX<f64> = &center_jacobians[k];
                    jac.row_mut(k)
                        .copy_from(&(gradient.transpose() * center_jacobian));
                }
            }
        }
        costs
    }

    /// Sum of the hinge costs at `pose`.
    pub fn total_cost(&self, pose: &R::Pose) -> f64 {
        self.evaluate(pose, None).sum()
    }

    fn query(&self, center: &Vector3<f64>) -> SdfSample {
        match self.sdf.signed_distance(center) {
            Ok(sample) => sample,
            Err(e) => {
                // Deepest penetration the field can express, pulling back into the domain
                debug!("{}; treating sphere as in collision", e);
                let inward = self.sdf.clamp(center) - center;
                let norm = inward.norm();
                SdfSample {
                    distance: -self.sdf.max_distance_magnitude(),
                    gradient: if norm > 0.0 {
                        inward / norm
                    } else {
                        Vector3::zeros()
                    },
                }
            }
        }
    }
}

/// Obstacle cost at a single knot.
pub struct ObstacleFactor<'a, R: RobotModel, S: SignedDistanceField> {
    cost: ObstacleCost<'a, R, S>,
}

impl<'a, R: RobotModel, S: SignedDistanceField> ObstacleFactor<'a, R, S> {
    pub fn new(cost: ObstacleCost<'a, R, S>) -> Self {
        Self { cost }
    }
}

impl<R: RobotModel, S: SignedDistanceField> Factor<R::Pose> for ObstacleFactor<'_, R, S> {
    fn linearize(
        &self,
        knots: &[&Knot<R::Pose>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let knot = knots[0];
        if !compute_jacobian {
            return (self.cost.evaluate(&knot.pose, None), None);
        }

        let mut j_pose = DMatrix::zeros(0, 0);
        let residual = self.cost.evaluate(&knot.pose, Some(&mut j_pose));
        let pose_dim = knot.pose.tangent_dim();
        // Velocity columns stay zero
        let mut jac = DMatrix::zeros(residual.len(), knot.tangent_dim());
        jac.columns_mut(0, pose_dim).copy_from(&j_pose);
        (residual, Some(jac))
    }

    fn dimension(&self) -> usize {
        self.cost.nr_spheres()
    }
}

/// Obstacle cost at a GP-interpolated state between two consecutive knots.
pub struct ObstacleFactorGP<'a, R: RobotModel, S: SignedDistanceField> {
    cost: ObstacleCost<'a, R, S>,
    interpolator: GaussianProcessInterpolator,
}

impl<'a, R: RobotModel, S: SignedDistanceField> ObstacleFactorGP<'a, R, S> {
    /// # Arguments
    /// * `cost` - Obstacle cost model
    /// * `delta_t` - Interval between the two knots
    /// * `fraction` - Position of the checked state inside the interval, in (0, 1)
    pub fn new(cost: ObstacleCost<'a, R, S>, delta_t: f64, fraction: f64) -> Self {
        Self {
            cost,
            interpolator: GaussianProcessInterpolator::new(delta_t, fraction),
        }
    }

    pub fn interpolator(&self) -> &GaussianProcessInterpolator {
        &self.interpolator
    }
}

impl<R: RobotModel, S: SignedDistanceField> Factor<R::Pose> for ObstacleFactorGP<'_, R, S> {
    fn linearize(
        &self,
        knots: &[&Knot<R::Pose>],
        compute_jacobian: bool,
    ) -> (DVector<f64>, Option<DMatrix<f64>>) {
        let (k1, k2) = (knots[0], knots[1]);

        if !compute_jacobian {
            let (pose, _) = self.interpolator.interpolate(
                &k1.pose,
                &k1.velocity,
                &k2.pose,
                &k2.velocity,
                None,
            );
            return (self.cost.evaluate(&pose, None), None);
        }

        let mut interp_jac = InterpolationJacobians::default();
        let (pose, _) = self.interpolator.interpolate(
            &k1.pose,
            &k1.velocity,
            &k2.pose,
            &k2.velocity,
            Some(&mut interp_jac),
        );
        let mut j_pose = DMatrix::zeros(0, 0);
        let residual = self.cost.evaluate(&pose, Some(&mut j_pose));

        // Chain rule through the interpolated pose: [p₁ | v₁ | p₂ | v₂]
        let dof = pose.tangent_dim();
        let mut jac = DMatrix::zeros(residual.len(), 4 * dof);
        for (block, j_interp) in interp_jac.pose.iter().enumerate() {
            jac.columns_mut(block * dof, dof)
                .copy_from(&(&j_pose * j_interp));
        }
        (residual, Some(jac))
    }

    fn dimension(&self) -> usize {
        self.cost.nr_spheres()
    }
}
