//! Serial revolute arm described by Denavit-Hartenberg parameters.
//!
//! Link `i` is reached from link `i-1` by `Rz(θ_i + offset_i) · Tz(d_i) · Tx(a_i) · Rx(α_i)`.
//! A planar arm is the special case `α = d = 0`, which keeps every link in the base
//! xy-plane.

use crate::error::{PlannerError, PlannerResult};
use crate::kinematics::{BodySphere, RobotModel};
use nalgebra::{DVector, Isometry3, Matrix3xX, Point3, Translation3, UnitQuaternion, Vector3};

#[derive(Debug, Clone)]
pub struct Arm {
    a: DVector<f64>,
    alpha: DVector<f64>,
    d: DVector<f64>,
    theta_offset: DVector<f64>,
    base_pose: Isometry3<f64>,
}

impl Arm {
    /// Create an arm from DH parameters with zero joint offsets and identity base.
    ///
    /// # Arguments
    /// * `a` - Link lengths along the rotated x axis
    /// * `alpha` - Link twists about the rotated x axis
    /// * `d` - Link offsets along the previous z axis
    pub fn new(a: DVector<f64>, alpha: DVector<f64>, d: DVector<f64>) -> PlannerResult<Self> {
        let dof = a.len();
        if dof == 0 {
            return Err(PlannerError::InvalidConfiguration(
                "arm needs at least one joint".to_string(),
            ));
        }
        if alpha.len() != dof || d.len() != dof {
            return Err(PlannerError::InvalidConfiguration(format!(
                "DH parameter lengths differ: a={}, alpha={}, d={}",
                dof,
                alpha.len(),
                d.len()
            )));
        }
        Ok(Self {
            a,
            alpha,
            d,
            theta_offset: DVector::zeros(dof),
            base_pose: Isometry3::identity(),
        })
    }

    /// Planar arm with the given link lengths.
    pub fn planar(link_lengths: DVector<f64>) -> PlannerResult<Self> {
        let dof = link_lengths.len();
        Self::new(link_lengths, DVector::zeros(dof), DVector::zeros(dof))
    }

    pub fn with_base_pose(mut self, base_pose: Isometry3<f64>) -> Self {
        self.base_pose = base_pose;
        self
    }

    pub fn with_theta_offset(mut self, theta_offset: DVector<f64>) -> PlannerResult<Self> {
        if theta_offset.len() != self.dof() {
            return Err(PlannerError::InvalidConfiguration(format!(
                "theta offset has {} entries, arm has {} joints",
                theta_offset.len(),
                self.dof()
            )));
        }
        self.theta_offset = theta_offset;
        Ok(self)
    }

    pub fn dof(&self) -> usize {
        self.a.len()
    }

    pub fn base_pose(&self) -> &Isometry3<f64> {
        &self.base_pose
    }

    fn link_transform(&self, joint: usize, angle: f64) -> Isometry3<f64> {
        let theta = angle + self.theta_offset[joint];
        let (s, c) = theta.sin_cos();
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), theta)
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), self.alpha[joint]);
        Isometry3::from_parts(
            Translation3::new(self.a[joint] * c, self.a[joint] * s, self.d[joint]),
            rotation,
        )
    }

    /// Frames of the arm for configuration `q`, starting from `base`.
    ///
    /// Returns `dof + 1` frames: `frames[0]` is `base`, `frames[i]` is the frame
    /// after joint `i`. Joint `i` rotates about the z axis of `frames[i]`.
    pub fn forward_kinematics_from(
        &self,
        q: &DVector<f64>,
        base: &Isometry3<f64>,
    ) -> Vec<Isometry3<f64>> {
        let mut frames = Vec::with_capacity(self.dof() + 1);
        frames.push(*base);
        for joint in 0..self.dof() {
            let next = frames[joint] * self.link_transform(joint, q[joint]);
            frames.push(next);
        }
        frames
    }

    /// Frames of the arm for configuration `q`, starting from the arm's own base pose.
    pub fn forward_kinematics(&self, q: &DVector<f64>) -> Vec<Isometry3<f64>> {
        self.forward_kinematics_from(q, &self.base_pose)
    }

    /// Derivative of a world point rigidly attached to `frames[frame_index]` with respect
    /// to the joints, written into columns `column_offset..` of `jacobian`.
    pub(crate) fn point_jacobian(
        frames: &[Isometry3<f64>],
        frame_index: usize,
        point: &Vector3<f64>,
        jacobian: &mut Matrix3xX<f64>,
        column_offset: usize,
    ) {
        for joint in 0..frame_index {
            let axis = frames[joint].rotation * Vector3::z();
            let origin = frames[joint].translation.vector;
            let column = axis.cross(&(point - origin));
            jacobian.set_column(column_offset + joint, &column);
        }
    }
}

/// [`Arm`] together with its collision spheres.
///
/// Sphere `link_id` refers to the arm link moved by joint `link_id` (0-based).
#[derive(Debug, Clone)]
pub struct ArmModel {
    arm: Arm,
    spheres: Vec<BodySphere>,
}

impl ArmModel {
    pub fn new(arm: Arm, spheres: Vec<BodySphere>) -> PlannerResult<Self> {
        for sphere in &spheres {
            if sphere.link_id >= arm.dof() {
                return Err(PlannerError::InvalidConfiguration(format!(
                    "sphere link id {} out of range for {}-joint arm",
                    sphere.link_id,
                    arm.dof()
                )));
            }
            if sphere.radius < 0.0 {
                return Err(PlannerError::InvalidConfiguration(format!(
                    "sphere radius must be non-negative, got {}",
                    sphere.radius
                )));
            }
        }
        Ok(Self { arm, spheres })
    }

    pub fn arm(&self) -> &Arm {
        &self.arm
    }
}

impl RobotModel for ArmModel {
    type Pose = DVector<f64>;

    fn dof(&self) -> usize {
        self.arm.dof()
    }

    fn body_spheres(&self) -> &[BodySphere] {
        &self.spheres
    }

    fn sphere_centers(
        &self,
        pose: &DVector<f64>,
        jacobians: Option<&mut Vec<Matrix3xX<f64>>>,
    ) -> Vec<Vector3<f64>> {
        let frames = self.arm.forward_kinematics(pose);
        let centers: Vec<Vector3<f64>> = self
            .spheres
            .iter()
            .map(|s| (frames[s.link_id + 1] * Point3::from(s.center)).coords)
            .collect();

        if let Some(jacobians) = jacobians {
            jacobians.clear();
            for (sphere, center) in self.spheres.iter().zip(&centers) {
                let mut jac = Matrix3xX::zeros(self.arm.dof());
                Arm::point_jacobian(&frames, sphere.link_id + 1, center, &mut jac, 0);
                jacobians.push(jac);
            }
        }
        centers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;
    use std::f64::consts::FRAC_PI_2;

    fn two_link_model() -> ArmModel {
        let arm = Arm::planar(dvector![1.0, 1.0]).unwrap();
        let spheres = vec![
            BodySphere::new(0, 0.1, Vector3::new(-0.5, 0.0, 0.0)),
            BodySphere::new(1, 0.1, Vector3::zeros()),
        ];
        ArmModel::new(arm, spheres).unwrap()
    }

    #[test]
    fn test_planar_forward_kinematics() {
        let arm = Arm::planar(dvector![1.0, 1.0]).unwrap();
        let frames = arm.forward_kinematics(&dvector![FRAC_PI_2, -FRAC_PI_2]);
        let tip = frames[2].translation.vector;
        assert!((tip - Vector3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_sphere_centers() {
        let model = two_link_model();
        let centers = model.sphere_centers(&dvector![0.0, 0.0], None);
        assert!((centers[0] - Vector3::new(0.5, 0.0, 0.0)).norm() < 1e-12);
        assert!((centers[1] - Vector3::new(2.0, 0.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_sphere_jacobians_match_finite_difference() {
        let arm = Arm::new(
            dvector![0.3, 0.5, 0.4],
            dvector![FRAC_PI_2, 0.0, -0.4],
            dvector![0.2, 0.0, 0.1],
        )
        .unwrap();
        let spheres = vec![
            BodySphere::new(0, 0.05, Vector3::new(0.1, 0.0, 0.0)),
            BodySphere::new(2, 0.05, Vector3::new(-0.1, 0.05, 0.02)),
        ];
        let model = ArmModel::new(arm, spheres).unwrap();
        let q = dvector![0.3, -0.7, 1.1];

        let mut jacobians = Vec::new();
        let centers = model.sphere_centers(&q, Some(&mut jacobians));

        let eps = 1e-6;
        for k in 0..3 {
            let mut q_plus = q.clone();
            let mut q_minus = q.clone();
            q_plus[k] += eps;
            q_minus[k] -= eps;
            let c_plus = model.sphere_centers(&q_plus, None);
            let c_minus = model.sphere_centers(&q_minus, None);
            for s in 0..centers.len() {
                let numerical = (c_plus[s] - c_minus[s]) / (2.0 * eps);
                let analytic = jacobians[s].column(k);
                assert!((numerical - analytic).norm() < 1e-6, "sphere {s} joint {k}");
            }
        }
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(Arm::new(dvector![1.0], dvector![0.0, 0.0], dvector![0.0]).is_err());
        assert!(Arm::planar(DVector::zeros(0)).is_err());

        let arm = Arm::planar(dvector![1.0]).unwrap();
        let bad = vec![BodySphere::new(1, 0.1, Vector3::zeros())];
        assert!(ArmModel::new(arm, bad).is_err());
    }
}
