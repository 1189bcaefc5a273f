//! Arm mounted on a planar mobile base.
//!
//! The configuration is a [`Pose2Vector`]: an SE(2) base pose plus the arm joints. The
//! base is lifted into 3D (rotation about z, zero height) and the arm is attached at the
//! fixed transform `base_to_arm`. Link 0 is the base body itself; links `1..=n` are the
//! arm links.

use crate::error::{PlannerError, PlannerResult};
use crate::kinematics::{Arm, BodySphere, RobotModel};
use crate::manifold::Pose2Vector;
use nalgebra::{Isometry3, Matrix3xX, Point3, Vector3};

#[derive(Debug, Clone)]
pub struct Pose2MobileArm {
    arm: Arm,
    base_to_arm: Isometry3<f64>,
}

impl Pose2MobileArm {
    pub fn new(arm: Arm, base_to_arm: Isometry3<f64>) -> Self {
        Self { arm, base_to_arm }
    }

    pub fn arm(&self) -> &Arm {
        &self.arm
    }

    /// Tangent dimension: three base components plus the arm joints.
    pub fn dof(&self) -> usize {
        3 + self.arm.dof()
    }

    /// World frames of the base (index 0) and each arm link (indices `1..=n`).
    pub fn forward_kinematics(&self, pose: &Pose2Vector) -> Vec<Isometry3<f64>> {
        let base = pose.pose.to_isometry3();
        let mut frames = self.arm_frames(pose, &base);
        frames[0] = base;
        frames
    }

    /// Arm frames with `frames[0]` the mount point on the base.
    fn arm_frames(&self, pose: &Pose2Vector, base: &Isometry3<f64>) -> Vec<Isometry3<f64>> {
        let mount = base * self.base_to_arm;
        self.arm
            .forward_kinematics_from(&pose.configuration, &mount)
    }
}

/// [`Pose2MobileArm`] together with its collision spheres.
#[derive(Debug, Clone)]
pub struct Pose2MobileArmModel {
    robot: Pose2MobileArm,
    spheres: Vec<BodySphere>,
}

impl Pose2MobileArmModel {
    pub fn new(robot: Pose2MobileArm, spheres: Vec<BodySphere>) -> PlannerResult<Self> {
        let nr_links = robot.arm().dof() + 1;
        for sphere in &spheres {
            if sphere.link_id >= nr_links {
                return Err(PlannerError::InvalidConfiguration(format!(
                    "sphere link id {} out of range for mobile arm with {} links",
                    sphere.link_id, nr_links
                )));
            }
            if sphere.radius < 0.0 {
                return Err(PlannerError::InvalidConfiguration(format!(
                    "sphere radius must be non-negative, got {}",
                    sphere.radius
                )));
            }
        }
        Ok(Self { robot, spheres })
    }

    pub fn robot(&self) -> &Pose2MobileArm {
        &self.robot
    }
}

impl RobotModel for Pose2MobileArmModel {
    type Pose = Pose2Vector;

    fn dof(&self) -> usize {
        self.robot.dof()
    }

    fn body_spheres(&self) -> &[BodySphere] {
        &self.spheres
    }

    fn sphere_centers(
        &self,
        pose: &Pose2Vector,
        jacobians: Option<&mut Vec<Matrix3xX<f64>>>,
    ) -> Vec<Vector3<f64>> {
        let base = pose.pose.to_isometry3();
        let arm_frames = self.robot.arm_frames(pose, &base);
        let frame_of = |link_id: usize| {
            if link_id == 0 {
                &base
            } else {
                &arm_frames[link_id]
            }
        };

        let centers: Vec<Vector3<f64>> = self
            .spheres
            .iter()
            .map(|s| (frame_of(s.link_id) * Point3::from(s.center)).coords)
            .collect();

        if let Some(jacobians) = jacobians {
            jacobians.clear();
            let (s, c) = pose.pose.angle().sin_cos();
            let (x, y) = (pose.pose.x(), pose.pose.y());
            for (sphere, center) in self.spheres.iter().zip(&centers) {
                let mut jac = Matrix3xX::zeros(self.dof());
                // Right perturbation of the base: body-frame translation, then yaw.
                jac.set_column(0, &Vector3::new(c, s, 0.0));
                jac.set_column(1, &Vector3::new(-s, c, 0.0));
                jac.set_column(2, &Vector3::new(-(center.y - y), center.x - x, 0.0));
                if sphere.link_id > 0 {
                    Arm::point_jacobian(&arm_frames, sphere.link_id, center, &mut jac, 3);
                }
                jacobians.push(jac);
            }
        }
        centers
    }
}
