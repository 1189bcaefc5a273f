//! Robot kinematics adapters.
//!
//! The obstacle cost only needs to know where the robot's collision spheres are for a
//! given configuration, and how those centers move under a tangent perturbation of the
//! configuration. [`RobotModel`] is that seam; [`ArmModel`] and [`Pose2MobileArmModel`]
//! are the two concrete robots.

use crate::manifold::Manifold;
use nalgebra::{Matrix3xX, Vector3};

pub mod arm;
pub mod mobile_arm;

pub use arm::{Arm, ArmModel};
pub use mobile_arm::{Pose2MobileArm, Pose2MobileArmModel};

/// A collision sphere rigidly attached to one link of the robot.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySphere {
    /// Index of the link the sphere is attached to
    pub link_id: usize,
    pub radius: f64,
    /// Center in the link frame
    pub center: Vector3<f64>,
}

impl BodySphere {
    pub fn new(link_id: usize, radius: f64, center: Vector3<f64>) -> Self {
        Self {
            link_id,
            radius,
            center,
        }
    }
}

/// Forward kinematics of a robot body approximated by spheres.
pub trait RobotModel: Send + Sync {
    /// Configuration type stored in trajectory knots
    type Pose: Manifold;

    /// Tangent dimension of [`RobotModel::Pose`]
    fn dof(&self) -> usize;

    fn body_spheres(&self) -> &[BodySphere];

    fn nr_body_spheres(&self) -> usize {
        self.body_spheres().len()
    }

    fn sphere_radius(&self, index: usize) -> f64 {
        self.body_spheres()[index].radius
    }

    /// World-frame sphere centers for `pose`.
    ///
    /// When `jacobians` is given it is filled with one `3 × dof` matrix per sphere:
    /// the derivative of the center with respect to a tangent perturbation of `pose`.
    fn sphere_centers(
        &self,
        pose: &Self::Pose,
        jacobians: Option<&mut Vec<Matrix3xX<f64>>>,
    ) -> Vec<Vector3<f64>>;
}
