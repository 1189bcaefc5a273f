//! Shared fixtures for the planner integration tests.
//!
//! Provides a point robot (a single sphere sitting at the configuration) and analytic
//! signed distance fields, so scenario tests can reason about the geometry exactly.

#![allow(dead_code)]

use apex_planner::kinematics::{BodySphere, RobotModel};
use apex_planner::sdf::{SdfError, SdfSample, SignedDistanceField};
use nalgebra::{DVector, Matrix3xX, Vector3};

/// A robot whose only collision sphere is centered at its configuration.
///
/// The configuration is a 2D or 3D position; in 2D the sphere lives in the z = 0 plane.
pub struct PointRobot {
    dim: usize,
    spheres: Vec<BodySphere>,
}

impl PointRobot {
    pub fn new(dim: usize, radius: f64) -> Self {
        assert!(dim == 2 || dim == 3, "point robot is 2D or 3D");
        Self {
            dim,
            spheres: vec![BodySphere::new(0, radius, Vector3::zeros())],
        }
    }
}

impl RobotModel for PointRobot {
    type Pose = DVector<f64>;

    fn dof(&self) -> usize {
        self.dim
    }

    fn body_spheres(&self) -> &[BodySphere] {
        &self.spheres
    }

    fn sphere_centers(
        &self,
        pose: &DVector<f64>,
        jacobians: Option<&mut Vec<Matrix3xX<f64>>>,
    ) -> Vec<Vector3<f64>> {
        let mut center = Vector3::zeros();
        for i in 0..self.dim {
            center[i] = pose[i];
        }
        if let Some(jacobians) = jacobians {
            jacobians.clear();
            let mut jac = Matrix3xX::zeros(self.dim);
            for i in 0..self.dim {
                jac[(i, i)] = 1.0;
            }
            jacobians.push(jac);
        }
        vec![center]
    }
}

/// Exact field of a single ball obstacle, defined everywhere.
pub struct BallSdf {
    pub center: Vector3<f64>,
    pub radius: f64,
}

impl BallSdf {
    pub fn new(center: Vector3<f64>, radius: f64) -> Self {
        Self { center, radius }
    }
}

impl SignedDistanceField for BallSdf {
    fn signed_distance(&self, point: &Vector3<f64>) -> Result<SdfSample, SdfError> {
        let offset = point - self.center;
        let norm = offset.norm();
        let gradient = if norm > 1e-12 {
            offset / norm
        } else {
            Vector3::x()
        };
        Ok(SdfSample {
            distance: norm - self.radius,
            gradient,
        })
    }

    fn clamp(&self, point: &Vector3<f64>) -> Vector3<f64> {
        *point
    }

    fn max_distance_magnitude(&self) -> f64 {
        100.0
    }
}

/// Obstacle-free space: every point is far from any surface.
pub struct FreeSpace;

impl SignedDistanceField for FreeSpace {
    fn signed_distance(&self, _point: &Vector3<f64>) -> Result<SdfSample, SdfError> {
        Ok(SdfSample {
            distance: 100.0,
            gradient: Vector3::zeros(),
        })
    }

    fn clamp(&self, point: &Vector3<f64>) -> Vector3<f64> {
        *point
    }

    fn max_distance_magnitude(&self) -> f64 {
        100.0
    }
}

/// Deterministic perturbation in `[-scale, scale]`, varying with `index`.
pub fn perturbation(index: usize, scale: f64) -> f64 {
    let u = ((index * 7919 + 104_729) % 1000) as f64 / 1000.0;
    scale * (2.0 * u - 1.0)
}
