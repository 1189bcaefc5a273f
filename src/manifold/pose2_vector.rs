//! SE(2) × Rⁿ: the configuration of a planar mobile base carrying an arm.
//!
//! The tangent vector is laid out as `[x, y, theta, q_1, …, q_n]`. Plus and minus act
//! block-wise: SE(2) on the first three components and vector addition on the rest,
//! so all Jacobians are block diagonal.

use crate::manifold::{Manifold, SE2};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct Pose2Vector {
    pub pose: SE2,
    pub configuration: DVector<f64>,
}

impl fmt::Display for Pose2Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pose2Vector({}, q: {:?})", self.pose, self.configuration.as_slice())
    }
}

impl Pose2Vector {
    pub fn new(pose: SE2, configuration: DVector<f64>) -> Self {
        Self {
            pose,
            configuration,
        }
    }

    fn embed(block_se2: &Matrix3<f64>, block_joints: DMatrix<f64>) -> DMatrix<f64> {
        let n = block_joints.nrows();
        let mut jac = DMatrix::zeros(3 + n, 3 + n);
        jac.fixed_view_mut::<3, 3>(0, 0).copy_from(block_se2);
        jac.view_mut((3, 3), (n, n)).copy_from(&block_joints);
        jac
    }
}

impl Manifold for Pose2Vector {
    fn tangent_dim(&self) -> usize {
        SE2::DOF + self.configuration.len()
    }

    fn plus(
        &self,
        delta: &DVector<f64>,
        jacobian_self: Option<&mut DMatrix<f64>>,
        jacobian_delta: Option<&mut DMatrix<f64>>,
    ) -> Self {
        let n = self.configuration.len();
        let mut j_self = Matrix3::zeros();
        let mut j_delta = Matrix3::zeros();
        let pose = self.pose.plus_tangent(
            &Vector3::new(delta[0], delta[1], delta[2]),
            Some(&mut j_self),
            Some(&mut j_delta),
        );
        let configuration = &self.configuration + delta.rows(3, n);

        if let Some(j) = jacobian_self {
            *j = Self::embed(&j_self, DMatrix::identity(n, n));
        }
        if let Some(j) = jacobian_delta {
            *j = Self::embed(&j_delta, DMatrix::identity(n, n));
        }
        Pose2Vector {
            pose,
            configuration,
        }
    }

    fn minus(
        &self,
        other: &Self,
        jacobian_self: Option<&mut DMatrix<f64>>,
        jacobian_other: Option<&mut DMatrix<f64>>,
    ) -> DVector<f64> {
        let n = self.configuration.len();
        let mut j_self = Matrix3::zeros();
        let mut j_other = Matrix3::zeros();
        let pose_diff = self
            .pose
            .minus_tangent(&other.pose, Some(&mut j_self), Some(&mut j_other));

        if let Some(j) = jacobian_self {
            *j = Self::embed(&j_self, DMatrix::identity(n, n));
        }
        if let Some(j) = jacobian_other {
            *j = Self::embed(&j_other, -DMatrix::identity(n, n));
        }

        let mut diff = DVector::zeros(3 + n);
        diff.fixed_rows_mut::<3>(0).copy_from(&pose_diff);
        diff.rows_mut(3, n)
            .copy_from(&(&self.configuration - &other.configuration));
        diff
    }

    fn joint_values(&self) -> DVector<f64> {
        self.configuration.clone()
    }

    fn joint_offset(&self) -> usize {
        SE2::DOF
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dvector;

    #[test]
    fn test_pose2_vector_minus_plus_roundtrip() {
        let a = Pose2Vector::new(SE2::from_xy_angle(1.0, 0.5, 0.3), dvector![0.2, -0.4]);
        let b = Pose2Vector::new(SE2::from_xy_angle(-0.5, 2.0, -1.1), dvector![1.0, 0.1]);
        let d = a.minus(&b, None, None);
        let back = b.plus(&d, None, None);

        assert_eq!(d.len(), 5);
        assert!((back.pose.translation() - a.pose.translation()).norm() < 1e-9);
        assert!((back.pose.angle() - a.pose.angle()).abs() < 1e-9);
        assert!((back.configuration - a.configuration).norm() < 1e-12);
    }

    #[test]
    fn test_pose2_vector_jacobians_block_diagonal() {
        let a = Pose2Vector::new(SE2::from_xy_angle(1.0, 0.5, 0.3), dvector![0.2]);
        let b = Pose2Vector::new(SE2::from_xy_angle(0.2, 0.1, 0.1), dvector![0.0]);
        let mut j_a = DMatrix::zeros(0, 0);
        let mut j_b = DMatrix::zeros(0, 0);
        a.minus(&b, Some(&mut j_a), Some(&mut j_b));

        assert_eq!(j_a.shape(), (4, 4));
        assert_eq!(j_a[(3, 3)], 1.0);
        assert_eq!(j_b[(3, 3)], -1.0);
        for k in 0..3 {
            assert_eq!(j_a[(3, k)], 0.0);
            assert_eq!(j_a[(k, 3)], 0.0);
        }
    }

    #[test]
    fn test_pose2_vector_joint_block() {
        let a = Pose2Vector::new(SE2::identity(), dvector![0.5, 0.6, 0.7]);
        assert_eq!(a.tangent_dim(), 6);
        assert_eq!(a.joint_offset(), 3);
        assert_eq!(a.joint_values(), dvector![0.5, 0.6, 0.7]);
    }
}
