//! SE(2) - Special Euclidean Group in 2D
//!
//! This module implements the Special Euclidean group SE(2), which represents
//! rigid body transformations in 2D space (rotation + translation). It is the pose
//! space of a planar mobile base.
//!
//! SE(2) tangent elements are represented as [x, y, theta] = 3 components,
//! where x,y is the translational component and theta is the rotational component.
//!
//! The implementation follows the [manif](https://github.com/artivis/manif) C++ library
//! conventions for exponential/logarithmic maps, adjoint and right/left Jacobians.

use crate::manifold::Manifold;
use nalgebra::{
    DMatrix, DVector, Isometry3, Matrix2, Matrix3, Translation3, UnitQuaternion, Vector2, Vector3,
};
use std::f64::consts::PI;
use std::fmt;

/// Below this angle the closed-form SE(2) expressions switch to their Taylor expansions.
const SMALL_ANGLE: f64 = 1e-6;

/// SE(2) group element representing rigid body transformations in 2D.
#[derive(Clone, Debug, PartialEq)]
pub struct SE2 {
    translation: Vector2<f64>,
    /// Heading, kept in (-π, π]
    angle: f64,
}

impl fmt::Display for SE2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SE2(translation: [{:.4}, {:.4}], rotation: {:.4})",
            self.translation.x, self.translation.y, self.angle
        )
    }
}

impl Default for SE2 {
    fn default() -> Self {
        Self::identity()
    }
}

fn normalize_angle(theta: f64) -> f64 {
    let wrapped = theta.sin().atan2(theta.cos());
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}

/// `sin(θ)/θ` and `(1 - cos(θ))/θ`, with their series near zero.
fn sinc_terms(theta: f64) -> (f64, f64) {
    if theta.abs() < SMALL_ANGLE {
        let theta_sq = theta * theta;
        (1.0 - theta_sq / 6.0, 0.5 * theta - theta * theta_sq / 24.0)
    } else {
        (theta.sin() / theta, (1.0 - theta.cos()) / theta)
    }
}

impl SE2 {
    /// Degrees of freedom - dimension of the tangent space
    pub const DOF: usize = 3;

    /// Get the identity element of the group.
    pub fn identity() -> Self {
        SE2 {
            translation: Vector2::zeros(),
            angle: 0.0,
        }
    }

    /// Create a new SE2 element from x, y and heading.
    pub fn from_xy_angle(x: f64, y: f64, theta: f64) -> Self {
        SE2 {
            translation: Vector2::new(x, y),
            angle: normalize_angle(theta),
        }
    }

    pub fn x(&self) -> f64 {
        self.translation.x
    }

    pub fn y(&self) -> f64 {
        self.translation.y
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn translation(&self) -> Vector2<f64> {
        self.translation
    }

    /// Get the 2x2 rotation matrix.
    pub fn rotation_matrix(&self) -> Matrix2<f64> {
        let (s, c) = self.angle.sin_cos();
        Matrix2::new(c, -s, s, c)
    }

    /// Lift to a 3D rigid transformation (rotation about z, zero height).
    pub fn to_isometry3(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(self.translation.x, self.translation.y, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), self.angle),
        )
    }

    pub fn inverse(&self) -> Self {
        let t = -(self.rotation_matrix().transpose() * self.translation);
        SE2 {
            translation: t,
            angle: normalize_angle(-self.angle),
        }
    }

    /// Composition `self ∘ other`.
    pub fn compose(&self, other: &SE2) -> Self {
        SE2 {
            translation: self.translation + self.rotation_matrix() * other.translation,
            angle: normalize_angle(self.angle + other.angle),
        }
    }

    /// Transform a point from the local frame into the world frame.
    pub fn act(&self, point: &Vector2<f64>) -> Vector2<f64> {
        self.rotation_matrix() * point + self.translation
    }

    /// Adjoint matrix `[[R, (y, -x)ᵀ], [0, 0, 1]]`.
    pub fn adjoint(&self) -> Matrix3<f64> {
        let r = self.rotation_matrix();
        Matrix3::new(
            r[(0, 0)],
            r[(0, 1)],
            self.translation.y,
            r[(1, 0)],
            r[(1, 1)],
            -self.translation.x,
            0.0,
            0.0,
            1.0,
        )
    }

    /// Exponential map from the tangent `[x, y, theta]`.
    pub fn exp(tangent: &Vector3<f64>) -> Self {
        let theta = tangent.z;
        let (a, b) = sinc_terms(theta);
        let v = Matrix2::new(a, -b, b, a);
        SE2 {
            translation: v * Vector2::new(tangent.x, tangent.y),
            angle: normalize_angle(theta),
        }
    }

    /// Logarithmic map to the tangent `[x, y, theta]`.
    pub fn log(&self) -> Vector3<f64> {
        let theta = self.angle;
        let (a, b) = sinc_terms(theta);
        let den = a * a + b * b;
        let v_inv = Matrix2::new(a, b, -b, a) / den;
        let rho = v_inv * self.translation;
        Vector3::new(rho.x, rho.y, theta)
    }

    /// Right Jacobian of the exponential map.
    pub fn right_jacobian(tangent: &Vector3<f64>) -> Matrix3<f64> {
        let (x, y, theta) = (tangent.x, tangent.y, tangent.z);
        let (a, b) = sinc_terms(theta);
        let (j02, j12) = if theta.abs() < SMALL_ANGLE {
            (-y / 2.0 + theta * x / 6.0, x / 2.0 + theta * y / 6.0)
        } else {
            let (s, c) = theta.sin_cos();
            let theta_sq = theta * theta;
            (
                (theta * x - y + y * c - x * s) / theta_sq,
                (x + theta * y - x * c - y * s) / theta_sq,
            )
        };
        Matrix3::new(a, b, j02, -b, a, j12, 0.0, 0.0, 1.0)
    }

    /// Left Jacobian of the exponential map.
    pub fn left_jacobian(tangent: &Vector3<f64>) -> Matrix3<f64> {
        let (x, y, theta) = (tangent.x, tangent.y, tangent.z);
        let (a, b) = sinc_terms(theta);
        let (j02, j12) = if theta.abs() < SMALL_ANGLE {
            (y / 2.0 + theta * x / 6.0, -x / 2.0 + theta * y / 6.0)
        } else {
            let (s, c) = theta.sin_cos();
            let theta_sq = theta * theta;
            (
                (theta * x + y - y * c - x * s) / theta_sq,
                (-x + theta * y + x * c - y * s) / theta_sq,
            )
        };
        Matrix3::new(a, -b, j02, b, a, j12, 0.0, 0.0, 1.0)
    }

    pub fn right_jacobian_inv(tangent: &Vector3<f64>) -> Matrix3<f64> {
        Self::right_jacobian(tangent)
            .try_inverse()
            .unwrap_or_else(Matrix3::identity)
    }

    pub fn left_jacobian_inv(tangent: &Vector3<f64>) -> Matrix3<f64> {
        Self::left_jacobian(tangent)
            .try_inverse()
            .unwrap_or_else(Matrix3::identity)
    }

    /// Right-plus on the fixed-size representation.
    pub fn plus_tangent(
        &self,
        delta: &Vector3<f64>,
        jacobian_self: Option<&mut Matrix3<f64>>,
        jacobian_delta: Option<&mut Matrix3<f64>>,
    ) -> Self {
        let increment = SE2::exp(delta);
        if let Some(j) = jacobian_self {
            *j = increment.inverse().adjoint();
        }
        if let Some(j) = jacobian_delta {
            *j = SE2::right_jacobian(delta);
        }
        self.compose(&increment)
    }

    /// Right-minus on the fixed-size representation.
    pub fn minus_tangent(
        &self,
        other: &SE2,
        jacobian_self: Option<&mut Matrix3<f64>>,
        jacobian_other: Option<&mut Matrix3<f64>>,
    ) -> Vector3<f64> {
        let tangent = other.inverse().compose(self).log();
        if let Some(j) = jacobian_self {
            *j = SE2::right_jacobian_inv(&tangent);
        }
        if let Some(j) = jacobian_other {
            *j = -SE2::left_jacobian_inv(&tangent);
        }
        tangent
    }
}

impl Manifold for SE2 {
    fn tangent_dim(&self) -> usize {
        Self::DOF
    }

    fn plus(
        &self,
        delta: &DVector<f64>,
        jacobian_self: Option<&mut DMatrix<f64>>,
        jacobian_delta: Option<&mut DMatrix<f64>>,
    ) -> Self {
        let mut j_self = Matrix3::zeros();
        let mut j_delta = Matrix3::zeros();
        let result = self.plus_tangent(
            &Vector3::new(delta[0], delta[1], delta[2]),
            Some(&mut j_self),
            Some(&mut j_delta),
        );
        if let Some(j) = jacobian_self {
            *j = DMatrix::from_iterator(3, 3, j_self.iter().copied());
        }
        if let Some(j) = jacobian_delta {
            *j = DMatrix::from_iterator(3, 3, j_delta.iter().copied());
        }
        result
    }

    fn minus(
        &self,
        other: &Self,
        jacobian_self: Option<&mut DMatrix<f64>>,
        jacobian_other: Option<&mut DMatrix<f64>>,
    ) -> DVector<f64> {
        let mut j_self = Matrix3::zeros();
        let mut j_other = Matrix3::zeros();
        let tangent = self.minus_tangent(other, Some(&mut j_self), Some(&mut j_other));
        if let Some(j) = jacobian_self {
            *j = DMatrix::from_iterator(3, 3, j_self.iter().copied());
        }
        if let Some(j) = jacobian_other {
            *j = DMatrix::from_iterator(3, 3, j_other.iter().copied());
        }
        DVector::from_column_slice(tangent.as_slice())
    }

    fn joint_values(&self) -> DVector<f64> {
        DVector::zeros(0)
    }

    fn joint_offset(&self) -> usize {
        Self::DOF
    }
}
