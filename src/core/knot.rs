//! Trajectory knots.
//!
//! A knot is the robot state `(pose, velocity)` at one discrete time step. Its tangent
//! vector stacks a pose perturbation and a velocity perturbation: `[δpose; δvelocity]`.

use crate::manifold::Manifold;
use nalgebra::DVector;

#[derive(Debug, Clone, PartialEq)]
pub struct Knot<P> {
    pub pose: P,
    pub velocity: DVector<f64>,
}

impl<P: Manifold> Knot<P> {
    pub fn new(pose: P, velocity: DVector<f64>) -> Self {
        Self { pose, velocity }
    }

    /// Width of the knot tangent vector: pose dimension plus velocity dimension.
    pub fn tangent_dim(&self) -> usize {
        self.pose.tangent_dim() + self.velocity.len()
    }

    /// Apply a tangent step `[δpose; δvelocity]`.
    pub fn retract(&self, delta: &DVector<f64>) -> Self {
        let pose_dim = self.pose.tangent_dim();
        let pose_step = delta.rows(0, pose_dim).into_owned();
        Knot {
            pose: self.pose.plus(&pose_step, None, None),
            velocity: &self.velocity + delta.rows(pose_dim, self.velocity.len()),
        }
    }
}

/// Ordered knots at times `i · Δt`, `i = 0..=N`.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory<P> {
    knots: Vec<Knot<P>>,
}

impl<P: Manifold> Trajectory<P> {
    pub fn new(knots: Vec<Knot<P>>) -> Self {
        Self { knots }
    }

    pub fn len(&self) -> usize {
        self.knots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.knots.is_empty()
    }

    /// Number of intervals, `N`.
    pub fn total_step(&self) -> usize {
        self.knots.len().saturating_sub(1)
    }

    pub fn knot(&self, index: usize) -> &Knot<P> {
        &self.knots[index]
    }

    pub fn knot_mut(&mut self, index: usize) -> &mut Knot<P> {
        &mut self.knots[index]
    }

    pub fn knots(&self) -> &[Knot<P>] {
        &self.knots
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Knot<P>> {
        self.knots.iter()
    }

    pub fn poses(&self) -> impl Iterator<Item = &P> {
        self.knots.iter().map(|k| &k.pose)
    }

    pub fn velocities(&self) -> impl Iterator<Item = &DVector<f64>> {
        self.knots.iter().map(|k| &k.velocity)
    }

    pub fn into_knots(self) -> Vec<Knot<P>> {
        self.knots
    }
}

impl<P: Manifold> FromIterator<Knot<P>> for Trajectory<P> {
    fn from_iter<I: IntoIterator<Item = Knot<P>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
