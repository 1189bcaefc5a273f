//! Core optimization components for the apex-planner library
//!
//! This module contains the building blocks of the trajectory least-squares problem:
//! - Trajectory knots and their tangent-space retraction
//! - Noise models that whiten factor residuals
//! - Residual blocks tying a factor to the knots it reads
//! - The problem itself, which linearizes into a sparse normal-equation system

pub mod knot;
pub mod noise;
pub mod problem;
pub mod residual_block;

pub use knot::{Knot, Trajectory};
pub use noise::NoiseModel;
pub use problem::{KnotLayout, LinearizedSystem, Problem};
pub use residual_block::ResidualBlock;
