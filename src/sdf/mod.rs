//! Signed distance fields.
//!
//! An SDF maps a workspace point to the signed distance to the nearest obstacle surface
//! (negative inside obstacles) together with its spatial gradient. Both concrete fields
//! here are regular grids that interpolate between samples:
//! - [`PlanarSdf`]: bilinear 2D grid, queried with the x,y components of a point
//! - [`SpatialSdf`]: trilinear 3D voxel grid
//!
//! Queries outside the sampled domain fail with [`SdfError::OutOfRange`]; the obstacle
//! cost decides how to treat them.

use nalgebra::Vector3;
use thiserror::Error;

pub mod planar;
pub mod spatial;

pub use planar::PlanarSdf;
pub use spatial::SpatialSdf;

#[derive(Debug, Clone, Error)]
pub enum SdfError {
    /// Query point lies outside the sampled domain
    #[error("query point ({x:.4}, {y:.4}, {z:.4}) is outside the signed distance field")]
    OutOfRange { x: f64, y: f64, z: f64 },

    /// Grid dimensions or spacing cannot describe a field
    #[error("invalid grid: {0}")]
    InvalidGrid(String),
}

impl SdfError {
    pub(crate) fn out_of_range(point: &Vector3<f64>) -> Self {
        SdfError::OutOfRange {
            x: point.x,
            y: point.y,
            z: point.z,
        }
    }
}

/// Signed distance and gradient at a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SdfSample {
    pub distance: f64,
    pub gradient: Vector3<f64>,
}

/// Signed distance field interface used by the obstacle cost.
pub trait SignedDistanceField: Send + Sync {
    fn signed_distance(&self, point: &Vector3<f64>) -> Result<SdfSample, SdfError>;

    /// Nearest point of the sampled domain.
    fn clamp(&self, point: &Vector3<f64>) -> Vector3<f64>;

    /// Largest absolute value stored in the field.
    fn max_distance_magnitude(&self) -> f64;
}

pub(crate) fn validate_cell_size(cell_size: f64) -> Result<(), SdfError> {
    if !(cell_size > 0.0 && cell_size.is_finite()) {
        return Err(SdfError::InvalidGrid(format!(
            "cell size must be positive, got {cell_size}"
        )));
    }
    Ok(())
}

/// Split a continuous grid coordinate into a base index and a fraction in [0, 1].
pub(crate) fn cell_coordinate(coordinate: f64, samples: usize) -> (usize, f64) {
    let base = (coordinate.floor().max(0.0) as usize).min(samples - 2);
    (base, coordinate - base as f64)
}
