//! Trilinear 3D signed distance field.

use crate::sdf::{SdfError, SdfSample, SignedDistanceField, cell_coordinate, validate_cell_size};
use nalgebra::{DMatrix, Vector3};

/// 3D voxel grid of signed distances stored as one matrix per z slice. Inside a slice
/// rows follow y and columns follow x, as in [`PlanarSdf`](crate::sdf::PlanarSdf).
#[derive(Debug, Clone)]
pub struct SpatialSdf {
    origin: Vector3<f64>,
    cell_size: f64,
    slices: Vec<DMatrix<f64>>,
    max_magnitude: f64,
}

impl SpatialSdf {
    pub fn new(
        origin: Vector3<f64>,
        cell_size: f64,
        slices: Vec<DMatrix<f64>>,
    ) -> Result<Self, SdfError> {
        validate_cell_size(cell_size)?;
        if slices.len() < 2 {
            return Err(SdfError::InvalidGrid(format!(
                "spatial field needs at least 2 z slices, got {}",
                slices.len()
            )));
        }
        let (rows, cols) = slices[0].shape();
        if rows < 2 || cols < 2 {
            return Err(SdfError::InvalidGrid(format!(
                "spatial field needs at least 2x2 samples per slice, got {rows}x{cols}"
            )));
        }
        if slices.iter().any(|s| s.shape() != (rows, cols)) {
            return Err(SdfError::InvalidGrid(
                "all z slices must have the same shape".to_string(),
            ));
        }
        let max_magnitude = slices
            .iter()
            .flat_map(|s| s.iter())
            .fold(0.0f64, |m, v| m.max(v.abs()));
        Ok(Self {
            origin,
            cell_size,
            slices,
            max_magnitude,
        })
    }

    /// Sample `distance(x, y, z)` on a `rows × cols × depth` grid.
    pub fn from_fn<F>(
        origin: Vector3<f64>,
        cell_size: f64,
        rows: usize,
        cols: usize,
        depth: usize,
        distance: F,
    ) -> Result<Self, SdfError>
    where
        F: Fn(f64, f64, f64) -> f64,
    {
        let slices = (0..depth)
            .map(|k| {
                DMatrix::from_fn(rows, cols, |r, c| {
                    distance(
                        origin.x + c as f64 * cell_size,
                        origin.y + r as f64 * cell_size,
                        origin.z + k as f64 * cell_size,
                    )
                })
            })
            .collect();
        Self::new(origin, cell_size, slices)
    }

    pub fn origin(&self) -> &Vector3<f64> {
        &self.origin
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn dims(&self) -> (usize, usize, usize) {
        let (rows, cols) = self.slices[0].shape();
        (rows, cols, self.slices.len())
    }
}

impl SignedDistanceField for SpatialSdf {
    fn signed_distance(&self, point: &Vector3<f64>) -> Result<SdfSample, SdfError> {
        let (rows, cols, depth) = self.dims();
        let grid = (point - self.origin) / self.cell_size;
        let in_range = |v: f64, n: usize| (0.0..=(n - 1) as f64).contains(&v);
        if !in_range(grid.x, cols) || !in_range(grid.y, rows) || !in_range(grid.z, depth) {
            return Err(SdfError::out_of_range(point));
        }

        let (c0, tx) = cell_coordinate(grid.x, cols);
        let (r0, ty) = cell_coordinate(grid.y, rows);
        let (k0, tz) = cell_coordinate(grid.z, depth);
        let v = |dk: usize, dr: usize, dc: usize| self.slices[k0 + dk][(r0 + dr, c0 + dc)];

        // Bilinear in each of the two bracketing slices, then linear in z.
        let bilinear = |dk: usize| {
            let value = (1.0 - ty) * ((1.0 - tx) * v(dk, 0, 0) + tx * v(dk, 0, 1))
                + ty * ((1.0 - tx) * v(dk, 1, 0) + tx * v(dk, 1, 1));
            let dx = (1.0 - ty) * (v(dk, 0, 1) - v(dk, 0, 0)) + ty * (v(dk, 1, 1) - v(dk, 1, 0));
            let dy = (1.0 - tx) * (v(dk, 1, 0) - v(dk, 0, 0)) + tx * (v(dk, 1, 1) - v(dk, 0, 1));
            (value, dx, dy)
        };
        let (lower, lower_dx, lower_dy) = bilinear(0);
        let (upper, upper_dx, upper_dy) = bilinear(1);

        let distance = (1.0 - tz) * lower + tz * upper;
        let gradient = Vector3::new(
            (1.0 - tz) * lower_dx + tz * upper_dx,
            (1.0 - tz) * lower_dy + tz * upper_dy,
            upper - lower,
        ) / self.cell_size;

        Ok(SdfSample { distance, gradient })
    }

    fn clamp(&self, point: &Vector3<f64>) -> Vector3<f64> {
        let (rows, cols, depth) = self.dims();
        let upper = self.origin
            + Vector3::new((cols - 1) as f64, (rows - 1) as f64, (depth - 1) as f64)
                * self.cell_size;
        Vector3::new(
            point.x.clamp(self.origin.x, upper.x),
            point.y.clamp(self.origin.y, upper.y),
            point.z.clamp(self.origin.z, upper.z),
        )
    }

    fn max_distance_magnitude(&self) -> f64 {
        self.max_magnitude
    }
}
