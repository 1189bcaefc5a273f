//! Bilinear 2D signed distance field.

use crate::sdf::{SdfError, SdfSample, SignedDistanceField, cell_coordinate, validate_cell_size};
use nalgebra::{DMatrix, Vector2, Vector3};

/// 2D grid of signed distances. Rows follow y, columns follow x; sample `(r, c)` sits at
/// `origin + (c, r) · cell_size`.
#[derive(Debug, Clone)]
pub struct PlanarSdf {
    origin: Vector2<f64>,
    cell_size: f64,
    data: DMatrix<f64>,
    max_magnitude: f64,
}

impl PlanarSdf {
    pub fn new(origin: Vector2<f64>, cell_size: f64, data: DMatrix<f64>) -> Result<Self, SdfError> {
        validate_cell_size(cell_size)?;
        if data.nrows() < 2 || data.ncols() < 2 {
            return Err(SdfError::InvalidGrid(format!(
                "planar field needs at least 2x2 samples, got {}x{}",
                data.nrows(),
                data.ncols()
            )));
        }
        let max_magnitude = data.iter().fold(0.0f64, |m, v| m.max(v.abs()));
        Ok(Self {
            origin,
            cell_size,
            data,
            max_magnitude,
        })
    }

    /// Sample `distance(x, y)` on a `rows × cols` grid.
    pub fn from_fn<F>(
        origin: Vector2<f64>,
        cell_size: f64,
        rows: usize,
        cols: usize,
        distance: F,
    ) -> Result<Self, SdfError>
    where
        F: Fn(f64, f64) -> f64,
    {
        let data = DMatrix::from_fn(rows, cols, |r, c| {
            distance(
                origin.x + c as f64 * cell_size,
                origin.y + r as f64 * cell_size,
            )
        });
        Self::new(origin, cell_size, data)
    }

    pub fn origin(&self) -> &Vector2<f64> {
        &self.origin
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    fn upper_corner(&self) -> Vector2<f64> {
        self.origin
            + Vector2::new(
                (self.data.ncols() - 1) as f64,
                (self.data.nrows() - 1) as f64,
            ) * self.cell_size
    }
}

impl SignedDistanceField for PlanarSdf {
    fn signed_distance(&self, point: &Vector3<f64>) -> Result<SdfSample, SdfError> {
        let col_f = (point.x - self.origin.x) / self.cell_size;
        let row_f = (point.y - self.origin.y) / self.cell_size;
        let max_col = (self.data.ncols() - 1) as f64;
        let max_row = (self.data.nrows() - 1) as f64;
        if !(0.0..=max_col).contains(&col_f) || !(0.0..=max_row).contains(&row_f) {
            return Err(SdfError::out_of_range(point));
        }

        let (c0, tx) = cell_coordinate(col_f, self.data.ncols());
        let (r0, ty) = cell_coordinate(row_f, self.data.nrows());
        let v00 = self.data[(r0, c0)];
        let v01 = self.data[(r0, c0 + 1)];
        let v10 = self.data[(r0 + 1, c0)];
        let v11 = self.data[(r0 + 1, c0 + 1)];

        let distance =
            (1.0 - ty) * ((1.0 - tx) * v00 + tx * v01) + ty * ((1.0 - tx) * v10 + tx * v11);
        let dx = ((1.0 - ty) * (v01 - v00) + ty * (v11 - v10)) / self.cell_size;
        let dy = ((1.0 - tx) * (v10 - v00) + tx * (v11 - v01)) / self.cell_size;

        Ok(SdfSample {
            distance,
            gradient: Vector3::new(dx, dy, 0.0),
        })
    }

    fn clamp(&self, point: &Vector3<f64>) -> Vector3<f64> {
        let upper = self.upper_corner();
        Vector3::new(
            point.x.clamp(self.origin.x, upper.x),
            point.y.clamp(self.origin.y, upper.y),
            point.z,
        )
    }

    fn max_distance_magnitude(&self) -> f64 {
        self.max_magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plane_field() -> PlanarSdf {
        // distance = x + 2y, exactly representable by bilinear interpolation
        PlanarSdf::from_fn(Vector2::new(-1.0, -1.0), 0.5, 5, 7, |x, y| x + 2.0 * y).unwrap()
    }

    #[test]
    fn test_bilinear_reproduces_linear_field() {
        let sdf = plane_field();
        let sample = sdf.signed_distance(&Vector3::new(0.3, 0.1, 0.0)).unwrap();
        assert!((sample.distance - 0.5).abs() < 1e-12);
        assert!((sample.gradient - Vector3::new(1.0, 2.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_upper_boundary_is_inside() {
        let sdf = plane_field();
        let sample = sdf.signed_distance(&Vector3::new(2.0, 1.0, 0.0)).unwrap();
        assert!((sample.distance - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_out_of_range() {
        let sdf = plane_field();
        let result = sdf.signed_distance(&Vector3::new(2.5, 0.0, 0.0));
        assert!(matches!(result, Err(SdfError::OutOfRange { .. })));

        let clamped = sdf.clamp(&Vector3::new(2.5, -3.0, 0.0));
        assert!((clamped - Vector3::new(2.0, -1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let sdf = PlanarSdf::from_fn(Vector2::zeros(), 0.1, 30, 30, |x, y| {
            ((x - 1.4).powi(2) + (y - 1.6).powi(2)).sqrt() - 0.5
        })
        .unwrap();
        let p = Vector3::new(0.83, 1.27, 0.0);
        let eps = 1e-6;
        let sample = sdf.signed_distance(&p).unwrap();
        let dx = (sdf.signed_distance(&(p + Vector3::x() * eps)).unwrap().distance
            - sdf.signed_distance(&(p - Vector3::x() * eps)).unwrap().distance)
            / (2.0 * eps);
        let dy = (sdf.signed_distance(&(p + Vector3::y() * eps)).unwrap().distance
            - sdf.signed_distance(&(p - Vector3::y() * eps)).unwrap().distance)
            / (2.0 * eps);
        assert!((sample.gradient.x - dx).abs() < 1e-6);
        assert!((sample.gradient.y - dy).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_grid() {
        assert!(PlanarSdf::new(Vector2::zeros(), 0.1, DMatrix::zeros(1, 5)).is_err());
        assert!(PlanarSdf::new(Vector2::zeros(), 0.0, DMatrix::zeros(3, 3)).is_err());
    }

    #[test]
    fn test_max_distance_magnitude() {
        let sdf = plane_field();
        // corners: (-1,-1) -> -3, (2,1) -> 4
        assert!((sdf.max_distance_magnitude() - 4.0).abs() < 1e-12);
    }
}
