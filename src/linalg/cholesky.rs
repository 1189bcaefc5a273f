//! Sparse Cholesky solver for the damped normal equations.
//!
//! Solves `(H + λI) δ = -g` with faer's supernodal/simplicial `Llt`. When the
//! factorization fails (H only semi-definite, e.g. a joint that no factor constrains),
//! the solve is retried with an exponentially increasing diagonal regularization.

use faer::sparse::{SparseColMat, Triplet};
use faer::{
    Mat, Side,
    linalg::solvers::Solve,
    sparse::linalg::solvers::{Llt, SymbolicLlt},
};
use tracing::debug;

use crate::linalg::{LinAlgError, LinAlgResult};

#[derive(Debug, Clone)]
pub struct SparseCholeskySolver {
    regularization_attempts: i32,
}

impl SparseCholeskySolver {
    pub fn new() -> Self {
        SparseCholeskySolver {
            regularization_attempts: 5,
        }
    }

    /// Solve `H δ = -g`.
    pub fn solve_normal_equation(
        &mut self,
        hessian: &SparseColMat<usize, f64>,
        gradient: &Mat<f64>,
    ) -> LinAlgResult<Mat<f64>> {
        self.solve_augmented_equation(hessian, gradient, 0.0)
    }

    /// Solve `(H + λI) δ = -g`.
    pub fn solve_augmented_equation(
        &mut self,
        hessian: &SparseColMat<usize, f64>,
        gradient: &Mat<f64>,
        lambda: f64,
    ) -> LinAlgResult<Mat<f64>> {
        let n = hessian.nrows();
        if hessian.ncols() != n || gradient.nrows() != n {
            return Err(LinAlgError::InvalidInput(format!(
                "Hessian is {}x{}, gradient has {} rows",
                n,
                hessian.ncols(),
                gradient.nrows()
            )));
        }
        let rhs = Mat::from_fn(n, 1, |i, _| -gradient[(i, 0)]);
        let augmented = add_diagonal(hessian, lambda)?;

        match factorize_and_solve(&augmented, &rhs) {
            Ok(step) => return Ok(step),
            Err(e) => debug!("{}. Applying regularization.", e),
        }

        // Scale regularization with the diagonal magnitude
        let mut trace = 0.0;
        let mut max_diag = 0.0f64;
        let symbolic = augmented.symbolic();
        for col in 0..n {
            let row_indices = symbolic.row_idx_of_col_raw(col);
            let col_values = augmented.val_of_col(col);
            for (idx, &row) in row_indices.iter().enumerate() {
                if row == col {
                    trace += col_values[idx];
                    max_diag = max_diag.max(col_values[idx].abs());
                }
            }
        }
        let avg_diag = if n > 0 { trace / n as f64 } else { 0.0 };
        let base_reg = avg_diag.max(max_diag).max(1.0);

        for attempt in 0..self.regularization_attempts {
            let reg = base_reg * 10.0f64.powi(attempt - (self.regularization_attempts - 1));
            debug!(
                "Cholesky attempt {}: regularization = {:.2e}",
                attempt + 2,
                reg
            );
            let regularized = match add_diagonal(&augmented, reg) {
                Ok(m) => m,
                Err(e) => {
                    debug!("Failed to create regularized matrix: {}", e);
                    continue;
                }
            };
            match factorize_and_solve(&regularized, &rhs) {
                Ok(step) => {
                    debug!("Cholesky succeeded with regularization {:.2e}", reg);
                    return Ok(step);
                }
                Err(e) => debug!("Cholesky failed with reg {:.2e}: {}", reg, e),
            }
        }

        Err(LinAlgError::FactorizationFailed(format!(
            "Cholesky failed after {} regularization attempts",
            self.regularization_attempts
        )))
    }
}

impl Default for SparseCholeskySolver {
    fn default() -> Self {
        Self::new()
    }
}

/// `a + value · I`, keeping the diagonal in the pattern even when `value` is zero.
fn add_diagonal(
    a: &SparseColMat<usize, f64>,
    value: f64,
) -> LinAlgResult<SparseColMat<usize, f64>> {
    let n = a.nrows();
    let symbolic = a.symbolic();
    let mut triplets = Vec::with_capacity(n * 8);
    for col in 0..n {
        let row_indices = symbolic.row_idx_of_col_raw(col);
        let col_values = a.val_of_col(col);
        for (idx, &row) in row_indices.iter().enumerate() {
            triplets.push(Triplet::new(row, col, col_values[idx]));
        }
    }
    for i in 0..n {
        triplets.push(Triplet::new(i, i, value));
    }
    SparseColMat::try_new_from_triplets(n, n, &triplets)
        .map_err(|e| LinAlgError::SparseMatrixCreation(format!("{e:?}")))
}

fn factorize_and_solve(a: &SparseColMat<usize, f64>, b: &Mat<f64>) -> LinAlgResult<Mat<f64>> {
    let sym = SymbolicLlt::try_new(a.symbolic(), Side::Lower).map_err(|e| {
        LinAlgError::FactorizationFailed(format!("Symbolic Cholesky failed: {:?}", e))
    })?;
    let cholesky = Llt::try_new_with_symbolic(sym, a.as_ref(), Side::Lower).map_err(|e| {
        LinAlgError::FactorizationFailed(format!("Numeric Cholesky failed: {:?}", e))
    })?;
    Ok(cholesky.solve(b))
}
