use anyhow::{anyhow, Result};
use faer::{prelude::*, solvers::PartialPivLu, Mat};

/// Dense solver for the reduced susceptance systems `B'θ = P`.
///
/// `solve_many` shares one factorization across right-hand sides, which is how
/// the PTDF matrix is built (one column per injection node).
pub trait LinearSystemBackend: Send + Sync {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>>;

    fn solve_many(&self, matrix: &[Vec<f64>], rhs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rhs.iter().map(|b| self.solve(matrix, b)).collect()
    }
}

fn check_dimensions(matrix: &[Vec<f64>], rhs_len: usize) -> Result<()> {
    let n = matrix.len();
    if rhs_len != n {
        return Err(anyhow!(
            "rhs length ({}) does not match matrix dimension {}",
            rhs_len,
            n
        ));
    }
    if matrix.iter().any(|row| row.len() != n) {
        return Err(anyhow!("matrix must be square"));
    }
    Ok(())
}

/// Gauss-Jordan elimination with partial pivoting.
#[derive(Debug, Clone, Default)]
pub struct GaussSolver;

impl LinearSystemBackend for GaussSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
        let n = matrix.len();
        if n == 0 {
            return Ok(Vec::new());
        }
        check_dimensions(matrix, rhs.len())?;

        let mut a = matrix.to_vec();
        let mut b = rhs.to_vec();

        for i in 0..n {
            let mut pivot = i;
            for row in i + 1..n {
                if a[row][i].abs() > a[pivot][i].abs() {
                    pivot = row;
                }
            }
            if pivot != i {
                a.swap(i, pivot);
                b.swap(i, pivot);
            }

            let diag = a[i][i];
            if diag.abs() < 1e-12 {
                return Err(anyhow!("singular matrix"));
            }

            for value in a[i][i..].iter_mut() {
                *value /= diag;
            }
            b[i] /= diag;

            let pivot_row = a[i][i..].to_vec();
            for row in 0..n {
                if row == i {
                    continue;
                }
                let factor = a[row][i];
                if factor == 0.0 {
                    continue;
                }
                for (target, &p) in a[row][i..].iter_mut().zip(pivot_row.iter()) {
                    *target -= factor * p;
                }
                b[row] -= factor * b[i];
            }
        }

        Ok(b)
    }
}

/// LU factorization from `faer`, factored once per call to `solve_many`.
#[derive(Debug, Clone, Default)]
pub struct FaerSolver;

impl FaerSolver {
    fn solve_columns(matrix: &[Vec<f64>], rhs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        let n = matrix.len();
        if n == 0 {
            return Ok(rhs.iter().map(|_| Vec::new()).collect());
        }
        for b in rhs {
            check_dimensions(matrix, b.len())?;
        }

        let mat = Mat::from_fn(n, n, |i, j| matrix[i][j]);
        let rhs_mat = Mat::from_fn(n, rhs.len(), |i, j| rhs[j][i]);
        let lu = PartialPivLu::new(mat.as_ref());
        let sol = lu.solve(&rhs_mat);

        let mut columns = Vec::with_capacity(rhs.len());
        for j in 0..rhs.len() {
            let column: Vec<f64> = (0..n).map(|i| sol.read(i, j)).collect();
            // LU does not report singularity; it shows up as non-finite entries
            if column.iter().any(|v| !v.is_finite()) {
                return Err(anyhow!("singular matrix"));
            }
            columns.push(column);
        }
        Ok(columns)
    }
}

impl LinearSystemBackend for FaerSolver {
    fn solve(&self, matrix: &[Vec<f64>], rhs: &[f64]) -> Result<Vec<f64>> {
        let mut columns = Self::solve_columns(matrix, &[rhs.to_vec()])?;
        Ok(columns.pop().unwrap_or_default())
    }

    fn solve_many(&self, matrix: &[Vec<f64>], rhs: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        Self::solve_columns(matrix, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laplacian_3() -> Vec<Vec<f64>> {
        vec![
            vec![2.0, -1.0, 0.0],
            vec![-1.0, 2.0, -1.0],
            vec![0.0, -1.0, 2.0],
        ]
    }

    #[test]
    fn test_backends_agree() {
        let rhs = vec![1.0, 0.0, -1.0];
        let gauss = GaussSolver.solve(&laplacian_3(), &rhs).unwrap();
        let faer = FaerSolver.solve(&laplacian_3(), &rhs).unwrap();
        for (g, f) in gauss.iter().zip(faer.iter()) {
            assert!((g - f).abs() < 1e-10);
        }
        assert!((gauss[0] - 0.5).abs() < 1e-12);
        assert!(gauss[1].abs() < 1e-12);
    }

    #[test]
    fn test_solve_many_identity_gives_inverse() {
        let identity: Vec<Vec<f64>> = (0..3)
            .map(|j| (0..3).map(|i| if i == j { 1.0 } else { 0.0 }).collect())
            .collect();
        let inv = FaerSolver.solve_many(&laplacian_3(), &identity).unwrap();
        // inverse of the 3x3 path Laplacian (grounded at both ends) has 0.75 on the corner
        assert!((inv[0][0] - 0.75).abs() < 1e-10);
        assert!((inv[1][1] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_singular_matrix_is_reported() {
        let singular = vec![vec![1.0, -1.0], vec![-1.0, 1.0]];
        assert!(GaussSolver.solve(&singular, &[1.0, -1.0]).is_err());
        assert!(FaerSolver.solve(&singular, &[1.0, -1.0]).is_err());
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(GaussSolver.solve(&laplacian_3(), &[1.0]).is_err());
    }
}
