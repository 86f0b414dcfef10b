//! Dense matrix helpers for the least-squares solver.
//!
//! Shapes are not validated: callers pass conforming matrices.

use nalgebra::DMatrix;
use crate::constants::PIVOT_TOLERANCE;

pub type Matrix = DMatrix<f64>;

/// Plain row-by-column product, accumulated left to right.
pub fn multiply(a: &Matrix, b: &Matrix) -> Matrix {
    let mut result = Matrix::zeros(a.nrows(), b.ncols());
    for i in 0..a.nrows() {
        for j in 0..b.ncols() {
            for k in 0..a.ncols() {
                result[(i, j)] += a[(i, k)] * b[(k, j)];
            }
        }
    }
    result
}

pub fn transpose(a: &Matrix) -> Matrix {
    a.transpose()
}

/// Gauss-Jordan inverse of a square matrix.
///
/// When a pivot is smaller than [`PIVOT_TOLERANCE`] in magnitude, the first later row whose
/// entry in that column exceeds the tolerance is swapped in. Returns `None` if there is no
/// such row.
pub fn invert(matrix: &Matrix) -> Option<Matrix> {
    let n = matrix.nrows();
    let width = 2 * n;
    let mut augmented = Matrix::zeros(n, width);
    augmented.view_mut((0, 0), (n, n)).copy_from(matrix);
    for i in 0..n {
        augmented[(i, n + i)] = 1.0;
    }

    for i in 0..n {
        let mut pivot = augmented[(i, i)];
        if pivot.abs() < PIVOT_TOLERANCE {
            let swap = (i + 1..n).find(|&row| augmented[(row, i)].abs() > PIVOT_TOLERANCE)?;
            augmented.swap_rows(i, swap);
            pivot = augmented[(i, i)];
        }

        for j in 0..width {
            augmented[(i, j)] /= pivot;
        }

        for k in 0..n {
            if k == i {
                continue;
            }
            let factor = augmented[(k, i)];
            for j in 0..width {
                augmented[(k, j)] -= factor * augmented[(i, j)];
            }
        }
    }

    Some(augmented.columns(n, n).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert_identity_round_trip() {
        let m = Matrix::from_row_slice(3, 3, &[4.0, 7.0, 2.0, 3.0, 6.0, 1.0, 2.0, 5.0, 3.0]);
        let inv = invert(&m).expect("matrix is invertible");
        let product = multiply(&m, &inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product[(i, j)] - expected).abs() < 1e-12, "entry ({}, {}) = {}", i, j, product[(i, j)]);
            }
        }
    }

    #[test]
    fn test_invert_swaps_zero_pivot() {
        // Leading zero forces a row swap.
        let m = Matrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 0.0]);
        let inv = invert(&m).expect("matrix is invertible");
        assert_eq!(inv, Matrix::from_row_slice(2, 2, &[0.0, 0.5, 1.0, 0.0]));
    }

    #[test]
    fn test_invert_singular_returns_none() {
        let m = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(invert(&m).is_none());

        let zeros = Matrix::zeros(3, 3);
        assert!(invert(&zeros).is_none());
    }

    #[test]
    fn test_multiply_and_transpose() {
        let a = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let at = transpose(&a);
        assert_eq!(at.nrows(), 3);
        assert_eq!(at[(2, 1)], 6.0);

        let product = multiply(&a, &at);
        assert_eq!(product, Matrix::from_row_slice(2, 2, &[14.0, 32.0, 32.0, 77.0]));
    }
}
