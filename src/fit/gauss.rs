//! Gauss-Jordan elimination with full pivoting.

use ndarray::{Array1, Array2};

use crate::error::{FitError, Result};

/// Solve `a * delta = b` in place by Gauss-Jordan elimination with full
/// (row and column) pivoting, operating on the top-left `n`-by-`n` block of
/// `a` and the first `n` entries of `b`.
///
/// On success the block of `a` holds its own inverse and `b` holds the
/// solution. Column permutations introduced by the pivot search are unwound
/// before returning, so the result is in the original ordering.
///
/// Two degenerate conditions are detected: a pivot column selected twice
/// (rank-deficient system) and a zero pivot element. Both return
/// [`FitError::SingularMatrix`]; `a` and `b` are left partially reduced and
/// must not be reused.
pub fn gauss_jordan(a: &mut Array2<f64>, n: usize, b: &mut Array1<f64>) -> Result<()> {
    if a.nrows() < n || a.ncols() < n || b.len() < n {
        return Err(FitError::DimensionMismatch(format!(
            "Gauss-Jordan on {}x{} system with {}x{} matrix and rhs of length {}",
            n,
            n,
            a.nrows(),
            a.ncols(),
            b.len()
        )));
    }

    // Pivot bookkeeping: which row/column each elimination step used, and
    // how many times each column has been pivoted on.
    let mut indxr = vec![0usize; n];
    let mut indxc = vec![0usize; n];
    let mut ipiv = vec![0u32; n];

    for i in 0..n {
        // Full pivot search over the not-yet-reduced columns.
        let mut big = 0.0;
        let mut irow = 0;
        let mut icol = 0;
        for j in 0..n {
            if ipiv[j] == 1 {
                continue;
            }
            for k in 0..n {
                if ipiv[k] == 0 {
                    if a[[j, k]].abs() >= big {
                        big = a[[j, k]].abs();
                        irow = j;
                        icol = k;
                    }
                } else if ipiv[k] > 1 {
                    return Err(FitError::SingularMatrix);
                }
            }
        }
        ipiv[icol] += 1;

        if irow != icol {
            for l in 0..n {
                let tmp = a[[irow, l]];
                a[[irow, l]] = a[[icol, l]];
                a[[icol, l]] = tmp;
            }
            b.swap(irow, icol);
        }
        indxr[i] = irow;
        indxc[i] = icol;

        if a[[icol, icol]] == 0.0 {
            return Err(FitError::SingularMatrix);
        }
        let pivinv = 1.0 / a[[icol, icol]];
        a[[icol, icol]] = 1.0;
        for l in 0..n {
            a[[icol, l]] *= pivinv;
        }
        b[icol] *= pivinv;

        for ll in 0..n {
            if ll == icol {
                continue;
            }
            let dum = a[[ll, icol]];
            a[[ll, icol]] = 0.0;
            for l in 0..n {
                a[[ll, l]] -= a[[icol, l]] * dum;
            }
            b[ll] -= b[icol] * dum;
        }
    }

    // Unwind the column interchanges, in reverse order of elimination.
    for l in (0..n).rev() {
        if indxr[l] != indxc[l] {
            for k in 0..n {
                let tmp = a[[k, indxr[l]]];
                a[[k, indxr[l]]] = a[[k, indxc[l]]];
                a[[k, indxc[l]]] = tmp;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};

    #[test]
    fn test_round_trip_solution() {
        // Symmetric positive-definite system.
        let a0 = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let b0 = array![1.0, -2.0, 0.5];

        let mut a = a0.clone();
        let mut b = b0.clone();
        gauss_jordan(&mut a, 3, &mut b).unwrap();

        // a0 * delta == b0
        for i in 0..3 {
            let mut acc = 0.0;
            for j in 0..3 {
                acc += a0[[i, j]] * b[j];
            }
            assert_relative_eq!(acc, b0[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_inverse_left_in_place() {
        let a0 = array![[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        let mut a = a0.clone();
        let mut b = array![1.0, 0.0, 0.0];
        gauss_jordan(&mut a, 3, &mut b).unwrap();

        // a0 * a == I
        let product = a0.dot(&a);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(product[[i, j]], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_block_solve_ignores_padding() {
        // The fit engine passes full-size matrices with only the leading
        // mfit block meaningful; the padding must not be touched.
        let mut a = Array2::zeros((4, 4));
        a[[0, 0]] = 2.0;
        a[[1, 1]] = 4.0;
        a[[2, 2]] = 99.0;
        a[[3, 3]] = 99.0;
        let mut b = array![2.0, 8.0, 7.0, 7.0];
        gauss_jordan(&mut a, 2, &mut b).unwrap();

        assert_relative_eq!(b[0], 1.0);
        assert_relative_eq!(b[1], 2.0);
        assert_relative_eq!(a[[2, 2]], 99.0);
        assert_relative_eq!(b[2], 7.0);
    }

    #[test]
    fn test_zero_pivot_is_singular() {
        let mut a = array![[0.0, 0.0], [0.0, 0.0]];
        let mut b = array![1.0, 1.0];
        match gauss_jordan(&mut a, 2, &mut b) {
            Err(FitError::SingularMatrix) => (),
            other => panic!("Expected SingularMatrix, got {:?}", other),
        }
    }

    #[test]
    fn test_rank_deficient_is_singular() {
        // Two identical rows: rank 1.
        let mut a = array![[1.0, 2.0], [1.0, 2.0]];
        let mut b = array![1.0, 1.0];
        match gauss_jordan(&mut a, 2, &mut b) {
            Err(FitError::SingularMatrix) => (),
            other => panic!("Expected SingularMatrix, got {:?}", other),
        }
    }
}
