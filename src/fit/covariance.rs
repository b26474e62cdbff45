//! Expansion of the reduced covariance matrix into full parameter space.

use ndarray::Array2;

/// Expand a reduced `mfit`-by-`mfit` covariance matrix, stored in the
/// top-left block of `covar`, into the full parameter-space matrix.
///
/// The normal-equations accumulator only ever touches free-parameter
/// indices, implicitly compacting the matrix. This undoes that compaction:
/// walking parameters from last to first, each free parameter's row and
/// column are swapped from their reduced-space slot into their true
/// position, and everything belonging to a fixed parameter is zeroed.
///
/// After the call, fixed parameters have all-zero rows and columns and the
/// diagonal holds the variance of each fitted parameter.
pub fn expand_covariance(covar: &mut Array2<f64>, vary: &[bool]) {
    let ma = vary.len();
    let mfit = vary.iter().filter(|&&v| v).count();

    // Zero-fill everything beyond the reduced block.
    for i in mfit..ma {
        for j in 0..=i {
            covar[[i, j]] = 0.0;
            covar[[j, i]] = 0.0;
        }
    }

    // Swap reduced-space rows/columns out to their full-space positions,
    // last parameter first, consuming reduced slots from the back.
    let mut k = mfit;
    for j in (0..ma).rev() {
        if vary[j] {
            k -= 1;
            for i in 0..ma {
                let tmp = covar[[i, k]];
                covar[[i, k]] = covar[[i, j]];
                covar[[i, j]] = tmp;
            }
            for i in 0..ma {
                let tmp = covar[[k, i]];
                covar[[k, i]] = covar[[j, i]];
                covar[[j, i]] = tmp;
            }
        }
    }
}
