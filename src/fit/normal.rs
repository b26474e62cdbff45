//! Normal-equations accumulation for one trial parameter vector.

use ndarray::{Array1, Array2};

use crate::error::{FitError, Result};
use crate::model::FitModel;
use crate::screen::Observation;

/// Weighted curvature matrix, gradient vector and chi-square accumulated
/// over the dataset at one trial parameter vector.
///
/// The matrices are allocated at the full parameter count; only the leading
/// `mfit`-by-`mfit` block (free parameters, in parameter order) is written.
/// The curvature block is symmetric by construction: the lower triangle is
/// accumulated and mirrored after the sweep.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    n_params: usize,
    /// Approximate Hessian of the chi-square surface (leading block).
    pub curvature: Array2<f64>,
    /// Weighted gradient vector "beta" (leading entries).
    pub gradient: Array1<f64>,
    /// Total chi-square over all observations.
    pub chi_square: f64,
    /// Per-observation chi-square contributions, capacity-bounded.
    chi_contributions: Vec<f64>,
    /// Per-observation signed residuals (measured - predicted).
    residuals: Vec<f64>,
    capacity: usize,
}

impl NormalEquations {
    /// Allocate an accumulator for a model with `n_params` parameters.
    pub fn new(n_params: usize, diagnostics_capacity: usize) -> Self {
        Self {
            n_params,
            curvature: Array2::zeros((n_params, n_params)),
            gradient: Array1::zeros(n_params),
            chi_square: 0.0,
            chi_contributions: Vec::new(),
            residuals: Vec::new(),
            capacity: diagnostics_capacity,
        }
    }

    /// One full sweep over the dataset at the given trial parameters.
    ///
    /// Resets all accumulators, then for every observation asks the model
    /// for a prediction and gradient and accumulates the weighted curvature
    /// block, gradient and chi-square over the free-parameter subspace.
    pub fn accumulate<M: FitModel + ?Sized>(
        &mut self,
        model: &M,
        observations: &[Observation],
        params: &Array1<f64>,
        vary: &[bool],
    ) -> Result<()> {
        if vary.len() != self.n_params || params.len() != self.n_params {
            return Err(FitError::DimensionMismatch(format!(
                "Normal equations over {} parameters, got {} varied and {} values",
                self.n_params,
                vary.len(),
                params.len()
            )));
        }

        let mfit = vary.iter().filter(|&&v| v).count();
        for j in 0..mfit {
            for k in 0..=j {
                self.curvature[[j, k]] = 0.0;
            }
            self.gradient[j] = 0.0;
        }
        self.chi_square = 0.0;
        self.chi_contributions.clear();
        self.residuals.clear();

        for obs in observations {
            let eval = model.evaluate(params, obs.channel)?;
            let weight = 1.0 / (obs.sigma * obs.sigma);
            let dy = obs.time - eval.predicted;

            let mut j = 0;
            for l in 0..self.n_params {
                if !vary[l] {
                    continue;
                }
                let wt = eval.gradient[l] * weight;
                let mut k = 0;
                for m in 0..=l {
                    if vary[m] {
                        self.curvature[[j, k]] += wt * eval.gradient[m];
                        k += 1;
                    }
                }
                self.gradient[j] += dy * wt;
                j += 1;
            }

            let chi_entry = dy * dy * weight;
            self.chi_square += chi_entry;
            if self.chi_contributions.len() < self.capacity {
                self.chi_contributions.push(chi_entry);
                self.residuals.push(dy);
            }
        }

        // Mirror the accumulated lower triangle into the upper.
        for j in 1..mfit {
            for k in 0..j {
                self.curvature[[k, j]] = self.curvature[[j, k]];
            }
        }

        Ok(())
    }

    /// Per-observation chi-square contributions from the last sweep, in
    /// dataset order, truncated at the diagnostics capacity.
    pub fn chi_contributions(&self) -> &[f64] {
        &self.chi_contributions
    }

    /// Per-observation signed residuals from the last sweep.
    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }
}
