//! Outer fit loop: drive the stepper to convergence.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{FitError, Result};
use crate::model::FitModel;
use crate::screen::Observation;

use super::config::FitConfig;
use super::stepper::LmStepper;

/// Result of a converged (or iteration-capped) fit.
#[derive(Debug, Clone)]
pub struct FitOutcome {
    /// Fitted parameter vector.
    pub params: Array1<f64>,
    /// Free-parameter mask the fit was run with.
    pub vary: Vec<bool>,
    /// Full covariance matrix; fixed parameters have zero rows/columns.
    pub covariance: Array2<f64>,
    /// Full curvature matrix at the solution.
    pub curvature: Array2<f64>,
    /// Chi-square at the solution.
    pub chi_square: f64,
    /// Number of observations used.
    pub n_observations: usize,
    /// Number of damping-controlled iterations performed.
    pub iterations: usize,
}

impl FitOutcome {
    /// Standard error on each parameter: square root of the covariance
    /// diagonal. Zero for fixed parameters.
    pub fn std_errors(&self) -> Array1<f64> {
        self.covariance.diag().mapv(|v| v.max(0.0).sqrt())
    }

    /// Chi-square per degree of freedom.
    pub fn reduced_chi_square(&self) -> f64 {
        let mfit = self.vary.iter().filter(|&&v| v).count();
        self.chi_square / (self.n_observations as f64 - mfit as f64)
    }

    /// Serializable summary of the fit.
    pub fn report(&self) -> FitReport {
        FitReport {
            params: self.params.to_vec(),
            std_errors: self.std_errors().to_vec(),
            chi_square: self.chi_square,
            reduced_chi_square: self.reduced_chi_square(),
            n_observations: self.n_observations,
            iterations: self.iterations,
        }
    }
}

/// Flat, serializable view of a [`FitOutcome`] for storage or printing by
/// the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub params: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub chi_square: f64,
    pub reduced_chi_square: f64,
    pub n_observations: usize,
    pub iterations: usize,
}

/// The fit orchestrator.
///
/// Repeatedly invokes the Levenberg-Marquardt stepper until the chi-square
/// stops changing by more than the configured tolerance for several
/// consecutive iterations, then makes the terminal zero-damping call that
/// produces the covariance matrix.
#[derive(Debug, Clone, Default)]
pub struct Fitter {
    config: FitConfig,
}

impl Fitter {
    /// Create a fitter with default configuration.
    pub fn new() -> Self {
        Self {
            config: FitConfig::default(),
        }
    }

    /// Create a fitter with the given configuration.
    pub fn with_config(config: FitConfig) -> Self {
        Self { config }
    }

    /// Fit the model to the observations.
    ///
    /// # Arguments
    ///
    /// * `model` - The forward model to fit
    /// * `observations` - The screened dataset
    /// * `initial_params` - Starting parameter vector
    /// * `vary` - Free-parameter mask, one entry per parameter
    ///
    /// # Returns
    ///
    /// * The fitted parameters, covariance and chi-square, or an error:
    ///   [`FitError::NoData`] for an empty dataset,
    ///   [`FitError::SingularMatrix`] if the curvature degenerates.
    pub fn fit<M: FitModel + ?Sized>(
        &self,
        model: &M,
        observations: &[Observation],
        initial_params: Array1<f64>,
        vary: &[bool],
    ) -> Result<FitOutcome> {
        if observations.is_empty() {
            return Err(FitError::NoData);
        }
        let ma = model.parameter_count();
        if initial_params.len() != ma || vary.len() != ma {
            return Err(FitError::DimensionMismatch(format!(
                "Model has {} parameters, got {} initial values and {} mask entries",
                ma,
                initial_params.len(),
                vary.len()
            )));
        }

        let mut params = initial_params;
        let mut stepper = LmStepper::new(vary, &self.config)?;

        let mut chi_square = stepper.initialize(model, observations, &params)?;
        let mut previous = chi_square;

        let mut iterations = 0;
        let mut good_iterations = 0;
        while (f64::abs(chi_square - previous) > self.config.tolerance
            || good_iterations < self.config.required_good_iterations)
            && iterations < self.config.max_iterations
        {
            previous = chi_square;
            let outcome = stepper.step(model, observations, &mut params)?;
            chi_square = outcome.chi_square;
            iterations += 1;

            if f64::abs(previous - chi_square) < self.config.tolerance {
                good_iterations += 1;
            } else {
                good_iterations = 0;
            }
        }

        let finalized = stepper.finalize()?;

        Ok(FitOutcome {
            params,
            vary: vary.to_vec(),
            covariance: finalized.covariance,
            curvature: finalized.curvature,
            chi_square,
            n_observations: observations.len(),
            iterations,
        })
    }
}
