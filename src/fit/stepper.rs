//! One Levenberg-Marquardt iteration: damped trial step, accept or reject.

use ndarray::{Array1, Array2};

use crate::error::{FitError, Result};
use crate::model::FitModel;
use crate::screen::Observation;

use super::config::FitConfig;
use super::covariance::expand_covariance;
use super::gauss::gauss_jordan;
use super::normal::NormalEquations;

/// Lifecycle of the stepper: the phases must be driven in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Iterating,
    Done,
}

/// Outcome of one damping-controlled iteration.
#[derive(Debug, Clone, Copy)]
pub struct StepOutcome {
    /// Chi-square after the step: the trial value if accepted, the
    /// reverted best value if rejected.
    pub chi_square: f64,
    /// Damping parameter after adjustment.
    pub lambda: f64,
    /// Whether the trial step was accepted.
    pub accepted: bool,
}

/// Covariance and curvature matrices produced by the terminal call.
#[derive(Debug, Clone)]
pub struct Finalized {
    /// Full covariance matrix; fixed parameters carry zero rows/columns.
    pub covariance: Array2<f64>,
    /// Full curvature matrix at the solution, expanded the same way.
    pub curvature: Array2<f64>,
}

/// The Levenberg-Marquardt stepper.
///
/// Owns every working buffer of the iteration: the curvature/gradient
/// snapshot at the best-so-far parameters, the trial-point accumulator, the
/// damped system and the trial parameter vector. Nothing in here is
/// observable by the caller until a step is accepted, at which point the
/// caller's parameter vector is overwritten in place.
///
/// Drive it as: [`initialize`](Self::initialize) once, then
/// [`step`](Self::step) until the outer loop converges, then
/// [`finalize`](Self::finalize) for the covariance. A
/// [`FitError::SingularMatrix`] from the linear solve aborts the fit; the
/// stepper must not be stepped again afterwards.
pub struct LmStepper {
    vary: Vec<bool>,
    mfit: usize,
    lambda: f64,
    lambda_up: f64,
    lambda_down: f64,
    lambda_init: f64,
    phase: Phase,
    /// Best chi-square seen so far ("ochisq").
    best_chi_square: f64,
    /// Curvature/gradient snapshot at the best-so-far parameters.
    best: NormalEquations,
    /// Accumulator for the trial point; swapped with `best` on acceptance.
    trial: NormalEquations,
    /// Damped copy of the curvature block handed to the solver.
    damped: Array2<f64>,
    /// Right-hand side / parameter increment ("da").
    delta: Array1<f64>,
    /// Trial parameter vector ("atry").
    atry: Array1<f64>,
}

impl LmStepper {
    /// Allocate a stepper for the given free-parameter mask.
    pub fn new(vary: &[bool], config: &FitConfig) -> Result<Self> {
        let ma = vary.len();
        let mfit = vary.iter().filter(|&&v| v).count();
        if mfit == 0 {
            return Err(FitError::InvalidState(
                "at least one parameter must be free".to_string(),
            ));
        }

        Ok(Self {
            vary: vary.to_vec(),
            mfit,
            lambda: -1.0,
            lambda_up: config.lambda_up,
            lambda_down: config.lambda_down,
            lambda_init: config.lambda_init,
            phase: Phase::Init,
            best_chi_square: 0.0,
            best: NormalEquations::new(ma, config.diagnostics_capacity),
            trial: NormalEquations::new(ma, config.diagnostics_capacity),
            damped: Array2::zeros((ma, ma)),
            delta: Array1::zeros(ma),
            atry: Array1::zeros(ma),
        })
    }

    /// Current damping parameter.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Chi-square at the best-so-far parameters.
    pub fn chi_square(&self) -> f64 {
        self.best_chi_square
    }

    /// Per-observation chi-square contributions at the best-so-far point.
    pub fn chi_contributions(&self) -> &[f64] {
        self.best.chi_contributions()
    }

    /// Per-observation signed residuals at the best-so-far point.
    pub fn residuals(&self) -> &[f64] {
        self.best.residuals()
    }

    /// Baseline pass: accumulate the normal equations at the starting
    /// parameters and arm the damping parameter.
    pub fn initialize<M: FitModel + ?Sized>(
        &mut self,
        model: &M,
        observations: &[Observation],
        params: &Array1<f64>,
    ) -> Result<f64> {
        if self.phase != Phase::Init {
            return Err(FitError::InvalidState(
                "stepper already initialized".to_string(),
            ));
        }

        self.best
            .accumulate(model, observations, params, &self.vary)?;
        self.best_chi_square = self.best.chi_square;
        self.lambda = self.lambda_init;
        self.atry.assign(params);
        self.phase = Phase::Iterating;
        Ok(self.best_chi_square)
    }

    /// One damped trial step.
    ///
    /// Solves the damped normal equations for a parameter increment, probes
    /// the trial point, and either accepts it (chi-square improved: damping
    /// shrinks, snapshot and `params` updated) or rejects it (damping
    /// grows, everything reverts).
    pub fn step<M: FitModel + ?Sized>(
        &mut self,
        model: &M,
        observations: &[Observation],
        params: &mut Array1<f64>,
    ) -> Result<StepOutcome> {
        if self.phase != Phase::Iterating {
            return Err(FitError::InvalidState(
                "step called outside the iterating phase".to_string(),
            ));
        }

        self.solve_damped(self.lambda)?;

        // Form the trial vector: increment free parameters only.
        self.atry.assign(params);
        let mut j = 0;
        for l in 0..self.vary.len() {
            if self.vary[l] {
                self.atry[l] += self.delta[j];
                j += 1;
            }
        }

        self.trial
            .accumulate(model, observations, &self.atry, &self.vary)?;

        let accepted = self.trial.chi_square < self.best_chi_square;
        if accepted {
            self.lambda *= self.lambda_down;
            self.best_chi_square = self.trial.chi_square;
            std::mem::swap(&mut self.best, &mut self.trial);
            params.assign(&self.atry);
        } else {
            self.lambda *= self.lambda_up;
        }

        Ok(StepOutcome {
            chi_square: self.best_chi_square,
            lambda: self.lambda,
            accepted,
        })
    }

    /// Terminal call: zero-damping solve of the current curvature, yielding
    /// the covariance matrix, both expanded to full parameter space.
    ///
    /// Does not change the parameter vector. The stepper is Done afterwards
    /// and cannot be stepped again.
    pub fn finalize(&mut self) -> Result<Finalized> {
        if self.phase != Phase::Iterating {
            return Err(FitError::InvalidState(
                "finalize called outside the iterating phase".to_string(),
            ));
        }

        self.lambda = 0.0;
        self.solve_damped(0.0)?;

        // The solver left the inverse of the (undamped) curvature block in
        // place: that is the reduced covariance matrix.
        let mut covariance = self.damped.clone();
        expand_covariance(&mut covariance, &self.vary);

        let mut curvature = self.best.curvature.clone();
        expand_covariance(&mut curvature, &self.vary);

        self.phase = Phase::Done;
        Ok(Finalized {
            covariance,
            curvature,
        })
    }

    /// Build the damped system from the best-so-far snapshot and solve it,
    /// leaving the increment in `delta` and the inverse in `damped`.
    fn solve_damped(&mut self, lambda: f64) -> Result<()> {
        for j in 0..self.mfit {
            for k in 0..self.mfit {
                self.damped[[j, k]] = self.best.curvature[[j, k]];
            }
            self.damped[[j, j]] = self.best.curvature[[j, j]] * (1.0 + lambda);
            self.delta[j] = self.best.gradient[j];
        }
        gauss_jordan(&mut self.damped, self.mfit, &mut self.delta)
    }
}
