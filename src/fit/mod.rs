//! The Levenberg-Marquardt fitting engine.
//!
//! `normal` accumulates the weighted normal equations for one trial
//! parameter vector, `gauss` solves the damped system, `stepper` runs one
//! accept/reject damping iteration, `orchestrator` drives the loop to
//! convergence and `covariance` expands the final reduced covariance matrix
//! back into full parameter space.

pub mod config;
pub mod covariance;
pub mod gauss;
pub mod normal;
pub mod orchestrator;
pub mod stepper;

pub use config::FitConfig;
pub use covariance::expand_covariance;
pub use gauss::gauss_jordan;
pub use normal::NormalEquations;
pub use orchestrator::{FitOutcome, FitReport, Fitter};
pub use stepper::{Finalized, LmStepper, StepOutcome};
