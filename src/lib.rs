//! # lumifit
//!
//! `lumifit` fits the position and emission time of a point light source
//! from per-channel arrival-time measurements in a nested-media optical
//! detector, using a from-scratch Levenberg-Marquardt minimizer.
//!
//! The library provides:
//! - A generic LM engine (damping control loop, normal-equations assembly,
//!   Gauss-Jordan solve, covariance expansion) over a pluggable model trait
//! - A physical forward model predicting arrival times from multi-medium
//!   light paths, with finite-difference positional derivatives
//! - A screening pass turning raw per-channel records into the fit dataset
//!
//! Detector services (light-path tracing, channel status, geometry, group
//! velocities) are reached through the traits in [`detector`], injected at
//! construction time.
//!
//! ## Basic Usage
//!
//! ```ignore
//! let screener = ChannelScreener::new(&status);
//! let data = screener.screen(&records, seed_position)?;
//! let model = FlightTimeModel::new(&light_path, &geometry, &velocities, 500.0, angle_config);
//! let outcome = Fitter::new().fit(&model, &data.observations, data.initial_params, &[true; 4])?;
//! ```

pub mod detector;
pub mod error;
pub mod fit;
pub mod model;
pub mod models;
pub mod screen;

// Re-exports for convenience
pub use error::{FitError, Result};

pub use detector::{
    ChannelGeometry, ChannelStatus, GroupVelocityTable, LightPath, Medium, PathLengths,
    StaticVelocityTable,
};
pub use fit::{FitConfig, FitOutcome, FitReport, Fitter};
pub use model::{FitModel, ModelEval};
pub use models::{FlightTimeModel, LinearTimeModel};
pub use screen::{ChannelRecord, ChannelScreener, Observation, ScreenedData, ScreenSummary};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
