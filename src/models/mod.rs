//! Forward-model implementations.
//!
//! [`flight_time`] holds the physical multi-medium arrival-time model;
//! [`linear`] holds the trivially solvable model used to test the engine in
//! isolation.

pub mod flight_time;
pub mod linear;

pub use flight_time::{energy_from_wavelength, group_velocities, FlightTimeModel};
pub use linear::LinearTimeModel;
