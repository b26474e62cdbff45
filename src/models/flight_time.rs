//! Multi-medium light flight-time forward model.
//!
//! Predicts the arrival time of light at a channel from a candidate source
//! position and emission-time offset, using medium-by-medium path lengths
//! from a [`LightPath`] collaborator and fixed per-medium group velocities.

use ndarray::Array1;

use crate::detector::{ChannelGeometry, GroupVelocityTable, LightPath, Medium, PathLengths};
use crate::error::{FitError, Result};
use crate::model::{FitModel, ModelEval};

/// Planck constant times speed of light, in eV·nm.
const HC_EV_NM: f64 = 1239.84193;

/// Default perturbation step for the positional finite differences, in
/// detector distance units.
pub const DEFAULT_PROBE_STEP: f64 = 10.0;

/// Photon energy for a source of the given wavelength (nm), in eV.
pub fn energy_from_wavelength(wavelength: f64) -> f64 {
    HC_EV_NM / wavelength
}

/// Group velocities for all three media at the given energy, queried once
/// at fit setup and then held fixed for the whole fit.
pub fn group_velocities(table: &dyn GroupVelocityTable, energy: f64) -> [f64; 3] {
    [
        table.velocity(Medium::Inner, energy),
        table.velocity(Medium::Vessel, energy),
        table.velocity(Medium::Outer, energy),
    ]
}

/// Forward model for the source position/timing fit.
///
/// Parameters, in order: source x, y, z and emission-time offset t0. The
/// predicted arrival time is the sum over the three media of
/// `path length / group velocity`, plus t0.
///
/// The derivative with respect to t0 is exactly 1. The positional
/// derivatives are one-sided finite differences: each coordinate is
/// perturbed by `probe_step` and the path lengths re-traced. The
/// refraction at the curved vessel boundaries makes the length-vs-position
/// relationship analytically intractable, hence the numerical probe. When
/// the probe ray is flagged as total-internal-reflection or as crossing an
/// excluded region, a straight-line geometric-optics derivative is
/// substituted so that no undefined value leaks into the curvature matrix.
pub struct FlightTimeModel<'a> {
    light_path: &'a dyn LightPath,
    geometry: &'a dyn ChannelGeometry,
    /// Group velocities for [inner, vessel, outer], distance units per ns.
    velocities: [f64; 3],
    /// Photon energy handed to the light-path evaluator, in eV.
    energy: f64,
    /// Incidence-angle configuration constant for the light-path evaluator.
    angle_config: f64,
    /// Finite-difference step for the positional derivatives.
    probe_step: f64,
}

impl<'a> FlightTimeModel<'a> {
    /// Build a forward model for a source of the given wavelength (nm).
    ///
    /// Group velocities are looked up once, here, from `velocity_table`;
    /// they are fixed constants of the model, not fit parameters.
    pub fn new(
        light_path: &'a dyn LightPath,
        geometry: &'a dyn ChannelGeometry,
        velocity_table: &dyn GroupVelocityTable,
        wavelength: f64,
        angle_config: f64,
    ) -> Self {
        let energy = energy_from_wavelength(wavelength);
        Self {
            light_path,
            geometry,
            velocities: group_velocities(velocity_table, energy),
            energy,
            angle_config,
            probe_step: DEFAULT_PROBE_STEP,
        }
    }

    /// Build a forward model with explicit, pre-computed group velocities.
    pub fn with_velocities(
        light_path: &'a dyn LightPath,
        geometry: &'a dyn ChannelGeometry,
        velocities: [f64; 3],
        energy: f64,
        angle_config: f64,
    ) -> Self {
        Self {
            light_path,
            geometry,
            velocities,
            energy,
            angle_config,
            probe_step: DEFAULT_PROBE_STEP,
        }
    }

    /// Override the finite-difference probe step.
    pub fn with_probe_step(mut self, step: f64) -> Self {
        self.probe_step = step;
        self
    }

    /// The group velocities the model was initialized with.
    pub fn velocities(&self) -> [f64; 3] {
        self.velocities
    }

    /// Flight time along the given traced path.
    fn flight_time(&self, paths: &PathLengths) -> f64 {
        paths.inner / self.velocities[0]
            + paths.vessel / self.velocities[1]
            + paths.outer / self.velocities[2]
    }

    /// Path-length-weighted mean group velocity over a traced path.
    fn effective_speed(&self, paths: &PathLengths) -> f64 {
        let total = paths.total();
        (self.velocities[0] * paths.inner
            + self.velocities[1] * paths.vessel
            + self.velocities[2] * paths.outer)
            / total
    }

    /// Straight-line geometric-optics derivative of the flight time with
    /// respect to source coordinate `axis`, evaluated at `source`.
    fn straight_line_derivative(
        &self,
        source: [f64; 3],
        target: [f64; 3],
        axis: usize,
        effective_speed: f64,
    ) -> f64 {
        let dx = target[0] - source[0];
        let dy = target[1] - source[1];
        let dz = target[2] - source[2];
        let distance = (dx * dx + dy * dy + dz * dz).sqrt();
        -(target[axis] - source[axis]) / (effective_speed * distance)
    }
}

impl FitModel for FlightTimeModel<'_> {
    fn parameter_count(&self) -> usize {
        4
    }

    fn evaluate(&self, params: &Array1<f64>, channel: u32) -> Result<ModelEval> {
        if params.len() != 4 {
            return Err(FitError::DimensionMismatch(format!(
                "Expected 4 parameters, got {}",
                params.len()
            )));
        }

        let target = self
            .geometry
            .position_of(channel)
            .ok_or(FitError::UnknownChannel(channel))?;
        let source = [params[0], params[1], params[2]];
        let t0 = params[3];

        let base = self
            .light_path
            .path_lengths(source, target, self.energy, self.angle_config);
        let base_time = self.flight_time(&base);
        let effective_speed = self.effective_speed(&base);

        let mut gradient = Array1::zeros(4);
        for axis in 0..3 {
            let mut probe = source;
            probe[axis] += self.probe_step;

            if base.is_valid() {
                let shifted = self
                    .light_path
                    .path_lengths(probe, target, self.energy, self.angle_config);
                if shifted.is_valid() {
                    gradient[axis] = (self.flight_time(&shifted) - base_time) / self.probe_step;
                    continue;
                }
            }
            // Perturbed (or base) ray is untraceable; fall back to the
            // straight-line derivative at the probe point.
            gradient[axis] = self.straight_line_derivative(probe, target, axis, effective_speed);
        }
        gradient[3] = 1.0;

        Ok(ModelEval {
            predicted: base_time + t0,
            gradient,
        })
    }
}
