//! Collaborator contracts between the fitter and the detector.
//!
//! The numerical core never talks to the detector database directly. Light
//! propagation, channel status, channel geometry and medium group velocities
//! are all reached through the traits in this module, injected at
//! construction time. Tests substitute trivial implementations; production
//! code wraps the real optics and channel-status services.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Per-medium path lengths for one source-to-channel ray.
///
/// `total_internal_reflection` and `hit_excluded_region` flag geometries for
/// which the refracted path could not be traced. Implementations must set the
/// flags rather than panic: the fitter probes arbitrary (and occasionally
/// unphysical) source positions while iterating.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathLengths {
    /// Distance travelled through the innermost fluid.
    pub inner: f64,
    /// Distance travelled through the vessel wall.
    pub vessel: f64,
    /// Distance travelled through the outer fluid.
    pub outer: f64,
    /// The ray underwent total internal reflection.
    pub total_internal_reflection: bool,
    /// The ray passed through a reserved/excluded detector region.
    pub hit_excluded_region: bool,
}

impl PathLengths {
    /// Total geometric path length through all three media.
    pub fn total(&self) -> f64 {
        self.inner + self.vessel + self.outer
    }

    /// Whether the traced geometry is usable for derivatives.
    pub fn is_valid(&self) -> bool {
        !self.total_internal_reflection && !self.hit_excluded_region
    }
}

/// Light-path evaluator: medium-by-medium path lengths from a candidate
/// source position to a channel position.
pub trait LightPath {
    /// Trace the path from `source` to `target` for light of the given
    /// energy, under the configured incidence-angle limit.
    ///
    /// Must be callable with any source position and must never panic;
    /// untraceable geometries are reported through the flags on
    /// [`PathLengths`].
    fn path_lengths(
        &self,
        source: [f64; 3],
        target: [f64; 3],
        energy: f64,
        angle_config: f64,
    ) -> PathLengths;
}

/// Channel data-quality lookup, used only by the observation screener.
pub trait ChannelStatus {
    /// Whether the channel was online for the run under fit.
    fn is_online(&self, channel: u32) -> bool;

    /// Whether the channel passes the detector's hardware-quality checks.
    fn is_good(&self, channel: u32) -> bool;
}

/// Read-only channel position lookup.
pub trait ChannelGeometry {
    /// The (x, y, z) position of the channel, or `None` for an id outside
    /// the detector map.
    fn position_of(&self, channel: u32) -> Option<[f64; 3]>;
}

/// The three nested media light traverses between source and channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Medium {
    /// Innermost fluid surrounding the source.
    Inner,
    /// Vessel wall separating the fluids.
    Vessel,
    /// Outer fluid between the vessel and the channels.
    Outer,
}

impl Medium {
    /// All media, in propagation order from the source outwards.
    pub const ALL: [Medium; 3] = [Medium::Inner, Medium::Vessel, Medium::Outer];
}

/// Energy-dependent group-velocity lookup.
///
/// Queried once at fit setup; the velocities are held fixed for the whole
/// fit and are not parameters of the minimization.
pub trait GroupVelocityTable {
    /// Group velocity in the given medium at the given photon energy,
    /// in distance units per ns.
    fn velocity(&self, medium: Medium, energy: f64) -> f64;
}

/// A concrete [`GroupVelocityTable`] backed by per-medium breakpoint lists.
///
/// Each medium carries a list of `(energy, velocity)` points sorted by
/// energy; lookups interpolate linearly and clamp outside the tabulated
/// range. The table deserializes from JSON of the form:
///
/// ```json
/// {
///   "inner":  [[2.0, 21.8], [3.0, 21.4]],
///   "vessel": [[2.0, 19.0], [3.0, 18.5]],
///   "outer":  [[2.0, 22.0], [3.0, 21.7]]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticVelocityTable {
    inner: Vec<(f64, f64)>,
    vessel: Vec<(f64, f64)>,
    outer: Vec<(f64, f64)>,
}

impl StaticVelocityTable {
    /// Build a table from per-medium breakpoint lists, each sorted by
    /// ascending energy.
    pub fn new(inner: Vec<(f64, f64)>, vessel: Vec<(f64, f64)>, outer: Vec<(f64, f64)>) -> Self {
        Self {
            inner,
            vessel,
            outer,
        }
    }

    /// Build a table with a single constant velocity per medium.
    pub fn constant(inner: f64, vessel: f64, outer: f64) -> Self {
        Self {
            inner: vec![(0.0, inner)],
            vessel: vec![(0.0, vessel)],
            outer: vec![(0.0, outer)],
        }
    }

    /// Deserialize a table from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a table from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    fn points(&self, medium: Medium) -> &[(f64, f64)] {
        match medium {
            Medium::Inner => &self.inner,
            Medium::Vessel => &self.vessel,
            Medium::Outer => &self.outer,
        }
    }
}

impl GroupVelocityTable for StaticVelocityTable {
    fn velocity(&self, medium: Medium, energy: f64) -> f64 {
        let points = self.points(medium);
        match points {
            [] => 0.0,
            [(_, v)] => *v,
            _ => {
                let first = points[0];
                let last = points[points.len() - 1];
                if energy <= first.0 {
                    return first.1;
                }
                if energy >= last.0 {
                    return last.1;
                }
                // Linear interpolation between the bracketing breakpoints.
                let hi = points.partition_point(|&(e, _)| e < energy);
                let (e0, v0) = points[hi - 1];
                let (e1, v1) = points[hi];
                v0 + (v1 - v0) * (energy - e0) / (e1 - e0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_path_lengths_total_and_validity() {
        let paths = PathLengths {
            inner: 600.0,
            vessel: 5.5,
            outer: 245.0,
            total_internal_reflection: false,
            hit_excluded_region: false,
        };
        assert_relative_eq!(paths.total(), 850.5);
        assert!(paths.is_valid());

        let flagged = PathLengths {
            total_internal_reflection: true,
            ..paths
        };
        assert!(!flagged.is_valid());
    }

    #[test]
    fn test_velocity_interpolation() {
        let table = StaticVelocityTable::new(
            vec![(2.0, 20.0), (3.0, 22.0), (4.0, 23.0)],
            vec![(2.0, 18.0)],
            vec![(2.0, 21.0), (4.0, 21.0)],
        );

        // Midpoint of the first segment.
        assert_relative_eq!(table.velocity(Medium::Inner, 2.5), 21.0);
        // Single-point table is constant.
        assert_relative_eq!(table.velocity(Medium::Vessel, 3.7), 18.0);
        // Clamped below and above the tabulated range.
        assert_relative_eq!(table.velocity(Medium::Inner, 1.0), 20.0);
        assert_relative_eq!(table.velocity(Medium::Inner, 9.0), 23.0);
        // Flat table interpolates flat.
        assert_relative_eq!(table.velocity(Medium::Outer, 3.0), 21.0);
    }

    #[test]
    fn test_velocity_table_from_json() {
        let json = r#"{
            "inner":  [[2.0, 21.8], [3.0, 21.4]],
            "vessel": [[2.0, 19.0]],
            "outer":  [[2.0, 22.0]]
        }"#;
        let table = StaticVelocityTable::from_json(json).unwrap();
        assert_relative_eq!(table.velocity(Medium::Inner, 2.5), 21.6);
        assert_relative_eq!(table.velocity(Medium::Vessel, 2.0), 19.0);
    }
}
