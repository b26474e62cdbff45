//! Pre-fit screening of per-channel measurements.
//!
//! Converts raw per-channel records into the fit's dataset, rejecting
//! channels that fail data-quality checks, and seeds the initial parameter
//! vector. Screening runs once; the admitted observation list is immutable
//! for the duration of the fit.

use ndarray::{array, Array1};
use serde::{Deserialize, Serialize};

use crate::detector::ChannelStatus;
use crate::error::{FitError, Result};

/// Number of time bins in the prompt-peak window. The per-channel timing
/// uncertainty is the peak width divided by sqrt(bins - 1).
const PROMPT_WINDOW_BINS: u32 = 32;

/// Relative occupancy-correction uncertainty above which a channel is cut.
const MAX_OCCUPANCY_RELATIVE_ERR: f64 = 0.1;

/// Admissible range for the multiplicity correction factor.
const OCC_CORRECTION_RANGE: (f64, f64) = (0.7, 1.5);

/// Half-width of the prompt-width acceptance window, in standard deviations.
const WIDTH_CUT_NSIGMA: f64 = 3.0;

/// Fallback width spread when too few channels exist to estimate one;
/// large enough that the width cut passes everything.
const WIDE_OPEN_SIGMA: f64 = 1000.0;

/// One raw per-channel measurement record, as produced by the upstream
/// run-level reduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelRecord {
    /// Channel identifier.
    pub channel: u32,
    /// Fitted prompt-peak time, ns.
    pub prompt_time: f64,
    /// Time-of-flight correction term, ns.
    pub time_of_flight: f64,
    /// Prompt-peak width, ns.
    pub prompt_width: f64,
    /// Multiplicity-corrected occupancy.
    pub occupancy: f64,
    /// Uncertainty on the corrected occupancy.
    pub occupancy_err: f64,
    /// Multiplicity correction factor applied to the raw occupancy.
    pub occ_correction: f64,
    /// The channel sits near the vessel neck, where paths are unreliable.
    pub near_neck: bool,
}

/// One admitted data point of the fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Channel identifier.
    pub channel: u32,
    /// Measured arrival time: prompt-peak time plus time of flight, ns.
    pub time: f64,
    /// Per-channel timing uncertainty, ns.
    pub sigma: f64,
}

/// Why a channel was rejected; recorded in the [`ScreenSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The channel-status collaborator reports the channel off or bad.
    BadStatus,
    /// Occupancy-correction uncertainty above 10% of the corrected value.
    OccupancyError,
    /// Multiplicity correction factor outside the admissible range.
    OccupancyCorrection,
    /// Prompt-peak width of exactly zero.
    ZeroWidth,
    /// Channel flagged as near the vessel neck.
    NearNeck,
    /// Prompt-peak width more than 3 sigma from the run mean.
    WidthOutlier,
}

/// Bookkeeping from one screening pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenSummary {
    /// Number of channels admitted to the fit.
    pub admitted: usize,
    /// Number of channels rejected, with reasons.
    pub rejected: Vec<(u32, RejectReason)>,
    /// Mean prompt-peak width over online channels, ns.
    pub width_mean: f64,
    /// Standard deviation of the prompt-peak width over online channels, ns.
    pub width_sigma: f64,
    /// Set when the admitted/rejected split does not add up to the nominal
    /// channel count. A consistency warning, not a failure.
    pub count_mismatch: bool,
}

/// The screener's output: the fit's dataset and starting point.
#[derive(Debug, Clone)]
pub struct ScreenedData {
    /// Admitted observations, in screening order.
    pub observations: Vec<Observation>,
    /// Initial parameter vector [x, y, z, t0], seeded from the supplied
    /// position estimate with t0 = 0.
    pub initial_params: Array1<f64>,
    /// Screening statistics and rejection bookkeeping.
    pub summary: ScreenSummary,
}

/// Screens raw channel records into the fit's input dataset.
pub struct ChannelScreener<'a> {
    status: &'a dyn ChannelStatus,
}

impl<'a> ChannelScreener<'a> {
    pub fn new(status: &'a dyn ChannelStatus) -> Self {
        Self { status }
    }

    /// Run the screening pass.
    ///
    /// # Arguments
    ///
    /// * `records` - Raw per-channel records for the run under fit
    /// * `seed_position` - Externally supplied initial source position
    ///
    /// # Returns
    ///
    /// * The admitted dataset and seeded parameters, or [`FitError::NoData`]
    ///   when no channel survives
    pub fn screen(&self, records: &[ChannelRecord], seed_position: [f64; 3]) -> Result<ScreenedData> {
        if records.is_empty() {
            return Err(FitError::NoData);
        }

        let (width_mean, width_sigma) = self.width_statistics(records);

        let mut observations = Vec::new();
        let mut rejected = Vec::new();
        for record in records {
            match self.admit(record, width_mean, width_sigma) {
                Some(reason) => rejected.push((record.channel, reason)),
                None => observations.push(Observation {
                    channel: record.channel,
                    time: record.prompt_time + record.time_of_flight,
                    sigma: record.prompt_width / f64::from(PROMPT_WINDOW_BINS - 1).sqrt(),
                }),
            }
        }

        if observations.is_empty() {
            return Err(FitError::NoData);
        }

        let count_mismatch = records.len() - rejected.len() != observations.len();
        if count_mismatch {
            log::warn!(
                "screening count mismatch: {} records, {} admitted, {} rejected",
                records.len(),
                observations.len(),
                rejected.len()
            );
        }

        let summary = ScreenSummary {
            admitted: observations.len(),
            rejected,
            width_mean,
            width_sigma,
            count_mismatch,
        };

        Ok(ScreenedData {
            observations,
            initial_params: array![seed_position[0], seed_position[1], seed_position[2], 0.0],
            summary,
        })
    }

    /// Mean and standard deviation of the prompt-peak width over channels
    /// the status collaborator reports online.
    ///
    /// Uses the unbiased estimator: the raw second moment is scaled by
    /// n/(n-1) before the square root. With fewer than two online channels
    /// no spread can be estimated and the cut is effectively disabled.
    fn width_statistics(&self, records: &[ChannelRecord]) -> (f64, f64) {
        let mut n = 0usize;
        let mut mean = 0.0;
        let mut mean_sq = 0.0;
        for record in records {
            if self.status.is_online(record.channel) {
                n += 1;
                mean += record.prompt_width;
                mean_sq += record.prompt_width * record.prompt_width;
            }
        }

        if n < 2 {
            let mean = if n == 1 { mean } else { 0.0 };
            return (mean, WIDE_OPEN_SIGMA);
        }

        let nf = n as f64;
        mean /= nf;
        mean_sq /= nf;
        let s_squared = (nf / (nf - 1.0)) * (mean_sq - mean * mean);
        (mean, s_squared.max(0.0).sqrt())
    }

    /// Returns the rejection reason for a channel, or `None` if admitted.
    fn admit(
        &self,
        record: &ChannelRecord,
        width_mean: f64,
        width_sigma: f64,
    ) -> Option<RejectReason> {
        if !self.status.is_online(record.channel) || !self.status.is_good(record.channel) {
            return Some(RejectReason::BadStatus);
        }
        if record.occupancy_err > MAX_OCCUPANCY_RELATIVE_ERR * record.occupancy {
            return Some(RejectReason::OccupancyError);
        }
        if record.occ_correction < OCC_CORRECTION_RANGE.0
            || record.occ_correction > OCC_CORRECTION_RANGE.1
        {
            return Some(RejectReason::OccupancyCorrection);
        }
        if record.prompt_width == 0.0 {
            return Some(RejectReason::ZeroWidth);
        }
        if record.near_neck {
            return Some(RejectReason::NearNeck);
        }
        // Strict inequality: a width exactly at mean +/- 3 sigma stays in.
        if (record.prompt_width - width_mean).abs() > WIDTH_CUT_NSIGMA * width_sigma {
            return Some(RejectReason::WidthOutlier);
        }
        None
    }
}
