//! Screening-pass behavior over full record populations.

use approx::assert_relative_eq;
use lumifit::detector::ChannelStatus;
use lumifit::error::FitError;
use lumifit::screen::{ChannelRecord, ChannelScreener, RejectReason};

struct AllOn;

impl ChannelStatus for AllOn {
    fn is_online(&self, _channel: u32) -> bool {
        true
    }
    fn is_good(&self, _channel: u32) -> bool {
        true
    }
}

/// Status source with explicit offline and bad channel lists.
struct StatusMap {
    offline: Vec<u32>,
    bad: Vec<u32>,
}

impl ChannelStatus for StatusMap {
    fn is_online(&self, channel: u32) -> bool {
        !self.offline.contains(&channel)
    }
    fn is_good(&self, channel: u32) -> bool {
        !self.bad.contains(&channel)
    }
}

fn record(channel: u32, width: f64) -> ChannelRecord {
    ChannelRecord {
        channel,
        prompt_time: 100.0,
        time_of_flight: 30.0,
        prompt_width: width,
        occupancy: 1000.0,
        occupancy_err: 10.0,
        occ_correction: 1.0,
        near_neck: false,
    }
}

fn rejected_for(data: &lumifit::ScreenedData, channel: u32) -> Option<RejectReason> {
    data.summary
        .rejected
        .iter()
        .find(|(c, _)| *c == channel)
        .map(|&(_, r)| r)
}

#[test]
fn uniform_widths_all_survive_the_width_cut() {
    // With identical widths the spread is zero and every deviation is
    // exactly zero; the cut uses a strict inequality so nothing is lost.
    let screener = ChannelScreener::new(&AllOn);
    let records: Vec<_> = (0..20).map(|i| record(i, 2.5)).collect();

    let data = screener.screen(&records, [0.0, 0.0, 0.0]).unwrap();
    assert_eq!(data.observations.len(), 20);
    assert!(data.summary.rejected.is_empty());
    assert_relative_eq!(data.summary.width_mean, 2.5);
    assert_relative_eq!(data.summary.width_sigma, 0.0);
}

#[test]
fn width_outliers_are_cut_on_both_sides() {
    // 14 channels at 3.0 ns and 14 at 5.0 ns give mean 4.0; two probe
    // channels sit symmetrically at 4 +/- d. The acceptance boundary for
    // this population is d = sqrt(252/11) ~ 4.786, so d = 4.77 stays in
    // and d = 4.80 is cut on both sides.
    let build = |d: f64| -> Vec<ChannelRecord> {
        let mut records: Vec<_> = (0..14)
            .map(|i| record(i, 3.0))
            .chain((14..28).map(|i| record(i, 5.0)))
            .collect();
        records.push(record(28, 4.0 - d));
        records.push(record(29, 4.0 + d));
        records
    };

    let screener = ChannelScreener::new(&AllOn);

    let inside = screener.screen(&build(4.77), [0.0, 0.0, 0.0]).unwrap();
    assert_eq!(inside.observations.len(), 30);
    assert!(inside.summary.rejected.is_empty());

    let outside = screener.screen(&build(4.80), [0.0, 0.0, 0.0]).unwrap();
    assert_eq!(outside.observations.len(), 28);
    assert_eq!(rejected_for(&outside, 28), Some(RejectReason::WidthOutlier));
    assert_eq!(rejected_for(&outside, 29), Some(RejectReason::WidthOutlier));
}

#[test]
fn every_cut_reports_its_reason() {
    let status = StatusMap {
        offline: vec![1],
        bad: vec![2],
    };
    let screener = ChannelScreener::new(&status);

    let mut records: Vec<_> = (0..20).map(|i| record(i, 2.5)).collect();
    records[3].occupancy_err = 150.0; // 15% of occupancy
    records[4].occ_correction = 0.5;
    records[5].occ_correction = 2.0;
    records[6].prompt_width = 0.0;
    records[7].near_neck = true;

    let data = screener.screen(&records, [0.0, 0.0, 0.0]).unwrap();
    assert_eq!(data.observations.len(), 13);
    assert_eq!(data.summary.admitted, 13);
    assert_eq!(rejected_for(&data, 1), Some(RejectReason::BadStatus));
    assert_eq!(rejected_for(&data, 2), Some(RejectReason::BadStatus));
    assert_eq!(rejected_for(&data, 3), Some(RejectReason::OccupancyError));
    assert_eq!(rejected_for(&data, 4), Some(RejectReason::OccupancyCorrection));
    assert_eq!(rejected_for(&data, 5), Some(RejectReason::OccupancyCorrection));
    assert_eq!(rejected_for(&data, 6), Some(RejectReason::ZeroWidth));
    assert_eq!(rejected_for(&data, 7), Some(RejectReason::NearNeck));
    assert!(!data.summary.count_mismatch);
}

#[test]
fn occ_correction_boundaries_are_admissible() {
    let screener = ChannelScreener::new(&AllOn);
    let mut records: Vec<_> = (0..10).map(|i| record(i, 2.5)).collect();
    records[0].occ_correction = 0.7;
    records[1].occ_correction = 1.5;

    let data = screener.screen(&records, [0.0, 0.0, 0.0]).unwrap();
    assert_eq!(data.observations.len(), 10);
}

#[test]
fn occupancy_error_exactly_at_ten_percent_is_admissible() {
    let screener = ChannelScreener::new(&AllOn);
    let mut records: Vec<_> = (0..10).map(|i| record(i, 2.5)).collect();
    records[0].occupancy_err = 100.0; // exactly 10% of 1000

    let data = screener.screen(&records, [0.0, 0.0, 0.0]).unwrap();
    assert_eq!(data.observations.len(), 10);
}

#[test]
fn all_rejected_is_no_data() {
    let status = StatusMap {
        offline: (0..5).collect(),
        bad: vec![],
    };
    let screener = ChannelScreener::new(&status);
    let records: Vec<_> = (0..5).map(|i| record(i, 2.5)).collect();

    match screener.screen(&records, [0.0, 0.0, 0.0]) {
        Err(FitError::NoData) => (),
        _ => panic!("Expected NoData"),
    }
}

#[test]
fn offline_channels_do_not_bias_the_width_statistics() {
    // Channel 5 is offline with a wild width; the statistics only cover
    // online channels, so the remaining uniform widths all survive.
    let status = StatusMap {
        offline: vec![5],
        bad: vec![],
    };
    let screener = ChannelScreener::new(&status);
    let mut records: Vec<_> = (0..20).map(|i| record(i, 2.5)).collect();
    records[5].prompt_width = 500.0;

    let data = screener.screen(&records, [0.0, 0.0, 0.0]).unwrap();
    assert_eq!(data.observations.len(), 19);
    assert_eq!(rejected_for(&data, 5), Some(RejectReason::BadStatus));
    assert_relative_eq!(data.summary.width_mean, 2.5);
}
