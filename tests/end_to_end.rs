//! The literal end-to-end scenarios from spec §8: empty stream, steady
//! single-flow stream, a single decelerating jitter, the OLDC clamp
//! example, and detector clear/replay determinism.

use jitter_sketch::control::delay_variation;
use jitter_sketch::detector::{Detector, FDFilter, GroundTruthDetector};
use jitter_sketch::event::{JitterDetectionMode, JitterParams};
use jitter_sketch::flowkey::FlowKey;
use jitter_sketch::hash::AwareHash;
use jitter_sketch::optimizer::{Oldc, Optimizer};
use jitter_sketch::record::Record;

fn params(frequency_threshold: u32) -> JitterParams {
    JitterParams {
        jitter_factor: 2.0,
        min_absolute_jitter_thres: 500,
        max_ifpd_diff: 1_000_000,
        jitter_detection_mode: JitterDetectionMode::Either,
        frequency_threshold,
    }
}

/// Scenario A: empty stream.
#[test]
fn empty_stream_yields_zero_events_and_zero_metrics() {
    let mut truth = GroundTruthDetector::new(params(30));
    assert!(truth.abnormal_events().is_empty());

    let mut fd = FDFilter::<AwareHash>::new(3, 4, 1024, 3, 1024, 3, 2_000_000, params(30), 4096, 1024, 4);
    assert!(fd.abnormal_events().is_empty());
    assert_eq!(fd.update(&FlowKey::new(1, 1, 1, 1, 1), 0), 0);
    fd.clear();

    assert!(Oldc::new(5).optimize(&[]).is_empty());
    let _ = truth;
}

/// Scenario B: 100 packets of one flow at exactly 1000 us apart. Ground
/// truth emits zero events. OLDC re-anchors the stream at `a_B` (n=100 >
/// 2B=20, so the anchored transform runs rather than the identity
/// short-circuit), but since the input is already perfectly even, the
/// re-anchored output is too: its delay variation stays zero.
#[test]
fn single_flow_steady_stream_has_no_jitter_and_oldc_keeps_zero_variation() {
    let mut truth = GroundTruthDetector::new(params(30));
    let key = FlowKey::new(10, 20, 1000, 80, 6);
    let mut timestamps = Vec::new();
    let mut ts = 0u64;
    for _ in 0..100 {
        truth.update(&Record::new(key, ts, 0));
        timestamps.push(ts);
        ts += 1000;
    }
    assert!(truth.abnormal_events().is_empty());

    let optimized = Oldc::new(10).optimize(&timestamps);
    assert_eq!(delay_variation(&optimized), 0.0);
}

/// Scenario C: 40 packets at 1000us spacing, a 5000us gap at packet 41,
/// then back to 1000us. Ground truth in mode "either" emits exactly one
/// event at packet 41 with old=1000, new=5000.
#[test]
fn single_decelerating_gap_is_the_only_reported_event() {
    let mut truth = GroundTruthDetector::new(params(30));
    let key = FlowKey::new(1, 2, 3, 4, 6);
    let mut ts = 0u64;
    for _ in 0..40 {
        truth.update(&Record::new(key, ts, 0));
        ts += 1000;
    }
    ts += 5000; // packet 41: the gap
    let gap_ts = ts;
    truth.update(&Record::new(key, ts, 0));
    ts += 1000;
    truth.update(&Record::new(key, ts, 0));

    let events = truth.abnormal_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].old_ifpd, 1000);
    assert_eq!(events[0].new_ifpd, 5000);
    assert_eq!(events[0].timestamp_us, gap_ts);
}

/// Scenario D: a single spike clamped toward its `a_{k+2B}` neighbor.
#[test]
fn oldc_clamps_a_spike_toward_its_trailing_neighbor() {
    let mut a = vec![0u64, 10, 20, 1000, 30, 40];
    a.extend((6..40u64).map(|i| i * 10));
    let out = Oldc::new(2).optimize(&a);
    assert!(out[3] <= 1000);
}

/// Scenario F: running `update` over a fixed stream, clearing, then
/// replaying produces byte-identical events.
#[test]
fn detector_clear_then_replay_reproduces_the_same_events() {
    let mut d = FDFilter::<AwareHash>::new(3, 4, 1024, 3, 1024, 3, 2_000_000, params(5), 4096, 1024, 4);
    d.set_init_time(0);
    let key = FlowKey::new(7, 7, 7, 7, 17);
    let stream: Vec<u64> = (0..60).map(|i| if i == 45 { i * 1000 + 9000 } else { i * 1000 }).collect();

    for &ts in &stream {
        d.update(&key, ts);
    }
    let first_run = d.abnormal_events().to_vec();

    d.clear();
    d.set_init_time(0);
    for &ts in &stream {
        d.update(&key, ts);
    }
    assert_eq!(d.abnormal_events(), first_run.as_slice());
}
