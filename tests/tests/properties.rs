//! Behavioural properties of the decision engine, exercised through the public API.

use std::{cell::RefCell, time::Duration};

use elephanta_abr::{
    AbrController, AbrReason, BufferLevel, ConstraintWeights, Delivery, Estimator,
    HarmonicEstimator, LyapunovOptions, RequestHistory, SafetyMargin, SegmentRequest, StreamKey,
    TrackInfo,
};
use elephanta_test_utils::{
    LADDER, NetworkProfile, SimulatedPlayer, completed_segment, init_segment, pending_segment,
};
use rstest::rstest;
use web_time::Instant;

const FRAGMENT: Duration = Duration::from_secs(4);

fn vod(stream: u32) -> TrackInfo {
    TrackInfo::new(StreamKey::video(stream), FRAGMENT, Delivery::OnDemand)
}

/// Host whose history and buffer the test edits between cycles.
#[derive(Default)]
struct Scripted {
    requests: RefCell<Vec<SegmentRequest>>,
    buffer: RefCell<f64>,
}

impl RequestHistory for Scripted {
    fn segment_requests(&self, _stream: &StreamKey) -> Vec<SegmentRequest> {
        self.requests.borrow().clone()
    }
}

impl BufferLevel for Scripted {
    fn buffer_level_secs(&self, _stream: &StreamKey) -> Option<f64> {
        Some(*self.buffer.borrow())
    }
}

#[test]
fn harmonic_mean_over_multi_chunk_traces() {
    let now = Instant::now();
    let history = vec![
        completed_segment(now, 1.0, 2_000_000, 3),
        init_segment(now, 0.01, 80_000),
        completed_segment(now, 2.0, 4_000_000, 5),
    ];
    let bps = HarmonicEstimator.estimate_bps(&history, 3).unwrap();
    assert!((bps - 2_000_000.0).abs() < 1e-3, "{bps}");
}

#[test]
fn equal_rate_requests_estimate_that_rate() {
    let now = Instant::now();
    let history = vec![
        completed_segment(now, 1.0, 1_000_000, 1),
        completed_segment(now, 2.0, 2_000_000, 1),
    ];
    // 2 / (1/1e6 + 2/2e6)
    let bps = HarmonicEstimator.estimate_bps(&history, 2).unwrap();
    assert!((bps - 1_000_000.0).abs() < 1e-3, "{bps}");
}

#[test]
fn first_cycle_selects_highest_rung_below_estimate() {
    let host = Scripted::default();
    host.requests
        .borrow_mut()
        .push(completed_segment(Instant::now(), 1.0, 1_500_000, 1));

    let ladder = vec![500_000_u64, 1_000_000, 2_000_000];
    let mut c = AbrController::new(LyapunovOptions::default(), &host, &host, ladder).unwrap();
    let d = c.decide(&vod(0)).unwrap();
    assert_eq!(d.target_variant_index, Some(1));
    assert_eq!(d.reason, AbrReason::Initial);
}

#[rstest]
#[case(5.0, (1.0, 1.0, 1.0))]
#[case(20.0, (0.5, 1.0, 0.5))]
#[case(40.0, (1.0, 1.0, 0.1))]
fn buffer_tiers(#[case] buffer: f64, #[case] expected: (f64, f64, f64)) {
    let w = ConstraintWeights::for_buffer_level(buffer);
    assert_eq!(
        (w.buffer_occupancy, w.bitrate_switch, w.rebuffer),
        expected
    );
}

#[test]
fn safety_margin_sequence() {
    let opts = LyapunovOptions::default();
    let mut m = SafetyMargin::new(1.0);
    for buffer in [1.0, 2.5, 3.5] {
        m.adapt(buffer, &opts);
    }
    assert!((m.value() - 4.0).abs() < f64::EPSILON);
    m.adapt(9.5, &opts);
    assert!((m.value() - 2.0).abs() < f64::EPSILON);
}

#[test]
fn starving_session_grows_the_safety_margin() {
    elephanta_tests::init_tracing();
    // 100 kbit/s against a 500 kbit/s floor keeps the buffer at one fragment
    let player = SimulatedPlayer::new(&LADDER, 2.0, NetworkProfile::Constant(100_000.0));
    let mut c =
        AbrController::new(LyapunovOptions::default(), &player, &player, &player).unwrap();
    let track = TrackInfo::new(StreamKey::video(0), Duration::from_secs(2), Delivery::Live);

    player.drive(&mut c, &track, 4).unwrap();
    let s = c.state(&StreamKey::video(0)).unwrap();
    assert_eq!(s.chunk_number, 4);
    assert!((s.safety.value() - 4.0).abs() < f64::EPSILON);
    assert!(player.buffer_secs() < 3.6);
}

#[test]
fn cycle_without_completed_request_is_a_no_op() {
    let host = Scripted::default();
    let mut c = AbrController::new(LyapunovOptions::default(), &host, &host, LADDER.to_vec())
        .unwrap();
    *host.buffer.borrow_mut() = 12.0;
    c.decide(&vod(0)).unwrap();
    let before = c.state(&StreamKey::video(0)).unwrap().clone();

    host.requests
        .borrow_mut()
        .push(pending_segment(Instant::now()));
    host.requests
        .borrow_mut()
        .push(init_segment(Instant::now(), 0.1, 8_000));
    *host.buffer.borrow_mut() = 2.0;

    let d = c.decide(&vod(0)).unwrap();
    assert!(d.is_no_change());
    assert_eq!(d.reason, AbrReason::MissingOutcome);

    let after = c.state(&StreamKey::video(0)).unwrap();
    assert_eq!(after.chunk_number, before.chunk_number);
    assert_eq!(after.queues, before.queues);
    assert_eq!(after.safety, before.safety);
    assert_eq!(after.chunk_history, before.chunk_history);
}
