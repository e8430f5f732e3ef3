//! Whole playback sessions against the simulated player.

use std::time::Duration;

use elephanta_abr::{
    AbrController, AbrDecision, AbrReason, Delivery, LyapunovOptions, StreamDecisionState,
    StreamKey, TrackInfo,
};
use elephanta_test_utils::{LADDER, NetworkProfile, SimulatedPlayer};
use rstest::rstest;

const FRAGMENT_SECS: f64 = 4.0;

fn track(delivery: Delivery) -> TrackInfo {
    TrackInfo::new(
        StreamKey::video(0),
        Duration::from_secs_f64(FRAGMENT_SECS),
        delivery,
    )
}

fn jittered(seed: u64) -> NetworkProfile {
    NetworkProfile::Jittered {
        base: 2_500_000.0,
        spread: 0.8,
        seed,
    }
}

fn run(profile: NetworkProfile, segments: usize) -> (Vec<AbrDecision>, StreamDecisionState) {
    let player = SimulatedPlayer::new(&LADDER, FRAGMENT_SECS, profile);
    let mut c =
        AbrController::new(LyapunovOptions::default(), &player, &player, &player).unwrap();
    let decisions = player
        .drive(&mut c, &track(Delivery::OnDemand), segments)
        .unwrap();
    let state = c.state(&StreamKey::video(0)).unwrap().clone();
    (decisions, state)
}

#[rstest]
#[case(Delivery::OnDemand, 7)]
#[case(Delivery::Live, 42)]
#[case(Delivery::OnDemand, 0xdead_beef)]
fn queue_invariants_hold_over_a_jittered_session(#[case] delivery: Delivery, #[case] seed: u64) {
    elephanta_tests::init_tracing();
    let player = SimulatedPlayer::new(&LADDER, FRAGMENT_SECS, jittered(seed));
    let mut c =
        AbrController::new(LyapunovOptions::default(), &player, &player, &player).unwrap();
    let track = track(delivery);
    let key = StreamKey::video(0);
    let opts = c.options().clone();

    let mut current = 0;
    for n in 0..150_u64 {
        let d = c.decide(&track).unwrap();
        // every simulated download completes, so no cycle is ever skipped
        let index = d.target_variant_index.unwrap();
        assert!(index < LADDER.len());
        if n == 0 {
            assert_eq!(d.reason, AbrReason::Initial);
        }

        let s = c.state(&key).unwrap();
        assert_eq!(s.chunk_number, n + 1);
        assert_eq!(s.queues.slot, n);
        assert_eq!(s.chunk_history.last, Some(index));
        assert_eq!(s.chunk_history.prior, (n > 0).then_some(current));
        for q in [s.queues.z1, s.queues.z2, s.queues.z3, s.queues.g] {
            assert!(q.current() >= 0.0, "slot {n}: {q:?}");
            assert!(q.previous() >= 0.0, "slot {n}: {q:?}");
        }
        assert!(s.gamma >= opts.gamma_min && s.gamma <= opts.gamma_max);
        assert!(s.safety.value() > 0.0);

        current = index;
        player.fetch(index);
    }
}

#[test]
fn identical_sessions_decide_identically() {
    let (a, state_a) = run(jittered(99), 80);
    let (b, state_b) = run(jittered(99), 80);
    assert_eq!(a, b);
    assert_eq!(state_a, state_b);
}

#[test]
fn ample_bandwidth_leaves_the_bottom_rung() {
    let player = SimulatedPlayer::new(&LADDER, FRAGMENT_SECS, NetworkProfile::Constant(10e6));
    let mut c =
        AbrController::new(LyapunovOptions::default(), &player, &player, &player).unwrap();
    let decisions = player
        .drive(&mut c, &track(Delivery::OnDemand), 12)
        .unwrap();

    assert_eq!(decisions[0].target_variant_index, Some(0));
    assert!(
        decisions
            .iter()
            .any(|d| d.target_variant_index.is_some_and(|i| i >= 2)),
        "{decisions:?}"
    );
    // only the very first download starts from an empty buffer
    assert_eq!(player.stalls(), 1);
}

#[test]
fn restored_state_continues_the_session() {
    let profile = jittered(5);
    let live = SimulatedPlayer::new(&LADDER, FRAGMENT_SECS, profile.clone());
    let parked = SimulatedPlayer::new(&LADDER, FRAGMENT_SECS, profile);
    let opts = LyapunovOptions::default();
    let key = StreamKey::video(0);
    let t = track(Delivery::OnDemand);

    let mut a = AbrController::new(opts.clone(), &live, &live, &live).unwrap();
    let mut b = AbrController::new(opts.clone(), &parked, &parked, &parked).unwrap();
    let first_a = live.drive(&mut a, &t, 30).unwrap();
    let first_b = parked.drive(&mut b, &t, 30).unwrap();
    assert_eq!(first_a, first_b);

    // park the stream as a JSON blob, as a host would between sessions
    let blob = serde_json::to_string(&b.end_stream(&key).unwrap()).unwrap();
    let snapshot: StreamDecisionState = serde_json::from_str(&blob).unwrap();
    let mut resumed = AbrController::new(opts, &parked, &parked, &parked).unwrap();
    assert!(resumed.restore_state(key, snapshot).unwrap().is_none());

    let rest_a = live.drive(&mut a, &t, 30).unwrap();
    let rest_b = parked.drive(&mut resumed, &t, 30).unwrap();
    assert_eq!(rest_a, rest_b);
    assert_eq!(a.state(&key), resumed.state(&key));
    assert_eq!(resumed.state(&key).unwrap().chunk_number, 60);
}

#[test]
fn parked_state_survives_json() {
    let (_, state) = run(jittered(11), 25);
    let blob = serde_json::to_string(&state).unwrap();
    let back: StreamDecisionState = serde_json::from_str(&blob).unwrap();
    assert_eq!(back, state);
}

#[test]
fn audio_tracks_ride_along_untouched() {
    let player = SimulatedPlayer::new(&LADDER, FRAGMENT_SECS, NetworkProfile::Constant(3e6));
    let mut c =
        AbrController::new(LyapunovOptions::default(), &player, &player, &player).unwrap();
    let video = track(Delivery::OnDemand);
    let audio = TrackInfo::new(
        StreamKey::audio(0),
        Duration::from_secs_f64(FRAGMENT_SECS),
        Delivery::OnDemand,
    );

    let mut current = 0;
    for _ in 0..10 {
        let a = c.decide(&audio).unwrap();
        assert_eq!(a.reason, AbrReason::NonVideo);
        assert!(a.is_no_change());

        if let Some(index) = c.decide(&video).unwrap().target_variant_index {
            current = index;
        }
        player.fetch(current);
    }

    assert_eq!(c.streams().len(), 1);
    assert!(c.state(&StreamKey::audio(0)).is_none());
    assert_eq!(c.state(&StreamKey::video(0)).unwrap().chunk_number, 10);
}
