#![forbid(unsafe_code)]

use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use elephanta_abr::{
    AbrController, BufferLevel, Delivery, Estimator, HarmonicEstimator, LyapunovOptions,
    RequestHistory, RequestKind, SegmentRequest, StreamKey, TraceChunk, TrackInfo,
};
use web_time::Instant;

const LADDER: [u64; 6] = [
    256_000, 512_000, 1_024_000, 2_048_000, 4_096_000, 8_192_000,
];

fn request(start: Instant, bytes: u64, duration_ms: u64) -> SegmentRequest {
    let took = Duration::from_millis(duration_ms);
    SegmentRequest {
        kind: RequestKind::MediaSegment,
        requested_at: start,
        response_at: Some(start),
        finished_at: Some(start + took),
        trace: vec![TraceChunk {
            started_at: start,
            duration: took,
            bytes,
        }],
    }
}

fn history(bytes: u64, duration_ms: u64) -> Vec<SegmentRequest> {
    let start = Instant::now();
    (0..32).map(|_| request(start, bytes, duration_ms)).collect()
}

struct Fixed {
    requests: Vec<SegmentRequest>,
    buffer_secs: f64,
}

impl RequestHistory for Fixed {
    fn segment_requests(&self, _stream: &StreamKey) -> Vec<SegmentRequest> {
        self.requests.clone()
    }
}

impl BufferLevel for Fixed {
    fn buffer_level_secs(&self, _stream: &StreamKey) -> Option<f64> {
        Some(self.buffer_secs)
    }
}

fn bench_harmonic_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("abr_harmonic_estimate");

    for (label, bytes, duration_ms) in [
        ("low_bitrate", 32_000, 250_u64),
        ("mid_bitrate", 96_000, 250_u64),
        ("high_bitrate", 256_000, 250_u64),
    ] {
        let requests = history(bytes, duration_ms);
        group.bench_with_input(BenchmarkId::new("32_samples", label), &requests, |b, r| {
            b.iter(|| black_box(HarmonicEstimator.estimate_bps(r, 3)));
        });
    }

    group.finish();
}

fn bench_controller_decide(c: &mut Criterion) {
    let mut group = c.benchmark_group("abr_controller_decide");
    let track = TrackInfo::new(StreamKey::video(0), Duration::from_secs(4), Delivery::OnDemand);

    for (label, bytes, buffer_secs) in [
        ("rich_buffer", 256_000, 25.0),
        ("steady", 96_000, 8.0),
        ("starving", 32_000, 2.0),
    ] {
        let host = Fixed {
            requests: history(bytes, 250),
            buffer_secs,
        };
        group.bench_with_input(BenchmarkId::new("decide", label), &host, |b, host| {
            b.iter(|| {
                let mut controller = AbrController::new(
                    LyapunovOptions::default(),
                    host,
                    host,
                    LADDER.to_vec(),
                )
                .unwrap();
                for _ in 0..8 {
                    black_box(controller.decide(&track).unwrap());
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_harmonic_estimate, bench_controller_decide);
criterion_main!(benches);
