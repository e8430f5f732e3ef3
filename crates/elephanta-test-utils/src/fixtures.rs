//! Builders for host-side request records.

use std::time::Duration;

use elephanta_abr::{RequestKind, SegmentRequest, TraceChunk};
use web_time::Instant;

/// Standard four-rung test ladder, bits per second.
pub const LADDER: [u64; 4] = [500_000, 1_000_000, 2_000_000, 5_000_000];

/// A completed media-segment request delivering `bits` in `secs`.
///
/// The payload is split over `chunks` trace entries of equal duration.
#[must_use]
pub fn completed_segment(start: Instant, secs: f64, bits: u64, chunks: u64) -> SegmentRequest {
    let chunks = chunks.max(1);
    let took = Duration::from_secs_f64(secs);
    let slice = took / chunks as u32;
    let bytes = bits / 8;
    let trace = (0..chunks)
        .map(|i| TraceChunk {
            started_at: start + slice * i as u32,
            duration: slice,
            // the last chunk carries the remainder
            bytes: if i + 1 == chunks {
                bytes - bytes / chunks * (chunks - 1)
            } else {
                bytes / chunks
            },
        })
        .collect();
    SegmentRequest {
        kind: RequestKind::MediaSegment,
        requested_at: start,
        response_at: Some(start + slice.min(Duration::from_millis(50))),
        finished_at: Some(start + took),
        trace,
    }
}

/// A request that never finished (aborted or in flight).
#[must_use]
pub fn pending_segment(start: Instant) -> SegmentRequest {
    SegmentRequest {
        kind: RequestKind::MediaSegment,
        requested_at: start,
        response_at: None,
        finished_at: None,
        trace: Vec::new(),
    }
}

/// An initialization segment; never eligible for estimation.
#[must_use]
pub fn init_segment(start: Instant, secs: f64, bits: u64) -> SegmentRequest {
    SegmentRequest {
        kind: RequestKind::InitSegment,
        ..completed_segment(start, secs, bits, 1)
    }
}
