//! Simulated playback host.
//!
//! A [`SimulatedPlayer`] downloads segments over a scripted network, keeps a
//! playback buffer, and records every request the way a real player would. It
//! implements all host capabilities, so a controller can be pointed at
//! `&player` directly.

use std::{cell::RefCell, time::Duration};

use elephanta_abr::{
    AbrController, AbrDecision, AbrResult, BufferLevel, Estimator, RequestHistory, SegmentRequest,
    StreamKey, TrackInfo, VariantSource,
};
use web_time::Instant;

use crate::{Xorshift64, completed_segment};

/// Throughput the simulated network delivers, bits per second.
#[derive(Clone, Debug)]
pub enum NetworkProfile {
    Constant(f64),
    /// `(first_segment, bps)` steps, sorted by segment.
    Steps(Vec<(usize, f64)>),
    /// `base` scaled by uniform jitter in `[1 - spread, 1 + spread)`.
    Jittered { base: f64, spread: f64, seed: u64 },
}

impl NetworkProfile {
    fn bandwidth(&self, segment: usize, rng: &mut Xorshift64) -> f64 {
        match self {
            Self::Constant(bps) => *bps,
            Self::Steps(steps) => steps
                .iter()
                .take_while(|(from, _)| *from <= segment)
                .last()
                .map_or(0.0, |(_, bps)| *bps),
            Self::Jittered { base, spread, .. } => base * rng.jitter(*spread),
        }
    }

    fn seed(&self) -> u64 {
        match self {
            Self::Jittered { seed, .. } => *seed,
            _ => 1,
        }
    }
}

/// Result of one simulated segment download.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentFetch {
    pub index: usize,
    pub download_secs: f64,
    pub buffer_after: f64,
    pub stalled: bool,
}

#[derive(Debug)]
struct Inner {
    clock: Duration,
    buffer_secs: f64,
    requests: Vec<SegmentRequest>,
    rng: Xorshift64,
    fetched: usize,
    stalls: u64,
}

#[derive(Debug)]
pub struct SimulatedPlayer {
    origin: Instant,
    ladder: Vec<u64>,
    fragment_secs: f64,
    max_buffer_secs: f64,
    profile: NetworkProfile,
    inner: RefCell<Inner>,
}

impl SimulatedPlayer {
    #[must_use]
    pub fn new(ladder: &[u64], fragment_secs: f64, profile: NetworkProfile) -> Self {
        Self {
            origin: Instant::now(),
            ladder: ladder.to_vec(),
            fragment_secs,
            max_buffer_secs: 30.0,
            inner: RefCell::new(Inner {
                clock: Duration::ZERO,
                buffer_secs: 0.0,
                requests: Vec::new(),
                rng: Xorshift64::new(profile.seed()),
                fetched: 0,
                stalls: 0,
            }),
            profile,
        }
    }

    #[must_use]
    pub fn with_max_buffer(mut self, secs: f64) -> Self {
        self.max_buffer_secs = secs;
        self
    }

    #[must_use]
    pub fn with_initial_buffer(self, secs: f64) -> Self {
        self.inner.borrow_mut().buffer_secs = secs;
        self
    }

    pub fn buffer_secs(&self) -> f64 {
        self.inner.borrow().buffer_secs
    }

    pub fn stalls(&self) -> u64 {
        self.inner.borrow().stalls
    }

    pub fn requests(&self) -> usize {
        self.inner.borrow().requests.len()
    }

    /// Downloads one segment of rendition `index`.
    ///
    /// The buffer drains while downloading, refills by one fragment, and the
    /// player idles once it reaches the buffer cap.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the ladder.
    pub fn fetch(&self, index: usize) -> SegmentFetch {
        let mut inner = self.inner.borrow_mut();
        let segment = inner.fetched;
        let bps = self.profile.bandwidth(segment, &mut inner.rng).max(1.0);
        let bits = self.ladder[index] as f64 * self.fragment_secs;
        let download_secs = bits / bps;

        let start = self.origin + inner.clock;
        inner
            .requests
            .push(completed_segment(start, download_secs, bits as u64, 4));
        inner.clock += Duration::from_secs_f64(download_secs);

        let mut buffer = inner.buffer_secs - download_secs;
        let stalled = buffer < 0.0;
        if stalled {
            inner.stalls += 1;
            buffer = 0.0;
        }
        buffer += self.fragment_secs;
        if buffer > self.max_buffer_secs {
            inner.clock += Duration::from_secs_f64(buffer - self.max_buffer_secs);
            buffer = self.max_buffer_secs;
        }
        inner.buffer_secs = buffer;
        inner.fetched += 1;

        SegmentFetch {
            index,
            download_secs,
            buffer_after: buffer,
            stalled,
        }
    }

    /// Runs `segments` decide/fetch rounds, returning every decision made.
    ///
    /// A no-change decision re-fetches the previously selected rendition.
    pub fn drive<R, B, L, E>(
        &self,
        controller: &mut AbrController<R, B, L, E>,
        track: &TrackInfo,
        segments: usize,
    ) -> AbrResult<Vec<AbrDecision>>
    where
        R: RequestHistory,
        B: BufferLevel,
        L: VariantSource,
        E: Estimator,
    {
        let mut decisions = Vec::with_capacity(segments);
        let mut current = 0;
        for _ in 0..segments {
            let decision = controller.decide(track)?;
            if let Some(index) = decision.target_variant_index {
                current = index;
            }
            self.fetch(current);
            decisions.push(decision);
        }
        Ok(decisions)
    }
}

impl RequestHistory for SimulatedPlayer {
    fn segment_requests(&self, _stream: &StreamKey) -> Vec<SegmentRequest> {
        self.inner.borrow().requests.clone()
    }
}

impl BufferLevel for SimulatedPlayer {
    fn buffer_level_secs(&self, _stream: &StreamKey) -> Option<f64> {
        Some(self.inner.borrow().buffer_secs)
    }
}

impl VariantSource for SimulatedPlayer {
    fn variant_count(&self, _stream: &StreamKey) -> usize {
        self.ladder.len()
    }

    fn variant_bandwidth(&self, _stream: &StreamKey, index: usize) -> Option<u64> {
        self.ladder.get(index).copied()
    }
}
