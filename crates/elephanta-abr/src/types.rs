use std::time::Duration;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::{AbrError, AbrResult};

/// Media type of the track a decision is requested for.
///
/// Only video tracks run the controller; everything else gets a weak
/// "no change" answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    Video,
    Audio,
    Text,
    Other,
}

/// How the presentation is delivered. Selects the throughput sample window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Delivery {
    Live,
    #[default]
    OnDemand,
}

/// Identifies one stream's decision state inside the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamKey {
    pub stream: u32,
    pub media_type: MediaType,
}

impl StreamKey {
    #[must_use]
    pub fn new(stream: u32, media_type: MediaType) -> Self {
        Self { stream, media_type }
    }

    #[must_use]
    pub fn video(stream: u32) -> Self {
        Self::new(stream, MediaType::Video)
    }

    #[must_use]
    pub fn audio(stream: u32) -> Self {
        Self::new(stream, MediaType::Audio)
    }
}

/// Per-call description of the track being scheduled.
#[derive(Clone, Copy, Debug)]
pub struct TrackInfo {
    pub key: StreamKey,
    /// Nominal duration of one segment of this track.
    pub fragment_duration: Duration,
    pub delivery: Delivery,
}

impl TrackInfo {
    #[must_use]
    pub fn new(key: StreamKey, fragment_duration: Duration, delivery: Delivery) -> Self {
        Self {
            key,
            fragment_duration,
            delivery,
        }
    }

    pub fn media_type(&self) -> MediaType {
        self.key.media_type
    }
}

/// Kind of HTTP request recorded by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    MediaSegment,
    InitSegment,
    Manifest,
    Other,
}

/// One received sub-chunk of a download.
#[derive(Clone, Copy, Debug)]
pub struct TraceChunk {
    pub started_at: Instant,
    pub duration: Duration,
    pub bytes: u64,
}

/// A completed (or attempted) segment download as observed by the host.
#[derive(Clone, Debug)]
pub struct SegmentRequest {
    pub kind: RequestKind,
    pub requested_at: Instant,
    /// First response byte. `None` while the request is still pending.
    pub response_at: Option<Instant>,
    /// Last byte received. `None` while the request is still in flight.
    pub finished_at: Option<Instant>,
    pub trace: Vec<TraceChunk>,
}

impl SegmentRequest {
    /// Whether this request can feed throughput estimation and queue updates.
    ///
    /// Requires a media segment that finished, got a response, and carries a
    /// byte trace with at least one byte in it.
    pub fn is_eligible(&self) -> bool {
        self.kind == RequestKind::MediaSegment
            && self.response_at.is_some()
            && self.finished_at.is_some()
            && self.downloaded_bytes() > 0
    }

    pub fn downloaded_bytes(&self) -> u64 {
        self.trace
            .iter()
            .fold(0_u64, |acc, chunk| acc.saturating_add(chunk.bytes))
    }

    #[expect(clippy::cast_precision_loss)] // byte counts far below 2^53
    pub fn downloaded_bits(&self) -> f64 {
        self.downloaded_bytes() as f64 * 8.0
    }

    /// Wall-clock time from request to last byte.
    pub fn elapsed(&self) -> Option<Duration> {
        self.finished_at
            .map(|finished| finished.saturating_duration_since(self.requested_at))
    }
}

/// Source of rendition bandwidths for a stream.
///
/// Implementations report bandwidths in bits per second, ordered by index.
pub trait VariantSource {
    /// Returns the total number of available variants for the stream.
    fn variant_count(&self, stream: &StreamKey) -> usize;

    /// Returns the bandwidth (bits per second) of a variant.
    ///
    /// Returns `None` if the index is out of bounds.
    fn variant_bandwidth(&self, stream: &StreamKey, index: usize) -> Option<u64>;
}

// A plain ladder serves every stream with the same renditions.
impl VariantSource for [u64] {
    fn variant_count(&self, _stream: &StreamKey) -> usize {
        self.len()
    }

    fn variant_bandwidth(&self, _stream: &StreamKey, index: usize) -> Option<u64> {
        self.get(index).copied()
    }
}

impl VariantSource for Vec<u64> {
    fn variant_count(&self, stream: &StreamKey) -> usize {
        self.as_slice().variant_count(stream)
    }

    fn variant_bandwidth(&self, stream: &StreamKey, index: usize) -> Option<u64> {
        self.as_slice().variant_bandwidth(stream, index)
    }
}

/// Validated bitrate ladder: non-empty, strictly ascending, no zero entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitrateLadder(Vec<u64>);

impl BitrateLadder {
    pub fn new(bitrates: Vec<u64>) -> AbrResult<Self> {
        if bitrates.is_empty() {
            return Err(AbrError::EmptyLadder);
        }
        if let Some(index) = bitrates.iter().position(|&b| b == 0) {
            return Err(AbrError::ZeroBitrate { index });
        }
        if let Some(pos) = bitrates.windows(2).position(|w| w[0] >= w[1]) {
            return Err(AbrError::UnorderedLadder {
                index: pos + 1,
                previous: bitrates[pos],
                current: bitrates[pos + 1],
            });
        }
        Ok(Self(bitrates))
    }

    /// Reads and validates the ladder a [`VariantSource`] reports for `stream`.
    pub fn from_source<S>(source: &S, stream: &StreamKey) -> AbrResult<Self>
    where
        S: VariantSource + ?Sized,
    {
        let bitrates = (0..source.variant_count(stream))
            .map(|index| {
                source
                    .variant_bandwidth(stream, index)
                    .ok_or(AbrError::MissingVariant { index })
            })
            .collect::<AbrResult<Vec<_>>>()?;
        Self::new(bitrates)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn top_index(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Bandwidth of rung `index` as `f64` bits per second.
    #[expect(clippy::cast_precision_loss)] // bitrate precision loss is negligible for ABR
    pub fn bps(&self, index: usize) -> Option<f64> {
        self.0.get(index).map(|&b| b as f64)
    }

    pub fn iter_bps(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        (0..self.0.len()).filter_map(|index| self.bps(index).map(|bps| (index, bps)))
    }
}
