//! Lyapunov drift-plus-penalty adaptive bitrate (ABR) decision engine.
//!
//! Before every segment request the host asks the controller which rendition
//! to fetch. The controller keeps four virtual queues per stream (quality
//! drift, rebuffer risk, buffer occupancy, utility shortfall) and picks the
//! rung minimising the queue-weighted penalty per second of download.
//!
//! ## Features
//!
//! - **Protocol-agnostic**: the host supplies request history, buffer level and
//!   the bitrate ladder through narrow traits
//! - **Harmonic-mean throughput**: slow transfers weigh more than fast outliers
//! - **Buffer-aware constraints**: penalty weights follow buffer occupancy tiers
//! - **Adaptive safety margin**: grows under low buffer, relaxes when rich
//! - **Serializable per-stream state**: hosts can park and restore it
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//!
//! use elephanta_abr::{
//!     AbrController, BufferLevel, Delivery, LyapunovOptions, RequestHistory, SegmentRequest,
//!     StreamKey, TrackInfo,
//! };
//!
//! struct Player;
//!
//! impl RequestHistory for Player {
//!     fn segment_requests(&self, _stream: &StreamKey) -> Vec<SegmentRequest> {
//!         Vec::new()
//!     }
//! }
//!
//! impl BufferLevel for Player {
//!     fn buffer_level_secs(&self, _stream: &StreamKey) -> Option<f64> {
//!         Some(0.0)
//!     }
//! }
//!
//! let player = Player;
//! let ladder = vec![500_000_u64, 1_000_000, 2_000_000];
//! let mut controller =
//!     AbrController::new(LyapunovOptions::default(), &player, &player, ladder).unwrap();
//!
//! let track = TrackInfo::new(StreamKey::video(0), Duration::from_secs(4), Delivery::OnDemand);
//! let decision = controller.decide(&track).unwrap();
//! assert_eq!(decision.target_variant_index, Some(0));
//! ```

#![forbid(unsafe_code)]

mod constraints;
mod controller;
mod error;
mod estimator;
mod host;
mod options;
mod penalty;
mod queues;
mod selector;
mod state;
mod types;

pub use constraints::ConstraintWeights;
pub use controller::{
    AbrController, AbrDecision, AbrReason, DefaultAbrController, HostNotifications,
    SwitchPriority,
};
pub use error::{AbrError, AbrResult};
pub use estimator::{Estimator, HarmonicEstimator, last_completed, recent_eligible};
pub use host::{BufferLevel, RequestHistory};
pub use options::LyapunovOptions;
pub use penalty::{gain, penalty_buffer_occupancy, penalty_drift, penalty_rebuffer};
pub use queues::{
    Backlog, CycleOutcome, LaggedQueues, ObservedPenalties, VirtualQueues, select_gamma,
};
pub use selector::{
    CandidateEvaluation, Rejection, SafetyMargin, Selection, SelectionContext, SelectionReason,
    select, select_initial,
};
pub use state::{ChunkHistory, StateStore, StreamDecisionState};
pub use types::{
    BitrateLadder, Delivery, MediaType, RequestKind, SegmentRequest, StreamKey, TraceChunk,
    TrackInfo, VariantSource,
};
