#![forbid(unsafe_code)]
#![expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    reason = "network simulation works in f64 seconds and u64 bits"
)]

//! Shared test utilities for the elephanta workspace.

pub mod fixtures;
pub mod player;
pub mod rng;

pub use fixtures::*;
pub use player::{NetworkProfile, SegmentFetch, SimulatedPlayer};
pub use rng::*;
