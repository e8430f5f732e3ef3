use thiserror::Error;

/// Errors surfaced by a decision cycle.
///
/// Every one of these is a host contract violation; the engine itself never
/// fails on well-formed input.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AbrError {
    #[error("Bitrate ladder is empty")]
    EmptyLadder,

    #[error("Bitrate ladder is not strictly ascending at index {index}: {previous} >= {current}")]
    UnorderedLadder {
        index: usize,
        previous: u64,
        current: u64,
    },

    #[error("Bitrate ladder entry {index} is zero")]
    ZeroBitrate { index: usize },

    #[error("Variant source has no bandwidth for index {index}")]
    MissingVariant { index: usize },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Invalid stream state: {0}")]
    InvalidState(String),
}

pub type AbrResult<T> = Result<T, AbrError>;
