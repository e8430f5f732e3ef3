//! Scalar penalty and utility terms of the drift-plus-penalty objective.
//!
//! Buffer arguments are in seconds, drift arguments are rendition indices.

/// Buffer level below which the rebuffer penalty switches to the steep branch.
const REBUFFER_KNEE_SECS: f64 = 1.0;

/// Buffer level treated as empty by the occupancy penalty.
const OCCUPANCY_FLOOR_SECS: f64 = 0.1;

/// Rebuffer risk at the given buffer level.
///
/// Below one second the logarithm would go negative, so the penalty jumps to
/// `alpha^5` instead.
#[must_use]
pub fn penalty_rebuffer(alpha: f64, buffer_secs: f64) -> f64 {
    if buffer_secs < REBUFFER_KNEE_SECS {
        return alpha.powi(5);
    }
    alpha * alpha * buffer_secs.ln()
}

/// Quality drift between two rendition indices.
#[must_use]
#[expect(clippy::cast_precision_loss)] // ladder indices are tiny
pub fn penalty_drift(alpha: f64, index_a: usize, index_b: usize) -> f64 {
    alpha * index_a.abs_diff(index_b) as f64
}

/// Buffer occupancy cost.
#[must_use]
pub fn penalty_buffer_occupancy(alpha: f64, buffer_secs: f64) -> f64 {
    let buffer_secs = if buffer_secs < OCCUPANCY_FLOOR_SECS {
        0.0
    } else {
        buffer_secs
    };
    alpha * buffer_secs
}

/// Utility of delivering rendition `rank` (1-based), logarithmic in rank.
#[must_use]
pub fn gain(rank: f64) -> f64 {
    rank.ln()
}
