use crate::SegmentRequest;

/// Trait for throughput estimation strategies.
///
/// Allows testing `AbrController` with mock estimators.
#[cfg_attr(test, unimock::unimock(api = EstimatorMock))]
pub trait Estimator {
    /// Estimated throughput in bits per second from the most recent `window`
    /// eligible requests in `history` (oldest first).
    ///
    /// `None` means no usable estimate.
    fn estimate_bps(&self, history: &[SegmentRequest], window: usize) -> Option<f64>;
}

/// Harmonic mean of per-request throughput.
///
/// Each request contributes `seconds / bits`; the estimate is the sample count
/// over their sum. Slow transfers dominate, so a single fast outlier cannot
/// inflate the estimate.
#[derive(Clone, Copy, Debug, Default)]
pub struct HarmonicEstimator;

impl HarmonicEstimator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Estimator for HarmonicEstimator {
    #[expect(clippy::cast_precision_loss)] // window is a handful of samples
    fn estimate_bps(&self, history: &[SegmentRequest], window: usize) -> Option<f64> {
        let (count, total_inverse) = recent_eligible(history, window)
            .filter_map(|request| {
                let secs = request.elapsed()?.as_secs_f64();
                Some(secs / request.downloaded_bits())
            })
            .fold((0_usize, 0.0_f64), |(n, sum), inv| (n + 1, sum + inv));

        if count == 0 {
            return None;
        }
        let bps = count as f64 / total_inverse;
        (bps.is_finite() && bps > 0.0).then_some(bps)
    }
}

/// Eligible requests, newest first, at most `count` of them.
pub fn recent_eligible(
    history: &[SegmentRequest],
    count: usize,
) -> impl Iterator<Item = &SegmentRequest> {
    history
        .iter()
        .rev()
        .filter(|request| request.is_eligible())
        .take(count)
}

/// The newest request whose outcome can be folded into the virtual queues.
pub fn last_completed(history: &[SegmentRequest]) -> Option<&SegmentRequest> {
    recent_eligible(history, 1).next()
}
