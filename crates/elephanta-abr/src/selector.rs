//! Drift-plus-penalty rendition choice.

use serde::{Deserialize, Serialize};

use crate::{
    BitrateLadder, ConstraintWeights, LyapunovOptions,
    penalty::{penalty_buffer_occupancy, penalty_drift, penalty_rebuffer},
    queues::LaggedQueues,
};

/// Rendition picked when every candidate fails the feasibility filter.
///
/// Clamped to the top of single-rung ladders.
const NO_FEASIBLE_FALLBACK: usize = 1;

/// Adaptive safety scalar (`uors_factor`) discounting the post-download buffer.
///
/// Grows by a fixed step on every low-buffer cycle and halves on every
/// rich-buffer cycle. Neither direction is bounded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyMargin(f64);

impl SafetyMargin {
    #[must_use]
    pub fn new(initial: f64) -> Self {
        Self(initial)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn adapt(&mut self, buffer_secs: f64, opts: &LyapunovOptions) {
        if buffer_secs < opts.low_buffer_threshold() {
            self.0 += opts.safety_step;
        }
        if buffer_secs > opts.high_buffer_threshold() {
            self.0 /= 2.0;
        }
    }
}

/// Why a rung was picked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionReason {
    /// First cycle: highest rung below the throughput estimate.
    Initial,
    /// Minimiser of the drift-plus-penalty objective.
    Optimal,
    /// No throughput estimate; lowest rung.
    NoEstimate,
    /// Every rung failed the feasibility filter.
    NoFeasibleCandidate,
}

/// Why a rung was excluded from the objective.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rejection {
    /// Download would outlast the current buffer.
    Starves,
    /// Expected post-download buffer under `margin × low threshold`.
    BelowSafetyMargin,
}

/// Per-rung diagnostics of one optimizer pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateEvaluation {
    pub index: usize,
    pub exp_download_secs: f64,
    pub exp_buffer_secs: f64,
    /// Objective value, or the reason the rung was rejected.
    pub outcome: Result<f64, Rejection>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub reason: SelectionReason,
    /// Objective of the winning rung, when one was feasible.
    pub objective: Option<f64>,
    pub candidates: Vec<CandidateEvaluation>,
}

impl Selection {
    fn bare(index: usize, reason: SelectionReason) -> Self {
        Self {
            index,
            reason,
            objective: None,
            candidates: Vec::new(),
        }
    }
}

/// Inputs of one optimizer pass past the first cycle.
#[derive(Clone, Copy, Debug)]
pub struct SelectionContext<'a> {
    pub ladder: &'a BitrateLadder,
    /// Estimated throughput in bits per second.
    pub throughput_bps: Option<f64>,
    pub buffer_secs: f64,
    pub fragment_secs: f64,
    /// Rendition selected for the previous segment.
    pub last_index: usize,
    pub queues: LaggedQueues,
    pub weights: ConstraintWeights,
    pub safety: SafetyMargin,
}

/// First cycle: the highest rung strictly below the estimate, or rung 0.
pub fn select_initial(ladder: &BitrateLadder, throughput_bps: Option<f64>) -> Selection {
    let index = throughput_bps
        .and_then(|tput| {
            ladder
                .iter_bps()
                .filter(|&(_, bps)| bps < tput)
                .map(|(index, _)| index)
                .last()
        })
        .unwrap_or(0);
    Selection::bare(index, SelectionReason::Initial)
}

/// Scans the ladder and returns the rung minimising
/// `(z1·y1 + z2·y2 + z3·y3 − g·i²) / T_i`.
///
/// Ties keep the lowest rung.
pub fn select(ctx: &SelectionContext<'_>, opts: &LyapunovOptions) -> Selection {
    let Some(tput) = ctx.throughput_bps.filter(|t| t.is_finite() && *t > 0.0) else {
        return Selection::bare(0, SelectionReason::NoEstimate);
    };

    let min_buffer = ctx.safety.value() * opts.low_buffer_threshold();
    let drift_w = ctx.weights.drift_weight(opts.alpha1);
    let rebuffer_w = ctx.weights.rebuffer_weight(opts.alpha2);
    let occupancy_w = ctx.weights.occupancy_weight(opts.alpha3);
    let q = ctx.queues;

    let mut best: Option<(usize, f64)> = None;
    let mut candidates = Vec::with_capacity(ctx.ladder.len());

    for (i, bps) in ctx.ladder.iter_bps() {
        let exp_t = bps / tput;
        let exp_download = exp_t / discount(opts.rebuffer_safety_factor, i);
        let exp_buffer = ctx.buffer_secs + ctx.fragment_secs - exp_download;

        let outcome = if exp_download > ctx.buffer_secs {
            Err(Rejection::Starves)
        } else if exp_buffer < min_buffer {
            Err(Rejection::BelowSafetyMargin)
        } else {
            let ahead = exp_buffer - opts.delay_secs;
            let y1 = penalty_drift(drift_w, ctx.last_index, i);
            let y2 = penalty_rebuffer(rebuffer_w, ahead);
            let y3 = penalty_buffer_occupancy(occupancy_w, ahead);
            #[expect(clippy::cast_precision_loss)] // ladder indices are tiny
            let exp_x = (i * i) as f64;
            Ok((q.z1 * y1 + q.z2 * y2 + q.z3 * y3 - q.g * exp_x) / exp_t)
        };

        tracing::trace!(
            index = i,
            exp_download,
            exp_buffer,
            ?outcome,
            "ABR candidate"
        );

        if let Ok(val) = outcome
            && best.is_none_or(|(_, min)| val < min)
        {
            best = Some((i, val));
        }
        candidates.push(CandidateEvaluation {
            index: i,
            exp_download_secs: exp_download,
            exp_buffer_secs: exp_buffer,
            outcome,
        });
    }

    match best {
        Some((index, val)) => Selection {
            index,
            reason: SelectionReason::Optimal,
            objective: Some(val),
            candidates,
        },
        None => Selection {
            index: NO_FEASIBLE_FALLBACK.min(ctx.ladder.top_index()),
            reason: SelectionReason::NoFeasibleCandidate,
            objective: None,
            candidates,
        },
    }
}

/// `factor^i`, the per-rung download-time discount.
fn discount(factor: f64, index: usize) -> f64 {
    let exp = i32::try_from(index).unwrap_or(i32::MAX);
    factor.powi(exp)
}
