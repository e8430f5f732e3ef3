//! Virtual queues of the Lyapunov controller.
//!
//! Each queue is only ever read at its latest and second-latest slot, so a
//! [`Backlog`] keeps exactly those two values instead of the full history.

use serde::{Deserialize, Serialize};

use crate::{
    ConstraintWeights, LyapunovOptions,
    penalty::{gain, penalty_buffer_occupancy, penalty_drift, penalty_rebuffer},
};

/// Latest two elements of a non-negative backlog sequence.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Backlog {
    current: f64,
    previous: f64,
}

impl Backlog {
    /// Appends `value` projected onto `[0, ∞)`.
    pub fn push(&mut self, value: f64) {
        self.previous = self.current;
        self.current = value.max(0.0);
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn previous(&self) -> f64 {
        self.previous
    }

    /// Element at slot `chunk_number - 1` (clamped to slot 0).
    ///
    /// Valid during a cycle after the queues have been advanced for that cycle:
    /// the newest slot then belongs to `chunk_number`, except on the first
    /// cycle where nothing was advanced and slot 0 is the newest.
    pub fn lagged(&self, chunk_number: u64) -> f64 {
        if chunk_number == 0 {
            self.current
        } else {
            self.previous
        }
    }
}

/// Observed result of the previous cycle, folded into the queues.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleOutcome {
    /// Wall-clock seconds the last request took (`m_t`).
    pub elapsed_secs: f64,
    /// Buffer occupancy the outcome is judged against.
    pub buffer_secs: f64,
    /// Rendition index selected for the last request.
    pub last_index: usize,
    /// Rendition index selected before that, if any.
    pub prior_index: Option<usize>,
    /// Utility weight in force when the last request was scheduled.
    pub gamma: f64,
}

/// Per-slot penalties observed for an outcome, before draining.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservedPenalties {
    pub drift: f64,
    pub rebuffer: f64,
    pub occupancy: f64,
    pub utility: f64,
}

/// The four backlogs: three constraint queues and the utility queue.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualQueues {
    /// Quality drift.
    pub z1: Backlog,
    /// Rebuffer risk.
    pub z2: Backlog,
    /// Buffer occupancy.
    pub z3: Backlog,
    /// Cumulative utility shortfall.
    pub g: Backlog,
    /// Slot index of the `current` elements.
    pub slot: u64,
}

impl VirtualQueues {
    pub fn penalties(
        outcome: &CycleOutcome,
        weights: &ConstraintWeights,
        opts: &LyapunovOptions,
    ) -> ObservedPenalties {
        let drift = outcome.prior_index.map_or(0.0, |prior| {
            penalty_drift(weights.drift_weight(opts.alpha1), outcome.last_index, prior)
        });
        #[expect(clippy::cast_precision_loss)] // ladder indices are tiny
        let rank = (outcome.last_index + 1) as f64;
        ObservedPenalties {
            drift,
            rebuffer: penalty_rebuffer(weights.rebuffer_weight(opts.alpha2), outcome.buffer_secs),
            occupancy: penalty_buffer_occupancy(
                weights.occupancy_weight(opts.alpha3),
                outcome.buffer_secs,
            ),
            utility: gain(rank),
        }
    }

    /// Advances every queue by one slot using the previous cycle's outcome.
    pub fn advance(
        &mut self,
        outcome: &CycleOutcome,
        weights: &ConstraintWeights,
        opts: &LyapunovOptions,
    ) -> ObservedPenalties {
        let y = Self::penalties(outcome, weights, opts);
        let m = outcome.elapsed_secs;

        self.z1.push(self.z1.current() + y.drift - m * opts.c1);
        self.z2.push(self.z2.current() + y.rebuffer - m * opts.c2);
        self.z3.push(self.z3.current() + y.occupancy - m * opts.c3);
        self.g.push(self.g.current() - y.utility + m * outcome.gamma);
        self.slot += 1;

        tracing::trace!(
            slot = self.slot,
            m_t = m,
            z1 = self.z1.current(),
            z2 = self.z2.current(),
            z3 = self.z3.current(),
            g = self.g.current(),
            "virtual queues advanced"
        );
        y
    }

    /// Queue values the optimizer weighs at `chunk_number`.
    pub fn lagged(&self, chunk_number: u64) -> LaggedQueues {
        LaggedQueues {
            z1: self.z1.lagged(chunk_number),
            z2: self.z2.lagged(chunk_number),
            z3: self.z3.lagged(chunk_number),
            g: self.g.lagged(chunk_number),
        }
    }
}

/// Snapshot of the four backlogs at slot `chunk_number - 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LaggedQueues {
    pub z1: f64,
    pub z2: f64,
    pub z3: f64,
    pub g: f64,
}

/// Utility weight for the current cycle: `V / g`, clamped to the gamma bounds.
///
/// An empty utility queue makes the ratio infinite, which clamps to `gamma_max`.
pub fn select_gamma(g_lagged: f64, opts: &LyapunovOptions) -> f64 {
    let tem = opts.v / g_lagged;
    if tem.is_nan() {
        return opts.gamma_max;
    }
    tem.clamp(opts.gamma_min, opts.gamma_max)
}
