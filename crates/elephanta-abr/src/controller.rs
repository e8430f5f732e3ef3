use crate::{
    AbrResult, BitrateLadder, BufferLevel, ConstraintWeights, Estimator, HarmonicEstimator,
    LyapunovOptions, MediaType, RequestHistory, SegmentRequest, StateStore, StreamDecisionState,
    StreamKey, TrackInfo, VariantSource,
    estimator::last_completed,
    queues::{CycleOutcome, select_gamma},
    selector::{Selection, SelectionContext, SelectionReason, select, select_initial},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AbrReason {
    /// First decision of a stream.
    Initial,
    /// Drift-plus-penalty minimiser.
    Optimal,
    NoEstimate,
    NoFeasibleCandidate,
    /// Only video tracks are adapted.
    NonVideo,
    /// No completed request to learn from; the cycle was skipped.
    MissingOutcome,
}

impl From<SelectionReason> for AbrReason {
    fn from(reason: SelectionReason) -> Self {
        match reason {
            SelectionReason::Initial => Self::Initial,
            SelectionReason::Optimal => Self::Optimal,
            SelectionReason::NoEstimate => Self::NoEstimate,
            SelectionReason::NoFeasibleCandidate => Self::NoFeasibleCandidate,
        }
    }
}

/// How strongly the host should honour a decision.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwitchPriority {
    Weak,
    Default,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AbrDecision {
    /// Rendition to fetch next; `None` means keep whatever the host has.
    pub target_variant_index: Option<usize>,
    pub priority: SwitchPriority,
    pub reason: AbrReason,
    /// Target differs from the previous decision for the stream.
    pub changed: bool,
    /// Objective value of the winning rung.
    pub objective: Option<f64>,
}

impl AbrDecision {
    #[must_use]
    pub fn no_change(reason: AbrReason) -> Self {
        Self {
            target_variant_index: None,
            priority: SwitchPriority::Weak,
            reason,
            changed: false,
            objective: None,
        }
    }

    fn selected(selection: &Selection, changed: bool) -> Self {
        Self {
            target_variant_index: Some(selection.index),
            priority: SwitchPriority::Default,
            reason: selection.reason.into(),
            changed,
            objective: selection.objective,
        }
    }

    pub fn is_no_change(&self) -> bool {
        self.target_variant_index.is_none()
    }
}

/// Host notifications received since the last [`AbrController::reset`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HostNotifications {
    pub seeks: u64,
    pub buffer_empties: u64,
}

/// Per-stream Lyapunov drift-plus-penalty controller.
///
/// One [`decide`](Self::decide) call is one decision cycle. Calls for the same
/// stream must be serialised by the host; there is no internal locking.
pub struct AbrController<R, B, L, E = HarmonicEstimator> {
    opts: LyapunovOptions,
    requests: R,
    buffer: B,
    ladder: L,
    estimator: E,
    store: StateStore,
    notifications: HostNotifications,
}

pub type DefaultAbrController<R, B, L> = AbrController<R, B, L, HarmonicEstimator>;

impl<R, B, L> AbrController<R, B, L, HarmonicEstimator>
where
    R: RequestHistory,
    B: BufferLevel,
    L: VariantSource,
{
    pub fn new(opts: LyapunovOptions, requests: R, buffer: B, ladder: L) -> AbrResult<Self> {
        Self::with_estimator(opts, requests, buffer, ladder, HarmonicEstimator)
    }
}

impl<R, B, L, E> AbrController<R, B, L, E>
where
    R: RequestHistory,
    B: BufferLevel,
    L: VariantSource,
    E: Estimator,
{
    pub fn with_estimator(
        opts: LyapunovOptions,
        requests: R,
        buffer: B,
        ladder: L,
        estimator: E,
    ) -> AbrResult<Self> {
        opts.validate()?;
        Ok(Self {
            opts,
            requests,
            buffer,
            ladder,
            estimator,
            store: StateStore::new(),
            notifications: HostNotifications::default(),
        })
    }

    pub fn options(&self) -> &LyapunovOptions {
        &self.opts
    }

    pub fn streams(&self) -> &StateStore {
        &self.store
    }

    pub fn state(&self, key: &StreamKey) -> Option<&StreamDecisionState> {
        self.store.get(key)
    }

    /// Installs a previously exported state for `key`, returning the one it
    /// replaces. A state failing [`StreamDecisionState::validate`] is refused
    /// and the current one kept.
    pub fn restore_state(
        &mut self,
        key: StreamKey,
        state: StreamDecisionState,
    ) -> AbrResult<Option<StreamDecisionState>> {
        state.validate()?;
        tracing::debug!(?key, chunk_number = state.chunk_number, "ABR state restored");
        Ok(self.store.insert(key, state))
    }

    pub fn notifications(&self) -> HostNotifications {
        self.notifications
    }

    /// Run one decision cycle for the track about to request a segment.
    ///
    /// Non-video tracks get a weak no-change answer and never touch state.
    /// When the previous cycle's request has not completed yet the cycle is
    /// skipped and the stream state is left exactly as it was; the host
    /// retries at the next segment boundary.
    pub fn decide(&mut self, track: &TrackInfo) -> AbrResult<AbrDecision> {
        let key = track.key;
        if key.media_type != MediaType::Video {
            tracing::trace!(?key, "ABR decide: not a video track");
            return Ok(AbrDecision::no_change(AbrReason::NonVideo));
        }

        let ladder = BitrateLadder::from_source(&self.ladder, &key)?;
        let history = self.requests.segment_requests(&key);
        let buffer_now = self
            .buffer
            .buffer_level_secs(&key)
            .filter(|b| b.is_finite())
            .unwrap_or(0.0);

        let opts = &self.opts;
        let state = self.store.get_or_init(key, opts);
        // tier of the buffer observed last cycle, not of `buffer_now`
        let weights = ConstraintWeights::for_buffer_level(state.buffer_occupancy);

        if !state.is_first_cycle() {
            let Some(outcome) = previous_outcome(state, &history) else {
                tracing::warn!(
                    ?key,
                    chunk_number = state.chunk_number,
                    selected = ?state.selected_bitrate,
                    "ABR decide: no completed request, cycle skipped"
                );
                return Ok(AbrDecision::no_change(AbrReason::MissingOutcome));
            };
            tracing::debug!(?key, m_t = outcome.elapsed_secs, "ABR decide: folding outcome");
            state.queues.advance(&outcome, &weights, opts);
        }

        state.fragment_duration = track.fragment_duration;
        state.bitrate_list = ladder.as_slice().to_vec();
        state.constraints = weights;
        state.buffer_occupancy = buffer_now;
        let window = opts.sample_window(track.delivery);
        let throughput_bps = self.estimator.estimate_bps(&history, window);
        let gamma = select_gamma(state.queues.g.lagged(state.chunk_number), opts);

        let selection = if state.is_first_cycle() {
            select_initial(&ladder, throughput_bps)
        } else {
            state.safety.adapt(state.buffer_occupancy, opts);
            let ctx = SelectionContext {
                ladder: &ladder,
                throughput_bps,
                buffer_secs: state.buffer_occupancy,
                fragment_secs: track.fragment_duration.as_secs_f64(),
                last_index: state.chunk_history.last.unwrap_or(0),
                queues: state.queues.lagged(state.chunk_number),
                weights,
                safety: state.safety,
            };
            select(&ctx, opts)
        };

        tracing::debug!(
            ?key,
            chunk_number = state.chunk_number,
            ?throughput_bps,
            buffer_secs = state.buffer_occupancy,
            safety = state.safety.value(),
            gamma,
            ?weights,
            index = selection.index,
            reason = ?selection.reason,
            rejected = selection
                .candidates
                .iter()
                .filter(|c| c.outcome.is_err())
                .count(),
            "ABR decide: selected"
        );

        let changed = state.selected_bitrate != Some(selection.index);
        state.gamma = gamma;
        state.commit(selection.index);
        Ok(AbrDecision::selected(&selection, changed))
    }

    /// Playback seek. Decision state is kept.
    pub fn on_seek(&mut self, key: &StreamKey) {
        self.notifications.seeks += 1;
        tracing::debug!(?key, "ABR: seek");
    }

    /// The playback buffer ran dry.
    pub fn on_buffer_empty(&mut self, key: &StreamKey) {
        self.notifications.buffer_empties += 1;
        if let Some(state) = self.store.get_mut(key) {
            state.rebuffer_events += 1;
        }
        tracing::debug!(?key, "ABR: buffer empty");
    }

    /// Re-arms notification bookkeeping. Decision state of every stream is kept.
    pub fn reset(&mut self) {
        tracing::debug!(
            seeks = self.notifications.seeks,
            buffer_empties = self.notifications.buffer_empties,
            "ABR: reset"
        );
        self.notifications = HostNotifications::default();
    }

    /// Replaces the state of `key` with a fresh one, returning the old state.
    pub fn reset_stream(&mut self, key: &StreamKey) -> Option<StreamDecisionState> {
        self.store
            .insert(*key, StreamDecisionState::new(&self.opts))
    }

    /// Drops the state of a stream that ended.
    pub fn end_stream(&mut self, key: &StreamKey) -> Option<StreamDecisionState> {
        self.store.remove(key)
    }

    /// The segment requested by the last decision arrived.
    pub fn mark_fragment_loaded(&mut self, key: &StreamKey) {
        if let Some(state) = self.store.get_mut(key) {
            state.last_fragment_success = true;
        }
    }
}

fn previous_outcome(
    state: &StreamDecisionState,
    history: &[SegmentRequest],
) -> Option<CycleOutcome> {
    let last_index = state.chunk_history.last?;
    let elapsed = last_completed(history)?.elapsed()?;
    Some(CycleOutcome {
        elapsed_secs: elapsed.as_secs_f64(),
        buffer_secs: state.buffer_occupancy,
        last_index,
        prior_index: state.chunk_history.prior,
        gamma: state.gamma,
    })
}
