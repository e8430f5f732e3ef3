use std::{collections::HashMap, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    AbrError, AbrResult, ConstraintWeights, LyapunovOptions, SafetyMargin, StreamKey,
    VirtualQueues,
};

/// Last two rendition indices handed out for a stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkHistory {
    pub last: Option<usize>,
    pub prior: Option<usize>,
}

impl ChunkHistory {
    fn push(&mut self, index: usize) {
        self.prior = self.last;
        self.last = Some(index);
    }
}

/// Controller state of one stream, mutated once per decision cycle.
///
/// Hosts may persist the serialized form between calls; it is only ever
/// interpreted by this crate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StreamDecisionState {
    /// Decisions made so far.
    pub chunk_number: u64,
    /// Ladder used by the most recent cycle, bits per second ascending.
    pub bitrate_list: Vec<u64>,
    pub chunk_history: ChunkHistory,
    pub queues: VirtualQueues,
    /// Utility weight of the most recent cycle.
    pub gamma: f64,
    /// Buffer level observed at the most recent cycle, seconds.
    pub buffer_occupancy: f64,
    pub constraints: ConstraintWeights,
    /// Per-stream `uors_factor`.
    pub safety: SafetyMargin,
    pub fragment_duration: Duration,
    pub selected_bitrate: Option<usize>,
    pub last_fragment_success: bool,
    /// Decisions whose index differed from the previous one.
    pub bitrate_switches: u64,
    /// Buffer-empty notifications received for the stream.
    pub rebuffer_events: u64,
}

impl StreamDecisionState {
    #[must_use]
    pub fn new(opts: &LyapunovOptions) -> Self {
        Self {
            chunk_number: 0,
            bitrate_list: Vec::new(),
            chunk_history: ChunkHistory::default(),
            queues: VirtualQueues::default(),
            gamma: opts.gamma_min,
            buffer_occupancy: 0.0,
            constraints: opts.initial_constraints,
            safety: SafetyMargin::new(opts.initial_safety),
            fragment_duration: Duration::ZERO,
            selected_bitrate: None,
            last_fragment_success: true,
            bitrate_switches: 0,
            rebuffer_events: 0,
        }
    }

    pub fn is_first_cycle(&self) -> bool {
        self.chunk_number == 0
    }

    /// Checks a state that did not come out of a decision cycle, such as a
    /// blob a host parked and edited.
    ///
    /// Every backlog slot must be finite and non-negative; the scalars must be
    /// finite.
    pub fn validate(&self) -> AbrResult<()> {
        let q = &self.queues;
        for (name, backlog) in [("z1", q.z1), ("z2", q.z2), ("z3", q.z3), ("g", q.g)] {
            for value in [backlog.current(), backlog.previous()] {
                if !(value.is_finite() && value >= 0.0) {
                    return Err(AbrError::InvalidState(format!(
                        "backlog {name} holds {value}"
                    )));
                }
            }
        }
        let scalars = [
            ("gamma", self.gamma),
            ("buffer_occupancy", self.buffer_occupancy),
            ("safety", self.safety.value()),
        ];
        if let Some((name, value)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AbrError::InvalidState(format!("{name} is {value}")));
        }
        if self.gamma <= 0.0 {
            return Err(AbrError::InvalidState(format!(
                "gamma must be positive, got {}",
                self.gamma
            )));
        }
        Ok(())
    }

    /// Records the decision of the current cycle and closes it.
    pub fn commit(&mut self, index: usize) {
        if self.selected_bitrate.is_some_and(|prev| prev != index) {
            self.bitrate_switches += 1;
        }
        self.selected_bitrate = Some(index);
        self.chunk_history.push(index);
        self.chunk_number += 1;
        self.last_fragment_success = false;
    }
}

/// Owns the decision state of every active stream.
#[derive(Debug, Default)]
pub struct StateStore {
    states: HashMap<StreamKey, StreamDecisionState>,
}

impl StateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of `key`, created with `opts` on first access.
    pub fn get_or_init(
        &mut self,
        key: StreamKey,
        opts: &LyapunovOptions,
    ) -> &mut StreamDecisionState {
        self.states.entry(key).or_insert_with(|| {
            tracing::debug!(?key, "ABR state created");
            StreamDecisionState::new(opts)
        })
    }

    pub fn get(&self, key: &StreamKey) -> Option<&StreamDecisionState> {
        self.states.get(key)
    }

    pub fn get_mut(&mut self, key: &StreamKey) -> Option<&mut StreamDecisionState> {
        self.states.get_mut(key)
    }

    /// Installs a previously exported state, returning the one it replaces.
    pub fn insert(
        &mut self,
        key: StreamKey,
        state: StreamDecisionState,
    ) -> Option<StreamDecisionState> {
        self.states.insert(key, state)
    }

    pub fn remove(&mut self, key: &StreamKey) -> Option<StreamDecisionState> {
        self.states.remove(key)
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &StreamKey> {
        self.states.keys()
    }
}
