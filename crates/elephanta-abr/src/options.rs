use std::f64::consts::LN_10;

use serde::{Deserialize, Serialize};

use crate::{AbrError, AbrResult, ConstraintWeights, Delivery};

/// Tuning of the Lyapunov drift-plus-penalty controller.
///
/// Defaults reproduce the reference tuning; hosts can load overrides from any
/// serde format, missing fields fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LyapunovOptions {
    /// Trade-off weight `V` between utility and constraint backlog.
    pub v: f64,
    /// Weight of the quality-drift penalty.
    pub alpha1: f64,
    /// Weight of the rebuffer penalty.
    pub alpha2: f64,
    /// Weight of the buffer-occupancy penalty.
    pub alpha3: f64,
    /// Lower bound of the per-cycle utility weight.
    pub gamma_min: f64,
    /// Upper bound of the per-cycle utility weight.
    pub gamma_max: f64,
    /// Drain rate of the drift queue, per second of download.
    pub c1: f64,
    /// Drain rate of the rebuffer queue.
    pub c2: f64,
    /// Drain rate of the buffer-occupancy queue.
    pub c3: f64,
    /// Base of the per-rung download-time discount, also scales the buffer thresholds.
    pub rebuffer_safety_factor: f64,
    /// Low buffer mark before scaling by `rebuffer_safety_factor`.
    pub safe_buffer_secs: f64,
    /// High buffer mark before scaling by `rebuffer_safety_factor`.
    pub rich_buffer_secs: f64,
    /// Subtracted from the expected buffer before forward-looking penalties.
    pub delay_secs: f64,
    /// Safety margin increment applied on every low-buffer cycle.
    pub safety_step: f64,
    /// Safety margin of a fresh stream.
    pub initial_safety: f64,
    /// Constraint weights of a fresh stream, percentage scale.
    pub initial_constraints: ConstraintWeights,
    /// Throughput samples averaged for live presentations.
    pub live_sample_window: usize,
    /// Throughput samples averaged for on-demand presentations.
    pub vod_sample_window: usize,
}

impl Default for LyapunovOptions {
    fn default() -> Self {
        Self {
            v: 0.5,
            alpha1: 5.0,
            alpha2: 10.0,
            alpha3: 3.0,
            gamma_min: 1.0,
            gamma_max: 7.0 * LN_10,
            c1: 3.0,
            c2: 1.0,
            c3: 0.5,
            rebuffer_safety_factor: 0.9,
            safe_buffer_secs: 4.0,
            rich_buffer_secs: 10.0,
            delay_secs: 5.1,
            safety_step: 1.0,
            initial_safety: 1.0,
            initial_constraints: ConstraintWeights::PERCENT,
            live_sample_window: 2,
            vod_sample_window: 3,
        }
    }
}

impl LyapunovOptions {
    /// Buffer level (seconds) under which the safety margin grows.
    pub fn low_buffer_threshold(&self) -> f64 {
        self.rebuffer_safety_factor * self.safe_buffer_secs
    }

    /// Buffer level (seconds) over which the safety margin is halved.
    pub fn high_buffer_threshold(&self) -> f64 {
        self.rebuffer_safety_factor * self.rich_buffer_secs
    }

    pub fn sample_window(&self, delivery: Delivery) -> usize {
        match delivery {
            Delivery::Live => self.live_sample_window,
            Delivery::OnDemand => self.vod_sample_window,
        }
    }

    #[must_use]
    pub fn with_v(mut self, v: f64) -> Self {
        self.v = v;
        self
    }

    #[must_use]
    pub fn with_alphas(mut self, alpha1: f64, alpha2: f64, alpha3: f64) -> Self {
        self.alpha1 = alpha1;
        self.alpha2 = alpha2;
        self.alpha3 = alpha3;
        self
    }

    #[must_use]
    pub fn with_gamma_bounds(mut self, gamma_min: f64, gamma_max: f64) -> Self {
        self.gamma_min = gamma_min;
        self.gamma_max = gamma_max;
        self
    }

    #[must_use]
    pub fn with_drain_rates(mut self, c1: f64, c2: f64, c3: f64) -> Self {
        self.c1 = c1;
        self.c2 = c2;
        self.c3 = c3;
        self
    }

    #[must_use]
    pub fn with_sample_windows(mut self, live: usize, vod: usize) -> Self {
        self.live_sample_window = live;
        self.vod_sample_window = vod;
        self
    }

    pub fn validate(&self) -> AbrResult<()> {
        let scalars = [
            ("v", self.v),
            ("alpha1", self.alpha1),
            ("alpha2", self.alpha2),
            ("alpha3", self.alpha3),
            ("gamma_min", self.gamma_min),
            ("gamma_max", self.gamma_max),
            ("c1", self.c1),
            ("c2", self.c2),
            ("c3", self.c3),
            ("rebuffer_safety_factor", self.rebuffer_safety_factor),
            ("safe_buffer_secs", self.safe_buffer_secs),
            ("rich_buffer_secs", self.rich_buffer_secs),
            ("delay_secs", self.delay_secs),
            ("safety_step", self.safety_step),
            ("initial_safety", self.initial_safety),
        ];
        if let Some((name, value)) = scalars.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(format!("{name} must be finite, got {value}")));
        }
        if let Some((name, value)) = scalars[..9].iter().find(|(_, v)| *v < 0.0) {
            return Err(invalid(format!("{name} must not be negative, got {value}")));
        }
        if self.gamma_min <= 0.0 {
            return Err(invalid(format!(
                "gamma_min must be positive, got {}",
                self.gamma_min
            )));
        }
        if self.gamma_min > self.gamma_max {
            return Err(invalid(format!(
                "gamma_min {} exceeds gamma_max {}",
                self.gamma_min, self.gamma_max
            )));
        }
        if !(self.rebuffer_safety_factor > 0.0 && self.rebuffer_safety_factor <= 1.0) {
            return Err(invalid(format!(
                "rebuffer_safety_factor must be in (0, 1], got {}",
                self.rebuffer_safety_factor
            )));
        }
        if self.live_sample_window == 0 || self.vod_sample_window == 0 {
            return Err(invalid("sample windows must be at least 1".to_owned()));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> AbrError {
    AbrError::InvalidOptions(msg)
}
