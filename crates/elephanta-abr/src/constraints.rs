use serde::{Deserialize, Serialize};

/// Buffer level (seconds) above which the moderate tier applies.
const MODERATE_BUFFER_SECS: f64 = 10.0;
/// Buffer level (seconds) above which the rich tier applies.
const RICH_BUFFER_SECS: f64 = 30.0;

/// Penalty-weight multipliers, recomputed from buffer occupancy every cycle.
///
/// Each multiplier scales its penalty weight through [`ConstraintWeights::scaled`],
/// which divides by 100. Fresh states start on that percentage scale
/// ([`ConstraintWeights::PERCENT`]) but the tier table yields fractions, so
/// after the first cycle weights are effectively a hundredth of a fraction.
/// This is kept as is.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstraintWeights {
    /// `BO`, scales the occupancy penalty.
    pub buffer_occupancy: f64,
    /// `BS`, scales the drift penalty.
    pub bitrate_switch: f64,
    /// `RB`, scales the rebuffer penalty.
    pub rebuffer: f64,
}

impl ConstraintWeights {
    pub const PERCENT: Self = Self::uniform(100.0);

    const LOW: Self = Self::uniform(1.0);
    const MODERATE: Self = Self {
        buffer_occupancy: 0.5,
        bitrate_switch: 1.0,
        rebuffer: 0.5,
    };
    const RICH: Self = Self {
        buffer_occupancy: 1.0,
        bitrate_switch: 1.0,
        rebuffer: 0.1,
    };

    #[must_use]
    pub const fn uniform(weight: f64) -> Self {
        Self {
            buffer_occupancy: weight,
            bitrate_switch: weight,
            rebuffer: weight,
        }
    }

    /// Weight tier for the given buffer occupancy in seconds.
    #[must_use]
    pub fn for_buffer_level(buffer_secs: f64) -> Self {
        if buffer_secs > RICH_BUFFER_SECS {
            Self::RICH
        } else if buffer_secs > MODERATE_BUFFER_SECS {
            Self::MODERATE
        } else {
            Self::LOW
        }
    }

    /// `alpha × weight / 100`, the effective penalty weight.
    #[must_use]
    pub fn scaled(alpha: f64, weight: f64) -> f64 {
        alpha * weight / 100.0
    }

    pub fn drift_weight(&self, alpha1: f64) -> f64 {
        Self::scaled(alpha1, self.bitrate_switch)
    }

    pub fn rebuffer_weight(&self, alpha2: f64) -> f64 {
        Self::scaled(alpha2, self.rebuffer)
    }

    pub fn occupancy_weight(&self, alpha3: f64) -> f64 {
        Self::scaled(alpha3, self.buffer_occupancy)
    }
}

impl Default for ConstraintWeights {
    fn default() -> Self {
        Self::PERCENT
    }
}
