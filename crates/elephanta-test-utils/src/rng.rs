//! Seeded randomness for simulated networks.

/// xorshift64 generator driving throughput jitter.
///
/// Two players built with the same seed see the same bandwidth trace.
#[derive(Clone, Debug)]
pub struct Xorshift64(u64);

impl Xorshift64 {
    /// A zero seed would stay zero forever, so it is replaced.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self(if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed })
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    /// Bandwidth multiplier drawn uniformly from `[1 - spread, 1 + spread)`.
    pub fn jitter(&mut self, spread: f64) -> f64 {
        // top 53 bits give a uniform fraction in [0, 1)
        let unit = (self.next_u64() >> 11) as f64 / (1_u64 << 53) as f64;
        1.0 - spread + 2.0 * spread * unit
    }
}
