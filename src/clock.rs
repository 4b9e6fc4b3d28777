use serde::{Deserialize, Serialize};

/// A sample index on the circular time axis, always in `[0, period)`.
pub type SampleTime = u64;

/// Wrap-around time coordinate measured in samples.
///
/// Elapsed time between two wrapped timestamps is the forward distance from
/// the older one to the newer one. The period has to be longer than any
/// interval measured with it, otherwise comparisons alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircularClock {
    period: u64,
}

impl CircularClock {
    /// `period` must be non-zero; `DetectorConfig::validate` guarantees it.
    pub fn new(period: u64) -> Self {
        debug_assert!(period > 0);
        Self { period }
    }

    /// Converts an unbounded sample count into circular time.
    pub fn wrap(&self, timestamp: u64) -> SampleTime {
        timestamp % self.period
    }

    pub fn advance(&self, current: SampleTime, delta: u64) -> SampleTime {
        // both terms reduced first so the sum cannot overflow
        (current % self.period + delta % self.period) % self.period
    }

    /// Forward distance travelling from `b` to `a` around the circle.
    pub fn difference(&self, a: SampleTime, b: SampleTime) -> u64 {
        if a >= b {
            a - b
        } else {
            a + self.period - b
        }
    }
}
