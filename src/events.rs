use crate::clock::{CircularClock, SampleTime};

/// Timestamp standing for "no prior clap".
pub const SEED: SampleTime = 0;

/// Accepted clap timestamps since the last pattern reset.
///
/// The log always holds the seed, so debounce and reset checks have a
/// previous timestamp even before the first real clap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClapEventLog {
    events: Vec<SampleTime>,
}

impl ClapEventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Real events in append order.
    pub fn events(&self) -> &[SampleTime] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Last accepted event, or the seed when none was accepted yet.
    pub fn last(&self) -> SampleTime {
        self.events.last().copied().unwrap_or(SEED)
    }

    /// Appends `now` if at least `debounce` samples passed since the last entry.
    pub fn try_accept(&mut self, clock: &CircularClock, now: SampleTime, debounce: u64) -> bool {
        if clock.difference(now, self.last()) < debounce {
            return false;
        }
        self.events.push(now);
        true
    }

    /// Unconditional append, used to replay recorded timestamps.
    pub fn push(&mut self, time: SampleTime) {
        self.events.push(time);
    }

    pub fn reset(&mut self) {
        self.events.clear();
    }
}

impl Default for ClapEventLog {
    fn default() -> Self {
        Self::new()
    }
}
