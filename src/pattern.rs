use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::clock::{CircularClock, SampleTime};
use crate::events::{ClapEventLog, SEED};

/// What happens to a final run of a single clap when the reset timeout fires.
///
/// `Drop` keeps the historical behaviour: isolated claps only show up in a
/// pattern when a later clap closes their run with a long gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingRun {
    #[default]
    Drop,
    Keep,
}

impl FromStr for TrailingRun {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(TrailingRun::Drop),
            "keep" => Ok(TrailingRun::Keep),
            other => Err(format!("unknown trailing-run policy '{}', expected drop or keep", other)),
        }
    }
}

/// Burst sizes of one completed clap sequence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pattern(Vec<u32>);

impl Pattern {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn counts(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_claps(&self) -> u32 {
        self.0.iter().sum()
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }
}

impl From<Vec<u32>> for Pattern {
    fn from(counts: Vec<u32>) -> Self {
        Self(counts)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|c| c.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Groups the event log into bursts once a sequence has gone quiet.
#[derive(Debug, Clone)]
pub struct PatternExtractor {
    clap_interval: u64,
    reset_time: u64,
    trailing: TrailingRun,
    include_seed: bool,
}

impl PatternExtractor {
    pub fn new(clap_interval: u64, reset_time: u64) -> Self {
        Self { clap_interval, reset_time, trailing: TrailingRun::Drop, include_seed: true }
    }

    pub fn with_trailing(mut self, trailing: TrailingRun) -> Self {
        self.trailing = trailing;
        self
    }

    /// Whether the seed is the first "previous" timestamp when building
    /// intervals. On by default; without it intervals only run between real
    /// claps and a lone clap yields nothing.
    pub fn with_seed_interval(mut self, include_seed: bool) -> Self {
        self.include_seed = include_seed;
        self
    }

    pub fn is_finished(&self, clock: &CircularClock, log: &ClapEventLog, now: SampleTime) -> bool {
        clock.difference(now, log.last()) >= self.reset_time
    }

    /// Burst sizes of everything in `log`, regardless of timing.
    pub fn extract(&self, clock: &CircularClock, log: &ClapEventLog) -> Pattern {
        let mut times = Vec::with_capacity(log.len() + 1);
        if self.include_seed {
            times.push(SEED);
        }
        times.extend_from_slice(log.events());

        let mut pattern = Vec::new();
        let mut consecutive = 1u32;
        for pair in times.windows(2) {
            if clock.difference(pair[1], pair[0]) < self.clap_interval {
                consecutive += 1;
            } else {
                pattern.push(consecutive);
                consecutive = 1;
            }
        }

        let keep_single = self.trailing == TrailingRun::Keep && !log.is_empty();
        if consecutive > 1 || keep_single {
            pattern.push(consecutive);
        }
        Pattern(pattern)
    }

    /// Per-frame step: empty while the sequence is still open, otherwise the
    /// extracted pattern. The log returns to its seed state whenever the
    /// reset timeout fires.
    pub fn evaluate(&self, clock: &CircularClock, log: &mut ClapEventLog, now: SampleTime) -> Pattern {
        if !self.is_finished(clock, log, now) {
            return Pattern::empty();
        }
        let pattern = self.extract(clock, log);
        log.reset();
        pattern
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_of(times: &[SampleTime]) -> ClapEventLog {
        let mut log = ClapEventLog::new();
        times.iter().for_each(|&t| log.push(t));
        log
    }

    fn between_claps(clap_interval: u64, reset_time: u64) -> PatternExtractor {
        PatternExtractor::new(clap_interval, reset_time).with_seed_interval(false)
    }

    #[test]
    fn test_round_trip_triple() {
        let clock = CircularClock::new(480_000);
        let extractor = PatternExtractor::new(150, 1000);
        // seed at 0, then 100, 180 and a late 5000
        let mut log = log_of(&[100, 180, 5000]);

        assert!(extractor.evaluate(&clock, &mut log, 5500).is_empty());
        assert_eq!(log.len(), 3);

        let pattern = extractor.evaluate(&clock, &mut log, 6000);
        assert_eq!(pattern.counts(), &[3]);
        assert!(log.is_empty());
    }

    #[test]
    fn test_seed_closes_a_run_before_distant_claps() {
        let clock = CircularClock::new(480_000);
        let extractor = PatternExtractor::new(150, 1000);
        assert_eq!(extractor.extract(&clock, &log_of(&[2000])).counts(), &[1]);
        assert_eq!(extractor.extract(&clock, &log_of(&[2000, 4000])).counts(), &[1, 1]);
        assert_eq!(extractor.extract(&clock, &log_of(&[2000, 2100])).counts(), &[1, 2]);
        assert!(extractor.extract(&clock, &ClapEventLog::new()).is_empty());
    }

    #[test]
    fn test_intervals_between_claps_only() {
        let clock = CircularClock::new(480_000);
        let extractor = between_claps(150, 1000);
        let mut log = log_of(&[0, 100, 180, 5000]);
        assert_eq!(extractor.evaluate(&clock, &mut log, 6000).counts(), &[3]);
        assert_eq!(extractor.extract(&clock, &log_of(&[2000, 2100])).counts(), &[2]);
    }

    #[test]
    fn test_trailing_single_policy() {
        let clock = CircularClock::new(480_000);
        let log = log_of(&[1000, 3000]);
        let drop = between_claps(150, 1000);
        let keep = between_claps(150, 1000).with_trailing(TrailingRun::Keep);
        assert_eq!(drop.extract(&clock, &log).counts(), &[1]);
        assert_eq!(keep.extract(&clock, &log).counts(), &[1, 1]);

        // a lone clap is itself a trailing run of one
        let single = log_of(&[1000]);
        assert!(drop.extract(&clock, &single).is_empty());
        assert_eq!(keep.extract(&clock, &single).counts(), &[1]);
        assert!(keep.extract(&clock, &ClapEventLog::new()).is_empty());

        let seeded = PatternExtractor::new(150, 1000).with_trailing(TrailingRun::Keep);
        assert_eq!(seeded.extract(&clock, &single).counts(), &[1, 1]);
    }

    #[test]
    fn test_silence_reset_clears_log_even_without_pattern() {
        let clock = CircularClock::new(480_000);
        let extractor = between_claps(150, 1000);
        let mut log = log_of(&[1000]);
        assert!(extractor.evaluate(&clock, &mut log, 2500).is_empty());
        assert!(log.is_empty());
    }

    #[test]
    fn test_mixed_bursts() {
        let clock = CircularClock::new(480_000);
        let extractor = PatternExtractor::new(150, 1000);
        // 2 claps counting the seed, gap, 3 claps, gap, 1 clap, gap, 2 claps
        let log = log_of(&[100, 600, 700, 800, 1500, 2100, 2200]);
        assert_eq!(extractor.extract(&clock, &log).counts(), &[2, 3, 1, 2]);
    }

    #[test]
    fn test_identical_timestamps_share_a_burst() {
        let clock = CircularClock::new(480_000);
        assert_eq!(between_claps(150, 1000).extract(&clock, &log_of(&[500, 500])).counts(), &[2]);
        assert_eq!(PatternExtractor::new(150, 1000).extract(&clock, &log_of(&[0])).counts(), &[2]);
    }

    #[test]
    fn test_intervals_wrap_around_period() {
        let clock = CircularClock::new(1000);
        let extractor = between_claps(150, 300);
        let mut log = log_of(&[950, 20]);
        assert!(extractor.evaluate(&clock, &mut log, 200).is_empty());
        assert_eq!(extractor.evaluate(&clock, &mut log, 320).counts(), &[2]);
    }

    #[test]
    fn test_no_pattern_while_sequence_open() {
        let clock = CircularClock::new(480_000);
        let extractor = PatternExtractor::new(150, 1000);
        let mut log = log_of(&[10_000, 10_100]);
        for now in (10_100..11_100).step_by(64) {
            assert!(extractor.evaluate(&clock, &mut log, now).is_empty());
        }
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_pattern_display_and_policy_parse() {
        assert_eq!(Pattern::from(vec![2, 1]).to_string(), "[2, 1]");
        assert_eq!(Pattern::from(vec![2, 1]).total_claps(), 3);
        assert_eq!("Keep".parse::<TrailingRun>(), Ok(TrailingRun::Keep));
        assert!("later".parse::<TrailingRun>().is_err());
    }
}
