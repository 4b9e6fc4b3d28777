use std::sync::Arc;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use crate::clock::{CircularClock, SampleTime};
use crate::config::{DetectorConfig, Timing};
use crate::error::DetectorError;
use crate::events::ClapEventLog;
use crate::filter::BandpassFilter;
use crate::history::FrameHistory;
use crate::pattern::{Pattern, PatternExtractor};
use crate::threshold::{AdaptiveThreshold, PeakWindow};
use crate::transient::TransientDetector;

/// Per-call detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionParams {
    /// Added to the adaptive threshold to form the peak floor.
    pub threshold_bias: f64,
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self { threshold_bias: 6000.0, lowcut_hz: 100.0, highcut_hz: 4000.0 }
    }
}

/// Receives detector activity. The detector itself never logs.
pub trait DetectionSink: Send + Sync {
    fn clap_accepted(&self, _time: SampleTime, _peaks: usize, _floor: f64) {}

    fn pattern_completed(&self, _pattern: &Pattern, _time: SampleTime) {}

    /// The reset timeout fired but the claps formed no pattern.
    fn sequence_expired(&self, _claps: usize, _time: SampleTime) {}
}

impl<T: DetectionSink + ?Sized> DetectionSink for Arc<T> {
    fn clap_accepted(&self, time: SampleTime, peaks: usize, floor: f64) {
        (**self).clap_accepted(time, peaks, floor)
    }

    fn pattern_completed(&self, pattern: &Pattern, time: SampleTime) {
        (**self).pattern_completed(pattern, time)
    }

    fn sequence_expired(&self, claps: usize, time: SampleTime) {
        (**self).sequence_expired(claps, time)
    }
}

pub struct NullSink;

impl DetectionSink for NullSink {}

/// Forwards detector activity to the `log` facade.
pub struct LogSink {
    label: String,
}

impl LogSink {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

impl DetectionSink for LogSink {
    fn clap_accepted(&self, time: SampleTime, peaks: usize, floor: f64) {
        debug!("[{}] Clap detected at sample {}: {} peaks above {:.0}", self.label, time, peaks, floor);
    }

    fn pattern_completed(&self, pattern: &Pattern, time: SampleTime) {
        info!("[{}] Clap pattern {} ({} claps) at sample {}", self.label, pattern, pattern.total_claps(), time);
    }

    fn sequence_expired(&self, claps: usize, time: SampleTime) {
        debug!("[{}] {} clap(s) expired without a pattern at sample {}", self.label, claps, time);
    }
}

/// Everything a detector mutates while processing frames.
///
/// One state belongs to one stream of frames; run several profiles by
/// giving each its own state.
pub struct DetectorState {
    time: SampleTime,
    threshold: AdaptiveThreshold,
    peaks: PeakWindow,
    log: ClapEventLog,
    history: FrameHistory,
    filter: Option<BandpassFilter>,
}

impl DetectorState {
    pub fn current_time(&self) -> SampleTime {
        self.time
    }

    pub fn threshold(&self) -> f64 {
        self.threshold.value()
    }

    pub fn events(&self) -> &ClapEventLog {
        &self.log
    }

    pub fn history(&self) -> &FrameHistory {
        &self.history
    }
}

/// Turns a stream of fixed-length frames into clap patterns.
pub struct ClapDetector {
    config: DetectorConfig,
    timing: Timing,
    clock: CircularClock,
    transient: TransientDetector,
    extractor: PatternExtractor,
    sink: Box<dyn DetectionSink>,
}

impl ClapDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorError> {
        let timing = config.validate()?;
        let extractor = PatternExtractor::new(timing.clap_interval, timing.reset)
            .with_trailing(config.trailing_run)
            .with_seed_interval(config.include_seed_interval);
        Ok(Self {
            clock: CircularClock::new(timing.period),
            transient: TransientDetector::new(),
            extractor,
            timing,
            config,
            sink: Box::new(NullSink),
        })
    }

    pub fn with_sink(mut self, sink: impl DetectionSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn clock(&self) -> &CircularClock {
        &self.clock
    }

    /// Fresh state. The clock starts one debounce window past the seed so
    /// the very first clap is not suppressed.
    pub fn initial_state(&self) -> DetectorState {
        DetectorState {
            time: self.clock.wrap(self.timing.debounce),
            threshold: AdaptiveThreshold::new(self.config.initial_volume_threshold, self.config.volume_average_factor),
            peaks: PeakWindow::new(self.timing.peak_frames),
            log: ClapEventLog::new(),
            history: FrameHistory::new(self.timing.history_frames),
            filter: None,
        }
    }

    /// Processes one frame. Returns the completed pattern, or an empty one
    /// while a sequence is still open. Rejected frames leave `state` as is.
    pub fn process(&self, state: &mut DetectorState, frame: &[i16], params: &DetectionParams) -> Result<Pattern, DetectorError> {
        self.check_length(frame.len())?;
        if !params.threshold_bias.is_finite() {
            return Err(DetectorError::config(format!("threshold bias must be finite, got {}", params.threshold_bias)));
        }

        let samples: Vec<f64> = frame.iter().map(|&s| f64::from(s)).collect();
        let filtered = {
            let filter = self.filter_for(&mut state.filter, params)?;
            if self.config.carry_filter_state {
                filter.process(&samples)
            } else {
                filter.apply(&samples)
            }
        };

        Ok(self.step(state, frame, &filtered, params.threshold_bias))
    }

    /// Same as `process` for float frames normalised to `[-1, 1]`.
    pub fn process_float(&self, state: &mut DetectorState, frame: &[f64], params: &DetectionParams) -> Result<Pattern, DetectorError> {
        self.check_length(frame.len())?;
        if let Some(index) = frame.iter().position(|x| !x.is_finite()) {
            return Err(DetectorError::NonFiniteSample { index });
        }
        let pcm: Vec<i16> = frame.iter().map(|&x| to_pcm(x)).collect();
        self.process(state, &pcm, params)
    }

    fn check_length(&self, actual: usize) -> Result<(), DetectorError> {
        if actual != self.timing.buffer_length {
            return Err(DetectorError::FrameLength { expected: self.timing.buffer_length, actual });
        }
        Ok(())
    }

    fn filter_for<'s>(&self, slot: &'s mut Option<BandpassFilter>, params: &DetectionParams) -> Result<&'s mut BandpassFilter, DetectorError> {
        let order = self.config.filter_order;
        let fs = f64::from(self.timing.sample_rate);
        let filter = match slot.take() {
            Some(f) if f.matches(order, params.lowcut_hz, params.highcut_hz, fs) => f,
            stale => match BandpassFilter::design(order, params.lowcut_hz, params.highcut_hz, fs) {
                Ok(f) => f,
                Err(e) => {
                    *slot = stale;
                    return Err(e);
                }
            },
        };
        Ok(slot.insert(filter))
    }

    fn step(&self, state: &mut DetectorState, frame: &[i16], filtered: &[f64], bias: f64) -> Pattern {
        state.time = self.clock.advance(state.time, frame.len() as u64);
        state.history.record(frame);

        let recent_peak = state.peaks.push(frame);
        state.threshold.update(f64::from(recent_peak));
        let floor = state.threshold.floor(bias);

        let peaks = self.transient.detect(filtered, floor);
        if !peaks.is_empty() && state.log.try_accept(&self.clock, state.time, self.timing.debounce) {
            self.sink.clap_accepted(state.time, peaks.len(), floor);
        }

        let pending = state.log.len();
        let pattern = self.extractor.evaluate(&self.clock, &mut state.log, state.time);
        if !pattern.is_empty() {
            self.sink.pattern_completed(&pattern, state.time);
        } else if pending > 0 && state.log.is_empty() {
            self.sink.sequence_expired(pending, state.time);
        }
        pattern
    }
}

fn to_pcm(x: f64) -> i16 {
    (x.clamp(-1.0, 1.0) * f64::from(i16::MAX)).round() as i16
}
