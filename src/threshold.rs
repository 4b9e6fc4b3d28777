use std::collections::VecDeque;

/// Smoothed ambient loudness estimate.
///
/// Each update moves the threshold towards half of the observed peak, so a
/// steady input `v` converges to `v * 0.5`.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptiveThreshold {
    value: f64,
    average_factor: f64,
}

impl AdaptiveThreshold {
    pub fn new(initial: f64, average_factor: f64) -> Self {
        Self { value: initial, average_factor }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn update(&mut self, peak: f64) -> f64 {
        let a = self.average_factor;
        self.value = a * self.value + (1.0 - a) * peak * 0.5;
        self.value
    }

    /// Detection floor for one call; the bias never enters the smoothed state.
    pub fn floor(&self, bias: f64) -> f64 {
        self.value + bias
    }
}

/// Maximum raw magnitude over the last `capacity` frames.
#[derive(Debug, Clone)]
pub struct PeakWindow {
    peaks: VecDeque<u32>,
    capacity: usize,
}

impl PeakWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { peaks: VecDeque::with_capacity(capacity), capacity }
    }

    /// Frames needed to cover `seconds` of audio.
    pub fn frames_for(seconds: f64, sample_rate: u32, buffer_length: usize) -> usize {
        ((seconds * sample_rate as f64) / buffer_length as f64).ceil().max(1.0) as usize
    }

    /// Records a frame's peak magnitude and returns the window maximum.
    pub fn push(&mut self, frame: &[i16]) -> u32 {
        let peak = frame.iter().map(|s| s.unsigned_abs() as u32).max().unwrap_or(0);
        if self.peaks.len() == self.capacity {
            self.peaks.pop_front();
        }
        self.peaks.push_back(peak);
        self.max()
    }

    pub fn max(&self) -> u32 {
        self.peaks.iter().copied().max().unwrap_or(0)
    }
}
