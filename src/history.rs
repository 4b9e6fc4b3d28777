use std::collections::VecDeque;

/// Bounded buffer of the most recent raw frames, kept for audio export.
#[derive(Debug, Clone)]
pub struct FrameHistory {
    frames: VecDeque<Vec<i16>>,
    capacity: usize,
}

impl FrameHistory {
    /// A capacity of zero disables recording.
    pub fn new(capacity: usize) -> Self {
        Self { frames: VecDeque::with_capacity(capacity), capacity }
    }

    pub fn record(&mut self, frame: &[i16]) {
        if self.capacity == 0 {
            return;
        }
        // reuse the evicted allocation once the buffer is full
        let mut slot = if self.frames.len() == self.capacity {
            self.frames.pop_front().unwrap_or_default()
        } else {
            Vec::with_capacity(frame.len())
        };
        slot.clear();
        slot.extend_from_slice(frame);
        self.frames.push_back(slot);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Recorded audio, oldest sample first.
    pub fn samples(&self) -> Vec<i16> {
        self.frames.iter().flatten().copied().collect()
    }
}
