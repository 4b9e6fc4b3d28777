use std::path::Path;
use anyhow::Result;
use crate::audio::load_audio;

/// Supplies fixed-length frames to a detector.
///
/// Read failures come back as errors; whether to retry is up to the caller.
pub trait FrameSource {
    fn sample_rate(&self) -> u32;

    fn frame_length(&self) -> usize;

    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Vec<i16>>>;
}

/// Frames cut from samples held in memory. The final partial frame is
/// zero-padded to full length.
pub struct MemoryFrameSource {
    samples: Vec<i16>,
    sample_rate: u32,
    frame_length: usize,
    position: usize,
}

impl MemoryFrameSource {
    pub fn new(samples: Vec<i16>, sample_rate: u32, frame_length: usize) -> Self {
        Self { samples, sample_rate, frame_length: frame_length.max(1), position: 0 }
    }

    pub fn remaining_frames(&self) -> usize {
        let left = self.samples.len().saturating_sub(self.position);
        (left + self.frame_length - 1) / self.frame_length
    }
}

impl FrameSource for MemoryFrameSource {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_length(&self) -> usize {
        self.frame_length
    }

    fn next_frame(&mut self) -> Result<Option<Vec<i16>>> {
        if self.position >= self.samples.len() {
            return Ok(None);
        }
        let end = (self.position + self.frame_length).min(self.samples.len());
        let mut frame = self.samples[self.position..end].to_vec();
        frame.resize(self.frame_length, 0);
        self.position = end;
        Ok(Some(frame))
    }
}

/// Decodes an audio file up front and serves it frame by frame.
pub struct FileFrameSource {
    inner: MemoryFrameSource,
}

impl FileFrameSource {
    pub fn open<P: AsRef<Path>>(path: P, frame_length: usize) -> Result<Self> {
        let audio = load_audio(path)?;
        Ok(Self { inner: MemoryFrameSource::new(audio.samples, audio.sample_rate, frame_length) })
    }

    pub fn remaining_frames(&self) -> usize {
        self.inner.remaining_frames()
    }
}

impl FrameSource for FileFrameSource {
    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn frame_length(&self) -> usize {
        self.inner.frame_length()
    }

    fn next_frame(&mut self) -> Result<Option<Vec<i16>>> {
        self.inner.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_padded_to_length() {
        let mut source = MemoryFrameSource::new((1..=5).collect(), 8000, 2);
        assert_eq!(source.remaining_frames(), 3);
        assert_eq!(source.next_frame().unwrap(), Some(vec![1, 2]));
        assert_eq!(source.next_frame().unwrap(), Some(vec![3, 4]));
        assert_eq!(source.next_frame().unwrap(), Some(vec![5, 0]));
        assert_eq!(source.next_frame().unwrap(), None);
        assert_eq!(source.remaining_frames(), 0);
    }

    #[test]
    fn test_empty_source() {
        let mut source = MemoryFrameSource::new(Vec::new(), 8000, 1024);
        assert_eq!(source.frame_length(), 1024);
        assert!(source.next_frame().unwrap().is_none());
    }
}
