use thiserror::Error;

/// Errors reported by the detection core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    /// Rejected at construction, or on the first call using an invalid band.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Frame length does not match the configured buffer length.
    #[error("malformed frame: expected {expected} samples, got {actual}")]
    FrameLength {
        expected: usize,
        actual: usize,
    },

    /// Float frame carried a NaN or infinite sample.
    #[error("malformed frame: non-finite sample at index {index}")]
    NonFiniteSample {
        index: usize,
    },
}

impl DetectorError {
    pub fn config(msg: impl Into<String>) -> Self {
        DetectorError::Config(msg.into())
    }

    pub fn is_malformed_frame(&self) -> bool {
        matches!(self, DetectorError::FrameLength { .. } | DetectorError::NonFiniteSample { .. })
    }
}
