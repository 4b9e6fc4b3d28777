//! Hand-clap pattern recognition over a stream of 16-bit PCM frames.
//!
//! Frames go through a Butterworth band-pass, an adaptive loudness threshold
//! and a peak picker. Accepted claps are grouped into runs, and once the
//! stream falls silent the runs come back as a [`Pattern`] such as `[2, 1]`.

pub mod args;
pub mod audio;
pub mod clock;
pub mod config;
pub mod detector;
pub mod error;
pub mod events;
pub mod filter;
pub mod history;
pub mod pattern;
pub mod source;
pub mod synth;
pub mod threshold;
pub mod transient;
pub mod util;

pub use clock::{CircularClock, SampleTime};
pub use config::DetectorConfig;
pub use detector::{ClapDetector, DetectionParams, DetectionSink, DetectorState, LogSink, NullSink};
pub use error::DetectorError;
pub use pattern::{Pattern, TrailingRun};
