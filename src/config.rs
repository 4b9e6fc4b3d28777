use std::path::{Path, PathBuf};
use anyhow::Context;
use directories::ProjectDirs;
use knuffel::Decode;
use serde::{Deserialize, Serialize};
use crate::detector::DetectionParams;
use crate::error::DetectorError;
use crate::filter::DEFAULT_ORDER;
use crate::pattern::TrailingRun;
use crate::threshold::PeakWindow;

/// Construction-time settings of a detector, in seconds where applicable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub sample_rate: u32,
    pub buffer_length: usize,
    /// Debounce window as a fraction of a second.
    pub debounce_time_factor: f64,
    /// Silence after the last clap that closes a sequence.
    pub reset_time: f64,
    /// Largest gap between two claps of the same burst.
    pub clap_interval: f64,
    pub seconds_per_time_period: u32,
    pub volume_average_factor: f64,
    pub initial_volume_threshold: f64,
    pub filter_order: usize,
    /// Raw audio span whose peak feeds the adaptive threshold.
    pub peak_window: f64,
    /// Raw audio kept for export; not used for detection.
    pub history_seconds: f64,
    pub carry_filter_state: bool,
    pub trailing_run: TrailingRun,
    /// Treat the seed as the clap before the first real one, so a lone clap
    /// forms the pattern `[1]`.
    pub include_seed_interval: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_length: 2048,
            debounce_time_factor: 0.15,
            reset_time: 0.25,
            clap_interval: 0.08,
            seconds_per_time_period: 10,
            volume_average_factor: 0.9,
            initial_volume_threshold: 7000.0,
            filter_order: DEFAULT_ORDER,
            peak_window: 1.0,
            history_seconds: 3.1,
            carry_filter_state: false,
            trailing_run: TrailingRun::Drop,
            include_seed_interval: true,
        }
    }
}

/// Sample-count view of a validated `DetectorConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub sample_rate: u32,
    pub buffer_length: usize,
    pub debounce: u64,
    pub reset: u64,
    pub clap_interval: u64,
    pub period: u64,
    pub peak_frames: usize,
    pub history_frames: usize,
}

fn seconds_to_samples(name: &str, seconds: f64, rate: u32) -> Result<u64, DetectorError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(DetectorError::config(format!("{} must be a finite, non-negative duration, got {}", name, seconds)));
    }
    let samples = (seconds * rate as f64) as u64;
    if samples == 0 {
        return Err(DetectorError::config(format!("{} of {}s is shorter than one sample", name, seconds)));
    }
    Ok(samples)
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<Timing, DetectorError> {
        if self.sample_rate == 0 {
            return Err(DetectorError::config("sample rate must be positive"));
        }
        if self.buffer_length == 0 {
            return Err(DetectorError::config("buffer length must be positive"));
        }
        if self.filter_order == 0 {
            return Err(DetectorError::config("filter order must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.volume_average_factor) {
            return Err(DetectorError::config(format!(
                "volume average factor must lie in [0, 1), got {}", self.volume_average_factor
            )));
        }
        if !self.initial_volume_threshold.is_finite() {
            return Err(DetectorError::config("initial volume threshold must be finite"));
        }
        if !self.history_seconds.is_finite() || self.history_seconds < 0.0 {
            return Err(DetectorError::config("history length must be a finite, non-negative duration"));
        }

        let rate = self.sample_rate;
        let debounce = seconds_to_samples("debounce time", self.debounce_time_factor, rate)?;
        let reset = seconds_to_samples("reset time", self.reset_time, rate)?;
        let clap_interval = seconds_to_samples("clap interval", self.clap_interval, rate)?;
        let period = self.seconds_per_time_period as u64 * rate as u64;
        if period == 0 {
            return Err(DetectorError::config("seconds per time period must be positive"));
        }
        seconds_to_samples("peak window", self.peak_window, rate)?;
        let peak_frames = PeakWindow::frames_for(self.peak_window, rate, self.buffer_length);

        let windows = [
            ("debounce time", debounce),
            ("reset time", reset),
            ("clap interval", clap_interval),
            ("peak window", (peak_frames * self.buffer_length) as u64),
            ("buffer length", self.buffer_length as u64),
        ];
        if let Some((name, samples)) = windows.iter().find(|(_, samples)| *samples >= period) {
            return Err(DetectorError::config(format!(
                "circular period of {} samples must exceed the {} ({} samples)", period, name, samples
            )));
        }

        let history_frames = ((rate as f64 * self.history_seconds) / self.buffer_length as f64) as usize;

        Ok(Timing {
            sample_rate: rate,
            buffer_length: self.buffer_length,
            debounce,
            reset,
            clap_interval,
            period,
            peak_frames,
            history_frames,
        })
    }
}

/// `detector` node of the KDL config file.
#[derive(Decode, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorNode {
    #[knuffel(property(name = "sample-rate"))]
    pub sample_rate: Option<u32>,
    #[knuffel(property(name = "buffer-length"))]
    pub buffer_length: Option<u32>,
    #[knuffel(property)]
    pub debounce: Option<f64>,
    #[knuffel(property(name = "reset-time"))]
    pub reset_time: Option<f64>,
    #[knuffel(property(name = "clap-interval"))]
    pub clap_interval: Option<f64>,
    #[knuffel(property)]
    pub period: Option<u32>,
    #[knuffel(property(name = "volume-average"))]
    pub volume_average: Option<f64>,
    #[knuffel(property(name = "initial-threshold"))]
    pub initial_threshold: Option<f64>,
    #[knuffel(property(name = "filter-order"))]
    pub filter_order: Option<u32>,
    #[knuffel(property(name = "peak-window"))]
    pub peak_window: Option<f64>,
    #[knuffel(property)]
    pub history: Option<f64>,
    #[knuffel(property(name = "carry-state"))]
    pub carry_state: Option<bool>,
    #[knuffel(property(name = "trailing-run"))]
    pub trailing_run: Option<String>,
    #[knuffel(property(name = "seed-interval"))]
    pub seed_interval: Option<bool>,
}

/// `profile "name"` node: per-call detection parameters.
#[derive(Decode, Debug, Clone, Serialize, Deserialize)]
pub struct ProfileNode {
    #[knuffel(argument)]
    pub name: String,
    #[knuffel(property)]
    pub bias: Option<f64>,
    #[knuffel(property)]
    pub lowcut: Option<f64>,
    #[knuffel(property)]
    pub highcut: Option<f64>,
    #[knuffel(property)]
    pub trigger: Option<u32>,
}

/// A named set of detection parameters, run by its own detector state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub params: DetectionParams,
    /// Pattern length that triggers an export of the recent audio.
    pub trigger: Option<u32>,
}

impl Default for Profile {
    fn default() -> Self {
        Self { name: "default".to_string(), params: DetectionParams::default(), trigger: None }
    }
}

#[derive(Decode, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[knuffel(child)]
    pub detector: Option<DetectorNode>,
    #[knuffel(children(name = "profile"))]
    pub profiles: Vec<ProfileNode>,
}

impl ConfigFile {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config = knuffel::parse("config.kdl", content)?;
        Ok(config)
    }

    /// `<config dir>/config.kdl` of the platform's project directories.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "handclap", "handclap").map(|dirs| dirs.config_dir().join("config.kdl"))
    }

    pub fn detector_config(&self) -> Result<DetectorConfig, DetectorError> {
        let mut config = DetectorConfig::default();
        let Some(node) = &self.detector else {
            return Ok(config);
        };
        if let Some(v) = node.sample_rate { config.sample_rate = v; }
        if let Some(v) = node.buffer_length { config.buffer_length = v as usize; }
        if let Some(v) = node.debounce { config.debounce_time_factor = v; }
        if let Some(v) = node.reset_time { config.reset_time = v; }
        if let Some(v) = node.clap_interval { config.clap_interval = v; }
        if let Some(v) = node.period { config.seconds_per_time_period = v; }
        if let Some(v) = node.volume_average { config.volume_average_factor = v; }
        if let Some(v) = node.initial_threshold { config.initial_volume_threshold = v; }
        if let Some(v) = node.filter_order { config.filter_order = v as usize; }
        if let Some(v) = node.peak_window { config.peak_window = v; }
        if let Some(v) = node.history { config.history_seconds = v; }
        if let Some(v) = node.carry_state { config.carry_filter_state = v; }
        if let Some(v) = &node.trailing_run {
            config.trailing_run = v.parse().map_err(DetectorError::Config)?;
        }
        if let Some(v) = node.seed_interval { config.include_seed_interval = v; }
        Ok(config)
    }

    /// Configured profiles, or a single `default` profile when none are listed.
    pub fn profiles(&self) -> Vec<Profile> {
        if self.profiles.is_empty() {
            return vec![Profile::default()];
        }
        self.profiles
            .iter()
            .map(|node| {
                let defaults = DetectionParams::default();
                Profile {
                    name: node.name.clone(),
                    params: DetectionParams {
                        threshold_bias: node.bias.unwrap_or(defaults.threshold_bias),
                        lowcut_hz: node.lowcut.unwrap_or(defaults.lowcut_hz),
                        highcut_hz: node.highcut.unwrap_or(defaults.highcut_hz),
                    },
                    trigger: node.trigger,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing() {
        let timing = DetectorConfig { sample_rate: 48000, ..Default::default() }.validate().unwrap();
        assert_eq!(timing.debounce, 7200);
        assert_eq!(timing.reset, 12000);
        assert_eq!(timing.clap_interval, 3840);
        assert_eq!(timing.period, 480_000);
        assert_eq!(timing.peak_frames, 24);
        assert_eq!(timing.history_frames, 72);
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let bad = [
            DetectorConfig { sample_rate: 0, ..Default::default() },
            DetectorConfig { buffer_length: 0, ..Default::default() },
            DetectorConfig { reset_time: 0.0, ..Default::default() },
            DetectorConfig { clap_interval: -0.1, ..Default::default() },
            DetectorConfig { debounce_time_factor: f64::NAN, ..Default::default() },
            DetectorConfig { seconds_per_time_period: 0, ..Default::default() },
            DetectorConfig { filter_order: 0, ..Default::default() },
            DetectorConfig { volume_average_factor: 1.5, ..Default::default() },
            DetectorConfig { volume_average_factor: 1.0, ..Default::default() },
        ];
        for config in bad {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, DetectorError::Config(_)), "{:?}", config);
        }
    }

    #[test]
    fn test_rejects_period_shorter_than_windows() {
        let config = DetectorConfig { seconds_per_time_period: 1, reset_time: 1.5, ..Default::default() };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reset time"), "{}", err);

        let config = DetectorConfig { seconds_per_time_period: 1, ..Default::default() };
        // peak window of one second rounds up to whole frames
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_kdl_config() {
        let text = r#"
            detector sample-rate=48000 buffer-length=1024 debounce=0.1 reset-time=0.3 trailing-run="keep" seed-interval=false
            profile "double" bias=5000.0 lowcut=200.0 highcut=3200.0 trigger=2
            profile "loose"
        "#;
        let file = ConfigFile::parse(text).unwrap();
        let config = file.detector_config().unwrap();
        assert_eq!(config.sample_rate, 48000);
        assert_eq!(config.buffer_length, 1024);
        assert_eq!(config.debounce_time_factor, 0.1);
        assert_eq!(config.reset_time, 0.3);
        assert_eq!(config.clap_interval, 0.08);
        assert_eq!(config.trailing_run, TrailingRun::Keep);
        assert!(!config.include_seed_interval);

        let profiles = file.profiles();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "double");
        assert_eq!(profiles[0].params.threshold_bias, 5000.0);
        assert_eq!(profiles[0].params.highcut_hz, 3200.0);
        assert_eq!(profiles[0].trigger, Some(2));
        assert_eq!(profiles[1].params, DetectionParams::default());
        assert_eq!(profiles[1].trigger, None);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = ConfigFile::parse("").unwrap();
        assert_eq!(file.detector_config().unwrap(), DetectorConfig::default());
        assert_eq!(file.profiles(), vec![Profile::default()]);
    }

    #[test]
    fn test_bad_trailing_policy() {
        let file = ConfigFile::parse(r#"detector trailing-run="sometimes""#).unwrap();
        assert!(file.detector_config().is_err());
    }
}
