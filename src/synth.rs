use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use crate::error::DetectorError;
use crate::filter::BandpassFilter;

const SHAPING_ORDER: usize = 2;

/// Layout of a synthetic clap track.
#[derive(Debug, Clone)]
pub struct SynthOptions {
    pub sample_rate: u32,
    /// Silence before the first clap, in seconds.
    pub lead: f64,
    /// Onset-to-onset spacing of claps inside one burst.
    pub clap_spacing: f64,
    /// Onset-to-onset spacing between the last clap of a burst and the next burst.
    pub burst_gap: f64,
    /// Silence after the last clap.
    pub tail: f64,
    pub amplitude: f64,
    /// Decay time constant of a clap, in seconds.
    pub decay: f64,
    /// Band the clap noise is shaped to before it is scaled to `amplitude`.
    pub clap_low_hz: f64,
    pub clap_high_hz: f64,
    pub noise_floor: f64,
    pub seed: u64,
}

impl Default for SynthOptions {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            lead: 1.0,
            clap_spacing: 0.05,
            burst_gap: 0.2,
            tail: 1.0,
            amplitude: 24000.0,
            decay: 0.004,
            clap_low_hz: 600.0,
            clap_high_hz: 2500.0,
            noise_floor: 30.0,
            seed: 7,
        }
    }
}

fn seconds(opts: &SynthOptions, s: f64) -> usize {
    (s.max(0.0) * opts.sample_rate as f64) as usize
}

/// Onset sample of every clap in `pattern`.
pub fn clap_onsets(pattern: &[u32], opts: &SynthOptions) -> Vec<usize> {
    let mut onsets = Vec::new();
    let mut at = seconds(opts, opts.lead);
    for (b, &count) in pattern.iter().enumerate() {
        if b > 0 {
            at += seconds(opts, opts.burst_gap);
        }
        for c in 0..count {
            if c > 0 {
                at += seconds(opts, opts.clap_spacing);
            }
            onsets.push(at);
        }
    }
    onsets
}

/// Renders `pattern` (claps per burst) as mono 16-bit PCM.
///
/// Each clap is exponentially decaying noise, band-limited to the clap band
/// and peaking at `amplitude`, laid over a low noise floor. Claps inside a
/// burst are `clap_spacing` apart, so a detector only separates them when
/// its debounce window is shorter than that.
pub fn synthesize(pattern: &[u32], opts: &SynthOptions) -> Result<Vec<i16>, DetectorError> {
    let mut shaping = BandpassFilter::design(SHAPING_ORDER, opts.clap_low_hz, opts.clap_high_hz, f64::from(opts.sample_rate))?;
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let onsets = clap_onsets(pattern, opts);
    let clap_len = seconds(opts, opts.decay * 8.0).max(1);
    let end = onsets.last().map(|&o| o + clap_len).unwrap_or_else(|| seconds(opts, opts.lead));
    let total = end + seconds(opts, opts.tail);

    let mut track: Vec<f64> = (0..total)
        .map(|_| opts.noise_floor * rng.gen_range(-1.0..=1.0))
        .collect();

    let decay_samples = (opts.decay * opts.sample_rate as f64).max(1.0);
    for &onset in &onsets {
        let noise: Vec<f64> = (0..clap_len.min(total - onset))
            .map(|i| (-(i as f64) / decay_samples).exp() * rng.gen_range(-1.0..=1.0))
            .collect();
        let clap = shaping.apply(&noise);
        let peak = clap.iter().fold(0.0f64, |m, x| m.max(x.abs()));
        if peak == 0.0 {
            continue;
        }
        for (slot, x) in track[onset..].iter_mut().zip(clap) {
            *slot += opts.amplitude * x / peak;
        }
    }

    Ok(track
        .into_iter()
        .map(|x| x.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16)
        .collect())
}
