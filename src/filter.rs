use biquad::{Biquad, Coefficients, DirectForm1};
use rustfft::num_complex::Complex;
use std::f64::consts::PI;
use crate::error::DetectorError;

pub const DEFAULT_ORDER: usize = 5;

fn unit_section(a1: f64, a2: f64) -> Coefficients<f64> {
    // one zero at DC and one at Nyquist per section
    Coefficients { a1, a2, b0: 1.0, b1: 0.0, b2: -1.0 }
}

fn section_response(c: &Coefficients<f64>, z_inv: Complex<f64>) -> Complex<f64> {
    let num = c.b0 + z_inv * c.b1 + z_inv * z_inv * c.b2;
    let den = 1.0 + z_inv * c.a1 + z_inv * z_inv * c.a2;
    num / den
}

/// Butterworth band-pass of the given order as `order` second-order sections.
///
/// Band edges are pre-warped for the bilinear transform and the cascade is
/// normalised to unity gain at the geometric band centre.
pub fn butterworth_bandpass(order: usize, low_hz: f64, high_hz: f64, fs: f64) -> Result<Vec<Coefficients<f64>>, DetectorError> {
    if order == 0 {
        return Err(DetectorError::config("filter order must be at least 1"));
    }
    if !(fs.is_finite() && fs > 0.0) {
        return Err(DetectorError::config(format!("invalid sample rate {}", fs)));
    }
    let nyquist = fs / 2.0;
    if !(low_hz.is_finite() && high_hz.is_finite() && 0.0 < low_hz && low_hz < high_hz && high_hz < nyquist) {
        return Err(DetectorError::config(format!(
            "band [{}, {}] Hz must satisfy 0 < low < high < {}", low_hz, high_hz, nyquist
        )));
    }

    let fs2 = 2.0 * fs;
    let wl = fs2 * (PI * low_hz / fs).tan();
    let wh = fs2 * (PI * high_hz / fs).tan();
    let bw = wh - wl;
    let w0_sq = wl * wh;
    let to_z = |s: Complex<f64>| (Complex::new(fs2, 0.0) + s) / (Complex::new(fs2, 0.0) - s);

    let mut sections = Vec::with_capacity(order);
    let n = order as i32;
    // upper half-plane prototype poles, plus the real pole for odd orders
    for m in ((1 - n)..=0).step_by(2) {
        let p = -Complex::from_polar(1.0, PI * m as f64 / (2.0 * order as f64));
        let half = p * (bw / 2.0);
        let root = (half * half - w0_sq).sqrt();
        let (s1, s2) = (half + root, half - root);
        if m == 0 {
            let (z1, z2) = (to_z(s1), to_z(s2));
            sections.push(unit_section(-(z1 + z2).re, (z1 * z2).re));
        } else {
            for s in [s1, s2] {
                let z = to_z(s);
                sections.push(unit_section(-2.0 * z.re, z.norm_sqr()));
            }
        }
    }

    let center = 2.0 * (w0_sq.sqrt() / fs2).atan();
    let z_inv = Complex::from_polar(1.0, -center);
    let magnitude = sections
        .iter()
        .fold(Complex::new(1.0, 0.0), |acc, c| acc * section_response(c, z_inv))
        .norm();
    let gain = (1.0 / magnitude).powf(1.0 / order as f64);
    for c in sections.iter_mut() {
        c.b0 *= gain;
        c.b2 *= gain;
    }

    Ok(sections)
}

/// Band-pass filter restricting frames to the clap band.
///
/// `apply` clears the section history first, so each frame is filtered as
/// if it were the whole signal. `process` keeps the history running.
pub struct BandpassFilter {
    order: usize,
    low_hz: f64,
    high_hz: f64,
    fs: f64,
    coefficients: Vec<Coefficients<f64>>,
    stages: Vec<DirectForm1<f64>>,
}

impl BandpassFilter {
    pub fn design(order: usize, low_hz: f64, high_hz: f64, fs: f64) -> Result<Self, DetectorError> {
        let coefficients = butterworth_bandpass(order, low_hz, high_hz, fs)?;
        let stages = coefficients.iter().map(|c| DirectForm1::<f64>::new(*c)).collect();
        Ok(Self { order, low_hz, high_hz, fs, coefficients, stages })
    }

    pub fn matches(&self, order: usize, low_hz: f64, high_hz: f64, fs: f64) -> bool {
        self.order == order && self.low_hz == low_hz && self.high_hz == high_hz && self.fs == fs
    }

    pub fn reset(&mut self) {
        self.stages.iter_mut().for_each(|s| s.reset_state());
    }

    pub fn process(&mut self, frame: &[f64]) -> Vec<f64> {
        frame
            .iter()
            .map(|&x| self.stages.iter_mut().fold(x, |acc, stage| stage.run(acc)))
            .collect()
    }

    pub fn apply(&mut self, frame: &[f64]) -> Vec<f64> {
        self.reset();
        self.process(frame)
    }

    /// Magnitude response at `freq_hz`.
    pub fn gain_at(&self, freq_hz: f64) -> f64 {
        let z_inv = Complex::from_polar(1.0, -2.0 * PI * freq_hz / self.fs);
        self.coefficients
            .iter()
            .fold(Complex::new(1.0, 0.0), |acc, c| acc * section_response(c, z_inv))
            .norm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustfft::FftPlanner;

    const FS: f64 = 48000.0;

    fn sine(freq: f64, amplitude: f64, len: usize) -> Vec<f64> {
        (0..len).map(|i| amplitude * (2.0 * PI * freq * i as f64 / FS).sin()).collect()
    }

    fn steady_peak(signal: &[f64]) -> f64 {
        signal[signal.len() / 2..].iter().fold(0.0f64, |m, x| m.max(x.abs()))
    }

    #[test]
    fn test_design_produces_order_sections() {
        assert_eq!(butterworth_bandpass(5, 100.0, 4000.0, FS).unwrap().len(), 5);
        assert_eq!(butterworth_bandpass(4, 200.0, 3200.0, FS).unwrap().len(), 4);
        assert_eq!(butterworth_bandpass(1, 1600.0, 2300.0, FS).unwrap().len(), 1);
    }

    #[test]
    fn test_design_rejects_bad_band() {
        assert!(butterworth_bandpass(5, 4000.0, 100.0, FS).is_err());
        assert!(butterworth_bandpass(5, 0.0, 4000.0, FS).is_err());
        assert!(butterworth_bandpass(5, 100.0, 24000.0, FS).is_err());
        assert!(butterworth_bandpass(0, 100.0, 4000.0, FS).is_err());
        assert!(butterworth_bandpass(5, f64::NAN, 4000.0, FS).is_err());
    }

    #[test]
    fn test_stable_poles() {
        for c in butterworth_bandpass(5, 100.0, 4000.0, FS).unwrap() {
            // poles inside the unit circle
            assert!(c.a2.abs() < 1.0);
            assert!(c.a1.abs() < 1.0 + c.a2);
        }
    }

    #[test]
    fn test_impulse_response_spectrum() {
        let n = FS as usize;
        let mut filter = BandpassFilter::design(DEFAULT_ORDER, 100.0, 4000.0, FS).unwrap();
        let mut impulse = vec![0.0; n];
        impulse[0] = 1.0;
        let response = filter.apply(&impulse);

        let mut buf: Vec<Complex<f64>> = response.iter().map(|&x| Complex::new(x, 0.0)).collect();
        FftPlanner::new().plan_fft_forward(n).process(&mut buf);
        // 1 Hz per bin
        let mag = |hz: usize| buf[hz].norm();

        assert!((mag(640) - 1.0).abs() < 0.02, "centre gain {}", mag(640));
        assert!((mag(1000) - 1.0).abs() < 0.05);
        assert!((mag(100) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.02, "low edge {}", mag(100));
        assert!((mag(4000) - std::f64::consts::FRAC_1_SQRT_2).abs() < 0.02, "high edge {}", mag(4000));
        assert!(mag(20) < 0.01);
        assert!(mag(12000) < 0.01);
        assert!((filter.gain_at(1000.0) - mag(1000)).abs() < 1e-3);
    }

    #[test]
    fn test_passes_in_band_tone() {
        let mut filter = BandpassFilter::design(DEFAULT_ORDER, 100.0, 4000.0, FS).unwrap();
        let out = filter.apply(&sine(1000.0, 10000.0, 4800));
        assert_eq!(out.len(), 4800);
        let peak = steady_peak(&out);
        assert!((peak - 10000.0).abs() < 500.0, "peak {}", peak);
    }

    #[test]
    fn test_rejects_out_of_band_tone() {
        let mut filter = BandpassFilter::design(DEFAULT_ORDER, 100.0, 4000.0, FS).unwrap();
        assert!(steady_peak(&filter.apply(&sine(12000.0, 10000.0, 4800))) < 100.0);
        assert!(steady_peak(&filter.apply(&sine(15.0, 10000.0, 48000))) < 100.0);
    }

    #[test]
    fn test_apply_is_stateless() {
        let mut filter = BandpassFilter::design(DEFAULT_ORDER, 100.0, 4000.0, FS).unwrap();
        let frame = sine(800.0, 5000.0, 2048);
        let first = filter.apply(&frame);
        let second = filter.apply(&frame);
        assert_eq!(first, second);

        let carried = filter.process(&frame);
        assert_ne!(first, carried);
    }
}
