//! Frequency analysers turning the filtered signal into byte magnitude frames.

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// dB range mapped onto 0..=255
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

/// End of the analysis chain: accepts time-domain samples, exposes magnitudes
pub trait FrequencyAnalyser: Send {
    /// Number of magnitude bins (half the transform size)
    fn frequency_bin_count(&self) -> usize;

    /// Feed filtered time-domain samples
    fn push_samples(&mut self, samples: &[f32]);

    /// Write current magnitudes into `out` (at most `frequency_bin_count` bytes)
    fn get_byte_frequency_data(&mut self, out: &mut [u8]);
}

/// Fixed-size history of the most recent samples
struct SampleRing {
    data: Vec<f32>,
    write_pos: usize,
}

impl SampleRing {
    fn new(size: usize) -> Self {
        Self {
            data: vec![0.0; size],
            write_pos: 0,
        }
    }

    fn push(&mut self, sample: f32) {
        self.data[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.data.len();
    }

    /// Oldest to newest
    fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.data[self.write_pos..]
            .iter()
            .chain(self.data[..self.write_pos].iter())
            .copied()
    }
}

/// Map a dB value onto a byte, saturating at both ends
fn db_to_byte(db: f32) -> u8 {
    if !db.is_finite() {
        return 0;
    }
    let scaled = (255.0 / (MAX_DECIBELS - MIN_DECIBELS)) * (db - MIN_DECIBELS);
    scaled.floor().clamp(0.0, 255.0) as u8
}

/// Blackman window (a = 0.16)
pub fn blackman_window(index: usize, size: usize) -> f32 {
    let x = 2.0 * PI * index as f32 / size as f32;
    0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
}

/// Gaussian window (alpha = 0.25)
pub fn gauss_window(index: usize, size: usize) -> f32 {
    let half = (size as f32 - 1.0) / 2.0;
    let t = (index as f32 - half) / (0.25 * half);
    (-0.5 * t * t).exp()
}

/// Analyser with browser analyser semantics
///
/// Each read windows the latest `fft_size` samples with a Blackman window,
/// averages magnitudes with the previous read by `smoothing`, and maps
/// [-100 dB, -30 dB] linearly onto 0..=255.
pub struct AnalyserNode {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    smoothing: f32,
    ring: SampleRing,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl AnalyserNode {
    pub fn new(fft_size: usize, smoothing: f32) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            fft,
            fft_size,
            smoothing: smoothing.clamp(0.0, 1.0),
            ring: SampleRing::new(fft_size),
            window: (0..fft_size).map(|i| blackman_window(i, fft_size)).collect(),
            smoothed: vec![0.0; fft_size / 2],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

impl FrequencyAnalyser for AnalyserNode {
    fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.ring.push(sample);
        }
    }

    fn get_byte_frequency_data(&mut self, out: &mut [u8]) {
        for ((slot, sample), w) in self.scratch.iter_mut().zip(self.ring.iter()).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let norm = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (k, prev) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() * norm;
            let next = tau * *prev + (1.0 - tau) * magnitude;
            *prev = if next.is_finite() { next } else { 0.0 };
        }

        for (byte, magnitude) in out.iter_mut().zip(&self.smoothed) {
            *byte = db_to_byte(20.0 * magnitude.log10());
        }
    }
}

/// Analyser running on a decimated signal
///
/// Every `rate` input samples are averaged into one, so the transform covers
/// 0..sample_rate / (2 * rate) with `rate` times finer resolution.
pub struct DownsampledAnalyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    rate: usize,
    pending: Vec<f32>,
    ring: SampleRing,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl DownsampledAnalyser {
    pub fn new(fft_size: usize, rate: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let rate = rate.max(1);
        Self {
            fft,
            fft_size,
            rate,
            pending: Vec::with_capacity(rate),
            ring: SampleRing::new(fft_size),
            window: (0..fft_size).map(|i| gauss_window(i, fft_size)).collect(),
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Effective sample rate of the transform input
    pub fn effective_rate(&self, sample_rate: f32) -> f32 {
        sample_rate / self.rate as f32
    }
}

impl FrequencyAnalyser for DownsampledAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    fn push_samples(&mut self, samples: &[f32]) {
        for &sample in samples {
            self.pending.push(sample);
            if self.pending.len() == self.rate {
                let mean = self.pending.iter().sum::<f32>() / self.rate as f32;
                self.ring.push(mean);
                self.pending.clear();
            }
        }
    }

    fn get_byte_frequency_data(&mut self, out: &mut [u8]) {
        for ((slot, sample), w) in self.scratch.iter_mut().zip(self.ring.iter()).zip(&self.window) {
            *slot = Complex::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        // Single-sided amplitude spectrum
        let scale = 2.0 / self.fft_size as f32;
        for (byte, bin) in out.iter_mut().zip(&self.scratch[..self.fft_size / 2]) {
            *byte = db_to_byte(20.0 * (bin.norm() * scale).log10());
        }
    }
}
