//! Filter chain nodes: biquad filters and a dynamics compressor.
//!
//! Biquad coefficients follow the RBJ audio EQ cookbook.

use std::f32::consts::PI;

use crate::params::CompressorConfig;

/// Biquad filter response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BiquadKind {
    Lowpass,
    Highpass,
    /// Bell boost/cut around the centre frequency (gain in dB)
    Peaking { gain_db: f32 },
}

/// Parameters for `AudioContext::create_biquad_filter`
#[derive(Debug, Clone, Copy)]
pub struct BiquadParams {
    pub frequency_hz: f32,
    pub q: f32,
}

/// Second-order IIR filter (transposed direct form II)
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    kind: BiquadKind,
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
    z1: f32,
    z2: f32,
}

impl BiquadFilter {
    pub fn new(kind: BiquadKind, params: BiquadParams, sample_rate: f32) -> Self {
        let mut filter = Self {
            kind,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            z1: 0.0,
            z2: 0.0,
        };
        filter.set_params(params, sample_rate);
        filter
    }

    /// Recompute coefficients (state is kept)
    pub fn set_params(&mut self, params: BiquadParams, sample_rate: f32) {
        // Keep the corner strictly inside (0, Nyquist)
        let frequency = params.frequency_hz.clamp(1.0, sample_rate * 0.49);
        let q = params.q.max(1e-4);

        let w0 = 2.0 * PI * frequency / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * q);

        let (b0, b1, b2, a0, a1, a2) = match self.kind {
            BiquadKind::Lowpass => (
                (1.0 - cos_w0) / 2.0,
                1.0 - cos_w0,
                (1.0 - cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            BiquadKind::Highpass => (
                (1.0 + cos_w0) / 2.0,
                -(1.0 + cos_w0),
                (1.0 + cos_w0) / 2.0,
                1.0 + alpha,
                -2.0 * cos_w0,
                1.0 - alpha,
            ),
            BiquadKind::Peaking { gain_db } => {
                let a = 10f32.powf(gain_db / 40.0);
                (
                    1.0 + alpha * a,
                    -2.0 * cos_w0,
                    1.0 - alpha * a,
                    1.0 + alpha / a,
                    -2.0 * cos_w0,
                    1.0 - alpha / a,
                )
            }
        };

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = a1 / a0;
        self.a2 = a2 / a0;
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }

    pub fn process(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

/// Feed-forward peak compressor
#[derive(Debug, Clone)]
pub struct DynamicsCompressor {
    threshold_db: f32,
    ratio: f32,
    attack_coef: f32,
    release_coef: f32,
    envelope: f32,
}

impl DynamicsCompressor {
    pub fn new(config: &CompressorConfig, sample_rate: f32) -> Self {
        Self {
            threshold_db: config.threshold_db,
            ratio: config.ratio.max(1.0),
            attack_coef: time_constant(config.attack_s, sample_rate),
            release_coef: time_constant(config.release_s, sample_rate),
            envelope: 0.0,
        }
    }

    /// Gain reduction currently applied (dB, <= 0)
    pub fn reduction_db(&self) -> f32 {
        let level_db = 20.0 * (self.envelope + 1e-9).log10();
        if level_db > self.threshold_db {
            (self.threshold_db - level_db) * (1.0 - 1.0 / self.ratio)
        } else {
            0.0
        }
    }

    #[inline]
    pub fn process_sample(&mut self, input: f32) -> f32 {
        let level = input.abs();
        let coef = if level > self.envelope {
            self.attack_coef
        } else {
            self.release_coef
        };
        self.envelope = coef * self.envelope + (1.0 - coef) * level;

        input * 10f32.powf(self.reduction_db() / 20.0)
    }

    pub fn process(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}

/// One-pole smoothing coefficient for a time constant in seconds
fn time_constant(seconds: f32, sample_rate: f32) -> f32 {
    if seconds <= 0.0 {
        return 0.0;
    }
    (-1.0 / (seconds * sample_rate)).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::PeakingConfig;

    const SR: f32 = 48_000.0;

    fn sine(freq: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / SR).sin())
            .collect()
    }

    fn rms(block: &[f32]) -> f32 {
        (block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32).sqrt()
    }

    #[test]
    fn test_lowpass_passes_dc_blocks_nyquist() {
        let params = BiquadParams {
            frequency_hz: 3400.0,
            q: 0.05,
        };

        let mut lp = BiquadFilter::new(BiquadKind::Lowpass, params, SR);
        let mut dc = vec![1.0; 4800];
        lp.process(&mut dc);
        assert!((dc[4799] - 1.0).abs() < 0.01);

        let mut lp = BiquadFilter::new(BiquadKind::Lowpass, params, SR);
        let mut alternating: Vec<f32> = (0..4800)
            .map(|i| if i % 2 == 0 { 1.0 } else { -1.0 })
            .collect();
        lp.process(&mut alternating);
        assert!(rms(&alternating[4000..]) < 0.01);
    }

    #[test]
    fn test_highpass_blocks_dc() {
        let params = BiquadParams {
            frequency_hz: 160.0,
            q: 0.05,
        };
        let mut hp = BiquadFilter::new(BiquadKind::Highpass, params, SR);
        let mut dc = vec![1.0; 48_000];
        hp.process(&mut dc);
        assert!(dc[47_999].abs() < 0.01);
    }

    #[test]
    fn test_peaking_boosts_centre() {
        let config = PeakingConfig::default();
        let mut peak = BiquadFilter::new(
            BiquadKind::Peaking {
                gain_db: config.gain_db,
            },
            BiquadParams {
                frequency_hz: config.frequency_hz,
                q: config.q_factor,
            },
            SR,
        );

        let input = sine(config.frequency_hz, 48_000);
        let mut output = input.clone();
        peak.process(&mut output);

        let gain = rms(&output[24_000..]) / rms(&input[24_000..]);
        let expected = 10f32.powf(config.gain_db / 20.0);
        assert!((gain - expected).abs() < 0.05, "gain {gain}");
    }

    #[test]
    fn test_compressor_reduces_loud_signal() {
        let mut comp = DynamicsCompressor::new(&CompressorConfig::default(), SR);
        let mut loud = vec![1.0; 4800];
        comp.process(&mut loud);

        // 0 dBFS, threshold -12, ratio 12 => about -11 dB
        let expected = 10f32.powf(-11.0 / 20.0);
        assert!((loud[4799] - expected).abs() < 0.02, "got {}", loud[4799]);
    }

    #[test]
    fn test_compressor_leaves_quiet_signal() {
        let mut comp = DynamicsCompressor::new(&CompressorConfig::default(), SR);
        let mut quiet = vec![0.01; 4800];
        comp.process(&mut quiet);
        assert_eq!(comp.reduction_db(), 0.0);
        assert!((quiet[4799] - 0.01).abs() < 1e-6);
    }
}
