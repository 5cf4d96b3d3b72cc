//! Audio analysis configuration: transform size, filter chain and input asset.

use std::path::PathBuf;

use crate::error::{Result, SonogramError};

/// Which frequency analyser sits at the end of the filter chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyserKind {
    /// Byte frequency data with Blackman window, smoothing and dB mapping
    #[default]
    Builtin,

    /// Decimate by `downsample_rate`, Gaussian window, dB spectrum
    Downsampled,
}

/// Bandpass corner frequencies for the lowpass/highpass pair
#[derive(Debug, Clone)]
pub struct BandpassConfig {
    /// Highpass corner (Hz)
    pub f_min_hz: f32,

    /// Lowpass corner (Hz)
    pub f_max_hz: f32,

    /// Quality factor shared by both filters (dimensionless)
    pub q_factor: f32,
}

impl Default for BandpassConfig {
    fn default() -> Self {
        // Telephone band
        Self {
            f_min_hz: 160.0,
            f_max_hz: 3400.0,
            q_factor: 0.05,
        }
    }
}

/// Peaking filter emphasising the voice formant region
#[derive(Debug, Clone)]
pub struct PeakingConfig {
    /// Centre frequency (Hz)
    pub frequency_hz: f32,

    /// Quality factor (dimensionless)
    pub q_factor: f32,

    /// Boost at the centre frequency (dB)
    pub gain_db: f32,
}

impl Default for PeakingConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 750.0,
            q_factor: 0.16,
            gain_db: 4.3,
        }
    }
}

/// Dynamics compressor applied right before analysis
#[derive(Debug, Clone)]
pub struct CompressorConfig {
    /// Level above which gain reduction starts (dBFS)
    pub threshold_db: f32,

    /// Input/output slope above threshold
    pub ratio: f32,

    /// Time to reduce gain by 10 dB (seconds)
    pub attack_s: f32,

    /// Time to recover gain by 10 dB (seconds)
    pub release_s: f32,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            threshold_db: -12.0,
            ratio: 12.0,
            attack_s: 0.003,
            release_s: 0.25,
        }
    }
}

/// Spectrogram analysis configuration
#[derive(Debug, Clone)]
pub struct SpectrogramConfig {
    /// Transform window size (power of 2, 32..=32768)
    pub fft_size: usize,

    /// Number of low bins carrying data in each published frame.
    /// Bins above this index are zeroed.
    pub spectrogram_size: usize,

    /// Averaging constant between consecutive analyser frames (0..=1)
    pub smoothing: f32,

    pub bandpass: BandpassConfig,
    pub peaking: PeakingConfig,
    pub compressor: CompressorConfig,

    /// Soundfile asset (WAV)
    pub soundfile_path: PathBuf,

    /// Decimation factor for the downsampled analyser
    pub downsample_rate: usize,

    pub analyser: AnalyserKind,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            fft_size: 2048,
            spectrogram_size: 300,
            smoothing: 0.0,
            bandpass: BandpassConfig::default(),
            peaking: PeakingConfig::default(),
            compressor: CompressorConfig::default(),
            soundfile_path: PathBuf::from("audio/ma_short.wav"),
            downsample_rate: 4,
            analyser: AnalyserKind::Builtin,
        }
    }
}

impl SpectrogramConfig {
    /// Length of every magnitude frame (half the transform size)
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Validate configuration (FFT size must be power of 2, etc.)
    pub fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(SonogramError::InvalidConfig(format!(
                "FFT size must be a power of 2 in 32..=32768, got {}",
                self.fft_size
            )));
        }
        if self.spectrogram_size == 0 || self.spectrogram_size > self.frequency_bin_count() {
            return Err(SonogramError::InvalidConfig(format!(
                "spectrogram size must be in 1..={}, got {}",
                self.frequency_bin_count(),
                self.spectrogram_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(SonogramError::InvalidConfig(format!(
                "smoothing must be in [0, 1], got {}",
                self.smoothing
            )));
        }
        let bp = &self.bandpass;
        if !(bp.f_min_hz > 0.0 && bp.f_min_hz < bp.f_max_hz) {
            return Err(SonogramError::InvalidConfig(format!(
                "bandpass needs 0 < f_min < f_max, got {} / {}",
                bp.f_min_hz, bp.f_max_hz
            )));
        }
        if bp.q_factor <= 0.0 || self.peaking.q_factor <= 0.0 {
            return Err(SonogramError::InvalidConfig(
                "Q factors must be > 0".to_string(),
            ));
        }
        if self.compressor.ratio < 1.0 {
            return Err(SonogramError::InvalidConfig(format!(
                "compressor ratio must be >= 1, got {}",
                self.compressor.ratio
            )));
        }
        if self.downsample_rate == 0 || self.fft_size % self.downsample_rate != 0 {
            return Err(SonogramError::InvalidConfig(format!(
                "downsample rate must divide the FFT size, got {}",
                self.downsample_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SpectrogramConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frequency_bin_count(), 1024);
    }

    #[test]
    fn test_rejects_non_power_of_two_fft() {
        let config = SpectrogramConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SonogramError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_spectrogram_size_bounded_by_bin_count() {
        let mut config = SpectrogramConfig {
            fft_size: 512,
            ..Default::default()
        };
        // 300 > 256 bins
        assert!(config.validate().is_err());

        config.spectrogram_size = 256;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bandpass_order() {
        let mut config = SpectrogramConfig::default();
        config.bandpass.f_min_hz = 4000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_downsample_rate_must_divide_fft() {
        let mut config = SpectrogramConfig::default();
        config.downsample_rate = 3;
        assert!(config.validate().is_err());
        config.downsample_rate = 0;
        assert!(config.validate().is_err());
    }
}
