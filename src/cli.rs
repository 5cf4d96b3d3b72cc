//! Command-line argument parsing.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::params::{AnalyserKind, RenderConfig, SpectrogramConfig};

/// Analyser selection on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AnalyserArg {
    /// Windowed FFT with smoothing and byte mapping
    Builtin,
    /// Decimating analyser with Gaussian window
    Downsampled,
}

impl From<AnalyserArg> for AnalyserKind {
    fn from(arg: AnalyserArg) -> Self {
        match arg {
            AnalyserArg::Builtin => AnalyserKind::Builtin,
            AnalyserArg::Downsampled => AnalyserKind::Downsampled,
        }
    }
}

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "sonogram")]
#[command(about = "Live spectrogram of the microphone or a soundfile", long_about = None)]
pub struct Args {
    /// Soundfile to analyse when toggled (WAV)
    #[arg(long, value_name = "PATH", default_value = "audio/ma_short.wav")]
    pub soundfile: PathBuf,

    /// Transform size (power of 2)
    #[arg(long, value_name = "N", default_value = "2048")]
    pub fft_size: usize,

    /// Low bins kept in each frame; higher bins are zeroed
    #[arg(long, value_name = "BINS", default_value = "300")]
    pub spectrogram_size: usize,

    /// Averaging constant between frames (0..=1)
    #[arg(long, value_name = "FACTOR", default_value = "0.0")]
    pub smoothing: f32,

    /// Highpass corner frequency (Hz)
    #[arg(long, value_name = "HZ", default_value = "160")]
    pub f_min: f32,

    /// Lowpass corner frequency (Hz)
    #[arg(long, value_name = "HZ", default_value = "3400")]
    pub f_max: f32,

    /// Bandpass quality factor
    #[arg(long, value_name = "Q", default_value = "0.05")]
    pub q_factor: f32,

    /// Decimation factor for the downsampled analyser
    #[arg(long, value_name = "RATE", default_value = "4")]
    pub downsample_rate: usize,

    /// Frequency analyser implementation
    #[arg(long, value_enum, default_value = "builtin")]
    pub analyser: AnalyserArg,

    /// Columns per sweep before the strip is wiped
    #[arg(long, value_name = "COLUMNS", default_value = "500")]
    pub x_length: usize,

    /// Canvas and window width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "1000")]
    pub width: u32,

    /// Canvas and window height (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "512")]
    pub height: u32,

    /// Save the canvas as PNG on exit (S saves on demand)
    #[arg(long, value_name = "PATH")]
    pub screenshot: Option<PathBuf>,
}

impl Args {
    /// Build the analysis configuration from the arguments
    pub fn spectrogram_config(&self) -> SpectrogramConfig {
        let mut config = SpectrogramConfig {
            fft_size: self.fft_size,
            spectrogram_size: self.spectrogram_size,
            smoothing: self.smoothing,
            soundfile_path: self.soundfile.clone(),
            downsample_rate: self.downsample_rate,
            analyser: self.analyser.into(),
            ..Default::default()
        };
        config.bandpass.f_min_hz = self.f_min;
        config.bandpass.f_max_hz = self.f_max;
        config.bandpass.q_factor = self.q_factor;
        config
    }

    /// Build the render configuration from the arguments
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            window_width: self.width,
            window_height: self.height,
            canvas_width: self.width,
            canvas_height: self.height,
            x_length: self.x_length,
            ..Default::default()
        }
    }
}
