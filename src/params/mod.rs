//! Parameter definitions with physical units and documented semantics.
//!
//! All tunable numbers are extracted here with:
//! - Physical units (Hz, dB, seconds, pixels)
//! - Documented ranges and meanings
//! - A `validate()` per config so bad values fail at load time

mod analysis;
mod render;

// Re-export all types
pub use analysis::{
    AnalyserKind, BandpassConfig, CompressorConfig, PeakingConfig, SpectrogramConfig,
};
pub use render::{Color, RenderConfig, Rgba, SourceColors};
