//! Sonogram library - live spectrogram of microphone or soundfile input

pub mod audio;
pub mod cli;
pub mod error;
pub mod model;
pub mod params;
pub mod rendering;
pub mod view;
