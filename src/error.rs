//! Error types for startup, audio devices, the audio graph and rendering.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to the embedding application
#[derive(Error, Debug)]
pub enum SonogramError {
    /// No capture device, or the host refused access to it
    #[error("Microphone unavailable: {0}")]
    MicrophoneUnavailable(String),

    /// No playback device for the soundfile
    #[error("No audio output device found")]
    NoOutputDevice,

    #[error("Failed to query device config: {0}")]
    DeviceConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("Failed to build audio stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    /// Soundfile missing or not decodable
    #[error("Failed to load soundfile {path}: {source}")]
    Soundfile {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },

    #[error("Unsupported soundfile {path}: {reason}")]
    UnsupportedSoundfile { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Startup was requested a second time
    #[error("Startup already ran")]
    AlreadyInitialized,

    /// A step ran before the handle it depends on existed
    #[error("{0} is not ready")]
    NotReady(&'static str),

    #[error("Unknown audio node {0}")]
    UnknownNode(usize),

    #[error("Connecting node {from} to {to} would create a cycle")]
    GraphCycle { from: usize, to: usize },

    #[error("Magnitude frame has {actual} bins, expected {expected}")]
    FrameLength { expected: usize, actual: usize },

    #[error("Render error: {0}")]
    Render(String),

    #[error("Image export failed: {0}")]
    Image(#[from] image::ImageError),
}

/// Result type for sonogram operations
pub type Result<T> = std::result::Result<T, SonogramError>;
