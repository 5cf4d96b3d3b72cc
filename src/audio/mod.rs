//! Audio capture, playback and frequency analysis.
//!
//! Device threads fill sample taps; the audio context pushes them through
//! the filter chain into an analyser on the event loop thread.

pub mod analyser;
mod device;
pub mod filters;
mod graph;
mod tap;

// Re-export public types
pub use analyser::{AnalyserNode, DownsampledAnalyser, FrequencyAnalyser};
pub use device::{AudioDevices, CpalDevices};
pub use filters::{BiquadKind, BiquadParams};
pub use graph::{AudioContext, NodeId};
pub use tap::SampleTap;
