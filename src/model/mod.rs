//! Spectrogram model: input source state machine and sampling loop.
//!
//! The model owns the audio context and the host devices. It starts in
//! `Processing`, wires microphone, soundfile and filter chain in strict
//! order, then toggles into a real input. While an input is active it
//! samples the analyser once per animation frame and publishes each frame
//! as a `ModelEvent` for views to consume.

mod frames;
mod source;

pub use frames::{AnimationFrames, FrameHandle};
pub use source::Source;

use log::{debug, info, warn};
use std::collections::VecDeque;

use crate::audio::{AudioContext, AudioDevices, BiquadKind, BiquadParams, NodeId};
use crate::error::{Result, SonogramError};
use crate::params::SpectrogramConfig;

/// Notifications published by the model
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    MicrophoneReady,
    SoundfileLoaded,
    SoundfileReady,
    AudioGraphReady,
    SoundfileEnded,
    SourceExited(Source),
    SourceEntered(Source),
    StateChanged(Source),
    /// Emitted after every toggle, even when the source stayed the same
    SourceChanged(Source),
    SpectrogramUpdated { source: Source, frame: Vec<u8> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartupPhase {
    Idle,
    Running,
    Complete,
    Failed,
}

/// Source state machine driving the audio graph and the sampling loop
pub struct SpectrogramModel<D: AudioDevices> {
    config: SpectrogramConfig,
    devices: D,
    context: AudioContext,

    curr_state: Option<Source>,
    /// Soundfile is the active source and audio is running
    playing: bool,
    /// Startup has not finished wiring dependencies
    processing: bool,
    startup: StartupPhase,

    microphone_input: Option<NodeId>,
    soundfile_input: Option<NodeId>,
    analysis_input: Option<NodeId>,
    analysis_output: NodeId,

    frames: AnimationFrames,
    animation_id: Option<FrameHandle>,

    /// Raw analyser output
    data: Vec<u8>,
    /// Published frame (bins past `spectrogram_size` zeroed)
    spectrogram: Vec<u8>,

    events: VecDeque<ModelEvent>,
}

impl<D: AudioDevices> SpectrogramModel<D> {
    /// Create the model around an existing audio context
    pub fn new(config: SpectrogramConfig, mut context: AudioContext, devices: D) -> Result<Self> {
        config.validate()?;

        let analysis_output = context.create_analyser(
            config.analyser,
            config.fft_size,
            config.smoothing,
            config.downsample_rate,
        );
        let bins = config.frequency_bin_count();

        Ok(Self {
            config,
            devices,
            context,
            curr_state: None,
            playing: false,
            processing: false,
            startup: StartupPhase::Idle,
            microphone_input: None,
            soundfile_input: None,
            analysis_input: None,
            analysis_output,
            frames: AnimationFrames::default(),
            animation_id: None,
            data: vec![0; bins],
            spectrogram: vec![0; bins],
            events: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &SpectrogramConfig {
        &self.config
    }

    pub fn current_state(&self) -> Option<Source> {
        self.curr_state
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn is_sampling(&self) -> bool {
        self.animation_id.is_some()
    }

    /// Take all events published since the last call
    pub fn take_events(&mut self) -> Vec<ModelEvent> {
        self.events.drain(..).collect()
    }

    fn publish(&mut self, event: ModelEvent) {
        self.events.push_back(event);
    }

    // === Startup ===

    /// Run the startup chain once
    ///
    /// Each step needs the handle produced by the previous one; the first
    /// failure aborts the chain and is returned. The model then stays in
    /// `Processing` and cannot be started again.
    pub fn initialize(&mut self) -> Result<()> {
        if self.startup != StartupPhase::Idle {
            return Err(SonogramError::AlreadyInitialized);
        }
        self.startup = StartupPhase::Running;

        let result = self.run_startup();
        self.startup = match result {
            Ok(()) => StartupPhase::Complete,
            Err(_) => StartupPhase::Failed,
        };
        result
    }

    fn run_startup(&mut self) -> Result<()> {
        // Busy while audio resources are not ready
        self.transition_to(Source::Processing)?;

        self.initialize_microphone()?;
        self.initialize_soundfile()?;
        self.create_soundfile_node()?;
        self.initialize_audio_graph()?;

        self.input_toggle()
    }

    fn initialize_microphone(&mut self) -> Result<()> {
        let tap = self.devices.request_microphone()?;
        self.microphone_input = Some(self.context.create_input_node(tap));
        debug!("mic node created");
        self.publish(ModelEvent::MicrophoneReady);
        Ok(())
    }

    fn initialize_soundfile(&mut self) -> Result<()> {
        let path = self.config.soundfile_path.clone();
        self.devices.load_soundfile(&path)?;
        self.publish(ModelEvent::SoundfileLoaded);
        Ok(())
    }

    /// Bind the soundfile tap to its input node (reused across reloads)
    fn create_soundfile_node(&mut self) -> Result<()> {
        let tap = self.devices.soundfile_tap()?;
        match self.soundfile_input {
            Some(node) => self.context.rebind_input(node, tap)?,
            None => self.soundfile_input = Some(self.context.create_input_node(tap)),
        }
        self.publish(ModelEvent::SoundfileReady);
        Ok(())
    }

    /// input -> lowpass -> highpass -> peaking -> compressor -> analyser -> destination
    fn initialize_audio_graph(&mut self) -> Result<()> {
        let bandpass = self.config.bandpass.clone();
        let peaking = self.config.peaking.clone();

        let input = self.context.create_gain(1.0);
        let lowpass = self.context.create_biquad_filter(
            BiquadKind::Lowpass,
            BiquadParams {
                frequency_hz: bandpass.f_max_hz,
                q: bandpass.q_factor,
            },
        );
        let highpass = self.context.create_biquad_filter(
            BiquadKind::Highpass,
            BiquadParams {
                frequency_hz: bandpass.f_min_hz,
                q: bandpass.q_factor,
            },
        );
        let peak = self.context.create_biquad_filter(
            BiquadKind::Peaking {
                gain_db: peaking.gain_db,
            },
            BiquadParams {
                frequency_hz: peaking.frequency_hz,
                q: peaking.q_factor,
            },
        );
        let compressor = self
            .context
            .create_dynamics_compressor(&self.config.compressor);

        let chain = [input, lowpass, highpass, peak, compressor, self.analysis_output];
        for pair in chain.windows(2) {
            self.context.connect(pair[0], pair[1])?;
        }
        let destination = self.context.destination();
        self.context.connect(self.analysis_output, destination)?;

        self.analysis_input = Some(input);
        debug!("audio graph wired ({} nodes in chain)", chain.len());
        self.publish(ModelEvent::AudioGraphReady);
        Ok(())
    }

    // === State machine ===

    /// Leave the current source and enter `next`
    ///
    /// No-op when `next` is already active. The outgoing source's exit
    /// (sampling stopped, input disconnected) completes before `next`
    /// is entered. `next` only becomes the active source once its enter
    /// succeeded; on failure the previous source is restored.
    pub fn transition_to(&mut self, next: Source) -> Result<()> {
        if self.curr_state == Some(next) {
            return Ok(());
        }
        let previous = self.curr_state;
        if let Some(current) = previous {
            current.exit(self)?;
            self.publish(ModelEvent::SourceExited(current));
        }

        if let Err(err) = next.enter(self) {
            warn!("Entering {} failed: {}", next, err);
            self.curr_state = None;
            self.abandon(next);
            if let Some(previous) = previous {
                self.restore(previous);
            }
            return Err(err);
        }
        self.curr_state = Some(next);
        self.publish(ModelEvent::SourceEntered(next));

        info!("Input source: {}", next);
        self.publish(ModelEvent::StateChanged(next));
        Ok(())
    }

    /// Undo a partial enter (sampling stopped, input disconnected)
    fn abandon(&mut self, source: Source) {
        if let Err(err) = source.exit(self) {
            warn!("Cleaning up {} failed: {}", source, err);
        }
    }

    /// Re-enter the source that was active before a failed transition
    fn restore(&mut self, source: Source) {
        match source.enter(self) {
            Ok(()) => {
                self.curr_state = Some(source);
                self.publish(ModelEvent::SourceEntered(source));
                self.publish(ModelEvent::StateChanged(source));
            }
            Err(err) => {
                warn!("Restoring {} failed: {}", source, err);
                self.abandon(source);
            }
        }
    }

    /// Swap between soundfile and microphone
    pub fn input_toggle(&mut self) -> Result<()> {
        let next = Source::toggle_target(self.playing, self.processing);
        self.transition_to(next)?;
        self.publish(ModelEvent::SourceChanged(next));
        Ok(())
    }

    /// Check device notifications; reload and toggle when the soundfile ended
    ///
    /// An end reported after the user already switched away only rewinds
    /// the file, so the switch is not undone.
    pub fn poll_devices(&mut self) -> Result<()> {
        if self.devices.take_ended() {
            self.publish(ModelEvent::SoundfileEnded);
            self.reset_soundfile()?;
        }
        Ok(())
    }

    fn reset_soundfile(&mut self) -> Result<()> {
        info!("soundfile ended, reloading");
        self.initialize_soundfile()?;
        self.create_soundfile_node()?;
        if self.curr_state == Some(Source::Soundfile) {
            self.input_toggle()?;
        }
        Ok(())
    }

    // === Source actions ===

    fn analysis_input(&self) -> Result<NodeId> {
        self.analysis_input.ok_or(SonogramError::NotReady("audio graph"))
    }

    fn connect_microphone(&mut self) -> Result<()> {
        let input = self
            .microphone_input
            .ok_or(SonogramError::NotReady("microphone"))?;
        let target = self.analysis_input()?;
        self.context.connect(input, target)
    }

    fn disconnect_microphone(&mut self) -> Result<()> {
        match self.microphone_input {
            Some(input) => self.context.disconnect(input),
            None => Ok(()),
        }
    }

    fn connect_soundfile(&mut self) -> Result<()> {
        let input = self
            .soundfile_input
            .ok_or(SonogramError::NotReady("soundfile"))?;
        let target = self.analysis_input()?;
        let destination = self.context.destination();
        self.context.connect(input, target)?;
        self.context.connect(input, destination)?;
        self.devices.play()?;
        self.playing = true;
        Ok(())
    }

    fn disconnect_soundfile(&mut self) -> Result<()> {
        if let Some(input) = self.soundfile_input {
            self.context.disconnect(input)?;
        }
        self.devices.pause();
        self.playing = false;
        Ok(())
    }

    // === Sampling loop ===

    /// Schedule the per-frame sampling callback (at most one outstanding)
    pub fn start_sampling(&mut self) {
        self.stop_sampling();
        self.animation_id = Some(self.frames.request());
    }

    /// Cancel the pending sampling callback
    pub fn stop_sampling(&mut self) {
        if let Some(handle) = self.animation_id.take() {
            self.frames.cancel(handle);
        }
    }

    /// Advance one animation frame
    ///
    /// Pushes queued audio through the graph, then runs the sampling
    /// callback if one is still scheduled.
    pub fn animation_frame(&mut self) {
        self.context.process();
        for handle in self.frames.take_due() {
            if self.animation_id == Some(handle) {
                self.update_spectrogram();
            }
        }
    }

    fn update_spectrogram(&mut self) {
        if let Ok(analyser) = self.context.analyser_mut(self.analysis_output) {
            analyser.get_byte_frequency_data(&mut self.data);
        }

        let visible = self.config.spectrogram_size.min(self.data.len());
        self.spectrogram.copy_from_slice(&self.data);
        self.spectrogram[visible..].fill(0);

        if let Some(state) = self.curr_state {
            state.on_sample(self);
        }
        self.animation_id = Some(self.frames.request());
    }
}
