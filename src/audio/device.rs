//! Capture and playback devices: microphone stream and soundfile player.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use log::{error, info, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::tap::SampleTap;
use crate::error::{Result, SonogramError};

/// Host-side collaborators the model drives during startup and switching
pub trait AudioDevices {
    /// Sample rate shared by the audio context and both sources (Hz)
    fn sample_rate(&self) -> u32;

    /// Open the capture device; samples arrive on the returned tap
    fn request_microphone(&mut self) -> Result<SampleTap>;

    /// Decode the soundfile asset; `Ok` means it can play
    fn load_soundfile(&mut self, path: &Path) -> Result<()>;

    /// New tap mirroring whatever the loaded soundfile plays
    fn soundfile_tap(&mut self) -> Result<SampleTap>;

    /// Start or resume soundfile playback
    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    /// True once per time the soundfile reached its end
    fn take_ended(&mut self) -> bool;
}

/// Decoded soundfile plus playback cursor (shared with the output callback)
struct Playback {
    /// Interleaved samples
    samples: Vec<f32>,
    channels: usize,
    /// Read position in source frames
    position: f64,
    /// Source frames advanced per output frame
    step: f64,
    playing: bool,
    tap: Option<SampleTap>,
}

impl Playback {
    fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }

    /// Fill one interleaved output buffer, returning true when the file ended
    fn render(&mut self, data: &mut [f32], out_channels: usize) -> bool {
        if !self.playing {
            data.iter_mut().for_each(|s| *s = 0.0);
            return false;
        }

        let mut mono = Vec::with_capacity(data.len() / out_channels.max(1));
        let mut ended = false;
        for frame in data.chunks_mut(out_channels.max(1)) {
            let index = self.position as usize;
            if index >= self.frames() {
                frame.iter_mut().for_each(|s| *s = 0.0);
                ended = true;
                continue;
            }
            let base = index * self.channels;
            let source = &self.samples[base..base + self.channels];
            for (c, out) in frame.iter_mut().enumerate() {
                *out = source[c % self.channels];
            }
            mono.push(source.iter().sum::<f32>() / self.channels as f32);
            self.position += self.step;
        }

        if let Some(tap) = &self.tap {
            tap.push_slice(&mono);
        }
        if ended {
            self.playing = false;
        }
        ended
    }
}

/// Read a WAV file into interleaved f32 samples
fn read_wav(path: &Path) -> Result<(Vec<f32>, usize, u32)> {
    let to_error = |source| SonogramError::Soundfile {
        path: path.to_path_buf(),
        source,
    };
    let reader = hound::WavReader::open(path).map_err(to_error)?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(to_error)?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(to_error)?
        }
    };

    if spec.channels == 0 || samples.is_empty() {
        return Err(SonogramError::UnsupportedSoundfile {
            path: path.to_path_buf(),
            reason: "no audio frames".to_string(),
        });
    }
    Ok((samples, spec.channels as usize, spec.sample_rate))
}

/// `cpal` + `hound` implementation of `AudioDevices`
pub struct CpalDevices {
    host: cpal::Host,
    output: cpal::Device,
    output_config: cpal::StreamConfig,
    microphone: Option<cpal::Stream>,
    playback: Arc<Mutex<Playback>>,
    ended: Arc<AtomicBool>,
    /// Output stream (kept alive)
    player: Option<cpal::Stream>,
}

impl CpalDevices {
    /// Open the default output device; the microphone is opened on request
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let output = host
            .default_output_device()
            .ok_or(SonogramError::NoOutputDevice)?;
        let output_config: cpal::StreamConfig = output.default_output_config()?.into();

        info!(
            "Audio output: {} @ {}Hz",
            output.name().unwrap_or_else(|_| "Unknown".to_string()),
            output_config.sample_rate.0
        );

        Ok(Self {
            host,
            output,
            output_config,
            microphone: None,
            playback: Arc::new(Mutex::new(Playback {
                samples: Vec::new(),
                channels: 1,
                position: 0.0,
                step: 1.0,
                playing: false,
                tap: None,
            })),
            ended: Arc::new(AtomicBool::new(false)),
            player: None,
        })
    }

    fn build_player(&self) -> Result<cpal::Stream> {
        let playback = Arc::clone(&self.playback);
        let ended = Arc::clone(&self.ended);
        let channels = self.output_config.channels as usize;

        let stream = self.output.build_output_stream(
            &self.output_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let Ok(mut playback) = playback.lock() else {
                    return;
                };
                if playback.render(data, channels) {
                    ended.store(true, Ordering::Release);
                }
            },
            |err| error!("Audio output stream error: {}", err),
            None,
        )?;
        stream.play()?;
        Ok(stream)
    }

    fn lock_playback(&self) -> std::sync::MutexGuard<'_, Playback> {
        // The callback never panics while holding the lock
        self.playback
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Mix interleaved frames down to mono and push them into the tap
fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    tap: SampleTap,
) -> Result<cpal::Stream>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels.max(1) as usize;
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let mono: Vec<f32> = data
                .chunks(channels)
                .map(|frame| {
                    frame.iter().map(|s| s.to_sample::<f32>()).sum::<f32>() / channels as f32
                })
                .collect();
            tap.push_slice(&mono);
        },
        |err| error!("Microphone stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

impl AudioDevices for CpalDevices {
    fn sample_rate(&self) -> u32 {
        self.output_config.sample_rate.0
    }

    fn request_microphone(&mut self) -> Result<SampleTap> {
        let device = self.host.default_input_device().ok_or_else(|| {
            SonogramError::MicrophoneUnavailable("no input device found".to_string())
        })?;
        let supported = device
            .default_input_config()
            .map_err(|e| SonogramError::MicrophoneUnavailable(e.to_string()))?;

        if supported.sample_rate() != self.output_config.sample_rate {
            warn!(
                "Microphone runs at {}Hz, analysis assumes {}Hz",
                supported.sample_rate().0,
                self.output_config.sample_rate.0
            );
        }
        info!(
            "Audio input: {} @ {}Hz",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            supported.sample_rate().0
        );

        let tap = SampleTap::default();
        let format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();
        let stream = match format {
            SampleFormat::F32 => build_input_stream::<f32>(&device, &config, tap.clone())?,
            SampleFormat::I16 => build_input_stream::<i16>(&device, &config, tap.clone())?,
            SampleFormat::U16 => build_input_stream::<u16>(&device, &config, tap.clone())?,
            other => {
                return Err(SonogramError::MicrophoneUnavailable(format!(
                    "unsupported sample format {:?}",
                    other
                )))
            }
        };
        stream.play()?;

        self.microphone = Some(stream);
        Ok(tap)
    }

    fn load_soundfile(&mut self, path: &Path) -> Result<()> {
        let (samples, channels, rate) = read_wav(path)?;
        info!(
            "Soundfile: {} ({} ch @ {}Hz, {} frames)",
            path.display(),
            channels,
            rate,
            samples.len() / channels
        );

        {
            let mut playback = self.lock_playback();
            playback.samples = samples;
            playback.channels = channels;
            playback.position = 0.0;
            playback.step = rate as f64 / self.output_config.sample_rate.0 as f64;
            playback.playing = false;
            playback.tap = None;
        }
        self.ended.store(false, Ordering::Release);

        if self.player.is_none() {
            self.player = Some(self.build_player()?);
        }
        Ok(())
    }

    fn soundfile_tap(&mut self) -> Result<SampleTap> {
        let mut playback = self.lock_playback();
        if playback.samples.is_empty() {
            return Err(SonogramError::NotReady("soundfile"));
        }
        let tap = SampleTap::default();
        playback.tap = Some(tap.clone());
        Ok(tap)
    }

    fn play(&mut self) -> Result<()> {
        let mut playback = self.lock_playback();
        if playback.samples.is_empty() {
            return Err(SonogramError::NotReady("soundfile"));
        }
        playback.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.lock_playback().playing = false;
    }

    fn take_ended(&mut self) -> bool {
        self.ended.swap(false, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_playback(frames: usize) -> Playback {
        let samples = (0..frames)
            .flat_map(|i| [i as f32, -(i as f32)])
            .collect();
        Playback {
            samples,
            channels: 2,
            position: 0.0,
            step: 1.0,
            playing: true,
            tap: None,
        }
    }

    #[test]
    fn test_paused_playback_outputs_silence() {
        let mut playback = stereo_playback(8);
        playback.playing = false;
        let mut data = vec![1.0; 8];
        assert!(!playback.render(&mut data, 2));
        assert!(data.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_playback_mirrors_mono_into_tap() {
        let mut playback = stereo_playback(8);
        let tap = SampleTap::default();
        playback.tap = Some(tap.clone());

        let mut data = vec![0.0; 8];
        playback.render(&mut data, 2);

        assert_eq!(data, vec![0.0, -0.0, 1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
        assert_eq!(tap.drain(), vec![0.0; 4]);
    }

    #[test]
    fn test_playback_reports_end_once_exhausted() {
        let mut playback = stereo_playback(3);
        let mut data = vec![0.0; 8];
        assert!(playback.render(&mut data, 2));
        assert!(!playback.playing);
        assert_eq!(&data[6..], &[0.0, 0.0]);
    }

    #[test]
    fn test_missing_soundfile_is_an_error() {
        let err = read_wav(Path::new("does/not/exist.wav")).unwrap_err();
        assert!(matches!(err, SonogramError::Soundfile { .. }));
    }

    #[test]
    fn test_read_wav_normalises_ints() {
        let path = std::env::temp_dir().join("sonogram_read_wav_test.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(i16::MAX).unwrap();
        writer.write_sample(0i16).unwrap();
        writer.write_sample(i16::MIN).unwrap();
        writer.finalize().unwrap();

        let (samples, channels, rate) = read_wav(&path).unwrap();
        assert_eq!((channels, rate), (1, 8000));
        assert!((samples[0] - 1.0).abs() < 1e-3);
        assert_eq!(samples[1], 0.0);
        assert_eq!(samples[2], -1.0);

        let _ = std::fs::remove_file(path);
    }
}
