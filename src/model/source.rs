//! Input sources and the actions bound to entering and leaving them.

use log::info;

use super::{ModelEvent, SpectrogramModel};
use crate::audio::AudioDevices;
use crate::error::Result;

/// Mutually exclusive operating mode of the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Microphone,
    Soundfile,
    /// Transient state while audio resources are being wired
    Processing,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Microphone, Source::Soundfile, Source::Processing];

    pub fn name(self) -> &'static str {
        match self {
            Source::Microphone => "microphone",
            Source::Soundfile => "soundfile",
            Source::Processing => "processing",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Source::Microphone => 0,
            Source::Soundfile => 1,
            Source::Processing => 2,
        }
    }

    /// Toggle rule: a playing soundfile or an unfinished startup hands over
    /// to the microphone, anything else switches to the soundfile.
    pub fn toggle_target(playing: bool, processing: bool) -> Source {
        if playing || processing {
            Source::Microphone
        } else {
            Source::Soundfile
        }
    }

    pub(super) fn enter<D: AudioDevices>(self, model: &mut SpectrogramModel<D>) -> Result<()> {
        match self {
            Source::Microphone => {
                model.connect_microphone()?;
                model.start_sampling();
            }
            Source::Soundfile => {
                model.connect_soundfile()?;
                model.start_sampling();
            }
            Source::Processing => {
                model.processing = true;
                info!("processing ...");
            }
        }
        Ok(())
    }

    /// Sampling always stops before the input is disconnected
    pub(super) fn exit<D: AudioDevices>(self, model: &mut SpectrogramModel<D>) -> Result<()> {
        match self {
            Source::Microphone => {
                model.stop_sampling();
                model.disconnect_microphone()?;
            }
            Source::Soundfile => {
                model.stop_sampling();
                model.disconnect_soundfile()?;
            }
            Source::Processing => {
                model.processing = false;
                info!("finished processing");
            }
        }
        Ok(())
    }

    /// Republish the latest frame tagged with this source
    pub(super) fn on_sample<D: AudioDevices>(self, model: &mut SpectrogramModel<D>) {
        if self == Source::Processing {
            return;
        }
        let frame = model.spectrogram.clone();
        model.publish(ModelEvent::SpectrogramUpdated {
            source: self,
            frame,
        });
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_decision_table() {
        assert_eq!(Source::toggle_target(false, false), Source::Soundfile);
        assert_eq!(Source::toggle_target(true, false), Source::Microphone);
        assert_eq!(Source::toggle_target(false, true), Source::Microphone);
        assert_eq!(Source::toggle_target(true, true), Source::Microphone);
    }

    #[test]
    fn test_names_and_indices() {
        let names: Vec<_> = Source::ALL.iter().map(|s| s.name()).collect();
        assert_eq!(names, ["microphone", "soundfile", "processing"]);
        for (i, source) in Source::ALL.iter().enumerate() {
            assert_eq!(source.index(), i);
        }
    }
}
