//! Spectrogram view: paints magnitude frames as a sweeping strip.
//!
//! Each accepted frame becomes one column of stacked rectangles, lowest
//! bin at the bottom. The column advances by `width / x_length`; once the
//! sweep passes `x_length` the surface is wiped and drawing restarts at
//! the left edge.

mod canvas;

pub use canvas::{PixelCanvas, Surface};

use log::{debug, warn};

use crate::error::{Result, SonogramError};
use crate::model::{ModelEvent, Source};
use crate::params::{Color, RenderConfig, SourceColors};

/// Opacity multiplier applied to normalized magnitudes (result is clamped)
const ALPHA_GAIN: f32 = 4.0;

/// Consumer of model frames drawing onto a `Surface`
pub struct SpectrogramView {
    colors: SourceColors,
    drawing_color: Option<Color>,
    /// Expected frame length
    bins: usize,
    x_length: usize,
    /// Scroll counter (0..=x_length)
    count: usize,
}

impl SpectrogramView {
    pub fn new(config: &RenderConfig, bins: usize) -> Self {
        Self {
            colors: config.colors.clone(),
            drawing_color: None,
            bins,
            x_length: config.x_length,
            count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn drawing_color(&self) -> Option<Color> {
        self.drawing_color
    }

    /// Pick up the color registered for the newly active source
    pub fn change_color(&mut self, source: Source) {
        self.drawing_color = self.colors.for_source(source);
        debug!("drawing color for {}: {:?}", source, self.drawing_color);
    }

    /// Route a model notification to the matching view action
    pub fn handle_event<S: Surface>(
        &mut self,
        event: &ModelEvent,
        playing: bool,
        surface: &mut S,
    ) -> Result<()> {
        match event {
            ModelEvent::SourceChanged(source) | ModelEvent::StateChanged(source) => {
                self.change_color(*source);
                Ok(())
            }
            ModelEvent::SpectrogramUpdated { frame, .. } => self.update(frame, playing, surface),
            _ => Ok(()),
        }
    }

    /// Draw one frame as the next column
    ///
    /// Frames are dropped while nothing is playing. A frame longer than
    /// the bin count is truncated; a shorter one is rejected.
    pub fn update<S: Surface>(&mut self, frame: &[u8], playing: bool, surface: &mut S) -> Result<()> {
        if !playing {
            return Ok(());
        }
        if frame.len() < self.bins {
            return Err(SonogramError::FrameLength {
                expected: self.bins,
                actual: frame.len(),
            });
        }
        if frame.len() > self.bins {
            warn!(
                "Truncating frame from {} to {} bins",
                frame.len(),
                self.bins
            );
        }
        let frame = &frame[..self.bins];

        self.count += 1;

        let width = surface.width() as f32;
        let height = surface.height() as f32;
        let column_width = width / self.x_length as f32;
        let x = self.count as f32 * column_width;
        let bar_height = height / frame.len() as f32;

        if let Some(color) = self.drawing_color {
            for (i, &sample) in frame.iter().enumerate() {
                let alpha = sample as f32 / 255.0 * ALPHA_GAIN;
                let y = height - (i + 1) as f32 * bar_height;
                surface.fill_rect(x, y, column_width, bar_height, color.with_alpha(alpha));
            }
        }

        if self.count > self.x_length {
            surface.clear_rect(0.0, 0.0, width, height);
            self.count = 0;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Rgba;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Fill { x: f32, y: f32, w: f32, h: f32, color: Rgba },
        Clear,
    }

    struct RecordingSurface {
        width: u32,
        height: u32,
        calls: Vec<Call>,
    }

    impl RecordingSurface {
        fn new() -> Self {
            Self {
                width: 1000,
                height: 512,
                calls: Vec::new(),
            }
        }

        fn fills(&self) -> Vec<&Call> {
            self.calls
                .iter()
                .filter(|c| matches!(c, Call::Fill { .. }))
                .collect()
        }

        fn clears(&self) -> usize {
            self.calls.iter().filter(|c| **c == Call::Clear).count()
        }
    }

    impl Surface for RecordingSurface {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
            self.calls.push(Call::Fill { x, y, w, h, color });
        }

        fn clear_rect(&mut self, _x: f32, _y: f32, _w: f32, _h: f32) {
            self.calls.push(Call::Clear);
        }
    }

    fn view(bins: usize) -> SpectrogramView {
        let mut view = SpectrogramView::new(&RenderConfig::default(), bins);
        view.change_color(Source::Soundfile);
        view
    }

    #[test]
    fn test_paused_update_is_noop() {
        let mut view = view(4);
        let mut surface = RecordingSurface::new();
        view.update(&[255; 4], false, &mut surface).unwrap();
        assert_eq!(view.count(), 0);
        assert!(surface.calls.is_empty());
    }

    #[test]
    fn test_one_rect_per_bin_bottom_to_top() {
        let mut view = view(4);
        let mut surface = RecordingSurface::new();
        view.update(&[0, 32, 64, 255], true, &mut surface).unwrap();

        let fills = surface.fills();
        assert_eq!(fills.len(), 4);
        assert_eq!(view.count(), 1);

        let Call::Fill { x, y, w, h, color } = fills[0] else {
            unreachable!()
        };
        assert_eq!((*x, *w, *h), (2.0, 2.0, 128.0));
        assert_eq!(*y, 384.0);
        assert_eq!(color.a, 0.0);

        let Call::Fill { y, color, .. } = fills[3] else {
            unreachable!()
        };
        assert_eq!(*y, 0.0);
        assert_eq!((color.r, color.g, color.b), (0, 255, 0));
    }

    #[test]
    fn test_alpha_is_clamped() {
        let mut view = view(2);
        let mut surface = RecordingSurface::new();
        view.update(&[32, 200], true, &mut surface).unwrap();

        let alphas: Vec<f32> = surface
            .fills()
            .iter()
            .map(|c| match c {
                Call::Fill { color, .. } => color.a,
                Call::Clear => unreachable!(),
            })
            .collect();
        assert!((alphas[0] - 32.0 / 255.0 * 4.0).abs() < 1e-6);
        assert_eq!(alphas[1], 1.0);
    }

    #[test]
    fn test_wipe_after_x_length_plus_one_frames() {
        let config = RenderConfig {
            x_length: 5,
            ..Default::default()
        };
        let mut view = SpectrogramView::new(&config, 2);
        view.change_color(Source::Microphone);
        let mut surface = RecordingSurface::new();

        for _ in 0..5 {
            view.update(&[10, 10], true, &mut surface).unwrap();
        }
        assert_eq!(view.count(), 5);
        assert_eq!(surface.clears(), 0);

        view.update(&[10, 10], true, &mut surface).unwrap();
        assert_eq!(view.count(), 0);
        assert_eq!(surface.clears(), 1);
        assert_eq!(surface.calls.last(), Some(&Call::Clear));
    }

    #[test]
    fn test_short_frame_rejected_long_frame_truncated() {
        let mut view = view(1024);
        let mut surface = RecordingSurface::new();

        let err = view.update(&[0; 300], true, &mut surface).unwrap_err();
        assert!(matches!(
            err,
            SonogramError::FrameLength {
                expected: 1024,
                actual: 300
            }
        ));
        assert_eq!(view.count(), 0);

        view.update(&[0; 2048], true, &mut surface).unwrap();
        assert_eq!(surface.fills().len(), 1024);
    }

    #[test]
    fn test_events_drive_color_and_drawing() {
        let mut view = SpectrogramView::new(&RenderConfig::default(), 2);
        let mut surface = RecordingSurface::new();

        view.handle_event(&ModelEvent::SourceChanged(Source::Microphone), false, &mut surface)
            .unwrap();
        assert_eq!(view.drawing_color(), Some(Color::RED));

        view.handle_event(&ModelEvent::StateChanged(Source::Processing), false, &mut surface)
            .unwrap();
        assert_eq!(view.drawing_color(), None);

        view.change_color(Source::Soundfile);
        let frame = ModelEvent::SpectrogramUpdated {
            source: Source::Soundfile,
            frame: vec![100, 100],
        };
        view.handle_event(&frame, true, &mut surface).unwrap();
        assert_eq!(surface.fills().len(), 2);
    }

    #[test]
    fn test_draws_onto_pixel_canvas() {
        let config = RenderConfig {
            x_length: 4,
            ..Default::default()
        };
        let mut view = SpectrogramView::new(&config, 2);
        view.change_color(Source::Microphone);
        let mut canvas = PixelCanvas::new(8, 4);

        view.update(&[255, 0], true, &mut canvas).unwrap();

        // Column 1 spans x 2..4; bin 0 occupies the bottom half
        assert_eq!(canvas.pixel(2, 3), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(3, 2), [255, 0, 0, 255]);
        assert_eq!(canvas.pixel(2, 0), [0, 0, 0, 0]);
        assert_eq!(canvas.pixel(0, 3), [0, 0, 0, 0]);
    }
}
