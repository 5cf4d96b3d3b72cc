//! Rendering configuration and source colors.

use crate::error::{Result, SonogramError};
use crate::model::Source;

/// Opaque RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color { r: 255, g: 0, b: 0 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0 };

    /// Attach an opacity, saturating to [0, 1]
    pub fn with_alpha(self, alpha: f32) -> Rgba {
        Rgba {
            r: self.r,
            g: self.g,
            b: self.b,
            a: alpha.clamp(0.0, 1.0),
        }
    }
}

/// Color with straight (non-premultiplied) alpha in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

/// Drawing colors registered per input source
#[derive(Debug, Clone)]
pub struct SourceColors {
    pub microphone: Color,
    pub soundfile: Color,
}

impl Default for SourceColors {
    fn default() -> Self {
        Self {
            microphone: Color::RED,
            soundfile: Color::GREEN,
        }
    }
}

impl SourceColors {
    /// Color registered for a source (none for `Processing`)
    pub fn for_source(&self, source: Source) -> Option<Color> {
        match source {
            Source::Microphone => Some(self.microphone),
            Source::Soundfile => Some(self.soundfile),
            Source::Processing => None,
        }
    }
}

/// Largest canvas side uploadable as a texture under default GPU limits (pixels)
pub const MAX_CANVAS_DIMENSION: u32 = 8192;

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Spectrogram canvas width (pixels)
    pub canvas_width: u32,

    /// Spectrogram canvas height (pixels)
    pub canvas_height: u32,

    /// Columns per sweep before the canvas is wiped
    pub x_length: usize,

    pub colors: SourceColors,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1000,
            window_height: 512,
            canvas_width: 1000,
            canvas_height: 512,
            x_length: 500,
            colors: SourceColors::default(),
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(SonogramError::InvalidConfig(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if self.canvas_width > MAX_CANVAS_DIMENSION || self.canvas_height > MAX_CANVAS_DIMENSION {
            return Err(SonogramError::InvalidConfig(format!(
                "canvas must be at most {}x{}, got {}x{}",
                MAX_CANVAS_DIMENSION, MAX_CANVAS_DIMENSION, self.canvas_width, self.canvas_height
            )));
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(SonogramError::InvalidConfig(format!(
                "window must be non-empty, got {}x{}",
                self.window_width, self.window_height
            )));
        }
        if self.x_length == 0 {
            return Err(SonogramError::InvalidConfig(
                "x_length must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_saturates() {
        assert_eq!(Color::RED.with_alpha(3.2).a, 1.0);
        assert_eq!(Color::RED.with_alpha(-0.5).a, 0.0);
        assert_eq!(Color::GREEN.with_alpha(0.25).a, 0.25);
    }

    #[test]
    fn test_processing_has_no_color() {
        let colors = SourceColors::default();
        assert_eq!(colors.for_source(Source::Microphone), Some(Color::RED));
        assert_eq!(colors.for_source(Source::Soundfile), Some(Color::GREEN));
        assert_eq!(colors.for_source(Source::Processing), None);
    }

    #[test]
    fn test_oversized_canvas_rejected() {
        let config = RenderConfig {
            canvas_width: 40_000,
            canvas_height: 30_000,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SonogramError::InvalidConfig(_))
        ));

        let config = RenderConfig {
            canvas_width: MAX_CANVAS_DIMENSION,
            canvas_height: MAX_CANVAS_DIMENSION,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_x_length_rejected() {
        let config = RenderConfig {
            x_length: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
