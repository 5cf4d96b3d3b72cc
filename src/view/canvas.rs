//! Drawing surfaces for the spectrogram strip.

use std::path::Path;

use crate::error::Result;
use crate::params::Rgba;

/// Fixed-size 2D surface the spectrogram view paints on
///
/// Coordinates are in pixels with the origin at the top-left corner.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Blend a rectangle over the current contents
    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba);

    /// Reset a rectangle to fully transparent
    fn clear_rect(&mut self, x: f32, y: f32, w: f32, h: f32);
}

/// CPU RGBA8 canvas (straight alpha, source-over blending)
///
/// Partially covered pixels receive alpha scaled by their coverage, so
/// rectangles thinner than a pixel still contribute.
pub struct PixelCanvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl PixelCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
        }
    }

    /// Byte index of a pixel
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Raw RGBA8 rows, top to bottom
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn save_png(&self, path: &Path) -> Result<()> {
        image::save_buffer(
            path,
            &self.pixels,
            self.width,
            self.height,
            image::ColorType::Rgba8,
        )?;
        Ok(())
    }

    /// Pixel spans overlapped by [start, start + len), with coverage
    fn spans(start: f32, len: f32, limit: u32) -> impl Iterator<Item = (u32, f32)> {
        let end = (start + len).min(limit as f32);
        let start = start.max(0.0);
        let first = start.floor() as u32;
        let last = if end > start { end.ceil() as u32 } else { first };
        (first..last.min(limit)).map(move |p| {
            let lo = (p as f32).max(start);
            let hi = (p as f32 + 1.0).min(end);
            (p, (hi - lo).max(0.0))
        })
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba, alpha: f32) {
        let i = self.offset(x, y);
        let dst = &mut self.pixels[i..i + 4];
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = alpha + dst_a * (1.0 - alpha);
        if out_a <= 0.0 {
            return;
        }
        let mix = |src: u8, dst: u8| -> u8 {
            let value = (src as f32 * alpha + dst as f32 * dst_a * (1.0 - alpha)) / out_a;
            value.round().clamp(0.0, 255.0) as u8
        };
        dst[0] = mix(color.r, dst[0]);
        dst[1] = mix(color.g, dst[1]);
        dst[2] = mix(color.b, dst[2]);
        dst[3] = (out_a * 255.0).round() as u8;
    }
}

impl Surface for PixelCanvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        if color.a <= 0.0 {
            return;
        }
        let rows: Vec<_> = Self::spans(y, h, self.height).collect();
        for (px, cov_x) in Self::spans(x, w, self.width) {
            for &(py, cov_y) in &rows {
                let alpha = color.a * cov_x * cov_y;
                if alpha > 0.0 {
                    self.blend(px, py, color, alpha);
                }
            }
        }
    }

    fn clear_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        let rows: Vec<_> = Self::spans(y, h, self.height).collect();
        for (px, _) in Self::spans(x, w, self.width) {
            for &(py, _) in &rows {
                let i = self.offset(px, py);
                self.pixels[i..i + 4].fill(0);
            }
        }
    }
}
