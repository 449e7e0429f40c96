//! Raster output surface.

use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use super::glyphs::{glyph, GLYPH_ADVANCE, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::detect::BoundingBox;
use crate::frame::Frame;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// The drawing operations the renderer needs from an output surface.
///
/// Coordinates follow 2D canvas conventions: origin top-left, text `y` is
/// the baseline.
pub trait DrawSurface {
    fn resize(&mut self, width: u32, height: u32);
    fn clear(&mut self);
    fn draw_frame(&mut self, frame: &Frame);
    fn stroke_rect(&mut self, bbox: &BoundingBox, line_width: u32, color: Rgba<u8>);
    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>);
    /// Make the rendered result visible.
    fn present(&mut self);
}

/// Text drawn during the last render, in surface coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct TextAnnotation {
    pub text: String,
    pub x: f32,
    pub y: f32,
}

/// RGBA canvas backing the on-screen annotated frame and snapshots.
#[derive(Clone, Debug)]
pub struct Canvas {
    image: RgbaImage,
    displayed: bool,
    annotations: Vec<TextAnnotation>,
}

impl Canvas {
    pub fn new() -> Self {
        Self {
            image: RgbaImage::new(0, 0),
            displayed: false,
            annotations: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn annotations(&self) -> &[TextAnnotation] {
        &self.annotations
    }

    /// True when the surface holds a rendered result that is on screen.
    pub fn is_displayed(&self) -> bool {
        self.displayed
    }

    pub fn hide(&mut self) {
        self.displayed = false;
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

impl DrawSurface for Canvas {
    fn resize(&mut self, width: u32, height: u32) {
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::new(width, height);
        }
    }

    fn clear(&mut self) {
        self.image.pixels_mut().for_each(|px| *px = TRANSPARENT);
        self.annotations.clear();
    }

    fn draw_frame(&mut self, frame: &Frame) {
        imageops::replace(&mut self.image, &frame.to_rgba_image(), 0, 0);
    }

    fn stroke_rect(&mut self, bbox: &BoundingBox, line_width: u32, color: Rgba<u8>) {
        let x = bbox.x.round() as i32;
        let y = bbox.y.round() as i32;
        let w = bbox.width.round().max(1.0) as u32;
        let h = bbox.height.round().max(1.0) as u32;
        let half = (line_width / 2) as i32;
        // Stroke straddles the path like a canvas stroke: rings from outside in.
        for ring in 0..line_width as i32 {
            let inset = ring - half;
            let rw = (w as i32 - 2 * inset).max(1) as u32;
            let rh = (h as i32 - 2 * inset).max(1) as u32;
            draw_hollow_rect_mut(
                &mut self.image,
                Rect::at(x + inset, y + inset).of_size(rw, rh),
                color,
            );
        }
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, color: Rgba<u8>) {
        self.annotations.push(TextAnnotation {
            text: text.to_string(),
            x,
            y,
        });

        let (width, height) = self.image.dimensions();
        let top = y.round() as i64 - GLYPH_HEIGHT as i64;
        let mut left = x.round() as i64;
        for ch in text.chars() {
            let rows = glyph(ch);
            for (row, bits) in rows.iter().enumerate() {
                for col in 0..GLYPH_WIDTH {
                    if (bits >> (GLYPH_WIDTH - 1 - col)) & 1 == 0 {
                        continue;
                    }
                    let px = left + col as i64;
                    let py = top + row as i64;
                    if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                        self.image.put_pixel(px as u32, py as u32, color);
                    }
                }
            }
            left += GLYPH_ADVANCE as i64;
        }
    }

    fn present(&mut self) {
        self.displayed = true;
    }
}
