//! Decoded frames.
//!
//! - `Frame`: owned RGB24 pixel buffer with its dimensions.
//! - `FrameView`: read-only borrow handed to detector backends, so a
//!   detection pass cannot mutate the frame it runs on.

use anyhow::{anyhow, Result};
use image::{DynamicImage, RgbImage, RgbaImage};

/// One decoded visual frame in packed RGB24.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap packed RGB24 bytes. The length must match `width * height * 3`.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "RGB frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self {
            data: rgb.into_raw(),
            width,
            height,
        }
    }

    pub fn view(&self) -> FrameView<'_> {
        FrameView { frame: self }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Opaque copy for compositing onto an output surface.
    pub fn to_rgba_image(&self) -> RgbaImage {
        DynamicImage::ImageRgb8(self.to_rgb_image()).to_rgba8()
    }

    fn to_rgb_image(&self) -> RgbImage {
        // Length was validated at construction.
        RgbImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}

/// Read-only view of a frame for inference.
#[derive(Clone, Copy, Debug)]
pub struct FrameView<'a> {
    frame: &'a Frame,
}

impl<'a> FrameView<'a> {
    pub fn width(&self) -> u32 {
        self.frame.width
    }

    pub fn height(&self) -> u32 {
        self.frame.height
    }

    pub fn pixels(&self) -> &'a [u8] {
        &self.frame.data
    }

    /// RGB value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.frame.width || y >= self.frame.height {
            return None;
        }
        let idx = ((y as usize) * (self.frame.width as usize) + x as usize) * 3;
        let px = self.frame.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Owned copy as an `image` buffer, for backends that resize.
    pub fn to_rgb_image(&self) -> RgbImage {
        self.frame.to_rgb_image()
    }
}

pub(crate) fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}
