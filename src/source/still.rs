//! Still image source.
//!
//! Decodes one user-chosen file with the `image` crate. The decoded frame is
//! held until `release`; every sample returns the same content.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{FrameSource, InputMode};
use crate::error::ObjectLensError;
use crate::frame::Frame;

pub struct ImageSource {
    path: Option<PathBuf>,
    frame: Option<Frame>,
}

impl ImageSource {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path, frame: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

impl FrameSource for ImageSource {
    fn mode(&self) -> InputMode {
        InputMode::Image
    }

    fn open(&mut self) -> Result<()> {
        let path = match &self.path {
            Some(path) if !path.as_os_str().is_empty() => path,
            _ => return Err(ObjectLensError::InvalidInput("no image file chosen".to_string()).into()),
        };
        let decoded = image::open(path).map_err(|e| {
            ObjectLensError::InvalidInput(format!("failed to decode {}: {}", path.display(), e))
        })?;
        let frame = Frame::from_image(&decoded);
        log::info!(
            "ImageSource: decoded {} ({}x{})",
            path.display(),
            frame.width,
            frame.height
        );
        self.frame = Some(frame);
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.frame.as_ref().map(Frame::dimensions)
    }

    fn current_frame(&mut self) -> Result<Frame> {
        self.frame
            .clone()
            .ok_or_else(|| ObjectLensError::InvalidInput("image is not decoded".to_string()).into())
    }

    fn release(&mut self) {
        self.frame = None;
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("image {}", path.display()),
            None => "image (no file)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;
    use image::{Rgb, RgbImage};

    #[test]
    fn decodes_png_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("still.png");
        RgbImage::from_pixel(8, 6, Rgb([1, 2, 3])).save(&path)?;

        let mut source = ImageSource::new(Some(path));
        assert_eq!(source.dimensions(), None);
        source.open()?;
        assert_eq!(source.dimensions(), Some((8, 6)));
        let frame = source.current_frame()?;
        assert_eq!(frame.view().pixel(7, 5), Some([1, 2, 3]));
        assert_eq!(source.active_tracks(), 0);

        source.release();
        assert!(source.current_frame().is_err());
        Ok(())
    }

    #[test]
    fn missing_file_choice_is_invalid_input() {
        let mut source = ImageSource::new(None);
        let err = source.open().unwrap_err();
        assert!(matches!(classify(&err), Some(ObjectLensError::InvalidInput(_))));
    }

    #[test]
    fn undecodable_file_is_invalid_input() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png")?;
        let mut source = ImageSource::new(Some(path));
        let err = source.open().unwrap_err();
        assert!(matches!(classify(&err), Some(ObjectLensError::InvalidInput(_))));
        Ok(())
    }
}
