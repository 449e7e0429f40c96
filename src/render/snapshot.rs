use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::Result;
use image::{DynamicImage, ImageFormat};

use super::canvas::Canvas;
use crate::error::ObjectLensError;

/// Write the displayed render to `path` as PNG.
///
/// Fails with a `CaptureExport` error when nothing has been rendered; the
/// caller reports it and carries on.
pub fn capture_snapshot(canvas: &Canvas, path: &Path) -> Result<PathBuf> {
    let bytes = encode_png(canvas)?;
    std::fs::write(path, bytes).map_err(|e| {
        ObjectLensError::CaptureExport(format!("failed to write {}: {}", path.display(), e))
    })?;
    log::info!(
        "snapshot saved to {} ({}x{})",
        path.display(),
        canvas.width(),
        canvas.height()
    );
    Ok(path.to_path_buf())
}

/// PNG bytes of the displayed render.
pub fn encode_png(canvas: &Canvas) -> Result<Vec<u8>> {
    if !canvas.is_displayed() || canvas.width() == 0 || canvas.height() == 0 {
        return Err(ObjectLensError::CaptureExport("nothing to capture".to_string()).into());
    }
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(canvas.image().clone())
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ObjectLensError::CaptureExport(format!("PNG encoding failed: {}", e)))?;
    Ok(out.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{BoundingBox, Detection};
    use crate::error::classify;
    use crate::frame::Frame;
    use crate::render::render;

    #[test]
    fn nothing_rendered_is_not_capturable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("screenshot.png");
        let err = capture_snapshot(&Canvas::new(), &path).unwrap_err();
        assert!(matches!(classify(&err), Some(ObjectLensError::CaptureExport(_))));
        assert!(!path.exists());
    }

    #[test]
    fn rendered_canvas_round_trips_through_png() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("screenshot.png");
        let frame = Frame::from_rgb(vec![200u8; 32 * 24 * 3], 32, 24)?;
        let mut canvas = Canvas::new();
        render(
            &mut canvas,
            &frame,
            &[Detection::new("cat", 0.8, BoundingBox::new(4.0, 12.0, 10.0, 8.0))],
        );

        let written = capture_snapshot(&canvas, &path)?;
        assert_eq!(written, path);
        let reloaded = image::open(&path)?.to_rgba8();
        assert_eq!(reloaded.dimensions(), (32, 24));
        assert_eq!(&reloaded, canvas.image());
        Ok(())
    }

    #[test]
    fn hidden_canvas_is_not_capturable() {
        let frame = Frame::from_rgb(vec![1u8; 3], 1, 1).unwrap();
        let mut canvas = Canvas::new();
        render(&mut canvas, &frame, &[]);
        canvas.hide();
        assert!(encode_png(&canvas).is_err());
    }
}
