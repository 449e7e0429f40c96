use anyhow::{anyhow, Result};

use crate::frame::rgb_len;

/// Capture formats the webcam path can convert to RGB24.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    Yuyv,
    Nv12,
    Mjpeg,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(PixelFormat::Rgb24),
            b"YUYV" => Some(PixelFormat::Yuyv),
            b"NV12" => Some(PixelFormat::Nv12),
            b"MJPG" => Some(PixelFormat::Mjpeg),
            _ => None,
        }
    }
}

pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    match format {
        PixelFormat::Rgb24 => {
            let expected = rgb_len(width, height)?;
            let frame = pixels.get(..expected).ok_or_else(|| {
                anyhow!(
                    "RGB frame length mismatch: expected {}, got {}",
                    expected,
                    pixels.len()
                )
            })?;
            Ok(frame.to_vec())
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, width, height),
        PixelFormat::Nv12 => nv12_to_rgb(pixels, width, height),
        PixelFormat::Mjpeg => {
            let decoded = image::load_from_memory_with_format(pixels, image::ImageFormat::Jpeg)
                .map_err(|e| anyhow!("MJPEG frame decode failed: {}", e))?;
            Ok(decoded.to_rgb8().into_raw())
        }
    }
}

fn yuyv_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    let expected = w
        .checked_mul(h)
        .and_then(|v| v.checked_mul(2))
        .ok_or_else(|| anyhow!("YUYV frame dimensions overflow"))?;
    if pixels.len() < expected {
        return Err(anyhow!(
            "YUYV frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = Vec::with_capacity(w * h * 3);
    for chunk in pixels[..expected].chunks_exact(4) {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
        rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
    }
    Ok(rgb)
}

fn nv12_to_rgb(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    let y_plane = w
        .checked_mul(h)
        .ok_or_else(|| anyhow!("NV12 frame dimensions overflow"))?;
    let expected = y_plane
        .checked_add(y_plane / 2)
        .ok_or_else(|| anyhow!("NV12 frame dimensions overflow"))?;
    if pixels.len() < expected {
        return Err(anyhow!(
            "NV12 frame length mismatch: expected {}, got {}",
            expected,
            pixels.len()
        ));
    }

    let mut rgb = vec![0u8; y_plane * 3];
    for j in 0..h {
        for i in 0..w {
            let uv_index = y_plane + (j / 2) * w + (i / 2) * 2;
            let px = yuv_to_rgb(pixels[j * w + i], pixels[uv_index], pixels[uv_index + 1]);
            let offset = (j * w + i) * 3;
            rgb[offset..offset + 3].copy_from_slice(&px);
        }
    }

    Ok(rgb)
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    [
        clamp_to_u8(y + 1.402_f32 * v),
        clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v),
        clamp_to_u8(y + 1.772_f32 * u),
    ]
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
