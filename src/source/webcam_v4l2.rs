//! V4L2 capture device.
//!
//! Opens a local device node, asks for RGB3 at the configured size, and
//! converts whatever the driver settles on (RGB3, YUYV, NV12, MJPG) to RGB24.
//! Dropping the device unmaps its buffers and closes the node.

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::normalize::{normalize_to_rgb, PixelFormat};
use super::webcam::WebcamConfig;
use crate::frame::Frame;

pub(crate) struct V4l2Device {
    state: V4l2State,
    format: PixelFormat,
    width: u32,
    height: u32,
}

#[self_referencing]
struct V4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Device {
    pub(crate) fn connect(config: &WebcamConfig) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&config.device)
            .with_context(|| format!("open v4l2 device {}", config.device))?;
        let mut requested = device.format().context("read v4l2 format")?;
        requested.width = config.width;
        requested.height = config.height;
        requested.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&requested) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "WebcamSource: failed to set format on {}: {}",
                    config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let pixel_format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            anyhow!(
                "unsupported capture format {} on {}",
                format.fourcc,
                config.device
            )
        })?;

        let state = V4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        Ok(Self {
            state,
            format: pixel_format,
            width: format.width,
            height: format.height,
        })
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let (width, height, format) = (self.width, self.height, self.format);
        let pixels = self.state.with_mut(|fields| -> Result<Vec<u8>> {
            let (buf, meta) = fields.stream.next().context("capture v4l2 frame")?;
            let used = (meta.bytesused as usize).min(buf.len());
            let used = if used == 0 { buf.len() } else { used };
            normalize_to_rgb(&buf[..used], width, height, format)
        })?;
        Frame::from_rgb(pixels, width, height)
    }
}
