//! FFmpeg-backed video decoding.
//!
//! Frames are decoded in-memory and converted to RGB24. End of stream is
//! reported as `Ok(None)` after the decoder has been drained.

use anyhow::{anyhow, Context, Result};
use ffmpeg_next as ffmpeg;
use ffmpeg::format::{context::Input, Pixel};
use ffmpeg::software::scaling::{self, flag::Flags};

use crate::frame::Frame;

pub(crate) struct FfmpegVideoDecoder {
    demuxer: Input,
    track: usize,
    video: ffmpeg::decoder::Video,
    to_rgb: scaling::Context,
    drained: bool,
}

impl FfmpegVideoDecoder {
    /// Open `path` and prepare a decoder for its best video track.
    pub(crate) fn open(path: &str) -> Result<Self> {
        ffmpeg::init().context("ffmpeg init")?;
        let demuxer = ffmpeg::format::input(&path).with_context(|| format!("open {}", path))?;
        let (track, parameters) = {
            let stream = demuxer
                .streams()
                .best(ffmpeg::media::Type::Video)
                .ok_or_else(|| anyhow!("{} has no video track", path))?;
            (stream.index(), stream.parameters())
        };
        let video = ffmpeg::codec::context::Context::from_parameters(parameters)
            .and_then(|codec| codec.decoder().video())
            .context("video decoder setup")?;
        let to_rgb = scaling::Context::get(
            video.format(),
            video.width(),
            video.height(),
            Pixel::RGB24,
            video.width(),
            video.height(),
            Flags::BILINEAR,
        )
        .context("rgb converter setup")?;

        Ok(Self {
            demuxer,
            track,
            video,
            to_rgb,
            drained: false,
        })
    }

    pub(crate) fn dimensions(&self) -> (u32, u32) {
        (self.video.width(), self.video.height())
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();
        loop {
            if self.video.receive_frame(&mut decoded).is_ok() {
                return self.to_frame(&decoded).map(Some);
            }
            if self.drained {
                return Ok(None);
            }
            match self.next_packet() {
                Some(packet) => self.video.send_packet(&packet).context("decode packet")?,
                None => {
                    self.video.send_eof().context("drain decoder")?;
                    self.drained = true;
                }
            }
        }
    }

    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let track = self.track;
        self.demuxer
            .packets()
            .find(|(stream, _)| stream.index() == track)
            .map(|(_, packet)| packet)
    }

    fn to_frame(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let mut rgb = ffmpeg::frame::Video::empty();
        self.to_rgb.run(decoded, &mut rgb).context("convert to rgb24")?;
        let (width, height) = (rgb.width(), rgb.height());
        Frame::from_rgb(packed_rows(&rgb)?, width, height)
    }
}

/// Copy plane 0 into a tightly packed RGB24 buffer, dropping row padding.
fn packed_rows(rgb: &ffmpeg::frame::Video) -> Result<Vec<u8>> {
    let row_len = rgb.width() as usize * 3;
    let rows = rgb.height() as usize;
    let stride = rgb.stride(0).max(row_len);
    let plane = rgb.data(0);

    let mut packed = Vec::with_capacity(row_len * rows);
    for row in plane.chunks(stride).take(rows) {
        let pixels = row
            .get(..row_len)
            .ok_or_else(|| anyhow!("decoded row shorter than {} bytes", row_len))?;
        packed.extend_from_slice(pixels);
    }
    if packed.len() != row_len * rows {
        return Err(anyhow!("decoded frame is missing rows"));
    }
    Ok(packed)
}
