//! Local video file source.
//!
//! This module provides `VideoSource` for playing a user-chosen video file.
//! The video source is responsible for:
//! - Probing stream metadata (dimensions) before playback starts
//! - Decoding frames in-memory, one per sample
//! - Holding the last frame once the stream ends, like a paused player
//!
//! The video source MUST NOT fetch remote URLs.

use anyhow::{anyhow, Result};

use super::synthetic::synthetic_frame;
#[cfg(feature = "ingest-video-ffmpeg")]
use super::video_ffmpeg::FfmpegVideoDecoder;
use super::{is_local_location, FrameSource, InputMode};
use crate::error::ObjectLensError;
use crate::frame::Frame;

/// Frames in a `stub://` clip.
pub const SYNTHETIC_CLIP_FRAMES: u64 = 90;
/// `stub://truncated` clips fail to decode after this many frames.
pub const TRUNCATED_CLIP_FRAMES: u64 = 3;
const SYNTHETIC_WIDTH: u32 = 320;
const SYNTHETIC_HEIGHT: u32 = 240;

/// Configuration for a video file source.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    /// Local file path, or `stub://<name>` for a synthetic clip.
    pub path: String,
}

/// Local video file source.
pub struct VideoSource {
    config: VideoConfig,
    decoder: Option<VideoDecoder>,
    last_frame: Option<Frame>,
    frames_decoded: u64,
    ended: bool,
}

enum VideoDecoder {
    Synthetic(SyntheticClip),
    #[cfg(feature = "ingest-video-ffmpeg")]
    Ffmpeg(FfmpegVideoDecoder),
}

impl VideoDecoder {
    fn dimensions(&self) -> (u32, u32) {
        match self {
            VideoDecoder::Synthetic(clip) => (clip.width, clip.height),
            #[cfg(feature = "ingest-video-ffmpeg")]
            VideoDecoder::Ffmpeg(decoder) => decoder.dimensions(),
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        match self {
            VideoDecoder::Synthetic(clip) => clip.next_frame(),
            #[cfg(feature = "ingest-video-ffmpeg")]
            VideoDecoder::Ffmpeg(decoder) => decoder.next_frame(),
        }
    }
}

impl VideoSource {
    pub fn new(config: VideoConfig) -> Self {
        Self {
            config,
            decoder: None,
            last_frame: None,
            frames_decoded: 0,
            ended: false,
        }
    }

    /// True once the stream has no more frames; sampling then repeats the last one.
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    fn open_decoder(&self) -> Result<VideoDecoder> {
        let path = &self.config.path;
        if path.trim().is_empty() {
            return Err(ObjectLensError::InvalidInput("no video file chosen".to_string()).into());
        }
        if !is_local_location(path) {
            return Err(ObjectLensError::InvalidInput(
                "video playback only supports local paths (no URL schemes)".to_string(),
            )
            .into());
        }
        if let Some(name) = path.strip_prefix("stub://") {
            let clip = match name {
                "truncated" => SyntheticClip::truncated(TRUNCATED_CLIP_FRAMES),
                _ => SyntheticClip::new(),
            };
            return Ok(VideoDecoder::Synthetic(clip));
        }
        #[cfg(feature = "ingest-video-ffmpeg")]
        {
            let decoder = FfmpegVideoDecoder::open(path).map_err(|e| {
                ObjectLensError::InvalidInput(format!("failed to open video {}: {:#}", path, e))
            })?;
            Ok(VideoDecoder::Ffmpeg(decoder))
        }
        #[cfg(not(feature = "ingest-video-ffmpeg"))]
        {
            Err(ObjectLensError::InvalidInput(
                "video decoding requires the ingest-video-ffmpeg feature".to_string(),
            )
            .into())
        }
    }
}

impl FrameSource for VideoSource {
    fn mode(&self) -> InputMode {
        InputMode::Video
    }

    fn open(&mut self) -> Result<()> {
        self.release();
        let decoder = self.open_decoder()?;
        let (width, height) = decoder.dimensions();
        log::info!(
            "VideoSource: metadata ready for {} ({}x{}), starting playback",
            self.config.path,
            width,
            height
        );
        self.decoder = Some(decoder);
        self.ended = false;
        self.frames_decoded = 0;
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.decoder.as_ref().map(VideoDecoder::dimensions)
    }

    fn current_frame(&mut self) -> Result<Frame> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or_else(|| ObjectLensError::InvalidInput("video is not open".to_string()))?;

        if !self.ended {
            let next = decoder.next_frame().map_err(|e| {
                ObjectLensError::InvalidInput(format!(
                    "decoding {} failed after {} frames: {:#}",
                    self.config.path, self.frames_decoded, e
                ))
            })?;
            match next {
                Some(frame) => {
                    self.frames_decoded += 1;
                    self.last_frame = Some(frame);
                }
                None => {
                    self.ended = true;
                    log::info!(
                        "VideoSource: {} ended after {} frames",
                        self.config.path,
                        self.frames_decoded
                    );
                }
            }
        }

        self.last_frame.clone().ok_or_else(|| {
            ObjectLensError::InvalidInput(format!("video {} contains no frames", self.config.path))
                .into()
        })
    }

    fn release(&mut self) {
        if self.decoder.take().is_some() {
            log::info!("VideoSource: closed {}", self.config.path);
        }
        self.last_frame = None;
    }

    fn describe(&self) -> String {
        format!("video {}", self.config.path)
    }
}

// ----------------------------------------------------------------------------
// Synthetic clip (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticClip {
    width: u32,
    height: u32,
    next_index: u64,
    /// Frame index at which decoding breaks.
    corrupt_at: Option<u64>,
}

impl SyntheticClip {
    fn new() -> Self {
        Self {
            width: SYNTHETIC_WIDTH,
            height: SYNTHETIC_HEIGHT,
            next_index: 0,
            corrupt_at: None,
        }
    }

    fn truncated(good_frames: u64) -> Self {
        Self {
            corrupt_at: Some(good_frames),
            ..Self::new()
        }
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.corrupt_at == Some(self.next_index) {
            return Err(anyhow!("invalid data at frame {}", self.next_index));
        }
        if self.next_index >= SYNTHETIC_CLIP_FRAMES {
            return Ok(None);
        }
        let frame = synthetic_frame(self.width, self.height, self.next_index);
        self.next_index += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    fn stub_video() -> VideoSource {
        VideoSource::new(VideoConfig {
            path: "stub://clip".to_string(),
        })
    }

    #[test]
    fn stub_clip_plays_then_holds_last_frame() -> Result<()> {
        let mut source = stub_video();
        source.open()?;
        assert_eq!(source.dimensions(), Some((320, 240)));

        let first = source.current_frame()?;
        let mut last = first.clone();
        for _ in 1..SYNTHETIC_CLIP_FRAMES {
            last = source.current_frame()?;
        }
        assert_ne!(first, last);
        assert!(!source.is_ended());

        let held = source.current_frame()?;
        assert!(source.is_ended());
        assert_eq!(held, last);
        assert_eq!(source.frames_decoded(), SYNTHETIC_CLIP_FRAMES);
        Ok(())
    }

    #[test]
    fn remote_url_is_rejected() {
        let mut source = VideoSource::new(VideoConfig {
            path: "https://example.com/clip.mp4".to_string(),
        });
        let err = source.open().unwrap_err();
        assert!(matches!(classify(&err), Some(ObjectLensError::InvalidInput(_))));
    }

    #[test]
    fn empty_path_is_invalid_input() {
        let mut source = VideoSource::new(VideoConfig {
            path: String::new(),
        });
        let err = source.open().unwrap_err();
        assert!(matches!(classify(&err), Some(ObjectLensError::InvalidInput(_))));
        assert_eq!(source.dimensions(), None);
    }

    #[test]
    fn corrupt_data_mid_stream_is_invalid_input() -> Result<()> {
        let mut source = VideoSource::new(VideoConfig {
            path: "stub://truncated".to_string(),
        });
        source.open()?;
        for _ in 0..TRUNCATED_CLIP_FRAMES {
            source.current_frame()?;
        }

        let err = source.current_frame().unwrap_err();
        assert!(matches!(classify(&err), Some(ObjectLensError::InvalidInput(_))));
        assert!(format!("{:#}", err).contains("after 3 frames"));
        assert!(!source.is_ended());
        Ok(())
    }

    #[test]
    fn release_closes_decoder() -> Result<()> {
        let mut source = stub_video();
        source.open()?;
        source.current_frame()?;
        source.release();
        assert_eq!(source.dimensions(), None);
        assert!(source.current_frame().is_err());
        Ok(())
    }
}
