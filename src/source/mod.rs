//! Frame sources.
//!
//! Three input modes sit behind the `FrameSource` trait:
//! - Webcam: live capture device stream (feature: ingest-v4l2)
//! - Image: a single still decoded from a local file
//! - Video: a local video file played frame by frame (feature: ingest-video-ffmpeg)
//!
//! Webcam and video accept `stub://` locations that produce synthetic frames,
//! so the whole pipeline runs without hardware or codecs.
//!
//! A source owns whatever device or decoder it opened and gives it back in
//! `release`. Sources MUST NOT keep a device open after `release`.

pub mod still;
#[cfg(feature = "ingest-v4l2")]
mod normalize;
mod synthetic;
pub mod video;
#[cfg(feature = "ingest-video-ffmpeg")]
pub(crate) mod video_ffmpeg;
pub mod webcam;
#[cfg(feature = "ingest-v4l2")]
pub(crate) mod webcam_v4l2;

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::frame::Frame;

pub use still::ImageSource;
pub use video::{VideoConfig, VideoSource};
pub use webcam::{MediaStream, MediaTrack, WebcamConfig, WebcamSource};

/// Which kind of input the session reads from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    #[default]
    Webcam,
    Image,
    Video,
}

impl InputMode {
    /// Continuous sources keep producing frames until stopped.
    pub fn is_continuous(self) -> bool {
        !matches!(self, InputMode::Image)
    }

    /// Image and video modes need a user-chosen file.
    pub fn needs_file(self) -> bool {
        !matches!(self, InputMode::Webcam)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InputMode::Webcam => "webcam",
            InputMode::Image => "image",
            InputMode::Video => "video",
        }
    }
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webcam" | "camera" => Ok(InputMode::Webcam),
            "image" => Ok(InputMode::Image),
            "video" => Ok(InputMode::Video),
            other => Err(anyhow!(
                "unknown input mode '{}' (expected webcam, image or video)",
                other
            )),
        }
    }
}

/// Uniform access to "the current visual content" of an input.
pub trait FrameSource {
    fn mode(&self) -> InputMode;

    /// Acquire the device or decode the file. Playback starts once
    /// dimensions are known.
    fn open(&mut self) -> Result<()>;

    /// Frame dimensions, known after a successful `open`.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Sample the current frame.
    fn current_frame(&mut self) -> Result<Frame>;

    /// Stop every live track and drop device/decoder handles. Idempotent.
    fn release(&mut self);

    /// Live media tracks currently held.
    fn active_tracks(&self) -> usize {
        0
    }

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// True when `location` names a local path (or a `stub://` source), not a URL.
pub(crate) fn is_local_location(location: &str) -> bool {
    if location.trim().is_empty() {
        return false;
    }
    if location.starts_with("stub://") {
        return true;
    }
    !location.contains("://")
}
