//! Webcam source.
//!
//! `WebcamSource` opens a capture device and exposes it as a `MediaStream`
//! with one video track. The stream is owned exclusively by the source:
//! - a new `open` releases any previous stream first
//! - a failed `open` leaves no track live
//! - `release` stops every track and closes the device
//!
//! `stub://` devices produce synthetic frames; real devices need the
//! `ingest-v4l2` feature.

use anyhow::Result;

use super::synthetic::synthetic_frame;
#[cfg(feature = "ingest-v4l2")]
use super::webcam_v4l2::V4l2Device;
use super::{FrameSource, InputMode};
use crate::config::CameraSettings;
use crate::error::ObjectLensError;
use crate::frame::Frame;

/// Configuration for a webcam source.
#[derive(Clone, Debug)]
pub struct WebcamConfig {
    /// Device path (e.g., "/dev/video0") or `stub://<name>`.
    pub device: String,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
}

impl Default for WebcamConfig {
    fn default() -> Self {
        CameraSettings::default().into()
    }
}

impl From<CameraSettings> for WebcamConfig {
    fn from(settings: CameraSettings) -> Self {
        Self {
            device: settings.device,
            width: settings.width,
            height: settings.height,
        }
    }
}

/// One track of a capture stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaTrack {
    pub kind: &'static str,
    pub label: String,
    live: bool,
}

impl MediaTrack {
    fn video(label: impl Into<String>) -> Self {
        Self {
            kind: "video",
            label: label.into(),
            live: true,
        }
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn stop(&mut self) {
        self.live = false;
    }
}

/// Handle over the tracks of one acquired device.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MediaStream {
    tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn live_tracks(&self) -> usize {
        self.tracks.iter().filter(|track| track.is_live()).count()
    }

    /// Stop every track; returns how many were still live.
    pub fn stop_all(&mut self) -> usize {
        let live = self.live_tracks();
        self.tracks.iter_mut().for_each(MediaTrack::stop);
        live
    }
}

/// Webcam frame source.
pub struct WebcamSource {
    config: WebcamConfig,
    device: Option<CaptureDevice>,
    stream: Option<MediaStream>,
}

enum CaptureDevice {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-v4l2")]
    V4l2(V4l2Device),
}

impl CaptureDevice {
    fn connect(config: &WebcamConfig) -> Result<Self> {
        if config.device.trim().is_empty() {
            return Err(ObjectLensError::DeviceAccess("no capture device configured".to_string()).into());
        }
        if config.device.starts_with("stub://") {
            return Ok(CaptureDevice::Synthetic(SyntheticCamera::new(config)));
        }
        #[cfg(feature = "ingest-v4l2")]
        {
            let device = V4l2Device::connect(config).map_err(|e| {
                ObjectLensError::DeviceAccess(format!("{}: {:#}", config.device, e))
            })?;
            Ok(CaptureDevice::V4l2(device))
        }
        #[cfg(not(feature = "ingest-v4l2"))]
        {
            Err(ObjectLensError::DeviceAccess(format!(
                "{}: webcam capture requires the ingest-v4l2 feature",
                config.device
            ))
            .into())
        }
    }

    fn dimensions(&self) -> (u32, u32) {
        match self {
            CaptureDevice::Synthetic(camera) => (camera.width, camera.height),
            #[cfg(feature = "ingest-v4l2")]
            CaptureDevice::V4l2(device) => device.dimensions(),
        }
    }

    fn next_frame(&mut self) -> Result<Frame> {
        match self {
            CaptureDevice::Synthetic(camera) => Ok(camera.next_frame()),
            #[cfg(feature = "ingest-v4l2")]
            CaptureDevice::V4l2(device) => device.next_frame(),
        }
    }
}

impl WebcamSource {
    pub fn new(config: WebcamConfig) -> Self {
        Self {
            config,
            device: None,
            stream: None,
        }
    }

    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }
}

impl FrameSource for WebcamSource {
    fn mode(&self) -> InputMode {
        InputMode::Webcam
    }

    fn open(&mut self) -> Result<()> {
        self.release();
        let device = match CaptureDevice::connect(&self.config) {
            Ok(device) => device,
            Err(err) => {
                log::warn!("WebcamSource: could not open {}: {:#}", self.config.device, err);
                return Err(err);
            }
        };
        let (width, height) = device.dimensions();
        log::info!(
            "WebcamSource: streaming from {} ({}x{})",
            self.config.device,
            width,
            height
        );
        self.stream = Some(MediaStream {
            tracks: vec![MediaTrack::video(self.config.device.clone())],
        });
        self.device = Some(device);
        Ok(())
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        self.device.as_ref().map(CaptureDevice::dimensions)
    }

    fn current_frame(&mut self) -> Result<Frame> {
        let live = self
            .stream
            .as_ref()
            .is_some_and(|stream| stream.live_tracks() > 0);
        let device = match (&mut self.device, live) {
            (Some(device), true) => device,
            _ => {
                return Err(
                    ObjectLensError::DeviceAccess("webcam stream is not live".to_string()).into(),
                )
            }
        };
        device.next_frame().map_err(|e| {
            ObjectLensError::DeviceAccess(format!("capture from {} failed: {:#}", self.config.device, e))
                .into()
        })
    }

    fn release(&mut self) {
        let stopped = self.stream.as_mut().map_or(0, MediaStream::stop_all);
        if stopped > 0 {
            log::info!(
                "WebcamSource: stopped {} track(s) on {}",
                stopped,
                self.config.device
            );
        }
        self.device = None;
    }

    fn active_tracks(&self) -> usize {
        self.stream.as_ref().map_or(0, MediaStream::live_tracks)
    }

    fn describe(&self) -> String {
        format!("webcam {}", self.config.device)
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        self.release();
    }
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub://) for tests
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_count: u64,
}

impl SyntheticCamera {
    fn new(config: &WebcamConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            frame_count: 0,
        }
    }

    fn next_frame(&mut self) -> Frame {
        let frame = synthetic_frame(self.width, self.height, self.frame_count);
        self.frame_count += 1;
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::classify;

    fn stub_config() -> WebcamConfig {
        WebcamConfig {
            device: "stub://test".to_string(),
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn stub_webcam_streams_frames() -> Result<()> {
        let mut source = WebcamSource::new(stub_config());
        source.open()?;
        assert_eq!(source.active_tracks(), 1);
        assert_eq!(source.dimensions(), Some((64, 48)));

        let a = source.current_frame()?;
        let b = source.current_frame()?;
        assert_eq!(a.dimensions(), (64, 48));
        assert_ne!(a, b);
        Ok(())
    }

    #[test]
    fn release_stops_all_tracks() -> Result<()> {
        let mut source = WebcamSource::new(stub_config());
        source.open()?;
        source.release();
        assert_eq!(source.active_tracks(), 0);
        assert!(source.stream().unwrap().tracks().iter().all(|t| !t.is_live()));
        assert!(source.current_frame().is_err());
        Ok(())
    }

    #[test]
    fn second_release_stops_nothing() -> Result<()> {
        let mut source = WebcamSource::new(stub_config());
        source.open()?;
        source.release();
        source.release();
        let mut stream = source.stream().cloned().unwrap();
        assert_eq!(stream.stop_all(), 0);

        source.open()?;
        let mut live = source.stream().cloned().unwrap();
        assert_eq!(live.stop_all(), 1);
        assert_eq!(live.stop_all(), 0);
        Ok(())
    }

    #[test]
    fn reopening_replaces_the_previous_stream() -> Result<()> {
        let mut source = WebcamSource::new(stub_config());
        source.open()?;
        source.open()?;
        assert_eq!(source.active_tracks(), 1);
        assert_eq!(source.stream().unwrap().tracks().len(), 1);
        Ok(())
    }

    #[test]
    fn missing_device_is_device_access_error() {
        let mut source = WebcamSource::new(WebcamConfig {
            device: "/dev/objectlens-missing-camera".to_string(),
            ..stub_config()
        });
        let err = source.open().unwrap_err();
        assert!(matches!(classify(&err), Some(ObjectLensError::DeviceAccess(_))));
        assert_eq!(source.active_tracks(), 0);
        assert_eq!(source.dimensions(), None);
    }
}
