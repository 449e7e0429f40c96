use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::FrameView;

/// Detector backend trait.
///
/// Backends receive a `FrameView`, which is read-only; the frame outlives the
/// call and must not be retained past it.
pub trait DetectorBackend {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on one frame.
    ///
    /// Returns detections in the model's output order; the first one is the
    /// primary detection. An empty list is a valid result.
    fn detect(&mut self, frame: FrameView<'_>) -> Result<Vec<Detection>>;

    /// Optional warm-up hook, run once after loading.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
