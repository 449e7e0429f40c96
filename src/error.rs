//! Error taxonomy for the viewer.
//!
//! Operations return `anyhow::Result`; the typed `ObjectLensError` sits at the
//! root of the chain so the session can pick the user-facing notice with
//! [`classify`].

use thiserror::Error;

pub const MODEL_LOAD_NOTICE: &str = "Error loading model. Please try again.";
pub const DEVICE_ACCESS_NOTICE: &str = "Error accessing webcam. Please check your camera settings.";
pub const INVALID_INPUT_NOTICE: &str = "Please select a valid file.";
pub const NOTHING_TO_CAPTURE_NOTICE: &str = "No detection result to capture.";
pub const DETECTION_NOTICE: &str = "Error running detection. Please try again.";
pub const START_NOTICE: &str = "Error starting detection. Please try again.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ObjectLensError {
    #[error("model load failed: {0}")]
    ModelLoad(String),

    #[error("device access failed: {0}")]
    DeviceAccess(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("capture export failed: {0}")]
    CaptureExport(String),

    #[error("detection failed: {0}")]
    Detection(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ObjectLensError {
    /// Text shown to the user in a blocking notice.
    pub fn notice(&self) -> &'static str {
        match self {
            ObjectLensError::ModelLoad(_) => MODEL_LOAD_NOTICE,
            ObjectLensError::DeviceAccess(_) => DEVICE_ACCESS_NOTICE,
            ObjectLensError::InvalidInput(_) => INVALID_INPUT_NOTICE,
            ObjectLensError::CaptureExport(_) => NOTHING_TO_CAPTURE_NOTICE,
            ObjectLensError::Detection(_) => DETECTION_NOTICE,
            ObjectLensError::Config(_) => START_NOTICE,
        }
    }
}

/// Find the typed error anywhere in an `anyhow` chain.
pub fn classify(err: &anyhow::Error) -> Option<&ObjectLensError> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ObjectLensError>())
}

/// Notice text for an arbitrary error; untyped failures get the generic start notice.
pub fn notice_for(err: &anyhow::Error) -> &'static str {
    classify(err).map(ObjectLensError::notice).unwrap_or(START_NOTICE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn classify_finds_typed_error_under_context() {
        let err: anyhow::Result<()> = Err(ObjectLensError::DeviceAccess("no device".into()).into());
        let err = err.context("acquire webcam").unwrap_err();
        assert_eq!(
            classify(&err),
            Some(&ObjectLensError::DeviceAccess("no device".into()))
        );
        assert_eq!(notice_for(&err), DEVICE_ACCESS_NOTICE);
    }

    #[test]
    fn untyped_errors_fall_back_to_start_notice() {
        let err = anyhow::anyhow!("something odd");
        assert!(classify(&err).is_none());
        assert_eq!(notice_for(&err), START_NOTICE);
    }

    #[test]
    fn display_includes_detail() {
        let err = ObjectLensError::InvalidInput("no file chosen".into());
        assert!(err.to_string().contains("invalid input"));
        assert!(err.to_string().contains("no file chosen"));
    }
}
