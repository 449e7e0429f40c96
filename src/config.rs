use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ObjectLensError;

const DEFAULT_MODEL_BACKEND: &str = "stub";
const DEFAULT_MODEL_INPUT_WIDTH: u32 = 300;
const DEFAULT_MODEL_INPUT_HEIGHT: u32 = 300;
const DEFAULT_THRESHOLD: f32 = 0.5;
const DEFAULT_MAX_DETECTIONS: usize = 20;
const DEFAULT_CAMERA_DEVICE: &str = "/dev/video0";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_REFRESH_FPS: u32 = 30;
pub const DEFAULT_SNAPSHOT_PATH: &str = "screenshot.png";

#[derive(Debug, Deserialize, Default)]
struct AppConfigFile {
    model: Option<ModelConfigFile>,
    camera: Option<CameraConfigFile>,
    refresh: Option<RefreshConfigFile>,
    snapshot: Option<SnapshotConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    backend: Option<String>,
    path: Option<PathBuf>,
    input_width: Option<u32>,
    input_height: Option<u32>,
    threshold: Option<f32>,
    max_detections: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RefreshConfigFile {
    fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct SnapshotConfigFile {
    path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelSettings,
    pub camera: CameraSettings,
    pub refresh_fps: u32,
    pub snapshot_path: PathBuf,
}

/// Detector backend selection and tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSettings {
    pub backend: String,
    pub path: Option<PathBuf>,
    pub input_width: u32,
    pub input_height: u32,
    pub threshold: f32,
    pub max_detections: usize,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            backend: DEFAULT_MODEL_BACKEND.to_string(),
            path: None,
            input_width: DEFAULT_MODEL_INPUT_WIDTH,
            input_height: DEFAULT_MODEL_INPUT_HEIGHT,
            threshold: DEFAULT_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraSettings {
    pub device: String,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            device: DEFAULT_CAMERA_DEVICE.to_string(),
            width: DEFAULT_CAMERA_WIDTH,
            height: DEFAULT_CAMERA_HEIGHT,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            camera: CameraSettings::default(),
            refresh_fps: DEFAULT_REFRESH_FPS,
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
        }
    }
}

impl AppConfig {
    /// Load from `OBJECTLENS_CONFIG` (JSON, optional), then apply env overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("OBJECTLENS_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        let defaults = ModelSettings::default();
        let model = match file.model {
            Some(model) => ModelSettings {
                backend: model.backend.unwrap_or(defaults.backend),
                path: model.path,
                input_width: model.input_width.unwrap_or(defaults.input_width),
                input_height: model.input_height.unwrap_or(defaults.input_height),
                threshold: model.threshold.unwrap_or(defaults.threshold),
                max_detections: model.max_detections.unwrap_or(defaults.max_detections),
            },
            None => defaults,
        };
        let camera_defaults = CameraSettings::default();
        let camera = match file.camera {
            Some(camera) => CameraSettings {
                device: camera.device.unwrap_or(camera_defaults.device),
                width: camera.width.unwrap_or(camera_defaults.width),
                height: camera.height.unwrap_or(camera_defaults.height),
            },
            None => camera_defaults,
        };
        let refresh_fps = file
            .refresh
            .and_then(|refresh| refresh.fps)
            .unwrap_or(DEFAULT_REFRESH_FPS);
        let snapshot_path = file
            .snapshot
            .and_then(|snapshot| snapshot.path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH));
        Self {
            model,
            camera,
            refresh_fps,
            snapshot_path,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(backend) = non_empty_env("OBJECTLENS_MODEL_BACKEND") {
            self.model.backend = backend;
        }
        if let Some(path) = non_empty_env("OBJECTLENS_MODEL_PATH") {
            self.model.path = Some(PathBuf::from(path));
        }
        if let Some(threshold) = non_empty_env("OBJECTLENS_THRESHOLD") {
            self.model.threshold = threshold.parse().map_err(|_| {
                ObjectLensError::Config("OBJECTLENS_THRESHOLD must be a number".to_string())
            })?;
        }
        if let Some(device) = non_empty_env("OBJECTLENS_CAMERA_DEVICE") {
            self.camera.device = device;
        }
        if let Some(fps) = non_empty_env("OBJECTLENS_REFRESH_FPS") {
            self.refresh_fps = fps.parse().map_err(|_| {
                ObjectLensError::Config("OBJECTLENS_REFRESH_FPS must be an integer".to_string())
            })?;
        }
        if let Some(path) = non_empty_env("OBJECTLENS_SNAPSHOT_PATH") {
            self.snapshot_path = PathBuf::from(path);
        }
        Ok(())
    }

    /// Check value ranges. Called by `load` and again after CLI overrides.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.model.threshold) {
            return Err(ObjectLensError::Config(format!(
                "threshold must be within 0..=1, got {}",
                self.model.threshold
            ))
            .into());
        }
        if self.model.input_width == 0 || self.model.input_height == 0 {
            return Err(
                ObjectLensError::Config("model input size must be non-zero".to_string()).into(),
            );
        }
        if self.model.max_detections == 0 {
            return Err(
                ObjectLensError::Config("max_detections must be at least 1".to_string()).into(),
            );
        }
        if self.refresh_fps == 0 {
            return Err(ObjectLensError::Config("refresh fps must be >= 1".to_string()).into());
        }
        if self.snapshot_path.as_os_str().is_empty() {
            return Err(ObjectLensError::Config("snapshot path must not be empty".to_string()).into());
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<AppConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw).map_err(|e| {
        ObjectLensError::Config(format!("invalid config file {}: {}", path.display(), e))
    })?;
    Ok(cfg)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}
