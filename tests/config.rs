use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::NamedTempFile;

use objectlens::config::AppConfig;
use objectlens::{classify, ObjectLensError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "OBJECTLENS_CONFIG",
        "OBJECTLENS_MODEL_BACKEND",
        "OBJECTLENS_MODEL_PATH",
        "OBJECTLENS_THRESHOLD",
        "OBJECTLENS_CAMERA_DEVICE",
        "OBJECTLENS_REFRESH_FPS",
        "OBJECTLENS_SNAPSHOT_PATH",
    ] {
        std::env::remove_var(key);
    }
}

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");
    file
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = AppConfig::load().expect("load defaults");
    assert_eq!(cfg.model.backend, "stub");
    assert_eq!(cfg.model.threshold, 0.5);
    assert_eq!(cfg.camera.device, "/dev/video0");
    assert_eq!((cfg.camera.width, cfg.camera.height), (640, 480));
    assert_eq!(cfg.refresh_fps, 30);
    assert_eq!(cfg.snapshot_path, PathBuf::from("screenshot.png"));
}

#[test]
fn loads_config_from_file_and_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(
        r#"{
            "model": {
                "backend": "stub",
                "path": "models/ssd_mobilenet.onnx",
                "input_width": 320,
                "input_height": 320,
                "threshold": 0.4,
                "max_detections": 10
            },
            "camera": {
                "device": "stub://desk",
                "width": 1280,
                "height": 720
            },
            "refresh": { "fps": 15 },
            "snapshot": { "path": "out/first.png" }
        }"#,
    );

    std::env::set_var("OBJECTLENS_CONFIG", file.path());
    std::env::set_var("OBJECTLENS_THRESHOLD", "0.65");
    std::env::set_var("OBJECTLENS_SNAPSHOT_PATH", "out/override.png");

    let cfg = AppConfig::load().expect("load config");

    assert_eq!(
        cfg.model.path.as_deref(),
        Some(PathBuf::from("models/ssd_mobilenet.onnx").as_path())
    );
    assert_eq!((cfg.model.input_width, cfg.model.input_height), (320, 320));
    assert_eq!(cfg.model.threshold, 0.65);
    assert_eq!(cfg.model.max_detections, 10);
    assert_eq!(cfg.camera.device, "stub://desk");
    assert_eq!((cfg.camera.width, cfg.camera.height), (1280, 720));
    assert_eq!(cfg.refresh_fps, 15);
    assert_eq!(cfg.snapshot_path, PathBuf::from("out/override.png"));

    clear_env();
}

#[test]
fn rejects_out_of_range_threshold() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("OBJECTLENS_THRESHOLD", "1.5");
    let err = AppConfig::load().unwrap_err();
    assert!(matches!(classify(&err), Some(ObjectLensError::Config(_))));

    std::env::set_var("OBJECTLENS_THRESHOLD", "high");
    let err = AppConfig::load().unwrap_err();
    assert!(matches!(classify(&err), Some(ObjectLensError::Config(_))));

    clear_env();
}

#[test]
fn rejects_zero_refresh_rate() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config(r#"{ "refresh": { "fps": 0 } }"#);
    std::env::set_var("OBJECTLENS_CONFIG", file.path());
    assert!(AppConfig::load().is_err());

    clear_env();
}

#[test]
fn malformed_config_file_is_an_error() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let file = write_config("{ not json");
    std::env::set_var("OBJECTLENS_CONFIG", file.path());
    assert!(AppConfig::load().is_err());

    clear_env();
}
