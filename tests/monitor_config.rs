use std::path::PathBuf;
use std::sync::Mutex;

use tempfile::{Builder, NamedTempFile};

use pullwatch::config::{EstimatorBackend, MonitorConfig, NotifierKind};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "PULLWATCH_CONFIG",
        "PULLWATCH_CAMERA_DEVICE",
        "PULLWATCH_TARGET_FPS",
        "PULLWATCH_ESTIMATOR",
        "PULLWATCH_MODEL_PATH",
        "PULLWATCH_NOTIFIER",
        "PULLWATCH_NOTIFY_COMMAND",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    let json = r#"{
        "camera": {
            "device": "/dev/video2",
            "width": 1280,
            "height": 720,
            "target_fps": 15
        },
        "estimator": {
            "backend": "synthetic",
            "seed": 99
        },
        "alert": {
            "notifier": "command",
            "command": "notify-send"
        }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("PULLWATCH_CONFIG", file.path());
    std::env::set_var("PULLWATCH_TARGET_FPS", "24");
    std::env::set_var("PULLWATCH_NOTIFY_COMMAND", "  /usr/local/bin/alerter ");

    let cfg = MonitorConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "/dev/video2");
    assert_eq!(cfg.camera.width, 1280);
    assert_eq!(cfg.camera.height, 720);
    assert_eq!(cfg.camera.target_fps, 24);
    assert_eq!(cfg.estimator.backend, EstimatorBackend::Synthetic);
    assert_eq!(cfg.estimator.seed, 99);
    assert_eq!(cfg.alert.notifier, NotifierKind::Command);
    assert_eq!(cfg.alert.command, "/usr/local/bin/alerter");

    clear_env();
}

#[test]
fn loads_toml_config_by_extension() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp config");
    let toml = r#"
        [camera]
        device = "stub://desk"
        target_fps = 10

        [estimator]
        backend = "movenet"
        model_path = "/opt/models/movenet.onnx"
        input_size = 256
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    let cfg = MonitorConfig::load_from(Some(file.path())).expect("load config");

    assert_eq!(cfg.camera.device, "stub://desk");
    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.height, 480);
    assert_eq!(cfg.camera.target_fps, 10);
    assert_eq!(cfg.estimator.backend, EstimatorBackend::Tract);
    assert_eq!(
        cfg.estimator.model_path,
        Some(PathBuf::from("/opt/models/movenet.onnx"))
    );
    assert_eq!(cfg.estimator.input_size, 256);
    assert_eq!(cfg.alert.notifier, NotifierKind::Log);

    clear_env();
}

#[test]
fn defaults_without_config_file() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let cfg = MonitorConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "stub://webcam");
    assert_eq!(cfg.camera.width, 640);
    assert_eq!(cfg.camera.height, 480);
    assert_eq!(cfg.camera.target_fps, 30);
    assert_eq!(cfg.estimator.backend, EstimatorBackend::Synthetic);
    assert_eq!(cfg.alert.notifier, NotifierKind::Log);
    assert_eq!(cfg.alert.command, "notify-send");

    clear_env();
}

#[test]
fn env_selects_backend_and_device() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PULLWATCH_CAMERA_DEVICE", "/dev/video0");
    std::env::set_var("PULLWATCH_ESTIMATOR", "tract");
    std::env::set_var("PULLWATCH_MODEL_PATH", "/tmp/movenet.onnx");
    std::env::set_var("PULLWATCH_NOTIFIER", "command");

    let cfg = MonitorConfig::load().expect("load config");

    assert_eq!(cfg.camera.device, "/dev/video0");
    assert_eq!(cfg.estimator.backend, EstimatorBackend::Tract);
    assert_eq!(
        cfg.estimator.model_path,
        Some(PathBuf::from("/tmp/movenet.onnx"))
    );
    assert_eq!(cfg.alert.notifier, NotifierKind::Command);

    clear_env();
}

#[test]
fn rejects_invalid_settings() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("PULLWATCH_TARGET_FPS", "fast");
    assert!(MonitorConfig::load().is_err());
    std::env::set_var("PULLWATCH_TARGET_FPS", "0");
    assert!(MonitorConfig::load().is_err());
    clear_env();

    std::env::set_var("PULLWATCH_ESTIMATOR", "tract");
    assert!(MonitorConfig::load().is_err());
    clear_env();

    std::env::set_var("PULLWATCH_NOTIFIER", "pager");
    assert!(MonitorConfig::load().is_err());
    clear_env();

    let mut file = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{"camera": {"width": 0}}"#).expect("write config");
    assert!(MonitorConfig::load_from(Some(file.path())).is_err());

    let mut broken = NamedTempFile::new().expect("temp config");
    std::io::Write::write_all(&mut broken, b"{not json").expect("write config");
    assert!(MonitorConfig::load_from(Some(broken.path())).is_err());

    assert!(MonitorConfig::load_from(Some(&PathBuf::from("/nonexistent/pullwatch.json"))).is_err());

    clear_env();
}
