use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::ingest::CameraConfig;

const DEFAULT_CAMERA_DEVICE: &str = "stub://webcam";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_TARGET_FPS: u32 = 30;
const DEFAULT_NOTIFY_COMMAND: &str = "notify-send";
const DEFAULT_SYNTHETIC_SEED: u64 = 7;
const DEFAULT_MOVENET_INPUT: u32 = 192;

#[derive(Debug, Deserialize, Default)]
struct MonitorConfigFile {
    camera: Option<CameraConfigFile>,
    estimator: Option<EstimatorConfigFile>,
    alert: Option<AlertConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct EstimatorConfigFile {
    backend: Option<String>,
    model_path: Option<PathBuf>,
    input_size: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    notifier: Option<String>,
    command: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EstimatorBackend {
    Synthetic,
    Tract,
}

impl EstimatorBackend {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "synthetic" => Ok(Self::Synthetic),
            "tract" | "movenet" => Ok(Self::Tract),
            other => Err(anyhow!("unknown estimator backend '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifierKind {
    Log,
    Command,
}

impl NotifierKind {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "command" => Ok(Self::Command),
            other => Err(anyhow!("unknown notifier '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub camera: CameraConfig,
    pub estimator: EstimatorSettings,
    pub alert: AlertSettings,
}

#[derive(Debug, Clone)]
pub struct EstimatorSettings {
    pub backend: EstimatorBackend,
    pub model_path: Option<PathBuf>,
    pub input_size: u32,
    pub seed: u64,
}

#[derive(Debug, Clone)]
pub struct AlertSettings {
    pub notifier: NotifierKind,
    pub command: String,
}

impl MonitorConfig {
    /// Load from `PULLWATCH_CONFIG` (JSON, or TOML for `.toml` paths), then
    /// apply `PULLWATCH_*` environment overrides and validate.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("PULLWATCH_CONFIG")
            .ok()
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        Self::load_from(config_path.as_deref())
    }

    /// Like [`MonitorConfig::load`] with an explicit config file path.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: MonitorConfigFile) -> Result<Self> {
        let camera_file = file.camera.unwrap_or_default();
        let camera = CameraConfig {
            device: camera_file
                .device
                .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string()),
            width: camera_file.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: camera_file.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
            target_fps: camera_file.target_fps.unwrap_or(DEFAULT_TARGET_FPS),
        };

        let estimator_file = file.estimator.unwrap_or_default();
        let estimator = EstimatorSettings {
            backend: match estimator_file.backend.as_deref() {
                Some(name) => EstimatorBackend::parse(name)?,
                None => EstimatorBackend::Synthetic,
            },
            model_path: estimator_file.model_path,
            input_size: estimator_file.input_size.unwrap_or(DEFAULT_MOVENET_INPUT),
            seed: estimator_file.seed.unwrap_or(DEFAULT_SYNTHETIC_SEED),
        };

        let alert_file = file.alert.unwrap_or_default();
        let alert = AlertSettings {
            notifier: match alert_file.notifier.as_deref() {
                Some(name) => NotifierKind::parse(name)?,
                None => NotifierKind::Log,
            },
            command: alert_file
                .command
                .unwrap_or_else(|| DEFAULT_NOTIFY_COMMAND.to_string()),
        };

        Ok(Self {
            camera,
            estimator,
            alert,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(device) = std::env::var("PULLWATCH_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera.device = device;
            }
        }
        if let Ok(fps) = std::env::var("PULLWATCH_TARGET_FPS") {
            self.camera.target_fps = fps
                .trim()
                .parse()
                .map_err(|_| anyhow!("PULLWATCH_TARGET_FPS must be an integer frame rate"))?;
        }
        if let Ok(backend) = std::env::var("PULLWATCH_ESTIMATOR") {
            if !backend.trim().is_empty() {
                self.estimator.backend = EstimatorBackend::parse(&backend)?;
            }
        }
        if let Ok(path) = std::env::var("PULLWATCH_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.estimator.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(notifier) = std::env::var("PULLWATCH_NOTIFIER") {
            if !notifier.trim().is_empty() {
                self.alert.notifier = NotifierKind::parse(&notifier)?;
            }
        }
        if let Ok(command) = std::env::var("PULLWATCH_NOTIFY_COMMAND") {
            if !command.trim().is_empty() {
                self.alert.command = command;
            }
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(anyhow!("camera width and height must be greater than zero"));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if self.estimator.backend == EstimatorBackend::Tract && self.estimator.model_path.is_none()
        {
            return Err(anyhow!("tract estimator requires a model_path"));
        }
        if self.estimator.input_size == 0 {
            return Err(anyhow!("estimator input_size must be greater than zero"));
        }
        self.alert.command = self.alert.command.trim().to_string();
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<MonitorConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}
