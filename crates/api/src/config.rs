//! Application configuration
//!
//! Sources, later ones override earlier ones:
//! 1. `focus-monitor.toml` (or the file named by `FOCUS_CONFIG`), optional
//! 2. `FOCUS__<SECTION>__<KEY>` environment variables
//! 3. `ROBOFLOW_API_KEY` when no key was set otherwise

use std::collections::HashMap;

use camera_capture::CameraConfig;
use config::{Config, ConfigError, Environment, File, FileFormat};
use dms::DmsConfig;
use monitor::MonitorConfig;
use object_detection::DetectionConfig;
use serde::{Deserialize, Serialize};

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Frame source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    /// Device path, or `stub://name` for synthetic frames
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Loop this image instead of opening a camera
    pub image_path: Option<String>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        let camera = CameraConfig::default();
        Self {
            device: camera.device,
            width: camera.width,
            height: camera.height,
            fps: camera.fps,
            image_path: None,
        }
    }
}

impl From<&CameraSettings> for CameraConfig {
    fn from(s: &CameraSettings) -> Self {
        CameraConfig {
            device: s.device.clone(),
            width: s.width,
            height: s.height,
            fps: s.fps,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub camera: CameraSettings,
    pub dms: DmsConfig,
    pub detection: DetectionConfig,
    pub monitor: MonitorConfig,
}

impl AppConfig {
    /// Load from the default file and the process environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("FOCUS_CONFIG").unwrap_or_else(|_| "focus-monitor".to_string());
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::from_sources(File::with_name(&path).required(false), env)
    }

    /// Load from an inline TOML document and an explicit environment
    pub fn from_toml(toml: &str, env: HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_sources(File::from_str(toml, FileFormat::Toml), env)
    }

    fn from_sources<F>(file: F, env: HashMap<String, String>) -> Result<Self, ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        let roboflow_key = env.get("ROBOFLOW_API_KEY").cloned();

        let mut app: AppConfig = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix("FOCUS")
                    .separator("__")
                    .try_parsing(true)
                    .source(Some(env.into_iter().collect())),
            )
            .build()?
            .try_deserialize()?;

        if app.detection.api_key.as_deref().map_or(true, str::is_empty) {
            app.detection.api_key = roboflow_key;
        }
        Ok(app)
    }
}
