//! Application configuration.
//!
//! Everything that isn't part of the scene itself: the window, the clear
//! color, where assets live and where the camera stands. Stored as RON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::camera::Camera;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: [f64; 4],
    /// Directory texture paths are resolved against.
    pub asset_root: PathBuf,
    /// Scene description, relative to `asset_root` unless absolute.
    pub scene: PathBuf,
    pub camera: Camera,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Turntable".to_string(),
            width: 1000,
            height: 800,
            clear_color: [0.0, 0.0, 0.0, 1.0],
            asset_root: PathBuf::from("assets"),
            scene: PathBuf::from("scene.ron"),
            camera: Camera::default(),
        }
    }
}

fn check_format(path: &Path) -> Result<(), ConfigError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("ron") => Ok(()),
        _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
    }
}

impl AppConfig {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        check_format(path)?;
        let contents = std::fs::read_to_string(path)?;
        ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Like [`load_from_file`](Self::load_from_file), but a missing file means defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        check_format(path)?;
        let contents = ron::ser::to_string_pretty(self, Default::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    pub fn scene_path(&self) -> PathBuf {
        crate::resources::asset_path(&self.asset_root, &self.scene)
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color;
        wgpu::Color { r, g, b, a }
    }
}
