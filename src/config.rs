// SPDX-License-Identifier: GPL-3.0-only

//! Application configuration
//!
//! Read from a JSON file passed with `--config`. Every field has a default,
//! so a partial file (or no file) is fine.

use crate::backends::camera::{CameraBackendType, CaptureConfig};
use crate::constants::{BitratePreset, capture};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Capture format requested from the device
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: capture::DEFAULT_WIDTH,
            height: capture::DEFAULT_HEIGHT,
            framerate: capture::DEFAULT_FRAMERATE,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture backend (v4l2 or virtual)
    pub backend: CameraBackendType,
    /// Device selected at startup when present
    pub last_camera_path: Option<String>,
    /// Recording directory; the documents directory when unset
    pub output_dir: Option<PathBuf>,
    /// Mirror camera preview horizontally (selfie mode)
    pub mirror_preview: bool,
    pub capture: CaptureSettings,
    /// Video encoder bitrate preset (Low, Medium, High)
    pub bitrate_preset: BitratePreset,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: CameraBackendType::default(),
            last_camera_path: None,
            output_dir: None,
            mirror_preview: true,
            capture: CaptureSettings::default(),
            bitrate_preset: BitratePreset::default(),
        }
    }
}

impl Config {
    /// Load from a JSON file
    pub fn load(path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let config: Config = serde_json::from_str(&contents)?;
        info!(path = %path.display(), backend = %config.backend, "Loaded configuration");
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> AppResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Directory new recordings are written to
    pub fn recordings_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(crate::storage::default_output_dir)
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            width: self.capture.width,
            height: self.capture.height,
            framerate: self.capture.framerate,
        }
    }
}
