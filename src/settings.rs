//! Editor settings loaded from TOML
//!
//! ```toml
//! [editor]
//! snap_threshold = 8.0
//! default_device = "pixel-7"
//!
//! [[devices]]
//! id = "kiosk"
//! name = "Kiosk"
//! width = 1080
//! height = 1920
//! ```
//!
//! Every table is optional; unset fields keep their defaults.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::device::{DeviceProfile, DeviceRegistry};
use crate::layout::EditorConfig;

/// Errors that can occur when loading or parsing settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Editor configuration plus extra device profiles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub editor: EditorConfig,
    /// Added to (or replacing entries of) the built-in registry
    pub devices: Vec<DeviceProfile>,
}

/// TOML structure for deserializing settings
#[derive(Deserialize)]
struct TomlSettings {
    #[serde(default)]
    editor: EditorConfig,
    #[serde(default)]
    devices: Vec<DeviceProfile>,
}

impl Settings {
    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load settings from a TOML string
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        let parsed: TomlSettings = toml::from_str(content)?;
        Ok(Settings {
            editor: parsed.editor,
            devices: parsed.devices,
        })
    }

    /// Built-in registry extended with the configured devices
    pub fn registry(&self) -> DeviceRegistry {
        let mut registry = DeviceRegistry::builtin();
        registry.extend(self.devices.iter().cloned());
        registry
    }
}
