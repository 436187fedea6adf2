//! Configuration for the layout editor

use serde::Deserialize;

/// Configuration options for editing behaviour
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Distance in pixels within which snap guides are reported
    pub snap_threshold: f64,

    /// Maximum number of history entries kept (including the initial state)
    pub history_limit: usize,

    /// Side length of a root container created without a parent
    pub default_container_size: f64,

    /// Depth gap used when appending or reordering layers
    pub depth_step: i64,

    /// Device profile selected at startup
    pub default_device: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            snap_threshold: 5.0,
            history_limit: 100,
            default_container_size: 100.0,
            depth_step: 10,
            default_device: "iphone-14".to_string(),
        }
    }
}

impl EditorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snap threshold
    pub fn with_snap_threshold(mut self, threshold: f64) -> Self {
        self.snap_threshold = threshold;
        self
    }

    /// Set the history limit
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Set the default container size
    pub fn with_default_container_size(mut self, size: f64) -> Self {
        self.default_container_size = size;
        self
    }

    /// Set the depth step
    pub fn with_depth_step(mut self, step: i64) -> Self {
        self.depth_step = step;
        self
    }

    /// Set the startup device
    pub fn with_default_device(mut self, device: impl Into<String>) -> Self {
        self.default_device = device.into();
        self
    }
}
