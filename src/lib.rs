//! Dual Layout - a two-orientation layout editor engine
//!
//! This library provides the data model, reference resolution, cascading updates,
//! layer hierarchy and undo history behind a portrait/landscape layout editor,
//! plus normalized export/import and an SVG preview.
//!
//! # Example
//!
//! ```rust
//! use dual_layout::{Editor, Orientation};
//!
//! let mut editor = Editor::default();
//! let parent = editor.add_container(None).unwrap();
//! let child = editor.add_container(Some(&parent)).unwrap();
//! editor.move_container_by(&parent, 20.0, -10.0, Orientation::Portrait).unwrap();
//!
//! let moved = editor.state().containers[&child].position.portrait;
//! assert_eq!((moved.x, moved.y), (215.0, 412.0));
//! ```

pub mod device;
pub mod editor;
pub mod error;
pub mod export;
pub mod history;
pub mod layout;
pub mod library;
pub mod renderer;
pub mod settings;

pub use device::{DeviceProfile, DeviceRegistry, NormalizedRect};
pub use editor::Editor;
pub use error::{EditError, ImportError};
pub use export::{LayoutArchive, LayoutDocument};
pub use history::History;
pub use layout::{
    Alignment, AssetId, AssetTransform, AssetTransformPatch, ContainerId, ContainerPosition,
    ContainerPositionPatch, DropPosition, EditorConfig, LayerId, LayoutError, LayoutState,
    Orientation, Reference, RelativeLayout,
};
pub use library::{AssetLibrary, ImageSource};
pub use renderer::{render_preview, SvgConfig};
pub use settings::{Settings, SettingsError};

use thiserror::Error;

/// Errors that can occur while loading a layout archive into an editor
#[derive(Debug, Error)]
pub enum LoadError {
    /// Editor could not be created (unknown device)
    #[error("{0}")]
    Edit(#[from] EditError),

    /// Archive was rejected
    #[error("import failed: {0}")]
    Import(#[from] ImportError),
}

/// Configuration for loading and previewing a layout
#[derive(Debug, Clone, Default)]
pub struct LoadConfig {
    /// Settings (editor config and extra devices)
    pub settings: Settings,
    /// Device to use instead of `settings.editor.default_device`
    pub device: Option<String>,
    /// SVG output configuration
    pub svg: SvgConfig,
}

impl LoadConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_svg(mut self, config: SvgConfig) -> Self {
        self.svg = config;
        self
    }
}

/// Create an editor for `config` and import `archive` into it
pub fn load_archive(archive: &LayoutArchive, config: &LoadConfig) -> Result<Editor, LoadError> {
    let mut editor = Editor::from_settings(&config.settings)?;
    if let Some(device) = &config.device {
        editor.set_device(device)?;
    }
    editor.import_archive(archive)?;
    Ok(editor)
}

/// Import `archive` and render one orientation as SVG
///
/// # Example
///
/// ```rust
/// use dual_layout::{render_archive, LayoutArchive, LoadConfig, Orientation};
///
/// let mut archive = LayoutArchive::new();
/// archive.insert("layout.json", br#"{"containers": {}}"#.to_vec());
/// archive.insert_dir("assets");
///
/// let svg = render_archive(&archive, &LoadConfig::new(), Orientation::Portrait).unwrap();
/// assert!(svg.contains("<svg"));
/// ```
pub fn render_archive(
    archive: &LayoutArchive,
    config: &LoadConfig,
    orientation: Orientation,
) -> Result<String, LoadError> {
    let editor = load_archive(archive, config)?;
    Ok(render_preview(&editor, orientation, &config.svg))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(json: &str) -> LayoutArchive {
        let mut archive = LayoutArchive::new();
        archive.insert(export::LAYOUT_FILE, json.as_bytes().to_vec());
        archive.insert_dir(export::ASSETS_DIR);
        archive
    }

    #[test]
    fn test_load_uses_requested_device() {
        let editor = load_archive(
            &archive(r#"{"containers": {"Box": {"portrait": {"x": 0.5, "y": 0.5, "width": 0.5, "height": 0.5}, "landscape": {"x": 0.5, "y": 0.5, "width": 0.5, "height": 0.5}}}}"#),
            &LoadConfig::new().with_device("ipad-air"),
        )
        .unwrap();
        assert_eq!(editor.device().id, "ipad-air");
        let only = editor.state().containers.values().next().unwrap();
        assert_eq!(only.position.portrait.width, 410.0);
        assert_eq!(only.position.landscape.width, 590.0);
    }

    #[test]
    fn test_load_unknown_device() {
        let result = load_archive(&archive(r#"{"containers": {}}"#), &LoadConfig::new().with_device("nokia"));
        assert!(matches!(result, Err(LoadError::Edit(EditError::UnknownDevice { .. }))));
    }

    #[test]
    fn test_render_rejects_missing_layout() {
        let result = render_archive(&LayoutArchive::new(), &LoadConfig::new(), Orientation::Portrait);
        assert!(matches!(result, Err(LoadError::Import(ImportError::MissingLayout))));
    }
}
