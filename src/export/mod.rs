//! Export to and import from the normalized layout format

pub mod archive;
pub mod format;
pub mod import;

pub use archive::{export_archive, LayoutArchive, ASSETS_DIR, LAYOUT_FILE};
pub use format::{export_layout, ExportMap, ExportedAsset, ExportedContainer, LayoutDocument};
pub use import::{import_archive, ImportedLayout};
