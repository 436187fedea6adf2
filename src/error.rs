//! Error types for editing and import

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::layout::{AssetId, ContainerId, LayoutError};

/// Errors returned when a mutation request is rejected.
///
/// A rejected request leaves the store untouched.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("container '{id}' not found")]
    ContainerNotFound { id: ContainerId },

    #[error("asset '{asset}' not found in container '{container}'")]
    AssetNotFound {
        container: ContainerId,
        asset: AssetId,
    },

    #[error("'{element}' is locked")]
    Locked { element: String },

    #[error("invalid reference for asset '{asset}': {reason}")]
    InvalidReference { asset: AssetId, reason: String },

    #[error("invalid drop: {reason}")]
    InvalidDrop { reason: String },

    #[error("unknown device '{id}'")]
    UnknownDevice { id: String, suggestions: Vec<String> },

    #[error("relative layout error: {0}")]
    Layout(#[from] LayoutError),
}

impl EditError {
    pub fn container_not_found(id: &ContainerId) -> Self {
        Self::ContainerNotFound { id: id.clone() }
    }

    pub fn asset_not_found(container: &ContainerId, asset: &AssetId) -> Self {
        Self::AssetNotFound {
            container: container.clone(),
            asset: asset.clone(),
        }
    }

    pub fn locked(element: impl Into<String>) -> Self {
        Self::Locked {
            element: element.into(),
        }
    }

    pub fn invalid_reference(asset: &AssetId, reason: impl Into<String>) -> Self {
        Self::InvalidReference {
            asset: asset.clone(),
            reason: reason.into(),
        }
    }

    pub fn invalid_drop(reason: impl Into<String>) -> Self {
        Self::InvalidDrop {
            reason: reason.into(),
        }
    }
}

/// Errors that abort a layout import.
///
/// Import is atomic: when any of these is returned the editor state is unchanged.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("archive has no layout.json")]
    MissingLayout,

    #[error("archive has no assets/ folder")]
    MissingAssetsFolder,

    #[error("layout.json has no \"containers\" key")]
    MissingContainers,

    #[error("layout.json is not valid: {source}")]
    Json {
        #[source]
        source: serde_json::Error,
    },

    /// Asset ids name the files under `assets/`, so they must be unique across containers
    #[error("asset id '{asset}' appears in both '{first}' and '{second}'")]
    DuplicateAssetId {
        asset: String,
        first: String,
        second: String,
    },

    #[error("image for asset '{asset}' could not be read: {reason}")]
    InvalidImage { asset: String, reason: String },

    #[error("failed to read archive: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ImportError {
    fn from(source: serde_json::Error) -> Self {
        ImportError::Json { source }
    }
}

impl ImportError {
    /// Format the error for the user, with source context for `layout.json` problems
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = match self {
            ImportError::Json { source: err } => {
                let start = line_column_offset(source, err.line(), err.column());
                start..(start + 1).min(source.len().max(start))
            }
            ImportError::MissingContainers => 0..source.len().min(1),
            _ => return format!("Error: {}", self),
        };

        let message = self.to_string();
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(&message)
            .with_label(
                Label::new((filename, span))
                    .with_message(message.clone())
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8(buf).unwrap_or(message),
            Err(_) => message,
        }
    }
}

/// Convert serde_json's 1-based line/column into a byte offset
fn line_column_offset(source: &str, line: usize, column: usize) -> usize {
    let mut offset = 0;
    for (index, text) in source.split_inclusive('\n').enumerate() {
        if index + 1 == line {
            return (offset + column.saturating_sub(1)).min(source.len());
        }
        offset += text.len();
    }
    source.len()
}
