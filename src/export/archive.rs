//! In-memory layout archive: `layout.json` plus `assets/<assetId>.png`
//!
//! Packing into a zip is left to the caller; [`LayoutArchive::from_dir`] and
//! [`LayoutArchive::write_dir`] map an unpacked archive to a directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::device::DeviceProfile;
use crate::layout::LayoutState;
use crate::library::AssetLibrary;

use super::format::export_layout;

pub const LAYOUT_FILE: &str = "layout.json";
pub const ASSETS_DIR: &str = "assets/";

/// Archive contents keyed by `/`-separated path. Directory entries end in `/`
/// and carry no bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutArchive {
    files: BTreeMap<String, Vec<u8>>,
}

impl LayoutArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }

    pub fn insert_dir(&mut self, path: impl Into<String>) {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        self.files.insert(path, Vec::new());
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|b| b.as_slice())
    }

    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        self.files.remove(path)
    }

    /// True if the directory is present, explicitly or through a file inside it
    pub fn has_dir(&self, dir: &str) -> bool {
        self.files.keys().any(|p| p.starts_with(dir))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(|p| p.as_str())
    }

    /// Files directly inside `dir`, as (file name, bytes)
    pub fn files_in<'a>(&'a self, dir: &'a str) -> impl Iterator<Item = (&'a str, &'a [u8])> + 'a {
        self.files.iter().filter_map(move |(path, bytes)| {
            let name = path.strip_prefix(dir)?;
            (!name.is_empty() && !name.contains('/')).then_some((name, bytes.as_slice()))
        })
    }

    /// Read an unpacked archive from disk
    pub fn from_dir(root: &Path) -> std::io::Result<Self> {
        let mut archive = LayoutArchive::new();
        let layout = root.join(LAYOUT_FILE);
        if layout.is_file() {
            archive.insert(LAYOUT_FILE, fs::read(layout)?);
        }

        let assets = root.join(ASSETS_DIR.trim_end_matches('/'));
        if assets.is_dir() {
            archive.insert_dir(ASSETS_DIR);
            for entry in fs::read_dir(&assets)? {
                let entry = entry?;
                if !entry.file_type()?.is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                archive.insert(format!("{}{}", ASSETS_DIR, name), fs::read(entry.path())?);
            }
        }
        debug!("read {} archive entries from {}", archive.files.len(), root.display());
        Ok(archive)
    }

    /// Write the archive under `root`, creating directories as needed
    pub fn write_dir(&self, root: &Path) -> std::io::Result<()> {
        for (path, bytes) in &self.files {
            let target = root.join(path.trim_end_matches('/'));
            if path.ends_with('/') {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(target, bytes)?;
        }
        Ok(())
    }
}

/// Package the layout and every known image into an archive
pub fn export_archive(
    state: &LayoutState,
    library: &AssetLibrary,
    device: &DeviceProfile,
) -> Result<LayoutArchive, serde_json::Error> {
    let mut archive = LayoutArchive::new();
    let document = export_layout(state, device);
    archive.insert(LAYOUT_FILE, serde_json::to_vec_pretty(&document)?);
    archive.insert_dir(ASSETS_DIR);

    let mut images = 0;
    for container in state.containers.values() {
        for asset in container.assets.values() {
            let bytes = library.get(&asset.key).and_then(|entry| entry.bytes.clone());
            if let Some(bytes) = bytes {
                archive.insert(format!("{}{}.png", ASSETS_DIR, asset.id), bytes);
                images += 1;
            }
        }
    }
    info!(
        "exported {} containers and {} images for device {}",
        state.containers.len(),
        images,
        device.id
    );
    Ok(archive)
}
