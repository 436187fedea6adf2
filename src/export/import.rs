//! Import of a layout archive
//!
//! Import builds a complete new state and decodes every image before anything is
//! handed back, so a failure at any step leaves the caller's state untouched.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::device::DeviceProfile;
use crate::error::ImportError;
use crate::layout::{
    Asset, AssetId, Container, ContainerId, LayoutState, Orientation, PerOrientation,
};
use crate::library::{decode_png, ImageEntry};

use super::archive::{LayoutArchive, ASSETS_DIR, LAYOUT_FILE};
use super::format::{ExportMap, LayoutDocument};

/// Everything an import produces, ready to be committed in one step
#[derive(Debug, Clone)]
pub struct ImportedLayout {
    pub state: LayoutState,
    /// Decoded images keyed by asset key
    pub images: Vec<(String, ImageEntry)>,
    /// Device id recorded in the file, if any
    pub device: Option<String>,
}

/// Parse `layout.json` text, requiring the `containers` key
pub fn parse_layout(source: &str) -> Result<(Option<String>, ExportMap), ImportError> {
    let document: LayoutDocument = serde_json::from_str(source)?;
    let containers = document.containers.ok_or(ImportError::MissingContainers)?;
    Ok((document.device, containers))
}

/// The `layout.json` text of an archive
pub fn layout_source(archive: &LayoutArchive) -> Result<String, ImportError> {
    let bytes = archive.get(LAYOUT_FILE).ok_or(ImportError::MissingLayout)?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| ImportError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Rebuild a flat state from the nested export map with fresh container ids.
///
/// Asset ids are kept and must not repeat anywhere in the map.
pub fn flatten(containers: &ExportMap, device: &DeviceProfile) -> Result<LayoutState, ImportError> {
    let mut state = LayoutState::new();
    let mut seen = HashMap::new();
    flatten_level(&mut state, &mut seen, containers, None, device)?;
    Ok(state)
}

fn flatten_level(
    state: &mut LayoutState,
    seen: &mut HashMap<AssetId, String>,
    level: &ExportMap,
    parent: Option<&ContainerId>,
    device: &DeviceProfile,
) -> Result<(), ImportError> {
    for (name, block) in level {
        let id = ContainerId::generate();
        let position = PerOrientation::new(
            device.denormalize(&block.portrait, Orientation::Portrait),
            device.denormalize(&block.landscape, Orientation::Landscape),
        );
        let mut container = Container::new(id.clone(), name.clone(), position);
        container.parent_id = parent.cloned();
        container.depth = block.depth;
        container.is_locked = block.locked;

        for (asset_id, exported) in block.assets.iter().flatten() {
            if let Some(first) = seen.insert(asset_id.clone(), name.clone()) {
                return Err(ImportError::DuplicateAssetId {
                    asset: asset_id.to_string(),
                    first,
                    second: name.clone(),
                });
            }
            let label = exported.label.clone().unwrap_or_else(|| {
                if exported.name.is_empty() {
                    asset_id.to_string()
                } else {
                    exported.name.clone()
                }
            });
            let mut asset = Asset::new(asset_id.clone(), label);
            asset.key = exported.name.clone();
            asset.transform = PerOrientation::new(exported.portrait.clone(), exported.landscape.clone());
            asset.depth = exported.depth;
            asset.is_locked = exported.locked;
            container.assets.insert(asset_id.clone(), asset);
        }

        state.containers.insert(id.clone(), container);
        if let Some(children) = &block.children {
            flatten_level(state, seen, children, Some(&id), device)?;
        }
    }
    Ok(())
}

/// Read an archive into a new state plus decoded images
pub fn import_archive(archive: &LayoutArchive, device: &DeviceProfile) -> Result<ImportedLayout, ImportError> {
    let source = layout_source(archive)?;
    if !archive.has_dir(ASSETS_DIR) {
        return Err(ImportError::MissingAssetsFolder);
    }
    let (recorded_device, containers) = parse_layout(&source)?;
    let mut state = flatten(&containers, device)?;

    let owners: HashMap<AssetId, ContainerId> = state
        .containers
        .values()
        .flat_map(|c| c.assets.keys().map(|a| (a.clone(), c.id.clone())))
        .collect();

    let mut images = Vec::new();
    for (file, bytes) in archive.files_in(ASSETS_DIR) {
        let Some(stem) = file.strip_suffix(".png") else {
            debug!("skipping non-PNG archive entry {}", file);
            continue;
        };
        let asset_id = AssetId::new(stem);
        let Some(owner) = owners.get(&asset_id) else {
            warn!("image {} has no matching asset", file);
            continue;
        };

        let entry = decode_png(bytes.to_vec()).map_err(|e| ImportError::InvalidImage {
            asset: stem.to_string(),
            reason: e.to_string(),
        })?;
        let Some(asset) = state.asset_mut(owner, &asset_id) else {
            continue;
        };
        if asset.key.is_empty() {
            asset.key = asset_id.to_string();
        }
        images.push((asset.key.clone(), entry));
    }

    info!(
        "imported {} containers, {} assets, {} images",
        state.containers.len(),
        state.asset_count(),
        images.len()
    );
    Ok(ImportedLayout {
        state,
        images,
        device: recorded_device,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::tests::blank_png;

    fn device() -> DeviceProfile {
        DeviceProfile::new("test", "Test", 400.0, 800.0)
    }

    fn archive(json: &str) -> LayoutArchive {
        let mut archive = LayoutArchive::new();
        archive.insert(LAYOUT_FILE, json.as_bytes().to_vec());
        archive.insert_dir(ASSETS_DIR);
        archive
    }

    const NESTED: &str = r#"{
  "containers": {
    "Parent": {
      "portrait":  { "x": 0.5, "y": 0.5, "width": 0.5, "height": 0.25 },
      "landscape": { "x": 0.5, "y": 0.5, "width": 0.25, "height": 0.5 },
      "assets": {
        "logo": {
          "name": "",
          "portrait":  { "position": { "reference": "container", "x": 0, "y": 0 }, "size": { "width": 0.5, "height": 0.5 }, "origin": { "x": 0.5, "y": 0.5 } },
          "landscape": { "position": { "reference": "container", "x": 0, "y": 0 }, "size": { "width": 0.5, "height": 0.5 }, "origin": { "x": 0.5, "y": 0.5 } }
        }
      },
      "children": {
        "Child": {
          "portrait":  { "x": 0.5, "y": 0.5, "width": 0.1, "height": 0.1 },
          "landscape": { "x": 0.5, "y": 0.5, "width": 0.1, "height": 0.1 }
        }
      }
    }
  }
}"#;

    #[test]
    fn test_missing_pieces_are_reported() {
        assert!(matches!(
            import_archive(&LayoutArchive::new(), &device()),
            Err(ImportError::MissingLayout)
        ));

        let mut no_assets = LayoutArchive::new();
        no_assets.insert(LAYOUT_FILE, b"{\"containers\": {}}".to_vec());
        assert!(matches!(
            import_archive(&no_assets, &device()),
            Err(ImportError::MissingAssetsFolder)
        ));

        assert!(matches!(
            import_archive(&archive("{\"device\": \"x\"}"), &device()),
            Err(ImportError::MissingContainers)
        ));
        assert!(matches!(
            import_archive(&archive("{ nope"), &device()),
            Err(ImportError::Json { .. })
        ));
    }

    #[test]
    fn test_children_are_flattened_with_parent_links() {
        let imported = import_archive(&archive(NESTED), &device()).unwrap();
        let state = &imported.state;
        assert_eq!(state.containers.len(), 2);

        let parent = state.containers.values().find(|c| c.name == "Parent").unwrap();
        let child = state.containers.values().find(|c| c.name == "Child").unwrap();
        assert_eq!(child.parent_id.as_ref(), Some(&parent.id));
        assert_eq!(parent.position.portrait.width, 200.0);
        assert_eq!(parent.position.landscape.width, 200.0);
        assert!(parent.assets.contains_key(&AssetId::new("logo")));
    }

    #[test]
    fn test_image_binds_to_asset_key() {
        let mut with_image = archive(NESTED);
        with_image.insert("assets/logo.png", blank_png(4, 2));
        with_image.insert("assets/stray.png", blank_png(1, 1));

        let imported = import_archive(&with_image, &device()).unwrap();
        assert_eq!(imported.images.len(), 1);
        let (key, entry) = &imported.images[0];
        assert_eq!(key, "logo");
        assert_eq!((entry.width, entry.height), (4, 2));

        let parent = imported.state.containers.values().find(|c| c.name == "Parent").unwrap();
        assert_eq!(parent.assets[&AssetId::new("logo")].key, "logo");
    }

    #[test]
    fn test_broken_image_aborts() {
        let mut broken = archive(NESTED);
        broken.insert("assets/logo.png", b"garbage".to_vec());
        assert!(matches!(
            import_archive(&broken, &device()),
            Err(ImportError::InvalidImage { .. })
        ));
    }

    #[test]
    fn test_repeated_asset_id_is_rejected() {
        let asset = r#"{ "name": "", "portrait": { "position": { "reference": "container", "x": 0, "y": 0 }, "size": { "width": 0.5, "height": 0.5 }, "origin": { "x": 0.5, "y": 0.5 } }, "landscape": { "position": { "reference": "container", "x": 0, "y": 0 }, "size": { "width": 0.5, "height": 0.5 }, "origin": { "x": 0.5, "y": 0.5 } } }"#;
        let block = |name: &str| {
            format!(
                r#""{name}": {{ "portrait": {{ "x": 0.5, "y": 0.5, "width": 0.5, "height": 0.5 }}, "landscape": {{ "x": 0.5, "y": 0.5, "width": 0.5, "height": 0.5 }}, "assets": {{ "logo": {asset} }} }}"#
            )
        };
        let json = format!(r#"{{ "containers": {{ {}, {} }} }}"#, block("A"), block("B"));

        match import_archive(&archive(&json), &device()) {
            Err(ImportError::DuplicateAssetId { asset, first, second }) => {
                assert_eq!(asset, "logo");
                assert_eq!((first.as_str(), second.as_str()), ("A", "B"));
            }
            other => panic!("expected a duplicate asset id, got {:?}", other.map(|i| i.state.asset_count())),
        }
    }
}
