//! Normalized, device-independent layout format
//!
//! ```json
//! {
//!   "device": "iphone-14",
//!   "containers": {
//!     "Header": {
//!       "portrait":  { "x": 0.5, "y": 0.05, "width": 1.0, "height": 0.1 },
//!       "landscape": { "x": 0.5, "y": 0.1,  "width": 1.0, "height": 0.2 },
//!       "assets": { "<assetId>": { "name": "<image key>", "portrait": {..}, "landscape": {..} } },
//!       "children": { "...": { } }
//!     }
//!   }
//! }
//! ```
//!
//! Containers are keyed by name. Names are not unique in the editor, so
//! repeated names at one level get a ` (2)`, ` (3)`... suffix on export.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceProfile, NormalizedRect};
use crate::layout::{AssetId, AssetTransform, ContainerId, LayoutState, Orientation};

/// Export map: container name to its block
pub type ExportMap = BTreeMap<String, ExportedContainer>;

/// Root of `layout.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// `None` only when reading a file that lacks the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub containers: Option<ExportMap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedContainer {
    pub portrait: NormalizedRect,
    pub landscape: NormalizedRect,
    #[serde(default)]
    pub depth: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assets: Option<BTreeMap<AssetId, ExportedAsset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<ExportMap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedAsset {
    /// The image key
    pub name: String,
    /// Display name in the editor, when it differs from the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub portrait: AssetTransform,
    pub landscape: AssetTransform,
    #[serde(default)]
    pub depth: i64,
    #[serde(default, skip_serializing_if = "is_false")]
    pub locked: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Build the export document for `state` normalized against `device`
pub fn export_layout(state: &LayoutState, device: &DeviceProfile) -> LayoutDocument {
    LayoutDocument {
        device: Some(device.id.clone()),
        containers: Some(export_level(state, None, device)),
    }
}

fn export_level(state: &LayoutState, parent: Option<&ContainerId>, device: &DeviceProfile) -> ExportMap {
    let mut map = ExportMap::new();
    // lowest depth first so the top layer gets the suffix when names collide
    let mut children = state.children_of(parent);
    children.reverse();

    for container in children {
        let assets: BTreeMap<AssetId, ExportedAsset> = container
            .assets
            .values()
            .map(|asset| {
                let label = (asset.name != asset.key).then(|| asset.name.clone());
                (
                    asset.id.clone(),
                    ExportedAsset {
                        name: asset.key.clone(),
                        label,
                        portrait: asset.transform.portrait.clone(),
                        landscape: asset.transform.landscape.clone(),
                        depth: asset.depth,
                        locked: asset.is_locked,
                    },
                )
            })
            .collect();
        let nested = export_level(state, Some(&container.id), device);

        let block = ExportedContainer {
            portrait: device.normalize(&container.position.portrait, Orientation::Portrait),
            landscape: device.normalize(&container.position.landscape, Orientation::Landscape),
            depth: container.depth,
            locked: container.is_locked,
            assets: (!assets.is_empty()).then_some(assets),
            children: (!nested.is_empty()).then_some(nested),
        };
        map.insert(unique_name(&map, &container.name), block);
    }
    map
}

fn unique_name(map: &ExportMap, name: &str) -> String {
    if !map.contains_key(name) {
        return name.to_string();
    }
    (2..)
        .map(|n| format!("{} ({})", name, n))
        .find(|candidate| !map.contains_key(candidate))
        .unwrap_or_else(|| name.to_string())
}
