//! Layer tree projection and drag-reordering
//!
//! The layer tree lists root containers by descending depth; inside a container,
//! child containers come before assets and each group is ordered by descending
//! depth. Reordering is driven by [`DragState`]:
//!
//! ```text
//! Idle -> Dragging -> Hovering -> (drop) Idle
//!           ^            |
//!           +-- invalid -+        cancel from any state -> Idle
//! ```

use std::fmt::{self, Write as _};

use log::debug;

use crate::error::EditError;

use super::store::{LayoutState, LayoutStore};
use super::types::{AssetId, ContainerId, Orientation};

/// Row identity in the layer tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerId {
    Container(ContainerId),
    Asset {
        container: ContainerId,
        asset: AssetId,
    },
}

impl LayerId {
    pub fn asset(container: &ContainerId, asset: &AssetId) -> Self {
        LayerId::Asset {
            container: container.clone(),
            asset: asset.clone(),
        }
    }

    pub fn container_id(&self) -> Option<&ContainerId> {
        match self {
            LayerId::Container(id) => Some(id),
            LayerId::Asset { .. } => None,
        }
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerId::Container(id) => write!(f, "{}", id),
            LayerId::Asset { container, asset } => write!(f, "{}/{}", container, asset),
        }
    }
}

/// One row of the layer tree
#[derive(Debug, Clone, PartialEq)]
pub struct LayerNode {
    pub id: LayerId,
    pub name: String,
    pub depth: i64,
    /// Effective lock: assets inherit their container's lock
    pub locked: bool,
    /// Containers are always visible; assets follow the orientation's flag
    pub visible: bool,
    pub children: Vec<LayerNode>,
}

/// Build the depth-ordered tree for one orientation
pub fn build_layer_tree(state: &LayoutState, orientation: Orientation) -> Vec<LayerNode> {
    build_level(state, None, orientation)
}

fn build_level(
    state: &LayoutState,
    parent: Option<&ContainerId>,
    orientation: Orientation,
) -> Vec<LayerNode> {
    state
        .children_of(parent)
        .into_iter()
        .map(|container| {
            let mut children = build_level(state, Some(&container.id), orientation);
            children.extend(container.assets_by_depth().into_iter().map(|asset| LayerNode {
                id: LayerId::asset(&container.id, &asset.id),
                name: asset.name.clone(),
                depth: asset.depth,
                locked: container.is_locked || asset.is_locked,
                visible: asset.transform.get(orientation).visible(),
                children: Vec::new(),
            }));
            LayerNode {
                id: LayerId::Container(container.id.clone()),
                name: container.name.clone(),
                depth: container.depth,
                locked: container.is_locked,
                visible: true,
                children,
            }
        })
        .collect()
}

/// Indented text rendering of a layer tree
pub fn outline(nodes: &[LayerNode]) -> String {
    let mut out = String::new();
    write_outline(&mut out, nodes, 0);
    out
}

fn write_outline(out: &mut String, nodes: &[LayerNode], level: usize) {
    for node in nodes {
        let kind = match node.id {
            LayerId::Container(_) => "container",
            LayerId::Asset { .. } => "asset",
        };
        let _ = write!(out, "{}{} [{}, depth {}]", "  ".repeat(level), node.name, kind, node.depth);
        if node.locked {
            out.push_str(" locked");
        }
        if !node.visible {
            out.push_str(" hidden");
        }
        out.push('\n');
        write_outline(out, &node.children, level + 1);
    }
}

/// Where a dragged row lands relative to the hovered row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropPosition {
    Before,
    After,
    Inside,
}

impl DropPosition {
    /// Top third is `Before`, bottom third `After`, the middle `Inside`
    pub fn from_pointer(offset: f64, row_height: f64) -> Self {
        if offset < row_height / 3.0 {
            DropPosition::Before
        } else if offset > row_height * 2.0 / 3.0 {
            DropPosition::After
        } else {
            DropPosition::Inside
        }
    }
}

/// Drag lifecycle of the layer panel
#[derive(Debug, Clone, Default, PartialEq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        source: LayerId,
    },
    Hovering {
        source: LayerId,
        target: LayerId,
        position: DropPosition,
    },
}

impl DragState {
    pub fn is_active(&self) -> bool {
        !matches!(self, DragState::Idle)
    }

    pub fn source(&self) -> Option<&LayerId> {
        match self {
            DragState::Idle => None,
            DragState::Dragging { source } | DragState::Hovering { source, .. } => Some(source),
        }
    }

    /// Begin dragging `source`; locked or missing rows cannot be dragged
    pub fn start(&mut self, state: &LayoutState, source: LayerId) -> Result<(), EditError> {
        match &source {
            LayerId::Container(id) => {
                let container = state.require_container(id)?;
                if container.is_locked {
                    return Err(EditError::locked(container.name.clone()));
                }
            }
            LayerId::Asset { container, asset } => {
                let found = state.require_asset(container, asset)?;
                if state.is_asset_locked(container, asset) {
                    return Err(EditError::locked(found.name.clone()));
                }
            }
        }
        *self = DragState::Dragging { source };
        Ok(())
    }

    /// Hover over `target`. An invalid target drops back to plain dragging and
    /// returns `None`.
    pub fn update_target(
        &mut self,
        state: &LayoutState,
        target: LayerId,
        position: DropPosition,
    ) -> Option<DropPosition> {
        let source = self.source()?.clone();
        match validate_drop(state, &source, &target, position) {
            Ok(()) => {
                *self = DragState::Hovering {
                    source,
                    target,
                    position,
                };
                Some(position)
            }
            Err(err) => {
                debug!("rejecting drop of {} on {}: {}", source, target, err);
                *self = DragState::Dragging { source };
                None
            }
        }
    }

    /// Pointer left every row
    pub fn clear_target(&mut self) {
        if let Some(source) = self.source().cloned() {
            *self = DragState::Dragging { source };
        }
    }

    /// End the drag; returns the drop to perform when hovering a valid target
    pub fn take_drop(&mut self) -> Option<(LayerId, LayerId, DropPosition)> {
        match std::mem::take(self) {
            DragState::Hovering {
                source,
                target,
                position,
            } => Some((source, target, position)),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        *self = DragState::Idle;
    }
}

/// Where a drop re-homes the dragged row
#[derive(Debug, Clone, PartialEq)]
enum Destination {
    /// New parent container (`None` = root) for a container
    Parent(Option<ContainerId>),
    /// New owning container for an asset
    Owner(ContainerId),
}

fn destination(
    state: &LayoutState,
    source: &LayerId,
    target: &LayerId,
    position: DropPosition,
) -> Result<Destination, EditError> {
    let dest = match (source, target, position) {
        (_, LayerId::Asset { .. }, DropPosition::Inside) => {
            return Err(EditError::invalid_drop("only containers accept drops inside"));
        }
        (LayerId::Container(_), LayerId::Container(t), DropPosition::Inside) => {
            Destination::Parent(Some(t.clone()))
        }
        (LayerId::Container(_), LayerId::Container(t), _) => {
            Destination::Parent(state.require_container(t)?.parent_id.clone())
        }
        (LayerId::Container(_), LayerId::Asset { container, .. }, _) => {
            Destination::Parent(Some(container.clone()))
        }
        (LayerId::Asset { .. }, LayerId::Container(t), DropPosition::Inside) => {
            Destination::Owner(t.clone())
        }
        (LayerId::Asset { .. }, LayerId::Container(t), _) => {
            match state.require_container(t)?.parent_id.clone() {
                Some(parent) => Destination::Owner(parent),
                None => return Err(EditError::invalid_drop("assets cannot be placed at the root")),
            }
        }
        (LayerId::Asset { .. }, LayerId::Asset { container, .. }, _) => {
            Destination::Owner(container.clone())
        }
    };
    Ok(dest)
}

/// Check a drop without touching the state
pub fn validate_drop(
    state: &LayoutState,
    source: &LayerId,
    target: &LayerId,
    position: DropPosition,
) -> Result<(), EditError> {
    if source == target {
        return Err(EditError::invalid_drop("cannot drop a layer onto itself"));
    }
    for layer in [source, target] {
        match layer {
            LayerId::Container(id) => {
                state.require_container(id)?;
            }
            LayerId::Asset { container, asset } => {
                state.require_asset(container, asset)?;
            }
        }
    }

    let scope = match destination(state, source, target, position)? {
        Destination::Parent(parent) => {
            if let (LayerId::Container(dragged), Some(parent)) = (source, parent.as_ref()) {
                if state.is_descendant_or_self(dragged, parent) {
                    return Err(EditError::invalid_drop(
                        "a container cannot be moved inside its own descendant",
                    ));
                }
            }
            parent
        }
        Destination::Owner(owner) => Some(owner),
    };

    if let Some(scope) = scope {
        let container = state.require_container(&scope)?;
        if container.is_locked {
            return Err(EditError::invalid_drop(format!(
                "container '{}' is locked",
                container.name
            )));
        }
        if let LayerId::Asset { container: owner, asset } = source {
            if owner != &scope && container.assets.contains_key(asset) {
                return Err(EditError::invalid_drop(format!(
                    "container '{}' already holds an asset '{}'",
                    container.name, asset
                )));
            }
        }
    }
    Ok(())
}

/// Depth that lands next to `target` in a group, or `None` if there is no gap.
///
/// `upper`/`lower` are the neighbours above and below the target.
fn slot_depth(target: i64, upper: Option<i64>, lower: Option<i64>, position: DropPosition, step: i64) -> Option<i64> {
    match position {
        DropPosition::Before => {
            let candidate = target + step;
            match upper {
                None => Some(candidate),
                Some(u) if candidate < u => Some(candidate),
                Some(u) if u - target >= 2 => Some(target + (u - target) / 2),
                Some(_) => None,
            }
        }
        DropPosition::After => {
            let candidate = target - step;
            match lower {
                None => Some(candidate),
                Some(l) if candidate > l => Some(candidate),
                Some(l) if target - l >= 2 => Some(l + (target - l) / 2),
                Some(_) => None,
            }
        }
        DropPosition::Inside => None,
    }
}

/// Evenly spaced depths for a group ordered top first
fn spaced_depths(len: usize, step: i64) -> Vec<i64> {
    (0..len).rev().map(|i| i as i64 * step).collect()
}

/// Perform a validated drop through the store
pub fn apply_drop(
    store: &mut LayoutStore,
    source: &LayerId,
    target: &LayerId,
    position: DropPosition,
    step: i64,
) -> Result<(), EditError> {
    validate_drop(store.state(), source, target, position)?;
    let dest = destination(store.state(), source, target, position)?;

    match (source, dest) {
        (LayerId::Container(id), Destination::Parent(parent)) => {
            let depth = match target {
                LayerId::Container(t) if position != DropPosition::Inside => {
                    container_slot(store, parent.as_ref(), id, t, position, step)?
                }
                _ => store.state().next_container_depth(parent.as_ref(), step),
            };
            debug!("moving container {} under {:?} at depth {}", id, parent, depth);
            store.set_container_parent(id, parent)?;
            store.set_container_depth(id, depth)?;
        }
        (LayerId::Asset { container, asset }, Destination::Owner(owner)) => {
            let depth = match target {
                LayerId::Asset { asset: t, .. } => {
                    asset_slot(store, &owner, asset, t, position, step)?
                }
                _ => store
                    .state()
                    .next_asset_depth(&owner, step),
            };
            debug!("moving asset {} into {} at depth {}", asset, owner, depth);
            if container == &owner {
                store.set_asset_depth(container, asset, depth)?;
            } else {
                store.transfer_asset(container, asset, &owner, depth)?;
            }
        }
        _ => return Err(EditError::invalid_drop("unsupported drop")),
    }
    Ok(())
}

fn container_slot(
    store: &mut LayoutStore,
    parent: Option<&ContainerId>,
    dragged: &ContainerId,
    target: &ContainerId,
    position: DropPosition,
    step: i64,
) -> Result<i64, EditError> {
    let group = |store: &LayoutStore| -> Vec<(ContainerId, i64)> {
        store
            .state()
            .children_of(parent)
            .into_iter()
            .filter(|c| &c.id != dragged)
            .map(|c| (c.id.clone(), c.depth))
            .collect()
    };

    let siblings = group(store);
    if let Some(depth) = neighbour_slot(&siblings, target, position, step) {
        return Ok(depth);
    }
    for ((id, _), depth) in siblings.iter().zip(spaced_depths(siblings.len(), step)) {
        store.set_container_depth(id, depth)?;
    }
    neighbour_slot(&group(store), target, position, step)
        .ok_or_else(|| EditError::invalid_drop("no depth slot available"))
}

fn asset_slot(
    store: &mut LayoutStore,
    owner: &ContainerId,
    dragged: &AssetId,
    target: &AssetId,
    position: DropPosition,
    step: i64,
) -> Result<i64, EditError> {
    let group = |store: &LayoutStore| -> Vec<(AssetId, i64)> {
        store
            .state()
            .container(owner)
            .map(|c| {
                c.assets_by_depth()
                    .into_iter()
                    .filter(|a| &a.id != dragged)
                    .map(|a| (a.id.clone(), a.depth))
                    .collect()
            })
            .unwrap_or_default()
    };

    let siblings = group(store);
    if let Some(depth) = neighbour_slot(&siblings, target, position, step) {
        return Ok(depth);
    }
    for ((id, _), depth) in siblings.iter().zip(spaced_depths(siblings.len(), step)) {
        store.set_asset_depth(owner, id, depth)?;
    }
    neighbour_slot(&group(store), target, position, step)
        .ok_or_else(|| EditError::invalid_drop("no depth slot available"))
}

/// Slot next to `target` in a group ordered top first
fn neighbour_slot<K: PartialEq>(group: &[(K, i64)], target: &K, position: DropPosition, step: i64) -> Option<i64> {
    let index = group.iter().position(|(id, _)| id == target)?;
    let upper = index.checked_sub(1).map(|i| group[i].1);
    let lower = group.get(index + 1).map(|(_, d)| *d);
    slot_depth(group[index].1, upper, lower, position, step)
}
