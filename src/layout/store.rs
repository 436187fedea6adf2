//! Container/asset store and its mutation API
//!
//! [`LayoutState`] is the plain data: a flat map of containers keyed by id, each
//! owning its assets. [`LayoutStore`] wraps the state, is its only mutator, and
//! tells subscribers about every change. Readers are expected to re-query the
//! store after a notification rather than cache derived data.
//!
//! The store itself does not enforce locks; the editor checks them before any
//! request reaches this module.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use crate::error::EditError;

use super::config::EditorConfig;
use super::types::{
    Asset, AssetId, AssetTransform, AssetTransformPatch, Container, ContainerId,
    ContainerPosition, ContainerPositionPatch, Orientation, PerOrientation, Reference, Size,
};

/// Snapshot-able layout data
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutState {
    pub containers: HashMap<ContainerId, Container>,
}

impl LayoutState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(&self, id: &ContainerId) -> Option<&Container> {
        self.containers.get(id)
    }

    pub fn container_mut(&mut self, id: &ContainerId) -> Option<&mut Container> {
        self.containers.get_mut(id)
    }

    pub fn asset(&self, container: &ContainerId, asset: &AssetId) -> Option<&Asset> {
        self.containers.get(container)?.assets.get(asset)
    }

    pub fn asset_mut(&mut self, container: &ContainerId, asset: &AssetId) -> Option<&mut Asset> {
        self.containers.get_mut(container)?.assets.get_mut(asset)
    }

    pub fn require_container(&self, id: &ContainerId) -> Result<&Container, EditError> {
        self.container(id)
            .ok_or_else(|| EditError::container_not_found(id))
    }

    pub fn require_asset(
        &self,
        container: &ContainerId,
        asset: &AssetId,
    ) -> Result<&Asset, EditError> {
        let owner = self.require_container(container)?;
        owner
            .assets
            .get(asset)
            .ok_or_else(|| EditError::asset_not_found(container, asset))
    }

    /// Containers whose parent is `parent` (`None` for roots), descending depth
    pub fn children_of(&self, parent: Option<&ContainerId>) -> Vec<&Container> {
        let mut children: Vec<&Container> = self
            .containers
            .values()
            .filter(|c| c.parent_id.as_ref() == parent)
            .collect();
        children.sort_by(|a, b| b.depth.cmp(&a.depth).then_with(|| a.id.cmp(&b.id)));
        children
    }

    /// All descendants of `id` in breadth-first order, excluding `id` itself
    pub fn descendants(&self, id: &ContainerId) -> Vec<ContainerId> {
        let mut order = Vec::new();
        let mut seen: HashSet<ContainerId> = HashSet::new();
        let mut queue = VecDeque::from([id.clone()]);
        seen.insert(id.clone());

        while let Some(current) = queue.pop_front() {
            for child in self.children_of(Some(&current)) {
                if seen.insert(child.id.clone()) {
                    order.push(child.id.clone());
                    queue.push_back(child.id.clone());
                }
            }
        }
        order
    }

    /// True if `candidate` is `ancestor` or sits below it in the parent chain
    pub fn is_descendant_or_self(&self, ancestor: &ContainerId, candidate: &ContainerId) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(candidate.clone());
        while let Some(id) = current {
            if &id == ancestor {
                return true;
            }
            if !seen.insert(id.clone()) {
                return false;
            }
            current = self.container(&id).and_then(|c| c.parent_id.clone());
        }
        false
    }

    /// A container's own lock flag
    pub fn is_container_locked(&self, id: &ContainerId) -> bool {
        self.container(id).is_some_and(|c| c.is_locked)
    }

    /// An asset is effectively locked when it or its container is locked
    pub fn is_asset_locked(&self, container: &ContainerId, asset: &AssetId) -> bool {
        match self.container(container) {
            Some(owner) => {
                owner.is_locked || owner.assets.get(asset).is_some_and(|a| a.is_locked)
            }
            None => false,
        }
    }

    /// Next free depth above every container sharing `parent`
    pub fn next_container_depth(&self, parent: Option<&ContainerId>, step: i64) -> i64 {
        self.children_of(parent)
            .first()
            .map(|top| top.depth + step)
            .unwrap_or(0)
    }

    /// Next free depth above every asset of `container`
    pub fn next_asset_depth(&self, container: &ContainerId, step: i64) -> i64 {
        self.container(container)
            .and_then(|c| c.assets.values().map(|a| a.depth).max())
            .map(|top| top + step)
            .unwrap_or(0)
    }

    /// Every (container, asset) pair whose image key is `key`
    pub fn assets_with_key(&self, key: &str) -> Vec<(ContainerId, AssetId)> {
        let mut found: Vec<(ContainerId, AssetId)> = self
            .containers
            .values()
            .flat_map(|c| {
                c.assets
                    .values()
                    .filter(|a| a.key == key)
                    .map(|a| (c.id.clone(), a.id.clone()))
            })
            .collect();
        found.sort();
        found
    }

    pub fn asset_count(&self) -> usize {
        self.containers.values().map(|c| c.assets.len()).sum()
    }
}

/// A change notification sent to subscribers after the store has been updated
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    ContainerAdded(ContainerId),
    ContainerUpdated {
        id: ContainerId,
        /// `None` when the change is not tied to one orientation (name, lock, parent, depth)
        orientation: Option<Orientation>,
    },
    ContainerRemoved(ContainerId),
    AssetAdded {
        container: ContainerId,
        asset: AssetId,
    },
    AssetUpdated {
        container: ContainerId,
        asset: AssetId,
        orientation: Option<Orientation>,
    },
    AssetRemoved {
        container: ContainerId,
        asset: AssetId,
    },
    /// The whole state was replaced (undo, redo, import)
    Reset,
}

/// Handle returned by [`LayoutStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&ChangeEvent)>;

/// Owner of the layout state and notifier of its changes
pub struct LayoutStore {
    state: LayoutState,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl Default for LayoutStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LayoutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutStore")
            .field("state", &self.state)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl LayoutStore {
    pub fn new() -> Self {
        Self::with_state(LayoutState::default())
    }

    pub fn with_state(state: LayoutState) -> Self {
        Self {
            state,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn state(&self) -> &LayoutState {
        &self.state
    }

    /// Register a callback invoked after every change
    pub fn subscribe(&mut self, callback: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a callback; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    fn notify(&mut self, event: ChangeEvent) {
        for (_, callback) in &mut self.subscribers {
            callback(&event);
        }
    }

    /// Replace the whole state (history restore, import)
    pub fn replace_state(&mut self, state: LayoutState) {
        self.state = state;
        self.notify(ChangeEvent::Reset);
    }

    /// Create a container.
    ///
    /// Root containers get a square of `config.default_container_size` centered in
    /// each orientation's `frame`; nested ones take half their parent's size at the
    /// parent's center.
    pub fn add_container(
        &mut self,
        parent: Option<&ContainerId>,
        frame: &PerOrientation<Size>,
        config: &EditorConfig,
    ) -> Result<ContainerId, EditError> {
        let position = match parent {
            Some(parent_id) => {
                let parent = self.state.require_container(parent_id)?;
                let seed = |p: &ContainerPosition| {
                    ContainerPosition::new(p.x, p.y, p.width / 2.0, p.height / 2.0)
                };
                PerOrientation::new(
                    seed(&parent.position.portrait),
                    seed(&parent.position.landscape),
                )
            }
            None => {
                let side = config.default_container_size;
                let seed = |s: &Size| {
                    ContainerPosition::new(s.width / 2.0, s.height / 2.0, side, side)
                };
                PerOrientation::new(seed(&frame.portrait), seed(&frame.landscape))
            }
        };

        let id = ContainerId::generate();
        let name = format!("Container {}", self.state.containers.len() + 1);
        let mut container = Container::new(id.clone(), name, position);
        container.parent_id = parent.cloned();
        container.depth = self.state.next_container_depth(parent, config.depth_step);

        debug!("adding container {} under {:?}", id, parent);
        self.state.containers.insert(id.clone(), container);
        self.notify(ChangeEvent::ContainerAdded(id.clone()));
        Ok(id)
    }

    /// Insert a fully-built container (used when duplicating or importing)
    pub fn insert_container(&mut self, container: Container) {
        let id = container.id.clone();
        self.state.containers.insert(id.clone(), container);
        self.notify(ChangeEvent::ContainerAdded(id));
    }

    /// Create an asset in `container` with a default centered transform
    pub fn add_asset(
        &mut self,
        container: &ContainerId,
        config: &EditorConfig,
    ) -> Result<AssetId, EditError> {
        let depth = self.state.next_asset_depth(container, config.depth_step);
        let owner = self
            .state
            .container_mut(container)
            .ok_or_else(|| EditError::container_not_found(container))?;

        let id = AssetId::generate();
        let mut asset = Asset::new(id.clone(), format!("Asset {}", owner.assets.len() + 1));
        asset.depth = depth;
        owner.assets.insert(id.clone(), asset);

        self.notify(ChangeEvent::AssetAdded {
            container: container.clone(),
            asset: id.clone(),
        });
        Ok(id)
    }

    /// Apply a partial position update; returns the previous and new position
    pub fn update_container(
        &mut self,
        id: &ContainerId,
        patch: &ContainerPositionPatch,
        orientation: Orientation,
    ) -> Result<(ContainerPosition, ContainerPosition), EditError> {
        let container = self
            .state
            .container_mut(id)
            .ok_or_else(|| EditError::container_not_found(id))?;
        let slot = container.position.get_mut(orientation);
        let before = *slot;
        let after = patch.apply(&before);
        *slot = after;

        self.notify(ChangeEvent::ContainerUpdated {
            id: id.clone(),
            orientation: Some(orientation),
        });
        Ok((before, after))
    }

    /// Apply a partial transform update to one orientation of an asset
    pub fn update_asset(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        patch: &AssetTransformPatch,
        orientation: Orientation,
    ) -> Result<AssetTransform, EditError> {
        let target = self
            .state
            .asset_mut(container, asset)
            .ok_or_else(|| EditError::asset_not_found(container, asset))?;
        let slot = target.transform.get_mut(orientation);
        let before = slot.clone();
        *slot = patch.apply(&before);

        self.notify(ChangeEvent::AssetUpdated {
            container: container.clone(),
            asset: asset.clone(),
            orientation: Some(orientation),
        });
        Ok(before)
    }

    /// Re-announce an asset without changing it, so dependents recompute
    pub fn touch_asset(&mut self, container: &ContainerId, asset: &AssetId, orientation: Orientation) {
        if self.state.asset(container, asset).is_some() {
            self.notify(ChangeEvent::AssetUpdated {
                container: container.clone(),
                asset: asset.clone(),
                orientation: Some(orientation),
            });
        }
    }

    /// Delete a container together with every descendant container and their assets.
    ///
    /// Returns the removed ids, the requested container first.
    pub fn delete_container(&mut self, id: &ContainerId) -> Result<Vec<ContainerId>, EditError> {
        self.state.require_container(id)?;
        let mut removed = vec![id.clone()];
        removed.extend(self.state.descendants(id));

        for container_id in removed.iter().rev() {
            self.state.containers.remove(container_id);
        }
        debug!("deleted container {} and {} descendants", id, removed.len() - 1);
        for container_id in &removed {
            self.notify(ChangeEvent::ContainerRemoved(container_id.clone()));
        }
        Ok(removed)
    }

    pub fn delete_asset(&mut self, container: &ContainerId, asset: &AssetId) -> Result<Asset, EditError> {
        let removed = self
            .state
            .container_mut(container)
            .and_then(|c| c.assets.remove(asset))
            .ok_or_else(|| EditError::asset_not_found(container, asset))?;
        self.notify(ChangeEvent::AssetRemoved {
            container: container.clone(),
            asset: asset.clone(),
        });
        Ok(removed)
    }

    /// Move an asset into another container, keeping its id.
    ///
    /// The moved asset's references are reset to its new container, since the old
    /// siblings are no longer reachable from there.
    pub fn transfer_asset(
        &mut self,
        from: &ContainerId,
        asset: &AssetId,
        to: &ContainerId,
        depth: i64,
    ) -> Result<(), EditError> {
        let target = self.state.require_container(to)?;
        if from != to && target.assets.contains_key(asset) {
            return Err(EditError::invalid_drop(format!(
                "container '{}' already holds an asset '{}'",
                target.name, asset
            )));
        }
        let mut moved = self
            .state
            .container_mut(from)
            .and_then(|c| c.assets.remove(asset))
            .ok_or_else(|| EditError::asset_not_found(from, asset))?;

        if from != to {
            for orientation in Orientation::ALL {
                moved.transform.get_mut(orientation).position.reference = Reference::Container;
            }
        }
        moved.depth = depth;

        if let Some(target) = self.state.container_mut(to) {
            target.assets.insert(asset.clone(), moved);
        }
        self.notify(ChangeEvent::AssetRemoved {
            container: from.clone(),
            asset: asset.clone(),
        });
        self.notify(ChangeEvent::AssetAdded {
            container: to.clone(),
            asset: asset.clone(),
        });
        Ok(())
    }

    pub fn set_asset_key(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        key: impl Into<String>,
    ) -> Result<(), EditError> {
        let target = self
            .state
            .asset_mut(container, asset)
            .ok_or_else(|| EditError::asset_not_found(container, asset))?;
        target.key = key.into();
        self.notify(ChangeEvent::AssetUpdated {
            container: container.clone(),
            asset: asset.clone(),
            orientation: None,
        });
        Ok(())
    }

    pub fn set_asset_name(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        name: impl Into<String>,
    ) -> Result<(), EditError> {
        let target = self
            .state
            .asset_mut(container, asset)
            .ok_or_else(|| EditError::asset_not_found(container, asset))?;
        target.name = name.into();
        self.notify(ChangeEvent::AssetUpdated {
            container: container.clone(),
            asset: asset.clone(),
            orientation: None,
        });
        Ok(())
    }

    pub fn set_asset_locked(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        locked: bool,
    ) -> Result<(), EditError> {
        let target = self
            .state
            .asset_mut(container, asset)
            .ok_or_else(|| EditError::asset_not_found(container, asset))?;
        target.is_locked = locked;
        self.notify(ChangeEvent::AssetUpdated {
            container: container.clone(),
            asset: asset.clone(),
            orientation: None,
        });
        Ok(())
    }

    pub fn set_asset_depth(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        depth: i64,
    ) -> Result<(), EditError> {
        let target = self
            .state
            .asset_mut(container, asset)
            .ok_or_else(|| EditError::asset_not_found(container, asset))?;
        target.depth = depth;
        self.notify(ChangeEvent::AssetUpdated {
            container: container.clone(),
            asset: asset.clone(),
            orientation: None,
        });
        Ok(())
    }

    pub fn set_container_name(
        &mut self,
        id: &ContainerId,
        name: impl Into<String>,
    ) -> Result<(), EditError> {
        self.edit_container(id, |c| c.name = name.into())
    }

    pub fn set_container_locked(&mut self, id: &ContainerId, locked: bool) -> Result<(), EditError> {
        self.edit_container(id, |c| c.is_locked = locked)
    }

    pub fn set_container_depth(&mut self, id: &ContainerId, depth: i64) -> Result<(), EditError> {
        self.edit_container(id, |c| c.depth = depth)
    }

    /// Re-parent a container. Callers must have ruled out cycles.
    pub fn set_container_parent(
        &mut self,
        id: &ContainerId,
        parent: Option<ContainerId>,
    ) -> Result<(), EditError> {
        self.edit_container(id, |c| c.parent_id = parent)
    }

    /// Deep-copy one orientation's geometry of a container and its unlocked assets
    /// onto the other
    pub fn copy_container_orientation(
        &mut self,
        id: &ContainerId,
        from: Orientation,
        to: Orientation,
    ) -> Result<(), EditError> {
        let container = self
            .state
            .container_mut(id)
            .ok_or_else(|| EditError::container_not_found(id))?;
        container.position.copy_across(from, to);
        for asset in container.assets.values_mut().filter(|a| !a.is_locked) {
            asset.transform.copy_across(from, to);
        }
        self.notify(ChangeEvent::ContainerUpdated {
            id: id.clone(),
            orientation: Some(to),
        });
        Ok(())
    }

    fn edit_container(
        &mut self,
        id: &ContainerId,
        edit: impl FnOnce(&mut Container),
    ) -> Result<(), EditError> {
        let container = self
            .state
            .container_mut(id)
            .ok_or_else(|| EditError::container_not_found(id))?;
        edit(container);
        self.notify(ChangeEvent::ContainerUpdated {
            id: id.clone(),
            orientation: None,
        });
        Ok(())
    }
}
