//! The editing session
//!
//! [`Editor`] ties the store, image library, history and drag state together.
//! Every public mutation follows the same path: lock guard, store mutation,
//! cascade, history commit. While a gesture is open, commits are held back and
//! the whole gesture becomes one history entry when it ends.

use log::{debug, info};

use crate::device::{DeviceProfile, DeviceRegistry};
use crate::error::{EditError, ImportError};
use crate::export::{self, LayoutArchive, LayoutDocument};
use crate::history::History;
use crate::layout::align::{self, compute_snap, container_snap_candidates};
use crate::layout::cascade::{self, CascadeReport};
use crate::layout::hierarchy::{self, build_layer_tree, outline};
use crate::layout::{
    find_similar, Alignment, AssetId, AssetTransformPatch, Axis, BoundingBox, ChangeEvent,
    ContainerId, ContainerPosition, ContainerPositionPatch, DragState, DropPosition,
    EditorConfig, GuideSource, LayerId, LayerNode, LayoutState, LayoutStore, Orientation,
    Reference, RelativeLayout, ResolvedAsset, ResolvedLayout, Resolver, SnapCandidate,
    SnapResult, SubscriptionId,
};
use crate::library::{AssetLibrary, LibraryError};
use crate::settings::Settings;

/// An editing session over one layout
#[derive(Debug)]
pub struct Editor {
    store: LayoutStore,
    library: AssetLibrary,
    history: History<LayoutState>,
    drag: DragState,
    devices: DeviceRegistry,
    device: DeviceProfile,
    config: EditorConfig,
    /// State before the open gesture
    gesture: Option<LayoutState>,
}

impl Default for Editor {
    fn default() -> Self {
        let devices = DeviceRegistry::builtin();
        let config = EditorConfig::default();
        let device = devices
            .get(&config.default_device)
            .or_else(|| devices.iter().next())
            .cloned()
            .unwrap_or_else(|| DeviceProfile::new("iphone-14", "iPhone 14", 390.0, 844.0));
        Self::with_device(config, devices, device)
    }
}

impl Editor {
    /// Create an empty session on `config.default_device`
    pub fn new(config: EditorConfig, devices: DeviceRegistry) -> Result<Self, EditError> {
        let device = lookup_device(&devices, &config.default_device)?.clone();
        Ok(Self::with_device(config, devices, device))
    }

    pub fn from_settings(settings: &Settings) -> Result<Self, EditError> {
        Self::new(settings.editor.clone(), settings.registry())
    }

    fn with_device(config: EditorConfig, devices: DeviceRegistry, device: DeviceProfile) -> Self {
        let store = LayoutStore::new();
        let history = History::new(store.state().clone(), config.history_limit);
        Self {
            store,
            library: AssetLibrary::new(),
            history,
            drag: DragState::default(),
            devices,
            device,
            config,
            gesture: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> &LayoutState {
        self.store.state()
    }

    pub fn library(&self) -> &AssetLibrary {
        &self.library
    }

    /// The library, for collaborators that track pending loads
    pub fn library_mut(&mut self) -> &mut AssetLibrary {
        &mut self.library
    }

    pub fn device(&self) -> &DeviceProfile {
        &self.device
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &History<LayoutState> {
        &self.history
    }

    pub fn drag_state(&self) -> &DragState {
        &self.drag
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&ChangeEvent) + 'static) -> SubscriptionId {
        self.store.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Switch the conversion basis; existing pixel positions are kept as they are
    pub fn set_device(&mut self, id: &str) -> Result<(), EditError> {
        let device = lookup_device(&self.devices, id)?.clone();
        info!("switching device from {} to {}", self.device.id, device.id);
        self.device = device;
        Ok(())
    }

    // ========================================================================
    // History
    // ========================================================================

    fn commit(&mut self, description: &str) {
        if self.gesture.is_some() {
            return;
        }
        let state = self.store.state();
        if self.history.current().map(|entry| &entry.state) == Some(state) {
            debug!("'{}' left the state unchanged; no history entry", description);
            return;
        }
        self.history.save(description, state.clone());
    }

    pub fn is_gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Hold back history commits until [`Editor::end_gesture`]
    pub fn begin_gesture(&mut self) {
        if self.gesture.is_none() {
            self.gesture = Some(self.store.state().clone());
        }
    }

    /// Close the gesture; returns true if it produced a history entry
    pub fn end_gesture(&mut self, description: &str) -> bool {
        let Some(before) = self.gesture.take() else {
            return false;
        };
        if &before == self.store.state() {
            return false;
        }
        self.history.save(description, self.store.state().clone());
        true
    }

    /// Roll back everything done since [`Editor::begin_gesture`]
    pub fn cancel_gesture(&mut self) {
        if let Some(before) = self.gesture.take() {
            self.store.replace_state(before);
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back; returns the description of the undone action
    pub fn undo(&mut self) -> Option<String> {
        self.end_gesture("Gesture");
        let description = self.history.undo_description()?.to_string();
        let state = self.history.undo()?.state.clone();
        self.store.replace_state(state);
        Some(description)
    }

    /// Step forward; returns the description of the redone action
    pub fn redo(&mut self) -> Option<String> {
        self.end_gesture("Gesture");
        let entry = self.history.redo()?;
        let description = entry.description.clone();
        let state = entry.state.clone();
        self.store.replace_state(state);
        Some(description)
    }

    // ========================================================================
    // Lock guards
    // ========================================================================

    fn guard_container(&self, id: &ContainerId) -> Result<(), EditError> {
        let container = self.state().require_container(id)?;
        if container.is_locked {
            return Err(EditError::locked(container.name.clone()));
        }
        Ok(())
    }

    fn guard_asset(&self, container: &ContainerId, asset: &AssetId) -> Result<(), EditError> {
        let found = self.state().require_asset(container, asset)?;
        if self.state().is_asset_locked(container, asset) {
            return Err(EditError::locked(found.name.clone()));
        }
        Ok(())
    }

    // ========================================================================
    // Containers
    // ========================================================================

    pub fn add_container(&mut self, parent: Option<&ContainerId>) -> Result<ContainerId, EditError> {
        if let Some(parent) = parent {
            self.guard_container(parent)?;
        }
        let id = self
            .store
            .add_container(parent, &self.device.frames(), &self.config)?;
        self.commit("Add container");
        Ok(id)
    }

    /// Apply a partial position and cascade to descendants
    pub fn update_container(
        &mut self,
        id: &ContainerId,
        patch: &ContainerPositionPatch,
        orientation: Orientation,
    ) -> Result<CascadeReport, EditError> {
        self.guard_container(id)?;
        let report = self.apply_container_patch(id, patch, orientation)?;
        self.commit("Update container");
        Ok(report)
    }

    fn apply_container_patch(
        &mut self,
        id: &ContainerId,
        patch: &ContainerPositionPatch,
        orientation: Orientation,
    ) -> Result<CascadeReport, EditError> {
        let (before, after) = self.store.update_container(id, patch, orientation)?;
        cascade::propagate_container_change(&mut self.store, id, orientation, &before, &after)
    }

    pub fn move_container_by(
        &mut self,
        id: &ContainerId,
        dx: f64,
        dy: f64,
        orientation: Orientation,
    ) -> Result<CascadeReport, EditError> {
        self.guard_container(id)?;
        let current = *self.state().require_container(id)?.position.get(orientation);
        let patch = ContainerPositionPatch::new()
            .with_x(current.x + dx)
            .with_y(current.y + dy);
        let report = self.apply_container_patch(id, &patch, orientation)?;
        self.commit("Move container");
        Ok(report)
    }

    /// Grow or shrink around the center; sizes never go below zero
    pub fn resize_container_by(
        &mut self,
        id: &ContainerId,
        dw: f64,
        dh: f64,
        orientation: Orientation,
    ) -> Result<CascadeReport, EditError> {
        self.guard_container(id)?;
        let current = *self.state().require_container(id)?.position.get(orientation);
        let patch = ContainerPositionPatch::new()
            .with_width((current.width + dw).max(0.0))
            .with_height((current.height + dh).max(0.0));
        let report = self.apply_container_patch(id, &patch, orientation)?;
        self.commit("Resize container");
        Ok(report)
    }

    pub fn rename_container(&mut self, id: &ContainerId, name: &str) -> Result<(), EditError> {
        self.guard_container(id)?;
        self.store.set_container_name(id, name)?;
        self.commit("Rename container");
        Ok(())
    }

    /// Delete a container and its whole subtree; refused if anything in it is locked
    pub fn delete_container(&mut self, id: &ContainerId) -> Result<Vec<ContainerId>, EditError> {
        self.state().require_container(id)?;
        let subtree = std::iter::once(id.clone()).chain(self.state().descendants(id));
        for member in subtree {
            self.guard_container(&member)?;
            let container = self.state().require_container(&member)?;
            if let Some(locked) = container.assets.values().find(|a| a.is_locked) {
                return Err(EditError::locked(locked.name.clone()));
            }
        }
        let removed = self.store.delete_container(id)?;
        self.commit("Delete container");
        Ok(removed)
    }

    /// Flip the lock; always allowed. Returns the new value.
    pub fn toggle_container_lock(&mut self, id: &ContainerId) -> Result<bool, EditError> {
        let locked = !self.state().require_container(id)?.is_locked;
        self.store.set_container_locked(id, locked)?;
        self.commit(if locked { "Lock container" } else { "Unlock container" });
        Ok(locked)
    }

    // ========================================================================
    // Assets
    // ========================================================================

    pub fn add_asset(&mut self, container: &ContainerId) -> Result<AssetId, EditError> {
        self.guard_container(container)?;
        let id = self.store.add_asset(container, &self.config)?;
        self.commit("Add asset");
        Ok(id)
    }

    fn validate_reference(
        &self,
        container: &ContainerId,
        asset: &AssetId,
        patch: &AssetTransformPatch,
    ) -> Result<(), EditError> {
        let Some(Reference::Asset(target)) = &patch.reference else {
            return Ok(());
        };
        if target == asset {
            return Err(EditError::invalid_reference(asset, "an asset cannot reference itself"));
        }
        if self.state().asset(container, target).is_none() {
            return Err(EditError::invalid_reference(
                asset,
                format!("'{}' is not an asset of the same container", target),
            ));
        }
        Ok(())
    }

    /// Apply a partial transform and re-notify dependents
    pub fn update_asset(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        patch: &AssetTransformPatch,
        orientation: Orientation,
    ) -> Result<CascadeReport, EditError> {
        self.guard_asset(container, asset)?;
        self.validate_reference(container, asset, patch)?;
        let report = self.apply_asset_patch(container, asset, patch, orientation)?;
        self.commit("Update asset");
        Ok(report)
    }

    fn apply_asset_patch(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        patch: &AssetTransformPatch,
        orientation: Orientation,
    ) -> Result<CascadeReport, EditError> {
        self.store.update_asset(container, asset, patch, orientation)?;
        Ok(cascade::propagate_asset_change(
            &mut self.store,
            container,
            asset,
            orientation,
        ))
    }

    /// Pixel deltas converted into fractions of the asset's reference basis
    pub fn move_asset_by(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        dx: f64,
        dy: f64,
        orientation: Orientation,
    ) -> Result<CascadeReport, EditError> {
        self.guard_asset(container, asset)?;
        let basis = self.reference_basis(container, asset, orientation)?;
        let current = &self.state().require_asset(container, asset)?.transform.get(orientation).position;
        let patch = AssetTransformPatch::new()
            .with_position(current.x + dx / basis.width, current.y + dy / basis.height);
        let report = self.apply_asset_patch(container, asset, &patch, orientation)?;
        self.commit("Move asset");
        Ok(report)
    }

    pub fn resize_asset_by(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        dw: f64,
        dh: f64,
        orientation: Orientation,
    ) -> Result<CascadeReport, EditError> {
        self.guard_asset(container, asset)?;
        let basis = self.reference_basis(container, asset, orientation)?;
        let current = self.state().require_asset(container, asset)?.transform.get(orientation).size;
        let patch = AssetTransformPatch::new().with_size(
            (current.width + dw / basis.width).max(0.0),
            (current.height + dh / basis.height).max(0.0),
        );
        let report = self.apply_asset_patch(container, asset, &patch, orientation)?;
        self.commit("Resize asset");
        Ok(report)
    }

    fn reference_basis(
        &self,
        container: &ContainerId,
        asset: &AssetId,
        orientation: Orientation,
    ) -> Result<crate::layout::Size, EditError> {
        let mut resolver = Resolver::new(self.state(), &self.library, orientation);
        match resolver.reference_frame(container, asset) {
            Some(frame) if !frame.size.is_degenerate() => Ok(frame.size),
            Some(_) => Err(EditError::invalid_reference(asset, "reference has zero size")),
            None => Err(EditError::invalid_reference(asset, "reference is unresolved")),
        }
    }

    pub fn update_asset_key(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        key: &str,
    ) -> Result<(), EditError> {
        self.guard_asset(container, asset)?;
        self.store.set_asset_key(container, asset, key)?;
        for orientation in Orientation::ALL {
            cascade::propagate_asset_change(&mut self.store, container, asset, orientation);
        }
        self.commit("Change image");
        Ok(())
    }

    pub fn rename_asset(&mut self, container: &ContainerId, asset: &AssetId, name: &str) -> Result<(), EditError> {
        self.guard_asset(container, asset)?;
        self.store.set_asset_name(container, asset, name)?;
        self.commit("Rename asset");
        Ok(())
    }

    /// Flip visibility in one orientation; returns the new value
    pub fn toggle_visibility(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        orientation: Orientation,
    ) -> Result<bool, EditError> {
        self.guard_asset(container, asset)?;
        let visible = !self.state().require_asset(container, asset)?.transform.get(orientation).visible();
        let patch = AssetTransformPatch::new().with_visible(visible);
        self.apply_asset_patch(container, asset, &patch, orientation)?;
        self.commit(if visible { "Show asset" } else { "Hide asset" });
        Ok(visible)
    }

    /// Flip the asset's own lock; always allowed. Returns the new value.
    pub fn toggle_asset_lock(&mut self, container: &ContainerId, asset: &AssetId) -> Result<bool, EditError> {
        let locked = !self.state().require_asset(container, asset)?.is_locked;
        self.store.set_asset_locked(container, asset, locked)?;
        self.commit(if locked { "Lock asset" } else { "Unlock asset" });
        Ok(locked)
    }

    pub fn delete_asset(&mut self, container: &ContainerId, asset: &AssetId) -> Result<(), EditError> {
        self.guard_asset(container, asset)?;
        let dependents = cascade::asset_dependents(self.state(), container, asset);
        self.store.delete_asset(container, asset)?;
        for dependent in &dependents {
            for orientation in Orientation::ALL {
                self.store.touch_asset(container, dependent, orientation);
            }
        }
        self.commit("Delete asset");
        Ok(())
    }

    // ========================================================================
    // Orientation copy
    // ========================================================================

    /// Copy every unlocked container and asset from one orientation to the other
    pub fn copy_orientation(&mut self, from: Orientation, to: Orientation) -> Result<(), EditError> {
        if from == to {
            return Ok(());
        }
        let mut ids: Vec<ContainerId> = self
            .state()
            .containers
            .values()
            .filter(|c| !c.is_locked)
            .map(|c| c.id.clone())
            .collect();
        ids.sort();
        for id in &ids {
            self.store.copy_container_orientation(id, from, to)?;
        }
        self.commit(&format!("Copy {} to {}", from, to));
        Ok(())
    }

    /// Copy one container subtree; locked members are left as they are
    pub fn copy_container_orientation(
        &mut self,
        id: &ContainerId,
        from: Orientation,
        to: Orientation,
    ) -> Result<(), EditError> {
        self.guard_container(id)?;
        if from == to {
            return Ok(());
        }
        let subtree: Vec<ContainerId> = std::iter::once(id.clone())
            .chain(self.state().descendants(id))
            .collect();
        for member in &subtree {
            if !self.state().is_container_locked(member) {
                self.store.copy_container_orientation(member, from, to)?;
            }
        }
        self.commit(&format!("Copy {} to {}", from, to));
        Ok(())
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// An image finished loading elsewhere. Completions for keys no asset uses
    /// anymore are ignored; returns whether the completion was applied.
    pub fn image_loaded(&mut self, key: &str, width: u32, height: u32) -> bool {
        let users = self.state().assets_with_key(key);
        if users.is_empty() {
            debug!("ignoring late image completion for unused key '{}'", key);
            return false;
        }
        self.library.complete(key, width, height);
        self.touch_image_users(&users);
        true
    }

    /// Register decoded PNG bytes under `key`
    pub fn insert_image_png(&mut self, key: &str, bytes: Vec<u8>) -> Result<bool, LibraryError> {
        let users = self.state().assets_with_key(key);
        if users.is_empty() {
            debug!("ignoring image bytes for unused key '{}'", key);
            return Ok(false);
        }
        self.library.insert_png(key, bytes)?;
        self.touch_image_users(&users);
        Ok(true)
    }

    fn touch_image_users(&mut self, users: &[(ContainerId, AssetId)]) {
        for (container, asset) in users {
            for orientation in Orientation::ALL {
                self.store.touch_asset(container, asset, orientation);
                cascade::propagate_asset_change(&mut self.store, container, asset, orientation);
            }
        }
    }

    // ========================================================================
    // Resolution, snapping and alignment
    // ========================================================================

    pub fn resolve(&self, orientation: Orientation) -> ResolvedLayout {
        Resolver::new(self.state(), &self.library, orientation).resolve_all()
    }

    pub fn resolve_asset(
        &self,
        container: &ContainerId,
        asset: &AssetId,
        orientation: Orientation,
    ) -> Option<ResolvedAsset> {
        Resolver::new(self.state(), &self.library, orientation).resolve_asset(container, asset)
    }

    /// Guides for a container being dragged to `proposed`
    pub fn snap_container(
        &self,
        id: &ContainerId,
        proposed: &ContainerPosition,
        orientation: Orientation,
    ) -> SnapResult {
        let candidates =
            container_snap_candidates(self.state(), id, orientation, self.device.frame(orientation));
        compute_snap(&proposed.bounds(), &candidates, self.config.snap_threshold)
    }

    /// Guides for an asset whose displayed box is being dragged to `proposed`
    pub fn snap_asset(
        &self,
        container: &ContainerId,
        asset: &AssetId,
        proposed: &BoundingBox,
        orientation: Orientation,
    ) -> SnapResult {
        let mut candidates = Vec::new();
        if let Some(owner) = self.state().container(container) {
            candidates.push(SnapCandidate {
                source: GuideSource::Container(container.clone()),
                bounds: owner.position.get(orientation).bounds(),
            });
            let mut resolver = Resolver::new(self.state(), &self.library, orientation);
            let mut siblings: Vec<&AssetId> = owner.assets.keys().filter(|a| *a != asset).collect();
            siblings.sort();
            for sibling in siblings {
                if let Some(resolved) = resolver.resolve_asset(container, sibling) {
                    candidates.push(SnapCandidate {
                        source: GuideSource::Asset(container.clone(), sibling.clone()),
                        bounds: resolved.visual_bounds(),
                    });
                }
            }
        }
        let frame = self.device.frame(orientation);
        candidates.push(SnapCandidate {
            source: GuideSource::DeviceFrame,
            bounds: BoundingBox::new(0.0, 0.0, frame.width, frame.height),
        });
        compute_snap(proposed, &candidates, self.config.snap_threshold)
    }

    /// Align against the parent's box, or the device frame at the root
    pub fn align_container(
        &mut self,
        id: &ContainerId,
        alignment: Alignment,
        orientation: Orientation,
    ) -> Result<CascadeReport, EditError> {
        self.guard_container(id)?;
        let container = self.state().require_container(id)?;
        let reference = match container.parent_id.as_ref().and_then(|p| self.state().container(p)) {
            Some(parent) => parent.position.get(orientation).bounds(),
            None => {
                let frame = self.device.frame(orientation);
                BoundingBox::new(0.0, 0.0, frame.width, frame.height)
            }
        };
        let aligned = align::align_position(container.position.get(orientation), &reference, alignment);
        let patch = match alignment.axis() {
            Axis::X => ContainerPositionPatch::new().with_x(aligned.x),
            Axis::Y => ContainerPositionPatch::new().with_y(aligned.y),
        };
        let report = self.apply_container_patch(id, &patch, orientation)?;
        self.commit("Align container");
        Ok(report)
    }

    /// Align an asset's displayed box against its reference's box
    pub fn align_asset(
        &mut self,
        container: &ContainerId,
        asset: &AssetId,
        alignment: Alignment,
        orientation: Orientation,
    ) -> Result<CascadeReport, EditError> {
        self.guard_asset(container, asset)?;
        let unresolved = || EditError::invalid_reference(asset, "asset or its reference is unresolved");

        let mut resolver = Resolver::new(self.state(), &self.library, orientation);
        let resolved = resolver.resolve_asset(container, asset).ok_or_else(unresolved)?;
        let frame = resolver.reference_frame(container, asset).ok_or_else(unresolved)?;
        let offset = align::align_asset_offset(&resolved, &frame, alignment).ok_or_else(unresolved)?;

        let position = &self.state().require_asset(container, asset)?.transform.get(orientation).position;
        let patch = match alignment.axis() {
            Axis::X => AssetTransformPatch::new().with_position(offset, position.y),
            Axis::Y => AssetTransformPatch::new().with_position(position.x, offset),
        };
        let report = self.apply_asset_patch(container, asset, &patch, orientation)?;
        self.commit("Align asset");
        Ok(report)
    }

    // ========================================================================
    // Layer tree and drag-drop
    // ========================================================================

    pub fn layer_tree(&self, orientation: Orientation) -> Vec<LayerNode> {
        build_layer_tree(self.state(), orientation)
    }

    pub fn layer_outline(&self, orientation: Orientation) -> String {
        outline(&self.layer_tree(orientation))
    }

    pub fn drag_start(&mut self, source: LayerId) -> Result<(), EditError> {
        self.drag.start(self.store.state(), source)
    }

    /// Hover `target`; `None` means the drop would be rejected
    pub fn drag_over(&mut self, target: LayerId, position: DropPosition) -> Option<DropPosition> {
        self.drag.update_target(self.store.state(), target, position)
    }

    pub fn drag_leave(&mut self) {
        self.drag.clear_target();
    }

    /// Finish the drag. Returns false when there was no valid target.
    pub fn drag_drop(&mut self) -> Result<bool, EditError> {
        let Some((source, target, position)) = self.drag.take_drop() else {
            return Ok(false);
        };
        let before = self.store.state().clone();
        if let Err(err) = hierarchy::apply_drop(
            &mut self.store,
            &source,
            &target,
            position,
            self.config.depth_step,
        ) {
            self.store.replace_state(before);
            return Err(err);
        }
        self.commit("Reorder layers");
        Ok(true)
    }

    pub fn drag_cancel(&mut self) {
        self.drag.cancel();
    }

    // ========================================================================
    // Relative layout
    // ========================================================================

    /// Solve a relative layout and apply the results through the normal update path
    pub fn apply_relative_layout(
        &mut self,
        layout: &RelativeLayout,
        orientation: Orientation,
    ) -> Result<(), EditError> {
        for entry in &layout.entries {
            self.guard_container(&entry.container)?;
        }
        let positions = layout.resolve(self.state(), self.device.frame(orientation), orientation)?;

        // ancestors first, so a parent's cascade never overwrites a solved child
        let mut ordered: Vec<(&ContainerId, &ContainerPosition)> = positions.iter().collect();
        ordered.sort_by_key(|(id, _)| (self.nesting_level(id), (*id).clone()));

        let before = self.store.state().clone();
        for (id, position) in ordered {
            let patch = ContainerPositionPatch::replace(*position);
            if let Err(err) = self.apply_container_patch(id, &patch, orientation) {
                self.store.replace_state(before);
                return Err(err);
            }
        }
        self.commit("Apply relative layout");
        Ok(())
    }

    fn nesting_level(&self, id: &ContainerId) -> usize {
        let mut level = 0;
        let mut current = self.state().container(id).and_then(|c| c.parent_id.as_ref());
        while let Some(parent) = current {
            level += 1;
            if level > self.state().containers.len() {
                break;
            }
            current = self.state().container(parent).and_then(|c| c.parent_id.as_ref());
        }
        level
    }

    // ========================================================================
    // Export and import
    // ========================================================================

    pub fn export_document(&self) -> LayoutDocument {
        export::export_layout(self.state(), &self.device)
    }

    pub fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.export_document())
    }

    pub fn export_archive(&self) -> Result<LayoutArchive, serde_json::Error> {
        export::export_archive(self.state(), &self.library, &self.device)
    }

    /// Replace the layout with an archive's contents as one history entry.
    /// Nothing changes if the archive is rejected.
    pub fn import_archive(&mut self, archive: &LayoutArchive) -> Result<(), ImportError> {
        let imported = export::import_archive(archive, &self.device)?;
        if let Some(recorded) = imported.device.as_deref().filter(|d| *d != self.device.id) {
            info!(
                "layout was exported for {}; positions are computed for {}",
                recorded, self.device.id
            );
        }
        self.end_gesture("Gesture");
        self.drag.cancel();
        for (key, entry) in imported.images {
            self.library.insert(key, entry);
        }
        self.store.replace_state(imported.state);
        self.commit("Import layout");
        Ok(())
    }
}

fn lookup_device<'a>(devices: &'a DeviceRegistry, id: &str) -> Result<&'a DeviceProfile, EditError> {
    devices.get(id).ok_or_else(|| {
        let ids = devices.ids();
        EditError::UnknownDevice {
            id: id.to_string(),
            suggestions: find_similar(ids.iter().map(|s| s.as_str()), id, 2),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Edge;
    use crate::layout::{Gap, RelativeEntry, RelativePosition, Size};
    use crate::library::tests::blank_png;
    use pretty_assertions::assert_eq;

    fn editor() -> Editor {
        Editor::default()
    }

    fn place(editor: &mut Editor, id: &ContainerId, x: f64, y: f64, w: f64, h: f64) {
        editor
            .update_container(
                id,
                &ContainerPositionPatch::replace(ContainerPosition::new(x, y, w, h)),
                Orientation::Portrait,
            )
            .unwrap();
    }

    fn pos(editor: &Editor, id: &ContainerId) -> ContainerPosition {
        *editor.state().containers[id].position.get(Orientation::Portrait)
    }

    #[test]
    fn test_default_device() {
        let editor = editor();
        assert_eq!(editor.device().id, "iphone-14");
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_unknown_device_suggests() {
        let mut editor = editor();
        match editor.set_device("iphone-15") {
            Err(EditError::UnknownDevice { suggestions, .. }) => {
                assert!(suggestions.contains(&"iphone-14".to_string()))
            }
            other => panic!("expected UnknownDevice, got {:?}", other),
        }
        assert_eq!(editor.device().id, "iphone-14");
    }

    #[test]
    fn test_move_cascades_to_children() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        let b = editor.add_container(Some(&a)).unwrap();
        place(&mut editor, &a, 100.0, 100.0, 200.0, 100.0);
        place(&mut editor, &b, 100.0, 100.0, 100.0, 50.0);

        editor.move_container_by(&a, 20.0, -10.0, Orientation::Portrait).unwrap();
        assert_eq!(pos(&editor, &a), ContainerPosition::new(120.0, 90.0, 200.0, 100.0));
        assert_eq!(pos(&editor, &b), ContainerPosition::new(120.0, 90.0, 100.0, 50.0));
    }

    #[test]
    fn test_locked_container_rejects_edits() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        let asset = editor.add_asset(&a).unwrap();
        assert!(editor.toggle_container_lock(&a).unwrap());
        let before = editor.state().clone();

        assert!(matches!(
            editor.move_container_by(&a, 1.0, 1.0, Orientation::Portrait),
            Err(EditError::Locked { .. })
        ));
        assert!(matches!(
            editor.toggle_visibility(&a, &asset, Orientation::Portrait),
            Err(EditError::Locked { .. })
        ));
        assert!(matches!(editor.add_asset(&a), Err(EditError::Locked { .. })));
        assert!(matches!(editor.delete_container(&a), Err(EditError::Locked { .. })));
        assert_eq!(editor.state(), &before);
    }

    #[test]
    fn test_reference_validation() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        let b = editor.add_container(None).unwrap();
        let x = editor.add_asset(&a).unwrap();
        let y = editor.add_asset(&b).unwrap();

        let to_self = AssetTransformPatch::new().with_reference(Reference::Asset(x.clone()));
        assert!(matches!(
            editor.update_asset(&a, &x, &to_self, Orientation::Portrait),
            Err(EditError::InvalidReference { .. })
        ));
        let to_other = AssetTransformPatch::new().with_reference(Reference::Asset(y));
        assert!(matches!(
            editor.update_asset(&a, &x, &to_other, Orientation::Portrait),
            Err(EditError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_gesture_commits_once() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        let entries = editor.history().len();

        editor.begin_gesture();
        for _ in 0..5 {
            editor.move_container_by(&a, 2.0, 0.0, Orientation::Portrait).unwrap();
        }
        assert!(editor.end_gesture("Drag container"));
        assert_eq!(editor.history().len(), entries + 1);

        editor.undo();
        assert_eq!(pos(&editor, &a).x, 195.0);
    }

    #[test]
    fn test_cancel_gesture_restores() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        let before = editor.state().clone();
        editor.begin_gesture();
        editor.move_container_by(&a, 40.0, 0.0, Orientation::Portrait).unwrap();
        editor.cancel_gesture();
        assert_eq!(editor.state(), &before);
        assert!(!editor.end_gesture("nothing"));
    }

    #[test]
    fn test_move_asset_by_uses_container_basis() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        place(&mut editor, &a, 200.0, 200.0, 200.0, 100.0);
        let asset = editor.add_asset(&a).unwrap();

        editor.move_asset_by(&a, &asset, 50.0, 25.0, Orientation::Portrait).unwrap();
        let position = &editor.state().containers[&a].assets[&asset].transform.portrait.position;
        assert_eq!((position.x, position.y), (0.25, 0.25));
    }

    #[test]
    fn test_move_asset_by_unresolved_reference() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        let x = editor.add_asset(&a).unwrap();
        let y = editor.add_asset(&a).unwrap();
        editor
            .update_asset(
                &a,
                &x,
                &AssetTransformPatch::new().with_reference(Reference::Asset(y)),
                Orientation::Portrait,
            )
            .unwrap();
        // y has no loaded image, so x has no basis
        assert!(matches!(
            editor.move_asset_by(&a, &x, 5.0, 5.0, Orientation::Portrait),
            Err(EditError::InvalidReference { .. })
        ));
    }

    #[test]
    fn test_late_image_for_unused_key_is_ignored() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        let asset = editor.add_asset(&a).unwrap();
        editor.update_asset_key(&a, &asset, "logo").unwrap();

        assert!(!editor.image_loaded("gone", 10, 10));
        assert!(editor.library().get("gone").is_none());
        assert!(editor.image_loaded("logo", 10, 10));
        assert!(editor.resolve_asset(&a, &asset, Orientation::Portrait).is_some());
    }

    #[test]
    fn test_copy_orientation_is_independent() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        place(&mut editor, &a, 10.0, 20.0, 30.0, 40.0);
        editor.copy_orientation(Orientation::Portrait, Orientation::Landscape).unwrap();
        assert_eq!(
            editor.state().containers[&a].position.landscape,
            ContainerPosition::new(10.0, 20.0, 30.0, 40.0)
        );

        editor.move_container_by(&a, 5.0, 0.0, Orientation::Portrait).unwrap();
        assert_eq!(editor.state().containers[&a].position.landscape.x, 10.0);
    }

    #[test]
    fn test_align_container_at_root_uses_device_frame() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        place(&mut editor, &a, 30.0, 70.0, 40.0, 20.0);
        editor.align_container(&a, Alignment::Left, Orientation::Portrait).unwrap();
        assert_eq!(pos(&editor, &a), ContainerPosition::new(20.0, 70.0, 40.0, 20.0));
    }

    #[test]
    fn test_center_nested_container_touches_only_x() {
        let mut editor = editor();
        let parent = editor.add_container(None).unwrap();
        let child = editor.add_container(Some(&parent)).unwrap();
        place(&mut editor, &parent, 200.0, 300.0, 200.0, 100.0);
        place(&mut editor, &child, 150.0, 320.0, 40.0, 20.0);

        editor.align_container(&child, Alignment::Center, Orientation::Portrait).unwrap();
        assert_eq!(pos(&editor, &child), ContainerPosition::new(200.0, 320.0, 40.0, 20.0));
    }

    #[test]
    fn test_hiding_asset_notifies_its_dependents() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut editor = editor();
        let c = editor.add_container(None).unwrap();
        let base = editor.add_asset(&c).unwrap();
        let follower = editor.add_asset(&c).unwrap();
        let patch = AssetTransformPatch::new().with_reference(Reference::Asset(base.clone()));
        editor.update_asset(&c, &follower, &patch, Orientation::Portrait).unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        editor.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        editor.toggle_visibility(&c, &base, Orientation::Portrait).unwrap();

        assert!(events.borrow().contains(&ChangeEvent::AssetUpdated {
            container: c.clone(),
            asset: follower.clone(),
            orientation: Some(Orientation::Portrait),
        }));
    }

    #[test]
    fn test_align_asset_right() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        place(&mut editor, &a, 200.0, 200.0, 200.0, 100.0);
        let asset = editor.add_asset(&a).unwrap();
        editor.update_asset_key(&a, &asset, "img").unwrap();
        editor.image_loaded("img", 100, 100);
        editor
            .update_asset(
                &a,
                &asset,
                &AssetTransformPatch::new().with_size(0.25, 0.5).with_maintain_aspect_ratio(false),
                Orientation::Portrait,
            )
            .unwrap();

        editor.align_asset(&a, &asset, Alignment::Right, Orientation::Portrait).unwrap();
        let resolved = editor.resolve_asset(&a, &asset, Orientation::Portrait).unwrap();
        assert_eq!(resolved.bounds.right(), 300.0);
    }

    #[test]
    fn test_failed_drop_is_noop() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        let b = editor.add_container(Some(&a)).unwrap();
        let before = editor.state().clone();

        editor.drag_start(LayerId::Container(a.clone())).unwrap();
        assert_eq!(editor.drag_over(LayerId::Container(b), DropPosition::Inside), None);
        assert!(!editor.drag_drop().unwrap());
        assert_eq!(editor.state(), &before);
    }

    #[test]
    fn test_relative_layout_applies_with_history() {
        let mut editor = editor();
        let a = editor.add_container(None).unwrap();
        let entries = editor.history().len();

        let layout = RelativeLayout::new().with_entry(
            RelativeEntry::new(a.clone(), Size::new(100.0, 50.0))
                .with_horizontal(RelativePosition::screen(Edge::Left, Gap::px(10.0)))
                .with_vertical(RelativePosition::screen(Edge::Top, Gap::px(20.0))),
        );
        editor.apply_relative_layout(&layout, Orientation::Portrait).unwrap();
        let placed = pos(&editor, &a);
        assert!((placed.x - 60.0).abs() < 1e-6);
        assert!((placed.y - 45.0).abs() < 1e-6);
        assert_eq!(editor.history().len(), entries + 1);
    }

    #[test]
    fn test_import_is_one_history_entry() {
        let mut source = editor();
        let a = source.add_container(None).unwrap();
        let asset = source.add_asset(&a).unwrap();
        source.update_asset_key(&a, &asset, "logo").unwrap();
        source.insert_image_png("logo", blank_png(8, 4)).unwrap();
        let archive = source.export_archive().unwrap();

        let mut target = editor();
        target.import_archive(&archive).unwrap();
        assert_eq!(target.history().len(), 2);
        assert_eq!(target.state().containers.len(), 1);
        assert_eq!(target.library().get("logo").map(|e| (e.width, e.height)), Some((8, 4)));

        target.undo();
        assert!(target.state().containers.is_empty());
    }
}
