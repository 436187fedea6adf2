//! Cascading updates after a container or asset changes
//!
//! Dependents are computed on demand from the current state: child containers via
//! `parent_id`, and assets via "references me" edges inside one container. Each
//! cascade is a breadth-first worklist that runs to completion inside the
//! triggering mutation.
//!
//! Only position deltas cascade. Container sizes are never inherited, and
//! container-relative assets keep their fractions; they are re-notified so
//! readers recompute their resolved boxes.

use std::collections::{HashSet, VecDeque};

use log::debug;

use crate::error::EditError;

use super::store::{LayoutState, LayoutStore};
use super::types::{AssetId, ContainerId, ContainerPosition, ContainerPositionPatch, Orientation, Reference};

/// Elements touched by one cascade
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CascadeReport {
    /// Descendant containers translated, breadth-first
    pub moved_containers: Vec<ContainerId>,
    /// Assets re-notified without their own data changing
    pub touched_assets: Vec<(ContainerId, AssetId)>,
}

impl CascadeReport {
    pub fn is_empty(&self) -> bool {
        self.moved_containers.is_empty() && self.touched_assets.is_empty()
    }

    fn merge(&mut self, other: CascadeReport) {
        self.moved_containers.extend(other.moved_containers);
        self.touched_assets.extend(other.touched_assets);
    }
}

/// Assets of `container` that reference `asset` directly or transitively
pub fn asset_dependents(state: &LayoutState, container: &ContainerId, asset: &AssetId) -> Vec<AssetId> {
    let Some(owner) = state.container(container) else {
        return Vec::new();
    };

    let mut order = Vec::new();
    let mut seen: HashSet<&AssetId> = HashSet::from([asset]);
    let mut queue: VecDeque<&AssetId> = VecDeque::from([asset]);

    while let Some(current) = queue.pop_front() {
        let mut direct: Vec<&AssetId> = owner
            .assets
            .values()
            .filter(|a| {
                Orientation::ALL.iter().any(|o| {
                    a.transform.get(*o).position.reference.asset_id() == Some(current)
                })
            })
            .map(|a| &a.id)
            .collect();
        direct.sort();

        for dependent in direct {
            if seen.insert(dependent) {
                order.push(dependent.clone());
                queue.push_back(dependent);
            }
        }
    }
    order
}

/// Container-relative assets of `container` and everything that references them
fn container_relative_closure(state: &LayoutState, container: &ContainerId) -> Vec<AssetId> {
    let Some(owner) = state.container(container) else {
        return Vec::new();
    };
    let mut roots: Vec<&AssetId> = owner
        .assets
        .values()
        .filter(|a| {
            Orientation::ALL
                .iter()
                .any(|o| a.transform.get(*o).position.reference == Reference::Container)
        })
        .map(|a| &a.id)
        .collect();
    roots.sort();

    let mut seen: HashSet<AssetId> = HashSet::new();
    let mut order = Vec::new();
    for root in roots {
        if seen.insert(root.clone()) {
            order.push(root.clone());
        }
        for dependent in asset_dependents(state, container, root) {
            if seen.insert(dependent.clone()) {
                order.push(dependent);
            }
        }
    }
    order
}

/// Re-notify the assets resolved through `container`'s box
pub fn touch_container_assets(
    store: &mut LayoutStore,
    container: &ContainerId,
    orientation: Orientation,
) -> Vec<(ContainerId, AssetId)> {
    let affected = container_relative_closure(store.state(), container);
    affected
        .into_iter()
        .map(|asset| {
            store.touch_asset(container, &asset, orientation);
            (container.clone(), asset)
        })
        .collect()
}

/// Translate every descendant of `id` by the same delta in one orientation
pub fn translate_descendants(
    store: &mut LayoutStore,
    id: &ContainerId,
    orientation: Orientation,
    dx: f64,
    dy: f64,
) -> Result<CascadeReport, EditError> {
    let mut report = CascadeReport::default();
    if dx == 0.0 && dy == 0.0 {
        return Ok(report);
    }

    for descendant in store.state().descendants(id) {
        let current = store.state().require_container(&descendant)?.position.get(orientation).translated(dx, dy);
        let patch = ContainerPositionPatch::new().with_x(current.x).with_y(current.y);
        store.update_container(&descendant, &patch, orientation)?;
        report.touched_assets.extend(touch_container_assets(store, &descendant, orientation));
        report.moved_containers.push(descendant);
    }
    Ok(report)
}

/// Cascade a container geometry change from `before` to `after`
pub fn propagate_container_change(
    store: &mut LayoutStore,
    id: &ContainerId,
    orientation: Orientation,
    before: &ContainerPosition,
    after: &ContainerPosition,
) -> Result<CascadeReport, EditError> {
    let mut report = CascadeReport::default();
    if before == after {
        return Ok(report);
    }

    report.touched_assets.extend(touch_container_assets(store, id, orientation));
    report.merge(translate_descendants(
        store,
        id,
        orientation,
        after.x - before.x,
        after.y - before.y,
    )?);

    debug!(
        "cascade from container {} ({}): {} containers moved, {} assets touched",
        id,
        orientation,
        report.moved_containers.len(),
        report.touched_assets.len()
    );
    Ok(report)
}

/// Re-notify every asset that depends on `asset`
pub fn propagate_asset_change(
    store: &mut LayoutStore,
    container: &ContainerId,
    asset: &AssetId,
    orientation: Orientation,
) -> CascadeReport {
    let dependents = asset_dependents(store.state(), container, asset);
    let mut report = CascadeReport::default();
    for dependent in dependents {
        store.touch_asset(container, &dependent, orientation);
        report.touched_assets.push((container.clone(), dependent));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::config::EditorConfig;
    use crate::layout::types::{AssetTransformPatch, PerOrientation, Size};

    fn frame() -> PerOrientation<Size> {
        PerOrientation::new(Size::new(400.0, 800.0), Size::new(800.0, 400.0))
    }

    fn reference(store: &mut LayoutStore, c: &ContainerId, asset: &AssetId, target: &AssetId) {
        let patch = AssetTransformPatch::new().with_reference(Reference::Asset(target.clone()));
        store.update_asset(c, asset, &patch, Orientation::Portrait).unwrap();
    }

    #[test]
    fn test_translate_descendants_moves_whole_subtree() {
        let config = EditorConfig::default();
        let mut store = LayoutStore::new();
        let a = store.add_container(None, &frame(), &config).unwrap();
        let b = store.add_container(Some(&a), &frame(), &config).unwrap();
        let c = store.add_container(Some(&b), &frame(), &config).unwrap();
        let landscape_before = store.state().container(&c).unwrap().position.landscape;

        let report = translate_descendants(&mut store, &a, Orientation::Portrait, 20.0, -10.0).unwrap();
        assert_eq!(report.moved_containers, vec![b.clone(), c.clone()]);

        let moved = store.state().container(&c).unwrap();
        assert_eq!(moved.position.portrait.x, 220.0);
        assert_eq!(moved.position.portrait.y, 390.0);
        assert_eq!(moved.position.landscape, landscape_before);
    }

    #[test]
    fn test_asset_dependents_are_transitive() {
        let config = EditorConfig::default();
        let mut store = LayoutStore::new();
        let c = store.add_container(None, &frame(), &config).unwrap();
        let base = store.add_asset(&c, &config).unwrap();
        let mid = store.add_asset(&c, &config).unwrap();
        let top = store.add_asset(&c, &config).unwrap();
        let other = store.add_asset(&c, &config).unwrap();
        reference(&mut store, &c, &mid, &base);
        reference(&mut store, &c, &top, &mid);

        let dependents = asset_dependents(store.state(), &c, &base);
        assert_eq!(dependents, vec![mid.clone(), top.clone()]);
        assert!(!dependents.contains(&other));
    }

    #[test]
    fn test_asset_dependents_terminate_on_cycle() {
        let config = EditorConfig::default();
        let mut store = LayoutStore::new();
        let c = store.add_container(None, &frame(), &config).unwrap();
        let a = store.add_asset(&c, &config).unwrap();
        let b = store.add_asset(&c, &config).unwrap();
        reference(&mut store, &c, &a, &b);
        reference(&mut store, &c, &b, &a);

        assert_eq!(asset_dependents(store.state(), &c, &a), vec![b.clone()]);
    }

    #[test]
    fn test_resize_touches_assets_but_keeps_children_in_place() {
        let config = EditorConfig::default();
        let mut store = LayoutStore::new();
        let parent = store.add_container(None, &frame(), &config).unwrap();
        let child = store.add_container(Some(&parent), &frame(), &config).unwrap();
        let asset = store.add_asset(&parent, &config).unwrap();
        let child_before = store.state().container(&child).unwrap().position.portrait;

        let patch = ContainerPositionPatch::new().with_width(300.0);
        let (before, after) = store.update_container(&parent, &patch, Orientation::Portrait).unwrap();
        let report =
            propagate_container_change(&mut store, &parent, Orientation::Portrait, &before, &after).unwrap();

        assert!(report.moved_containers.is_empty());
        assert_eq!(report.touched_assets, vec![(parent.clone(), asset)]);
        assert_eq!(store.state().container(&child).unwrap().position.portrait, child_before);
    }
}
