//! Reference resolution: absolute origin and displayed size of assets
//!
//! An asset's transform is expressed as fractions of its reference, which is either
//! its container's box or a sibling asset's displayed box. Resolution walks the
//! reference chain, detecting cycles with the current resolution stack, and caches
//! each asset's result for the duration of one pass.
//!
//! Resolution is read-only. Anything that cannot be resolved (image not loaded,
//! missing sibling, cycle) comes back as `None`; it is never an error.

use std::collections::HashMap;

use log::{debug, warn};

use crate::library::ImageSource;

use super::store::LayoutState;
use super::transform::Rotation;
use super::types::{
    AssetId, AssetTransform, BoundingBox, ContainerId, Orientation, Point, Reference, ScaleMode,
    Size,
};

/// Absolute placement of an asset in one orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedAsset {
    /// Point the asset's pivot sits on
    pub origin: Point,
    /// Displayed size after aspect adjustment
    pub size: Size,
    /// Unrotated displayed box
    pub bounds: BoundingBox,
    /// Degrees, clockwise around `origin`
    pub rotation: f64,
    pub visible: bool,
}

impl ResolvedAsset {
    /// Axis-aligned bounds of the rotated box
    pub fn visual_bounds(&self) -> BoundingBox {
        Rotation::new(self.rotation, self.origin).loose_bounds(&self.bounds)
    }
}

/// What an asset's fractions are measured against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferenceFrame {
    /// Point that fractional offsets are added to
    pub anchor: Point,
    /// Basis for fractional offsets and sizes
    pub size: Size,
    /// Box of the reference itself, for alignment
    pub bounds: BoundingBox,
}

/// Every resolvable element of one orientation
#[derive(Debug, Clone, Default)]
pub struct ResolvedLayout {
    pub containers: HashMap<ContainerId, BoundingBox>,
    pub assets: HashMap<(ContainerId, AssetId), ResolvedAsset>,
    pub unresolved: Vec<(ContainerId, AssetId)>,
}

impl ResolvedLayout {
    pub fn asset(&self, container: &ContainerId, asset: &AssetId) -> Option<&ResolvedAsset> {
        self.assets.get(&(container.clone(), asset.clone()))
    }
}

type AssetKey = (ContainerId, AssetId);

/// One resolution pass over a layout state
pub struct Resolver<'a, I: ImageSource + ?Sized> {
    state: &'a LayoutState,
    images: &'a I,
    orientation: Orientation,
    cache: HashMap<AssetKey, Option<ResolvedAsset>>,
    stack: Vec<AssetKey>,
}

impl<'a, I: ImageSource + ?Sized> Resolver<'a, I> {
    pub fn new(state: &'a LayoutState, images: &'a I, orientation: Orientation) -> Self {
        Self {
            state,
            images,
            orientation,
            cache: HashMap::new(),
            stack: Vec::new(),
        }
    }

    /// Absolute box of a container; containers are stored in absolute pixels
    pub fn resolve_container(&self, id: &ContainerId) -> Option<BoundingBox> {
        self.state
            .container(id)
            .map(|c| c.position.get(self.orientation).bounds())
    }

    /// Resolve one asset, resolving its reference chain first
    pub fn resolve_asset(&mut self, container: &ContainerId, asset: &AssetId) -> Option<ResolvedAsset> {
        let key = (container.clone(), asset.clone());
        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }
        if self.stack.contains(&key) {
            warn!(
                "reference cycle through asset {} in container {} ({})",
                asset, container, self.orientation
            );
            return None;
        }

        self.stack.push(key.clone());
        let resolved = self.compute(container, asset);
        self.stack.pop();

        if resolved.is_none() {
            debug!("asset {} in container {} is unresolved", asset, container);
        }
        self.cache.insert(key, resolved);
        resolved
    }

    /// Anchor and basis an asset's fractions are measured against
    pub fn reference_frame(&mut self, container: &ContainerId, asset: &AssetId) -> Option<ReferenceFrame> {
        let transform = self.transform(container, asset)?;
        match transform.position.reference.clone() {
            Reference::Container => {
                let bounds = self.resolve_container(container)?;
                Some(ReferenceFrame {
                    anchor: bounds.center(),
                    size: bounds.size(),
                    bounds,
                })
            }
            Reference::Asset(sibling) => {
                let resolved = self.resolve_asset(container, &sibling)?;
                Some(ReferenceFrame {
                    anchor: resolved.origin,
                    size: resolved.size,
                    bounds: resolved.bounds,
                })
            }
        }
    }

    /// Resolve every container and asset of the orientation
    pub fn resolve_all(&mut self) -> ResolvedLayout {
        let mut layout = ResolvedLayout::default();
        let mut keys: Vec<AssetKey> = Vec::new();

        for container in self.state.containers.values() {
            layout.containers.insert(
                container.id.clone(),
                container.position.get(self.orientation).bounds(),
            );
            keys.extend(container.assets.keys().map(|a| (container.id.clone(), a.clone())));
        }
        keys.sort();

        for (container, asset) in keys {
            match self.resolve_asset(&container, &asset) {
                Some(resolved) => {
                    layout.assets.insert((container, asset), resolved);
                }
                None => layout.unresolved.push((container, asset)),
            }
        }
        layout
    }

    fn transform(&self, container: &ContainerId, asset: &AssetId) -> Option<&'a AssetTransform> {
        self.state
            .asset(container, asset)
            .map(|a| a.transform.get(self.orientation))
    }

    fn compute(&mut self, container: &ContainerId, asset: &AssetId) -> Option<ResolvedAsset> {
        let owner = self.state.asset(container, asset)?;
        let (image_width, image_height) = self.images.dimensions(&owner.key)?;
        let transform = owner.transform.get(self.orientation);

        let frame = self.reference_frame(container, asset)?;
        let origin = Point::new(
            frame.anchor.x + transform.position.x * frame.size.width,
            frame.anchor.y + transform.position.y * frame.size.height,
        );

        let declared = Size::new(
            transform.size.width * frame.size.width,
            transform.size.height * frame.size.height,
        );
        let size = if transform.maintain_aspect_ratio && image_height > 0 {
            fit_to_aspect(
                declared,
                image_width as f64 / image_height as f64,
                transform.scale_mode,
            )
        } else {
            declared
        };

        let bounds = BoundingBox::new(
            origin.x - transform.origin.x * size.width,
            origin.y - transform.origin.y * size.height,
            size.width,
            size.height,
        );

        Some(ResolvedAsset {
            origin,
            size,
            bounds,
            rotation: transform.rotation,
            visible: transform.visible(),
        })
    }
}

/// Resolve a single asset with a fresh pass
pub fn resolve_asset<I: ImageSource + ?Sized>(
    state: &LayoutState,
    images: &I,
    container: &ContainerId,
    asset: &AssetId,
    orientation: Orientation,
) -> Option<ResolvedAsset> {
    Resolver::new(state, images, orientation).resolve_asset(container, asset)
}

/// Adjust a declared box to an image aspect ratio (width / height).
///
/// `Fit` shrinks the overflowing axis, `Fill` grows the deficient one, `Stretch`
/// keeps the declared box.
pub fn fit_to_aspect(size: Size, aspect: f64, mode: ScaleMode) -> Size {
    if !aspect.is_finite() || aspect <= 0.0 || size.is_degenerate() {
        return size;
    }
    let too_wide = size.width / size.height > aspect;
    match (mode, too_wide) {
        (ScaleMode::Stretch, _) => size,
        (ScaleMode::Fit, true) | (ScaleMode::Fill, false) => {
            Size::new(size.height * aspect, size.height)
        }
        (ScaleMode::Fit, false) | (ScaleMode::Fill, true) => {
            Size::new(size.width, size.width / aspect)
        }
    }
}
