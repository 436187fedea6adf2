//! Core types for the layout model

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A 2D point in the coordinate system
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height pair, either in pixels or as fractions of a basis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero or negative
    pub fn is_degenerate(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// A bounding box representing the spatial extent of an element.
///
/// Unlike [`ContainerPosition`], `x`/`y` are the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a box from its center point and size
    pub fn from_center(center: Point, size: Size) -> Self {
        Self::new(
            center.x - size.width / 2.0,
            center.y - size.height / 2.0,
            size.width,
            size.height,
        )
    }

    /// Create a zero-sized bounding box at the origin
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Right edge x-coordinate
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge y-coordinate
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Center point of the bounding box
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Check if this bounding box contains a point
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.right()
            && point.y >= self.y
            && point.y <= self.bottom()
    }

    /// Compute the union of two bounding boxes (smallest box containing both)
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        BoundingBox::new(x, y, right - x, bottom - y)
    }
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::zero()
    }
}

/// One of the two fixed screen orientations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub const ALL: [Orientation; 2] = [Orientation::Portrait, Orientation::Landscape];

    /// The other orientation
    pub fn flipped(self) -> Self {
        match self {
            Orientation::Portrait => Orientation::Landscape,
            Orientation::Landscape => Orientation::Portrait,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(format!(
                "unknown orientation '{}' (expected portrait or landscape)",
                other
            )),
        }
    }
}

/// A value stored once per orientation.
///
/// The two slots are plain owned values, so editing one never aliases the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerOrientation<T> {
    pub portrait: T,
    pub landscape: T,
}

impl<T> PerOrientation<T> {
    pub fn new(portrait: T, landscape: T) -> Self {
        Self {
            portrait,
            landscape,
        }
    }

    pub fn get(&self, orientation: Orientation) -> &T {
        match orientation {
            Orientation::Portrait => &self.portrait,
            Orientation::Landscape => &self.landscape,
        }
    }

    pub fn get_mut(&mut self, orientation: Orientation) -> &mut T {
        match orientation {
            Orientation::Portrait => &mut self.portrait,
            Orientation::Landscape => &mut self.landscape,
        }
    }
}

impl<T: Clone> PerOrientation<T> {
    /// Same value in both orientations (two independent copies)
    pub fn splat(value: T) -> Self {
        Self {
            portrait: value.clone(),
            landscape: value,
        }
    }

    /// Overwrite `to` with a deep copy of `from`
    pub fn copy_across(&mut self, from: Orientation, to: Orientation) {
        if from != to {
            let value = self.get(from).clone();
            *self.get_mut(to) = value;
        }
    }
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Fresh random identifier
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }
    };
}

string_id!(
    /// Stable identifier of a container
    ContainerId
);
string_id!(
    /// Identifier of an asset, unique within its container
    AssetId
);

/// Center-based geometry of a container in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContainerPosition {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ContainerPosition {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Top-left based bounds
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_center(self.center(), self.size())
    }

    pub fn from_bounds(bounds: &BoundingBox) -> Self {
        let center = bounds.center();
        Self::new(center.x, center.y, bounds.width, bounds.height)
    }

    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

/// Partial update of a [`ContainerPosition`]; unset fields are left untouched
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContainerPositionPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl ContainerPositionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_x(mut self, x: f64) -> Self {
        self.x = Some(x);
        self
    }

    pub fn with_y(mut self, y: f64) -> Self {
        self.y = Some(y);
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    /// Patch that overwrites every field
    pub fn replace(position: ContainerPosition) -> Self {
        Self {
            x: Some(position.x),
            y: Some(position.y),
            width: Some(position.width),
            height: Some(position.height),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.width.is_none() && self.height.is_none()
    }

    pub fn apply(&self, position: &ContainerPosition) -> ContainerPosition {
        ContainerPosition {
            x: self.x.unwrap_or(position.x),
            y: self.y.unwrap_or(position.y),
            width: self.width.unwrap_or(position.width),
            height: self.height.unwrap_or(position.height),
        }
    }
}

/// What an asset's position is expressed relative to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    /// The owning container's box
    Container,
    /// A sibling asset in the same container
    Asset(AssetId),
}

const CONTAINER_REFERENCE: &str = "container";

impl Reference {
    pub fn asset_id(&self) -> Option<&AssetId> {
        match self {
            Reference::Container => None,
            Reference::Asset(id) => Some(id),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Container => f.write_str(CONTAINER_REFERENCE),
            Reference::Asset(id) => write!(f, "{}", id),
        }
    }
}

impl Serialize for Reference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reference::Container => serializer.serialize_str(CONTAINER_REFERENCE),
            Reference::Asset(id) => serializer.serialize_str(id.as_str()),
        }
    }
}

impl<'de> Deserialize<'de> for Reference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == CONTAINER_REFERENCE {
            Ok(Reference::Container)
        } else {
            Ok(Reference::Asset(AssetId(raw)))
        }
    }
}

/// Anchor plus fractional offset of an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetPosition {
    pub reference: Reference,
    pub x: f64,
    pub y: f64,
}

/// How an image is fitted into its declared box when the aspect ratio is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    #[default]
    Fit,
    Fill,
    Stretch,
}

/// Per-orientation placement of an asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetTransform {
    pub position: AssetPosition,
    /// Fractions of the reference's resolved dimensions
    pub size: Size,
    /// Pivot fraction of the displayed image placed at the resolved origin
    pub origin: Point,
    #[serde(default)]
    pub scale_mode: ScaleMode,
    #[serde(default = "default_true")]
    pub maintain_aspect_ratio: bool,
    /// Degrees, clockwise
    #[serde(default)]
    pub rotation: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_visible: Option<bool>,
}

fn default_true() -> bool {
    true
}

impl AssetTransform {
    /// Visibility with the unset case treated as visible
    pub fn visible(&self) -> bool {
        self.is_visible.unwrap_or(true)
    }
}

impl Default for AssetTransform {
    fn default() -> Self {
        Self {
            position: AssetPosition {
                reference: Reference::Container,
                x: 0.0,
                y: 0.0,
            },
            size: Size::new(0.5, 0.5),
            origin: Point::new(0.5, 0.5),
            scale_mode: ScaleMode::Fit,
            maintain_aspect_ratio: true,
            rotation: 0.0,
            is_visible: None,
        }
    }
}

/// Partial update of an [`AssetTransform`]; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetTransformPatch {
    pub reference: Option<Reference>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub origin_x: Option<f64>,
    pub origin_y: Option<f64>,
    pub scale_mode: Option<ScaleMode>,
    pub maintain_aspect_ratio: Option<bool>,
    pub rotation: Option<f64>,
    pub is_visible: Option<bool>,
}

impl AssetTransformPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.origin_x = Some(x);
        self.origin_y = Some(y);
        self
    }

    pub fn with_scale_mode(mut self, mode: ScaleMode) -> Self {
        self.scale_mode = Some(mode);
        self
    }

    pub fn with_maintain_aspect_ratio(mut self, keep: bool) -> Self {
        self.maintain_aspect_ratio = Some(keep);
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = Some(degrees);
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.is_visible = Some(visible);
        self
    }

    pub fn apply(&self, transform: &AssetTransform) -> AssetTransform {
        let mut next = transform.clone();
        if let Some(reference) = &self.reference {
            next.position.reference = reference.clone();
        }
        if let Some(x) = self.x {
            next.position.x = x;
        }
        if let Some(y) = self.y {
            next.position.y = y;
        }
        if let Some(width) = self.width {
            next.size.width = width;
        }
        if let Some(height) = self.height {
            next.size.height = height;
        }
        if let Some(x) = self.origin_x {
            next.origin.x = x;
        }
        if let Some(y) = self.origin_y {
            next.origin.y = y;
        }
        if let Some(mode) = self.scale_mode {
            next.scale_mode = mode;
        }
        if let Some(keep) = self.maintain_aspect_ratio {
            next.maintain_aspect_ratio = keep;
        }
        if let Some(rotation) = self.rotation {
            next.rotation = rotation;
        }
        if let Some(visible) = self.is_visible {
            next.is_visible = Some(visible);
        }
        next
    }
}

/// A positioned image reference owned by exactly one container
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    /// Key into the image library; empty when no image is bound yet
    pub key: String,
    pub transform: PerOrientation<AssetTransform>,
    pub depth: i64,
    pub is_locked: bool,
}

impl Asset {
    pub fn new(id: AssetId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            key: String::new(),
            transform: PerOrientation::splat(AssetTransform::default()),
            depth: 0,
            is_locked: false,
        }
    }
}

/// A rectangular grouping node; may nest containers and owns assets
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    pub position: PerOrientation<ContainerPosition>,
    pub parent_id: Option<ContainerId>,
    pub assets: HashMap<AssetId, Asset>,
    pub depth: i64,
    pub is_locked: bool,
}

impl Container {
    pub fn new(
        id: ContainerId,
        name: impl Into<String>,
        position: PerOrientation<ContainerPosition>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            position,
            parent_id: None,
            assets: HashMap::new(),
            depth: 0,
            is_locked: false,
        }
    }

    /// Assets ordered by descending depth, ties broken by id
    pub fn assets_by_depth(&self) -> Vec<&Asset> {
        let mut assets: Vec<&Asset> = self.assets.values().collect();
        assets.sort_by(|a, b| b.depth.cmp(&a.depth).then_with(|| a.id.cmp(&b.id)));
        assets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_edges() {
        let bb = BoundingBox::new(10.0, 20.0, 100.0, 50.0);
        assert_eq!(bb.right(), 110.0);
        assert_eq!(bb.bottom(), 70.0);
    }

    #[test]
    fn test_bounding_box_from_center() {
        let bb = BoundingBox::from_center(Point::new(50.0, 50.0), Size::new(20.0, 10.0));
        assert_eq!(bb, BoundingBox::new(40.0, 45.0, 20.0, 10.0));
        assert_eq!(bb.center(), Point::new(50.0, 50.0));
    }

    #[test]
    fn test_bounding_box_contains() {
        let bb = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        assert!(bb.contains(Point::new(50.0, 50.0)));
        assert!(bb.contains(Point::new(100.0, 100.0)));
        assert!(!bb.contains(Point::new(-1.0, 50.0)));
    }

    #[test]
    fn test_bounding_box_union() {
        let a = BoundingBox::new(0.0, 0.0, 50.0, 50.0);
        let b = BoundingBox::new(100.0, 100.0, 50.0, 50.0);
        assert_eq!(a.union(&b), BoundingBox::new(0.0, 0.0, 150.0, 150.0));
    }

    #[test]
    fn test_per_orientation_copies_are_independent() {
        let mut positions = PerOrientation::splat(ContainerPosition::new(1.0, 2.0, 3.0, 4.0));
        positions.get_mut(Orientation::Portrait).x = 99.0;
        assert_eq!(positions.landscape.x, 1.0);

        positions.copy_across(Orientation::Portrait, Orientation::Landscape);
        assert_eq!(positions.landscape.x, 99.0);
        positions.get_mut(Orientation::Landscape).y = 7.0;
        assert_eq!(positions.portrait.y, 2.0);
    }

    #[test]
    fn test_container_position_patch_only_touches_set_fields() {
        let pos = ContainerPosition::new(10.0, 20.0, 30.0, 40.0);
        let next = ContainerPositionPatch::new().with_x(15.0).apply(&pos);
        assert_eq!(next, ContainerPosition::new(15.0, 20.0, 30.0, 40.0));
        assert!(ContainerPositionPatch::new().is_empty());
    }

    #[test]
    fn test_reference_serde_uses_literal_container() {
        let json = serde_json::to_string(&Reference::Container).unwrap();
        assert_eq!(json, "\"container\"");

        let parsed: Reference = serde_json::from_str("\"logo\"").unwrap();
        assert_eq!(parsed, Reference::Asset(AssetId::new("logo")));
    }

    #[test]
    fn test_asset_transform_visibility_defaults_to_visible() {
        let mut transform = AssetTransform::default();
        assert!(transform.visible());
        transform.is_visible = Some(false);
        assert!(!transform.visible());
    }

    #[test]
    fn test_asset_transform_patch() {
        let base = AssetTransform::default();
        let next = AssetTransformPatch::new()
            .with_reference(Reference::Asset(AssetId::new("bg")))
            .with_position(0.25, -0.5)
            .with_scale_mode(ScaleMode::Fill)
            .apply(&base);

        assert_eq!(next.position.reference, Reference::Asset(AssetId::new("bg")));
        assert_eq!(next.position.x, 0.25);
        assert_eq!(next.position.y, -0.5);
        assert_eq!(next.scale_mode, ScaleMode::Fill);
        assert_eq!(next.size, base.size);
    }

    #[test]
    fn test_orientation_parse() {
        assert_eq!("landscape".parse::<Orientation>(), Ok(Orientation::Landscape));
        assert!("sideways".parse::<Orientation>().is_err());
        assert_eq!(Orientation::Portrait.flipped(), Orientation::Landscape);
    }
}
