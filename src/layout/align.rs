//! Alignment and snap guides
//!
//! Everything here is a pure function of boxes; callers decide what to do with the
//! result. Horizontal alignment only ever changes x and vertical only y.

use std::fmt;

use super::resolve::{ReferenceFrame, ResolvedAsset};
use super::store::LayoutState;
use super::types::{AssetId, BoundingBox, ContainerId, ContainerPosition, Orientation, Size};

/// Screen axis a guide or alignment acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Horizontal positions; guides are vertical lines
    X,
    /// Vertical positions; guides are horizontal lines
    Y,
}

/// Explicit alignment commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Top,
    Middle,
    Bottom,
}

impl Alignment {
    pub fn axis(self) -> Axis {
        match self {
            Alignment::Left | Alignment::Center | Alignment::Right => Axis::X,
            Alignment::Top | Alignment::Middle | Alignment::Bottom => Axis::Y,
        }
    }
}

impl std::str::FromStr for Alignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(Alignment::Left),
            "center" => Ok(Alignment::Center),
            "right" => Ok(Alignment::Right),
            "top" => Ok(Alignment::Top),
            "middle" => Ok(Alignment::Middle),
            "bottom" => Ok(Alignment::Bottom),
            other => Err(format!("unknown alignment '{}'", other)),
        }
    }
}

/// Move `bounds` so the requested edge or center matches `reference`
pub fn align_bounds(bounds: &BoundingBox, reference: &BoundingBox, alignment: Alignment) -> BoundingBox {
    let mut aligned = *bounds;
    match alignment {
        Alignment::Left => aligned.x = reference.x,
        Alignment::Center => aligned.x = reference.center().x - bounds.width / 2.0,
        Alignment::Right => aligned.x = reference.right() - bounds.width,
        Alignment::Top => aligned.y = reference.y,
        Alignment::Middle => aligned.y = reference.center().y - bounds.height / 2.0,
        Alignment::Bottom => aligned.y = reference.bottom() - bounds.height,
    }
    aligned
}

/// Align a center-based container position; width and height are kept
pub fn align_position(
    position: &ContainerPosition,
    reference: &BoundingBox,
    alignment: Alignment,
) -> ContainerPosition {
    ContainerPosition::from_bounds(&align_bounds(&position.bounds(), reference, alignment))
}

/// New fractional offset along `alignment`'s axis that aligns an asset's
/// displayed box with its reference's box
pub fn align_asset_offset(resolved: &ResolvedAsset, frame: &ReferenceFrame, alignment: Alignment) -> Option<f64> {
    let aligned = align_bounds(&resolved.bounds, &frame.bounds, alignment);
    let (shift, basis, current) = match alignment.axis() {
        Axis::X => (aligned.x - resolved.bounds.x, frame.size.width, resolved.origin.x - frame.anchor.x),
        Axis::Y => (aligned.y - resolved.bounds.y, frame.size.height, resolved.origin.y - frame.anchor.y),
    };
    if basis == 0.0 {
        return None;
    }
    Some((current + shift) / basis)
}

/// Where a snap candidate comes from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GuideSource {
    Container(ContainerId),
    Asset(ContainerId, AssetId),
    DeviceFrame,
}

impl fmt::Display for GuideSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuideSource::Container(id) => write!(f, "container {}", id),
            GuideSource::Asset(container, asset) => write!(f, "asset {}/{}", container, asset),
            GuideSource::DeviceFrame => f.write_str("device frame"),
        }
    }
}

/// A box the moving element may snap to
#[derive(Debug, Clone, PartialEq)]
pub struct SnapCandidate {
    pub source: GuideSource,
    pub bounds: BoundingBox,
}

/// Which line of a box a guide matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapKind {
    Start,
    Center,
    End,
}

/// A guide line where the moving box lines up with a candidate
#[derive(Debug, Clone, PartialEq)]
pub struct SnapGuide {
    pub axis: Axis,
    /// Coordinate of the candidate line
    pub position: f64,
    pub moving: SnapKind,
    pub target: SnapKind,
    pub source: GuideSource,
    /// Signed offset that would put the moving line exactly on the guide
    pub delta: f64,
}

/// Guides within threshold plus the smallest correction per axis
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapResult {
    pub guides: Vec<SnapGuide>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
}

fn lines(bounds: &BoundingBox, axis: Axis) -> [(SnapKind, f64); 3] {
    match axis {
        Axis::X => [
            (SnapKind::Start, bounds.x),
            (SnapKind::Center, bounds.center().x),
            (SnapKind::End, bounds.right()),
        ],
        Axis::Y => [
            (SnapKind::Start, bounds.y),
            (SnapKind::Center, bounds.center().y),
            (SnapKind::End, bounds.bottom()),
        ],
    }
}

/// Edge and center guides of `moving` against every candidate
pub fn compute_snap(moving: &BoundingBox, candidates: &[SnapCandidate], threshold: f64) -> SnapResult {
    let mut result = SnapResult::default();

    for axis in [Axis::X, Axis::Y] {
        let mut best: Option<f64> = None;
        for candidate in candidates {
            for (moving_kind, moving_at) in lines(moving, axis) {
                for (target_kind, target_at) in lines(&candidate.bounds, axis) {
                    let delta = target_at - moving_at;
                    if delta.abs() > threshold {
                        continue;
                    }
                    if best.map_or(true, |b| delta.abs() < b.abs()) {
                        best = Some(delta);
                    }
                    result.guides.push(SnapGuide {
                        axis,
                        position: target_at,
                        moving: moving_kind,
                        target: target_kind,
                        source: candidate.source.clone(),
                        delta,
                    });
                }
            }
        }
        match axis {
            Axis::X => result.offset_x = best,
            Axis::Y => result.offset_y = best,
        }
    }
    result
}

/// Sibling containers, the parent (if any) and the device frame
pub fn container_snap_candidates(
    state: &LayoutState,
    id: &ContainerId,
    orientation: Orientation,
    frame: Size,
) -> Vec<SnapCandidate> {
    let parent = state.container(id).and_then(|c| c.parent_id.clone());
    let mut candidates: Vec<SnapCandidate> = state
        .children_of(parent.as_ref())
        .into_iter()
        .filter(|c| &c.id != id)
        .map(|c| SnapCandidate {
            source: GuideSource::Container(c.id.clone()),
            bounds: c.position.get(orientation).bounds(),
        })
        .collect();

    if let Some(parent) = parent.as_ref().and_then(|p| state.container(p)) {
        candidates.push(SnapCandidate {
            source: GuideSource::Container(parent.id.clone()),
            bounds: parent.position.get(orientation).bounds(),
        });
    }
    candidates.push(SnapCandidate {
        source: GuideSource::DeviceFrame,
        bounds: BoundingBox::new(0.0, 0.0, frame.width, frame.height),
    });
    candidates
}
