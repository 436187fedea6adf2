//! Layout model and the engine around it
//!
//! The data model (`types`, `store`) is the only mutable part. Resolution,
//! alignment and the layer tree are read-only projections of a [`LayoutState`];
//! cascades and drops go back through [`LayoutStore`].

pub mod align;
pub mod cascade;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod relative;
pub mod resolve;
pub mod solver;
pub mod store;
pub mod transform;
pub mod types;

pub use align::{Alignment, Axis, GuideSource, SnapCandidate, SnapGuide, SnapKind, SnapResult};
pub use cascade::CascadeReport;
pub use config::EditorConfig;
pub use error::LayoutError;
pub use hierarchy::{DragState, DropPosition, LayerId, LayerNode};
pub use relative::{Edge, Gap, GapUnit, RelativeEntry, RelativeLayout, RelativePosition, RelativeTarget};
pub use resolve::{ReferenceFrame, ResolvedAsset, ResolvedLayout, Resolver};
pub use store::{ChangeEvent, LayoutState, LayoutStore, SubscriptionId};
pub use types::*;

/// Compute Levenshtein edit distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let (m, n) = (a_chars.len(), b_chars.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut row = vec![0usize; n + 1];
    for i in 1..=m {
        row[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            row[j] = (prev[j] + 1).min(row[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[n]
}

/// Known names within `max_distance` edits of `target`, closest first (at most 3)
pub(crate) fn find_similar<'a>(
    known: impl IntoIterator<Item = &'a str>,
    target: &str,
    max_distance: usize,
) -> Vec<String> {
    let mut candidates: Vec<(&str, usize)> = known
        .into_iter()
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            (dist <= max_distance && dist > 0).then_some((name, dist))
        })
        .collect();

    candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    candidates.dedup();
    candidates
        .into_iter()
        .map(|(name, _)| name.to_string())
        .take(3)
        .collect()
}
