//! Legacy edge/gap layout
//!
//! A [`RelativeLayout`] glues container edges to screen edges or to other
//! containers' edges with a signed gap. It is a separate, explicitly invoked flow:
//! entries are ordered so every referenced container comes first, then the whole
//! set is solved with the Cassowary solver and returned as absolute positions.
//! Nothing here writes to the store.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;

use super::align::Axis;
use super::error::LayoutError;
use super::find_similar;
use super::solver::EdgeSolver;
use super::store::LayoutState;
use super::types::{BoundingBox, ContainerId, ContainerPosition, Orientation, Size};

/// Solver element standing in for the device screen
const SCREEN: &str = "@screen";

/// A box edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Left,
    Right,
    Top,
    Bottom,
}

impl Edge {
    pub fn axis(self) -> Axis {
        match self {
            Edge::Left | Edge::Right => Axis::X,
            Edge::Top | Edge::Bottom => Axis::Y,
        }
    }

    /// Gaps push leading edges forward and trailing edges back
    fn sign(self) -> f64 {
        match self {
            Edge::Left | Edge::Top => 1.0,
            Edge::Right | Edge::Bottom => -1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapUnit {
    Pixels,
    /// Percent of the screen extent along the edge's axis
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gap {
    pub value: f64,
    pub unit: GapUnit,
}

impl Gap {
    pub fn px(value: f64) -> Self {
        Self {
            value,
            unit: GapUnit::Pixels,
        }
    }

    pub fn percent(value: f64) -> Self {
        Self {
            value,
            unit: GapUnit::Percent,
        }
    }

    pub fn zero() -> Self {
        Self::px(0.0)
    }

    fn to_pixels(self, extent: f64) -> f64 {
        match self.unit {
            GapUnit::Pixels => self.value,
            GapUnit::Percent => self.value / 100.0 * extent,
        }
    }
}

/// What an edge is attached to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelativeTarget {
    Screen,
    Container(ContainerId),
}

/// `edge` of the container sits on `target_edge` of `target`, offset by `gap`
#[derive(Debug, Clone, PartialEq)]
pub struct RelativePosition {
    pub edge: Edge,
    pub target: RelativeTarget,
    pub target_edge: Edge,
    pub gap: Gap,
}

impl RelativePosition {
    pub fn new(edge: Edge, target: RelativeTarget, target_edge: Edge, gap: Gap) -> Self {
        Self {
            edge,
            target,
            target_edge,
            gap,
        }
    }

    /// Attach to the same edge of the screen
    pub fn screen(edge: Edge, gap: Gap) -> Self {
        Self::new(edge, RelativeTarget::Screen, edge, gap)
    }

    fn target_container(&self) -> Option<&ContainerId> {
        match &self.target {
            RelativeTarget::Screen => None,
            RelativeTarget::Container(id) => Some(id),
        }
    }
}

/// One container placed by the relative layout
#[derive(Debug, Clone, PartialEq)]
pub struct RelativeEntry {
    pub container: ContainerId,
    pub size: Size,
    pub horizontal: Option<RelativePosition>,
    pub vertical: Option<RelativePosition>,
}

impl RelativeEntry {
    pub fn new(container: ContainerId, size: Size) -> Self {
        Self {
            container,
            size,
            horizontal: None,
            vertical: None,
        }
    }

    pub fn with_horizontal(mut self, position: RelativePosition) -> Self {
        self.horizontal = Some(position);
        self
    }

    pub fn with_vertical(mut self, position: RelativePosition) -> Self {
        self.vertical = Some(position);
        self
    }

    fn attachments(&self) -> impl Iterator<Item = &RelativePosition> {
        self.horizontal.iter().chain(self.vertical.iter())
    }
}

/// A set of edge attachments solved together
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelativeLayout {
    pub entries: Vec<RelativeEntry>,
}

impl RelativeLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, entry: RelativeEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Reject duplicate entries and edges attached across axes
    pub fn validate(&self) -> Result<(), LayoutError> {
        let mut seen = HashSet::new();
        for entry in &self.entries {
            if !seen.insert(&entry.container) {
                return Err(LayoutError::invalid_attachment(
                    entry.container.as_str(),
                    "container is placed more than once",
                ));
            }
            for (position, axis) in [(&entry.horizontal, Axis::X), (&entry.vertical, Axis::Y)] {
                let Some(position) = position else { continue };
                if position.edge.axis() != axis || position.target_edge.axis() != axis {
                    return Err(LayoutError::invalid_attachment(
                        entry.container.as_str(),
                        format!(
                            "{:?} edge cannot attach to {:?} edge on the {:?} axis",
                            position.edge, position.target_edge, axis
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Entry indices ordered so that attachment targets come before dependents
    pub fn order(&self) -> Result<Vec<usize>, LayoutError> {
        let index: HashMap<&ContainerId, usize> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (&e.container, i))
            .collect();

        // deps[i] = entries i is attached to; dependents[j] = entries attached to j
        let mut deps: Vec<HashSet<usize>> = vec![HashSet::new(); self.entries.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.entries.len()];
        for (i, entry) in self.entries.iter().enumerate() {
            for target in entry.attachments().filter_map(|p| p.target_container()) {
                if let Some(&j) = index.get(target) {
                    if deps[i].insert(j) {
                        dependents[j].push(i);
                    }
                }
            }
        }

        let mut in_degree: Vec<usize> = deps.iter().map(|d| d.len()).collect();
        let mut queue: VecDeque<usize> = (0..self.entries.len()).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.entries.len());

        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &dependent in &dependents[i] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() < self.entries.len() {
            return Err(LayoutError::circular(self.cycle_path(&deps, &in_degree)));
        }
        Ok(order)
    }

    /// Walk unresolved dependencies until a node repeats
    fn cycle_path(&self, deps: &[HashSet<usize>], in_degree: &[usize]) -> Vec<String> {
        let Some(start) = (0..in_degree.len()).find(|&i| in_degree[i] > 0) else {
            return Vec::new();
        };
        let mut path = vec![start];
        let mut current = start;
        loop {
            let mut next: Vec<usize> = deps[current]
                .iter()
                .copied()
                .filter(|&j| in_degree[j] > 0)
                .collect();
            next.sort_unstable();
            let Some(&step) = next.first() else { break };
            if let Some(pos) = path.iter().position(|&p| p == step) {
                path.drain(..pos);
                path.push(step);
                break;
            }
            path.push(step);
            current = step;
        }
        path.into_iter()
            .map(|i| self.entries[i].container.to_string())
            .collect()
    }

    /// Solve every entry against `frame`.
    ///
    /// Targets that are not entries use their current position in `state`.
    /// Unattached axes keep the container's current left/top edge.
    pub fn resolve(
        &self,
        state: &LayoutState,
        frame: Size,
        orientation: Orientation,
    ) -> Result<HashMap<ContainerId, ContainerPosition>, LayoutError> {
        self.validate()?;

        let placed: HashSet<&ContainerId> = self.entries.iter().map(|e| &e.container).collect();
        let unknown = |id: &ContainerId| {
            let known = state
                .containers
                .keys()
                .map(|k| k.as_str())
                .chain(placed.iter().map(|k| k.as_str()));
            LayoutError::unknown_container(id.as_str(), find_similar(known, id.as_str(), 2))
        };

        for entry in &self.entries {
            if state.container(&entry.container).is_none() {
                return Err(unknown(&entry.container));
            }
            for target in entry.attachments().filter_map(|p| p.target_container()) {
                if target == &entry.container {
                    return Err(LayoutError::circular(vec![
                        target.to_string(),
                        target.to_string(),
                    ]));
                }
                if state.container(target).is_none() && !placed.contains(target) {
                    return Err(unknown(target));
                }
            }
        }

        let order = self.order()?;
        let mut solver = EdgeSolver::new();
        solver.pin_box(SCREEN, &BoundingBox::new(0.0, 0.0, frame.width, frame.height))?;

        let mut pinned: HashSet<&ContainerId> = HashSet::new();
        for entry in &self.entries {
            for target in entry.attachments().filter_map(|p| p.target_container()) {
                if placed.contains(target) || !pinned.insert(target) {
                    continue;
                }
                if let Some(container) = state.container(target) {
                    let bounds = container.position.get(orientation).bounds();
                    solver.pin_box(target.as_str(), &bounds)?;
                }
            }
        }

        for &i in &order {
            let entry = &self.entries[i];
            let id = entry.container.as_str();
            let current = state
                .container(&entry.container)
                .map(|c| c.position.get(orientation).bounds())
                .unwrap_or_default();

            solver.pin_size(id, entry.size.width, entry.size.height)?;

            for (position, axis, extent, start) in [
                (&entry.horizontal, Axis::X, frame.width, current.x),
                (&entry.vertical, Axis::Y, frame.height, current.y),
            ] {
                match position {
                    Some(position) => {
                        let target = match &position.target {
                            RelativeTarget::Screen => SCREEN,
                            RelativeTarget::Container(t) => t.as_str(),
                        };
                        let offset = position.edge.sign() * position.gap.to_pixels(extent);
                        solver.glue(id, position.edge, target, position.target_edge, offset)?;
                    }
                    None => solver.prefer_origin(id, axis, start)?,
                }
            }
        }

        let solved = solver.solve();
        let mut positions = HashMap::new();
        for entry in &self.entries {
            let origin = solved.get(entry.container.as_str()).copied().unwrap_or_default();
            let bounds = BoundingBox::new(origin.x, origin.y, entry.size.width, entry.size.height);
            positions.insert(entry.container.clone(), ContainerPosition::from_bounds(&bounds));
        }
        debug!(
            "relative layout placed {} containers ({})",
            positions.len(),
            orientation
        );
        Ok(positions)
    }
}
