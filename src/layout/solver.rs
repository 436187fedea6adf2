//! Cassowary backend for the edge/gap layout
//!
//! Every box taking part in a relative layout (the screen, pinned outside
//! containers and the containers being placed) gets four kasuari variables.
//! Right and bottom edges are never stored; they are expanded to
//! `origin + extent` whenever an attachment names them.

use std::collections::HashMap;

use kasuari::{AddConstraintError, Expression, Solver, Strength, Variable, WeightedRelation::*};
use thiserror::Error;

use super::align::Axis;
use super::relative::Edge;
use super::types::BoundingBox;

#[derive(Debug, Error)]
pub enum SolverError {
    /// A required attachment contradicts the ones accepted before it
    #[error("cannot satisfy {attempted}: conflicts with {}", earlier.join(", "))]
    Conflict {
        attempted: String,
        earlier: Vec<String>,
    },

    #[error("kasuari rejected {what}: {reason}")]
    Backend { what: String, reason: String },
}

impl SolverError {
    fn backend(what: impl Into<String>, reason: impl ToString) -> Self {
        Self::Backend {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BoxVars {
    x: Variable,
    y: Variable,
    width: Variable,
    height: Variable,
}

impl BoxVars {
    fn fresh() -> Self {
        Self {
            x: Variable::new(),
            y: Variable::new(),
            width: Variable::new(),
            height: Variable::new(),
        }
    }

    fn edge(&self, edge: Edge) -> Expression {
        match edge {
            Edge::Left => self.x.into(),
            Edge::Top => self.y.into(),
            Edge::Right => self.x + self.width * 1.0,
            Edge::Bottom => self.y + self.height * 1.0,
        }
    }

    fn origin(&self, axis: Axis) -> Variable {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }
}

/// Boxes glued together edge to edge
pub struct EdgeSolver {
    solver: Solver,
    boxes: HashMap<String, BoxVars>,
    /// Descriptions of accepted constraints, newest last
    accepted: Vec<String>,
}

impl EdgeSolver {
    pub fn new() -> Self {
        Self {
            solver: Solver::new(),
            boxes: HashMap::new(),
            accepted: Vec::new(),
        }
    }

    fn vars(&mut self, id: &str) -> BoxVars {
        *self
            .boxes
            .entry(id.to_string())
            .or_insert_with(BoxVars::fresh)
    }

    /// Keep the outcome of adding a required constraint described by `what`
    fn record(&mut self, added: Result<(), AddConstraintError>, what: String) -> Result<(), SolverError> {
        match added {
            Ok(()) => {
                self.accepted.push(what);
                Ok(())
            }
            Err(AddConstraintError::UnsatisfiableConstraint) => Err(SolverError::Conflict {
                attempted: what,
                earlier: self.accepted.clone(),
            }),
            Err(AddConstraintError::DuplicateConstraint) => {
                Err(SolverError::backend(what, "duplicate constraint"))
            }
            Err(AddConstraintError::InternalSolverError(reason)) => {
                Err(SolverError::backend(what, reason))
            }
        }
    }

    /// Fix all four values of a box
    pub fn pin_box(&mut self, id: &str, bounds: &BoundingBox) -> Result<(), SolverError> {
        let vars = self.vars(id);
        for (var, value, name) in [
            (vars.x, bounds.x, "x"),
            (vars.y, bounds.y, "y"),
            (vars.width, bounds.width, "width"),
            (vars.height, bounds.height, "height"),
        ] {
            let lhs: Expression = var.into();
            let added = self.solver.add_constraint(lhs | EQ(Strength::REQUIRED) | value);
            self.record(added, format!("{id}.{name} = {value}"))?;
        }
        Ok(())
    }

    /// Fix only the extent of a box; its origin comes from attachments
    pub fn pin_size(&mut self, id: &str, width: f64, height: f64) -> Result<(), SolverError> {
        let vars = self.vars(id);
        let (w, h): (Expression, Expression) = (vars.width.into(), vars.height.into());
        let added = self.solver.add_constraint(w | EQ(Strength::REQUIRED) | width);
        self.record(added, format!("{id}.width = {width}"))?;
        let added = self.solver.add_constraint(h | EQ(Strength::REQUIRED) | height);
        self.record(added, format!("{id}.height = {height}"))
    }

    /// `id.edge = target.target_edge + offset`
    pub fn glue(
        &mut self,
        id: &str,
        edge: Edge,
        target: &str,
        target_edge: Edge,
        offset: f64,
    ) -> Result<(), SolverError> {
        let lhs = self.vars(id).edge(edge);
        let rhs = self.vars(target).edge(target_edge) + offset;
        let added = self.solver.add_constraint(lhs | EQ(Strength::REQUIRED) | rhs);
        self.record(added, format!("{id} {edge:?} -> {target} {target_edge:?} {offset:+}"))
    }

    /// Keep an unattached origin near `value`
    pub fn prefer_origin(&mut self, id: &str, axis: Axis, value: f64) -> Result<(), SolverError> {
        let var = self.vars(id).origin(axis);
        let what = format!("{id} {axis:?} origin");
        self.solver
            .add_edit_variable(var, Strength::STRONG)
            .map_err(|e| SolverError::backend(&what, format!("{e:?}")))?;
        self.solver
            .suggest_value(var, value)
            .map_err(|e| SolverError::backend(&what, format!("{e:?}")))
    }

    /// Solved box of every known id; values the solver never reported are 0
    pub fn solve(&mut self) -> HashMap<String, BoundingBox> {
        let changed: HashMap<Variable, f64> = self.solver.fetch_changes().iter().copied().collect();
        let value = |var: &Variable| changed.get(var).copied().unwrap_or(0.0);
        self.boxes
            .iter()
            .map(|(id, vars)| {
                let bounds = BoundingBox::new(
                    value(&vars.x),
                    value(&vars.y),
                    value(&vars.width),
                    value(&vars.height),
                );
                (id.clone(), bounds)
            })
            .collect()
    }
}

impl Default for EdgeSolver {
    fn default() -> Self {
        Self::new()
    }
}
