//! Failures of the edge/gap layout flow

use thiserror::Error;

use super::solver::SolverError;

#[derive(Debug, Error)]
pub enum LayoutError {
    /// An entry or attachment names a container the state does not have
    #[error("no container '{id}' to attach to")]
    UnknownContainer { id: String, suggestions: Vec<String> },

    /// Attachments that depend on each other in a loop
    #[error("containers are attached in a loop: {}", cycle.join(" -> "))]
    CircularConstraint { cycle: Vec<String> },

    /// Duplicate entry, or an edge glued across axes
    #[error("'{container}' cannot be placed: {reason}")]
    InvalidAttachment { container: String, reason: String },

    #[error(transparent)]
    Unsolvable(#[from] SolverError),
}

impl LayoutError {
    pub fn unknown_container(id: impl Into<String>, suggestions: Vec<String>) -> Self {
        Self::UnknownContainer {
            id: id.into(),
            suggestions,
        }
    }

    pub fn circular(cycle: Vec<String>) -> Self {
        Self::CircularConstraint { cycle }
    }

    pub fn invalid_attachment(container: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttachment {
            container: container.into(),
            reason: reason.into(),
        }
    }

    /// Close matches for an unknown container id
    pub fn suggestions(&self) -> &[String] {
        match self {
            Self::UnknownContainer { suggestions, .. } => suggestions,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_lists_every_container() {
        let err = LayoutError::circular(vec!["tabs".into(), "list".into(), "tabs".into()]);
        assert_eq!(err.to_string(), "containers are attached in a loop: tabs -> list -> tabs");
    }

    #[test]
    fn test_only_unknown_container_has_suggestions() {
        let err = LayoutError::unknown_container("heder", vec!["header".into()]);
        assert!(err.to_string().contains("'heder'"));
        assert_eq!(err.suggestions(), ["header".to_string()]);
        assert!(LayoutError::invalid_attachment("footer", "placed twice").suggestions().is_empty());
    }
}
