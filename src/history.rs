//! Undo/redo history of full-state snapshots
//!
//! A linear list of snapshots with a cursor pointing at the current one. Saving
//! drops everything after the cursor and appends; undo and redo just move the
//! cursor and hand back the snapshot to restore.

use std::collections::VecDeque;

use log::debug;

/// One restorable state with the label of the action that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry<T> {
    pub description: String,
    pub state: T,
}

/// Snapshot history with a cursor
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<HistoryEntry<T>>,
    cursor: usize,
    /// Maximum number of entries, the initial one included
    limit: usize,
}

impl<T: Clone> History<T> {
    pub fn new(initial: T, limit: usize) -> Self {
        let mut entries = VecDeque::new();
        entries.push_back(HistoryEntry {
            description: "Initial state".to_string(),
            state: initial,
        });
        Self {
            entries,
            cursor: 0,
            limit: limit.max(1),
        }
    }

    /// Record `state` as the newest entry, discarding the redo tail
    pub fn save(&mut self, description: impl Into<String>, state: T) {
        let dropped = self.entries.len() - (self.cursor + 1);
        if dropped > 0 {
            debug!("history: discarding {} redo entries", dropped);
        }
        self.entries.truncate(self.cursor + 1);
        self.entries.push_back(HistoryEntry {
            description: description.into(),
            state,
        });
        self.prune();
        self.cursor = self.entries.len() - 1;
    }

    /// Step back; `None` at the oldest entry
    pub fn undo(&mut self) -> Option<&HistoryEntry<T>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.entries.get(self.cursor)
    }

    /// Step forward; `None` at the newest entry
    pub fn redo(&mut self) -> Option<&HistoryEntry<T>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn current(&self) -> Option<&HistoryEntry<T>> {
        self.entries.get(self.cursor)
    }

    /// Description of the action undo would revert
    pub fn undo_description(&self) -> Option<&str> {
        self.can_undo()
            .then(|| self.entries.get(self.cursor))
            .flatten()
            .map(|e| e.description.as_str())
    }

    /// Description of the action redo would reapply
    pub fn redo_description(&self) -> Option<&str> {
        self.entries
            .get(self.cursor + 1)
            .map(|e| e.description.as_str())
    }

    /// Every entry description, oldest first
    pub fn descriptions(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.description.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Start over from `state` (import, new document)
    pub fn reset(&mut self, state: T) {
        self.entries.clear();
        self.entries.push_back(HistoryEntry {
            description: "Initial state".to_string(),
            state,
        });
        self.cursor = 0;
    }

    fn prune(&mut self) {
        while self.entries.len() > self.limit {
            self.entries.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_walks_the_cursor() {
        let mut history = History::new(0, 10);
        history.save("one", 1);
        history.save("two", 2);

        assert_eq!(history.undo_description(), Some("two"));
        assert_eq!(history.undo().map(|e| e.state), Some(1));
        assert_eq!(history.undo().map(|e| e.state), Some(0));
        assert!(history.undo().is_none());

        assert_eq!(history.redo_description(), Some("one"));
        assert_eq!(history.redo().map(|e| e.state), Some(1));
        assert_eq!(history.redo().map(|e| e.state), Some(2));
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_save_truncates_redo_tail() {
        let mut history = History::new(0, 10);
        history.save("one", 1);
        history.save("two", 2);
        history.undo();
        history.save("three", 3);

        assert!(!history.can_redo());
        assert_eq!(history.descriptions(), vec!["Initial state", "one", "three"]);
    }

    #[test]
    fn test_limit_drops_oldest_entries() {
        let mut history = History::new(0, 3);
        for i in 1..=5 {
            history.save(format!("step {}", i), i);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.current().map(|e| e.state), Some(5));
        assert_eq!(history.undo().map(|e| e.state), Some(4));
        assert_eq!(history.undo().map(|e| e.state), Some(3));
        assert!(history.undo().is_none());
    }

    #[test]
    fn test_reset_forgets_everything() {
        let mut history = History::new(0, 10);
        history.save("one", 1);
        history.reset(7);
        assert!(!history.can_undo());
        assert_eq!(history.current().map(|e| e.state), Some(7));
    }
}
