// Bounded undo/redo stacks of layout snapshots
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// Two bounded stacks; snapshots are owned copies, never shared with live state
#[derive(Debug, Clone)]
pub struct History<T> {
    undo: VecDeque<T>,
    redo: VecDeque<T>,
    limit: usize,
}

impl<T> History<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state before an edit; any redo branch is dropped
    pub fn record(&mut self, snapshot: T) {
        push_bounded(&mut self.undo, snapshot, self.limit);
        self.redo.clear();
    }

    /// Pop the previous state, parking `current` on the redo stack
    pub fn undo(&mut self, current: T) -> Option<T> {
        let previous = self.undo.pop_back()?;
        push_bounded(&mut self.redo, current, self.limit);
        Some(previous)
    }

    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo.pop_back()?;
        push_bounded(&mut self.undo, current, self.limit);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
}

impl<T> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

fn push_bounded<T>(stack: &mut VecDeque<T>, item: T, limit: usize) {
    if stack.len() == limit {
        stack.pop_front();
    }
    stack.push_back(item);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut history = History::new(20);
        history.record(1);
        history.record(2);

        assert_eq!(history.undo(3), Some(2));
        assert_eq!(history.undo(2), Some(1));
        assert_eq!(history.undo(1), None);
        assert_eq!(history.redo(1), Some(2));
        assert_eq!(history.redo(2), Some(3));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_record_clears_redo() {
        let mut history = History::new(20);
        history.record("a");
        history.undo("b");
        assert!(history.can_redo());

        history.record("c");
        assert!(!history.can_redo());
    }

    #[test]
    fn test_oldest_snapshot_dropped_at_limit() {
        let mut history = History::new(3);
        for state in 0..5 {
            history.record(state);
        }

        let mut restored = Vec::new();
        let mut current = 5;
        while let Some(previous) = history.undo(current) {
            restored.push(previous);
            current = previous;
        }
        assert_eq!(restored, vec![4, 3, 2]);
    }
}
