// Layout batching - positions applied locally but not yet persisted
use crate::domain::grid::GridPosition;
use std::collections::BTreeMap;

/// Pending positions keyed by report id; iteration order is stable so a
/// commit always issues its writes in the same order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingPositions {
    positions: BTreeMap<String, GridPosition>,
}

impl PendingPositions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later moves of the same report overwrite earlier ones
    pub fn insert(&mut self, report_id: impl Into<String>, position: GridPosition) {
        self.positions.insert(report_id.into(), position);
    }

    pub fn remove(&mut self, report_id: &str) -> Option<GridPosition> {
        self.positions.remove(report_id)
    }

    /// Drain everything, leaving the map empty before any write is awaited
    pub fn take_all(&mut self) -> Vec<(String, GridPosition)> {
        std::mem::take(&mut self.positions).into_iter().collect()
    }

    /// Put back a position whose write failed, unless a newer move already replaced it
    pub fn requeue(&mut self, report_id: String, position: GridPosition) {
        self.positions.entry(report_id).or_insert(position);
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn clear(&mut self) {
        self.positions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_all_empties_map() {
        let mut pending = PendingPositions::new();
        pending.insert("b", GridPosition::new(0, 3, 4, 3));
        pending.insert("a", GridPosition::new(0, 0, 4, 3));
        pending.insert("a", GridPosition::new(4, 0, 4, 3));

        let batch = pending.take_all();
        assert!(pending.is_empty());
        assert_eq!(
            batch,
            vec![
                ("a".to_string(), GridPosition::new(4, 0, 4, 3)),
                ("b".to_string(), GridPosition::new(0, 3, 4, 3)),
            ]
        );
        assert!(pending.take_all().is_empty());
    }

    #[test]
    fn test_requeue_keeps_newer_move() {
        let mut pending = PendingPositions::new();
        pending.insert("a", GridPosition::new(8, 0, 4, 3));
        pending.requeue("a".to_string(), GridPosition::new(0, 0, 4, 3));
        pending.requeue("b".to_string(), GridPosition::new(0, 3, 4, 3));

        assert_eq!(pending.len(), 2);
        assert_eq!(
            pending.take_all(),
            vec![
                ("a".to_string(), GridPosition::new(8, 0, 4, 3)),
                ("b".to_string(), GridPosition::new(0, 3, 4, 3)),
            ]
        );
    }
}
