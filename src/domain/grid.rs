// Grid placement model - positions are always in grid units, never pixels
use serde::{Deserialize, Serialize};

/// Number of columns on the dashboard grid
pub const GRID_COLUMNS: u32 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl GridPosition {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// First row below this item
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }

    pub fn overlaps(&self, other: &GridPosition) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Row where a newly stacked item should start: `max(y + h)` over the items, 0 when empty
pub fn stack_bottom<'a, I>(positions: I) -> u32
where
    I: IntoIterator<Item = &'a GridPosition>,
{
    positions.into_iter().map(GridPosition::bottom).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_bottom() {
        let empty: [GridPosition; 0] = [];
        assert_eq!(stack_bottom(&empty), 0);

        let positions = [GridPosition::new(0, 0, 4, 3), GridPosition::new(4, 2, 4, 5)];
        assert_eq!(stack_bottom(&positions), 7);
    }

    #[test]
    fn test_overlaps() {
        let a = GridPosition::new(0, 0, 4, 3);
        assert!(a.overlaps(&GridPosition::new(3, 2, 2, 2)));
        assert!(!a.overlaps(&GridPosition::new(4, 0, 4, 3)));
        assert!(!a.overlaps(&GridPosition::new(0, 3, 4, 3)));
    }
}
