#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a point in world coordinates (world units).
pub use campsite_kinematics::Vec2 as WorldPoint;

/// Represents a point in grid coordinates (cell indices).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint {
    /// The x-coordinate (column index) in the grid.
    pub x: usize,
    /// The y-coordinate (row index) in the grid.
    pub y: usize,
}

impl GridPoint {
    /// Creates a new `GridPoint`.
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Offsets the point by `(dx, dy)`, returning `None` when either coordinate would go negative.
    #[must_use]
    pub fn offset(self, dx: isize, dy: isize) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    /// Returns `true` if `other` is one of the eight cells surrounding `self`.
    pub fn is_adjacent(self, other: GridPoint) -> bool {
        let dx = self.x.abs_diff(other.x);
        let dy = self.y.abs_diff(other.y);
        dx <= 1 && dy <= 1 && (dx, dy) != (0, 0)
    }
}

impl std::fmt::Display for GridPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset() {
        let p = GridPoint::new(1, 0);
        assert_eq!(p.offset(1, 1), Some(GridPoint::new(2, 1)));
        assert_eq!(p.offset(-1, 0), Some(GridPoint::new(0, 0)));
        assert_eq!(p.offset(0, -1), None);
    }

    #[test]
    fn test_adjacency() {
        let p = GridPoint::new(3, 3);
        assert!(p.is_adjacent(GridPoint::new(4, 4)));
        assert!(p.is_adjacent(GridPoint::new(3, 2)));
        assert!(!p.is_adjacent(p));
        assert!(!p.is_adjacent(GridPoint::new(5, 3)));
    }
}
