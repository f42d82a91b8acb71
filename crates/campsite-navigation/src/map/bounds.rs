use super::WorldPoint;
use super::obstacles::ColliderId;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned world rectangle the walk grid covers.
///
/// `body` names the collider that defines the region (for example the
/// ground trigger of the campsite). The grid builder never treats that body
/// as an obstacle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    /// Bottom-left corner.
    pub min: WorldPoint,
    /// Top-right corner.
    pub max: WorldPoint,
    /// Collider defining the region, if any.
    #[cfg_attr(feature = "serde", serde(default))]
    pub body: Option<ColliderId>,
}

impl WorldBounds {
    /// Creates bounds from two opposite corners in any order.
    pub fn new(a: WorldPoint, b: WorldPoint) -> Self {
        Self {
            min: WorldPoint::new(a.x.min(b.x), a.y.min(b.y)),
            max: WorldPoint::new(a.x.max(b.x), a.y.max(b.y)),
            body: None,
        }
    }

    /// Creates bounds from a centre point and full size.
    pub fn from_center_size(center: WorldPoint, size: WorldPoint) -> Self {
        let half = size * 0.5;
        Self::new(center - half, center + half)
    }

    /// Marks `body` as the collider that defines these bounds.
    pub fn with_body(mut self, body: ColliderId) -> Self {
        self.body = Some(body);
        self
    }

    /// Width and height of the region.
    pub fn size(&self) -> WorldPoint {
        self.max - self.min
    }

    /// Returns `true` if `p` lies inside or on the edge of the region.
    pub fn contains(&self, p: WorldPoint) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corners_are_normalized() {
        let b = WorldBounds::new(WorldPoint::new(4.0, -1.0), WorldPoint::new(-2.0, 3.0));
        assert_eq!(b.min, WorldPoint::new(-2.0, -1.0));
        assert_eq!(b.max, WorldPoint::new(4.0, 3.0));
        assert_eq!(b.size(), WorldPoint::new(6.0, 4.0));
    }

    #[test]
    fn test_center_size() {
        let b = WorldBounds::from_center_size(WorldPoint::new(1.0, 1.0), WorldPoint::new(2.0, 4.0));
        assert_eq!(b.min, WorldPoint::new(0.0, -1.0));
        assert!(b.contains(WorldPoint::new(2.0, 3.0)));
        assert!(!b.contains(WorldPoint::new(2.1, 0.0)));
    }
}
