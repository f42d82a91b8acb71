//! Grid representation of the campsite and the pieces used to build it.

pub mod bounds;
pub mod builder;
pub mod grid;
pub mod obstacles;
pub mod point_types;

pub use bounds::WorldBounds;
pub use builder::{SAMPLE_MARGIN, build_grid};
pub use grid::WalkGrid;
pub use obstacles::{
    Aabb, Collider, ColliderId, ColliderSet, FilteredColliders, LayerMask, ObstacleProbe,
    ObstacleQuery, Shape,
};
pub use point_types::{GridPoint, WorldPoint};
