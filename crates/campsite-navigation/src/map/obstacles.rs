//! Obstacle geometry and the probe interface used by the grid builder.
//!
//! The builder asks one question per cell: "is anything solid overlapping
//! this square?". [`ObstacleProbe`] is that question. [`FilteredColliders`]
//! answers it for a [`ColliderSet`] after applying an [`ObstacleQuery`]
//! (layer mask, ignored tags, ignored colliders), and a plain `Vec<Aabb>`
//! answers it for tests and hand-made maps.

use super::WorldPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Answers whether a square sample area overlaps a blocking obstacle.
pub trait ObstacleProbe {
    /// Returns `true` if the square of side `side` centred on `center` overlaps
    /// something that should block movement.
    fn is_blocked(&self, center: WorldPoint, side: f32) -> bool;
}

impl<T: ObstacleProbe + ?Sized> ObstacleProbe for &T {
    fn is_blocked(&self, center: WorldPoint, side: f32) -> bool {
        (**self).is_blocked(center, side)
    }
}

/// Axis-aligned rectangle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Bottom-left corner.
    pub min: WorldPoint,
    /// Top-right corner.
    pub max: WorldPoint,
}

impl Aabb {
    /// Creates a rectangle from two opposite corners in any order.
    pub fn new(a: WorldPoint, b: WorldPoint) -> Self {
        Self {
            min: WorldPoint::new(a.x.min(b.x), a.y.min(b.y)),
            max: WorldPoint::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Creates the square of side `side` centred on `center`.
    pub fn square(center: WorldPoint, side: f32) -> Self {
        let half = WorldPoint::new(side * 0.5, side * 0.5);
        Self::new(center - half, center + half)
    }

    /// Returns `true` if the interiors of the two rectangles intersect.
    /// Rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }
}

impl ObstacleProbe for [Aabb] {
    fn is_blocked(&self, center: WorldPoint, side: f32) -> bool {
        let sample = Aabb::square(center, side);
        self.iter().any(|r| r.overlaps(&sample))
    }
}

impl ObstacleProbe for Vec<Aabb> {
    fn is_blocked(&self, center: WorldPoint, side: f32) -> bool {
        self.as_slice().is_blocked(center, side)
    }
}

/// Collider geometry.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Axis-aligned box.
    Rect(Aabb),
    /// Disc.
    Circle {
        /// Disc centre.
        center: WorldPoint,
        /// Disc radius.
        radius: f32,
    },
}

impl Shape {
    /// Returns `true` if the shape overlaps the rectangle `area`.
    pub fn overlaps(&self, area: &Aabb) -> bool {
        match self {
            Shape::Rect(r) => r.overlaps(area),
            Shape::Circle { center, radius } => {
                let nearest = WorldPoint::new(
                    center.x.clamp(area.min.x, area.max.x),
                    center.y.clamp(area.min.y, area.max.y),
                );
                nearest.distance_squared(*center) < radius * radius
            }
        }
    }
}

/// Stable identifier of a collider.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub u32);

/// Bit set of physics layers (0..32).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// Every layer.
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    /// No layer.
    pub const NONE: LayerMask = LayerMask(0);

    /// Builds a mask from a list of layer indices. Indices above 31 are ignored.
    pub fn from_layers(layers: &[u8]) -> Self {
        LayerMask(
            layers
                .iter()
                .filter(|&&l| l < 32)
                .fold(0, |mask, &l| mask | (1 << l)),
        )
    }

    /// Returns `true` if `layer` is part of the mask.
    pub fn contains(self, layer: u8) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// A physics collider in the campsite scene.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Collider {
    /// Identifier.
    pub id: ColliderId,
    /// Geometry.
    pub shape: Shape,
    /// Physics layer index.
    pub layer: u8,
    /// Free-form tag ("Shelter", "Bridge", ...).
    pub tag: Option<String>,
    /// Sensors detect overlaps but never block movement.
    pub is_sensor: bool,
    /// Disabled colliders are invisible to every query.
    pub enabled: bool,
}

impl Collider {
    /// Creates an enabled, solid, untagged collider on layer 0.
    pub fn new(id: ColliderId, shape: Shape) -> Self {
        Self {
            id,
            shape,
            layer: 0,
            tag: None,
            is_sensor: false,
            enabled: true,
        }
    }

    /// Creates an enabled, solid rectangle collider.
    pub fn rect(id: u32, a: WorldPoint, b: WorldPoint) -> Self {
        Self::new(ColliderId(id), Shape::Rect(Aabb::new(a, b)))
    }

    /// Creates an enabled, solid disc collider.
    pub fn circle(id: u32, center: WorldPoint, radius: f32) -> Self {
        Self::new(ColliderId(id), Shape::Circle { center, radius })
    }

    /// Sets the tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the physics layer.
    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    /// Marks the collider as a sensor.
    pub fn sensor(mut self) -> Self {
        self.is_sensor = true;
        self
    }

    /// Sets the enabled flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns `true` if the collider carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tag.as_deref() == Some(tag)
    }
}

/// The colliders of a scene.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColliderSet {
    colliders: Vec<Collider>,
}

impl ColliderSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collider.
    pub fn push(&mut self, collider: Collider) {
        self.colliders.push(collider);
    }

    /// Iterates over every collider, enabled or not.
    pub fn iter(&self) -> impl Iterator<Item = &Collider> {
        self.colliders.iter()
    }

    /// Number of colliders.
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Returns `true` if the set holds no colliders.
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Looks up a collider by id.
    pub fn get(&self, id: ColliderId) -> Option<&Collider> {
        self.colliders.iter().find(|c| c.id == id)
    }

    /// Enables or disables every collider carrying `tag`.
    ///
    /// Bridges use this: solid while it rains, passable otherwise. The change
    /// takes effect on the next grid rebuild.
    ///
    /// # Returns
    ///
    /// The number of colliders whose state actually changed.
    pub fn set_enabled_by_tag(&mut self, tag: &str, enabled: bool) -> usize {
        let mut changed = 0;
        for collider in self.colliders.iter_mut().filter(|c| c.has_tag(tag)) {
            if collider.enabled != enabled {
                collider.enabled = enabled;
                changed += 1;
            }
        }
        changed
    }

    /// Iterates over enabled colliders overlapping `area`.
    pub fn overlapping<'a>(&'a self, area: &'a Aabb) -> impl Iterator<Item = &'a Collider> + 'a {
        self.colliders
            .iter()
            .filter(move |c| c.enabled && c.shape.overlaps(area))
    }
}

impl FromIterator<Collider> for ColliderSet {
    fn from_iter<I: IntoIterator<Item = Collider>>(iter: I) -> Self {
        Self {
            colliders: iter.into_iter().collect(),
        }
    }
}

/// Which overlapping colliders count as obstacles.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct ObstacleQuery {
    /// Layers considered at all.
    pub layers: LayerMask,
    /// Tags that never block (shelters are walk-through by default).
    pub ignore_tags: Vec<String>,
    /// Specific colliders that never block.
    pub ignore_colliders: Vec<ColliderId>,
}

impl Default for ObstacleQuery {
    fn default() -> Self {
        Self {
            layers: LayerMask::ALL,
            ignore_tags: vec!["Shelter".to_string()],
            ignore_colliders: Vec::new(),
        }
    }
}

impl ObstacleQuery {
    /// Returns `true` if `collider` blocks movement under this query.
    ///
    /// # Arguments
    ///
    /// * `collider`: The overlapping collider.
    /// * `bounds_body`: The collider defining the grid bounds, which never blocks.
    pub fn blocks(&self, collider: &Collider, bounds_body: Option<ColliderId>) -> bool {
        if !collider.enabled || collider.is_sensor || !self.layers.contains(collider.layer) {
            return false;
        }
        if bounds_body == Some(collider.id) || self.ignore_colliders.contains(&collider.id) {
            return false;
        }
        match collider.tag.as_deref() {
            Some(tag) if !tag.is_empty() => !self.ignore_tags.iter().any(|t| t == tag),
            _ => true,
        }
    }
}

/// [`ObstacleProbe`] over a [`ColliderSet`] filtered by an [`ObstacleQuery`].
#[derive(Debug, Clone, Copy)]
pub struct FilteredColliders<'a> {
    colliders: &'a ColliderSet,
    query: &'a ObstacleQuery,
    bounds_body: Option<ColliderId>,
}

impl<'a> FilteredColliders<'a> {
    /// Creates a probe.
    pub fn new(
        colliders: &'a ColliderSet,
        query: &'a ObstacleQuery,
        bounds_body: Option<ColliderId>,
    ) -> Self {
        Self {
            colliders,
            query,
            bounds_body,
        }
    }
}

impl ObstacleProbe for FilteredColliders<'_> {
    fn is_blocked(&self, center: WorldPoint, side: f32) -> bool {
        let area = Aabb::square(center, side);
        self.colliders
            .overlapping(&area)
            .any(|c| self.query.blocks(c, self.bounds_body))
    }
}
