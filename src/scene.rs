//! The demo campsite: a river with one bridge, trees, a lake, and two shelters.

use campsite_navigation::map::{Collider, ColliderId, ColliderSet};
use campsite_navigation::{Shelter, WorldBounds, WorldPoint};

/// Collider that defines the playable area. It never blocks.
pub const BOUNDS_BODY: ColliderId = ColliderId(0);

/// Scene contents shared by the dispatcher and the shelter preview.
#[derive(Debug, Clone)]
pub struct Campsite {
    pub colliders: ColliderSet,
    pub bounds: WorldBounds,
    pub shelters: Vec<Shelter>,
}

fn p(x: f32, y: f32) -> WorldPoint {
    WorldPoint::new(x, y)
}

impl Campsite {
    /// A 20 x 12 campsite. The river at y 5.5..6.5 can only be crossed on
    /// the bridge at x 9..10, which starts out open.
    pub fn demo() -> Self {
        let mut colliders = ColliderSet::new();
        colliders.push(Collider::rect(BOUNDS_BODY.0, p(0.0, 0.0), p(20.0, 12.0)));

        colliders.push(Collider::rect(1, p(0.0, 5.5), p(9.0, 6.5)).with_tag("River"));
        colliders.push(Collider::rect(2, p(10.0, 5.5), p(20.0, 6.5)).with_tag("River"));
        colliders.push(Collider::rect(3, p(9.0, 5.5), p(10.0, 6.5)).with_tag("Bridge").enabled(false));

        colliders.push(Collider::circle(10, p(4.0, 3.0), 0.8));
        colliders.push(Collider::circle(11, p(14.0, 2.5), 1.0));
        colliders.push(Collider::circle(12, p(6.0, 9.0), 0.7));
        colliders.push(Collider::circle(13, p(16.0, 9.5), 0.9));
        colliders.push(Collider::rect(14, p(11.5, 8.0), p(14.0, 10.5)).with_tag("Lake"));

        colliders.push(Collider::rect(20, p(2.0, 9.0), p(3.5, 10.5)).with_tag("Shelter"));
        colliders.push(Collider::rect(21, p(17.0, 3.5), p(18.5, 5.0)).with_tag("Shelter"));

        colliders.push(Collider::circle(30, p(8.0, 3.0), 0.5).with_tag("FirePit").sensor());

        let shelters = vec![
            Shelter::new("Pine hut", p(2.75, 8.5)),
            Shelter::new("Boathouse", p(17.75, 3.0)),
            Shelter {
                name: "Treehouse (unbuilt)".to_string(),
                anchor: None,
            },
        ];

        Self {
            colliders,
            bounds: WorldBounds::new(p(0.0, 0.0), p(20.0, 12.0)).with_body(BOUNDS_BODY),
            shelters,
        }
    }
}
