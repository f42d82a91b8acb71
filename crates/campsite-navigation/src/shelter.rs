//! Evacuation route preview: one path per rain shelter, best one highlighted.

use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::map::WorldPoint;
use crate::pathfinder::Pathfinder;
use crate::route::path_cost;

/// A rain shelter that routes can lead to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Shelter {
    /// Display name.
    pub name: String,
    /// Entrance position. Shelters without one get no route.
    pub anchor: Option<WorldPoint>,
}

impl Shelter {
    /// Creates a shelter with an entrance.
    pub fn new(name: impl Into<String>, anchor: WorldPoint) -> Self {
        Self {
            name: name.into(),
            anchor: Some(anchor),
        }
    }
}

/// How a shelter route should be drawn.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteStyle {
    /// The shortest of several routes.
    Best,
    /// Any other route.
    Alternative,
    /// No route: nothing is drawn.
    Hidden,
}

/// Route to one shelter.
#[derive(Debug, Clone, PartialEq)]
pub struct ShelterRoute {
    /// Shelter name.
    pub shelter: String,
    /// Waypoints, if a path was found.
    pub path: Option<Vec<WorldPoint>>,
    /// Polyline length; infinite without a usable path.
    pub cost: f32,
    /// Drawing style.
    pub style: RouteStyle,
}

/// Routes to every shelter, in shelter order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShelterRoutes {
    /// One entry per shelter.
    pub routes: Vec<ShelterRoute>,
    /// Index of the cheapest route with a finite cost.
    pub best: Option<usize>,
}

impl ShelterRoutes {
    /// The cheapest route.
    pub fn best_route(&self) -> Option<&ShelterRoute> {
        self.best.and_then(|i| self.routes.get(i))
    }
}

/// Plans a route from `start` to each shelter on the pathfinder's current grid.
///
/// The best route (lowest finite cost, so at least two waypoints) is styled
/// [`RouteStyle::Best`]. Every other route found is
/// [`RouteStyle::Alternative`], and shelters without a path are
/// [`RouteStyle::Hidden`].
pub fn plan_shelter_routes(pathfinder: &Pathfinder, start: WorldPoint, shelters: &[Shelter]) -> ShelterRoutes {
    let mut routes: Vec<ShelterRoute> = shelters
        .iter()
        .map(|shelter| {
            let path = shelter
                .anchor
                .and_then(|anchor| pathfinder.find_path(start, anchor).into_path())
                .filter(|p| !p.is_empty());
            let cost = path.as_deref().map_or(f32::INFINITY, path_cost);
            ShelterRoute {
                shelter: shelter.name.clone(),
                path,
                cost,
                style: RouteStyle::Alternative,
            }
        })
        .collect();

    let mut best: Option<usize> = None;
    for (i, route) in routes.iter().enumerate() {
        if route.cost.is_finite() && best.is_none_or(|b| route.cost < routes[b].cost) {
            best = Some(i);
        }
    }

    let path_count = routes.iter().filter(|r| r.path.is_some()).count();
    for (i, route) in routes.iter_mut().enumerate() {
        route.style = if route.path.is_none() {
            RouteStyle::Hidden
        } else if best == Some(i) {
            RouteStyle::Best
        } else {
            RouteStyle::Alternative
        };
    }

    debug!(shelters = shelters.len(), found = path_count, ?best, "Shelter routes planned");
    ShelterRoutes { routes, best }
}
