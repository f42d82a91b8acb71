//! World-space polylines handed to agents.

use std::time::Duration;

use crate::map::WorldPoint;

/// Squared distance under which the requested goal is considered already
/// covered by the last waypoint.
pub const EXACT_GOAL_EPSILON_SQ: f32 = 1e-4;

/// Length of a polyline, or `f32::INFINITY` when it has fewer than two points.
pub fn path_cost(points: &[WorldPoint]) -> f32 {
    if points.len() < 2 {
        return f32::INFINITY;
    }
    polyline_length(points)
}

fn polyline_length(points: &[WorldPoint]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// An ordered list of waypoints from a start to a goal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    waypoints: Vec<WorldPoint>,
}

impl Route {
    /// Wraps a list of waypoints.
    pub fn new(waypoints: Vec<WorldPoint>) -> Self {
        Self { waypoints }
    }

    /// Two-point route used when no grid path exists.
    pub fn straight_line(start: WorldPoint, goal: WorldPoint) -> Self {
        Self::new(vec![start, goal])
    }

    /// Appends `goal` unless the last waypoint already sits on it.
    ///
    /// Grid paths end on a cell centre; callers that need to stop on the exact
    /// requested point use this.
    pub fn with_exact_goal(mut self, goal: WorldPoint) -> Self {
        match self.waypoints.last() {
            Some(last) if last.distance_squared(goal) <= EXACT_GOAL_EPSILON_SQ => {}
            _ => self.waypoints.push(goal),
        }
        self
    }

    /// Waypoints in travel order.
    pub fn waypoints(&self) -> &[WorldPoint] {
        &self.waypoints
    }

    /// Consumes the route.
    pub fn into_waypoints(self) -> Vec<WorldPoint> {
        self.waypoints
    }

    /// Number of waypoints.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Returns `true` if the route has no waypoints.
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Final waypoint.
    pub fn last(&self) -> Option<WorldPoint> {
        self.waypoints.last().copied()
    }

    /// Sum of the Euclidean segment lengths. Zero for fewer than two points.
    pub fn length(&self) -> f32 {
        polyline_length(&self.waypoints)
    }

    /// Time to drive the route once at `speed`.
    ///
    /// Returns `Duration::ZERO` for a non-positive speed or a non-finite result.
    pub fn planned_duration(&self, speed: f32) -> Duration {
        if speed <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f32(self.length() / speed).unwrap_or(Duration::ZERO)
    }
}

impl From<Vec<WorldPoint>> for Route {
    fn from(waypoints: Vec<WorldPoint>) -> Self {
        Self::new(waypoints)
    }
}
