//! Fixed-step state machine that drives one agent along a route and back.
//!
//! ```text
//! Idle ─deliver_and_return─▶ Following(Outbound) ─▶ Settling ─▶ Following(Return) ─▶ Done
//! ```
//!
//! The driver is synchronous and knows nothing about time sources; the
//! async runtime in [`crate::agent`] calls [`AgentDriver::tick`] once per
//! fixed step.

use campsite_kinematics::{Facing, PointMass};
use tracing::{debug, info};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::NavigationError;
use crate::map::WorldPoint;
use crate::settings::DriverSettings;

/// Facing stays "down" until the agent is this far (squared) from its start.
const FACING_UNLOCK_DISTANCE_SQ: f32 = 0.02 * 0.02;
/// Minimum per-step distance improvement that does not count as a stall.
const STALL_EPSILON: f32 = 1e-5;
/// The goal waypoint is dropped from the return leg within this many arrive distances.
const RETURN_TRIM_FACTOR: f32 = 1.25;

/// Direction of travel along the delivery route.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Leg {
    /// Depot to goal.
    Outbound,
    /// Goal back to the depot.
    Return,
}

/// Where the driver is in its lifecycle.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DriverPhase {
    /// No route assigned yet.
    #[default]
    Idle,
    /// Moving along a leg.
    Following(Leg),
    /// Parked at the goal before turning around.
    Settling,
    /// Back at the start; no further events.
    Done,
}

/// Lifecycle notifications. Each is emitted at most once per delivery.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverEvent {
    /// The outbound leg finished.
    ReachedGoal,
    /// The return leg finished and the agent was reset to its start.
    Completed,
}

/// Observable agent state.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AgentSnapshot {
    /// Current position.
    pub position: WorldPoint,
    /// Current facing.
    pub facing: Facing,
    /// Lifecycle phase.
    pub phase: DriverPhase,
    /// Index of the waypoint being approached on the current leg.
    pub waypoint: usize,
    /// Whether movement is paused.
    pub paused: bool,
}

/// Drives one agent to a goal along a path, then back to where it started.
#[derive(Debug, Clone)]
pub struct AgentDriver {
    settings: DriverSettings,
    mass: PointMass,
    start: WorldPoint,
    position: WorldPoint,
    facing: Facing,
    facing_locked: bool,
    path: Vec<WorldPoint>,
    leg: Vec<WorldPoint>,
    index: usize,
    phase: DriverPhase,
    settle_remaining: f32,
    last_distance: f32,
    stall_steps: u32,
    paused: bool,
}

impl AgentDriver {
    /// Creates an idle driver parked at `start`, facing down.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationError::InvalidSettings)` if `settings` fail validation.
    pub fn new(start: WorldPoint, settings: DriverSettings) -> Result<Self, NavigationError> {
        settings.validate()?;
        let mass = PointMass::new(settings.speed)?;
        Ok(Self {
            settings,
            mass,
            start,
            position: start,
            facing: Facing::Down,
            facing_locked: true,
            path: Vec::new(),
            leg: Vec::new(),
            index: 0,
            phase: DriverPhase::Idle,
            settle_remaining: 0.0,
            last_distance: f32::INFINITY,
            stall_steps: 0,
            paused: false,
        })
    }

    /// Starts a delivery along `path`.
    ///
    /// An empty path completes at once: no movement, and
    /// `Some(DriverEvent::Completed)` is returned.
    pub fn deliver_and_return(&mut self, path: Vec<WorldPoint>) -> Option<DriverEvent> {
        if path.is_empty() {
            info!(start = %self.start, "Empty route, delivery completes immediately");
            self.phase = DriverPhase::Done;
            return Some(DriverEvent::Completed);
        }
        info!(waypoints = path.len(), start = %self.start, "Starting delivery");
        self.path = path.clone();
        self.begin_leg(Leg::Outbound, path);
        None
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// Negative or non-finite `dt` is treated as zero.
    pub fn tick(&mut self, dt: f32) -> Option<DriverEvent> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        match self.phase {
            DriverPhase::Idle | DriverPhase::Done => None,
            DriverPhase::Settling => {
                self.settle_remaining -= dt;
                if self.settle_remaining > 0.0 {
                    None
                } else {
                    self.start_return_leg()
                }
            }
            DriverPhase::Following(leg) => {
                if self.paused || !self.follow(dt) {
                    return None;
                }
                match leg {
                    Leg::Outbound => {
                        info!(position = %self.position, "Reached goal");
                        self.phase = DriverPhase::Settling;
                        self.settle_remaining = self.settings.settle_delay_secs;
                        Some(DriverEvent::ReachedGoal)
                    }
                    Leg::Return => Some(self.finish()),
                }
            }
        }
    }

    /// Pauses or resumes movement. Paused agents keep their waypoint index.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            debug!(paused, position = %self.position, "Agent pause state changed");
        }
        self.paused = paused;
    }

    /// Whether movement is paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Current position.
    pub fn position(&self) -> WorldPoint {
        self.position
    }

    /// Current facing.
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Lifecycle phase.
    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    /// Waypoints of the leg being driven.
    pub fn current_leg(&self) -> &[WorldPoint] {
        &self.leg
    }

    /// Returns `true` once the delivery has completed.
    pub fn is_done(&self) -> bool {
        self.phase == DriverPhase::Done
    }

    /// Copy of the observable state.
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            position: self.position,
            facing: self.facing,
            phase: self.phase,
            waypoint: self.index,
            paused: self.paused,
        }
    }

    fn begin_leg(&mut self, leg: Leg, points: Vec<WorldPoint>) {
        self.leg = points;
        self.index = 0;
        self.phase = DriverPhase::Following(leg);
        self.reset_progress();
        self.skip_arrived();
    }

    fn reset_progress(&mut self) {
        self.last_distance = f32::INFINITY;
        self.stall_steps = 0;
    }

    fn skip_arrived(&mut self) {
        while self
            .leg
            .get(self.index)
            .is_some_and(|w| self.position.distance(*w) <= self.settings.arrive_distance)
        {
            self.index += 1;
        }
    }

    fn advance(&mut self) {
        self.index += 1;
        self.reset_progress();
        self.skip_arrived();
    }

    /// Moves one step along the current leg. Returns `true` when the leg is finished.
    fn follow(&mut self, dt: f32) -> bool {
        self.skip_arrived();
        let Some(&target) = self.leg.get(self.index) else {
            return true;
        };
        let Ok(step) = self.mass.step_towards(self.position, target, dt) else {
            return false;
        };

        let distance = step.distance_before;
        self.position = step.position;
        self.update_facing(step.direction);

        if distance >= self.last_distance - STALL_EPSILON {
            self.stall_steps += 1;
        } else {
            self.stall_steps = 0;
        }
        self.last_distance = distance;

        if self.stall_steps >= self.settings.max_stall_steps || distance <= self.settings.snap_distance {
            debug!(waypoint = self.index, stalled = self.stall_steps, "Snapping to waypoint");
            self.position = target;
            self.advance();
        } else {
            self.skip_arrived();
        }
        self.index >= self.leg.len()
    }

    fn update_facing(&mut self, direction: Option<WorldPoint>) {
        if self.facing_locked {
            if self.position.distance_squared(self.start) <= FACING_UNLOCK_DISTANCE_SQ {
                self.facing = Facing::Down;
                return;
            }
            self.facing_locked = false;
        }
        if let Some(facing) = direction.and_then(Facing::from_direction) {
            self.facing = facing;
        }
    }

    fn start_return_leg(&mut self) -> Option<DriverEvent> {
        let mut back = self.path.clone();
        let trim = self.settings.arrive_distance * RETURN_TRIM_FACTOR;
        if back.last().is_some_and(|last| self.position.distance(*last) <= trim) {
            back.pop();
        }
        back.reverse();
        if back.is_empty() {
            return Some(self.finish());
        }
        debug!(waypoints = back.len(), "Starting return leg");
        self.begin_leg(Leg::Return, back);
        None
    }

    fn finish(&mut self) -> DriverEvent {
        self.position = self.start;
        self.facing = Facing::Down;
        self.facing_locked = true;
        self.phase = DriverPhase::Done;
        info!(start = %self.start, "Delivery complete, agent back at start");
        DriverEvent::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> WorldPoint {
        WorldPoint::new(x, y)
    }

    const DT: f32 = 0.02;

    fn run_to_end(driver: &mut AgentDriver, max_ticks: usize) -> Vec<DriverEvent> {
        let mut events = Vec::new();
        for _ in 0..max_ticks {
            if let Some(e) = driver.tick(DT) {
                events.push(e);
            }
            if driver.is_done() {
                break;
            }
        }
        events
    }

    #[test]
    fn test_round_trip_events_once() {
        let mut driver = AgentDriver::new(p(0.0, 0.0), DriverSettings::default()).unwrap();
        assert_eq!(driver.deliver_and_return(vec![p(0.5, 0.5), p(1.5, 0.5), p(2.5, 1.5)]), None);
        let events = run_to_end(&mut driver, 10_000);
        assert_eq!(events, vec![DriverEvent::ReachedGoal, DriverEvent::Completed]);
        assert_eq!(driver.position(), p(0.0, 0.0));
        assert_eq!(driver.facing(), Facing::Down);
        // Done drivers stay quiet.
        assert_eq!(driver.tick(DT), None);
    }

    #[test]
    fn test_empty_path_completes_immediately() {
        let mut driver = AgentDriver::new(p(1.0, 1.0), DriverSettings::default()).unwrap();
        assert_eq!(driver.deliver_and_return(Vec::new()), Some(DriverEvent::Completed));
        assert!(driver.is_done());
        assert_eq!(driver.position(), p(1.0, 1.0));
    }

    #[test]
    fn test_pause_holds_position_and_index() {
        let mut driver = AgentDriver::new(p(0.0, 0.0), DriverSettings::default()).unwrap();
        driver.deliver_and_return(vec![p(1.0, 0.0), p(2.0, 0.0), p(3.0, 0.0)]);
        for _ in 0..20 {
            driver.tick(DT);
        }
        driver.set_paused(true);
        let before = driver.snapshot();
        for _ in 0..100 {
            assert_eq!(driver.tick(DT), None);
        }
        let after = driver.snapshot();
        assert_eq!(before.position, after.position);
        assert_eq!(before.waypoint, after.waypoint);
        assert!(after.paused);

        driver.set_paused(false);
        driver.tick(DT);
        let resumed = driver.position();
        assert!(resumed.x > before.position.x);
        assert!(resumed.distance(before.position) <= 3.5 * DT + 1e-5);
        let events = run_to_end(&mut driver, 10_000);
        assert_eq!(events, vec![DriverEvent::ReachedGoal, DriverEvent::Completed]);
    }

    #[test]
    fn test_waypoints_within_arrive_distance_are_skipped() {
        let mut driver = AgentDriver::new(p(0.0, 0.0), DriverSettings::default()).unwrap();
        driver.deliver_and_return(vec![p(0.05, 0.0), p(1.0, 0.0)]);
        assert_eq!(driver.snapshot().waypoint, 1);
        assert_eq!(driver.phase(), DriverPhase::Following(Leg::Outbound));
    }

    #[test]
    fn test_facing_locked_until_clear_of_start() {
        let settings = DriverSettings { speed: 0.5, ..Default::default() };
        let mut driver = AgentDriver::new(p(0.0, 0.0), settings).unwrap();
        driver.deliver_and_return(vec![p(-2.0, 0.0)]);
        driver.tick(DT);
        // 0.01 units moved: still locked.
        assert_eq!(driver.facing(), Facing::Down);
        for _ in 0..5 {
            driver.tick(DT);
        }
        assert_eq!(driver.facing(), Facing::Left);
    }

    #[test]
    fn test_facing_follows_dominant_axis() {
        let mut driver = AgentDriver::new(p(0.0, 0.0), DriverSettings::default()).unwrap();
        driver.deliver_and_return(vec![p(0.0, 3.0), p(3.0, 3.5)]);
        for _ in 0..10 {
            driver.tick(DT);
        }
        assert_eq!(driver.facing(), Facing::Up);
        for _ in 0..60 {
            driver.tick(DT);
        }
        assert_eq!(driver.facing(), Facing::Right);
    }

    #[test]
    fn test_stall_snaps_to_waypoint() {
        let mut driver = AgentDriver::new(p(0.0, 0.0), DriverSettings::default()).unwrap();
        driver.deliver_and_return(vec![p(1.0, 0.0)]);
        // Zero-length steps make no progress; the 31st counts the 30th stall.
        for _ in 0..30 {
            assert_eq!(driver.tick(0.0), None);
        }
        assert_eq!(driver.position(), p(0.0, 0.0));
        assert_eq!(driver.tick(0.0), Some(DriverEvent::ReachedGoal));
        assert_eq!(driver.position(), p(1.0, 0.0));
    }

    #[test]
    fn test_return_leg_drops_goal_waypoint() {
        let mut driver = AgentDriver::new(p(0.0, 0.0), DriverSettings::default()).unwrap();
        driver.deliver_and_return(vec![p(1.0, 0.0), p(2.0, 0.0)]);
        let mut reached = false;
        for _ in 0..10_000 {
            if driver.tick(DT) == Some(DriverEvent::ReachedGoal) {
                reached = true;
            }
            if driver.phase() == DriverPhase::Following(Leg::Return) {
                break;
            }
        }
        assert!(reached);
        assert_eq!(driver.current_leg(), &[p(1.0, 0.0)]);
    }

    #[test]
    fn test_invalid_settings() {
        let settings = DriverSettings { speed: 0.0, ..Default::default() };
        assert!(matches!(
            AgentDriver::new(p(0.0, 0.0), settings),
            Err(NavigationError::InvalidSettings(_))
        ));
    }
}
