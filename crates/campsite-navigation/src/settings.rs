//! Tunables for the pathfinder and the agent driver.

use std::time::Duration;

use crate::error::NavigationError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Pathfinder configuration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct PathfinderSettings {
    /// Side length of a grid cell in world units.
    pub cell_size: f32,
    /// Retarget a blocked goal to the nearest walkable cell.
    pub relax_blocked_goal: bool,
    /// Largest ring radius (in cells) searched when relaxing a goal.
    pub relax_max_radius: usize,
}

impl Default for PathfinderSettings {
    fn default() -> Self {
        Self {
            cell_size: 0.5,
            relax_blocked_goal: true,
            relax_max_radius: 6,
        }
    }
}

impl PathfinderSettings {
    /// Checks the settings.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationError::InvalidCellSize)` if `cell_size` is not positive and finite.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if !self.cell_size.is_finite() || self.cell_size <= 0.0 {
            return Err(NavigationError::InvalidCellSize("Cell size must be positive"));
        }
        Ok(())
    }
}

/// Agent driver configuration.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    /// Travel speed in world units per second.
    pub speed: f32,
    /// Speed used for ETA estimates when `speed` is not positive.
    pub fallback_speed: f32,
    /// A waypoint counts as reached within this distance.
    pub arrive_distance: f32,
    /// Consecutive non-improving steps before snapping to the waypoint.
    pub max_stall_steps: u32,
    /// Snap to the waypoint once this close.
    pub snap_distance: f32,
    /// Pause at the goal before the return leg, in seconds.
    pub settle_delay_secs: f32,
    /// Length of one simulation step, in seconds.
    pub fixed_step_secs: f32,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            speed: 3.5,
            fallback_speed: 3.5,
            arrive_distance: 0.08,
            max_stall_steps: 30,
            snap_distance: 0.03,
            settle_delay_secs: 0.05,
            fixed_step_secs: 0.02,
        }
    }
}

impl DriverSettings {
    /// Checks the settings.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationError::InvalidSettings)` naming the first bad field.
    pub fn validate(&self) -> Result<(), NavigationError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(NavigationError::InvalidSettings("speed must be positive"));
        }
        if !self.arrive_distance.is_finite() || self.arrive_distance < 0.0 {
            return Err(NavigationError::InvalidSettings("arrive_distance must be non-negative"));
        }
        if !self.snap_distance.is_finite() || self.snap_distance < 0.0 {
            return Err(NavigationError::InvalidSettings("snap_distance must be non-negative"));
        }
        if !self.settle_delay_secs.is_finite() || self.settle_delay_secs < 0.0 {
            return Err(NavigationError::InvalidSettings("settle_delay_secs must be non-negative"));
        }
        if !self.fixed_step_secs.is_finite() || self.fixed_step_secs <= 0.0 {
            return Err(NavigationError::InvalidSettings("fixed_step_secs must be positive"));
        }
        Ok(())
    }

    /// Speed used to turn a route length into an ETA.
    pub fn eta_speed(&self) -> f32 {
        if self.speed > 0.0 {
            self.speed
        } else {
            self.fallback_speed.max(0.01)
        }
    }

    /// Length of one simulation step.
    pub fn fixed_step(&self) -> Duration {
        Duration::try_from_secs_f32(self.fixed_step_secs.max(0.001)).unwrap_or(Duration::from_millis(20))
    }
}
