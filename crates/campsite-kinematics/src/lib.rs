#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for 2D point-mass kinematics."]
#![doc = ""]
#![doc = "This crate provides a small world-space vector type, a dominant-axis facing"]
#![doc = "direction, and a constant-speed stepper used to move agents along routes."]

use core::fmt;
use core::ops::{Add, Mul, Sub};
use libm::{fabsf, sqrtf};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::KinematicsError;

/// Distances at or below this are treated as "already there" by [`PointMass::step_towards`].
pub const MIN_STEP_DISTANCE: f32 = 1e-5;

/// A 2‑D vector `(x, y)` in world units.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Vec2 {
    /// World‑frame x coordinate.
    pub x: f32,
    /// World‑frame y coordinate.
    pub y: f32,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Construct a new vector.
    ///
    /// # Arguments
    ///
    /// * `x`: World-frame x coordinate.
    /// * `y`: World-frame y coordinate.
    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Squared Euclidean length.
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Euclidean length.
    pub fn length(self) -> f32 {
        sqrtf(self.length_squared())
    }

    /// Squared Euclidean distance to `other`.
    pub fn distance_squared(self, other: Vec2) -> f32 {
        (other - self).length_squared()
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Vec2) -> f32 {
        (other - self).length()
    }

    /// Unit vector pointing the same way, or `None` for a (near) zero vector.
    pub fn normalized(self) -> Option<Vec2> {
        let len = self.length();
        if len > MIN_STEP_DISTANCE {
            Some(Vec2::new(self.x / len, self.y / len))
        } else {
            None
        }
    }

    /// Returns `true` if both components are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for Vec2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// The sprite direction an agent shows while moving.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Facing {
    /// Moving toward +y.
    Up,
    /// Moving toward -y. Also the idle pose.
    #[default]
    Down,
    /// Moving toward -x.
    Left,
    /// Moving toward +x.
    Right,
}

impl Facing {
    /// Picks the facing for a movement direction using its dominant axis.
    ///
    /// Ties between the axes resolve to the horizontal facing. Directions with a
    /// squared length below `1e-4` carry no reliable heading and yield `None`.
    ///
    /// # Arguments
    ///
    /// * `direction`: Movement direction (need not be normalized).
    pub fn from_direction(direction: Vec2) -> Option<Facing> {
        if direction.length_squared() < 1e-4 {
            return None;
        }
        let horizontal = fabsf(direction.x) >= fabsf(direction.y);
        Some(match (horizontal, direction.x >= 0.0, direction.y >= 0.0) {
            (true, true, _) => Facing::Right,
            (true, false, _) => Facing::Left,
            (false, _, true) => Facing::Up,
            (false, _, false) => Facing::Down,
        })
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Facing::Up => "up",
            Facing::Down => "down",
            Facing::Left => "left",
            Facing::Right => "right",
        };
        f.write_str(name)
    }
}

/// Result of a single constant-speed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStep {
    /// Position after the step.
    pub position: Vec2,
    /// Unit direction of travel, `None` when the agent was already on the target.
    pub direction: Option<Vec2>,
    /// Distance to the target measured before the step.
    pub distance_before: f32,
    /// Distance actually travelled during the step.
    pub travelled: f32,
}

/// Constant-speed point-mass motion helper.
///
/// Agents in the simulation have no inertia: each fixed step moves them
/// straight toward their current waypoint by `speed * dt`, never past it.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointMass {
    /// Travel speed (world units per second).
    speed: f32,
}

impl PointMass {
    /// Construct a new point-mass helper.
    ///
    /// # Arguments
    ///
    /// * `speed`: Travel speed in world units per second.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidSpeed)` if `speed` is not a positive finite number.
    pub fn new(speed: f32) -> Result<Self, KinematicsError> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(KinematicsError::InvalidSpeed("must be positive and finite"));
        }
        Ok(PointMass { speed })
    }

    /// Returns the travel speed.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Moves `position` toward `target` for `dt` seconds.
    ///
    /// # Arguments
    ///
    /// * `position`: Current position.
    /// * `target`: Waypoint being approached.
    /// * `dt`: The time delta in seconds.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::NegativeTimeDelta)` if `dt` is negative.
    ///
    /// # Returns
    ///
    /// The new position together with the direction and distances involved.
    pub fn step_towards(
        &self,
        position: Vec2,
        target: Vec2,
        dt: f32,
    ) -> Result<MotionStep, KinematicsError> {
        if dt < 0.0 {
            return Err(KinematicsError::NegativeTimeDelta("must be non-negative"));
        }

        let delta = target - position;
        let distance_before = delta.length();
        if distance_before <= MIN_STEP_DISTANCE {
            return Ok(MotionStep {
                position,
                direction: None,
                distance_before,
                travelled: 0.0,
            });
        }

        let direction = delta * (1.0 / distance_before);
        let travelled = (self.speed * dt).min(distance_before);
        Ok(MotionStep {
            position: position + direction * travelled,
            direction: Some(direction),
            distance_before,
            travelled,
        })
    }

    /// Time in seconds needed to cover `distance` at this speed.
    pub fn travel_time(&self, distance: f32) -> f32 {
        distance / self.speed
    }
}

impl fmt::Display for PointMass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PointMass (speed: {:.2} u/s)", self.speed)
    }
}
