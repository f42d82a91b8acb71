#![warn(missing_docs)]

//! Error types for the kinematics library.
//!
//! This module defines error types that can occur while stepping an agent
//! along its route.

use core::fmt;

/// Errors that can occur in kinematic calculations.
#[derive(Debug, Clone, PartialEq)]
pub enum KinematicsError {
    /// Error for invalid travel speed.
    /// This variant is returned when a speed is provided that is not a positive finite number.
    InvalidSpeed(&'static str),
    /// Error for negative time delta.
    /// This variant is returned when a negative time delta is used for a motion step.
    NegativeTimeDelta(&'static str),
}

impl core::fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::InvalidSpeed(msg) => write!(f, "Invalid speed: {}", msg),
            KinematicsError::NegativeTimeDelta(msg) => write!(f, "Negative time delta: {}", msg),
        }
    }
}

impl core::error::Error for KinematicsError {}
