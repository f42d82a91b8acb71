//! This module defines the error types used by the `campsite-navigation` crate.

#![warn(missing_docs)]

use campsite_kinematics::KinematicsError;

/// Error type for navigation operations.
///
/// This enum covers configuration and access problems. A search that simply
/// finds no route is not an error: it is reported through
/// [`PathResult`](crate::astar::PathResult) with a
/// [`NoPathReason`](crate::astar::NoPathReason).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NavigationError {
    /// Error for an invalid cell size.
    /// This variant is returned when a cell size is provided that is not positive.
    #[error("Invalid cell size: {0}")]
    InvalidCellSize(&'static str),
    /// Error for invalid grid dimensions.
    /// This variant is returned when grid width or height is zero.
    #[error("Invalid grid dimensions: {0}")]
    InvalidDimensions(&'static str),
    /// Error for out-of-bounds access.
    /// This variant is returned when attempting to access cells outside the grid.
    #[error("Grid access out of bounds: {0}")]
    OutOfBounds(&'static str),
    /// Error for a missing world bounds reference.
    /// The grid is left untouched when this is returned.
    #[error("World bounds are not configured")]
    MissingBounds,
    /// Error for settings that fail validation.
    #[error("Invalid settings: {0}")]
    InvalidSettings(&'static str),
    /// Error for a route without waypoints handed to an agent.
    #[error("Route has no waypoints")]
    EmptyRoute,
    /// Error raised by the motion model.
    #[error(transparent)]
    Kinematics(#[from] KinematicsError),
}
