use tracing::debug;

use super::{GridPoint, ObstacleProbe, WalkGrid, WorldBounds};
use crate::error::NavigationError;

/// Fraction of the cell side sampled for obstacles. The gap keeps colliders
/// that only touch a cell's edge from blocking it.
pub const SAMPLE_MARGIN: f32 = 0.9;

/// Builds a walk grid covering `bounds`.
///
/// The grid is `max(1, ceil(width / cell_size)) × max(1, ceil(height / cell_size))`
/// cells with its origin at `bounds.min`. Each cell is blocked when `probe`
/// reports an obstacle in the square of side `cell_size * SAMPLE_MARGIN`
/// centred on the cell.
///
/// # Arguments
/// * `bounds` - Region to cover.
/// * `cell_size` - Side length of a cell in world units.
/// * `probe` - Obstacle source.
///
/// # Errors
/// * `InvalidCellSize` if `cell_size` is not positive and finite.
/// * `InvalidDimensions` if the bounds are not finite or too large.
pub fn build_grid<P: ObstacleProbe + ?Sized>(
    bounds: &WorldBounds,
    cell_size: f32,
    probe: &P,
) -> Result<WalkGrid, NavigationError> {
    if !cell_size.is_finite() || cell_size <= 0.0 {
        return Err(NavigationError::InvalidCellSize("Cell size must be positive"));
    }
    let size = bounds.size();
    if !size.is_finite() || !bounds.min.is_finite() {
        return Err(NavigationError::InvalidDimensions("Bounds must be finite"));
    }

    let width = ((size.x / cell_size).ceil() as usize).max(1);
    let height = ((size.y / cell_size).ceil() as usize).max(1);
    let mut grid = WalkGrid::new(width, height, cell_size, bounds.min)?;
    debug!(width, height, origin = %bounds.min, cell_size, "Building walk grid");

    let side = cell_size * SAMPLE_MARGIN;
    for y in 0..height {
        for x in 0..width {
            let p = GridPoint::new(x, y);
            if probe.is_blocked(grid.cell_center(p), side) {
                grid.set_walkable(p, false)?;
            }
        }
    }

    debug!(blocked = grid.blocked_count(), total = grid.len(), "Walk grid built");
    Ok(grid)
}
