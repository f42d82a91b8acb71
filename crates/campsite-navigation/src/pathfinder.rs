//! World-level pathfinder: owns the current walk grid and answers path queries.

use tracing::{debug, error, info, warn};

use crate::astar::{NoPathReason, PathResult, astar_search_grid, find_nearest_walkable};
use crate::error::NavigationError;
use crate::map::{GridPoint, ObstacleProbe, WalkGrid, WorldBounds, WorldPoint, build_grid};
use crate::settings::PathfinderSettings;

/// Grid pathfinder for one world region.
///
/// The grid is only (re)built by [`Pathfinder::build_grid`]; path queries
/// never rebuild it. Queries take `&self`, so a pathfinder shared behind a
/// read-write lock serves concurrent searches while rebuilds take the
/// write side.
#[derive(Debug, Clone)]
pub struct Pathfinder {
    settings: PathfinderSettings,
    grid: Option<WalkGrid>,
}

impl Pathfinder {
    /// Creates a pathfinder with no grid.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationError::InvalidCellSize)` if the settings fail validation.
    pub fn new(settings: PathfinderSettings) -> Result<Self, NavigationError> {
        settings.validate()?;
        Ok(Self { settings, grid: None })
    }

    /// Creates a pathfinder around an existing grid.
    pub fn with_grid(settings: PathfinderSettings, grid: WalkGrid) -> Result<Self, NavigationError> {
        let mut pathfinder = Self::new(settings)?;
        pathfinder.grid = Some(grid);
        Ok(pathfinder)
    }

    /// Current settings.
    pub fn settings(&self) -> &PathfinderSettings {
        &self.settings
    }

    /// Current grid, if one has been built.
    pub fn grid(&self) -> Option<&WalkGrid> {
        self.grid.as_ref()
    }

    /// Returns `true` once a grid has been built.
    pub fn is_built(&self) -> bool {
        self.grid.is_some()
    }

    /// Rebuilds the grid over `bounds` from `probe`, replacing the previous grid.
    ///
    /// # Arguments
    ///
    /// * `bounds`: Region to cover. `None` means the scene never configured one.
    /// * `probe`: Obstacle source.
    ///
    /// # Errors
    ///
    /// Returns `Err(NavigationError::MissingBounds)` when `bounds` is `None`, or
    /// the builder's error. The previous grid is kept on any error.
    pub fn build_grid<P: ObstacleProbe + ?Sized>(
        &mut self,
        bounds: Option<&WorldBounds>,
        probe: &P,
    ) -> Result<(), NavigationError> {
        let Some(bounds) = bounds else {
            error!("Cannot build walk grid: world bounds are not configured");
            return Err(NavigationError::MissingBounds);
        };
        let grid = build_grid(bounds, self.settings.cell_size, probe)?;
        info!(
            width = grid.width(),
            height = grid.height(),
            blocked = grid.blocked_count(),
            "Walk grid rebuilt"
        );
        self.grid = Some(grid);
        Ok(())
    }

    /// Finds a path between two world positions.
    ///
    /// Both positions are mapped to their (clamped) cells. The returned
    /// waypoints are cell centres from the start cell to the goal cell, or
    /// to the relaxed goal cell when the requested one is blocked.
    ///
    /// # Returns
    ///
    /// A [`PathResult`] whose `failure` names the reason when no path exists.
    pub fn find_path(&self, start: WorldPoint, goal: WorldPoint) -> PathResult<WorldPoint> {
        let Some(grid) = self.grid.as_ref() else {
            warn!("find_path called before the walk grid was built");
            return PathResult::failure(NoPathReason::GridNotBuilt, 0);
        };
        let start_cell = grid.world_to_grid_clamped(start);
        let goal_cell = grid.world_to_grid_clamped(goal);
        self.find_path_cells(grid, start_cell, goal_cell)
            .map_path(|p| grid.cell_center(p))
    }

    /// Same as [`Pathfinder::find_path`] but on cells.
    pub fn find_path_grid(&self, start: GridPoint, goal: GridPoint) -> PathResult<GridPoint> {
        match self.grid.as_ref() {
            Some(grid) => self.find_path_cells(grid, start, goal),
            None => PathResult::failure(NoPathReason::GridNotBuilt, 0),
        }
    }

    fn find_path_cells(&self, grid: &WalkGrid, start: GridPoint, goal: GridPoint) -> PathResult<GridPoint> {
        if !grid.is_walkable(start) {
            warn!(%start, "Path start cell is blocked");
            return PathResult::failure(NoPathReason::StartBlocked, 0);
        }

        if grid.is_walkable(goal) {
            return self.search(grid, start, goal);
        }
        if !self.settings.relax_blocked_goal {
            warn!(%goal, "Path goal cell is blocked and relaxation is disabled");
            return PathResult::failure(NoPathReason::GoalBlocked, 0);
        }
        match find_nearest_walkable(grid, goal, self.settings.relax_max_radius) {
            Some(relaxed) => {
                debug!(%goal, %relaxed, "Relaxed blocked goal");
                self.search(grid, start, relaxed).with_relaxed_goal(relaxed)
            }
            None => {
                warn!(
                    %goal,
                    radius = self.settings.relax_max_radius,
                    "No walkable cell near blocked goal"
                );
                PathResult::failure(NoPathReason::GoalUnreachable, 0)
            }
        }
    }

    fn search(&self, grid: &WalkGrid, start: GridPoint, goal: GridPoint) -> PathResult<GridPoint> {
        let result = astar_search_grid(grid, start, goal);
        match result.failure {
            None => debug!(
                %start,
                %goal,
                waypoints = result.path_length,
                nodes_explored = result.nodes_explored,
                "Path found"
            ),
            Some(reason) => warn!(%start, %goal, %reason, "No path"),
        }
        result
    }
}
