use super::{GridPoint, WorldBounds, WorldPoint};
use crate::error::NavigationError;

/// A 2D walkability grid over a rectangular region of the campsite.
///
/// The grid only stores whether each cell can be entered. It is fixed once
/// built and read-only during searches; a rebuild produces a new grid.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct WalkGrid {
    /// Width of the grid in cells
    width: usize,
    /// Height of the grid in cells
    height: usize,
    /// Side length of a cell in world units
    cell_size: f32,
    /// X coordinate of the origin (bottom-left corner) in world coordinates
    origin_x: f32,
    /// Y coordinate of the origin (bottom-left corner) in world coordinates
    origin_y: f32,
    /// Row-major walkable flags
    walkable: Vec<bool>,
}

impl WalkGrid {
    /// Creates a new fully walkable grid.
    ///
    /// # Arguments
    /// * `width` - Width of the grid in cells
    /// * `height` - Height of the grid in cells
    /// * `cell_size` - Side length of a cell in world units
    /// * `origin` - The world coordinates of the bottom-left corner of cell (0,0)
    ///
    /// # Returns
    /// * `Result<Self, NavigationError>` - The created grid or an error if parameters are invalid
    pub fn new(
        width: usize,
        height: usize,
        cell_size: f32,
        origin: WorldPoint,
    ) -> Result<Self, NavigationError> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(NavigationError::InvalidCellSize("Cell size must be positive"));
        }
        if width == 0 || height == 0 {
            return Err(NavigationError::InvalidDimensions(
                "Width and height must be non-zero",
            ));
        }
        if width.checked_mul(height).is_none() {
            return Err(NavigationError::InvalidDimensions(
                "Grid dimensions too large, would cause overflow",
            ));
        }

        Ok(WalkGrid {
            width,
            height,
            cell_size,
            origin_x: origin.x,
            origin_y: origin.y,
            walkable: vec![true; width * height],
        })
    }

    /// Parses a grid from rows of text, top row first. `#` marks a blocked
    /// cell, anything else is walkable. Handy for tests and examples.
    ///
    /// # Errors
    /// * `InvalidDimensions` if there are no rows or the rows differ in length.
    pub fn from_ascii(
        rows: &[&str],
        cell_size: f32,
        origin: WorldPoint,
    ) -> Result<Self, NavigationError> {
        let height = rows.len();
        let width = rows.first().map_or(0, |r| r.chars().count());
        if rows.iter().any(|r| r.chars().count() != width) {
            return Err(NavigationError::InvalidDimensions("Rows must have equal length"));
        }
        let mut grid = WalkGrid::new(width, height, cell_size, origin)?;
        for (row, line) in rows.iter().enumerate() {
            let y = height - 1 - row;
            for (x, c) in line.chars().enumerate() {
                if c == '#' {
                    grid.set_walkable(GridPoint::new(x, y), false)?;
                }
            }
        }
        Ok(grid)
    }

    pub(crate) fn index(&self, p: GridPoint) -> usize {
        p.y * self.width + p.x
    }

    pub(crate) fn point(&self, index: usize) -> GridPoint {
        GridPoint::new(index % self.width, index / self.width)
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.walkable.len()
    }

    /// Always `false`: a grid has at least one cell.
    pub fn is_empty(&self) -> bool {
        self.walkable.is_empty()
    }

    /// Side length of a cell in world units.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Returns `true` if `p` addresses a cell of this grid.
    pub fn contains(&self, p: GridPoint) -> bool {
        p.x < self.width && p.y < self.height
    }

    /// Converts world coordinates to grid coordinates.
    /// Returns None if the world coordinates are outside the grid.
    ///
    /// # Arguments
    /// * `world_p` - Point in world frame
    pub fn world_to_grid(&self, world_p: WorldPoint) -> Option<GridPoint> {
        let grid_x_f = (world_p.x - self.origin_x) / self.cell_size;
        let grid_y_f = (world_p.y - self.origin_y) / self.cell_size;

        // A point exactly on the max boundary is considered outside.
        if !(grid_x_f >= 0.0
            && grid_y_f >= 0.0
            && grid_x_f < self.width as f32
            && grid_y_f < self.height as f32)
        {
            return None;
        }

        let p = GridPoint::new(grid_x_f.floor() as usize, grid_y_f.floor() as usize);
        self.contains(p).then_some(p)
    }

    /// Converts world coordinates to the nearest grid cell, clamping points
    /// outside the grid onto its border. Non-finite coordinates clamp to 0.
    ///
    /// # Arguments
    /// * `world_p` - Point in world frame
    pub fn world_to_grid_clamped(&self, world_p: WorldPoint) -> GridPoint {
        let clamp = |v: f32, origin: f32, n: usize| -> usize {
            let cell = ((v - origin) / self.cell_size).floor();
            // Float-to-int casts saturate and map NaN to 0.
            (cell as i64).clamp(0, n as i64 - 1) as usize
        };
        GridPoint::new(
            clamp(world_p.x, self.origin_x, self.width),
            clamp(world_p.y, self.origin_y, self.height),
        )
    }

    /// Converts grid coordinates to the world coordinates of the cell centre.
    ///
    /// # Arguments
    /// * `grid_p` - Point in grid frame (cells)
    ///
    /// # Returns
    /// * `Option<WorldPoint>` - World coordinates if within bounds, None otherwise
    pub fn grid_to_world(&self, grid_p: GridPoint) -> Option<WorldPoint> {
        self.contains(grid_p).then(|| self.cell_center(grid_p))
    }

    /// World centre of `p`, without a bounds check.
    pub(crate) fn cell_center(&self, p: GridPoint) -> WorldPoint {
        WorldPoint::new(
            self.origin_x + (p.x as f32 + 0.5) * self.cell_size,
            self.origin_y + (p.y as f32 + 0.5) * self.cell_size,
        )
    }

    /// Gets the world coordinates of the grid origin (bottom-left corner).
    pub fn origin(&self) -> WorldPoint {
        WorldPoint::new(self.origin_x, self.origin_y)
    }

    /// Gets the world rectangle covered by the grid. This may extend past the
    /// bounds it was built from, since partial cells are rounded up.
    pub fn world_bounds(&self) -> WorldBounds {
        let min_p = self.origin();
        let max_p = WorldPoint::new(
            self.origin_x + self.width as f32 * self.cell_size,
            self.origin_y + self.height as f32 * self.cell_size,
        );
        WorldBounds::new(min_p, max_p)
    }

    /// Returns `true` if `p` is inside the grid and walkable.
    pub fn is_walkable(&self, p: GridPoint) -> bool {
        self.contains(p) && self.walkable[self.index(p)]
    }

    /// Signed-offset walkability lookup used by neighbour expansion.
    pub(crate) fn is_walkable_at(&self, x: isize, y: isize) -> bool {
        x >= 0 && y >= 0 && self.is_walkable(GridPoint::new(x as usize, y as usize))
    }

    /// Sets the walkable flag of a cell.
    ///
    /// # Arguments
    /// * `p` - Point in grid frame (cells)
    /// * `walkable` - The new flag
    ///
    /// # Returns
    /// * `Result<(), NavigationError>` - Success or error if out of bounds
    pub fn set_walkable(&mut self, p: GridPoint, walkable: bool) -> Result<(), NavigationError> {
        if self.contains(p) {
            let index = self.index(p);
            self.walkable[index] = walkable;
            Ok(())
        } else {
            Err(NavigationError::OutOfBounds("Grid index out of bounds"))
        }
    }

    /// Number of blocked cells.
    pub fn blocked_count(&self) -> usize {
        self.walkable.iter().filter(|w| !**w).count()
    }

    /// Gets a reference to the underlying row-major walkable flags.
    pub fn data(&self) -> &[bool] {
        &self.walkable
    }

    /// Renders the grid top row first, overlaying `path` cells with `*`.
    pub fn render_with_path(&self, path: &[GridPoint]) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in (0..self.height).rev() {
            for x in 0..self.width {
                let p = GridPoint::new(x, y);
                let c = if path.contains(&p) {
                    '*'
                } else if self.is_walkable(p) {
                    '.'
                } else {
                    '#'
                };
                out.push(c);
            }
            out.push('\n');
        }
        out
    }
}

impl std::fmt::Display for WalkGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "WalkGrid ({}x{}, cell size: {:.3})",
            self.width, self.height, self.cell_size
        )?;
        writeln!(f, "Origin: ({:.3}, {:.3})", self.origin_x, self.origin_y)?;
        f.write_str(&self.render_with_path(&[]))
    }
}
