//! Grid A* with octile costs, corner-cut prevention, and blocked-goal relaxation.
//!
//! f(n) = g(n) + h(n), where g is the accumulated move cost from the start
//! and h is the octile distance to the goal. Orthogonal moves cost
//! [`ORTHOGONAL_COST`], diagonal moves [`DIAGONAL_COST`]. A diagonal move is
//! only allowed when both orthogonally adjacent cells it passes are walkable.
//!
//! Search state lives in scratch buffers owned by each call, so a
//! [`WalkGrid`] can be searched from several threads at once.

use crate::map::{GridPoint, WalkGrid};

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use tracing::{debug, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Cost of a horizontal or vertical step.
pub const ORTHOGONAL_COST: u32 = 10;
/// Cost of a diagonal step (≈ 10·√2).
pub const DIAGONAL_COST: u32 = 14;

/// Neighbour offsets in expansion order.
const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const NO_PARENT: usize = usize::MAX;

/// Why a search produced no path.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoPathReason {
    /// `find_path` was called before any grid was built.
    GridNotBuilt,
    /// The start cell is blocked. Starts are never relaxed.
    StartBlocked,
    /// The goal cell is blocked and relaxation is disabled.
    GoalBlocked,
    /// No walkable cell near the goal, or the open set ran dry.
    GoalUnreachable,
    /// More than `2 × width × height` nodes were expanded.
    SearchBudgetExceeded,
}

impl fmt::Display for NoPathReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NoPathReason::GridNotBuilt => "grid not built",
            NoPathReason::StartBlocked => "start cell blocked",
            NoPathReason::GoalBlocked => "goal cell blocked",
            NoPathReason::GoalUnreachable => "goal unreachable",
            NoPathReason::SearchBudgetExceeded => "search budget exceeded",
        };
        f.write_str(s)
    }
}

/// Represents the result of an A* pathfinding operation with metadata.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PathResult<T> {
    /// The computed path, if one was found.
    pub path: Option<Vec<T>>,
    /// The total cost of the path.
    pub total_cost: Option<u32>,
    /// The number of nodes expanded during the search.
    pub nodes_explored: usize,
    /// The length of the path (number of waypoints).
    pub path_length: usize,
    /// Why no path was produced.
    pub failure: Option<NoPathReason>,
    /// The cell actually searched for when the requested goal was blocked.
    pub relaxed_goal: Option<GridPoint>,
}

impl<T> PathResult<T> {
    /// Creates a new PathResult for a successful path.
    pub fn success(path: Vec<T>, total_cost: u32, nodes_explored: usize) -> Self {
        let path_length = path.len();
        Self {
            path: Some(path),
            total_cost: Some(total_cost),
            nodes_explored,
            path_length,
            failure: None,
            relaxed_goal: None,
        }
    }

    /// Creates a new PathResult for a failed path search.
    pub fn failure(reason: NoPathReason, nodes_explored: usize) -> Self {
        Self {
            path: None,
            total_cost: None,
            nodes_explored,
            path_length: 0,
            failure: Some(reason),
            relaxed_goal: None,
        }
    }

    /// Records the relaxed goal the search ended up targeting.
    pub fn with_relaxed_goal(mut self, goal: GridPoint) -> Self {
        self.relaxed_goal = Some(goal);
        self
    }

    /// Returns true if a path was found.
    pub fn is_success(&self) -> bool {
        self.path.is_some()
    }

    /// Returns the path if one was found.
    pub fn into_path(self) -> Option<Vec<T>> {
        self.path
    }

    /// Converts every waypoint, keeping the metadata.
    pub fn map_path<U>(self, f: impl FnMut(T) -> U) -> PathResult<U> {
        PathResult {
            path: self.path.map(|p| p.into_iter().map(f).collect()),
            total_cost: self.total_cost,
            nodes_explored: self.nodes_explored,
            path_length: self.path_length,
            failure: self.failure,
            relaxed_goal: self.relaxed_goal,
        }
    }
}

impl<T> fmt::Display for PathResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.path, self.failure) {
            (Some(_), _) => write!(
                f,
                "PathResult {{ success: true, path_length: {}, total_cost: {}, nodes_explored: {} }}",
                self.path_length,
                self.total_cost.unwrap_or(0),
                self.nodes_explored
            ),
            (None, reason) => write!(
                f,
                "PathResult {{ success: false, reason: {}, nodes_explored: {} }}",
                reason.map_or_else(|| "unknown".to_string(), |r| r.to_string()),
                self.nodes_explored
            ),
        }
    }
}

/// Octile distance between two cells: `14·min(dx, dy) + 10·(max − min)`.
///
/// Exact for an empty 8-connected grid, hence admissible and consistent.
pub fn octile_distance(a: GridPoint, b: GridPoint) -> u32 {
    let dx = a.x.abs_diff(b.x) as u32;
    let dy = a.y.abs_diff(b.y) as u32;
    let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
    DIAGONAL_COST * lo + ORTHOGONAL_COST * (hi - lo)
}

/// Walkable neighbours of `p` with their step cost.
///
/// Diagonals are dropped when either flanking orthogonal cell is blocked,
/// so paths never clip an obstacle corner.
fn neighbors(grid: &WalkGrid, p: GridPoint) -> impl Iterator<Item = (GridPoint, u32)> + '_ {
    let (x, y) = (p.x as isize, p.y as isize);
    NEIGHBOR_OFFSETS.iter().filter_map(move |&(dx, dy)| {
        let (nx, ny) = (x + dx, y + dy);
        if !grid.is_walkable_at(nx, ny) {
            return None;
        }
        let diagonal = dx != 0 && dy != 0;
        if diagonal && (!grid.is_walkable_at(x + dx, y) || !grid.is_walkable_at(x, y + dy)) {
            return None;
        }
        let cost = if diagonal { DIAGONAL_COST } else { ORTHOGONAL_COST };
        Some((GridPoint::new(nx as usize, ny as usize), cost))
    })
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct State {
    f: u32,
    h: u32,
    seq: u64,
    index: usize,
}

// The priority queue depends on `Ord`. Flip every comparison so the
// `BinaryHeap` pops the lowest f, then the lowest h, then the oldest entry.
impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .cmp(&self.f)
            .then_with(|| other.h.cmp(&self.h))
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn reconstruct_path(grid: &WalkGrid, parent: &[usize], mut current: usize) -> Vec<GridPoint> {
    let mut path = vec![grid.point(current)];
    while parent[current] != NO_PARENT {
        current = parent[current];
        path.push(grid.point(current));
    }
    path.reverse();
    path
}

/// Finds a path between two cells using A*.
///
/// No relaxation happens here: a blocked goal fails with
/// [`NoPathReason::GoalBlocked`]. Cells outside the grid count as blocked.
///
/// # Arguments
/// * `grid` - The grid to plan in.
/// * `start` - Starting cell.
/// * `goal` - Goal cell.
///
/// # Returns
/// * `PathResult<GridPoint>` - Cells from start to goal inclusive, or the failure reason.
pub fn astar_search_grid(grid: &WalkGrid, start: GridPoint, goal: GridPoint) -> PathResult<GridPoint> {
    if !grid.is_walkable(start) {
        return PathResult::failure(NoPathReason::StartBlocked, 0);
    }
    if !grid.is_walkable(goal) {
        return PathResult::failure(NoPathReason::GoalBlocked, 0);
    }

    let cells = grid.len();
    let max_expansions = cells.saturating_mul(2);
    let goal_index = grid.index(goal);

    let mut g_score = vec![u32::MAX; cells];
    let mut parent = vec![NO_PARENT; cells];
    let mut closed = vec![false; cells];
    let mut open_set = BinaryHeap::new();
    let mut seq: u64 = 0;

    let start_index = grid.index(start);
    let h = octile_distance(start, goal);
    g_score[start_index] = 0;
    open_set.push(State { f: h, h, seq, index: start_index });

    let mut nodes_explored = 0;
    while let Some(State { index: current, .. }) = open_set.pop() {
        // Stale entry: a cheaper copy of this node was already expanded.
        if closed[current] {
            continue;
        }
        nodes_explored += 1;

        if current == goal_index {
            let path = reconstruct_path(grid, &parent, current);
            return PathResult::success(path, g_score[current], nodes_explored);
        }
        closed[current] = true;

        let current_point = grid.point(current);
        for (neighbor, step) in neighbors(grid, current_point) {
            let n = grid.index(neighbor);
            if closed[n] {
                continue;
            }
            let tentative_g = g_score[current] + step;
            if tentative_g < g_score[n] {
                g_score[n] = tentative_g;
                parent[n] = current;
                let h = octile_distance(neighbor, goal);
                seq += 1;
                open_set.push(State { f: tentative_g + h, h, seq, index: n });
            }
        }

        if nodes_explored > max_expansions {
            warn!(nodes_explored, %start, %goal, "A* search budget exceeded");
            return PathResult::failure(NoPathReason::SearchBudgetExceeded, nodes_explored);
        }
    }

    debug!(nodes_explored, %start, %goal, "A* open set exhausted");
    PathResult::failure(NoPathReason::GoalUnreachable, nodes_explored)
}

/// Finds the walkable cell nearest to `target` by scanning square rings.
///
/// Returns `target` itself when it is walkable. Otherwise rings of radius
/// `1..=max_radius` are scanned, each clamped to the grid: first the bottom
/// and top rows column by column (`(x, min_y)` then `(x, max_y)`), then the
/// left and right columns row by row (`(min_x, y)` then `(max_x, y)`),
/// corners excluded. The first walkable cell wins.
///
/// # Arguments
/// * `grid` - The grid to search.
/// * `target` - Desired cell, clamped into the grid first.
/// * `max_radius` - Largest ring radius examined.
pub fn find_nearest_walkable(grid: &WalkGrid, target: GridPoint, max_radius: usize) -> Option<GridPoint> {
    let target = GridPoint::new(
        target.x.min(grid.width() - 1),
        target.y.min(grid.height() - 1),
    );
    if grid.is_walkable(target) {
        return Some(target);
    }

    for r in 1..=max_radius {
        let min_x = target.x.saturating_sub(r);
        let max_x = (target.x + r).min(grid.width() - 1);
        let min_y = target.y.saturating_sub(r);
        let max_y = (target.y + r).min(grid.height() - 1);

        for x in min_x..=max_x {
            for p in [GridPoint::new(x, min_y), GridPoint::new(x, max_y)] {
                if grid.is_walkable(p) {
                    return Some(p);
                }
            }
        }
        for y in (min_y + 1)..max_y {
            for p in [GridPoint::new(min_x, y), GridPoint::new(max_x, y)] {
                if grid.is_walkable(p) {
                    return Some(p);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::WorldPoint;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn grid_from(rows: &[&str]) -> WalkGrid {
        WalkGrid::from_ascii(rows, 1.0, WorldPoint::new(0.0, 0.0)).unwrap()
    }

    fn assert_valid_path(grid: &WalkGrid, path: &[GridPoint]) {
        for w in path.windows(2) {
            let (a, b) = (w[0], w[1]);
            assert!(a.is_adjacent(b), "{a} -> {b} is not a single step");
            assert!(grid.is_walkable(b));
            if a.x != b.x && a.y != b.y {
                assert!(grid.is_walkable(GridPoint::new(b.x, a.y)), "corner cut at {a} -> {b}");
                assert!(grid.is_walkable(GridPoint::new(a.x, b.y)), "corner cut at {a} -> {b}");
            }
        }
    }

    fn path_cost(path: &[GridPoint]) -> u32 {
        path.windows(2).map(|w| octile_distance(w[0], w[1])).sum()
    }

    /// Plain Dijkstra over the same move rules, used as ground truth.
    fn brute_force_cost(grid: &WalkGrid, start: GridPoint, goal: GridPoint) -> Option<u32> {
        if !grid.is_walkable(start) || !grid.is_walkable(goal) {
            return None;
        }
        let mut dist = vec![u32::MAX; grid.len()];
        let mut done = vec![false; grid.len()];
        dist[grid.index(start)] = 0;
        loop {
            let next = (0..grid.len())
                .filter(|&i| !done[i] && dist[i] != u32::MAX)
                .min_by_key(|&i| dist[i])?;
            if next == grid.index(goal) {
                return Some(dist[next]);
            }
            done[next] = true;
            for (nb, step) in neighbors(grid, grid.point(next)) {
                let n = grid.index(nb);
                dist[n] = dist[n].min(dist[next] + step);
            }
        }
    }

    #[test]
    fn test_octile_distance() {
        let o = GridPoint::new(0, 0);
        assert_eq!(octile_distance(o, GridPoint::new(3, 0)), 30);
        assert_eq!(octile_distance(o, GridPoint::new(2, 2)), 28);
        assert_eq!(octile_distance(GridPoint::new(5, 1), GridPoint::new(1, 3)), 48);
        assert_eq!(octile_distance(o, o), 0);
    }

    #[test]
    fn test_empty_grid_diagonal() {
        let grid = WalkGrid::new(10, 10, 1.0, WorldPoint::new(0.0, 0.0)).unwrap();
        let result = astar_search_grid(&grid, GridPoint::new(0, 0), GridPoint::new(9, 9));
        assert_eq!(result.total_cost, Some(126));
        let path = result.into_path().unwrap();
        assert_eq!(path.len(), 10);
        for (i, p) in path.iter().enumerate() {
            assert_eq!(*p, GridPoint::new(i, i));
        }
    }

    #[test]
    fn test_start_equals_goal() {
        let grid = WalkGrid::new(3, 3, 1.0, WorldPoint::new(0.0, 0.0)).unwrap();
        let result = astar_search_grid(&grid, GridPoint::new(1, 1), GridPoint::new(1, 1));
        assert_eq!(result.total_cost, Some(0));
        assert_eq!(result.into_path(), Some(vec![GridPoint::new(1, 1)]));
    }

    #[test]
    fn test_wall_with_gap() {
        let mut grid = WalkGrid::new(10, 10, 1.0, WorldPoint::new(0.0, 0.0)).unwrap();
        for y in 0..10 {
            if y != 5 {
                grid.set_walkable(GridPoint::new(5, y), false).unwrap();
            }
        }
        let result = astar_search_grid(&grid, GridPoint::new(0, 0), GridPoint::new(9, 0));
        let path = result.into_path().unwrap();
        assert!(path.contains(&GridPoint::new(5, 5)));
        assert_valid_path(&grid, &path);
    }

    #[test]
    fn test_no_corner_cutting() {
        // Blocked cells at (1,1) and (2,0) form an L around the diagonal (1,0)->(2,1).
        let grid = grid_from(&[
            "....",
            ".#..",
            "..#.",
            "....",
        ]);
        let start = GridPoint::new(0, 0);
        let goal = GridPoint::new(3, 3);
        let path = astar_search_grid(&grid, start, goal).into_path().unwrap();
        assert_valid_path(&grid, &path);
    }

    #[test]
    fn test_diagonal_squeeze_is_refused() {
        // Two blocked cells touching only at a corner; the diagonal between them is closed.
        let grid = grid_from(&[
            ".#",
            "#.",
        ]);
        let result = astar_search_grid(&grid, GridPoint::new(0, 1), GridPoint::new(1, 0));
        assert_eq!(result.failure, Some(NoPathReason::GoalUnreachable));
        assert!(result.path.is_none());
    }

    #[test]
    fn test_start_or_goal_blocked() {
        let grid = grid_from(&[
            "...",
            ".#.",
            "...",
        ]);
        let blocked = GridPoint::new(1, 1);
        let free = GridPoint::new(2, 2);
        assert_eq!(
            astar_search_grid(&grid, blocked, free).failure,
            Some(NoPathReason::StartBlocked)
        );
        assert_eq!(
            astar_search_grid(&grid, free, blocked).failure,
            Some(NoPathReason::GoalBlocked)
        );
    }

    #[test]
    fn test_enclosed_goal_unreachable() {
        let grid = grid_from(&[
            ".....",
            ".###.",
            ".#.#.",
            ".###.",
            ".....",
        ]);
        let result = astar_search_grid(&grid, GridPoint::new(0, 0), GridPoint::new(2, 2));
        assert_eq!(result.failure, Some(NoPathReason::GoalUnreachable));
        assert!(result.nodes_explored > 0);
        assert!(format!("{result}").contains("goal unreachable"));
    }

    #[test]
    fn test_nearest_walkable_ring_order() {
        let grid = grid_from(&[
            ".....",
            ".###.",
            ".###.",
            ".###.",
            ".....",
        ]);
        // Ring 1 around (2,2) is fully blocked; ring 2 starts at (0, 0).
        assert_eq!(find_nearest_walkable(&grid, GridPoint::new(2, 2), 1), None);
        assert_eq!(
            find_nearest_walkable(&grid, GridPoint::new(2, 2), 2),
            Some(GridPoint::new(0, 0))
        );
        // Walkable target is returned unchanged.
        assert_eq!(
            find_nearest_walkable(&grid, GridPoint::new(4, 4), 3),
            Some(GridPoint::new(4, 4))
        );
    }

    #[test]
    fn test_nearest_walkable_scans_rows_before_columns() {
        // Target (1,1) blocked; free cells at (0,1) (left column) and (2,2) (top row).
        let grid = grid_from(&[
            "##.",
            ".##",
            "###",
        ]);
        assert_eq!(
            find_nearest_walkable(&grid, GridPoint::new(1, 1), 1),
            Some(GridPoint::new(2, 2))
        );
    }

    #[test]
    fn test_nearest_walkable_clamps_to_grid() {
        let grid = grid_from(&[
            "..#",
            "###",
        ]);
        assert_eq!(
            find_nearest_walkable(&grid, GridPoint::new(2, 0), 1),
            Some(GridPoint::new(1, 1))
        );
        assert_eq!(
            find_nearest_walkable(&grid, GridPoint::new(50, 0), 1),
            Some(GridPoint::new(1, 1))
        );
    }

    #[test]
    fn test_matches_brute_force_on_random_grids() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let width = rng.random_range(2..9);
            let height = rng.random_range(2..9);
            let mut grid = WalkGrid::new(width, height, 1.0, WorldPoint::new(0.0, 0.0)).unwrap();
            for y in 0..height {
                for x in 0..width {
                    if rng.random_bool(0.3) {
                        grid.set_walkable(GridPoint::new(x, y), false).unwrap();
                    }
                }
            }
            let start = GridPoint::new(rng.random_range(0..width), rng.random_range(0..height));
            let goal = GridPoint::new(rng.random_range(0..width), rng.random_range(0..height));

            let result = astar_search_grid(&grid, start, goal);
            let expected = brute_force_cost(&grid, start, goal);
            assert_eq!(result.total_cost, expected, "grid:\n{grid}start {start} goal {goal}");

            if let Some(path) = result.path {
                assert_eq!(path.first(), Some(&start));
                assert_eq!(path.last(), Some(&goal));
                assert_eq!(path_cost(&path), expected.unwrap_or(u32::MAX));
                assert_valid_path(&grid, &path);
            }
        }
    }

    #[test]
    fn test_concurrent_searches_share_grid() {
        let grid = std::sync::Arc::new(WalkGrid::new(20, 20, 1.0, WorldPoint::new(0.0, 0.0)).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let grid = grid.clone();
                std::thread::spawn(move || {
                    astar_search_grid(&grid, GridPoint::new(i, 0), GridPoint::new(19, 19)).total_cost
                })
            })
            .collect();
        for (i, h) in handles.into_iter().enumerate() {
            let cost = h.join().unwrap();
            assert_eq!(cost, Some(octile_distance(GridPoint::new(i, 0), GridPoint::new(19, 19))));
        }
    }
}
