use campsite_navigation::map::{Aabb, build_grid};
use campsite_navigation::{GridPoint, WorldBounds, WorldPoint, astar_search_grid, find_nearest_walkable};
use rand::Rng;

fn main() {
    let mut rng = rand::rng();

    // 20x20 cells of 0.5 units, with 15 random boxes up to 1.5 units wide.
    let bounds = WorldBounds::new(WorldPoint::new(-5.0, -5.0), WorldPoint::new(5.0, 5.0));
    let obstacles: Vec<Aabb> = (0..15)
        .map(|_| {
            let x = rng.random_range(-5.0..4.0);
            let y = rng.random_range(-5.0..4.0);
            let w = rng.random_range(0.3..1.5);
            let h = rng.random_range(0.3..1.5);
            Aabb::new(WorldPoint::new(x, y), WorldPoint::new(x + w, y + h))
        })
        .collect();

    let grid = match build_grid(&bounds, 0.5, &obstacles) {
        Ok(grid) => grid,
        Err(e) => {
            println!("Error building grid: {}", e);
            return;
        }
    };
    println!("{}", grid);

    let start = find_nearest_walkable(&grid, GridPoint::new(0, 0), 6);
    let goal = find_nearest_walkable(&grid, GridPoint::new(19, 19), 6);
    let (Some(start), Some(goal)) = (start, goal) else {
        println!("No walkable start or goal near the corners.");
        return;
    };

    let result = astar_search_grid(&grid, start, goal);
    println!("{} -> {}: {}", start, goal, result);
    if let Some(path) = &result.path {
        println!("{}", grid.render_with_path(path));
    }
}
