use campsite_navigation::map::{Collider, ColliderSet, FilteredColliders, ObstacleQuery};
use campsite_navigation::{Pathfinder, PathfinderSettings, WorldBounds, WorldPoint};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // A river across the middle with one bridge, a few trees, and a shelter
    // the trucks may drive through.
    let mut scene = ColliderSet::new();
    scene.push(Collider::rect(1, WorldPoint::new(0.0, 4.0), WorldPoint::new(4.5, 5.0)));
    scene.push(Collider::rect(2, WorldPoint::new(5.5, 4.0), WorldPoint::new(10.0, 5.0)));
    scene.push(Collider::circle(3, WorldPoint::new(2.0, 2.0), 0.6));
    scene.push(Collider::circle(4, WorldPoint::new(7.5, 7.0), 0.8));
    scene.push(
        Collider::rect(5, WorldPoint::new(7.0, 1.0), WorldPoint::new(8.5, 2.5)).with_tag("Shelter"),
    );

    let bounds = WorldBounds::new(WorldPoint::new(0.0, 0.0), WorldPoint::new(10.0, 9.0));
    let query = ObstacleQuery::default();
    let mut pathfinder = Pathfinder::new(PathfinderSettings::default()).unwrap();
    pathfinder
        .build_grid(Some(&bounds), &FilteredColliders::new(&scene, &query, None))
        .unwrap();

    let start = WorldPoint::new(0.5, 0.5);
    let goal = WorldPoint::new(9.0, 8.5);
    let result = pathfinder.find_path(start, goal);
    println!("{}", result);

    let grid = pathfinder.grid().unwrap();
    let cells: Vec<_> = result
        .path
        .iter()
        .flatten()
        .filter_map(|p| grid.world_to_grid(*p))
        .collect();
    println!("{}", grid.render_with_path(&cells));

    if let Some(path) = result.path {
        for (i, p) in path.iter().enumerate() {
            println!("{:3}: {}", i, p);
        }
    }
}
