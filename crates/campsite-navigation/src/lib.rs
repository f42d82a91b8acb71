#![warn(missing_docs)]
#![doc = "Grid pathfinding and delivery routing for the campsite simulation."]
#![doc = ""]
#![doc = "The crate turns a rectangular world region and its colliders into a"]
#![doc = "walkability grid, searches it with A*, and drives agents along the"]
#![doc = "resulting routes on tokio tasks. Delivery dispatch, weather pauses,"]
#![doc = "arrival countdowns, and shelter route previews are built on top."]

pub mod agent;
pub mod astar;
pub mod delivery;
pub mod driver;
pub mod error;
pub mod eta;
pub mod map;
pub mod pathfinder;
pub mod route;
pub mod settings;
pub mod shelter;
pub mod weather;

pub use agent::{AgentId, DeliveryHandle, DeliveryOutcome, Fleet, spawn_agent};
pub use astar::{NoPathReason, PathResult, astar_search_grid, find_nearest_walkable, octile_distance};
pub use delivery::{DeliveryBoard, DeliveryDispatcher, OrderId, OrderStatus};
pub use driver::{AgentDriver, AgentSnapshot, DriverEvent, DriverPhase, Leg};
pub use error::NavigationError;
pub use eta::{EtaCountdown, format_eta};
pub use map::{GridPoint, WalkGrid, WorldBounds, WorldPoint};
pub use pathfinder::Pathfinder;
pub use route::Route;
pub use settings::{DriverSettings, PathfinderSettings};
pub use shelter::{RouteStyle, Shelter, ShelterRoutes, plan_shelter_routes};
pub use weather::WeatherState;
