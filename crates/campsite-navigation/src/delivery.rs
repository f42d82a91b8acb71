//! Delivery orders: routing a truck from the depot to a goal and tracking the order.
//!
//! [`DeliveryDispatcher`] plans a route on a freshly rebuilt grid, spawns
//! the agent, and records progress on a shared [`DeliveryBoard`]. Orders
//! placed while it rains wait for clear skies before a truck leaves.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::agent::{DeliveryHandle, DeliveryOutcome, Fleet, spawn_agent};
use crate::driver::DriverEvent;
use crate::error::NavigationError;
use crate::eta::{ETA_PLACEHOLDER, EtaCountdown, format_eta};
use crate::map::{ColliderSet, FilteredColliders, ObstacleQuery, WorldBounds, WorldPoint};
use crate::pathfinder::Pathfinder;
use crate::route::Route;
use crate::settings::DriverSettings;
use crate::weather::WeatherState;

/// Identifier of a delivery order.
pub type OrderId = u64;

/// Progress of the active order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderStatus {
    /// No order placed yet.
    #[default]
    Idle,
    /// Ordered during rain; the truck leaves once it stops.
    WaitingForClearSkies,
    /// Truck on its way.
    EnRoute,
    /// Truck reached the goal.
    Delivered,
    /// The order could not be fulfilled.
    Failed,
}

/// Shared order state.
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    /// Order currently tracked. Updates for other orders are ignored.
    pub active_order: Option<OrderId>,
    /// Status of the active order.
    pub status: OrderStatus,
    /// Goal of the active order.
    pub goal: Option<WorldPoint>,
    /// Arrival countdown, set once a truck is en route.
    pub eta: Option<EtaCountdown>,
    /// Reason for the last failure.
    pub last_failure: Option<String>,
    /// Number of orders delivered so far.
    pub delivered: u64,
    next_order: OrderId,
}

/// Order board shared between the dispatcher, agent monitors, and readers.
pub type DeliveryBoard = Arc<RwLock<BoardState>>;

/// Creates an empty board.
pub fn new_board() -> DeliveryBoard {
    Arc::new(RwLock::new(BoardState::default()))
}

/// Copy of the board.
pub fn snapshot(board: &DeliveryBoard) -> BoardState {
    (*board.read()).clone()
}

/// Opens a new order, superseding the previous one.
///
/// Returns `None` while an order is still waiting or en route.
pub fn begin_order(board: &DeliveryBoard, goal: WorldPoint) -> Option<OrderId> {
    let mut g = board.write();
    if matches!(g.status, OrderStatus::WaitingForClearSkies | OrderStatus::EnRoute) {
        return None;
    }
    let id = g.next_order;
    g.next_order += 1;
    g.active_order = Some(id);
    g.status = OrderStatus::Idle;
    g.goal = Some(goal);
    g.eta = None;
    g.last_failure = None;
    Some(id)
}

fn update(board: &DeliveryBoard, order: OrderId, f: impl FnOnce(&mut BoardState)) -> bool {
    let mut g = board.write();
    if g.active_order != Some(order) {
        debug!(order, active = ?g.active_order, "Ignoring update for stale order");
        return false;
    }
    f(&mut g);
    true
}

/// Marks `order` as waiting for the rain to stop.
pub fn mark_waiting(board: &DeliveryBoard, order: OrderId) -> bool {
    update(board, order, |g| {
        g.status = OrderStatus::WaitingForClearSkies;
        g.eta = None;
    })
}

/// Marks `order` as en route with the given countdown.
pub fn mark_en_route(board: &DeliveryBoard, order: OrderId, eta: EtaCountdown) -> bool {
    update(board, order, |g| {
        g.status = OrderStatus::EnRoute;
        g.eta = Some(eta);
    })
}

/// Marks `order` as delivered at `now`.
pub fn mark_delivered(board: &DeliveryBoard, order: OrderId, now: Instant) -> bool {
    update(board, order, |g| {
        g.status = OrderStatus::Delivered;
        if let Some(eta) = g.eta.as_mut() {
            eta.complete(now);
        }
        g.delivered += 1;
    })
}

/// Marks `order` as failed.
pub fn mark_failed(board: &DeliveryBoard, order: OrderId, reason: &str) -> bool {
    update(board, order, |g| {
        g.status = OrderStatus::Failed;
        g.eta = None;
        g.last_failure = Some(reason.to_string());
    })
}

/// Freezes (`raining`) or resumes the active countdown.
pub fn set_eta_frozen(board: &DeliveryBoard, raining: bool, now: Instant) {
    let mut g = board.write();
    if g.status != OrderStatus::EnRoute {
        return;
    }
    if let Some(eta) = g.eta.as_mut() {
        if raining {
            eta.freeze(now);
        } else {
            eta.unfreeze(now);
        }
    }
}

/// Countdown text for the active order.
pub fn eta_label(board: &DeliveryBoard, now: Instant) -> String {
    let g = board.read();
    match (g.status, g.eta) {
        (OrderStatus::EnRoute | OrderStatus::Delivered, Some(eta)) => format_eta(Some(eta.remaining(now))),
        _ => ETA_PLACEHOLDER.to_string(),
    }
}

/// A route ready to drive.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    /// Waypoints from the depot to the exact goal.
    pub route: Route,
    /// Estimated one-way driving time.
    pub planned: Duration,
    /// `true` when no grid path existed and a straight line is used instead.
    pub fell_back: bool,
}

/// A truck on its way.
#[derive(Debug)]
pub struct Delivery {
    /// The running agent.
    pub handle: DeliveryHandle,
    /// Estimated one-way driving time.
    pub planned: Duration,
    /// `true` when the truck drives a straight-line fallback.
    pub fell_back: bool,
}

/// Sends delivery trucks from a depot.
#[derive(Debug, Clone)]
pub struct DeliveryDispatcher {
    pathfinder: Arc<RwLock<Pathfinder>>,
    scene: Arc<RwLock<ColliderSet>>,
    query: ObstacleQuery,
    bounds: Option<WorldBounds>,
    depot: WorldPoint,
    driver: DriverSettings,
    weather: WeatherState,
    fleet: Fleet,
    board: DeliveryBoard,
    rain_barrier_tag: Option<String>,
}

impl DeliveryDispatcher {
    /// Creates a dispatcher with no bounds configured and the default obstacle query.
    pub fn new(
        pathfinder: Arc<RwLock<Pathfinder>>,
        scene: Arc<RwLock<ColliderSet>>,
        depot: WorldPoint,
        driver: DriverSettings,
        weather: WeatherState,
    ) -> Self {
        Self {
            pathfinder,
            scene,
            query: ObstacleQuery::default(),
            bounds: None,
            depot,
            driver,
            weather,
            fleet: Fleet::new(),
            board: new_board(),
            rain_barrier_tag: None,
        }
    }

    /// Sets the region the grid covers.
    pub fn with_bounds(mut self, bounds: WorldBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Sets which colliders count as obstacles.
    pub fn with_query(mut self, query: ObstacleQuery) -> Self {
        self.query = query;
        self
    }

    /// Colliders tagged `tag` become solid while it rains (see [`DeliveryDispatcher::watch_weather`]).
    pub fn with_rain_barriers(mut self, tag: impl Into<String>) -> Self {
        self.rain_barrier_tag = Some(tag.into());
        self
    }

    /// Order board.
    pub fn board(&self) -> DeliveryBoard {
        self.board.clone()
    }

    /// Live agents.
    pub fn fleet(&self) -> &Fleet {
        &self.fleet
    }

    /// Weather the agents follow.
    pub fn weather(&self) -> &WeatherState {
        &self.weather
    }

    /// Depot position.
    pub fn depot(&self) -> WorldPoint {
        self.depot
    }

    /// Rebuilds the grid and plans a route from the depot to `goal`.
    ///
    /// Rain barriers are first synced with the current weather.
    ///
    /// Falls back to a straight line when the grid has no path. The exact
    /// goal is appended when the last waypoint is not already on it.
    ///
    /// # Errors
    ///
    /// * `MissingBounds` if no bounds were configured.
    /// * Any grid builder error.
    pub fn plan_route(&self, goal: WorldPoint) -> Result<PlannedRoute, NavigationError> {
        let bounds = self.bounds.as_ref();
        if let Some(tag) = self.rain_barrier_tag.as_deref() {
            set_rain_barriers(&self.scene, tag, self.weather.is_raining());
        }
        {
            let scene = self.scene.read();
            let probe = FilteredColliders::new(&scene, &self.query, bounds.and_then(|b| b.body));
            self.pathfinder.write().build_grid(bounds, &probe)?;
        }

        let result = self.pathfinder.read().find_path(self.depot, goal);
        let failure = result.failure;
        let (route, fell_back) = match result.into_path() {
            Some(path) if !path.is_empty() => (Route::new(path), false),
            _ => {
                warn!(depot = %self.depot, %goal, reason = ?failure, "No path, using a straight line");
                (Route::straight_line(self.depot, goal), true)
            }
        };
        let route = route.with_exact_goal(goal);
        let planned = route.planned_duration(self.driver.eta_speed());
        debug!(waypoints = route.len(), length = route.length(), ?planned, "Route planned");
        Ok(PlannedRoute { route, planned, fell_back })
    }

    /// Plans a route to `goal` and sends a truck along it.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Propagates planning and spawning errors; nothing is spawned on error.
    pub fn spawn_and_deliver(&self, goal: WorldPoint) -> Result<Delivery, NavigationError> {
        let PlannedRoute { route, planned, fell_back } = self.plan_route(goal)?;
        let handle = spawn_agent(route, self.depot, self.driver.clone(), &self.weather, &self.fleet)?;
        info!(agent = handle.id(), %goal, ?planned, fell_back, "Truck dispatched");
        Ok(Delivery { handle, planned, fell_back })
    }

    /// Places an order for `goal`.
    ///
    /// While it rains the order waits for clear skies; otherwise the truck
    /// leaves at once. Progress is recorded on the board.
    ///
    /// # Returns
    ///
    /// The order id, or `None` if another order is still in progress.
    pub fn request_delivery(&self, goal: WorldPoint) -> Option<OrderId> {
        let Some(order) = begin_order(&self.board, goal) else {
            info!(%goal, "An order is already in progress");
            return None;
        };

        if self.weather.is_raining() {
            info!(order, "Raining, order waits for clear skies");
            mark_waiting(&self.board, order);
            let dispatcher = self.clone();
            tokio::spawn(async move {
                dispatcher.weather.wait_until_clear().await;
                let waiting = {
                    let g = dispatcher.board.read();
                    g.active_order == Some(order) && g.status == OrderStatus::WaitingForClearSkies
                };
                if waiting {
                    dispatcher.launch(order, goal);
                }
            });
        } else {
            self.launch(order, goal);
        }
        Some(order)
    }

    fn launch(&self, order: OrderId, goal: WorldPoint) {
        let delivery = match self.spawn_and_deliver(goal) {
            Ok(delivery) => delivery,
            Err(e) => {
                error!(order, error = %e, "Delivery failed to start");
                mark_failed(&self.board, order, &e.to_string());
                return;
            }
        };

        let now = Instant::now();
        let mut eta = EtaCountdown::start(now, delivery.planned);
        if self.weather.is_raining() {
            eta.freeze(now);
        }
        mark_en_route(&self.board, order, eta);

        let board = self.board.clone();
        tokio::spawn(async move {
            let mut handle = delivery.handle;
            while let Some(event) = handle.next_event().await {
                if event == DriverEvent::ReachedGoal {
                    info!(order, "Order delivered");
                    mark_delivered(&board, order, Instant::now());
                }
            }
            let outcome = handle.finished().await;
            let still_en_route = {
                let g = board.read();
                g.active_order == Some(order) && g.status == OrderStatus::EnRoute
            };
            if outcome != DeliveryOutcome::Completed && still_en_route {
                mark_failed(&board, order, "truck stopped before reaching the goal");
            }
        });
    }

    /// Follows the weather: freezes the countdown and raises rain barriers
    /// while it rains, and undoes both when it stops.
    ///
    /// Runs until the returned task is aborted.
    pub fn watch_weather(&self) -> JoinHandle<()> {
        let mut rx = self.weather.subscribe();
        let board = self.board.clone();
        let scene = self.scene.clone();
        let tag = self.rain_barrier_tag.clone();
        tokio::spawn(async move {
            loop {
                let raining = *rx.borrow_and_update();
                set_eta_frozen(&board, raining, Instant::now());
                if let Some(tag) = tag.as_deref() {
                    set_rain_barriers(&scene, tag, raining);
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

/// Enables colliders tagged `tag` while it rains and disables them otherwise.
fn set_rain_barriers(scene: &RwLock<ColliderSet>, tag: &str, raining: bool) {
    let changed = scene.write().set_enabled_by_tag(tag, raining);
    if changed > 0 {
        info!(tag, raining, colliders = changed, "Rain barriers toggled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Collider;
    use crate::settings::PathfinderSettings;
    use std::time::Duration;
    use tokio::time;

    fn p(x: f32, y: f32) -> WorldPoint {
        WorldPoint::new(x, y)
    }

    fn dispatcher(weather: WeatherState) -> DeliveryDispatcher {
        let pathfinder = Pathfinder::new(PathfinderSettings::default()).unwrap();
        let mut scene = ColliderSet::new();
        // Wall with a gap near the top.
        scene.push(Collider::rect(1, p(2.0, 0.0), p(2.5, 3.0)));
        DeliveryDispatcher::new(
            Arc::new(RwLock::new(pathfinder)),
            Arc::new(RwLock::new(scene)),
            p(0.25, 0.25),
            DriverSettings::default(),
            weather,
        )
        .with_bounds(WorldBounds::new(p(0.0, 0.0), p(5.0, 5.0)))
    }

    #[test]
    fn test_board_ignores_stale_orders() {
        let board = new_board();
        let first = begin_order(&board, p(1.0, 1.0)).unwrap();
        assert!(begin_order(&board, p(1.0, 1.0)).is_some());
        assert!(!mark_en_route(&board, first, EtaCountdown::start(Instant::now(), Duration::ZERO)));
        assert_eq!(snapshot(&board).status, OrderStatus::Idle);
    }

    #[test]
    fn test_board_rejects_order_while_busy() {
        let board = new_board();
        let order = begin_order(&board, p(1.0, 1.0)).unwrap();
        assert!(mark_waiting(&board, order));
        assert_eq!(begin_order(&board, p(2.0, 2.0)), None);
        assert!(mark_failed(&board, order, "no route"));
        assert!(begin_order(&board, p(2.0, 2.0)).is_some());
    }

    #[test]
    fn test_plan_route_goes_around_wall() {
        let d = dispatcher(WeatherState::new());
        let planned = d.plan_route(p(4.75, 0.25)).unwrap();
        assert!(!planned.fell_back);
        assert!(planned.route.waypoints().iter().any(|w| w.y > 3.0));
        assert_eq!(planned.route.last(), Some(p(4.75, 0.25)));
        let expected = planned.route.length() / 3.5;
        assert!((planned.planned.as_secs_f32() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_plan_route_requires_bounds() {
        let d = dispatcher(WeatherState::new());
        let d = DeliveryDispatcher { bounds: None, ..d };
        assert!(matches!(d.plan_route(p(1.0, 1.0)), Err(NavigationError::MissingBounds)));
    }

    #[test]
    fn test_plan_route_falls_back_to_straight_line() {
        let d = dispatcher(WeatherState::new());
        // Fully enclose the goal area.
        d.scene.write().push(Collider::rect(2, p(2.0, 3.0), p(2.5, 5.0)));
        let planned = d.plan_route(p(4.75, 0.25)).unwrap();
        assert!(planned.fell_back);
        assert_eq!(planned.route.waypoints(), &[p(0.25, 0.25), p(4.75, 0.25)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_delivery_updates_board() {
        let d = dispatcher(WeatherState::new());
        let board = d.board();
        let order = d.request_delivery(p(4.75, 0.25)).unwrap();
        assert_eq!(snapshot(&board).status, OrderStatus::EnRoute);
        assert_ne!(eta_label(&board, Instant::now()), ETA_PLACEHOLDER);
        assert_eq!(d.request_delivery(p(1.0, 1.0)), None);

        time::sleep(Duration::from_secs(30)).await;
        let state = snapshot(&board);
        assert_eq!(state.active_order, Some(order));
        assert_eq!(state.status, OrderStatus::Delivered);
        assert_eq!(state.delivered, 1);
        assert_eq!(eta_label(&board, Instant::now()), "0:00");
        assert_eq!(d.fleet().live_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rain_barriers_toggle_with_weather() {
        let weather = WeatherState::new();
        let d = dispatcher(weather.clone());
        d.scene
            .write()
            .push(Collider::rect(9, p(0.0, 1.0), p(1.5, 1.5)).with_tag("Bridge").enabled(false));
        let d = d.with_rain_barriers("Bridge");
        let watcher = d.watch_weather();

        weather.start_rain();
        time::sleep(Duration::from_millis(10)).await;
        assert!(d.scene.read().get(crate::map::ColliderId(9)).is_some_and(|c| c.enabled));

        weather.stop_rain();
        time::sleep(Duration::from_millis(10)).await;
        assert!(d.scene.read().get(crate::map::ColliderId(9)).is_some_and(|c| !c.enabled));
        watcher.abort();
    }
}
