use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use campsite_navigation::delivery::{self, OrderStatus};
use campsite_navigation::map::{ColliderSet, FilteredColliders, ObstacleQuery};
use campsite_navigation::{
    DeliveryDispatcher, NavigationError, OrderId, Pathfinder, ShelterRoutes, WeatherState,
    WorldBounds, WorldPoint, plan_shelter_routes,
};

use crate::bus::Topic;
use crate::config::{AppConfig, Timing};
use crate::scene::Campsite;

/// One periodic status report.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    pub elapsed: Duration,
    pub raining: bool,
    pub live_agents: usize,
    pub order: Option<OrderId>,
    pub status: OrderStatus,
    pub eta: String,
    pub delivered: u64,
}

enum OrderPhase {
    Due(Instant),
    Tracking { order: OrderId, placed_at: Instant },
}

/// Runs the campsite until every configured order is settled.
///
/// Orders are placed one at a time; the next one is placed once the
/// previous truck is back at the depot. Rain follows the configured schedule.
///
/// # Errors
///
/// Fails on invalid configuration, if the grid cannot be built, or if an
/// order outlives `order_timeout_secs`.
pub async fn run(config: AppConfig, telemetry: Topic<TelemetryFrame>) -> anyhow::Result<()> {
    let timing = config.simulation.timing()?;
    let Campsite { colliders, bounds, shelters } = Campsite::demo();
    info!(colliders = colliders.len(), shelters = shelters.len(), "Campsite loaded");

    let pathfinder = Arc::new(RwLock::new(Pathfinder::new(config.pathfinder.clone())?));
    let scene = Arc::new(RwLock::new(colliders));
    let weather = WeatherState::new();

    let mut dispatcher = DeliveryDispatcher::new(
        pathfinder.clone(),
        scene.clone(),
        config.world.depot,
        config.driver.clone(),
        weather.clone(),
    )
    .with_bounds(bounds.clone())
    .with_query(config.world.obstacles.clone());
    if let Some(tag) = &config.world.rain_barrier_tag {
        dispatcher = dispatcher.with_rain_barriers(tag.clone());
    }

    let preview = |label: &str| -> anyhow::Result<ShelterRoutes> {
        let plan = preview_shelters(&pathfinder, &scene, &bounds, &config.world.obstacles, config.world.sign, &shelters)
            .with_context(|| format!("shelter preview ({label}) failed"))?;
        log_shelter_routes(label, &plan);
        Ok(plan)
    };
    preview("clear skies")?;

    let watcher = dispatcher.watch_weather();
    let forecast = spawn_forecast(weather.clone(), timing);
    let board = dispatcher.board();

    let started = Instant::now();
    let mut ticker = time::interval(timing.telemetry_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut phase = OrderPhase::Due(started);
    let mut settled = 0u32;
    let mut previewed_rain = false;

    let outcome = loop {
        let due = match phase {
            OrderPhase::Due(at) => Some(at),
            OrderPhase::Tracking { .. } => None,
        };

        tokio::select! {
            _ = time::sleep_until(due.unwrap_or(started)), if due.is_some() => {
                match dispatcher.request_delivery(config.world.tent) {
                    Some(order) => {
                        info!(order, tent = %config.world.tent, "Order placed");
                        phase = OrderPhase::Tracking { order, placed_at: Instant::now() };
                    }
                    None => {
                        warn!("Order rejected, retrying");
                        phase = OrderPhase::Due(Instant::now() + timing.telemetry_interval);
                    }
                }
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                let state = delivery::snapshot(&board);
                let raining = weather.is_raining();
                telemetry.publish(TelemetryFrame {
                    elapsed: now.duration_since(started),
                    raining,
                    live_agents: dispatcher.fleet().live_count(),
                    order: state.active_order,
                    status: state.status,
                    eta: delivery::eta_label(&board, now),
                    delivered: state.delivered,
                });

                if raining && !previewed_rain {
                    if let Err(e) = preview("raining") {
                        break Err(e);
                    }
                }
                previewed_rain = raining;

                if let OrderPhase::Tracking { order, placed_at } = phase {
                    let finished = matches!(state.status, OrderStatus::Delivered | OrderStatus::Failed);
                    if finished && dispatcher.fleet().live_count() == 0 {
                        settled += 1;
                        info!(order, status = ?state.status, settled, "Order settled");
                        if settled >= config.simulation.deliveries {
                            break Ok(());
                        }
                        phase = OrderPhase::Due(now + timing.order_interval);
                    } else if now.duration_since(placed_at) > timing.order_timeout {
                        break Err(anyhow::anyhow!("order {order} timed out in state {:?}", state.status));
                    }
                }
            }
        }
    };

    forecast.abort();
    watcher.abort();
    weather.stop_rain();

    let state = delivery::snapshot(&board);
    info!(
        delivered = state.delivered,
        last_failure = ?state.last_failure,
        elapsed = ?started.elapsed(),
        "Simulation finished"
    );
    outcome
}

/// Rebuilds the grid with the current scene and plans a route from `sign`
/// to every shelter.
pub fn preview_shelters(
    pathfinder: &RwLock<Pathfinder>,
    scene: &RwLock<ColliderSet>,
    bounds: &WorldBounds,
    query: &ObstacleQuery,
    sign: WorldPoint,
    shelters: &[campsite_navigation::Shelter],
) -> Result<ShelterRoutes, NavigationError> {
    let scene = scene.read();
    let probe = FilteredColliders::new(&scene, query, bounds.body);
    let mut pathfinder = pathfinder.write();
    pathfinder.build_grid(Some(bounds), &probe)?;
    Ok(plan_shelter_routes(&pathfinder, sign, shelters))
}

fn log_shelter_routes(label: &str, plan: &ShelterRoutes) {
    for route in &plan.routes {
        info!(
            label,
            shelter = %route.shelter,
            style = ?route.style,
            cost = route.cost,
            waypoints = route.path.as_ref().map_or(0, Vec::len),
            "Shelter route"
        );
    }
    if plan.best.is_none() {
        warn!(label, "No shelter is reachable");
    }
}

/// Starts the first shower after `rain_start`, then one every `rain_period`.
fn spawn_forecast(weather: WeatherState, timing: Timing) -> JoinHandle<()> {
    tokio::spawn(async move {
        time::sleep(timing.rain_start).await;
        let mut showers = time::interval(timing.rain_period);
        loop {
            showers.tick().await;
            weather.start_rain();
            time::sleep(timing.rain_duration).await;
            weather.stop_rain();
        }
    })
}

/// Logs telemetry frames until every publisher is gone.
pub async fn log_telemetry(mut rx: broadcast::Receiver<Arc<TelemetryFrame>>) {
    loop {
        match rx.recv().await {
            Ok(frame) => info!(
                t = ?frame.elapsed,
                raining = frame.raining,
                agents = frame.live_agents,
                order = ?frame.order,
                status = ?frame.status,
                eta = %frame.eta,
                delivered = frame.delivered,
                "Telemetry"
            ),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                debug!(skipped, "Telemetry logger fell behind");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Fails fast when the delivery target cannot be reached on a clear day.
pub fn check_reachable(config: &AppConfig) -> anyhow::Result<()> {
    let campsite = Campsite::demo();
    let mut pathfinder = Pathfinder::new(config.pathfinder.clone())?;
    let probe = FilteredColliders::new(&campsite.colliders, &config.world.obstacles, campsite.bounds.body);
    pathfinder.build_grid(Some(&campsite.bounds), &probe)?;
    let result = pathfinder.find_path(config.world.depot, config.world.tent);
    if let Some(reason) = result.failure {
        bail!("tent {} is unreachable from depot {}: {}", config.world.tent, config.world.depot, reason);
    }
    info!(%result, "Delivery route checked");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;

    fn quick_config() -> AppConfig {
        AppConfig {
            simulation: SimulationConfig {
                deliveries: 2,
                order_interval_secs: 1.0,
                order_timeout_secs: 60.0,
                rain_start_secs: 3.0,
                rain_duration_secs: 5.0,
                rain_period_secs: 30.0,
                telemetry_interval_secs: 0.5,
            },
            ..AppConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_settles_every_order() {
        let topic = Topic::new(256);
        let mut rx = topic.subscribe();
        run(quick_config(), topic).await.unwrap();

        let mut last = None;
        let mut saw_rain = false;
        while let Ok(frame) = rx.try_recv() {
            saw_rain |= frame.raining;
            last = Some(frame);
        }
        assert!(saw_rain);
        let last = last.unwrap();
        assert_eq!(last.delivered, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tight_timeout_fails_the_run() {
        let mut config = quick_config();
        config.simulation.order_timeout_secs = 1.0;
        let topic = Topic::new(256);
        let err = run(config, topic).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_shelter_preview_from_sign() {
        let config = AppConfig::default();
        let campsite = Campsite::demo();
        let pathfinder = RwLock::new(Pathfinder::new(config.pathfinder.clone()).unwrap());
        let scene = RwLock::new(campsite.colliders.clone());
        let plan = preview_shelters(
            &pathfinder,
            &scene,
            &campsite.bounds,
            &config.world.obstacles,
            config.world.sign,
            &campsite.shelters,
        )
        .unwrap();
        assert_eq!(plan.routes.len(), 3);
        assert_eq!(plan.best_route().map(|r| r.shelter.as_str()), Some("Boathouse"));
        assert!(plan.routes[2].path.is_none());
    }

    #[test]
    fn test_default_world_is_reachable() {
        check_reachable(&AppConfig::default()).unwrap();
    }
}
