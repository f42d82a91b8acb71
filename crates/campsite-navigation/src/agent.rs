//! Async agent runtime.
//!
//! Each agent is a tokio task ticking an [`AgentDriver`] on a fixed-step
//! interval. Lifecycle events flow out through an mpsc channel and the
//! latest [`AgentSnapshot`] through a watch channel. Pausing reaches the
//! task through a per-agent watch flag (also reachable from the [`Fleet`])
//! and through the shared [`WeatherState`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::driver::{AgentDriver, AgentSnapshot, DriverEvent};
use crate::error::NavigationError;
use crate::map::WorldPoint;
use crate::route::Route;
use crate::settings::DriverSettings;
use crate::weather::WeatherState;

/// Identifier of a live agent.
pub type AgentId = u64;

/// How a delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The agent went out and came back.
    Completed,
    /// The delivery was cancelled before completing, or the task died.
    Cancelled,
}

#[derive(Debug, Default)]
struct FleetInner {
    next_id: AgentId,
    agents: HashMap<AgentId, Arc<watch::Sender<bool>>>,
}

/// Registry of live agents.
#[derive(Debug, Clone, Default)]
pub struct Fleet {
    inner: Arc<Mutex<FleetInner>>,
}

impl Fleet {
    /// Creates an empty fleet.
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, pause: Arc<watch::Sender<bool>>) -> AgentId {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.agents.insert(id, pause);
        id
    }

    fn deregister(&self, id: AgentId) {
        self.inner.lock().agents.remove(&id);
    }

    /// Pauses or resumes every live agent.
    pub fn pause_all(&self, paused: bool) {
        let inner = self.inner.lock();
        debug!(paused, agents = inner.agents.len(), "Pausing fleet");
        for pause in inner.agents.values() {
            pause.send_replace(paused);
        }
    }

    /// Number of live agents.
    pub fn live_count(&self) -> usize {
        self.inner.lock().agents.len()
    }
}

/// Handle to a running agent.
///
/// Dropping the handle cancels the agent.
#[derive(Debug)]
pub struct DeliveryHandle {
    id: AgentId,
    events: mpsc::UnboundedReceiver<DriverEvent>,
    snapshot: watch::Receiver<AgentSnapshot>,
    pause: Arc<watch::Sender<bool>>,
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<DeliveryOutcome>,
}

impl DeliveryHandle {
    /// Agent id within its fleet.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Waits for the next lifecycle event. `None` once the agent has stopped.
    pub async fn next_event(&mut self) -> Option<DriverEvent> {
        self.events.recv().await
    }

    /// Latest observed state.
    pub fn snapshot(&self) -> AgentSnapshot {
        *self.snapshot.borrow()
    }

    /// Receiver for state updates, one per tick.
    pub fn watch_snapshot(&self) -> watch::Receiver<AgentSnapshot> {
        self.snapshot.clone()
    }

    /// Pauses or resumes this agent. Takes effect on its next tick.
    pub fn set_paused(&self, paused: bool) {
        self.pause.send_replace(paused);
    }

    /// Stops the agent. No further events are emitted.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    /// Waits for the agent task to end.
    pub async fn finished(self) -> DeliveryOutcome {
        let DeliveryHandle { task, cancel, .. } = self;
        // Keep the cancel sender alive so waiting does not cancel the agent.
        let _cancel = cancel;
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Agent task ended abnormally");
                DeliveryOutcome::Cancelled
            }
        }
    }
}

/// Spawns an agent that drives `route` from `start` and back.
///
/// Must be called from within a tokio runtime. The agent starts paused if
/// it is raining.
///
/// # Errors
///
/// * `EmptyRoute` if `route` has no waypoints; no agent is created.
/// * `InvalidSettings` if `settings` fail validation.
pub fn spawn_agent(
    route: Route,
    start: WorldPoint,
    settings: DriverSettings,
    weather: &WeatherState,
    fleet: &Fleet,
) -> Result<DeliveryHandle, NavigationError> {
    if route.is_empty() {
        warn!(%start, "Refusing to spawn an agent without a route");
        return Err(NavigationError::EmptyRoute);
    }
    let fixed_step = settings.fixed_step();
    let mut driver = AgentDriver::new(start, settings)?;

    let mut weather_rx = weather.subscribe();
    driver.set_paused(*weather_rx.borrow_and_update());
    driver.deliver_and_return(route.into_waypoints());

    let (pause_tx, pause_rx) = watch::channel(driver.is_paused());
    let pause_tx = Arc::new(pause_tx);
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshot_rx) = watch::channel(driver.snapshot());
    let (cancel_tx, cancel_rx) = oneshot::channel();

    let id = fleet.register(pause_tx.clone());
    info!(agent = id, %start, "Agent spawned");

    let task = tokio::spawn(run_agent(
        AgentTask {
            id,
            driver,
            pause_rx,
            weather_rx,
            cancel_rx,
            events_tx,
            snapshot_tx,
            fixed_step,
        },
        fleet.clone(),
    ));

    Ok(DeliveryHandle {
        id,
        events: events_rx,
        snapshot: snapshot_rx,
        pause: pause_tx,
        cancel: Some(cancel_tx),
        task,
    })
}

struct AgentTask {
    id: AgentId,
    driver: AgentDriver,
    pause_rx: watch::Receiver<bool>,
    weather_rx: watch::Receiver<bool>,
    cancel_rx: oneshot::Receiver<()>,
    events_tx: mpsc::UnboundedSender<DriverEvent>,
    snapshot_tx: watch::Sender<AgentSnapshot>,
    fixed_step: std::time::Duration,
}

async fn run_agent(task: AgentTask, fleet: Fleet) -> DeliveryOutcome {
    let AgentTask {
        id,
        mut driver,
        mut pause_rx,
        mut weather_rx,
        mut cancel_rx,
        events_tx,
        snapshot_tx,
        fixed_step,
    } = task;

    let dt = fixed_step.as_secs_f32();
    let mut ticker = time::interval(fixed_step);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let outcome = loop {
        tokio::select! {
            biased;
            _ = &mut cancel_rx => {
                info!(agent = id, "Agent cancelled");
                break DeliveryOutcome::Cancelled;
            }
            _ = ticker.tick() => {
                // Last signal wins when both changed since the previous tick.
                if pause_rx.has_changed().unwrap_or(false) {
                    driver.set_paused(*pause_rx.borrow_and_update());
                }
                if weather_rx.has_changed().unwrap_or(false) {
                    driver.set_paused(*weather_rx.borrow_and_update());
                }
                if let Some(event) = driver.tick(dt) {
                    debug!(agent = id, ?event, "Agent event");
                    let _ = events_tx.send(event);
                }
                snapshot_tx.send_replace(driver.snapshot());
                if driver.is_done() {
                    break DeliveryOutcome::Completed;
                }
            }
        }
    };

    fleet.deregister(id);
    outcome
}
