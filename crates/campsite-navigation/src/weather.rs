//! Shared rain flag.
//!
//! A cloneable handle around a `tokio::sync::watch` channel. Every clone
//! sees the same state; agents subscribe and pause while it rains.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Whether it is currently raining.
#[derive(Debug, Clone)]
pub struct WeatherState {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for WeatherState {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherState {
    /// Creates a clear-skies state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Returns `true` while it rains.
    pub fn is_raining(&self) -> bool {
        *self.tx.borrow()
    }

    /// Starts rain. Returns `false` if it was already raining.
    pub fn start_rain(&self) -> bool {
        self.set(true)
    }

    /// Stops rain. Returns `false` if the sky was already clear.
    pub fn stop_rain(&self) -> bool {
        self.set(false)
    }

    fn set(&self, raining: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == raining {
                false
            } else {
                *current = raining;
                true
            }
        });
        if changed {
            info!(raining, "Weather changed");
        }
        changed
    }

    /// Receiver notified on every change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Resolves once the sky is clear. Returns immediately if it already is.
    pub async fn wait_until_clear(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close while waiting.
        let _ = rx.wait_for(|raining| !*raining).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_transitions_are_idempotent() {
        let weather = WeatherState::new();
        assert!(!weather.is_raining());
        assert!(weather.start_rain());
        assert!(!weather.start_rain());
        assert!(weather.is_raining());
        assert!(weather.stop_rain());
        assert!(!weather.stop_rain());
    }

    #[test]
    fn test_clones_share_state() {
        let a = WeatherState::new();
        let b = a.clone();
        a.start_rain();
        assert!(b.is_raining());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_clear() {
        let weather = WeatherState::new();
        weather.wait_until_clear().await;

        weather.start_rain();
        let w = weather.clone();
        let waiter = tokio::spawn(async move { w.wait_until_clear().await });
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(!waiter.is_finished());

        weather.stop_rain();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn test_subscribers_see_changes() {
        let weather = WeatherState::new();
        let mut rx = weather.subscribe();
        weather.start_rain();
        rx.changed().await.unwrap();
        assert!(*rx.borrow_and_update());
    }
}
