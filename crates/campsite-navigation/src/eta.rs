//! Arrival countdown that freezes while it rains.

use std::time::Duration;

use tokio::time::Instant;

/// Placeholder shown when no countdown is running.
pub const ETA_PLACEHOLDER: &str = "--:--";

/// Countdown to a delivery's planned arrival.
///
/// While frozen (rain), the remaining time stays at its value from the
/// moment the freeze began. Unfreezing pushes the deadline back by the
/// frozen duration, so the countdown resumes where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtaCountdown {
    deadline: Instant,
    frozen_since: Option<Instant>,
}

impl EtaCountdown {
    /// Starts a countdown of `planned` from `now`.
    pub fn start(now: Instant, planned: Duration) -> Self {
        Self {
            deadline: now + planned,
            frozen_since: None,
        }
    }

    /// Current deadline.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Whether the countdown is frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen_since.is_some()
    }

    /// Time left, saturating at zero.
    pub fn remaining(&self, now: Instant) -> Duration {
        let reference = self.frozen_since.unwrap_or(now);
        self.deadline.saturating_duration_since(reference)
    }

    /// Freezes the countdown at `now`. No-op if already frozen.
    pub fn freeze(&mut self, now: Instant) {
        if self.frozen_since.is_none() {
            self.frozen_since = Some(now);
        }
    }

    /// Resumes the countdown, extending the deadline by the frozen time.
    pub fn unfreeze(&mut self, now: Instant) {
        if let Some(since) = self.frozen_since.take() {
            self.deadline += now.saturating_duration_since(since);
        }
    }

    /// Marks the delivery as arrived: nothing remains from `now` on.
    pub fn complete(&mut self, now: Instant) {
        self.deadline = now;
        self.frozen_since = None;
    }
}

/// Formats a remaining time as `m:ss`, rounding seconds up.
///
/// `None` renders as [`ETA_PLACEHOLDER`].
pub fn format_eta(remaining: Option<Duration>) -> String {
    let Some(remaining) = remaining else {
        return ETA_PLACEHOLDER.to_string();
    };
    let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    format!("{}:{:02}", secs / 60, secs % 60)
}
