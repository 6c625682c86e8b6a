use std::time::Duration;

use serde::Deserialize;

/// Timeouts governing one publish cycle.
///
/// Every suspension point in the protocol is bounded by one of these
/// values; there is no configuration that allows an unbounded wait.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct NotificationConfig {
    /// Maximum wait for the topic's distributed lock (unit: milliseconds)
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_in_ms: u64,

    /// Maximum wait for all observers to signal receipt of a published
    /// payload (unit: milliseconds)
    #[serde(default = "default_notification_timeout_ms")]
    pub notification_timeout_in_ms: u64,
}

impl NotificationConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_in_ms)
    }

    pub fn notification_timeout(&self) -> Duration {
        Duration::from_millis(self.notification_timeout_in_ms)
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            lock_timeout_in_ms: default_lock_timeout_ms(),
            notification_timeout_in_ms: default_notification_timeout_ms(),
        }
    }
}

fn default_lock_timeout_ms() -> u64 {
    1000
}
fn default_notification_timeout_ms() -> u64 {
    5000
}
