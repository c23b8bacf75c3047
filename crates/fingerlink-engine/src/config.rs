//! Engine configuration.

use fingerlink_core::Position;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What enrollment does when the occupancy bitmap cannot be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationFallback {
    /// Give up before touching the sensor.
    #[default]
    Abort,
    /// Store into this slot regardless of what it holds.
    Fixed(Position),
}

/// Timing and policy knobs shared by every engine.
///
/// # Examples
///
/// ```
/// use fingerlink_engine::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::default()
///     .with_press_timeout(Duration::from_secs(10))
///     .with_registered_by("porteria");
///
/// assert_eq!(config.press_timeout, Duration::from_secs(10));
/// assert_eq!(config.release_timeout, Duration::from_secs(20));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// How long to wait for a finger on the window.
    pub press_timeout: Duration,

    /// How long to wait for the finger to be lifted between captures.
    pub release_timeout: Duration,

    /// Gap between presence polls.
    pub poll_interval: Duration,

    /// Pause between consecutive deletions during reconciliation.
    pub deletion_pause: Duration,

    /// Written to `registrado_por` on new identity records.
    pub registered_by: String,

    pub allocation_fallback: AllocationFallback,

    /// Mirror status lines to the remote `display` document.
    pub publish_status: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            press_timeout: Duration::from_secs(20),
            release_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
            deletion_pause: Duration::from_millis(500),
            registered_by: "fingerlink".to_string(),
            allocation_fallback: AllocationFallback::Abort,
            publish_status: true,
        }
    }
}

impl EngineConfig {
    pub fn with_press_timeout(mut self, timeout: Duration) -> Self {
        self.press_timeout = timeout;
        self
    }

    pub fn with_release_timeout(mut self, timeout: Duration) -> Self {
        self.release_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_deletion_pause(mut self, pause: Duration) -> Self {
        self.deletion_pause = pause;
        self
    }

    pub fn with_registered_by(mut self, registered_by: impl Into<String>) -> Self {
        self.registered_by = registered_by.into();
        self
    }

    pub fn with_allocation_fallback(mut self, fallback: AllocationFallback) -> Self {
        self.allocation_fallback = fallback;
        self
    }

    pub fn with_publish_status(mut self, publish: bool) -> Self {
        self.publish_status = publish;
        self
    }
}
