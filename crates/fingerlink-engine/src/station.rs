//! The shared context every engine runs in.

use crate::EngineConfig;
use fingerlink_core::{Clock, SystemClock};
use fingerlink_hardware::PresenceDetector;
use fingerlink_storage::{Directory, RemoteStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A fingerprint station: remote directory, clock and engine settings.
///
/// The sensor is not owned here. Each operation borrows it mutably, so only
/// one sequence can drive the module at a time.
///
/// # Examples
///
/// ```
/// use fingerlink_engine::{EngineConfig, Station};
/// use fingerlink_hardware::mock::{Finger, MockSensor};
/// use fingerlink_hardware::{Sensor, SensorConfig};
/// use fingerlink_storage::{Directory, MemoryStore};
/// use std::time::Duration;
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() {
///     let (module, handle) = MockSensor::new();
///     let mut sensor = Sensor::new(module, &SensorConfig::default());
///     let station = Station::new(Directory::new(MemoryStore::new()), EngineConfig::default());
///
///     handle.press(Finger(1));
///     handle.lift();
///     handle.press(Finger(1));
///
///     let outcome = station.enroll(&mut sensor, &Default::default()).await;
///     assert!(outcome.is_enrolled());
/// }
/// ```
#[derive(Debug)]
pub struct Station<S, C = SystemClock> {
    pub(crate) directory: Directory<S>,
    pub(crate) clock: C,
    pub(crate) config: EngineConfig,
    pub(crate) detector: PresenceDetector,
}

impl<S: RemoteStore> Station<S> {
    pub fn new(directory: Directory<S>, config: EngineConfig) -> Self {
        let detector = PresenceDetector::new(config.poll_interval);
        Self {
            directory,
            clock: SystemClock::new(),
            config,
            detector,
        }
    }
}

impl<S: RemoteStore, C: Clock> Station<S, C> {
    /// Replace the timestamp source.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Station<S, C2> {
        Station {
            directory: self.directory,
            clock,
            config: self.config,
            detector: self.detector,
        }
    }

    /// Stop presence waits and pending deletions when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.detector = self.detector.with_cancellation(token);
        self
    }

    pub fn directory(&self) -> &Directory<S> {
        &self.directory
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub(crate) fn cancellation(&self) -> &CancellationToken {
        self.detector.cancellation_token()
    }

    /// Show a status line and mirror it to the remote display.
    ///
    /// A failed mirror is logged and otherwise ignored.
    pub(crate) async fn notify(&self, mensaje: &str) {
        info!(mensaje, "Status");
        if !self.config.publish_status {
            return;
        }
        if let Err(e) = self.directory.publish_display(mensaje).await {
            warn!(error = %e, "Failed to publish status");
        }
    }
}
