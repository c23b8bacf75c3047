//! Finger presence detection by polling image capture.
//!
//! The module has no touch interrupt on the UART, so presence is inferred
//! from repeated capture attempts: `0x00` means a finger is on the window,
//! `0x02` means it is empty. Any other code and any transport failure are
//! treated as "not yet" and polled again until the deadline.

use crate::{Sensor, traits::Transport};
use fingerlink_core::{ConfirmationCode, constants::DEFAULT_POLL_INTERVAL_MS};
use fingerlink_protocol::{Command, Response};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Result of waiting for a finger to arrive or leave.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presence {
    /// The awaited state was observed; carries the capture acknowledgement.
    Detected(Response),
    /// The deadline passed first.
    TimedOut,
    /// The wait was cancelled from outside.
    Cancelled,
}

impl Presence {
    pub fn is_detected(&self) -> bool {
        matches!(self, Presence::Detected(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Awaiting {
    Press,
    Release,
}

impl Awaiting {
    fn satisfied_by(self, code: ConfirmationCode) -> bool {
        match self {
            Awaiting::Press => code == ConfirmationCode::Ok,
            Awaiting::Release => code == ConfirmationCode::NoFinger,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Awaiting::Press => "press",
            Awaiting::Release => "release",
        }
    }
}

/// Polls the sensor until a finger is placed or lifted.
///
/// # Example
///
/// ```no_run
/// use fingerlink_hardware::{PresenceDetector, Sensor, SensorConfig, SerialTransport};
/// use std::time::Duration;
///
/// # async fn example() -> fingerlink_hardware::Result<()> {
/// let config = SensorConfig::default();
/// let mut sensor = Sensor::new(SerialTransport::open(&config)?, &config);
/// let detector = PresenceDetector::new(Duration::from_millis(500));
///
/// if detector.wait_for_press(&mut sensor, Duration::from_secs(20)).await.is_detected() {
///     println!("finger on the window");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct PresenceDetector {
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl Default for PresenceDetector {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_POLL_INTERVAL_MS))
    }
}

impl PresenceDetector {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort waits when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Wait until a capture succeeds.
    pub async fn wait_for_press<T: Transport>(
        &self,
        sensor: &mut Sensor<T>,
        timeout: Duration,
    ) -> Presence {
        self.poll(sensor, timeout, Awaiting::Press).await
    }

    /// Wait until a capture reports an empty window.
    pub async fn wait_for_release<T: Transport>(
        &self,
        sensor: &mut Sensor<T>,
        timeout: Duration,
    ) -> Presence {
        self.poll(sensor, timeout, Awaiting::Release).await
    }

    async fn poll<T: Transport>(
        &self,
        sensor: &mut Sensor<T>,
        timeout: Duration,
        awaiting: Awaiting,
    ) -> Presence {
        let deadline = Instant::now() + timeout;
        debug!(
            awaiting = awaiting.label(),
            timeout_ms = timeout.as_millis() as u64,
            "Waiting for finger"
        );

        loop {
            if self.cancel.is_cancelled() {
                return Presence::Cancelled;
            }
            if Instant::now() >= deadline {
                info!(
                    awaiting = awaiting.label(),
                    timeout_ms = timeout.as_millis() as u64,
                    "Timed out waiting for finger"
                );
                return Presence::TimedOut;
            }

            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Presence::Cancelled,
                result = sensor.execute(Command::CaptureImage) => result,
            };

            match result {
                Ok(response) if awaiting.satisfied_by(response.code()) => {
                    debug!(awaiting = awaiting.label(), "Finger state detected");
                    return Presence::Detected(response);
                }
                Ok(response) => {
                    trace!(code = %response.code(), "Finger state unchanged");
                }
                Err(e) => {
                    debug!(error = %e, "Capture poll failed, retrying");
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Presence::Cancelled,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }
}
