//! Sensor access layer for R307-class fingerprint modules.
//!
//! This crate sits between the packet codec and the application engines:
//!
//! - [`traits::Transport`] is the byte-level port to the module.
//! - [`SerialTransport`] drives a real UART (feature `serial`, on by default).
//! - [`mock::MockSensor`] emulates a module for tests and development.
//! - [`Sensor`] runs the template commands over any transport.
//! - [`PresenceDetector`] polls image capture to detect a finger.
//!
//! # Example
//!
//! ```
//! use fingerlink_hardware::mock::{Finger, MockSensor};
//! use fingerlink_hardware::{PresenceDetector, Sensor, SensorConfig};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (module, handle) = MockSensor::new();
//!     let config = SensorConfig::default().with_settle_delay(Duration::ZERO);
//!     let mut sensor = Sensor::new(module, &config);
//!
//!     handle.press(Finger(1));
//!     let detector = PresenceDetector::new(Duration::from_millis(10));
//!     let presence = detector.wait_for_press(&mut sensor, Duration::from_secs(1)).await;
//!     assert!(presence.is_detected());
//! }
//! ```

pub mod config;
pub mod error;
pub mod mock;
pub mod presence;
pub mod sensor;
#[cfg(feature = "serial")]
pub mod serial;
pub mod traits;

pub use config::SensorConfig;
pub use error::{HardwareError, Result};
pub use presence::{Presence, PresenceDetector};
pub use sensor::Sensor;
#[cfg(feature = "serial")]
pub use serial::SerialTransport;
pub use traits::Transport;
