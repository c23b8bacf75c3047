//! Emulated module for testing and development.
//!
//! [`MockSensor`] implements [`Transport`](crate::traits::Transport) and
//! answers frames the way an R307 does, so the full stack above it (codec,
//! sensor driver, presence detection, engines) runs unchanged against it.

pub mod sensor;

pub use sensor::{Fault, Finger, MockSensor, MockSensorHandle, Touch};
