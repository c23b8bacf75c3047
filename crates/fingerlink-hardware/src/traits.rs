//! Transport abstraction between the sensor driver and the wire.
//!
//! The module sits behind a half-duplex UART. [`Transport`] is the narrow
//! byte-level port the [`Sensor`](crate::Sensor) needs: drop stale input,
//! write a frame, read whatever has arrived. Real hardware uses
//! [`SerialTransport`](crate::SerialTransport); tests use the emulated
//! [`MockSensor`](crate::mock::MockSensor).
//!
//! The trait uses native `async fn` (Edition 2024), so it is not
//! object-safe. Drive it through a generic parameter:
//!
//! ```no_run
//! use fingerlink_hardware::{Result, traits::Transport};
//!
//! async fn drain<T: Transport>(port: &mut T) -> Result<usize> {
//!     port.clear_input().await?;
//!     Ok(port.read(256).await?.len())
//! }
//! ```

#![allow(async_fn_in_trait)]

use crate::Result;
use bytes::Bytes;

/// Byte-level link to the module.
pub trait Transport: Send {
    /// Discard anything received but not yet read.
    ///
    /// Called before every command so a late acknowledgement from an earlier
    /// exchange is never mistaken for the current one.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying port rejects the request.
    async fn clear_input(&mut self) -> Result<()>;

    /// Write all of `bytes` to the module.
    ///
    /// # Errors
    ///
    /// Returns an error if the port is closed or the write fails.
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read up to `max` bytes.
    ///
    /// Returns an empty buffer when nothing arrived within the transport's
    /// read timeout. An empty read is not an error; the caller decides what
    /// silence means.
    ///
    /// # Errors
    ///
    /// Returns an error if the port is closed or the read fails.
    async fn read(&mut self, max: usize) -> Result<Bytes>;
}
