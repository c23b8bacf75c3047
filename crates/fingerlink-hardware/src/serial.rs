//! UART transport on top of the `serialport` crate.
//!
//! `serialport` is blocking, so every call hops onto Tokio's blocking pool.
//! The port lives behind a mutex only so it can be moved into those closures;
//! there is never more than one caller.

use crate::{HardwareError, Result, SensorConfig, traits::Transport};
use bytes::Bytes;
use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};
use tracing::{debug, trace};

/// Serial connection to a physical module.
pub struct SerialTransport {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    name: String,
}

impl SerialTransport {
    /// Open the port described by `config`.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::ConfigurationError` for unusable settings and
    /// `HardwareError::Serial` if the device cannot be opened.
    pub fn open(config: &SensorConfig) -> Result<Self> {
        config.validate()?;
        debug!(
            port = %config.port,
            baud_rate = config.baud_rate,
            "Opening serial port"
        );

        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(config.read_timeout)
            .open()?;

        Ok(Self {
            port: Arc::new(Mutex::new(port)),
            name: config.port.clone(),
        })
    }

    /// Device path this transport was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn with_port<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Box<dyn SerialPort>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let port = Arc::clone(&self.port);
        let name = self.name.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = port
                .lock()
                .map_err(|_| HardwareError::disconnected(name))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| HardwareError::communication(format!("serial worker failed: {e}")))?
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .finish()
    }
}

impl Transport for SerialTransport {
    async fn clear_input(&mut self) -> Result<()> {
        self.with_port(|port| Ok(port.clear(ClearBuffer::Input)?))
            .await
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        trace!(len = bytes.len(), "Writing to serial port");
        let owned = bytes.to_vec();
        self.with_port(move |port| {
            port.write_all(&owned)?;
            port.flush()?;
            Ok(())
        })
        .await
    }

    async fn read(&mut self, max: usize) -> Result<Bytes> {
        self.with_port(move |port| {
            let mut buf = vec![0u8; max];
            match port.read(&mut buf) {
                Ok(n) => {
                    buf.truncate(n);
                    Ok(Bytes::from(buf))
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => Ok(Bytes::new()),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }
}
