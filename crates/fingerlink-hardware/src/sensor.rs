//! Template commands for an R307-class module.
//!
//! Every command follows the same exchange: encode, clear stale input,
//! write, wait for the module to settle, read until one acknowledgement
//! decodes. A non-zero confirmation code becomes
//! `fingerlink_core::Error::Device` and nothing is retried; retry policy
//! belongs to the caller.
//!
//! ```no_run
//! use fingerlink_hardware::{Sensor, SensorConfig, SerialTransport};
//!
//! # async fn example() -> fingerlink_hardware::Result<()> {
//! let config = SensorConfig::default();
//! let mut sensor = Sensor::new(SerialTransport::open(&config)?, &config);
//!
//! sensor.ping().await?;
//! let bitmap = sensor.read_occupancy_bitmap().await?;
//! println!("{} templates stored", bitmap.count());
//! # Ok(())
//! # }
//! ```

use crate::{HardwareError, Result, SensorConfig, traits::Transport};
use bytes::BytesMut;
use fingerlink_core::{
    CharBuffer, ConfirmationCode, OccupancyBitmap, Position, constants::LIBRARY_CAPACITY,
};
use fingerlink_protocol::{Command, Frame, R307Codec, Response, SearchMatch};
use std::time::Duration;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

/// Driver for one module behind a [`Transport`].
///
/// The sensor owns its transport. Engines borrow it `&mut` for the length
/// of one operation, so only one exchange can be in flight.
#[derive(Debug)]
pub struct Sensor<T> {
    transport: T,
    codec: R307Codec,
    address: u32,
    settle_delay: Duration,
    read_timeout: Duration,
    max_response_len: usize,
}

impl<T: Transport> Sensor<T> {
    pub fn new(transport: T, config: &SensorConfig) -> Self {
        Self {
            transport,
            codec: R307Codec::new().verify_checksums(config.verify_checksums),
            address: config.address,
            settle_delay: config.settle_delay,
            read_timeout: config.read_timeout,
            max_response_len: config.max_response_len,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Send one command and return its acknowledgement, whatever the code.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::Timeout` if nothing came back, and a protocol
    /// error if the reply is malformed or not an acknowledgement.
    pub async fn execute(&mut self, command: Command) -> Result<Response> {
        let operation = command.instruction().name();
        trace!(operation, ?command, "Sending command to sensor");

        let mut outgoing = BytesMut::new();
        self.codec
            .encode(command.to_frame(self.address), &mut outgoing)?;

        self.transport.clear_input().await?;
        self.transport.write(&outgoing).await?;
        tokio::time::sleep(self.settle_delay).await;

        let frame = self.read_frame(operation).await?;
        let response = Response::from_frame(frame)?;

        trace!(operation, code = %response.code(), "Sensor acknowledged");
        Ok(response)
    }

    /// Like [`execute`](Self::execute) but a non-zero code is an error.
    async fn run(&mut self, command: Command) -> Result<Response> {
        let operation = command.instruction().name();
        let response = self.execute(command).await?;
        if !response.is_ok() {
            debug!(operation, code = %response.code(), "Sensor rejected command");
        }
        Ok(response.ensure_ok(operation)?)
    }

    async fn read_frame(&mut self, operation: &'static str) -> Result<Frame> {
        let mut buffer = BytesMut::new();
        let mut received = 0usize;

        loop {
            if let Some(frame) = self.codec.decode(&mut buffer)? {
                return Ok(frame);
            }

            let remaining = self.max_response_len.saturating_sub(received);
            if remaining == 0 {
                warn!(operation, received, "Response exceeded size limit");
                return Err(fingerlink_core::Error::invalid_frame(format!(
                    "no complete frame within {} bytes",
                    self.max_response_len
                ))
                .into());
            }

            let chunk = self.transport.read(remaining).await?;
            if chunk.is_empty() {
                if received == 0 {
                    let waited = self.settle_delay + self.read_timeout;
                    return Err(HardwareError::timeout(operation, waited.as_millis() as u64));
                }
                return Err(fingerlink_core::Error::invalid_frame(format!(
                    "acknowledgement cut short after {received} bytes"
                ))
                .into());
            }

            received += chunk.len();
            buffer.extend_from_slice(&chunk);
        }
    }

    /// Scan the finger on the window into the image buffer.
    ///
    /// # Errors
    ///
    /// `ConfirmationCode::NoFinger` when the window is empty.
    pub async fn capture_image(&mut self) -> Result<()> {
        self.run(Command::CaptureImage).await.map(|_| ())
    }

    /// Extract a character file from the image buffer into `buffer`.
    pub async fn generate_character_file(&mut self, buffer: CharBuffer) -> Result<()> {
        self.run(Command::GenerateChar { buffer }).await.map(|_| ())
    }

    /// Merge both character buffers into one template.
    ///
    /// # Errors
    ///
    /// `ConfirmationCode::MergeFailed` when the two captures are not the same finger.
    pub async fn merge_character_files(&mut self) -> Result<()> {
        self.run(Command::RegisterModel).await.map(|_| ())
    }

    /// Persist the merged template at `position`.
    ///
    /// # Errors
    ///
    /// `ConfirmationCode::BeyondLibrary` when the slot is outside the library.
    pub async fn store_template(&mut self, position: Position) -> Result<()> {
        debug!(%position, "Storing template");
        self.run(Command::Store {
            buffer: CharBuffer::One,
            position,
        })
        .await
        .map(|_| ())
    }

    /// Search `count` slots from `start` for the file in buffer one.
    ///
    /// Returns `Ok(None)` when the module reports no match.
    pub async fn search_template(&mut self, start: u16, count: u16) -> Result<Option<SearchMatch>> {
        let response = self
            .execute(Command::Search {
                buffer: CharBuffer::One,
                start,
                count,
            })
            .await?;

        match response.code() {
            ConfirmationCode::Ok => Ok(Some(response.search_match()?)),
            ConfirmationCode::NotFound | ConfirmationCode::NotMatched => Ok(None),
            code => Err(fingerlink_core::Error::Device {
                operation: "search_template",
                code,
            }
            .into()),
        }
    }

    /// Search the whole library.
    pub async fn search_library(&mut self) -> Result<Option<SearchMatch>> {
        self.search_template(0, LIBRARY_CAPACITY as u16).await
    }

    /// Read which library slots hold a template.
    pub async fn read_occupancy_bitmap(&mut self) -> Result<OccupancyBitmap> {
        let response = self.run(Command::ReadIndexTable).await?;
        let bitmap = response.occupancy_bitmap();
        debug!(occupied = bitmap.count(), "Read occupancy bitmap");
        Ok(bitmap)
    }

    /// Free the slot at `position`.
    pub async fn delete_template(&mut self, position: Position) -> Result<()> {
        debug!(%position, "Deleting template");
        self.run(Command::DeleteChar { position, count: 1 })
            .await
            .map(|_| ())
    }

    /// Check that a module is listening.
    pub async fn ping(&mut self) -> Result<()> {
        self.run(Command::Ping).await.map(|_| ())
    }

    /// Lowest unoccupied slot, or `None` when the library is full.
    pub async fn next_free_position(&mut self) -> Result<Option<Position>> {
        Ok(self.read_occupancy_bitmap().await?.first_free())
    }
}
