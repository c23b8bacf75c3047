//! Tokio codec for R307 frame boundaries.
//!
//! The module answers with one acknowledgement per command, but a serial read
//! can return half a frame, a frame preceded by line noise, or two frames
//! back to back. `R307Codec` implements tokio-util's [`Decoder`] to cut
//! complete frames out of an accumulating buffer, and [`Encoder<Frame>`] to
//! write frames into an outgoing one.
//!
//! # Architecture
//!
//! ```text
//! serial bytes -> BytesMut -> Decoder -> Frame -> Response
//! Command -> Frame -> Encoder -> BytesMut -> serial bytes
//! ```
//!
//! # Resynchronisation
//!
//! Bytes before the `EF 01` header are discarded. A length field that cannot
//! describe a valid frame consumes the header and yields an error, so the
//! next call continues scanning instead of looping on the same bytes.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use tokio_util::codec::{Decoder, Encoder};
//! use fingerlink_protocol::{Frame, PacketKind, R307Codec};
//!
//! let mut codec = R307Codec::new();
//! let mut buffer = BytesMut::new();
//!
//! let ack = Frame::new(PacketKind::Ack, vec![0x00]).unwrap();
//! codec.encode(ack.clone(), &mut buffer).unwrap();
//!
//! let decoded = codec.decode(&mut buffer).unwrap();
//! assert_eq!(decoded, Some(ack));
//! assert!(buffer.is_empty());
//! ```

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::Frame;
use fingerlink_core::{
    Error, Result,
    constants::{CHECKSUM_LEN, FRAME_HEADER, FRAME_PREFIX_LEN, MAX_FRAME_SIZE},
};

/// Tokio codec for R307 frames.
#[derive(Debug, Clone)]
pub struct R307Codec {
    /// Frames longer than this are rejected before buffering their payload.
    max_frame_size: usize,

    /// Whether decoded frames must carry a correct checksum.
    verify_checksums: bool,
}

impl R307Codec {
    /// Create a codec with the default size limit and checksum verification.
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            verify_checksums: true,
        }
    }

    /// Create a codec with a custom maximum frame size.
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            ..Self::new()
        }
    }

    /// Enable or disable checksum verification on decode.
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// Get the current maximum frame size.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Whether decode verifies checksums.
    pub fn verifies_checksums(&self) -> bool {
        self.verify_checksums
    }

    /// Drop everything before the next header. Returns `false` if no header is buffered.
    fn discard_until_header(src: &mut BytesMut) -> bool {
        match src.windows(2).position(|window| window == FRAME_HEADER) {
            Some(offset) => {
                src.advance(offset);
                true
            }
            None => {
                // Keep a trailing first header byte; its partner may still be in flight
                let keep = usize::from(src.last() == Some(&FRAME_HEADER[0]));
                let drop = src.len() - keep;
                src.advance(drop);
                false
            }
        }
    }
}

impl Default for R307Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for R307Codec {
    type Item = Frame;
    type Error = Error;

    /// Extract the next complete frame from `src`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Frame))` - a complete frame was removed from the buffer
    /// - `Ok(None)` - more bytes are needed
    /// - `Err(Error)` - the buffered frame is invalid; its header has been consumed
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !Self::discard_until_header(src) {
            return Ok(None);
        }

        if src.len() < FRAME_PREFIX_LEN {
            return Ok(None);
        }

        let length = u16::from_be_bytes([src[7], src[8]]) as usize;
        if length < 1 + CHECKSUM_LEN {
            src.advance(FRAME_HEADER.len());
            return Err(Error::invalid_frame(format!(
                "length field {length} leaves no room for payload and checksum"
            )));
        }

        let total = FRAME_PREFIX_LEN + length;
        if total > self.max_frame_size {
            src.advance(FRAME_HEADER.len());
            return Err(Error::FrameTooLarge {
                size: total,
                max_size: self.max_frame_size,
            });
        }

        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let bytes = src.split_to(total);
        let frame = if self.verify_checksums {
            Frame::decode(&bytes)?
        } else {
            Frame::decode_unverified(&bytes)?
        };
        Ok(Some(frame))
    }
}

impl Encoder<Frame> for R307Codec {
    type Error = Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        if item.encoded_len() > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size: item.encoded_len(),
                max_size: self.max_frame_size,
            });
        }
        item.encode(dst);
        Ok(())
    }
}
