use crate::frame::{Frame, PacketKind};
use fingerlink_core::{ConfirmationCode, Error, OccupancyBitmap, Position, Result};

/// A library hit returned by a successful search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchMatch {
    pub position: Position,
    pub score: u16,
}

/// Acknowledgement frame from the module.
///
/// The first payload byte is the confirmation code; anything after it is
/// instruction-specific data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    frame: Frame,
    code: ConfirmationCode,
}

impl Response {
    /// Wrap a decoded frame.
    ///
    /// # Errors
    /// Returns `Error::UnexpectedPackage` if the frame is not an acknowledgement.
    pub fn from_frame(frame: Frame) -> Result<Self> {
        if frame.kind() != PacketKind::Ack {
            return Err(Error::UnexpectedPackage(frame.kind().as_u8()));
        }
        let code = frame
            .confirmation_code()
            .ok_or_else(|| Error::invalid_frame("acknowledgement without confirmation code"))?;
        Ok(Self { frame, code })
    }

    #[must_use]
    pub fn code(&self) -> ConfirmationCode {
        self.code
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    /// Payload bytes after the confirmation code.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.frame.payload()[1..]
    }

    #[must_use]
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Turn a non-zero confirmation code into `Error::Device`.
    ///
    /// # Errors
    /// Returns `Error::Device` tagged with `operation` unless the code is `0x00`.
    pub fn ensure_ok(self, operation: &'static str) -> Result<Self> {
        if self.code.is_ok() {
            Ok(self)
        } else {
            Err(Error::Device {
                operation,
                code: self.code,
            })
        }
    }

    /// Matched position and score from a search acknowledgement.
    ///
    /// # Errors
    /// Returns an error if the data is shorter than four bytes or the
    /// position lies outside the tracked library.
    pub fn search_match(&self) -> Result<SearchMatch> {
        let data = self.data();
        if data.len() < 4 {
            return Err(Error::invalid_frame(format!(
                "search result needs 4 data bytes, got {}",
                data.len()
            )));
        }
        let position = Position::new(u16::from_be_bytes([data[0], data[1]]))?;
        let score = u16::from_be_bytes([data[2], data[3]]);
        Ok(SearchMatch { position, score })
    }

    /// Occupancy bitmap from a read-index-table acknowledgement.
    ///
    /// Bytes the module did not send read as free slots.
    #[must_use]
    pub fn occupancy_bitmap(&self) -> OccupancyBitmap {
        OccupancyBitmap::from_index_table(self.data())
    }
}
