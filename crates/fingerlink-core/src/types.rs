use crate::{
    Result,
    constants::{BITMAP_LEN, LIBRARY_CAPACITY},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Slot index in the sensor's template library (0-255).
///
/// The module addresses slots with a big-endian u16 on the wire, but this
/// deployment only tracks the first [`LIBRARY_CAPACITY`] slots, so a `u8`
/// holds every valid value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(u8);

impl Position {
    /// First slot of the library.
    pub const MIN: Position = Position(0);

    /// Last slot of the library.
    pub const MAX: Position = Position(u8::MAX);

    /// Create a position from a wire value.
    ///
    /// # Errors
    /// Returns `Error::InvalidPosition` if the value is outside 0-255.
    pub fn new(value: u16) -> Result<Self> {
        u8::try_from(value).map(Position).map_err(|_| {
            Error::InvalidPosition(format!(
                "position must be below {LIBRARY_CAPACITY}, got {value}"
            ))
        })
    }

    /// Get the raw slot index.
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Get the slot index widened to the wire width.
    #[must_use]
    pub const fn as_u16(&self) -> u16 {
        self.0 as u16
    }

    /// Big-endian wire encoding (`[high, low]`).
    #[must_use]
    pub const fn to_be_bytes(&self) -> [u8; 2] {
        (self.0 as u16).to_be_bytes()
    }
}

impl From<u8> for Position {
    fn from(value: u8) -> Self {
        Position(value)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value: u16 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidPosition(format!("not a number: {s:?}")))?;
        Position::new(value)
    }
}

/// Working buffer on the module that holds a generated character file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharBuffer {
    One,
    Two,
}

impl CharBuffer {
    /// Buffer identifier as sent in command parameters.
    #[must_use]
    pub const fn id(&self) -> u8 {
        match self {
            CharBuffer::One => 0x01,
            CharBuffer::Two => 0x02,
        }
    }
}

/// Confirmation code carried in the first payload byte of an acknowledgement.
///
/// The meaning of `NoFinger` (0x02) is only ever read during image capture;
/// searches report a miss with `NotFound`. Codes without a named variant are
/// preserved in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConfirmationCode {
    Ok,
    PacketError,
    NoFinger,
    EnrollFailed,
    DisorderlyImage,
    TooFewFeatures,
    NotMatched,
    NotFound,
    MergeFailed,
    BeyondLibrary,
    ReadError,
    DeleteFailed,
    FlashError,
    Other(u8),
}

impl ConfirmationCode {
    /// Raw wire byte.
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::PacketError => 0x01,
            Self::NoFinger => 0x02,
            Self::EnrollFailed => 0x03,
            Self::DisorderlyImage => 0x06,
            Self::TooFewFeatures => 0x07,
            Self::NotMatched => 0x08,
            Self::NotFound => 0x09,
            Self::MergeFailed => 0x0A,
            Self::BeyondLibrary => 0x0B,
            Self::ReadError => 0x0C,
            Self::DeleteFailed => 0x10,
            Self::FlashError => 0x18,
            Self::Other(code) => *code,
        }
    }

    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// Short human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::PacketError => "packet receive error",
            Self::NoFinger => "no finger on sensor",
            Self::EnrollFailed => "failed to collect finger",
            Self::DisorderlyImage => "image too disorderly",
            Self::TooFewFeatures => "too few feature points",
            Self::NotMatched => "finger does not match",
            Self::NotFound => "no matching template",
            Self::MergeFailed => "failed to merge character files",
            Self::BeyondLibrary => "position beyond library",
            Self::ReadError => "error reading template",
            Self::DeleteFailed => "failed to delete template",
            Self::FlashError => "error writing flash",
            Self::Other(_) => "unknown confirmation code",
        }
    }
}

impl From<u8> for ConfirmationCode {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 => Self::Ok,
            0x01 => Self::PacketError,
            0x02 => Self::NoFinger,
            0x03 => Self::EnrollFailed,
            0x06 => Self::DisorderlyImage,
            0x07 => Self::TooFewFeatures,
            0x08 => Self::NotMatched,
            0x09 => Self::NotFound,
            0x0A => Self::MergeFailed,
            0x0B => Self::BeyondLibrary,
            0x0C => Self::ReadError,
            0x10 => Self::DeleteFailed,
            0x18 => Self::FlashError,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({:#04X})", self.description(), self.as_u8())
    }
}

/// Which of the 256 library slots hold a template.
///
/// Bit `i` lives in byte `i / 8` at bit `i % 8` (least significant first),
/// matching the layout of the module's index table.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OccupancyBitmap([u8; BITMAP_LEN]);

impl OccupancyBitmap {
    /// Bitmap with every slot free.
    #[must_use]
    pub const fn empty() -> Self {
        Self([0; BITMAP_LEN])
    }

    /// Build a bitmap from index table bytes.
    ///
    /// Short input is padded with free slots; bytes past [`BITMAP_LEN`] are ignored.
    #[must_use]
    pub fn from_index_table(bytes: &[u8]) -> Self {
        let mut table = [0u8; BITMAP_LEN];
        let len = bytes.len().min(BITMAP_LEN);
        table[..len].copy_from_slice(&bytes[..len]);
        Self(table)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; BITMAP_LEN] {
        &self.0
    }

    #[must_use]
    pub fn is_occupied(&self, position: Position) -> bool {
        let index = position.as_u8() as usize;
        (self.0[index / 8] >> (index % 8)) & 1 == 1
    }

    pub fn set(&mut self, position: Position) {
        let index = position.as_u8() as usize;
        self.0[index / 8] |= 1 << (index % 8);
    }

    pub fn clear(&mut self, position: Position) {
        let index = position.as_u8() as usize;
        self.0[index / 8] &= !(1 << (index % 8));
    }

    /// Occupied positions in ascending order.
    pub fn occupied(&self) -> impl Iterator<Item = Position> + '_ {
        (0..=u8::MAX)
            .map(Position::from)
            .filter(|position| self.is_occupied(*position))
    }

    /// Occupied positions as a set, for set arithmetic against the remote index.
    #[must_use]
    pub fn occupied_set(&self) -> BTreeSet<Position> {
        self.occupied().collect()
    }

    /// Lowest free position, or `None` when the library is full.
    #[must_use]
    pub fn first_free(&self) -> Option<Position> {
        (0..=u8::MAX)
            .map(Position::from)
            .find(|position| !self.is_occupied(*position))
    }

    /// Number of occupied positions.
    #[must_use]
    pub fn count(&self) -> usize {
        self.0.iter().map(|byte| byte.count_ones() as usize).sum()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.count() == LIBRARY_CAPACITY
    }
}

impl FromIterator<Position> for OccupancyBitmap {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        let mut bitmap = Self::empty();
        for position in iter {
            bitmap.set(position);
        }
        bitmap
    }
}

impl fmt::Debug for OccupancyBitmap {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_set().entries(self.occupied()).finish()
    }
}
