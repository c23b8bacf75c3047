//! Core constants for the R307 packet protocol.
//!
//! This module defines the wire-level constants shared by the codec, the
//! sensor driver and the engines. The values are fixed by the module's
//! firmware; changing them breaks interoperability with real hardware.
//!
//! # Frame Structure
//!
//! Every packet exchanged with the module has the same layout:
//!
//! ```text
//! EF 01 | FF FF FF FF | PID | LEN_H LEN_L | PAYLOAD ... | SUM_H SUM_L
//! ^^^^^   ^^^^^^^^^^^   ^^^   ^^^^^^^^^^^   ^^^^^^^^^^^   ^^^^^^^^^^^
//! header  address       id    length        instruction   checksum
//!                                           or response
//! ```
//!
//! - `LEN` counts the payload plus the two checksum bytes.
//! - The checksum is the low 16 bits of `PID + LEN_H + LEN_L + sum(PAYLOAD)`.
//!
//! # Usage
//!
//! ```
//! use fingerlink_core::constants::*;
//!
//! assert_eq!(FRAME_HEADER, [0xEF, 0x01]);
//! assert_eq!(MIN_FRAME_LEN, FRAME_PREFIX_LEN + 1 + CHECKSUM_LEN);
//! ```

// ============================================================================
// Framing
// ============================================================================

/// Fixed two-byte marker that starts every frame.
pub const FRAME_HEADER: [u8; 2] = [0xEF, 0x01];

/// Broadcast module address used by single-sensor deployments.
pub const DEFAULT_ADDRESS: u32 = 0xFFFF_FFFF;

/// Package identifier for host-to-module command packets.
pub const PID_COMMAND: u8 = 0x01;

/// Package identifier for data packets followed by more data.
pub const PID_DATA: u8 = 0x02;

/// Package identifier for module acknowledgements.
pub const PID_ACK: u8 = 0x07;

/// Package identifier for the final data packet of a transfer.
pub const PID_END_DATA: u8 = 0x08;

/// Bytes before the payload: header (2) + address (4) + identifier (1) + length (2).
pub const FRAME_PREFIX_LEN: usize = 9;

/// Width of the trailing checksum.
pub const CHECKSUM_LEN: usize = 2;

/// Smallest valid frame: prefix, one payload byte and the checksum.
///
/// For a response this is the prefix through the confirmation code.
pub const MIN_FRAME_LEN: usize = FRAME_PREFIX_LEN + 1 + CHECKSUM_LEN;

/// Offset of the confirmation code inside an acknowledgement frame.
pub const CONFIRMATION_OFFSET: usize = FRAME_PREFIX_LEN;

/// Offset of the occupancy bitmap inside a read-index-table acknowledgement.
pub const INDEX_TABLE_OFFSET: usize = CONFIRMATION_OFFSET + 1;

/// Upper bound on a decoded frame, well above the largest data packet.
pub const MAX_FRAME_SIZE: usize = 512;

// ============================================================================
// Template Library
// ============================================================================

/// Number of template slots tracked in the occupancy bitmap.
pub const LIBRARY_CAPACITY: usize = 256;

/// Size of the occupancy bitmap in bytes (one bit per slot).
pub const BITMAP_LEN: usize = LIBRARY_CAPACITY / 8;

// ============================================================================
// Timing
// ============================================================================

/// Serial line speed the module ships with.
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Delay between writing a command and reading the response (milliseconds).
///
/// The module needs this time to produce its acknowledgement; it is part of
/// the command contract rather than a tuning knob.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 500;

/// Interval between presence polls (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// How long the engines wait for a finger to be placed or lifted (milliseconds).
pub const DEFAULT_PRESENCE_TIMEOUT_MS: u64 = 20_000;

/// Pause between consecutive deletions during reconciliation (milliseconds).
pub const DEFAULT_DELETION_PAUSE_MS: u64 = 500;

/// Read timeout on the serial port (milliseconds).
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 200;

/// Largest response read from the transport in one call.
pub const DEFAULT_MAX_RESPONSE_LEN: usize = 256;
