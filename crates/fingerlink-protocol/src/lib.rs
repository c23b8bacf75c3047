//! Packet codec for R307-class fingerprint modules.
//!
//! The module speaks a fixed-header binary protocol over a UART. This crate
//! turns typed [`Command`]s into wire [`Frame`]s, validates incoming frames and
//! extracts typed data from acknowledgements ([`Response`]). [`R307Codec`]
//! wraps the same logic in tokio-util's `Decoder`/`Encoder` traits so a byte
//! stream can be split into frames incrementally.
//!
//! ```
//! use fingerlink_protocol::{Command, Frame};
//! use fingerlink_core::constants::DEFAULT_ADDRESS;
//!
//! let frame = Command::CaptureImage.to_frame(DEFAULT_ADDRESS);
//! assert_eq!(
//!     frame.to_bytes().as_ref(),
//!     &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05]
//! );
//!
//! let decoded = Frame::decode(&frame.to_bytes()).unwrap();
//! assert_eq!(decoded.payload(), &[0x01]);
//! ```

pub mod codec;
pub mod commands;
pub mod frame;
pub mod response;

pub use codec::R307Codec;
pub use commands::{Command, Instruction};
pub use frame::{Frame, PacketKind, compute_checksum};
pub use response::{Response, SearchMatch};
