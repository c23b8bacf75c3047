//! Instruction set used to drive the module.
//!
//! Every command is sent as a [`PacketKind::Command`] frame whose payload is
//! the instruction code followed by its parameters. Multi-byte parameters
//! are big-endian.
//!
//! | Command | Code | Parameters |
//! |---|---|---|
//! | `CaptureImage` | `0x01` | none |
//! | `GenerateChar` | `0x02` | buffer id |
//! | `Search` | `0x04` | buffer id, start (u16), count (u16) |
//! | `RegisterModel` | `0x05` | none |
//! | `Store` | `0x06` | buffer id, position (u16) |
//! | `DeleteChar` | `0x0C` | position (u16), count (u16) |
//! | `Ping` | `0x13` | none |
//! | `ReadIndexTable` | `0x1F` | none |
//!
//! # Examples
//!
//! ```
//! use fingerlink_core::{CharBuffer, Position, constants::DEFAULT_ADDRESS};
//! use fingerlink_protocol::Command;
//!
//! let store = Command::Store {
//!     buffer: CharBuffer::One,
//!     position: Position::from(5),
//! };
//! let bytes = store.to_frame(DEFAULT_ADDRESS).to_bytes();
//! assert_eq!(&bytes[9..13], &[0x06, 0x01, 0x00, 0x05]);
//! ```

use crate::frame::{Frame, PacketKind};
use bytes::{BufMut, BytesMut};
use fingerlink_core::{CharBuffer, Error, Position, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Instruction codes understood by the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    CaptureImage,   // 0x01
    GenerateChar,   // 0x02
    Search,         // 0x04
    RegisterModel,  // 0x05
    Store,          // 0x06
    DeleteChar,     // 0x0C
    Ping,           // 0x13
    ReadIndexTable, // 0x1F
}

impl Instruction {
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Instruction::CaptureImage => 0x01,
            Instruction::GenerateChar => 0x02,
            Instruction::Search => 0x04,
            Instruction::RegisterModel => 0x05,
            Instruction::Store => 0x06,
            Instruction::DeleteChar => 0x0C,
            Instruction::Ping => 0x13,
            Instruction::ReadIndexTable => 0x1F,
        }
    }

    /// Look up an instruction by its wire code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Instruction::CaptureImage),
            0x02 => Some(Instruction::GenerateChar),
            0x04 => Some(Instruction::Search),
            0x05 => Some(Instruction::RegisterModel),
            0x06 => Some(Instruction::Store),
            0x0C => Some(Instruction::DeleteChar),
            0x13 => Some(Instruction::Ping),
            0x1F => Some(Instruction::ReadIndexTable),
            _ => None,
        }
    }

    /// Operation name used in logs and errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Instruction::CaptureImage => "capture_image",
            Instruction::GenerateChar => "generate_character_file",
            Instruction::Search => "search_template",
            Instruction::RegisterModel => "merge_character_files",
            Instruction::Store => "store_template",
            Instruction::DeleteChar => "delete_template",
            Instruction::Ping => "ping",
            Instruction::ReadIndexTable => "read_occupancy_bitmap",
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fully parameterised instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Scan the finger on the window into the image buffer.
    CaptureImage,

    /// Extract a character file from the image buffer into `buffer`.
    GenerateChar { buffer: CharBuffer },

    /// Search the library range `start..start + count` for the file in `buffer`.
    Search {
        buffer: CharBuffer,
        start: u16,
        count: u16,
    },

    /// Merge both character buffers into a template.
    RegisterModel,

    /// Persist the template in `buffer` at `position`.
    Store {
        buffer: CharBuffer,
        position: Position,
    },

    /// Free `count` contiguous slots starting at `position`.
    DeleteChar { position: Position, count: u16 },

    /// Connection check; acknowledged with `0x00` by a listening module.
    Ping,

    /// Read the occupancy bitmap of the template library.
    ReadIndexTable,
}

impl Command {
    #[must_use]
    pub const fn instruction(&self) -> Instruction {
        match self {
            Command::CaptureImage => Instruction::CaptureImage,
            Command::GenerateChar { .. } => Instruction::GenerateChar,
            Command::Search { .. } => Instruction::Search,
            Command::RegisterModel => Instruction::RegisterModel,
            Command::Store { .. } => Instruction::Store,
            Command::DeleteChar { .. } => Instruction::DeleteChar,
            Command::Ping => Instruction::Ping,
            Command::ReadIndexTable => Instruction::ReadIndexTable,
        }
    }

    /// Instruction code followed by its parameters.
    #[must_use]
    pub fn payload(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(6);
        buf.put_u8(self.instruction().code());

        match *self {
            Command::GenerateChar { buffer } => {
                buf.put_u8(buffer.id());
            }
            Command::Search {
                buffer,
                start,
                count,
            } => {
                buf.put_u8(buffer.id());
                buf.put_u16(start);
                buf.put_u16(count);
            }
            Command::Store { buffer, position } => {
                buf.put_u8(buffer.id());
                buf.put_slice(&position.to_be_bytes());
            }
            Command::DeleteChar { position, count } => {
                buf.put_slice(&position.to_be_bytes());
                buf.put_u16(count);
            }
            Command::CaptureImage
            | Command::RegisterModel
            | Command::Ping
            | Command::ReadIndexTable => {}
        }

        buf
    }

    /// Build the command frame for the module at `address`.
    #[must_use]
    pub fn to_frame(&self, address: u32) -> Frame {
        Frame::from_parts(address, PacketKind::Command, self.payload().freeze())
    }

    /// Parse a command frame back into a typed command.
    ///
    /// This is the module side of the exchange; the emulated sensor uses it
    /// to interpret what the host sent.
    ///
    /// # Errors
    /// Returns an error if the frame is not a command, the instruction code is
    /// unknown, or the parameters are missing or out of range.
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        if frame.kind() != PacketKind::Command {
            return Err(Error::UnexpectedPackage(frame.kind().as_u8()));
        }

        let payload = frame.payload();
        let code = *payload
            .first()
            .ok_or_else(|| Error::invalid_frame("command frame without instruction"))?;
        let instruction = Instruction::from_code(code)
            .ok_or_else(|| Error::invalid_frame(format!("unknown instruction {code:#04X}")))?;
        let params = &payload[1..];

        let need = |len: usize| -> Result<()> {
            if params.len() < len {
                Err(Error::invalid_frame(format!(
                    "{instruction} needs {len} parameter bytes, got {}",
                    params.len()
                )))
            } else {
                Ok(())
            }
        };
        let u16_at = |offset: usize| u16::from_be_bytes([params[offset], params[offset + 1]]);

        let command = match instruction {
            Instruction::CaptureImage => Command::CaptureImage,
            Instruction::RegisterModel => Command::RegisterModel,
            Instruction::Ping => Command::Ping,
            Instruction::ReadIndexTable => Command::ReadIndexTable,
            Instruction::GenerateChar => {
                need(1)?;
                Command::GenerateChar {
                    buffer: parse_buffer(params[0])?,
                }
            }
            Instruction::Search => {
                need(5)?;
                Command::Search {
                    buffer: parse_buffer(params[0])?,
                    start: u16_at(1),
                    count: u16_at(3),
                }
            }
            Instruction::Store => {
                need(3)?;
                Command::Store {
                    buffer: parse_buffer(params[0])?,
                    position: Position::new(u16_at(1))?,
                }
            }
            Instruction::DeleteChar => {
                need(4)?;
                Command::DeleteChar {
                    position: Position::new(u16_at(0))?,
                    count: u16_at(2),
                }
            }
        };
        Ok(command)
    }
}

fn parse_buffer(id: u8) -> Result<CharBuffer> {
    match id {
        1 => Ok(CharBuffer::One),
        2 => Ok(CharBuffer::Two),
        other => Err(Error::invalid_frame(format!("unknown character buffer {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingerlink_core::constants::DEFAULT_ADDRESS;
    use rstest::rstest;

    const PREFIX: [u8; 7] = [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];

    fn wire(command: Command) -> Vec<u8> {
        command.to_frame(DEFAULT_ADDRESS).to_bytes().to_vec()
    }

    fn expected(rest: &[u8]) -> Vec<u8> {
        let mut bytes = PREFIX.to_vec();
        bytes.extend_from_slice(rest);
        bytes
    }

    // Reference packets captured from a working R307 installation
    #[rstest]
    #[case::capture(Command::CaptureImage, &[0x00, 0x03, 0x01, 0x00, 0x05])]
    #[case::generate_1(
        Command::GenerateChar { buffer: CharBuffer::One },
        &[0x00, 0x04, 0x02, 0x01, 0x00, 0x08]
    )]
    #[case::generate_2(
        Command::GenerateChar { buffer: CharBuffer::Two },
        &[0x00, 0x04, 0x02, 0x02, 0x00, 0x09]
    )]
    #[case::merge(Command::RegisterModel, &[0x00, 0x03, 0x05, 0x00, 0x09])]
    #[case::ping(Command::Ping, &[0x00, 0x03, 0x13, 0x00, 0x17])]
    #[case::index(Command::ReadIndexTable, &[0x00, 0x03, 0x1F, 0x00, 0x23])]
    #[case::store(
        Command::Store { buffer: CharBuffer::One, position: Position::from(5) },
        &[0x00, 0x06, 0x06, 0x01, 0x00, 0x05, 0x00, 0x13]
    )]
    #[case::search(
        Command::Search { buffer: CharBuffer::One, start: 0, count: 100 },
        &[0x00, 0x08, 0x04, 0x01, 0x00, 0x00, 0x00, 0x64, 0x00, 0x72]
    )]
    #[case::delete(
        Command::DeleteChar { position: Position::from(5), count: 1 },
        &[0x00, 0x07, 0x0C, 0x00, 0x05, 0x00, 0x01, 0x00, 0x1A]
    )]
    fn test_command_wire_format(#[case] command: Command, #[case] rest: &[u8]) {
        assert_eq!(wire(command), expected(rest));
    }

    #[test]
    fn test_search_full_library() {
        let bytes = wire(Command::Search {
            buffer: CharBuffer::One,
            start: 0,
            count: 256,
        });
        assert_eq!(&bytes[9..15], &[0x04, 0x01, 0x00, 0x00, 0x01, 0x00]);
    }

    #[rstest]
    #[case(Command::CaptureImage)]
    #[case(Command::GenerateChar { buffer: CharBuffer::Two })]
    #[case(Command::Search { buffer: CharBuffer::One, start: 0, count: 256 })]
    #[case(Command::Store { buffer: CharBuffer::One, position: Position::from(200) })]
    #[case(Command::DeleteChar { position: Position::from(3), count: 1 })]
    #[case(Command::ReadIndexTable)]
    fn test_parse_command_frame(#[case] command: Command) {
        let frame = command.to_frame(DEFAULT_ADDRESS);
        assert_eq!(Command::from_frame(&frame).unwrap(), command);
    }

    #[test]
    fn test_parse_rejects_short_parameters() {
        let frame = Frame::new(PacketKind::Command, vec![0x06, 0x01]).unwrap();
        assert!(matches!(
            Command::from_frame(&frame),
            Err(Error::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_instruction() {
        let frame = Frame::new(PacketKind::Command, vec![0x7F]).unwrap();
        assert!(Command::from_frame(&frame).is_err());
    }

    #[test]
    fn test_instruction_code_roundtrip() {
        for instruction in [
            Instruction::CaptureImage,
            Instruction::GenerateChar,
            Instruction::Search,
            Instruction::RegisterModel,
            Instruction::Store,
            Instruction::DeleteChar,
            Instruction::Ping,
            Instruction::ReadIndexTable,
        ] {
            assert_eq!(Instruction::from_code(instruction.code()), Some(instruction));
        }
        assert_eq!(Instruction::from_code(0x7F), None);
    }
}
