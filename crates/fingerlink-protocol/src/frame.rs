use bytes::{BufMut, Bytes, BytesMut};
use fingerlink_core::{
    ConfirmationCode, Error, Result,
    constants::{
        CHECKSUM_LEN, DEFAULT_ADDRESS, FRAME_HEADER, FRAME_PREFIX_LEN, MIN_FRAME_LEN, PID_ACK,
        PID_COMMAND, PID_DATA, PID_END_DATA,
    },
};
use std::fmt;

/// Package identifier of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Host-to-module instruction.
    Command,
    /// Data packet with more to follow.
    Data,
    /// Module acknowledgement carrying a confirmation code.
    Ack,
    /// Last data packet of a transfer.
    EndData,
}

impl PacketKind {
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        match self {
            PacketKind::Command => PID_COMMAND,
            PacketKind::Data => PID_DATA,
            PacketKind::Ack => PID_ACK,
            PacketKind::EndData => PID_END_DATA,
        }
    }
}

impl TryFrom<u8> for PacketKind {
    type Error = Error;

    fn try_from(pid: u8) -> Result<Self> {
        match pid {
            PID_COMMAND => Ok(PacketKind::Command),
            PID_DATA => Ok(PacketKind::Data),
            PID_ACK => Ok(PacketKind::Ack),
            PID_END_DATA => Ok(PacketKind::EndData),
            other => Err(Error::UnexpectedPackage(other)),
        }
    }
}

/// Low 16 bits of the sum of the package identifier, both length bytes and
/// every payload byte.
///
/// # Examples
///
/// ```
/// use fingerlink_protocol::compute_checksum;
///
/// // Capture image: PID 0x01, length 0x0003, payload [0x01]
/// assert_eq!(compute_checksum(0x01, 0x0003, &[0x01]), 0x0005);
/// ```
#[must_use]
pub fn compute_checksum(pid: u8, length: u16, payload: &[u8]) -> u16 {
    let [len_hi, len_lo] = length.to_be_bytes();
    let header_sum = pid as u32 + len_hi as u32 + len_lo as u32;
    let sum = payload
        .iter()
        .fold(header_sum, |acc, &byte| acc.wrapping_add(byte as u32));
    (sum & 0xFFFF) as u16
}

/// One complete protocol message exchanged with the module.
///
/// # Wire Format
///
/// ```text
/// EF 01 | ADDR(4) | PID | LEN(2, BE) | PAYLOAD | SUM(2, BE)
/// ```
///
/// `LEN` counts the payload plus the checksum. A frame built with
/// [`Frame::new`] always carries a correct checksum; a decoded frame keeps
/// the checksum exactly as received.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    address: u32,
    kind: PacketKind,
    payload: Bytes,
    checksum: u16,
}

impl Frame {
    /// Create a frame for the broadcast address.
    ///
    /// # Errors
    /// Returns `Error::FrameTooLarge` if the payload does not fit the 16-bit length field.
    pub fn new(kind: PacketKind, payload: impl Into<Bytes>) -> Result<Self> {
        Self::with_address(DEFAULT_ADDRESS, kind, payload)
    }

    /// Create a frame for a specific module address.
    ///
    /// # Errors
    /// Returns `Error::FrameTooLarge` if the payload does not fit the 16-bit length field.
    pub fn with_address(address: u32, kind: PacketKind, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();
        let max_payload = u16::MAX as usize - CHECKSUM_LEN;
        if payload.len() > max_payload {
            return Err(Error::FrameTooLarge {
                size: FRAME_PREFIX_LEN + payload.len() + CHECKSUM_LEN,
                max_size: FRAME_PREFIX_LEN + u16::MAX as usize,
            });
        }
        Ok(Self::from_parts(address, kind, payload))
    }

    /// Build a frame whose payload is known to fit the length field.
    pub(crate) fn from_parts(address: u32, kind: PacketKind, payload: Bytes) -> Self {
        debug_assert!(payload.len() + CHECKSUM_LEN <= u16::MAX as usize);
        let length = (payload.len() + CHECKSUM_LEN) as u16;
        let checksum = compute_checksum(kind.as_u8(), length, &payload);
        Self {
            address,
            kind,
            payload,
            checksum,
        }
    }

    /// Parse the first frame in `bytes` and verify its checksum.
    ///
    /// Bytes after the end of the frame are ignored.
    ///
    /// # Errors
    /// Returns an error if the frame is shorter than 12 bytes, has the wrong
    /// header, an unknown package identifier, a length shorter than one
    /// payload byte plus checksum, is truncated, or fails checksum verification.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let frame = Self::decode_unverified(bytes)?;
        frame.verify_checksum()?;
        Ok(frame)
    }

    /// Parse the first frame in `bytes` without checking its checksum.
    ///
    /// # Errors
    /// Same as [`Frame::decode`] minus the checksum verification.
    pub fn decode_unverified(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_FRAME_LEN {
            return Err(Error::invalid_frame(format!(
                "frame too short: {} bytes, need at least {MIN_FRAME_LEN}",
                bytes.len()
            )));
        }

        if bytes[..2] != FRAME_HEADER {
            return Err(Error::invalid_frame(format!(
                "bad header {:02X} {:02X}",
                bytes[0], bytes[1]
            )));
        }

        let address = u32::from_be_bytes([bytes[2], bytes[3], bytes[4], bytes[5]]);
        let kind = PacketKind::try_from(bytes[6])?;
        let length = u16::from_be_bytes([bytes[7], bytes[8]]) as usize;

        if length < 1 + CHECKSUM_LEN {
            return Err(Error::invalid_frame(format!(
                "length field {length} leaves no room for payload and checksum"
            )));
        }

        let total = FRAME_PREFIX_LEN + length;
        if bytes.len() < total {
            return Err(Error::invalid_frame(format!(
                "truncated frame: {} of {total} bytes",
                bytes.len()
            )));
        }

        let payload_end = total - CHECKSUM_LEN;
        let payload = Bytes::copy_from_slice(&bytes[FRAME_PREFIX_LEN..payload_end]);
        let checksum = u16::from_be_bytes([bytes[payload_end], bytes[payload_end + 1]]);

        Ok(Self {
            address,
            kind,
            payload,
            checksum,
        })
    }

    #[must_use]
    pub fn address(&self) -> u32 {
        self.address
    }

    #[must_use]
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Value of the length field: payload plus checksum.
    #[must_use]
    pub fn length(&self) -> u16 {
        (self.payload.len() + CHECKSUM_LEN) as u16
    }

    /// Checksum carried by the frame.
    #[must_use]
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Checksum the frame should carry given its contents.
    #[must_use]
    pub fn computed_checksum(&self) -> u16 {
        compute_checksum(self.kind.as_u8(), self.length(), &self.payload)
    }

    /// Compare the carried checksum with the computed one.
    ///
    /// # Errors
    /// Returns `Error::ChecksumMismatch` when they differ.
    pub fn verify_checksum(&self) -> Result<()> {
        let expected = self.computed_checksum();
        if expected == self.checksum {
            Ok(())
        } else {
            Err(Error::ChecksumMismatch {
                expected,
                actual: self.checksum,
            })
        }
    }

    /// First payload byte of an acknowledgement.
    ///
    /// Returns `None` for command and data frames.
    #[must_use]
    pub fn confirmation_code(&self) -> Option<ConfirmationCode> {
        match self.kind {
            PacketKind::Ack => self.payload.first().copied().map(ConfirmationCode::from),
            _ => None,
        }
    }

    /// Size of the frame on the wire.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FRAME_PREFIX_LEN + self.payload.len() + CHECKSUM_LEN
    }

    /// Append the wire encoding to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_slice(&FRAME_HEADER);
        dst.put_u32(self.address);
        dst.put_u8(self.kind.as_u8());
        dst.put_u16(self.length());
        dst.put_slice(&self.payload);
        dst.put_u16(self.checksum);
    }

    /// Wire encoding as an owned buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode(&mut buf);
        buf.freeze()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("address", &format_args!("{:#010X}", self.address))
            .field("kind", &self.kind)
            .field("payload", &format_args!("{:02X?}", self.payload.as_ref()))
            .field("checksum", &format_args!("{:#06X}", self.checksum))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const CAPTURE_IMAGE: [u8; 12] = [
        0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05,
    ];

    fn ack(payload: &[u8]) -> Vec<u8> {
        Frame::new(PacketKind::Ack, payload.to_vec())
            .unwrap()
            .to_bytes()
            .to_vec()
    }

    #[test]
    fn test_encode_capture_image() {
        let frame = Frame::new(PacketKind::Command, vec![0x01]).unwrap();
        assert_eq!(frame.length(), 3);
        assert_eq!(frame.checksum(), 0x0005);
        assert_eq!(frame.to_bytes().as_ref(), &CAPTURE_IMAGE);
    }

    #[test]
    fn test_encode_custom_address() {
        let frame = Frame::with_address(0x1234_5678, PacketKind::Command, vec![0x01]).unwrap();
        let bytes = frame.to_bytes();
        assert_eq!(&bytes[2..6], &[0x12, 0x34, 0x56, 0x78]);
        // Address is not part of the checksum
        assert_eq!(frame.checksum(), 0x0005);
    }

    #[test]
    fn test_decode_ack() {
        let frame = Frame::decode(&ack(&[0x00])).unwrap();
        assert_eq!(frame.kind(), PacketKind::Ack);
        assert_eq!(frame.address(), DEFAULT_ADDRESS);
        assert_eq!(frame.confirmation_code(), Some(ConfirmationCode::Ok));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut bytes = ack(&[0x02]);
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        let frame = Frame::decode(&bytes).unwrap();
        assert_eq!(frame.confirmation_code(), Some(ConfirmationCode::NoFinger));
    }

    #[rstest]
    #[case::empty(&[])]
    #[case::eleven_bytes(&CAPTURE_IMAGE[..11])]
    fn test_decode_too_short(#[case] bytes: &[u8]) {
        let result = Frame::decode(bytes);
        assert!(matches!(result, Err(Error::InvalidFrame { .. })));
    }

    #[test]
    fn test_decode_bad_header() {
        let mut bytes = CAPTURE_IMAGE;
        bytes[0] = 0xEE;
        assert!(matches!(
            Frame::decode(&bytes),
            Err(Error::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_decode_unknown_package_identifier() {
        let mut bytes = CAPTURE_IMAGE;
        bytes[6] = 0x05;
        assert!(matches!(
            Frame::decode(&bytes),
            Err(Error::UnexpectedPackage(0x05))
        ));
    }

    #[test]
    fn test_decode_length_too_small() {
        let mut bytes = CAPTURE_IMAGE;
        bytes[8] = 0x02;
        assert!(matches!(
            Frame::decode(&bytes),
            Err(Error::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_decode_truncated_payload() {
        // Length claims 35 bytes but only the confirmation code arrived
        let mut bytes = ack(&[0x00]);
        bytes[8] = 35;
        assert!(matches!(
            Frame::decode(&bytes),
            Err(Error::InvalidFrame { .. })
        ));
    }

    #[test]
    fn test_decode_rejects_corrupted_checksum() {
        let mut bytes = ack(&[0x00, 0x00, 0x05, 0x00, 0x64]);
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        match Frame::decode(&bytes) {
            Err(Error::ChecksumMismatch { expected, actual }) => assert_ne!(expected, actual),
            other => panic!("Expected ChecksumMismatch, got {other:?}"),
        }

        // The unverified path accepts the same bytes
        let frame = Frame::decode_unverified(&bytes).unwrap();
        assert_eq!(frame.confirmation_code(), Some(ConfirmationCode::Ok));
        assert!(frame.verify_checksum().is_err());
    }

    #[test]
    fn test_confirmation_code_only_on_ack() {
        let frame = Frame::new(PacketKind::Command, vec![0x00]).unwrap();
        assert_eq!(frame.confirmation_code(), None);
    }

    #[test]
    fn test_checksum_wraps_to_16_bits() {
        let payload = vec![0xFF; 300];
        let sum = 0x07 + 0x01 + 0x2E + 0xFF * 300;
        assert_eq!(
            compute_checksum(0x07, 302, &payload),
            (sum & 0xFFFF) as u16
        );
    }
}
