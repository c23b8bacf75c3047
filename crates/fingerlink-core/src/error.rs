use crate::types::ConfirmationCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid frame: {message}")]
    InvalidFrame { message: String },

    #[error("Checksum mismatch: expected {expected:#06X}, got {actual:#06X}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("Frame too large: {size} bytes exceeds maximum {max_size} bytes")]
    FrameTooLarge { size: usize, max_size: usize },

    #[error("Unexpected package identifier: {0:#04X}")]
    UnexpectedPackage(u8),

    // Device errors
    #[error("{operation} rejected by sensor: {code}")]
    Device {
        operation: &'static str,
        code: ConfirmationCode,
    },

    // Validation errors
    #[error("Invalid position: {0}")]
    InvalidPosition(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid frame error.
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: message.into(),
        }
    }

    /// Check whether the sensor reported a full or out-of-range library.
    pub fn is_library_full(&self) -> bool {
        matches!(
            self,
            Self::Device {
                code: ConfirmationCode::BeyondLibrary,
                ..
            }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_mismatch_display() {
        let error = Error::ChecksumMismatch {
            expected: 0x0017,
            actual: 0x0018,
        };
        assert_eq!(
            error.to_string(),
            "Checksum mismatch: expected 0x0017, got 0x0018"
        );
    }

    #[test]
    fn test_device_error_display() {
        let error = Error::Device {
            operation: "store_template",
            code: ConfirmationCode::BeyondLibrary,
        };
        assert!(error.is_library_full());
        assert_eq!(
            error.to_string(),
            "store_template rejected by sensor: position beyond library (0x0B)"
        );
    }
}
