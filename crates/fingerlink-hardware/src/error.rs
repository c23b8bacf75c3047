//! Error types for sensor operations.
//!
//! Wire-level failures (bad frames, checksum mismatches, rejected
//! instructions) come from `fingerlink_core::Error` and are carried through
//! [`HardwareError::Protocol`]. Everything else here is about the link to the
//! module itself.

use fingerlink_core::ConfirmationCode;

/// Result type alias for sensor operations.
pub type Result<T> = std::result::Result<T, HardwareError>;

/// Errors that can occur while talking to the module.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// No acknowledgement arrived after a command.
    #[error("Sensor did not answer {operation} within {duration_ms}ms")]
    Timeout {
        operation: &'static str,
        duration_ms: u64,
    },

    /// The link to the module is gone.
    #[error("Device disconnected: {device}")]
    Disconnected { device: String },

    /// Transport-level failure that is not a timeout.
    #[error("Communication error: {message}")]
    CommunicationError { message: String },

    /// Transport could not be set up with the requested settings.
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    /// Frame, checksum or confirmation-code failure.
    #[error(transparent)]
    Protocol(#[from] fingerlink_core::Error),

    /// Serial port driver error.
    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HardwareError {
    /// Create a new timeout error.
    pub fn timeout(operation: &'static str, duration_ms: u64) -> Self {
        Self::Timeout {
            operation,
            duration_ms,
        }
    }

    /// Create a new disconnected error.
    pub fn disconnected(device: impl Into<String>) -> Self {
        Self::Disconnected {
            device: device.into(),
        }
    }

    /// Create a new communication error.
    pub fn communication(message: impl Into<String>) -> Self {
        Self::CommunicationError {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Whether the module simply did not answer.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Confirmation code of a rejected instruction, if that is what failed.
    pub fn device_code(&self) -> Option<ConfirmationCode> {
        match self {
            Self::Protocol(fingerlink_core::Error::Device { code, .. }) => Some(*code),
            _ => None,
        }
    }

    /// Whether the module reported its library full or the slot out of range.
    pub fn is_library_full(&self) -> bool {
        matches!(self, Self::Protocol(inner) if inner.is_library_full())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error() {
        let error = HardwareError::timeout("capture_image", 700);
        assert!(error.is_timeout());
        assert_eq!(
            error.to_string(),
            "Sensor did not answer capture_image within 700ms"
        );
    }

    #[test]
    fn test_device_code_passthrough() {
        let error: HardwareError = fingerlink_core::Error::Device {
            operation: "store_template",
            code: ConfirmationCode::BeyondLibrary,
        }
        .into();

        assert_eq!(error.device_code(), Some(ConfirmationCode::BeyondLibrary));
        assert!(error.is_library_full());
        assert!(!error.is_timeout());
    }

    #[test]
    fn test_protocol_error_is_transparent() {
        let inner = fingerlink_core::Error::ChecksumMismatch {
            expected: 1,
            actual: 2,
        };
        let message = inner.to_string();
        let error = HardwareError::from(inner);
        assert_eq!(error.to_string(), message);
        assert_eq!(error.device_code(), None);
    }

    #[test]
    fn test_communication_error() {
        let error = HardwareError::communication("Serial port closed");
        assert_eq!(error.to_string(), "Communication error: Serial port closed");
    }
}
