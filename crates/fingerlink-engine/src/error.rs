//! Error types for the station engines.
//!
//! Engines report expected failures (timeouts, rejected captures, missing
//! index data) through their outcome types. `EngineError` covers what is left:
//! failures the caller has to see as errors.

use fingerlink_hardware::HardwareError;
use fingerlink_storage::StorageError;

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Sensor error: {0}")]
    Hardware(#[from] HardwareError),

    #[error("Remote store error: {0}")]
    Storage(#[from] StorageError),

    /// A step sequence tried to move somewhere its rules do not allow.
    #[error("Invalid step transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}

impl EngineError {
    pub fn invalid_transition(from: impl ToString, to: impl ToString) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

impl From<fingerlink_core::Error> for EngineError {
    fn from(err: fingerlink_core::Error) -> Self {
        Self::Hardware(HardwareError::Protocol(err))
    }
}
