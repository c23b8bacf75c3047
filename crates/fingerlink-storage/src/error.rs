use thiserror::Error;

/// Errors from the remote identity store.
///
/// None of these are fatal to the device: engines log them and fall back to
/// the behaviour documented for an unreachable store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Store could not be reached or refused the operation
    #[error("Remote store unavailable: {0}")]
    Unavailable(String),

    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("Request to {path} failed with status {status}")]
    Status { path: String, status: u16 },

    /// Document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Document exists but does not have the expected shape
    #[error("Invalid document at {path}: {message}")]
    InvalidDocument { path: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StorageError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn invalid_document(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_document_display() {
        let error = StorageError::invalid_document("indices_sensor", "expected an object");
        assert_eq!(
            error.to_string(),
            "Invalid document at indices_sensor: expected an object"
        );
    }

    #[test]
    fn test_status_display() {
        let error = StorageError::Status {
            path: "usuarios/u1".to_string(),
            status: 401,
        };
        assert_eq!(
            error.to_string(),
            "Request to usuarios/u1 failed with status 401"
        );
    }
}
