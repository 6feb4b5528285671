//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("Credential broker request failed: {0}")]
    CredentialsFailed(String),

    #[error("Credential broker rejected request (code {code}): {message}")]
    BrokerRejected { code: i64, message: String },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn credentials_failed(msg: impl Into<String>) -> Self {
        Self::CredentialsFailed(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    /// Whether the failure happened while obtaining credentials.
    pub fn is_credentials_error(&self) -> bool {
        matches!(
            self,
            Self::CredentialsFailed(_) | Self::BrokerRejected { .. } | Self::Http(_) | Self::Json(_)
        )
    }
}
