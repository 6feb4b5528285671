//! Generation client error types.

use thiserror::Error;

pub type GenAiResult<T> = Result<T, GenAiError>;

/// Message fragments that mark a rate-limit or overload failure.
const TRANSIENT_SIGNATURES: &[&str] = &[
    "resource_exhausted",
    "unavailable",
    "rate limit",
    "rate-limit",
    "overloaded",
    "429",
    "503",
];

#[derive(Debug, Error)]
pub enum GenAiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Service rejected request (code {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response contained no content")]
    EmptyResponse,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GenAiError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build from a non-success HTTP status and its body.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: body.into(),
        }
    }

    /// Rate-limit or service-unavailable failures, by status code or message.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, message } => {
                matches!(status, 429 | 503) || is_transient_signature(message)
            }
            Self::Rejected { code, message } => {
                matches!(code, 429 | 503) || is_transient_signature(message)
            }
            Self::Network(e) => is_transient_signature(&e.to_string()),
            _ => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Whether `text` carries a rate-limit or service-unavailable signature.
pub fn is_transient_signature(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    TRANSIENT_SIGNATURES.iter().any(|sig| lower.contains(sig))
}
