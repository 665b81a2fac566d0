//! Error types for alinas

use serde::Deserialize;
use thiserror::Error;

/// Result type alias using alinas Error
pub type Result<T> = std::result::Result<T, Error>;

/// API codes that mean the service is overloaded and the call may be repeated
const THROTTLING_CODES: &[&str] = &["ServiceUnavailable", "Rejected.Throttling"];

/// Error returned by the NAS management API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// HTTP status of the response
    #[serde(skip)]
    pub status: u16,
    #[serde(rename = "Code", default)]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "RequestId", default)]
    pub request_id: String,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "code: {}, {} (status {}, request id {})",
            self.code, self.message, self.status, self.request_id
        )
    }
}

impl ApiError {
    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        // A 500 that reports the service as already activated is final.
        if self.status == 500 && self.message.contains("已开通") {
            return false;
        }
        THROTTLING_CODES.contains(&self.code.as_str())
            || self.code.starts_with("Throttling")
            || (500..600).contains(&self.status)
    }
}

/// alinas error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("API error: {0}")]
    Api(ApiError),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Resource not found: {kind} with id {id}")]
    NotFound { kind: String, id: String },

    #[error("Invalid resource id {id:?}: expected {expected} parts separated by ':'")]
    InvalidResourceId { id: String, expected: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{action} still failing after {seconds}s: {last}")]
    RetryTimeout {
        action: String,
        seconds: u64,
        last: Box<Error>,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ApiError> for Error {
    fn from(e: ApiError) -> Self {
        Error::Api(e)
    }
}

impl Error {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Api(api) => api.is_retryable(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Innermost API error code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Api(api) => Some(api.code.as_str()),
            Error::RetryTimeout { last, .. } => last.code(),
            _ => None,
        }
    }

    /// Whether the API answered with one of `codes`
    pub fn is_expected(&self, codes: &[&str]) -> bool {
        self.code().map_or(false, |code| codes.contains(&code))
    }
}
