//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use axum::http::StatusCode;
use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message returned for both "unknown tool" and "not permitted" when
/// authorization is enabled. Callers must not be able to tell them apart.
pub const FORBIDDEN_MESSAGE: &str = "Tool either does not exist or insufficient permissions";

/// Main error enum for the tool server.
#[derive(Error, Debug)]
pub enum Error {
    /// Payload or request shape errors (map to 400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Uniform authorization failure (map to 403). Never reveals whether the
    /// tool exists.
    #[error("{}", FORBIDDEN_MESSAGE)]
    Forbidden,

    /// Tool not found while authorization is disabled (map to 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Caller credentials rejected by the authenticator (map to 401).
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// External auth service failure. Fatal for the call, never retried
    /// (map to 502).
    #[error("authentication error: {0}")]
    Authentication(String),

    /// A tool with this id is already registered.
    #[error("tool {0} already exists")]
    DuplicateRegistration(String),

    /// The tool's input schema is not an object schema.
    #[error("unsupported tool shape: {0}")]
    UnsupportedShape(String),

    /// Internal errors (map to 500). The message is safe to show to callers.
    #[error("internal error: {0}")]
    Internal(String),

    /// Request exceeded the server-side timeout (map to 408).
    #[error("timeout: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound HTTP errors (remote catalog, auth service).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Convert to an HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Error::Authentication(_) | Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Error::DuplicateRegistration(_)
            | Error::UnsupportedShape(_)
            | Error::Internal(_)
            | Error::Serialization(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to a remote caller.
    ///
    /// Transport-level failures are collapsed to a generic message; their
    /// details only go to the logs.
    pub fn public_message(&self) -> String {
        match self {
            Error::Validation(msg)
            | Error::NotFound(msg)
            | Error::Unauthenticated(msg)
            | Error::Timeout(msg) => msg.clone(),
            Error::Forbidden => FORBIDDEN_MESSAGE.to_string(),
            Error::Authentication(_) | Error::Http(_) => {
                "Authentication service unavailable".to_string()
            }
            Error::Internal(msg) => msg.clone(),
            Error::DuplicateRegistration(_)
            | Error::UnsupportedShape(_)
            | Error::Serialization(_)
            | Error::Io(_) => "Internal error".to_string(),
        }
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    pub fn duplicate(tool_id: impl Into<String>) -> Self {
        Self::DuplicateRegistration(tool_id.into())
    }

    pub fn unsupported_shape(msg: impl Into<String>) -> Self {
        Self::UnsupportedShape(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}
