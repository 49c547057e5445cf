//! Error types for the Lodgen request client
//!
//! Every failure surfaced by this crate belongs to a closed taxonomy so that
//! callers can branch on the classification without string matching. Each
//! variant carries the server-provided message when one was present, falling
//! back to a default human-readable message per class.

use std::time::Duration;
use thiserror::Error;

/// A single field-level validation failure, with the dot-joined path to the
/// offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dot-joined path to the field (e.g. `address.zip`)
    pub path: String,
    /// Human-readable description of the violation
    pub message: String,
}

impl FieldError {
    pub fn new<P, M>(path: P, message: M) -> Self
    where
        P: Into<String>,
        M: Into<String>,
    {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Classification of request failures
///
/// Mirrors the variants of [`Error`] without their payloads, for cheap
/// comparison in match arms and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    AuthExpired,
    Forbidden,
    NotFound,
    RateLimited,
    ServerError,
    ValidationFailed,
    NetworkFailure,
    Unknown,
}

impl ErrorKind {
    /// Default human-readable message used when the server supplies none
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::AuthExpired => "Your session has expired. Please sign in again.",
            ErrorKind::Forbidden => "You do not have permission to perform this action.",
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::RateLimited => "Too many requests. Please slow down and try again.",
            ErrorKind::ServerError => "The server encountered an error. Please try again later.",
            ErrorKind::ValidationFailed => "The request contained invalid data.",
            ErrorKind::NetworkFailure => "A network error occurred. Check your connection.",
            ErrorKind::Unknown => "The request failed unexpectedly.",
        }
    }
}

/// Main error type for request-client operations
#[derive(Error, Debug)]
pub enum Error {
    /// Access token missing, rejected, or unrefreshable
    #[error("authentication expired: {message}")]
    AuthExpired { message: String },

    /// Authenticated but not allowed (403)
    #[error("forbidden: {message}")]
    Forbidden { message: String },

    /// Resource does not exist (404)
    #[error("not found: {message}")]
    NotFound { message: String },

    /// Rejected by the client-side limiter or by the server (429)
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        /// Suggested wait before the next attempt, when known
        retry_after: Option<Duration>,
    },

    /// 5xx responses
    #[error("server error: {message}")]
    ServerError {
        message: String,
        status: Option<u16>,
    },

    /// Request or response payload rejected by a schema
    #[error("validation failed: {message}")]
    ValidationFailed {
        message: String,
        errors: Vec<FieldError>,
    },

    /// Transport-level failure (DNS, connection reset, unparseable body)
    #[error("network failure: {message}")]
    NetworkFailure {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Non-2xx status outside the classified set
    #[error("request failed: {message}")]
    Unknown {
        message: String,
        status: Option<u16>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify a non-2xx HTTP status, preferring the server-provided message
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        let msg = |kind: ErrorKind| {
            message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| kind.default_message().to_string())
        };
        match status {
            401 => Error::AuthExpired {
                message: msg(ErrorKind::AuthExpired),
            },
            403 => Error::Forbidden {
                message: msg(ErrorKind::Forbidden),
            },
            404 => Error::NotFound {
                message: msg(ErrorKind::NotFound),
            },
            429 => Error::RateLimited {
                message: msg(ErrorKind::RateLimited),
                retry_after: None,
            },
            500..=599 => Error::ServerError {
                message: msg(ErrorKind::ServerError),
                status: Some(status),
            },
            _ => Error::Unknown {
                message: msg(ErrorKind::Unknown),
                status: Some(status),
            },
        }
    }

    /// Build a `ValidationFailed` error from itemized field errors
    pub fn validation(errors: Vec<FieldError>) -> Self {
        let message = if errors.is_empty() {
            ErrorKind::ValidationFailed.default_message().to_string()
        } else {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        };
        Error::ValidationFailed { message, errors }
    }

    /// Build a `NetworkFailure` from any transport-level error
    pub fn network<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::NetworkFailure {
            message: message.into(),
            source: Some(anyhow::Error::new(source)),
        }
    }

    /// The classification of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::AuthExpired { .. } => ErrorKind::AuthExpired,
            Error::Forbidden { .. } => ErrorKind::Forbidden,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::ServerError { .. } => ErrorKind::ServerError,
            Error::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Error::NetworkFailure { .. } => ErrorKind::NetworkFailure,
            Error::Unknown { .. } => ErrorKind::Unknown,
        }
    }

    /// The human-readable message carried by this error
    pub fn message(&self) -> &str {
        match self {
            Error::AuthExpired { message }
            | Error::Forbidden { message }
            | Error::NotFound { message }
            | Error::RateLimited { message, .. }
            | Error::ServerError { message, .. }
            | Error::ValidationFailed { message, .. }
            | Error::NetworkFailure { message, .. }
            | Error::Unknown { message, .. } => message,
        }
    }
}
