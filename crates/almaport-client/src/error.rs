//! Client error type shared across the session pipeline and resource calls.
//!
//! Backend error bodies come in two shapes, `{"detail": "..."}` and
//! `{"non_field_errors": ["..."]}` (plus field-keyed arrays from
//! validation). Normalization happens here, at the boundary, so callers
//! only ever see the tagged form.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of client errors for consistent error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorKind {
    /// Login rejected the supplied credentials
    InvalidCredentials,
    /// Session could not be recovered; stored tokens were purged
    SessionExpired,
    /// HTTP status error (4xx, 5xx) outside the handled refresh flow
    HttpStatus,
    /// Connection failure or request timeout
    Timeout,
    /// Failed to parse a response body
    Parse,
    /// Local failure (token store I/O, request building)
    Internal,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::InvalidCredentials => write!(f, "invalid_credentials"),
            ApiErrorKind::SessionExpired => write!(f, "session_expired"),
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Timeout => write!(f, "timeout"),
            ApiErrorKind::Parse => write!(f, "parse"),
            ApiErrorKind::Internal => write!(f, "internal"),
        }
    }
}

/// Structured client error with kind, display message and HTTP status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error category
    pub kind: ApiErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// HTTP status code, when the backend answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ApiError {
    /// Creates a new client error.
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    /// Creates an HTTP status error, extracting the backend's message
    /// from the error body when one is present.
    pub fn http_status(status: u16, body: &str) -> Self {
        let message =
            extract_backend_message(body).unwrap_or_else(|| format!("HTTP {status}"));
        Self {
            kind: ApiErrorKind::HttpStatus,
            message,
            status: Some(status),
        }
    }

    /// Creates a rejected-login error.
    pub fn invalid_credentials() -> Self {
        Self {
            kind: ApiErrorKind::InvalidCredentials,
            message: "Invalid email or password".to_string(),
            status: Some(401),
        }
    }

    /// Creates a terminal session error. The store has already been
    /// purged and the expiry signal broadcast by the time this surfaces.
    pub fn session_expired() -> Self {
        Self {
            kind: ApiErrorKind::SessionExpired,
            message: "Session expired, sign in again".to_string(),
            status: None,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    /// Creates a local (non-HTTP) error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Internal, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Self::timeout(format!("request failed: {err}"));
        }
        if err.is_decode() {
            return Self::parse(format!("decode response: {err}"));
        }
        Self::internal(format!("request failed: {err}"))
    }
}

/// Pulls a user-facing message out of a backend error body.
///
/// Checks `detail`, then `non_field_errors`, then the first field-keyed
/// array of messages. Returns None for non-JSON or unrecognized shapes.
fn extract_backend_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;

    if let Some(detail) = json.get("detail").and_then(Value::as_str) {
        return Some(detail.to_string());
    }

    if let Some(msg) = json
        .get("non_field_errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(Value::as_str)
    {
        return Some(msg.to_string());
    }

    // Field validation errors: {"email": ["Enter a valid email address."]}
    if let Some(object) = json.as_object() {
        for (field, value) in object {
            if let Some(msg) = value
                .as_array()
                .and_then(|errors| errors.first())
                .and_then(Value::as_str)
            {
                return Some(format!("{field}: {msg}"));
            }
        }
    }

    None
}

/// Result type for client operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
