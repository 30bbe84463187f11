//! Error types for the remote data gateway
//!
//! The gateway is the only place where failures are classified:
//! - Transport failures (no response) become `Network` or `Timeout`
//! - HTTP statuses map onto the fixed [`ErrorKind`] taxonomy
//! - Backend error bodies contribute `detail`, `error_code` and field errors
//!
//! Callers above the gateway never reinterpret the kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Result alias for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Machine-readable failure class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// No response reached us
    Network,
    /// The request ran out of time
    Timeout,
    /// Session invalid (401/403)
    Auth,
    /// Input rejected; carries field errors
    Validation,
    /// Token invalid or expired
    NotFound,
    /// Backend asked us to slow down
    RateLimit,
    /// Backend failed
    Server,
}

impl ErrorKind {
    /// Wire code (`"NETWORK"`, `"NOT_FOUND"`, ...)
    #[inline]
    #[must_use]
    pub fn as_code(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Auth => "AUTH",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::Server => "SERVER",
        }
    }

    /// Whether a caller may retry the same request unchanged
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimit | ErrorKind::Server
        )
    }

    /// Whether the guest session is over (re-authentication required)
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, ErrorKind::Auth | ErrorKind::NotFound)
    }

    /// Classify an HTTP error status
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => ErrorKind::Validation,
            401 | 403 => ErrorKind::Auth,
            404 | 410 => ErrorKind::NotFound,
            408 | 504 => ErrorKind::Timeout,
            429 => ErrorKind::RateLimit,
            _ => ErrorKind::Server,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

/// Structured gateway failure, serializable as the UI error surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {detail}")]
pub struct GatewayError {
    /// Failure class
    pub kind: ErrorKind,
    /// Human-readable message
    pub detail: String,
    /// Backend code when supplied, otherwise the kind's code
    pub error_code: String,
    /// HTTP status, when a response was received
    pub status_code: Option<u16>,
    /// Field → message map for validation failures
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
}

impl GatewayError {
    /// Create error of a kind
    #[must_use]
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            error_code: kind.as_code().to_string(),
            status_code: None,
            errors: BTreeMap::new(),
        }
    }

    /// No response
    #[must_use]
    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, detail)
    }

    /// Timed out
    #[must_use]
    pub fn timeout(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, detail)
    }

    /// Session rejected
    #[must_use]
    pub fn auth(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, detail).with_status(401)
    }

    /// Unknown or expired token
    #[must_use]
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, detail).with_status(404)
    }

    /// Input rejected with per-field messages
    #[must_use]
    pub fn validation<K, V>(detail: impl Into<String>, errors: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut err = Self::new(ErrorKind::Validation, detail).with_status(422);
        err.errors = errors
            .into_iter()
            .map(|(field, message)| (field.into(), message.into()))
            .collect();
        err
    }

    /// Too many requests
    #[must_use]
    pub fn rate_limited(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::RateLimit, detail).with_status(429)
    }

    /// Backend failure
    #[must_use]
    pub fn server(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, detail)
    }

    /// Attach HTTP status
    #[inline]
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status_code = Some(status);
        self
    }

    /// Override the backend error code
    #[inline]
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = code.into();
        self
    }

    /// See [`ErrorKind::is_retryable`]
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    /// See [`ErrorKind::is_terminal`]
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// Build from an error response (status outside 2xx plus raw body)
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        let kind = ErrorKind::from_status(status);
        let parsed = serde_json::from_str::<ErrorBody>(body).ok();

        let mut err = Self::new(kind, default_detail(status)).with_status(status);
        let Some(parsed) = parsed else {
            let trimmed = body.trim();
            if !trimmed.is_empty() && trimmed.len() <= 512 {
                err.detail = trimmed.to_string();
            }
            return err;
        };

        match parsed.detail {
            Some(Value::String(detail)) => err.detail = detail,
            Some(Value::Array(items)) => {
                err.errors.extend(items.iter().filter_map(field_error_from_item));
                err.detail = "request validation failed".to_string();
            }
            _ => {}
        }
        if let Some(code) = parsed.error_code.filter(|code| !code.trim().is_empty()) {
            err.error_code = code;
        }
        if let Some(errors) = parsed.errors {
            for (field, message) in errors {
                if let Some(message) = message_text(&message) {
                    err.errors.insert(field, message);
                }
            }
        }
        err
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, Value>>,
}

fn default_detail(status: u16) -> String {
    match ErrorKind::from_status(status) {
        ErrorKind::Validation => "request validation failed".to_string(),
        ErrorKind::Auth => "session is no longer valid".to_string(),
        ErrorKind::NotFound => "guest link is invalid or has expired".to_string(),
        ErrorKind::Timeout => "request timed out".to_string(),
        ErrorKind::RateLimit => "too many requests".to_string(),
        _ => format!("server error (status {status})"),
    }
}

/// `{"loc": ["body", "field"], "msg": "..."}` → `("field", "...")`
fn field_error_from_item(item: &Value) -> Option<(String, String)> {
    let field = item.get("loc")?.as_array()?.last().map(|loc| match loc {
        Value::String(name) => name.clone(),
        other => other.to_string(),
    })?;
    let message = item.get("msg").and_then(Value::as_str)?.to_string();
    Some((field, message))
}

fn message_text(value: &Value) -> Option<String> {
    match value {
        Value::String(message) => Some(message.clone()),
        Value::Array(messages) => {
            let joined = messages
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
