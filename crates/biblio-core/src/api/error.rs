use std::fmt;

use biblio_types::ApiEnvelope;
use serde_json::Value;

/// Message used when a response body is present but says nothing useful.
const GENERIC_FAILURE: &str = "Request failed";

/// Categories of request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// The server rejected the session (HTTP 401).
    Unauthorized,
    /// Any other non-success HTTP status.
    HttpStatus,
    /// The request never produced a response (connect, timeout, TLS).
    Transport,
    /// The envelope reported `success == false`.
    Envelope,
    /// The response body did not have the expected shape.
    Parse,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::Unauthorized => write!(f, "unauthorized"),
            ApiErrorKind::HttpStatus => write!(f, "http_status"),
            ApiErrorKind::Transport => write!(f, "transport"),
            ApiErrorKind::Envelope => write!(f, "envelope"),
            ApiErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// A failed call, reduced to one human-readable message.
///
/// `Display` prints only `message`; raw transport errors never reach callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Builds an error from a non-success response.
    pub fn from_response(status: u16, body: &str) -> Self {
        let kind = if status == 401 {
            ApiErrorKind::Unauthorized
        } else {
            ApiErrorKind::HttpStatus
        };
        let transport = format!("Request failed with status code {status}");
        Self {
            kind,
            status: Some(status),
            message: normalize_error_message(body, &transport),
        }
    }

    pub fn transport(err: &reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "Request timed out".to_string()
        } else if err.is_connect() {
            "Could not connect to the server".to_string()
        } else {
            GENERIC_FAILURE.to_string()
        };
        Self::new(ApiErrorKind::Transport, message)
    }

    pub fn envelope(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Envelope, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Parse, message)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind == ApiErrorKind::Unauthorized
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

/// Result type for request pipeline operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Picks the message to surface for an error response.
///
/// Precedence: a non-empty `message` field, then `error`, then the body
/// itself when it is a plain string, then `transport`. A JSON object that
/// carries neither field yields a generic message.
pub fn normalize_error_message(body: &str, transport: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return transport.to_string();
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => ["message", "error"]
            .iter()
            .find_map(|key| {
                map.get(*key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
            .unwrap_or(GENERIC_FAILURE)
            .to_string(),
        Ok(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Ok(Value::Null) => transport.to_string(),
        Ok(_) => GENERIC_FAILURE.to_string(),
        Err(_) => body.to_string(),
    }
}

/// Unwraps the `{ success, data, message }` envelope.
pub trait EnvelopeExt<T> {
    /// Returns `data` on success, otherwise the server's message or
    /// `fallback`.
    ///
    /// # Errors
    /// [`ApiErrorKind::Envelope`] when `success` is false and
    /// [`ApiErrorKind::Parse`] when a successful envelope carries no data.
    fn into_data(self, fallback: &str) -> ApiResult<T>;
}

impl<T> EnvelopeExt<T> for ApiEnvelope<T> {
    fn into_data(self, fallback: &str) -> ApiResult<T> {
        if !self.success {
            let message = self.failure_message().unwrap_or(fallback).to_string();
            return Err(ApiError::envelope(message));
        }
        self.data
            .ok_or_else(|| ApiError::parse("Response did not include data"))
    }
}
