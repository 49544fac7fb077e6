//! The response envelope every REST call is wrapped in.

use serde::{Deserialize, Serialize};

/// `{ success, data, message, errors? }` as returned by the catalog service.
///
/// `data` is only meaningful when `success` is true; failed calls commonly
/// send `null` or omit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T> ApiEnvelope<T> {
    /// Builds a successful envelope around `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: String::new(),
            errors: None,
        }
    }

    /// Builds a failed envelope carrying `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: message.into(),
            errors: None,
        }
    }

    /// The server-provided failure message, if it sent a non-blank one.
    pub fn failure_message(&self) -> Option<&str> {
        let trimmed = self.message.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}
