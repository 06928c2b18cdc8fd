// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types surfaced to callers of the session manager.
//!
//! Every variant displays as a single human-readable message, so
//! presentation code can show `err.to_string()` without inspecting the
//! underlying transport failure.

use serde::Deserialize;

use crate::store::StorageError;

/// Fallback message when neither the backend nor the transport said anything useful.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// Session manager error type.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Backend rejected the login pair, OAuth exchange or presented token.
    #[error("{0}")]
    InvalidCredentials(String),

    /// Backend rejected registration fields.
    #[error("{0}")]
    ValidationFailed(String),

    /// No local token; detected without a network round trip.
    #[error("Not authenticated")]
    Unauthenticated,

    /// Any other non-success response from the backend.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// No response was received.
    #[error("{0}")]
    Network(String),

    /// A success response whose body did not match the expected shape.
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// Local credential persistence failed.
    #[error("Session storage error: {0}")]
    Storage(String),
}

impl AuthError {
    /// HTTP status attached to the failure, if the backend answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        AuthError::Storage(err.to_string())
    }
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Error produced by the transport adapter before per-operation mapping.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The backend answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// No response was received (connect, timeout, TLS, body read).
    #[error("{0}")]
    Network(String),

    /// A success response whose body could not be decoded.
    #[error("{0}")]
    Decode(String),
}

impl TransportError {
    /// Whether the backend rejected the caller's authority.
    pub fn is_authority_rejection(&self) -> bool {
        matches!(self, TransportError::Status { status: 401, .. })
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = err.to_string();
        if message.is_empty() {
            TransportError::Network(GENERIC_ERROR_MESSAGE.to_string())
        } else {
            TransportError::Network(message)
        }
    }
}

/// FastAPI-style error body: `{"detail": "..."}` or a list of field errors.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Message(String),
    Fields(Vec<FieldDetail>),
}

#[derive(Debug, Deserialize)]
struct FieldDetail {
    msg: String,
}

/// Pick the message shown to the user for a failed response.
///
/// Uses the backend's `detail` if present, else a transport-style message
/// naming the status code.
pub fn normalize_error_message(status: u16, body: &str) -> String {
    if let Some(detail) = detail_message(body) {
        return detail;
    }
    if status == 0 {
        return GENERIC_ERROR_MESSAGE.to_string();
    }
    format!("Request failed with status code {}", status)
}

fn detail_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let message = match parsed.detail? {
        ErrorDetail::Message(msg) => msg,
        ErrorDetail::Fields(fields) => fields
            .into_iter()
            .map(|f| f.msg)
            .collect::<Vec<_>>()
            .join("; "),
    };
    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}
