use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;

use crate::cache::EndpointKind;

/// Failure surfaced by the orchestrator to queries (in state) and mutation
/// callers (as `Err`).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },
    #[error("server responded with status {status}")]
    Http { status: u16, data: Value },
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("endpoint `{endpoint}` returned no payload")]
    MissingPayload { endpoint: String },
    #[error("failed to decode `{endpoint}` response: {message}")]
    Decode { endpoint: String, message: String },
    #[error("invalid arguments for `{endpoint}`: {message}")]
    InvalidArgs { endpoint: String, message: String },
    #[error("unknown endpoint `{name}`")]
    UnknownEndpoint { name: String },
    #[error("endpoint `{name}` is not a {expected}")]
    WrongKind { name: String, expected: EndpointKind },
    #[error("request was cancelled before it settled")]
    Cancelled,
}

impl ApiError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// HTTP status attached to the failure; `None` for transport-level errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Structured body of the failure.
    ///
    /// For HTTP errors this is the backend's error document (usually
    /// `{message}` or `{errors: [...]}`); otherwise a synthesized `{message}`.
    pub fn data(&self) -> Value {
        match self {
            ApiError::Http { data, .. } => data.clone(),
            other => json!({ "message": other.to_string() }),
        }
    }

    /// Human-readable message, preferring the backend's own wording.
    pub fn message(&self) -> String {
        match self {
            ApiError::Http { data, .. } => data
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| self.to_string()),
            ApiError::Rejected { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("endpoint `{name}` is already defined")]
    DuplicateEndpoint { name: String },
}
