//! Transport boundary between the orchestrator and the backend.
//!
//! The orchestrator only depends on [`Transport`]; [`HttpTransport`] is the
//! production implementation. Envelope handling lives here so every
//! transport reports payloads the same way.

mod http;

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use edudash_api_types::Envelope;

use crate::error::ApiError;

pub use http::HttpTransport;

/// A fully described backend request, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Append every field of a serializable parameter struct as query pairs.
    ///
    /// `null` fields are skipped, arrays become repeated keys and nested
    /// objects are sent as JSON text.
    pub fn with_params<P: Serialize>(mut self, params: &P) -> Result<Self, serde_json::Error> {
        if let Value::Object(map) = serde_json::to_value(params)? {
            for (key, value) in map {
                push_pair(&mut self.query, &key, value);
            }
        }
        Ok(self)
    }

    pub fn with_body<B: Serialize>(mut self, body: &B) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

fn push_pair(query: &mut Vec<(String, String)>, key: &str, value: Value) {
    match value {
        Value::Null => {}
        Value::String(text) => query.push((key.to_string(), text)),
        Value::Array(values) => {
            for value in values {
                push_pair(query, key, value);
            }
        }
        Value::Object(_) => query.push((key.to_string(), value.to_string())),
        other => query.push((key.to_string(), other.to_string())),
    }
}

/// Successful (2xx) response as seen by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform `request`. Non-2xx responses must be reported as
    /// [`ApiError::Http`], connection failures as [`ApiError::Transport`].
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, ApiError>;
}

/// Unwrap the `{success, message, data}` envelope.
///
/// Bodies that are not envelopes are passed through as the payload so that
/// endpoints returning bare JSON still work. A `null` payload is reported as
/// absent.
pub fn open_envelope(response: TransportResponse) -> Result<Option<Value>, ApiError> {
    let TransportResponse { status, body } = response;

    let is_envelope = body
        .as_object()
        .is_some_and(|object| object.get("success").is_some_and(Value::is_boolean));
    if !is_envelope {
        return Ok((!body.is_null()).then_some(body));
    }

    let envelope: Envelope = serde_json::from_value(body).map_err(|err| ApiError::Decode {
        endpoint: String::from("<envelope>"),
        message: err.to_string(),
    })?;

    if !envelope.success {
        return Err(ApiError::Rejected {
            status,
            message: envelope.message,
        });
    }

    Ok(envelope.data)
}
