//! Endpoint definitions and the registry that holds them.
//!
//! Definitions are stored type-erased over `serde_json::Value`; the typed
//! `define_*` helpers decode arguments and encode results at the boundary.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::{ApiError, RegistryError};
use crate::transport::RequestDescriptor;

use super::keys::Tag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Query,
    Mutation,
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointKind::Query => f.write_str("query"),
            EndpointKind::Mutation => f.write_str("mutation"),
        }
    }
}

/// Failure of a response transform; the orchestrator attaches the endpoint name.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("response carried no payload")]
    MissingPayload,
    #[error("{0}")]
    Decode(String),
}

impl From<serde_json::Error> for TransformError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

type RequestFn = dyn Fn(&Value) -> Result<RequestDescriptor, ApiError> + Send + Sync;
type TransformFn = dyn Fn(&Value, Option<Value>) -> Result<Value, TransformError> + Send + Sync;
type TagFn = dyn Fn(&Value, Option<&Value>) -> Vec<Tag> + Send + Sync;

/// Tags a query provides or a mutation invalidates.
pub enum TagSource {
    None,
    Static(Vec<Tag>),
    /// Computed from the arguments and, when the call succeeded, the
    /// transformed result.
    Dynamic(Box<TagFn>),
}

impl TagSource {
    pub fn fixed(tags: impl IntoIterator<Item = Tag>) -> Self {
        Self::Static(tags.into_iter().collect())
    }

    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&Value, Option<&Value>) -> Vec<Tag> + Send + Sync + 'static,
    {
        Self::Dynamic(Box::new(f))
    }

    pub fn resolve(&self, args: &Value, result: Option<&Value>) -> Vec<Tag> {
        match self {
            TagSource::None => Vec::new(),
            TagSource::Static(tags) => tags.clone(),
            TagSource::Dynamic(f) => f(args, result),
        }
    }
}

impl fmt::Debug for TagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSource::None => f.write_str("None"),
            TagSource::Static(tags) => f.debug_tuple("Static").field(tags).finish(),
            TagSource::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A named remote operation.
pub struct EndpointDefinition {
    name: String,
    kind: EndpointKind,
    request: Box<RequestFn>,
    transform: Box<TransformFn>,
    tags: TagSource,
}

impl EndpointDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    pub fn tags(&self) -> &TagSource {
        &self.tags
    }

    pub fn build_request(&self, args: &Value) -> Result<RequestDescriptor, ApiError> {
        (self.request)(args)
    }

    /// Map the unwrapped payload of a call made with `args` to its result.
    pub fn transform(&self, args: &Value, payload: Option<Value>) -> Result<Value, ApiError> {
        (self.transform)(args, payload).map_err(|err| match err {
            TransformError::MissingPayload => ApiError::MissingPayload {
                endpoint: self.name.clone(),
            },
            TransformError::Decode(message) => ApiError::Decode {
                endpoint: self.name.clone(),
                message,
            },
        })
    }
}

impl fmt::Debug for EndpointDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDefinition")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// Registry of endpoint definitions, keyed by unique name.
#[derive(Debug, Default)]
pub struct Api {
    endpoints: HashMap<String, Arc<EndpointDefinition>>,
}

impl Api {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a read endpoint.
    ///
    /// `request` maps decoded arguments to a request, `transform` maps the
    /// raw arguments and the unwrapped envelope payload to the cached data,
    /// `provides` labels the cached entry.
    pub fn define_query<A, T, R, F>(
        &mut self,
        name: &str,
        request: R,
        transform: F,
        provides: TagSource,
    ) -> Result<&mut Self, RegistryError>
    where
        A: DeserializeOwned,
        T: Serialize,
        R: Fn(A) -> Result<RequestDescriptor, serde_json::Error> + Send + Sync + 'static,
        F: Fn(&Value, Option<Value>) -> Result<T, TransformError> + Send + Sync + 'static,
    {
        self.define(name, EndpointKind::Query, request, transform, provides)
    }

    /// Register a write endpoint whose success invalidates `invalidates`.
    pub fn define_mutation<A, T, R, F>(
        &mut self,
        name: &str,
        request: R,
        transform: F,
        invalidates: TagSource,
    ) -> Result<&mut Self, RegistryError>
    where
        A: DeserializeOwned,
        T: Serialize,
        R: Fn(A) -> Result<RequestDescriptor, serde_json::Error> + Send + Sync + 'static,
        F: Fn(&Value, Option<Value>) -> Result<T, TransformError> + Send + Sync + 'static,
    {
        self.define(name, EndpointKind::Mutation, request, transform, invalidates)
    }

    fn define<A, T, R, F>(
        &mut self,
        name: &str,
        kind: EndpointKind,
        request: R,
        transform: F,
        tags: TagSource,
    ) -> Result<&mut Self, RegistryError>
    where
        A: DeserializeOwned,
        T: Serialize,
        R: Fn(A) -> Result<RequestDescriptor, serde_json::Error> + Send + Sync + 'static,
        F: Fn(&Value, Option<Value>) -> Result<T, TransformError> + Send + Sync + 'static,
    {
        if self.endpoints.contains_key(name) {
            return Err(RegistryError::DuplicateEndpoint {
                name: name.to_string(),
            });
        }

        let endpoint = name.to_string();
        let request = move |args: &Value| -> Result<RequestDescriptor, ApiError> {
            let invalid = |err: serde_json::Error| ApiError::InvalidArgs {
                endpoint: endpoint.clone(),
                message: err.to_string(),
            };
            let decoded = A::deserialize(args).map_err(invalid)?;
            request(decoded).map_err(invalid)
        };
        let transform =
            move |args: &Value, payload: Option<Value>| -> Result<Value, TransformError> {
                let typed = transform(args, payload)?;
                Ok(serde_json::to_value(typed)?)
            };

        self.endpoints.insert(
            name.to_string(),
            Arc::new(EndpointDefinition {
                name: name.to_string(),
                kind,
                request: Box::new(request),
                transform: Box::new(transform),
                tags,
            }),
        );
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<EndpointDefinition>> {
        self.endpoints.get(name)
    }

    /// Look up `name`, checking that it is an endpoint of `kind`.
    pub fn resolve(
        &self,
        name: &str,
        kind: EndpointKind,
    ) -> Result<Arc<EndpointDefinition>, ApiError> {
        let definition = self.get(name).ok_or_else(|| ApiError::UnknownEndpoint {
            name: name.to_string(),
        })?;
        if definition.kind != kind {
            return Err(ApiError::WrongKind {
                name: name.to_string(),
                expected: kind,
            });
        }
        Ok(Arc::clone(definition))
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Endpoint names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.endpoints.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Transform decoding a required payload into `T`.
pub fn payload<T: DeserializeOwned>()
-> impl Fn(&Value, Option<Value>) -> Result<T, TransformError> + Send + Sync + 'static {
    |_args: &Value, payload: Option<Value>| {
        let payload = payload.ok_or(TransformError::MissingPayload)?;
        Ok(serde_json::from_value(payload)?)
    }
}

/// Transform accepting any payload, including none (reported as `null`).
pub fn acknowledged()
-> impl Fn(&Value, Option<Value>) -> Result<Value, TransformError> + Send + Sync + 'static {
    |_args: &Value, payload: Option<Value>| Ok(payload.unwrap_or(Value::Null))
}
