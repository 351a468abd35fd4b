use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use crate::error::ApiError;

use super::{RequestDescriptor, Transport, TransportResponse};

/// Credentialed JSON transport over `reqwest`.
///
/// Cookies set by the backend are kept in the client's cookie store and sent
/// with every subsequent request. Each call is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|err| ApiError::transport(err.to_string()))?;

        Ok(Self {
            client,
            base: normalise_base(base),
            timeout,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("edudash/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|err| ApiError::transport(format!("invalid request path `{path}`: {err}")))
    }

    async fn perform(&self, request: &RequestDescriptor) -> Result<TransportResponse, ApiError> {
        let mut url = self.url(&request.path)?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        let mut builder = self.client.request(request.method.clone(), url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        let body = parse_body(&bytes);

        debug!(
            method = %request.method,
            path = %request.path,
            status = status.as_u16(),
            "Backend responded"
        );

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                data: body,
            });
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<TransportResponse, ApiError> {
        match tokio::time::timeout(self.timeout, self.perform(request)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                after: self.timeout,
            }),
        }
    }
}

fn normalise_base(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.set_query(None);
    base
}

fn parse_body(bytes: &[u8]) -> Value {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    ApiError::transport(err.to_string())
}
