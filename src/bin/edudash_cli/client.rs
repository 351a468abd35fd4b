#![deny(clippy::all, clippy::pedantic)]

use std::sync::Arc;

use edudash::api::catalogue;
use edudash::cache::QueryClient;
use edudash::config::{LoadError, Settings};
use edudash::error::{ApiError, RegistryError};
use edudash::telemetry::TelemetryError;
use edudash::transport::HttpTransport;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("endpoint catalogue is inconsistent: {0}")]
    Registry(#[from] RegistryError),
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to render output: {0}")]
    Output(String),
}

/// Everything a handler needs: one cache client shared by all calls of a
/// command, so follow-up reads observe the invalidations of earlier writes.
#[derive(Clone)]
pub struct Ctx {
    pub client: QueryClient,
}

impl Ctx {
    pub fn new(settings: &Settings) -> Result<Self, CliError> {
        let transport =
            HttpTransport::new(settings.api.base_url.clone(), settings.api.request_timeout)?;
        let client = QueryClient::new(catalogue()?, Arc::new(transport), settings.cache.clone());
        Ok(Self { client })
    }
}
