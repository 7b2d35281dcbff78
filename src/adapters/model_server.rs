//! HTTP client for the model server.
//!
//! Endpoints:
//! - `POST /predictions/ts_test` with `{"text": ...}`
//! - `GET /predictions_cached/index.json`
//! - `GET /predictions_cached/<id>.json`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::domain::{PredictionError, TransportError};
use crate::library::Book;

use super::{PredictionBody, PredictionService};

/// Default request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Model server HTTP client
pub struct ModelServerClient {
    /// Base URL without trailing slash, e.g. `http://localhost:8080`
    base_url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl ModelServerClient {
    /// Create a client with the default timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(connection_error)?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Build endpoint URL
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T, PredictionError> {
        let response = check_status(response)?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, PredictionError> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(connection_error)?;
        Self::json_body(response).await
    }
}

/// Map a non-2xx response to the transport error shown to users
fn check_status(response: Response) -> Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(status_error(status))
    }
}

pub fn status_error(status: StatusCode) -> TransportError {
    TransportError::Status {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or("").to_string(),
    }
}

fn connection_error(err: reqwest::Error) -> TransportError {
    TransportError::Connection(err.to_string())
}

#[async_trait]
impl PredictionService for ModelServerClient {
    fn name(&self) -> &str {
        "model-server"
    }

    #[instrument(skip(self, text), fields(chars = text.chars().count()))]
    async fn predict(&self, text: &str) -> Result<PredictionBody, PredictionError> {
        let url = self.url("predictions/ts_test");
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(connection_error)?;

        Self::json_body(response).await
    }

    #[instrument(skip(self))]
    async fn library_index(&self) -> Result<Vec<Book>, PredictionError> {
        self.get("predictions_cached/index.json").await
    }

    #[instrument(skip(self))]
    async fn precomputed(&self, id: &str) -> Result<PredictionBody, PredictionError> {
        self.get(&format!("predictions_cached/{}.json", id)).await
    }
}
