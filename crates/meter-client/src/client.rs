//! Reading service HTTP client implementation

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::error::{MeterClientError, Result};
use crate::types::*;

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Reading service REST client
#[derive(Debug, Clone)]
pub struct MeterClient {
    client: Client,
    base_url: Url,
}

impl MeterClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the service (e.g., "http://localhost:5000")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with custom timeouts
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get a reference to the underlying HTTP client.
    ///
    /// Useful for hand-built requests (custom multipart forms, raw bodies).
    pub fn http_client(&self) -> &Client {
        &self.client
    }

    /// Absolute URL for a service path
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// Check server health
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<String> {
        let url = self.url("/health")?;
        let response = self.client.get(url).send().await?;

        if response.status().is_success() {
            Ok(response.text().await?)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Upload a meter photo and return the decoded reading
    #[instrument(skip(self, data), fields(size = data.len()))]
    pub async fn upload_image(&self, file_name: &str, data: Vec<u8>) -> Result<UploadResponse> {
        let url = self.url("/upload")?;
        debug!("Uploading {} to {}", file_name, url);

        let form = Form::new().part("image", Part::bytes(data).file_name(file_name.to_string()));
        let response = self.client.post(url).multipart(form).send().await?;

        if response.status().is_success() {
            response
                .json()
                .await
                .map_err(|e| MeterClientError::ParseError(e.to_string()))
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Turn an error response into a [`MeterClientError`]
    async fn extract_error(&self, response: reqwest::Response) -> MeterClientError {
        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return MeterClientError::server_error(status, e.to_string()),
        };

        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => MeterClientError::ServerError {
                status,
                message: body.error,
                reading: body.reading,
            },
            Err(_) => MeterClientError::server_error(status, text),
        }
    }
}
