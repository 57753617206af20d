use futures::StreamExt as _;
use reqwest::StatusCode;
use tracing::debug;

use crate::errors::{ClientError, TransportError};

use super::{ByteStream, ClientConfig, Endpoint, HealthStatus, QueryTransport};

/// HTTP transport over `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl ReqwestTransport {
    /// Creates a transport from explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        // No overall timeout: the stream stays open for as long as the service
        // keeps sending.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ClientError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a transport configured from `ASKDB_*` environment variables.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    /// Returns the configuration this transport was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[derive(serde::Serialize)]
struct QueryBody<'a> {
    question: &'a str,
}

#[async_trait::async_trait]
impl QueryTransport for ReqwestTransport {
    async fn probe(&self) -> Result<HealthStatus, TransportError> {
        let response = self
            .client
            .get(self.config.health_url())
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: String::new(),
            });
        }
        response
            .json::<HealthStatus>()
            .await
            .map_err(|e| TransportError::Network(format!("invalid health payload: {e}")))
    }

    async fn open_stream(
        &self,
        endpoint: Endpoint,
        question: &str,
    ) -> Result<ByteStream, TransportError> {
        let url = self.config.query_url(endpoint);
        debug!(%endpoint, url = %url, "posting query");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(&QueryBody { question })
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Err(TransportError::NoBody);
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Network(e.to_string())));
        Ok(Box::pin(stream))
    }
}
