//! Transport seam: connectivity probe, endpoint selection, and stream opening.
//!
//! The default implementation is [`ReqwestTransport`]; tests plug in their own
//! [`QueryTransport`] to feed scripted chunks.
mod config;
mod reqwest_transport;

use std::fmt;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::errors::TransportError;

pub use config::ClientConfig;
pub use reqwest_transport::ReqwestTransport;

/// Chunks of the response body as they arrive.
pub type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, TransportError>> + Send + 'static>>;

/// Which query endpoint a request is sent to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// The real pipeline backed by the database.
    Primary,
    /// The degraded endpoint used while the database is unreachable.
    Fallback,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        })
    }
}

/// Subset of the service health payload the client looks at.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize)]
pub struct HealthStatus {
    #[serde(default)]
    pub status: Option<String>,
    /// `"connected"` or `"disconnected: <reason>"`.
    #[serde(default)]
    pub database: Option<String>,
}

impl HealthStatus {
    /// True when the database field starts with `connected`, which covers
    /// values such as `connected_pool`.
    pub fn is_connected(&self) -> bool {
        self.database
            .as_deref()
            .is_some_and(|db| db.starts_with("connected"))
    }
}

/// Access to the remote query service.
#[async_trait::async_trait]
pub trait QueryTransport: Send + Sync {
    /// Fetches the service health status.
    ///
    /// Non-success responses are errors.
    async fn probe(&self) -> Result<HealthStatus, TransportError>;

    /// Posts `question` to `endpoint` and returns the response body stream.
    async fn open_stream(
        &self,
        endpoint: Endpoint,
        question: &str,
    ) -> Result<ByteStream, TransportError>;
}

/// Probes connectivity once and picks the endpoint for the next stream.
///
/// Probe failures are never surfaced; they only route to the fallback.
pub async fn select_endpoint(transport: &dyn QueryTransport) -> Endpoint {
    match transport.probe().await {
        Ok(health) if health.is_connected() => Endpoint::Primary,
        Ok(health) => {
            debug!(database = ?health.database, "database not connected, using fallback endpoint");
            Endpoint::Fallback
        }
        Err(err) => {
            warn!(error = %err, "health probe failed, using fallback endpoint");
            Endpoint::Fallback
        }
    }
}
