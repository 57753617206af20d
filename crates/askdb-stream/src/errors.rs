use std::fmt;

/// Code used when the request could not be sent at all.
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
/// Code used when the service answered with a non-success status.
pub const FETCH_FAILED: &str = "FETCH_FAILED";
/// Code used when the service answered successfully but without a body.
pub const NO_BODY: &str = "NO_BODY";
/// Code used when something escaped the client's own pipeline.
pub const UNKNOWN: &str = "UNKNOWN";

/// Error shown to callers of the state machine.
///
/// Only `code` and `message` are ever exposed; transport details stay in the
/// logs. Codes sent by the remote service are passed through verbatim.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    /// Builds an error from a machine-readable code and a message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Failures while probing or opening the query stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The HTTP call itself failed (DNS, connect, TLS, ...).
    #[error("network error: {0}")]
    Network(String),
    /// The service answered with a non-success status.
    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// The service answered successfully but sent nothing to read.
    #[error("response has no body")]
    NoBody,
}

impl TransportError {
    /// Returns the fixed taxonomy code for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Network(_) => NETWORK_ERROR,
            Self::Status { .. } => FETCH_FAILED,
            Self::NoBody => NO_BODY,
        }
    }

    /// Converts the failure into the caller-visible error shape.
    pub fn to_error_info(&self) -> ErrorInfo {
        let message = match self {
            Self::Network(_) => "could not reach the query service".to_string(),
            Self::Status { status, .. } => format!("query request failed (HTTP {status})"),
            Self::NoBody => "query service returned an empty response".to_string(),
        };
        ErrorInfo::new(self.code(), message)
    }
}

/// Reason a single `data:` line was discarded.
///
/// Never fatal: the line is skipped and the stream continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Dropped {
    #[error("invalid JSON in `{event_type}` payload: {message}")]
    InvalidJson { event_type: String, message: String },
    #[error("`{event_type}` payload has unexpected shape: {message}")]
    Shape { event_type: String, message: String },
}

/// Errors raised while constructing a client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Invalid configuration value.
    #[error("config error: {0}")]
    Config(String),
    /// The HTTP client could not be built.
    #[error("http client error: {0}")]
    Http(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_map_to_fixed_codes() {
        assert_eq!(TransportError::Network("refused".into()).code(), NETWORK_ERROR);
        assert_eq!(
            TransportError::Status {
                status: 502,
                body: "bad gateway".into()
            }
            .code(),
            FETCH_FAILED
        );
        assert_eq!(TransportError::NoBody.code(), NO_BODY);
    }

    #[test]
    fn error_info_hides_transport_detail() {
        let info = TransportError::Network("tcp connect error: 10.0.0.3:8000".into()).to_error_info();
        assert_eq!(info.code, NETWORK_ERROR);
        assert!(!info.message.contains("10.0.0.3"));

        let info = TransportError::Status {
            status: 500,
            body: "Traceback (most recent call last)".into(),
        }
        .to_error_info();
        assert_eq!(info.message, "query request failed (HTTP 500)");
    }
}
