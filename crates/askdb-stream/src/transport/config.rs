use std::time::Duration;

use crate::errors::ClientError;

use super::Endpoint;

/// Connection settings for the query service.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Base URL of the query service.
    pub base_url: String,
    /// Path of the connectivity probe.
    pub health_path: String,
    /// Path of the primary streaming query endpoint.
    pub query_path: String,
    /// Path of the degraded endpoint used when the database is unreachable.
    pub fallback_path: String,
    /// Timeout for the connectivity probe. The stream itself has none.
    pub probe_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            health_path: "/health".to_string(),
            query_path: "/api/query".to_string(),
            fallback_path: "/api/query/mock".to_string(),
            probe_timeout: Duration::from_millis(3_000),
            connect_timeout: Duration::from_millis(10_000),
        }
    }
}

impl ClientConfig {
    /// Creates a config pointing at `base_url` with default paths.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Builds a config from `ASKDB_BASE_URL`, `ASKDB_PROBE_TIMEOUT_MS` and
    /// `ASKDB_CONNECT_TIMEOUT_MS`, falling back to defaults for unset values.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ClientError> {
        let mut config = Self::default();
        if let Some(base_url) = lookup("ASKDB_BASE_URL").filter(|v| !v.trim().is_empty()) {
            config.base_url = base_url.trim().to_string();
        }
        if let Some(ms) = parse_millis(&lookup, "ASKDB_PROBE_TIMEOUT_MS")? {
            config.probe_timeout = ms;
        }
        if let Some(ms) = parse_millis(&lookup, "ASKDB_CONNECT_TIMEOUT_MS")? {
            config.connect_timeout = ms;
        }
        config.validate()?;
        Ok(config)
    }

    /// Overrides the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the probe timeout.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Overrides the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        let base = self.base_url.trim();
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must start with http:// or https://, got `{base}`"
            )));
        }
        if self.probe_timeout.is_zero() {
            return Err(ClientError::Config(
                "probe timeout must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn health_url(&self) -> String {
        self.join(&self.health_path)
    }

    pub(crate) fn query_url(&self, endpoint: Endpoint) -> String {
        match endpoint {
            Endpoint::Primary => self.join(&self.query_path),
            Endpoint::Fallback => self.join(&self.fallback_path),
        }
    }

    fn join(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn parse_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<Duration>, ClientError> {
    let Some(raw) = lookup(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(|ms| Some(Duration::from_millis(ms)))
        .map_err(|e| ClientError::Config(format!("{key} must be milliseconds: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let config = ClientConfig::new("http://svc:8000/");
        assert_eq!(config.health_url(), "http://svc:8000/health");
        assert_eq!(
            config.query_url(Endpoint::Primary),
            "http://svc:8000/api/query"
        );
        assert_eq!(
            config.query_url(Endpoint::Fallback),
            "http://svc:8000/api/query/mock"
        );
    }

    #[test]
    fn env_overrides_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("ASKDB_BASE_URL", "https://askdb.internal"),
            ("ASKDB_PROBE_TIMEOUT_MS", "750"),
        ]))
        .expect("config");
        assert_eq!(config.base_url, "https://askdb.internal");
        assert_eq!(config.probe_timeout, Duration::from_millis(750));
        assert_eq!(config.connect_timeout, Duration::from_millis(10_000));
    }

    #[test]
    fn empty_env_uses_defaults() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).expect("config");
        assert_eq!(config.base_url, "http://localhost:8000");
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let err = ClientConfig::from_lookup(lookup_from(&[("ASKDB_PROBE_TIMEOUT_MS", "soon")]))
            .expect_err("should fail");
        assert!(matches!(err, ClientError::Config(msg) if msg.contains("ASKDB_PROBE_TIMEOUT_MS")));
    }

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = ClientConfig::from_lookup(lookup_from(&[("ASKDB_BASE_URL", "localhost:8000")]))
            .expect_err("should fail");
        assert!(matches!(err, ClientError::Config(msg) if msg.contains("base_url")));
    }
}
