//! Application configuration.
//!
//! One provider URL is the only source of truth for where requests go:
//! the identity endpoints live under `<provider>/auth/v1` and the resource
//! API under `<provider>/rest/v1`.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

pub const ENV_PROVIDER_URL: &str = "KEYGATE_PROVIDER_URL";
pub const ENV_API_KEY: &str = "KEYGATE_API_KEY";
pub const ENV_STORE_PATH: &str = "KEYGATE_STORE_PATH";
pub const ENV_TIMEOUT_SECS: &str = "KEYGATE_TIMEOUT_SECS";

const AUTH_PATH: &str = "/auth/v1";
const REST_PATH: &str = "/rest/v1";

/// Configuration problems. Always fatal: nothing starts without a
/// usable provider URL and API key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is absent or empty.
    #[error("missing configuration: {0}")]
    Missing(&'static str),

    /// The provider URL is not an absolute http(s) URL.
    #[error("invalid provider URL {0:?}: expected http:// or https://")]
    InvalidProviderUrl(String),

    /// A setting could not be parsed.
    #[error("invalid value {value:?} for {name}")]
    Invalid { name: &'static str, value: String },
}

/// Where the backend lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeygateConfig {
    provider_url: String,
    api_key: String,
    store_path: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl KeygateConfig {
    /// Creates a configuration. A trailing slash on `provider_url` is
    /// dropped. Nothing is checked until [`validate`](Self::validate).
    pub fn new(provider_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let provider_url = provider_url.into().trim().trim_end_matches('/').to_owned();
        Self {
            provider_url,
            api_key: api_key.into().trim().to_owned(),
            store_path: None,
            timeout: None,
        }
    }

    /// Persists the session at `path` instead of the platform default.
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    /// Fails requests that take longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Loads from the process environment.
    ///
    /// # Errors
    /// See [`from_lookup`](Self::from_lookup).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads from any name → value source.
    ///
    /// Reads `KEYGATE_PROVIDER_URL` and `KEYGATE_API_KEY` (required),
    /// `KEYGATE_STORE_PATH` and `KEYGATE_TIMEOUT_SECS` (optional).
    ///
    /// # Errors
    /// Returns [`ConfigError`] if a required value is missing, the timeout
    /// is not a whole number of seconds, or validation fails.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let provider_url = lookup(ENV_PROVIDER_URL).ok_or(ConfigError::Missing(ENV_PROVIDER_URL))?;
        let api_key = lookup(ENV_API_KEY).ok_or(ConfigError::Missing(ENV_API_KEY))?;
        let mut config = Self::new(provider_url, api_key);

        if let Some(path) = lookup(ENV_STORE_PATH).filter(|p| !p.trim().is_empty()) {
            config = config.store_path(path);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS).filter(|t| !t.trim().is_empty()) {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                name: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
            config = config.timeout(Duration::from_secs(secs));
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that the provider URL and API key are usable.
    ///
    /// # Errors
    /// Returns [`ConfigError::Missing`] for an empty URL or key, and
    /// [`ConfigError::InvalidProviderUrl`] for a URL that does not parse,
    /// is not http(s), has no host, or carries a query or fragment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider_url.is_empty() {
            return Err(ConfigError::Missing("provider URL"));
        }
        match Url::parse(&self.provider_url) {
            Ok(url)
                if matches!(url.scheme(), "http" | "https")
                    && url.host_str().is_some_and(|host| !host.is_empty())
                    && url.query().is_none()
                    && url.fragment().is_none() => {}
            Ok(_) => return Err(ConfigError::InvalidProviderUrl(self.provider_url.clone())),
            Err(e) => {
                tracing::debug!(url = %self.provider_url, error = %e, "provider URL does not parse");
                return Err(ConfigError::InvalidProviderUrl(self.provider_url.clone()));
            }
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::Missing("API key"));
        }
        Ok(())
    }

    pub fn provider_url(&self) -> &str {
        &self.provider_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Base URL of the identity endpoints.
    pub fn auth_url(&self) -> String {
        format!("{}{AUTH_PATH}", self.provider_url)
    }

    /// Base URL of the resource API.
    pub fn rest_url(&self) -> String {
        format!("{}{REST_PATH}", self.provider_url)
    }

    pub fn session_store_path(&self) -> Option<&std::path::Path> {
        self.store_path.as_deref()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_new_derives_both_base_urls() {
        let config = KeygateConfig::new("https://x.example/", "key");
        assert_eq!(config.auth_url(), "https://x.example/auth/v1");
        assert_eq!(config.rest_url(), "https://x.example/rest/v1");
    }

    #[test]
    fn test_validate_accepts_http_and_https() {
        assert!(KeygateConfig::new("http://127.0.0.1:9", "k").validate().is_ok());
        assert!(KeygateConfig::new("https://x.example", "k").validate().is_ok());
        assert!(KeygateConfig::new("https://x.example/base", "k").validate().is_ok());
    }

    #[test]
    fn test_validate_empty_url_is_missing() {
        let err = KeygateConfig::new("  ", "k").validate().unwrap_err();
        assert_eq!(err, ConfigError::Missing("provider URL"));
    }

    #[test]
    fn test_validate_url_without_scheme_is_invalid() {
        for url in ["x.example", "ftp://x.example", "https://"] {
            let err = KeygateConfig::new(url, "k").validate().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidProviderUrl(_)), "{url}");
        }
    }

    #[test]
    fn test_validate_malformed_url_is_invalid() {
        for url in [
            "https://exa mple.com",
            "http://[::1",
            "https://x.example?tenant=1",
            "https://x.example#top",
        ] {
            let err = KeygateConfig::new(url, "k").validate().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidProviderUrl(_)), "{url}");
        }
    }

    #[test]
    fn test_validate_empty_key_is_missing() {
        let err = KeygateConfig::new("https://x.example", "").validate().unwrap_err();
        assert_eq!(err, ConfigError::Missing("API key"));
    }

    #[test]
    fn test_from_lookup_reads_all_settings() {
        let config = KeygateConfig::from_lookup(lookup(&[
            (ENV_PROVIDER_URL, "https://x.example"),
            (ENV_API_KEY, "anon"),
            (ENV_STORE_PATH, "/tmp/keygate/session.json"),
            (ENV_TIMEOUT_SECS, "15"),
        ]))
        .unwrap();

        assert_eq!(config.provider_url(), "https://x.example");
        assert_eq!(config.api_key(), "anon");
        assert_eq!(
            config.session_store_path(),
            Some(std::path::Path::new("/tmp/keygate/session.json"))
        );
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_from_lookup_optional_settings_default_to_none() {
        let config = KeygateConfig::from_lookup(lookup(&[
            (ENV_PROVIDER_URL, "https://x.example"),
            (ENV_API_KEY, "anon"),
        ]))
        .unwrap();

        assert_eq!(config.session_store_path(), None);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_from_lookup_missing_url_names_variable() {
        let err = KeygateConfig::from_lookup(lookup(&[(ENV_API_KEY, "anon")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_PROVIDER_URL));
        assert!(err.to_string().contains("KEYGATE_PROVIDER_URL"));
    }

    #[test]
    fn test_from_lookup_missing_key_names_variable() {
        let err = KeygateConfig::from_lookup(lookup(&[(ENV_PROVIDER_URL, "https://x.example")]))
            .unwrap_err();
        assert_eq!(err, ConfigError::Missing(ENV_API_KEY));
    }

    #[test]
    fn test_from_lookup_bad_timeout_is_invalid() {
        let err = KeygateConfig::from_lookup(lookup(&[
            (ENV_PROVIDER_URL, "https://x.example"),
            (ENV_API_KEY, "anon"),
            (ENV_TIMEOUT_SECS, "soon"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                name: ENV_TIMEOUT_SECS,
                value: "soon".into()
            }
        );
    }
}
