//! Identity provider configuration.
//!
//! Resolves the introspection and token endpoint URLs from environment
//! variables at startup.  Tests and the local `mock-idp` point the base URL
//! at a loopback server instead of the real provider.

use std::time::Duration;

/// Base URL of the provider's identity service.
pub const DEFAULT_ID_URL: &str = "https://id.twitch.tv";

const VALIDATE_PATH: &str = "/oauth2/validate";
const TOKEN_PATH: &str = "/oauth2/token";

/// Endpoints and HTTP settings for the OAuth provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Token introspection endpoint (`GET`).
    pub validate_url: String,
    /// Token endpoint for the refresh-token grant (`POST`).
    pub token_url: String,
    /// Per-request timeout for both endpoints.
    pub request_timeout: Duration,
}

impl ProviderConfig {
    /// Derive both endpoint URLs from a provider base URL.
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            validate_url: format!("{base}{VALIDATE_PATH}"),
            token_url: format!("{base}{TOKEN_PATH}"),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Build the configuration from environment variables.
    ///
    /// | Variable                        | Default                | Description              |
    /// |---------------------------------|------------------------|--------------------------|
    /// | `CHATBRIDGE_ID_URL`             | `https://id.twitch.tv` | Identity service base URL |
    /// | `CHATBRIDGE_HTTP_TIMEOUT_SECS`  | `10`                   | Request timeout          |
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("CHATBRIDGE_ID_URL").unwrap_or_else(|_| DEFAULT_ID_URL.to_string());
        let timeout_secs: u64 = std::env::var("CHATBRIDGE_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        Self {
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            ..Self::from_base_url(&base_url)
        }
    }

    /// Build the HTTP client shared by the validator and the refresher.
    pub fn http_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_derived_from_base() {
        let cfg = ProviderConfig::from_base_url("http://127.0.0.1:4000/");
        assert_eq!(cfg.validate_url, "http://127.0.0.1:4000/oauth2/validate");
        assert_eq!(cfg.token_url, "http://127.0.0.1:4000/oauth2/token");
    }

    #[test]
    fn default_base_is_the_public_provider() {
        let cfg = ProviderConfig::from_base_url(DEFAULT_ID_URL);
        assert_eq!(cfg.validate_url, "https://id.twitch.tv/oauth2/validate");
        assert_eq!(cfg.token_url, "https://id.twitch.tv/oauth2/token");
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn http_client_builds() {
        assert!(ProviderConfig::from_base_url(DEFAULT_ID_URL).http_client().is_ok());
    }
}
