//! Access-token introspection.
//!
//! Asks the provider whether the current access token is still accepted.
//! Only the status code drives the outcome; the body is logged for
//! diagnostics and otherwise ignored.

use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use tracing::debug;

use crate::error::ValidationError;
use crate::truncate_for_log;

/// Result of one introspection call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The provider accepted the token (HTTP 200).
    Valid,
    /// The provider answered with any other status.
    Invalid {
        /// HTTP status code returned.
        status: u16,
    },
}

/// Client for the provider's introspection endpoint.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    http: reqwest::Client,
    url: String,
}

impl TokenValidator {
    /// Create a validator calling `url` with the given HTTP client.
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Check `access_token` against the introspection endpoint.
    ///
    /// Sends `Authorization: OAuth <token>` and `Client-Id: <client_id>`.
    /// A transport failure is an error, not an `Invalid` outcome.
    pub async fn validate(
        &self,
        access_token: &str,
        client_id: &str,
    ) -> Result<ValidationOutcome, ValidationError> {
        let res = self
            .http
            .get(&self.url)
            .header(AUTHORIZATION, format!("OAuth {access_token}"))
            .header("Client-Id", client_id)
            .send()
            .await
            .map_err(|source| ValidationError::Unreachable {
                url: self.url.clone(),
                source,
            })?;

        let status = res.status();

        match res.text().await {
            Ok(body) => debug!(
                endpoint = %self.url,
                status = status.as_u16(),
                body = %truncate_for_log(&body),
                "introspection response"
            ),
            Err(e) => debug!(endpoint = %self.url, status = status.as_u16(), error = %e, "introspection body unreadable"),
        }

        if status == StatusCode::OK {
            Ok(ValidationOutcome::Valid)
        } else {
            Ok(ValidationOutcome::Invalid {
                status: status.as_u16(),
            })
        }
    }
}
