//! Refresh-token grant.
//!
//! Mints a new access/refresh token pair.  Persisting the pair is the
//! caller's job.

use chatbridge_models::TokenPair;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::RefreshError;
use crate::truncate_for_log;

/// Fields we need from the token endpoint's JSON body.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Client for the provider's token endpoint.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    http: reqwest::Client,
    url: String,
}

impl TokenRefresher {
    /// Create a refresher posting to `url` with the given HTTP client.
    pub fn new(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }

    /// Exchange `refresh_token` for a new token pair.
    ///
    /// One form-encoded `POST`, no retry.
    pub async fn refresh(
        &self,
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, RefreshError> {
        let res = self
            .http
            .post(&self.url)
            .form(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|source| RefreshError::Unreachable {
                url: self.url.clone(),
                source,
            })?;

        let status = res.status();
        if status != StatusCode::OK {
            let text = res.text().await.unwrap_or_default();
            warn!(endpoint = %self.url, status = status.as_u16(), body = %truncate_for_log(&text), "refresh rejected");
            return Err(RefreshError::Rejected {
                status: status.as_u16(),
                message: truncate_for_log(&text).to_string(),
            });
        }

        let body = res.bytes().await.map_err(|source| RefreshError::Unreachable {
            url: self.url.clone(),
            source,
        })?;

        let pair = parse_token_response(&body)?;
        debug!(endpoint = %self.url, "new token pair issued");
        Ok(pair)
    }
}

/// Extract the token pair from a 200 response body.
fn parse_token_response(body: &[u8]) -> Result<TokenPair, RefreshError> {
    let parsed: TokenResponse = serde_json::from_slice(body)
        .map_err(|e| RefreshError::MalformedResponse(format!("invalid JSON: {e}")))?;

    let access_token = parsed
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RefreshError::MalformedResponse("missing `access_token`".into()))?;
    let refresh_token = parsed
        .refresh_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RefreshError::MalformedResponse("missing `refresh_token`".into()))?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}
