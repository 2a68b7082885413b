//! OAuth credentials for the chat provider's API.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TokenPair
// ---------------------------------------------------------------------------

/// A freshly minted access/refresh token pair returned by the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// New bearer access token.
    pub access_token: String,
    /// New refresh token. Providers rotate it on every use.
    pub refresh_token: String,
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CredentialRecord
// ---------------------------------------------------------------------------

/// The single credential set this process authenticates with.
///
/// * `access_token`  – bearer token, believed valid or unknown.
/// * `refresh_token` – used only to mint a new access token.
/// * `client_id` / `client_secret` – static application identity.
///
/// Only the two token fields ever change, and always together through
/// [`rotate`](Self::rotate).
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    /// Current access token.
    pub access_token: String,
    /// Current refresh token.
    pub refresh_token: String,
    /// OAuth client id.
    pub client_id: String,
    /// OAuth client secret.
    pub client_secret: String,
}

impl CredentialRecord {
    /// Replace both tokens with a freshly minted pair.
    pub fn rotate(&mut self, pair: TokenPair) {
        self.access_token = pair.access_token;
        self.refresh_token = pair.refresh_token;
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
