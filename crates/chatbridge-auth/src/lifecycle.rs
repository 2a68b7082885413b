//! Credential lifecycle: the single startup run that produces a usable
//! access token.
//!
//! ```text
//! Start ─► Validating ─┬─► Valid                         (token reused)
//!                      └─► Refreshing ─┬─► Persisted     (new token)
//!                                      └─► Failed        (abort)
//! ```
//!
//! The run is a flat sequence of awaited steps; nothing here loops or
//! retries.  An unreachable introspection endpoint is fatal and no refresh
//! is attempted.

use chatbridge_models::Channel;
use tracing::{error, info, warn};

use crate::config::ProviderConfig;
use crate::error::{LifecycleError, StoreError};
use crate::refresher::TokenRefresher;
use crate::store::CredentialStore;
use crate::validator::{TokenValidator, ValidationOutcome};

/// States of one lifecycle run, as they appear in the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum LifecycleState {
    /// Loading the credential document.
    Start,
    /// Waiting for the introspection endpoint.
    Validating,
    /// Terminal: the stored token is accepted as-is.
    Valid,
    /// Minting a new token pair.
    Refreshing,
    /// Terminal: a new token was minted (and persisted, unless reported otherwise).
    Persisted,
    /// Terminal: no usable token.
    Failed,
}

/// How the returned access token was obtained.
#[derive(Debug)]
pub enum TokenOrigin {
    /// The stored token passed introspection.
    Validated,
    /// A new pair was minted.  `persist_error` is set when writing it back
    /// to the document failed; the token is still good for this process.
    Refreshed {
        /// Failure to persist the new pair, if any.
        persist_error: Option<StoreError>,
    },
}

/// A token that passed (or was freshly minted after failing) introspection,
/// plus the identity loaded alongside it.
#[derive(Debug)]
pub struct EnsuredToken {
    /// Access token to log in with.
    pub access_token: String,
    /// Chat login name from the document.
    pub username: String,
    /// Channels to join.
    pub channels: Vec<Channel>,
    /// Whether the token was reused or refreshed.
    pub origin: TokenOrigin,
}

/// Orchestrates store, validator and refresher.
#[derive(Debug, Clone)]
pub struct CredentialLifecycle {
    store: CredentialStore,
    validator: TokenValidator,
    refresher: TokenRefresher,
}

impl CredentialLifecycle {
    /// Assemble a lifecycle from its parts.
    pub fn new(store: CredentialStore, validator: TokenValidator, refresher: TokenRefresher) -> Self {
        Self {
            store,
            validator,
            refresher,
        }
    }

    /// Build validator and refresher for `config`, sharing one HTTP client.
    pub fn from_config(store: CredentialStore, config: &ProviderConfig) -> Result<Self, reqwest::Error> {
        let http = config.http_client()?;
        Ok(Self::new(
            store,
            TokenValidator::new(http.clone(), config.validate_url.clone()),
            TokenRefresher::new(http, config.token_url.clone()),
        ))
    }

    /// Produce an access token the provider accepts.
    ///
    /// 1. Load the credential document.
    /// 2. Validate the stored access token.
    /// 3. `Valid` → return it unchanged; no refresh, no write.
    /// 4. `Invalid` → refresh, persist the new pair, return the new token.
    ///    A persistence failure is logged and reported through
    ///    [`TokenOrigin::Refreshed`] but does not fail the call.
    pub async fn ensure_valid_token(&self) -> Result<EnsuredToken, LifecycleError> {
        let result = self.run().await;
        if let Err(e) = &result {
            transition(LifecycleState::Failed);
            error!(path = %self.store.path().display(), error = %e, "no usable access token");
        }
        result
    }

    async fn run(&self) -> Result<EnsuredToken, LifecycleError> {
        transition(LifecycleState::Start);
        let stored = self.store.load()?;
        let mut record = stored.record;

        transition(LifecycleState::Validating);
        let status = match self
            .validator
            .validate(&record.access_token, &record.client_id)
            .await?
        {
            ValidationOutcome::Valid => {
                transition(LifecycleState::Valid);
                return Ok(EnsuredToken {
                    access_token: record.access_token,
                    username: stored.username,
                    channels: stored.channels,
                    origin: TokenOrigin::Validated,
                });
            }
            ValidationOutcome::Invalid { status } => status,
        };

        info!(status, "access token rejected by introspection, refreshing");
        transition(LifecycleState::Refreshing);
        let pair = self
            .refresher
            .refresh(&record.client_id, &record.client_secret, &record.refresh_token)
            .await?;

        record.rotate(pair);
        let persist_error = match self.store.save(&record) {
            Ok(()) => None,
            Err(e) => {
                error!(error = %e, "new token pair could not be persisted; continuing with in-memory token");
                Some(e)
            }
        };

        transition(LifecycleState::Persisted);
        if persist_error.is_some() {
            warn!("the next restart will start from the previous, already rotated refresh token");
        }

        Ok(EnsuredToken {
            access_token: record.access_token,
            username: stored.username,
            channels: stored.channels,
            origin: TokenOrigin::Refreshed { persist_error },
        })
    }
}

fn transition(state: LifecycleState) {
    info!(state = %state, "credential lifecycle");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_names_are_snake_case() {
        assert_eq!(LifecycleState::Validating.to_string(), "validating");
        assert_eq!(LifecycleState::Persisted.as_ref(), "persisted");
    }
}
