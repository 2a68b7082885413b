//! # chatbridge auth
//!
//! Keeps the chat provider's OAuth access token usable.
//!
//! * [`CredentialStore`] — the persisted credential document.
//! * [`TokenValidator`] — asks the provider whether a token is still valid.
//! * [`TokenRefresher`] — mints a new pair with the refresh-token grant.
//! * [`CredentialLifecycle`] — runs validate → refresh → persist once at
//!   startup and hands back a token the provider accepts.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use chatbridge_auth::{CredentialLifecycle, CredentialStore, ProviderConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let lifecycle = CredentialLifecycle::from_config(
//!     CredentialStore::new("config.json"),
//!     &ProviderConfig::from_env(),
//! )?;
//! let token = lifecycle.ensure_valid_token().await?;
//! println!("logging in as {}", token.username);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod refresher;
pub mod store;
pub mod validator;

pub use config::ProviderConfig;
pub use error::{LifecycleError, RefreshError, StoreError, ValidationError};
pub use lifecycle::{CredentialLifecycle, EnsuredToken, LifecycleState, TokenOrigin};
pub use refresher::TokenRefresher;
pub use store::{CredentialStore, StoredCredentials};
pub use validator::{TokenValidator, ValidationOutcome};

const LOG_BODY_LIMIT: usize = 256;

/// Cut a response body down to something reasonable for a log line.
pub(crate) fn truncate_for_log(body: &str) -> &str {
    match body.char_indices().nth(LOG_BODY_LIMIT) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
