//! Error types for the credential lifecycle.
//!
//! Each component has its own error enum; [`LifecycleError`] is what the
//! single `ensure_valid_token` run reports to the process entry point.

use std::path::PathBuf;

/// Failures reading or writing the persisted credential document.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The document could not be read.
    #[error("credential document {} is unavailable: {source}", .path.display())]
    Unavailable {
        /// Document location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON or lacks a required field.
    #[error("credential document {} is malformed: {source}", .path.display())]
    Malformed {
        /// Document location.
        path: PathBuf,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The updated document could not be written back.
    #[error("failed to write credential document {}: {source}", .path.display())]
    Write {
        /// Document location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Failure to obtain any answer from the introspection endpoint.
///
/// Distinct from an `Invalid` outcome: it says nothing about the token.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// Timeout, DNS failure, refused connection, TLS failure...
    #[error("introspection endpoint {url} unreachable: {source}")]
    Unreachable {
        /// Endpoint that was called.
        url: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },
}

/// Failures of the refresh-token grant.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The token endpoint answered with a non-200 status.
    #[error("token endpoint rejected the refresh with status {status}: {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Provider's diagnostic body (truncated).
        message: String,
    },

    /// The token endpoint could not be reached.
    #[error("token endpoint {url} unreachable: {source}")]
    Unreachable {
        /// Endpoint that was called.
        url: String,
        /// Transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A 200 response whose body is not JSON or lacks a token.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),
}

/// Fatal outcomes of [`CredentialLifecycle::ensure_valid_token`](crate::CredentialLifecycle::ensure_valid_token).
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The credential document could not be loaded.
    #[error("cannot load credentials: {0}")]
    Storage(#[from] StoreError),

    /// The token's validity could not be established.
    #[error("cannot verify access token: {0}")]
    Unreachable(#[from] ValidationError),

    /// The token was invalid and minting a new one failed.
    #[error("access token refresh failed: {0}")]
    RefreshFailed(#[from] RefreshError),
}
