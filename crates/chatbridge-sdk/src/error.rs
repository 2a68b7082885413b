//! SDK error types.
//!
//! [`SessionError`] is returned by every fallible transport and supervisor
//! operation.

use std::time::Duration;

/// Error type for chat session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The initial connection could not be established.
    #[error("failed to establish chat session: {0}")]
    EstablishFailed(String),

    /// The chat server refused the login (bad or expired token).
    #[error("chat server rejected login: {0}")]
    LoginRejected(String),

    /// A keep-alive ping failed mid-session.
    #[error("keep-alive ping failed: {0}")]
    KeepAliveFailed(#[source] Box<SessionError>),

    /// The session ended and will not come back.
    #[error("chat session closed: {0}")]
    Closed(String),

    /// The transport is between connections (or was never connected).
    #[error("not connected to the chat server")]
    Disconnected,

    /// No `PONG` arrived in time.
    #[error("no PONG received within {0:?}")]
    PingTimeout(Duration),

    /// The configured server URL cannot be used.
    #[error("invalid chat server URL {url}: {reason}")]
    InvalidUrl {
        /// Offending URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// WebSocket transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
