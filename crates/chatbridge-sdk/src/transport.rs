//! Capability interface of a chat transport.
//!
//! The supervisor never speaks the wire protocol itself; it drives any
//! [`ChatTransport`].  [`IrcTransport`](crate::IrcTransport) is the
//! production implementation.

use std::time::Duration;

use async_trait::async_trait;
use chatbridge_models::{Channel, ChatEvent, ChatIdentity, RemoteEndpoint};
use tokio::sync::mpsc;

use crate::error::SessionError;

/// What a successful connect hands back.
#[derive(Debug)]
pub struct Connected {
    /// Server the session is connected to (the "connected" notification).
    pub endpoint: RemoteEndpoint,
    /// Inbound chat messages, in arrival order, for the life of the transport.
    pub events: mpsc::Receiver<ChatEvent>,
}

/// Operations the connection supervisor needs from a chat protocol client.
#[async_trait]
pub trait ChatTransport: Send + Sync + 'static {
    /// Log in as `identity` and join `channels`.
    ///
    /// Called once per transport.  Reconnecting after a later drop is the
    /// transport's own business.
    async fn connect(
        &self,
        identity: &ChatIdentity,
        channels: &[Channel],
    ) -> Result<Connected, SessionError>;

    /// Protocol-level ping; returns the round-trip latency.
    async fn ping(&self) -> Result<Duration, SessionError>;

    /// Post `text` to `channel`.
    async fn say(&self, channel: &Channel, text: &str) -> Result<(), SessionError>;
}
