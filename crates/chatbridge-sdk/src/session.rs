//! Session handle shared between the supervisor and dispatch handlers.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chatbridge_models::{Channel, ChatIdentity, RemoteEndpoint};

use crate::error::SessionError;
use crate::transport::ChatTransport;

/// A live chat session.
///
/// Only ever built from a successful connect, so holding one means the
/// login went through.  Cheap to clone; every clone drives the same
/// transport.
#[derive(Clone)]
pub struct ChatSession {
    endpoint: RemoteEndpoint,
    identity: ChatIdentity,
    channels: BTreeSet<Channel>,
    transport: Arc<dyn ChatTransport>,
}

impl ChatSession {
    pub(crate) fn new(
        endpoint: RemoteEndpoint,
        identity: ChatIdentity,
        channels: impl IntoIterator<Item = Channel>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            endpoint,
            identity,
            channels: channels.into_iter().collect(),
            transport,
        }
    }

    /// Server this session is connected to.
    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    /// Login the session authenticated as.
    pub fn identity(&self) -> &ChatIdentity {
        &self.identity
    }

    /// Channels joined at connect time.
    pub fn channels(&self) -> &BTreeSet<Channel> {
        &self.channels
    }

    /// Post `text` to `channel`.
    pub async fn say(&self, channel: &Channel, text: &str) -> Result<(), SessionError> {
        self.transport.say(channel, text).await
    }

    /// Protocol-level ping; returns the round-trip latency.
    pub async fn ping(&self) -> Result<Duration, SessionError> {
        self.transport.ping().await
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("endpoint", &self.endpoint)
            .field("identity", &self.identity)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}
