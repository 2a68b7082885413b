//! Network addressing of the chat server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Host and port of the chat server a session is connected to.
///
/// # Examples
///
/// ```
/// use chatbridge_models::RemoteEndpoint;
///
/// let ep = RemoteEndpoint::new("irc-ws.chat.twitch.tv", 443);
/// assert_eq!(ep.to_string(), "irc-ws.chat.twitch.tv:443");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemoteEndpoint {
    /// Server host name or address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl RemoteEndpoint {
    /// Create a new endpoint.
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
