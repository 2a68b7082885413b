//! Chat login identity and channel names.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

// ---------------------------------------------------------------------------
// ChatIdentity
// ---------------------------------------------------------------------------

/// The login a chat session authenticates as.
///
/// The `access_token` is the value produced by the credential lifecycle;
/// it is copied in once and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct ChatIdentity {
    /// Chat login name (lower-cased).
    pub username: String,
    /// OAuth access token presented at login.
    pub access_token: String,
}

impl ChatIdentity {
    /// Build an identity, normalising the username to lower case.
    pub fn new(username: &str, access_token: impl Into<String>) -> Result<Self, ModelError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ModelError::InvalidUsername {
                value: username.to_string(),
                reason: "must not be empty".into(),
            });
        }
        Ok(Self {
            username: username.to_lowercase(),
            access_token: access_token.into(),
        })
    }
}

impl fmt::Debug for ChatIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatIdentity")
            .field("username", &self.username)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A chat channel, stored as `#name` in lower case.
///
/// `"Streamer"`, `"streamer"` and `"#streamer"` all name the same channel.
///
/// # Examples
///
/// ```
/// use chatbridge_models::Channel;
///
/// let ch: Channel = "Streamer".parse().unwrap();
/// assert_eq!(ch.as_str(), "#streamer");
/// assert_eq!(ch.name(), "streamer");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Channel(String);

impl Channel {
    /// Parse and normalise a channel name.
    pub fn new(raw: &str) -> Result<Self, ModelError> {
        let trimmed = raw.trim();
        let name = trimmed.strip_prefix('#').unwrap_or(trimmed);
        if name.is_empty() {
            return Err(ModelError::InvalidChannel {
                value: raw.to_string(),
                reason: "must not be empty".into(),
            });
        }
        if name.chars().any(char::is_whitespace) {
            return Err(ModelError::InvalidChannel {
                value: raw.to_string(),
                reason: "must not contain whitespace".into(),
            });
        }
        Ok(Self(format!("#{}", name.to_lowercase())))
    }

    /// The channel with its leading `#`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bare channel name, without `#`.
    pub fn name(&self) -> &str {
        &self.0[1..]
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Channel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Channel {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(&s)
    }
}

impl From<Channel> for String {
    fn from(ch: Channel) -> Self {
        ch.0
    }
}
