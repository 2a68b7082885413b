//! Inbound chat events.
//!
//! A [`ChatEvent`] is produced by the chat transport for every message
//! posted in a joined channel and handed, unchanged, to the dispatch layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Channel;

/// One chat message observed in a joined channel.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatEvent {
    /// Channel the message was posted in.
    pub channel: Channel,
    /// Sender login name.
    pub username: String,
    /// Sender display name (falls back to the login).
    pub display_name: String,
    /// Provider user id (falls back to the login).
    pub user_id: String,
    /// Provider message id, when the server tagged one.
    pub message_id: Option<String>,
    /// Message text.
    pub text: String,
    /// All message tags as sent by the server.
    pub tags: HashMap<String, String>,
    /// Local receive time.
    pub received_at: DateTime<Utc>,
    /// The raw protocol line.
    pub raw: String,
}

impl ChatEvent {
    /// If the text starts with `prefix`, split it into a command name and
    /// the remaining argument string.
    ///
    /// ```
    /// # use chatbridge_models::{ChatEvent, Channel};
    /// # let mut ev = ChatEvent {
    /// #     channel: Channel::new("c").unwrap(), username: "u".into(), display_name: "u".into(),
    /// #     user_id: "1".into(), message_id: None, text: String::new(), tags: Default::default(),
    /// #     received_at: chrono::Utc::now(), raw: String::new(),
    /// # };
    /// ev.text = "!so  someone else".into();
    /// assert_eq!(ev.command("!"), Some(("so", "someone else")));
    /// ```
    pub fn command(&self, prefix: &str) -> Option<(&str, &str)> {
        let rest = self.text.trim().strip_prefix(prefix)?;
        let (name, args) = match rest.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (rest, ""),
        };
        if name.is_empty() {
            return None;
        }
        Some((name, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(text: &str) -> ChatEvent {
        ChatEvent {
            channel: Channel::new("chan").unwrap(),
            username: "viewer".into(),
            display_name: "Viewer".into(),
            user_id: "42".into(),
            message_id: Some("m1".into()),
            text: text.into(),
            tags: HashMap::new(),
            received_at: Utc::now(),
            raw: String::new(),
        }
    }

    #[test]
    fn command_without_args() {
        assert_eq!(event("!ping").command("!"), Some(("ping", "")));
    }

    #[test]
    fn command_with_args() {
        assert_eq!(event("!echo hello world").command("!"), Some(("echo", "hello world")));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(event("hello !ping").command("!"), None);
        assert_eq!(event("!").command("!"), None);
    }
}
