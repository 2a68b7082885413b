//! Minimal IRC line parsing for the chat server's IRC dialect.
//!
//! Line shape: `[@tags ][:prefix ]COMMAND [params] [:trailing]`, e.g.
//!
//! ```text
//! @display-name=Viewer;user-id=7 :viewer!viewer@viewer.tmi.twitch.tv PRIVMSG #chan :hello
//! ```

use std::collections::HashMap;

use chatbridge_models::{Channel, ChatEvent};
use chrono::Utc;

/// One parsed protocol line.  Borrowed from the raw text except tag values,
/// which are unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcLine<'a> {
    /// Message tags (IRCv3).
    pub tags: HashMap<String, String>,
    /// Source prefix without the leading `:`.
    pub prefix: Option<&'a str>,
    /// Command or numeric reply.
    pub command: &'a str,
    /// Middle parameters followed by the trailing parameter, if any.
    pub params: Vec<&'a str>,
}

impl<'a> IrcLine<'a> {
    /// Parse one line; `None` for empty or truncated input.
    pub fn parse(line: &'a str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        let mut tags = HashMap::new();
        if let Some(stripped) = rest.strip_prefix('@') {
            let (tag_str, after) = stripped.split_once(' ')?;
            for tag in tag_str.split(';').filter(|t| !t.is_empty()) {
                let (key, value) = tag.split_once('=').unwrap_or((tag, ""));
                tags.insert(key.to_string(), unescape_tag_value(value));
            }
            rest = after.trim_start_matches(' ');
        }

        let mut prefix = None;
        if let Some(stripped) = rest.strip_prefix(':') {
            let (p, after) = stripped.split_once(' ')?;
            prefix = Some(p);
            rest = after.trim_start_matches(' ');
        }

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing);
                break;
            }
            match rest.split_once(' ') {
                Some((param, after)) => {
                    params.push(param);
                    rest = after;
                }
                None => {
                    params.push(rest);
                    break;
                }
            }
        }

        Some(Self {
            tags,
            prefix,
            command,
            params,
        })
    }

    /// Nickname part of the prefix (`nick!user@host`).
    pub fn nick(&self) -> Option<&'a str> {
        self.prefix
            .map(|p| p.split(['!', '@']).next().unwrap_or(p))
            .filter(|n| !n.is_empty())
    }

    /// Last parameter, usually the trailing text.
    pub fn trailing(&self) -> Option<&'a str> {
        self.params.last().copied()
    }

    fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Turn a `PRIVMSG` into a [`ChatEvent`]; `None` for anything else.
    pub fn to_chat_event(&self, raw: &str) -> Option<ChatEvent> {
        if self.command != "PRIVMSG" || self.params.len() < 2 {
            return None;
        }
        let channel = Channel::new(self.params[0]).ok()?;
        let username = self.nick().unwrap_or("unknown").to_string();

        Some(ChatEvent {
            channel,
            display_name: self.tag("display-name").unwrap_or(username.as_str()).to_string(),
            user_id: self.tag("user-id").unwrap_or(username.as_str()).to_string(),
            message_id: self.tag("id").map(String::from),
            text: self.params[1].to_string(),
            tags: self.tags.clone(),
            received_at: Utc::now(),
            raw: raw.to_string(),
            username,
        })
    }
}

/// Undo IRCv3 tag value escaping.
fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
