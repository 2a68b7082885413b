//! Durable credential document.
//!
//! The document is a JSON object shared with other settings (bot identity,
//! channel list, messaging-platform token).  [`CredentialStore::save`] only
//! ever rewrites the two token fields: it re-reads the whole document,
//! splices the new values over the old ones and leaves every other byte as
//! it found it.
//!
//! Entries of `streamers` that are not valid channel names are skipped with
//! a warning; they never make the document unreadable.
//!
//! # Document layout
//!
//! ```json
//! {
//!   "token": "<messaging platform bot token>",
//!   "botUsername": "mybot",
//!   "botPassword": "<access token>",
//!   "twitchClientId": "<client id>",
//!   "twitchClientSecret": "<client secret>",
//!   "twitchRefreshToken": "<refresh token>",
//!   "streamers": ["somechannel"]
//! }
//! ```

use std::ffi::OsString;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use chatbridge_models::{Channel, CredentialRecord};
use serde::Deserialize;
use serde_json::value::RawValue;
use tracing::{debug, info, warn};

use crate::error::StoreError;

/// Typed view of the fields this crate reads.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialDocument {
    bot_username: String,
    bot_password: String,
    twitch_client_id: String,
    twitch_client_secret: String,
    twitch_refresh_token: String,
    #[serde(default)]
    streamers: Vec<String>,
}

/// Raw text of the two token values, borrowed from the document.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenSpans<'a> {
    #[serde(borrow)]
    bot_password: &'a RawValue,
    #[serde(borrow)]
    twitch_refresh_token: &'a RawValue,
}

/// Everything loaded from the document at startup.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    /// OAuth credential set.
    pub record: CredentialRecord,
    /// Chat login name.
    pub username: String,
    /// Channels to join.
    pub channels: Vec<Channel>,
}

/// File-backed credential store.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Create a store for the document at `path`.  Nothing is read yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the persisted document.
    pub fn load(&self) -> Result<StoredCredentials, StoreError> {
        let raw = self.read_raw()?;
        let doc: CredentialDocument =
            serde_json::from_str(&raw).map_err(|source| self.malformed(source))?;

        let channels: Vec<Channel> = doc
            .streamers
            .iter()
            .filter_map(|name| match Channel::new(name) {
                Ok(channel) => Some(channel),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "skipping channel");
                    None
                }
            })
            .collect();

        debug!(
            path = %self.path.display(),
            username = %doc.bot_username,
            channels = channels.len(),
            "credential document loaded"
        );

        Ok(StoredCredentials {
            record: CredentialRecord {
                access_token: doc.bot_password,
                refresh_token: doc.twitch_refresh_token,
                client_id: doc.twitch_client_id,
                client_secret: doc.twitch_client_secret,
            },
            username: doc.bot_username,
            channels,
        })
    }

    /// Persist the record's access and refresh tokens.
    ///
    /// Read-modify-write over the whole document: only the text of the two
    /// token values is replaced.  When both already match, the file is not
    /// touched.
    pub fn save(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        let raw = self.read_raw()?;
        let spans: TokenSpans<'_> =
            serde_json::from_str(&raw).map_err(|source| self.malformed(source))?;

        let current_access: String = serde_json::from_str(spans.bot_password.get())
            .map_err(|source| self.malformed(source))?;
        let current_refresh: String = serde_json::from_str(spans.twitch_refresh_token.get())
            .map_err(|source| self.malformed(source))?;
        if current_access == record.access_token && current_refresh == record.refresh_token {
            debug!(path = %self.path.display(), "credential document already up to date");
            return Ok(());
        }

        let encode =
            |token: &str| serde_json::to_string(token).map_err(|source| self.malformed(source));
        let mut edits = [
            (span_of(&raw, spans.bot_password), encode(record.access_token.as_str())?),
            (
                span_of(&raw, spans.twitch_refresh_token),
                encode(record.refresh_token.as_str())?,
            ),
        ];
        edits.sort_by_key(|(span, _)| span.start);

        let mut rendered = String::with_capacity(raw.len() + 64);
        let mut cursor = 0;
        for (span, text) in &edits {
            rendered.push_str(&raw[cursor..span.start]);
            rendered.push_str(text);
            cursor = span.end;
        }
        rendered.push_str(&raw[cursor..]);

        self.write_atomic(rendered.as_bytes())?;

        info!(path = %self.path.display(), "credential document updated");
        Ok(())
    }

    fn read_raw(&self) -> Result<String, StoreError> {
        fs::read_to_string(&self.path).map_err(|source| StoreError::Unavailable {
            path: self.path.clone(),
            source,
        })
    }

    /// Write to a sibling temp file, then rename it over the document.
    fn write_atomic(&self, contents: &[u8]) -> Result<(), StoreError> {
        let tmp = self.temp_path();
        let result = fs::write(&tmp, contents).and_then(|()| fs::rename(&tmp, &self.path));
        result.map_err(|source| {
            let _ = fs::remove_file(&tmp);
            StoreError::Write {
                path: self.path.clone(),
                source,
            }
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name: OsString = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("credentials"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn malformed(&self, source: serde_json::Error) -> StoreError {
        StoreError::Malformed {
            path: self.path.clone(),
            source,
        }
    }
}

/// Byte range of `value` within `doc`, which it was borrowed from.
fn span_of(doc: &str, value: &RawValue) -> Range<usize> {
    let text = value.get();
    let start = text.as_ptr().addr() - doc.as_ptr().addr();
    start..start + text.len()
}
