//! Message record and normalization from platform messages.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::PlatformMessage;

/// Normalized, storage-ready representation of one chat message.
///
/// `(id, channel_id)` identifies a record. Optional platform data maps to
/// empty strings or empty sequences, never to `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Platform message identifier, unique within its channel.
    pub id: String,
    /// Channel identifier.
    pub channel_id: String,
    /// Channel name; empty for channels without one.
    #[serde(default)]
    pub channel_name: String,
    /// Server identifier; empty for direct messages.
    #[serde(default)]
    pub guild_id: String,
    /// Server name; empty for direct messages.
    #[serde(default)]
    pub guild_name: String,
    /// Author identifier.
    pub author_id: String,
    /// Author display form.
    #[serde(default)]
    pub author_name: String,
    /// Creation instant, RFC 3339 in UTC.
    pub timestamp: String,
    /// Text content.
    #[serde(default)]
    pub content: String,
    /// Attachment URLs in platform order.
    #[serde(default)]
    pub attachments: Vec<String>,
    /// Embeds, each serialized as compact JSON text.
    #[serde(default)]
    pub embeds: Vec<String>,
    /// Whether the message is pinned.
    #[serde(default)]
    pub pinned: bool,
    /// Last edit instant, RFC 3339 in UTC, or empty if never edited.
    #[serde(default)]
    pub edited_timestamp: String,
}

impl MessageRecord {
    /// Normalize a platform message into a record.
    ///
    /// Pure and infallible for any well-formed message.
    #[must_use]
    pub fn from_message(msg: &PlatformMessage) -> Self {
        let (guild_id, guild_name) = msg
            .guild
            .as_ref()
            .map(|g| (g.id.clone(), g.name.clone()))
            .unwrap_or_default();

        Self {
            id: msg.id.clone(),
            channel_id: msg.channel.id.clone(),
            channel_name: msg.channel.name.clone(),
            guild_id,
            guild_name,
            author_id: msg.author.id.clone(),
            author_name: msg.author.display_name(),
            timestamp: format_instant(&msg.created_at),
            content: msg.content.clone(),
            attachments: msg.attachments.iter().map(|a| a.url.clone()).collect(),
            embeds: msg.embeds.iter().map(ToString::to_string).collect(),
            pinned: msg.pinned,
            edited_timestamp: msg
                .edited_at
                .as_ref()
                .map(format_instant)
                .unwrap_or_default(),
        }
    }

    /// Identity key of this record.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.id, &self.channel_id)
    }
}

impl From<&PlatformMessage> for MessageRecord {
    fn from(msg: &PlatformMessage) -> Self {
        Self::from_message(msg)
    }
}

/// Format an instant as RFC 3339 with an explicit `+00:00` offset.
fn format_instant(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}
