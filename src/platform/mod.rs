//! Chat platform collaborator contract.
//!
//! The archiver never talks to a chat platform directly. A backend provides:
//! - a [`PlatformEvent::Ready`] notification carrying the connected identity
//!   and every visible server with its channels
//! - per-channel history as a bounded lazy stream ([`HistorySource`])
//! - a stream of [`PlatformEvent::MessageCreated`] events
//!
//! Events are pushed into a single [`EventSender`] queue that is drained by
//! one consumer, so the archiver sees them strictly one at a time.
//!
//! Backends:
//! - [`memory::MemoryPlatform`]: in-process, used for tests and replays
//! - `discord::DiscordBackend` (feature `discord`): serenity gateway + REST

#[cfg(feature = "discord")]
pub mod discord;
pub mod memory;

use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::Result;

/// Default capacity of the event queue between a backend and the archiver.
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Sending half of the event queue, held by the backend.
pub type EventSender = mpsc::Sender<PlatformEvent>;

/// Receiving half of the event queue, drained by the orchestrator.
pub type EventReceiver = mpsc::Receiver<PlatformEvent>;

/// Create the event queue connecting a backend to the archiver.
#[must_use]
pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_QUEUE_CAPACITY)
}

/// Lazy, finite, non-restartable sequence of historical messages.
pub type HistoryStream<'a> = BoxStream<'a, Result<PlatformMessage>>;

/// Source of per-channel message history.
pub trait HistorySource: Send + Sync {
    /// Stream at most `limit` of the most recent messages in `channel`.
    ///
    /// Order may be newest-first or oldest-first. An error item ends the
    /// channel's history (permission denied, channel gone, ...).
    fn history<'a>(
        &'a self,
        server: &'a Server,
        channel: &'a Channel,
        limit: usize,
    ) -> HistoryStream<'a>;
}

/// Events delivered by a platform backend.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    /// Connection established and initial state received.
    Ready(ReadyInfo),
    /// A new message arrived on a channel the connection can see.
    MessageCreated(PlatformMessage),
}

/// Payload of the ready notification.
#[derive(Debug, Clone)]
pub struct ReadyInfo {
    /// The archiver's own identity on the platform.
    pub self_user: User,
    /// Visible servers, each with its channels.
    pub servers: Vec<Server>,
}

/// A top-level community (guild).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Platform identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Channels in platform order.
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl Server {
    /// Channels that can hold text messages, in platform order.
    pub fn text_channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter().filter(|c| c.kind.is_text())
    }

    /// Context reference for messages in this server.
    #[must_use]
    pub fn guild_ref(&self) -> GuildRef {
        GuildRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// A channel inside a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Platform identifier.
    pub id: String,
    /// Channel name, may be empty.
    pub name: String,
    /// Kind of channel.
    #[serde(default)]
    pub kind: ChannelKind,
}

impl Channel {
    /// Create a text channel.
    pub fn text(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: ChannelKind::Text,
        }
    }

    /// Context reference for messages in this channel.
    #[must_use]
    pub fn channel_ref(&self) -> ChannelRef {
        ChannelRef {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

/// Channel kinds as far as archiving cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Regular text channel.
    #[default]
    Text,
    /// Announcement/news channel (text-capable).
    Announcement,
    /// Voice or stage channel.
    Voice,
    /// Category grouping other channels.
    Category,
    /// Anything else (forums, directories, ...).
    Other,
}

impl ChannelKind {
    /// Whether history for this channel can be fetched as text messages.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text | Self::Announcement)
    }
}

/// A user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Platform identifier.
    pub id: String,
    /// Account name.
    pub name: String,
    /// Legacy four-digit discriminator; `None` or `"0"` for migrated accounts.
    #[serde(default)]
    pub discriminator: Option<String>,
}

impl User {
    /// Create a user without a discriminator.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            discriminator: None,
        }
    }

    /// Display form: `name#1234` for legacy accounts, `name` otherwise.
    #[must_use]
    pub fn display_name(&self) -> String {
        match self.discriminator.as_deref() {
            Some(d) if !d.is_empty() && d != "0" => format!("{}#{}", self.name, d),
            _ => self.name.clone(),
        }
    }
}

/// Channel context of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Channel identifier.
    pub id: String,
    /// Channel name; empty for direct messages.
    pub name: String,
}

/// Server context of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRef {
    /// Server identifier.
    pub id: String,
    /// Server name.
    pub name: String,
}

/// File attached to a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Download URL.
    pub url: String,
    /// Original file name.
    #[serde(default)]
    pub filename: String,
}

/// A message as the platform delivers it, with resolved context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformMessage {
    /// Message identifier, unique within its channel.
    pub id: String,
    /// Channel the message was posted in.
    pub channel: ChannelRef,
    /// Server, or `None` for direct messages.
    #[serde(default)]
    pub guild: Option<GuildRef>,
    /// Message author.
    pub author: User,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Last edit instant, if ever edited.
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    /// Text content, may be empty.
    #[serde(default)]
    pub content: String,
    /// Attachments in platform order.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Rich embeds as opaque structured values.
    #[serde(default)]
    pub embeds: Vec<serde_json::Value>,
    /// Whether the message is pinned.
    #[serde(default)]
    pub pinned: bool,
}
