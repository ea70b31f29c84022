//! Discord backend built on serenity.
//!
//! The gateway handler only converts and forwards events into the queue;
//! all archiving happens in the orchestrator. History is served through the
//! REST API, newest first.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serenity::all::{
    ChannelId, ChannelType, Client, Context, EventHandler, GatewayIntents, GuildChannel, Http,
    Message, Ready, Timestamp,
};
use serenity::async_trait;
use tracing::{debug, error, info, warn};

use crate::archive::{ArchiveSettings, Orchestrator, RunReport};
use crate::error::{Result, SnatchError};

use super::{
    event_queue, Attachment, Channel, ChannelKind, ChannelRef, EventSender, GuildRef,
    HistorySource, HistoryStream, PlatformEvent, PlatformMessage, ReadyInfo, Server, User,
};

/// Gateway intents needed for server listings and message content.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// Forwards gateway events into the event queue.
struct Forwarder {
    events: EventSender,
}

impl Forwarder {
    async fn forward(&self, event: PlatformEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Event queue closed, dropping event");
        }
    }
}

#[async_trait]
impl EventHandler for Forwarder {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, guilds = ready.guilds.len(), "Gateway ready");

        let mut servers = Vec::with_capacity(ready.guilds.len());
        for guild in &ready.guilds {
            match fetch_server(&ctx.http, guild.id).await {
                Ok(server) => servers.push(server),
                Err(e) => warn!(guild_id = %guild.id, error = %e, "Could not load server"),
            }
        }

        self.forward(PlatformEvent::Ready(ReadyInfo {
            self_user: convert_user(&ready.user),
            servers,
        }))
        .await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let channel = live_channel_ref(msg.channel_id, msg.channel_id.name(&ctx).await.ok());
        let guild = msg.guild_id.map(|id| GuildRef {
            id: id.to_string(),
            name: id.name(&ctx.cache).unwrap_or_default(),
        });

        self.forward(PlatformEvent::MessageCreated(convert_message(&msg, channel, guild)))
            .await;
    }
}

async fn fetch_server(http: &Http, id: serenity::all::GuildId) -> Result<Server> {
    let guild = id
        .to_partial_guild(http)
        .await
        .map_err(|e| SnatchError::Platform { message: e.to_string() })?;
    let mut channels: Vec<GuildChannel> = id
        .channels(http)
        .await
        .map_err(|e| SnatchError::Platform { message: e.to_string() })?
        .into_values()
        .collect();
    channels.sort_by_key(|c| (c.position, c.id));

    Ok(Server {
        id: id.to_string(),
        name: guild.name,
        channels: channels.iter().map(convert_channel).collect(),
    })
}

/// REST-backed history source.
#[derive(Clone)]
pub struct DiscordHistory {
    http: Arc<Http>,
}

impl DiscordHistory {
    /// Create a history source over an authenticated HTTP client.
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

impl HistorySource for DiscordHistory {
    fn history<'a>(&'a self, server: &'a Server, channel: &'a Channel, limit: usize) -> HistoryStream<'a> {
        let Some(id) = channel.id.parse::<u64>().ok().filter(|id| *id != 0) else {
            let err = SnatchError::fetch(&channel.name, format!("invalid channel id '{}'", channel.id));
            return stream::once(async move { Err(err) }).boxed();
        };

        let channel_ref = channel.channel_ref();
        let guild = server.guild_ref();
        ChannelId::new(id)
            .messages_iter(Arc::clone(&self.http))
            .take(limit)
            .map(move |item| {
                item.map(|msg| convert_message(&msg, channel_ref.clone(), Some(guild.clone())))
                    .map_err(|e| SnatchError::fetch(&channel.name, e.to_string()))
            })
            .boxed()
    }
}

/// A connected gateway client.
pub struct DiscordBackend {
    client: Client,
    events: super::EventReceiver,
}

impl DiscordBackend {
    /// Build the gateway client. Nothing is sent until [`DiscordBackend::run`].
    pub async fn connect(token: &SecretString) -> Result<Self> {
        let (tx, rx) = event_queue();
        let client = Client::builder(token.expose_secret(), intents())
            .event_handler(Forwarder { events: tx })
            .await
            .map_err(|e| SnatchError::Platform { message: e.to_string() })?;
        Ok(Self { client, events: rx })
    }

    /// Run the archiver until it finishes, the gateway stops, or `shutdown` resolves.
    pub async fn run<F>(self, settings: ArchiveSettings, shutdown: F) -> Result<RunReport>
    where
        F: Future<Output = ()>,
    {
        let Self { mut client, events } = self;
        let history = DiscordHistory::new(Arc::clone(&client.http));
        let shards = Arc::clone(&client.shard_manager);

        let gateway = tokio::spawn(async move { client.start().await });
        let report = Orchestrator::new(&history, settings).run(events, shutdown).await;
        shards.shutdown_all().await;

        match gateway.await {
            Ok(Ok(())) => Ok(report),
            Ok(Err(e)) => {
                error!(error = %e, "Gateway stopped");
                if report.transitions.len() > 1 {
                    Ok(report)
                } else {
                    Err(SnatchError::Platform { message: e.to_string() })
                }
            }
            Err(e) => Err(SnatchError::Platform { message: e.to_string() }),
        }
    }
}

fn convert_user(user: &serenity::all::User) -> User {
    User {
        id: user.id.to_string(),
        name: user.name.clone(),
        discriminator: user.discriminator.map(|d| format!("{:04}", d.get())),
    }
}

/// Channel of a gateway message; an unresolved name stays empty.
fn live_channel_ref(id: ChannelId, name: Option<String>) -> ChannelRef {
    ChannelRef {
        id: id.to_string(),
        name: name.unwrap_or_default(),
    }
}

fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Text => ChannelKind::Text,
        ChannelType::News => ChannelKind::Announcement,
        ChannelType::Voice | ChannelType::Stage => ChannelKind::Voice,
        ChannelType::Category => ChannelKind::Category,
        _ => ChannelKind::Other,
    }
}

fn convert_channel(channel: &GuildChannel) -> Channel {
    Channel {
        id: channel.id.to_string(),
        name: channel.name.clone(),
        kind: channel_kind(channel.kind),
    }
}

fn convert_timestamp(ts: Timestamp) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&ts.to_string())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::from_timestamp(ts.unix_timestamp(), 0).unwrap_or_default())
}

fn convert_message(msg: &Message, channel: ChannelRef, guild: Option<GuildRef>) -> PlatformMessage {
    PlatformMessage {
        id: msg.id.to_string(),
        channel,
        guild,
        author: convert_user(&msg.author),
        created_at: convert_timestamp(msg.timestamp),
        edited_at: msg.edited_timestamp.map(convert_timestamp),
        content: msg.content.clone(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment {
                url: a.url.clone(),
                filename: a.filename.clone(),
            })
            .collect(),
        embeds: msg
            .embeds
            .iter()
            .filter_map(|e| serde_json::to_value(e).ok())
            .collect(),
        pinned: msg.pinned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_channel_kind_mapping() {
        assert_eq!(channel_kind(ChannelType::Text), ChannelKind::Text);
        assert_eq!(channel_kind(ChannelType::News), ChannelKind::Announcement);
        assert_eq!(channel_kind(ChannelType::Voice), ChannelKind::Voice);
        assert_eq!(channel_kind(ChannelType::Stage), ChannelKind::Voice);
        assert_eq!(channel_kind(ChannelType::Category), ChannelKind::Category);
        assert_eq!(channel_kind(ChannelType::Forum), ChannelKind::Other);
        assert_eq!(channel_kind(ChannelType::PublicThread), ChannelKind::Other);
    }

    #[test]
    fn test_only_text_like_kinds_are_archived() {
        assert!(channel_kind(ChannelType::Text).is_text());
        assert!(channel_kind(ChannelType::News).is_text());
        assert!(!channel_kind(ChannelType::Voice).is_text());
        assert!(!channel_kind(ChannelType::Category).is_text());
    }

    #[test]
    fn test_unresolved_channel_name_is_empty() {
        let id = ChannelId::new(42);

        let unresolved = live_channel_ref(id, None);
        assert_eq!(unresolved.id, "42");
        assert_eq!(unresolved.name, "");

        assert_eq!(live_channel_ref(id, Some("general".into())).name, "general");
    }

    #[test]
    fn test_convert_timestamp_is_utc() {
        let ts = Timestamp::from_unix_timestamp(1_740_830_400).unwrap();
        assert_eq!(
            convert_timestamp(ts),
            Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_intents_include_message_content() {
        assert!(intents().contains(GatewayIntents::MESSAGE_CONTENT));
        assert!(intents().contains(GatewayIntents::GUILDS));
    }
}
