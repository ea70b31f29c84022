//! Synthetic platforms for integration tests.
//!
//! Every channel gets a history of `n` messages, one minute apart, with ids
//! `"{channel_id}-{k}"` so records from different channels never collide.

#![allow(dead_code)]

use chat_snatch::platform::memory::{synthetic_history, MemoryPlatform};
use chat_snatch::platform::{Channel, ChannelKind, PlatformMessage, Server, User};
use chrono::{DateTime, TimeZone, Utc};

/// Identity of the archiver in every scenario.
pub fn archiver() -> User {
    User::new("999", "archiver")
}

/// A human author.
pub fn alice() -> User {
    User::new("7", "alice")
}

/// Start instant of every synthetic history.
pub fn history_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

/// Builds a [`MemoryPlatform`] channel by channel.
#[derive(Default)]
pub struct PlatformBuilder {
    servers: Vec<Server>,
    counts: Vec<(String, usize)>,
    failures: Vec<(String, usize)>,
}

impl PlatformBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server whose text channels each hold `(id, name, count)` messages.
    pub fn server(mut self, id: &str, name: &str, channels: &[(&str, &str, usize)]) -> Self {
        self.servers.push(Server {
            id: id.into(),
            name: name.into(),
            channels: channels
                .iter()
                .map(|(cid, cname, _)| Channel::text(*cid, *cname))
                .collect(),
        });
        self.counts
            .extend(channels.iter().map(|(cid, _, count)| ((*cid).to_string(), *count)));
        self
    }

    /// Add a voice channel to the last server added.
    pub fn voice_channel(mut self, id: &str, name: &str) -> Self {
        if let Some(last) = self.servers.last_mut() {
            last.channels.push(Channel {
                id: id.into(),
                name: name.into(),
                kind: ChannelKind::Voice,
            });
        }
        self
    }

    /// Fail a channel's history after `after` messages.
    pub fn failing(mut self, channel_id: &str, after: usize) -> Self {
        self.failures.push((channel_id.into(), after));
        self
    }

    pub fn build(self) -> MemoryPlatform {
        let mut platform = MemoryPlatform::new();
        for server in &self.servers {
            platform = platform.with_server(server.clone());
            for channel in server.text_channels() {
                let count = self
                    .counts
                    .iter()
                    .find(|(id, _)| *id == channel.id)
                    .map_or(0, |(_, n)| *n);
                let history = synthetic_history(server, channel, &alice(), history_start(), count);
                platform = platform.with_history(channel.id.clone(), history);
            }
        }
        for (channel_id, after) in self.failures {
            platform = platform.with_failure(channel_id, after);
        }
        platform
    }
}

/// Server A {general: 10, random: 20}, server B {ops: 30}.
pub fn two_servers() -> MemoryPlatform {
    PlatformBuilder::new()
        .server("100", "A", &[("10", "general", 10), ("20", "random", 20)])
        .server("200", "B", &[("30", "ops", 30)])
        .build()
}

/// One live message in `channel` of `server`, authored by `author`, at `at`.
pub fn live_message(
    platform: &MemoryPlatform,
    channel_id: &str,
    id: &str,
    author: &User,
    at: DateTime<Utc>,
) -> PlatformMessage {
    let (server, channel) = platform
        .servers()
        .iter()
        .flat_map(|s| s.channels.iter().map(move |c| (s, c)))
        .find(|(_, c)| c.id == channel_id)
        .unwrap_or_else(|| panic!("no channel {channel_id}"));
    let mut msg = synthetic_history(server, channel, author, at, 1).remove(0);
    msg.id = id.into();
    msg.content = format!("live {id}");
    msg
}
