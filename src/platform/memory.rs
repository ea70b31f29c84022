//! In-process platform backend.
//!
//! Holds a fixed set of servers and per-channel histories in memory. Used by
//! the test suite and by library users replaying captured data offline.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};

use crate::error::SnatchError;

use super::{
    Channel, EventSender, HistorySource, HistoryStream, PlatformEvent, PlatformMessage, ReadyInfo,
    Server, User,
};

/// Recorded history request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRequest {
    /// Channel id the history was requested for.
    pub channel_id: String,
    /// Requested upper bound.
    pub limit: usize,
}

/// In-memory [`HistorySource`] with scripted failures.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    servers: Vec<Server>,
    /// Newest-first history per channel id.
    histories: HashMap<String, Vec<PlatformMessage>>,
    /// Channel id -> number of messages yielded before the fetch fails.
    failures: HashMap<String, usize>,
    requests: Mutex<Vec<HistoryRequest>>,
}

impl MemoryPlatform {
    /// Create an empty platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a server.
    #[must_use]
    pub fn with_server(mut self, server: Server) -> Self {
        self.servers.push(server);
        self
    }

    /// Set the history of a channel (any order; stored newest-first).
    #[must_use]
    pub fn with_history(mut self, channel_id: impl Into<String>, mut messages: Vec<PlatformMessage>) -> Self {
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.histories.insert(channel_id.into(), messages);
        self
    }

    /// Make history fetches for a channel fail after `after` messages.
    #[must_use]
    pub fn with_failure(mut self, channel_id: impl Into<String>, after: usize) -> Self {
        self.failures.insert(channel_id.into(), after);
        self
    }

    /// Servers known to this platform.
    #[must_use]
    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Ready payload announcing `self_user` and all servers.
    #[must_use]
    pub fn ready_info(&self, self_user: User) -> ReadyInfo {
        ReadyInfo {
            self_user,
            servers: self.servers.clone(),
        }
    }

    /// History requests served so far, in request order.
    #[must_use]
    pub fn requests(&self) -> Vec<HistoryRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Push the ready notification followed by `messages` as live events.
    ///
    /// Returns `false` once the receiving side has gone away.
    pub async fn replay(&self, events: &EventSender, self_user: User, messages: Vec<PlatformMessage>) -> bool {
        if events
            .send(PlatformEvent::Ready(self.ready_info(self_user)))
            .await
            .is_err()
        {
            return false;
        }
        for message in messages {
            if events.send(PlatformEvent::MessageCreated(message)).await.is_err() {
                return false;
            }
        }
        true
    }
}

impl HistorySource for MemoryPlatform {
    fn history<'a>(&'a self, _server: &'a Server, channel: &'a Channel, limit: usize) -> HistoryStream<'a> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(HistoryRequest {
                channel_id: channel.id.clone(),
                limit,
            });

        let messages = self.histories.get(&channel.id).map_or(&[][..], Vec::as_slice);
        let ok = stream::iter(messages.iter().take(limit).cloned().map(Ok));

        match self.failures.get(&channel.id) {
            Some(&after) => {
                let name = channel.name.clone();
                ok.take(after)
                    .chain(stream::once(async move {
                        Err(SnatchError::fetch(name, "403 Forbidden: Missing Access"))
                    }))
                    .boxed()
            }
            None => ok.boxed(),
        }
    }
}

/// Build `count` synthetic messages for a channel, one minute apart starting at `start`.
///
/// Ids are `"{channel_id}-{n}"` so they stay unique across channels.
#[must_use]
pub fn synthetic_history(
    server: &Server,
    channel: &Channel,
    author: &User,
    start: DateTime<Utc>,
    count: usize,
) -> Vec<PlatformMessage> {
    (0..count)
        .map(|n| PlatformMessage {
            id: format!("{}-{}", channel.id, n),
            channel: channel.channel_ref(),
            guild: Some(server.guild_ref()),
            author: author.clone(),
            created_at: start + Duration::minutes(i64::try_from(n).unwrap_or_default()),
            edited_at: None,
            content: format!("message {n} in #{}", channel.name),
            attachments: Vec::new(),
            embeds: Vec::new(),
            pinned: false,
        })
        .collect()
}

/// Channel ids for which a history request was recorded.
#[must_use]
pub fn requested_channels(requests: &[HistoryRequest]) -> HashSet<String> {
    requests.iter().map(|r| r.channel_id.clone()).collect()
}
