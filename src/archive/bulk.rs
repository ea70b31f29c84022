//! Bulk export of channel history into one snapshot.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::Serialize;
use tracing::{debug, error, info, instrument};

use crate::error::Result;
use crate::export::{FileSink, SnapshotFiles};
use crate::filter::ChannelFilter;
use crate::model::MessageRecord;
use crate::platform::{Channel, HistorySource, Server};

/// Traversal statistics for one bulk export.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportStats {
    /// Text channels whose history was requested.
    pub channels_visited: usize,
    /// Text channels excluded by the channel filter.
    pub channels_skipped: usize,
    /// Channels whose history fetch failed (`server/#channel`).
    pub channels_failed: Vec<String>,
    /// Records dropped because their `(id, channel_id)` was already collected.
    pub duplicates_dropped: usize,
}

/// Outcome of a bulk export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    /// Files written.
    pub files: SnapshotFiles,
    /// Traversal statistics.
    pub stats: ExportStats,
}

/// Pulls history from every in-scope text channel and writes one snapshot.
#[derive(Debug, Clone)]
pub struct BulkExporter {
    sink: FileSink,
    filter: ChannelFilter,
    history_limit: usize,
}

impl BulkExporter {
    /// Create an exporter writing through `sink`.
    pub fn new(sink: FileSink, filter: ChannelFilter, history_limit: usize) -> Self {
        Self {
            sink,
            filter,
            history_limit,
        }
    }

    /// Upper bound of messages fetched per channel.
    #[must_use]
    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// Traverse all servers and write a snapshot named after the completion time.
    pub async fn export<H>(&self, source: &H, servers: &[Server]) -> Result<ExportSummary>
    where
        H: HistorySource + ?Sized,
    {
        let (records, stats) = self.collect(source, servers).await;
        self.write(&records, stats, Utc::now())
    }

    /// Write collected records as a snapshot named after `at`.
    pub fn write(&self, records: &[MessageRecord], stats: ExportStats, at: DateTime<Utc>) -> Result<ExportSummary> {
        let files = self.sink.write_snapshot(records, at)?;
        info!(
            records = files.records,
            channels = stats.channels_visited,
            failed = stats.channels_failed.len(),
            "Bulk export complete"
        );
        Ok(ExportSummary { files, stats })
    }

    /// Fetch and normalize history from every in-scope text channel.
    ///
    /// Records are grouped in traversal order, not sorted globally. A failing
    /// channel keeps the records fetched before the failure and does not stop
    /// the traversal.
    #[instrument(skip_all, fields(servers = servers.len(), limit = self.history_limit))]
    pub async fn collect<H>(&self, source: &H, servers: &[Server]) -> (Vec<MessageRecord>, ExportStats)
    where
        H: HistorySource + ?Sized,
    {
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut stats = ExportStats::default();

        for server in servers {
            info!(server = %server.name, server_id = %server.id, "Processing server");

            for channel in server.text_channels() {
                if !self.filter.in_scope(&channel.id, &channel.name) {
                    debug!(channel = %channel.name, channel_id = %channel.id, "Channel out of scope");
                    stats.channels_skipped += 1;
                    continue;
                }

                stats.channels_visited += 1;
                if let Err(e) = self
                    .collect_channel(source, server, channel, &mut records, &mut seen, &mut stats)
                    .await
                {
                    error!(
                        server = %server.name,
                        channel = %channel.name,
                        channel_id = %channel.id,
                        error = %e,
                        recoverable = e.is_recoverable(),
                        "Failed to read channel history, skipping"
                    );
                    stats
                        .channels_failed
                        .push(format!("{}/#{}", server.name, channel.name));
                }
            }
        }

        (records, stats)
    }

    async fn collect_channel<H>(
        &self,
        source: &H,
        server: &Server,
        channel: &Channel,
        records: &mut Vec<MessageRecord>,
        seen: &mut HashSet<(String, String)>,
        stats: &mut ExportStats,
    ) -> Result<()>
    where
        H: HistorySource + ?Sized,
    {
        info!(channel = %channel.name, channel_id = %channel.id, "Fetching channel history");

        let mut history = source.history(server, channel, self.history_limit);
        let mut fetched = 0usize;

        // The bound is enforced here as well, whatever the source does with it
        while fetched < self.history_limit {
            let Some(item) = history.next().await else {
                break;
            };
            let record = MessageRecord::from_message(&item?);
            fetched += 1;

            let (id, channel_id) = record.key();
            if seen.insert((id.to_owned(), channel_id.to_owned())) {
                records.push(record);
            } else {
                stats.duplicates_dropped += 1;
            }
        }

        debug!(channel = %channel.name, fetched, "Channel history done");
        Ok(())
    }
}
