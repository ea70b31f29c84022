//! Live capture of new messages into per-day logs.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::export::{AppendOutcome, FileSink};
use crate::filter::ChannelFilter;
use crate::model::MessageRecord;
use crate::platform::{PlatformMessage, User};

/// What to do with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureAction {
    /// Append the record to the live log of `day`.
    Append {
        /// UTC calendar day of the message's creation.
        day: NaiveDate,
        /// Normalized record.
        record: MessageRecord,
    },
    /// Authored by the archiver's own identity.
    IgnoreSelfEcho,
    /// Channel excluded by the filter.
    IgnoreOutOfScope,
}

/// Running counters for the capture session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    /// Records appended to a live log.
    pub captured: usize,
    /// Events dropped as self-echo.
    pub self_echo: usize,
    /// Events dropped by the channel filter.
    pub out_of_scope: usize,
    /// Appends that failed with a storage error.
    pub failed: usize,
    /// Appends that discarded an unreadable live log first.
    pub recovered_logs: usize,
}

/// Appends each in-scope live message to the live log of its creation day.
///
/// Each live log path has exactly one writer for the lifetime of the process:
/// this capturer, driven by a single consumer.
#[derive(Debug, Clone)]
pub struct LiveCapturer {
    sink: FileSink,
    filter: ChannelFilter,
    self_id: String,
    stats: CaptureStats,
}

impl LiveCapturer {
    /// Create a capturer that ignores messages authored by `self_user`.
    pub fn new(sink: FileSink, filter: ChannelFilter, self_user: &User) -> Self {
        Self {
            sink,
            filter,
            self_id: self_user.id.clone(),
            stats: CaptureStats::default(),
        }
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Decide what to do with a message without touching storage.
    #[must_use]
    pub fn decide(&self, msg: &PlatformMessage) -> CaptureAction {
        if msg.author.id == self.self_id {
            return CaptureAction::IgnoreSelfEcho;
        }
        if !self.filter.in_scope(&msg.channel.id, &msg.channel.name) {
            return CaptureAction::IgnoreOutOfScope;
        }
        CaptureAction::Append {
            day: msg.created_at.date_naive(),
            record: MessageRecord::from_message(msg),
        }
    }

    /// Handle one live message event.
    ///
    /// Storage errors are logged and counted; they never stop the capture.
    pub fn on_message(&mut self, msg: &PlatformMessage) -> Option<AppendOutcome> {
        match self.decide(msg) {
            CaptureAction::IgnoreSelfEcho => {
                self.stats.self_echo += 1;
                debug!(message_id = %msg.id, "Ignoring own message");
                None
            }
            CaptureAction::IgnoreOutOfScope => {
                self.stats.out_of_scope += 1;
                debug!(message_id = %msg.id, channel = %msg.channel.name, "Channel out of scope");
                None
            }
            CaptureAction::Append { day, record } => match self.append(day, &record) {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    self.stats.failed += 1;
                    error!(
                        message_id = %record.id,
                        channel_id = %record.channel_id,
                        error = %e,
                        "Failed to append live message"
                    );
                    None
                }
            },
        }
    }

    fn append(&mut self, day: NaiveDate, record: &MessageRecord) -> Result<AppendOutcome> {
        let outcome = self.sink.append_live(day, record)?;
        self.stats.captured += 1;
        if outcome.recovered {
            self.stats.recovered_logs += 1;
        }
        info!(
            message_id = %record.id,
            path = %outcome.path.display(),
            total = outcome.total,
            "Captured new message"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{ChannelRef, GuildRef};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn message(id: &str, author: &str, channel: &str) -> PlatformMessage {
        PlatformMessage {
            id: id.into(),
            channel: ChannelRef {
                id: format!("{channel}-id"),
                name: channel.into(),
            },
            guild: Some(GuildRef {
                id: "1".into(),
                name: "A".into(),
            }),
            author: User::new(author, format!("user{author}")),
            created_at: Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap(),
            edited_at: None,
            content: "hi".into(),
            attachments: Vec::new(),
            embeds: Vec::new(),
            pinned: false,
        }
    }

    fn read_ids(path: &std::path::Path) -> Vec<String> {
        let records: Vec<MessageRecord> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        records.into_iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_decide() {
        let capturer = LiveCapturer::new(
            FileSink::new("/unused"),
            ChannelFilter::from_tokens(["general"]),
            &User::new("bot", "archiver"),
        );

        assert_eq!(
            capturer.decide(&message("1", "bot", "general")),
            CaptureAction::IgnoreSelfEcho
        );
        assert_eq!(
            capturer.decide(&message("2", "7", "random")),
            CaptureAction::IgnoreOutOfScope
        );
        assert!(matches!(
            capturer.decide(&message("3", "7", "general")),
            CaptureAction::Append { day, .. } if day == NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
        ));
    }

    #[test]
    fn test_self_echo_never_reaches_the_log() {
        let dir = tempdir().unwrap();
        let mut capturer = LiveCapturer::new(
            FileSink::new(dir.path()),
            ChannelFilter::all(),
            &User::new("bot", "archiver"),
        );

        assert!(capturer.on_message(&message("1", "bot", "general")).is_none());
        let outcome = capturer.on_message(&message("2", "7", "general")).unwrap();

        assert_eq!(read_ids(&outcome.path), vec!["2"]);
        assert_eq!(capturer.stats().self_echo, 1);
        assert_eq!(capturer.stats().captured, 1);
    }

    #[test]
    fn test_redelivered_message_is_appended_again() {
        let dir = tempdir().unwrap();
        let mut capturer = LiveCapturer::new(
            FileSink::new(dir.path()),
            ChannelFilter::all(),
            &User::new("bot", "archiver"),
        );

        capturer.on_message(&message("5", "7", "general"));
        let outcome = capturer.on_message(&message("5", "7", "general")).unwrap();

        assert_eq!(read_ids(&outcome.path), vec!["5", "5"]);
    }

    #[test]
    fn test_storage_failure_is_counted_not_raised() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let mut capturer = LiveCapturer::new(
            FileSink::new(blocker.join("out")),
            ChannelFilter::all(),
            &User::new("bot", "archiver"),
        );

        assert!(capturer.on_message(&message("1", "7", "general")).is_none());
        assert_eq!(capturer.stats().failed, 1);
        assert_eq!(capturer.stats().captured, 0);
    }
}
