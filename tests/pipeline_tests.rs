//! Integration tests for chat-snatch.
//!
//! These tests drive the full archiving pipeline over in-memory servers and
//! check the files it leaves behind.

use std::path::Path;

use chat_snatch::archive::{ArchiveSettings, ArchiverState, BulkExporter, Orchestrator};
use chat_snatch::config::RunMode;
use chat_snatch::export::FileSink;
use chat_snatch::filter::ChannelFilter;
use chat_snatch::model::MessageRecord;
use chat_snatch::platform::event_queue;
use chat_snatch::platform::memory::requested_channels;
use chrono::{TimeZone, Utc};
use tempfile::tempdir;

mod generators;

use generators::{alice, archiver, live_message, two_servers, PlatformBuilder};

fn settings(out: &Path, mode: RunMode, channels: &[&str], limit: usize) -> ArchiveSettings {
    ArchiveSettings {
        mode,
        out_dir: out.to_path_buf(),
        filter: ChannelFilter::from_tokens(channels.iter().copied()),
        history_limit: limit,
    }
}

fn read_records(path: &Path) -> Vec<MessageRecord> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse {}: {}", path.display(), e))
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with(prefix))
        .collect();
    names.sort();
    names
}

mod bulk_export {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_filtered_export_over_two_servers() {
        let dir = tempdir().unwrap();
        let platform = two_servers();
        let (tx, rx) = event_queue();
        platform.replay(&tx, archiver(), Vec::new()).await;
        drop(tx);

        let report = Orchestrator::new(
            &platform,
            settings(dir.path(), RunMode::Active, &["general", "ops"], 5),
        )
        .run(rx, std::future::pending())
        .await;

        let export = report.export.expect("snapshot written");
        let records = read_records(&export.files.json);
        assert_eq!(records.len(), 10);
        assert!(records.iter().all(|r| r.channel_name != "random"));
        assert_eq!(
            records.iter().filter(|r| r.channel_name == "general").count(),
            5
        );

        let requested = requested_channels(&platform.requests());
        assert!(!requested.contains("20"), "random must never be fetched");
        assert_eq!(requested.len(), 2);

        let csv = std::fs::read_to_string(export.files.csv.expect("csv written")).unwrap();
        let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(lines.len(), 11);
        assert!(lines[0].starts_with("attachments,author_id,author_name,"));
        assert_eq!(report.state, ArchiverState::Done);
    }

    #[tokio::test]
    async fn test_snapshot_round_trips_through_json() {
        let dir = tempdir().unwrap();
        let platform = two_servers();
        let servers = platform.servers().to_vec();
        let exporter = BulkExporter::new(FileSink::new(dir.path()), ChannelFilter::all(), 3);

        let (records, stats) = exporter.collect(&platform, &servers).await;
        let at = Utc.with_ymd_and_hms(2025, 3, 2, 8, 0, 0).unwrap();
        let summary = exporter.write(&records, stats, at).unwrap();

        assert_eq!(read_records(&summary.files.json), records);
        assert_eq!(summary.stats.channels_visited, 3);
        assert_eq!(
            files_with_prefix(dir.path(), "export_"),
            vec!["export_20250302T080000Z.csv", "export_20250302T080000Z.json"]
        );
    }

    #[tokio::test]
    async fn test_failing_channel_keeps_partial_history() {
        let dir = tempdir().unwrap();
        let platform = PlatformBuilder::new()
            .server("100", "A", &[("10", "general", 10)])
            .server("200", "B", &[("30", "ops", 30)])
            .failing("30", 2)
            .build();
        let servers = platform.servers().to_vec();
        let exporter = BulkExporter::new(FileSink::new(dir.path()), ChannelFilter::all(), 5);

        let summary = exporter.export(&platform, &servers).await.unwrap();
        let records = read_records(&summary.files.json);

        assert_eq!(summary.stats.channels_failed, vec!["B/#ops".to_string()]);
        assert_eq!(records.iter().filter(|r| r.channel_id == "10").count(), 5);
        assert_eq!(records.iter().filter(|r| r.channel_id == "30").count(), 2);
    }

    #[tokio::test]
    async fn test_non_text_channels_are_never_fetched() {
        let dir = tempdir().unwrap();
        let platform = PlatformBuilder::new()
            .server("100", "A", &[("10", "general", 2)])
            .voice_channel("11", "lounge")
            .build();
        let servers = platform.servers().to_vec();
        let exporter = BulkExporter::new(FileSink::new(dir.path()), ChannelFilter::all(), 5);

        exporter.export(&platform, &servers).await.unwrap();

        let requested = requested_channels(&platform.requests());
        assert_eq!(requested.len(), 1);
        assert!(requested.contains("10"));
    }

    #[tokio::test]
    async fn test_empty_scope_writes_empty_json_and_no_csv() {
        let dir = tempdir().unwrap();
        let platform = two_servers();
        let servers = platform.servers().to_vec();
        let exporter = BulkExporter::new(
            FileSink::new(dir.path()),
            ChannelFilter::from_tokens(["does-not-exist"]),
            5,
        );

        let summary = exporter.export(&platform, &servers).await.unwrap();

        assert!(read_records(&summary.files.json).is_empty());
        assert_eq!(summary.files.csv, None);
        assert!(platform.requests().is_empty());
    }
}

mod live_capture {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_capture_routes_by_day_and_scope() {
        let dir = tempdir().unwrap();
        let platform = two_servers();
        let day_one = Utc.with_ymd_and_hms(2025, 4, 1, 23, 59, 0).unwrap();
        let day_two = Utc.with_ymd_and_hms(2025, 4, 2, 0, 1, 0).unwrap();
        let live = vec![
            live_message(&platform, "10", "m1", &alice(), day_one),
            live_message(&platform, "10", "echo", &archiver(), day_one),
            live_message(&platform, "20", "m2", &alice(), day_one),
            live_message(&platform, "30", "m3", &alice(), day_two),
        ];
        let (tx, rx) = event_queue();
        platform.replay(&tx, archiver(), live).await;
        drop(tx);

        let report = Orchestrator::new(
            &platform,
            settings(dir.path(), RunMode::Passive, &["general", "ops"], 5),
        )
        .run(rx, std::future::pending())
        .await;

        assert_eq!(report.capture.captured, 2);
        assert_eq!(report.capture.self_echo, 1);
        assert_eq!(report.capture.out_of_scope, 1);
        assert_eq!(
            files_with_prefix(dir.path(), "live_"),
            vec!["live_2025-04-01.json", "live_2025-04-02.json"]
        );
        let first: Vec<String> = read_records(&dir.path().join("live_2025-04-01.json"))
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(first, vec!["m1"]);
        assert!(files_with_prefix(dir.path(), "export_").is_empty());
    }

    #[tokio::test]
    async fn test_live_log_recovers_from_corruption() {
        let dir = tempdir().unwrap();
        let platform = two_servers();
        let at = Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap();
        std::fs::write(dir.path().join("live_2025-04-01.json"), "{ truncated").unwrap();
        let (tx, rx) = event_queue();
        platform
            .replay(&tx, archiver(), vec![live_message(&platform, "10", "m1", &alice(), at)])
            .await;
        drop(tx);

        let report = Orchestrator::new(&platform, settings(dir.path(), RunMode::Passive, &[], 5))
            .run(rx, std::future::pending())
            .await;

        assert_eq!(report.capture.recovered_logs, 1);
        let records = read_records(&dir.path().join("live_2025-04-01.json"));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "m1");
    }

    #[tokio::test]
    async fn test_both_mode_captures_messages_queued_during_export() {
        let dir = tempdir().unwrap();
        let platform = two_servers();
        let at = Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap();
        let live = (0..3)
            .map(|n| live_message(&platform, "30", &format!("q{n}"), &alice(), at))
            .collect();
        let (tx, rx) = event_queue();
        platform.replay(&tx, archiver(), live).await;
        drop(tx);

        let report = Orchestrator::new(&platform, settings(dir.path(), RunMode::Both, &[], 5))
            .run(rx, std::future::pending())
            .await;

        assert_eq!(report.state, ArchiverState::Capturing);
        assert_eq!(report.export.unwrap().files.records, 15);
        let ids: Vec<String> = read_records(&dir.path().join("live_2025-04-01.json"))
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["q0", "q1", "q2"]);
    }
}
