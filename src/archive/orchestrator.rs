//! Event loop wiring the exporter and the capturer to a platform backend.
//!
//! States: `Disconnected -> Connected -> [Exporting] -> Capturing`, or
//! `-> Done` when the mode does not capture. One consumer drains the event
//! queue, so exports and appends never overlap; messages that arrive during
//! an export wait in the queue and are captured afterwards.

use std::future::Future;
use std::ops::ControlFlow;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::RunMode;
use crate::platform::{EventReceiver, HistorySource, PlatformEvent, PlatformMessage, ReadyInfo};

use super::bulk::{BulkExporter, ExportSummary};
use super::live::{CaptureStats, LiveCapturer};
use super::ArchiveSettings;

/// Lifecycle state of the archiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiverState {
    /// Waiting for the ready notification.
    Disconnected,
    /// Ready received, nothing running yet.
    Connected,
    /// Bulk export in progress.
    Exporting,
    /// Live capture armed; terminal for capturing modes.
    Capturing,
    /// Export finished and capture not requested.
    Done,
}

/// Summary of one archiver run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Configured mode.
    pub mode: RunMode,
    /// State when the run ended.
    pub state: ArchiverState,
    /// States entered, in order, starting with `Disconnected`.
    pub transitions: Vec<ArchiverState>,
    /// Bulk export outcome, if one completed.
    pub export: Option<ExportSummary>,
    /// Bulk export failure, if the snapshot could not be written.
    pub export_error: Option<String>,
    /// Live capture counters.
    pub capture: CaptureStats,
    /// Message events dropped because they arrived before the ready notification.
    pub dropped_before_ready: usize,
    /// Whether the run was stopped by a shutdown request.
    pub interrupted: bool,
}

impl RunReport {
    fn new(mode: RunMode) -> Self {
        Self {
            mode,
            state: ArchiverState::Disconnected,
            transitions: vec![ArchiverState::Disconnected],
            export: None,
            export_error: None,
            capture: CaptureStats::default(),
            dropped_before_ready: 0,
            interrupted: false,
        }
    }
}

/// Drives the archiver from platform events.
pub struct Orchestrator<'a, H: HistorySource + ?Sized> {
    source: &'a H,
    settings: ArchiveSettings,
    capturer: Option<LiveCapturer>,
    report: RunReport,
}

impl<'a, H: HistorySource + ?Sized> Orchestrator<'a, H> {
    /// Create an orchestrator fetching history from `source`.
    pub fn new(source: &'a H, settings: ArchiveSettings) -> Self {
        let report = RunReport::new(settings.mode);
        Self {
            source,
            settings,
            capturer: None,
            report,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ArchiverState {
        self.report.state
    }

    /// Consume events until the queue closes, the mode completes, or `shutdown` resolves.
    pub async fn run<F>(mut self, mut events: EventReceiver, shutdown: F) -> RunReport
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let next = tokio::select! {
                biased;
                () = &mut shutdown => None,
                event = events.recv() => Some(event),
            };
            let Some(event) = next else {
                self.interrupt();
                break;
            };
            let Some(event) = event else {
                info!("Event stream closed");
                break;
            };

            let flow = tokio::select! {
                biased;
                () = &mut shutdown => None,
                flow = self.handle(event) => Some(flow),
            };
            match flow {
                None => {
                    self.interrupt();
                    break;
                }
                Some(ControlFlow::Break(())) => break,
                Some(ControlFlow::Continue(())) => {}
            }
        }

        self.finish()
    }

    /// Handle one platform event.
    pub async fn handle(&mut self, event: PlatformEvent) -> ControlFlow<()> {
        match event {
            PlatformEvent::Ready(info) => self.on_ready(info).await,
            PlatformEvent::MessageCreated(msg) => {
                self.on_message(&msg);
                ControlFlow::Continue(())
            }
        }
    }

    async fn on_ready(&mut self, info: ReadyInfo) -> ControlFlow<()> {
        if self.report.state != ArchiverState::Disconnected {
            info!(state = ?self.report.state, "Ready received again after reconnect");
            return ControlFlow::Continue(());
        }

        self.enter(ArchiverState::Connected);
        log_overview(&info);

        if self.settings.mode.exports() {
            self.enter(ArchiverState::Exporting);
            let exporter = BulkExporter::new(
                self.settings.sink(),
                self.settings.filter.clone(),
                self.settings.history_limit,
            );
            match exporter.export(self.source, &info.servers).await {
                Ok(summary) => self.report.export = Some(summary),
                Err(e) => {
                    error!(error = %e, "Bulk export could not be written");
                    self.report.export_error = Some(e.to_string());
                }
            }
        }

        if self.settings.mode.captures() {
            self.capturer = Some(LiveCapturer::new(
                self.settings.sink(),
                self.settings.filter.clone(),
                &info.self_user,
            ));
            self.enter(ArchiverState::Capturing);
            info!("Passive capture armed, waiting for new messages");
            ControlFlow::Continue(())
        } else {
            self.enter(ArchiverState::Done);
            ControlFlow::Break(())
        }
    }

    fn on_message(&mut self, msg: &PlatformMessage) {
        match self.capturer.as_mut() {
            Some(capturer) => {
                capturer.on_message(msg);
            }
            None if self.report.state == ArchiverState::Disconnected => {
                self.report.dropped_before_ready += 1;
                debug!(message_id = %msg.id, "Message before ready, dropping");
            }
            None => {
                debug!(message_id = %msg.id, state = ?self.report.state, "Capture not armed, dropping");
            }
        }
    }

    fn enter(&mut self, state: ArchiverState) {
        debug!(from = ?self.report.state, to = ?state, "State transition");
        self.report.state = state;
        self.report.transitions.push(state);
    }

    fn interrupt(&mut self) {
        warn!(state = ?self.report.state, "Shutdown requested, stopping");
        self.report.interrupted = true;
    }

    fn finish(mut self) -> RunReport {
        if let Some(capturer) = &self.capturer {
            self.report.capture = capturer.stats();
        }
        self.report
    }
}

/// Log every server and its text channels.
fn log_overview(info: &ReadyInfo) {
    info!(user = %info.self_user.display_name(), user_id = %info.self_user.id, "Logged in");
    for server in &info.servers {
        info!(server = %server.name, server_id = %server.id, "Server");
        for channel in server.text_channels() {
            info!(
                server = %server.name,
                channel = %channel.name,
                channel_id = %channel.id,
                "  channel"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::ChannelFilter;
    use crate::platform::memory::{synthetic_history, MemoryPlatform};
    use crate::platform::{event_queue, Channel, Server, User};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn platform() -> MemoryPlatform {
        let server = Server {
            id: "1".into(),
            name: "A".into(),
            channels: vec![Channel::text("10", "general")],
        };
        let start = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
        let history = synthetic_history(&server, &server.channels[0], &User::new("7", "alice"), start, 3);
        MemoryPlatform::new().with_server(server).with_history("10", history)
    }

    fn settings(dir: &std::path::Path, mode: RunMode) -> ArchiveSettings {
        ArchiveSettings {
            mode,
            out_dir: dir.to_path_buf(),
            filter: ChannelFilter::all(),
            history_limit: 5,
        }
    }

    fn live_message(platform: &MemoryPlatform, id: &str) -> PlatformMessage {
        let server = &platform.servers()[0];
        let mut msg = synthetic_history(
            server,
            &server.channels[0],
            &User::new("8", "bob"),
            Utc.with_ymd_and_hms(2025, 3, 5, 9, 0, 0).unwrap(),
            1,
        )
        .remove(0);
        msg.id = id.into();
        msg
    }

    #[tokio::test]
    async fn test_both_mode_exports_then_captures() {
        let dir = tempdir().unwrap();
        let platform = platform();
        let (tx, rx) = event_queue();
        let live = vec![live_message(&platform, "live-1")];
        assert!(platform.replay(&tx, User::new("bot", "archiver"), live).await);
        drop(tx);

        let report = Orchestrator::new(&platform, settings(dir.path(), RunMode::Both))
            .run(rx, std::future::pending())
            .await;

        assert_eq!(
            report.transitions,
            vec![
                ArchiverState::Disconnected,
                ArchiverState::Connected,
                ArchiverState::Exporting,
                ArchiverState::Capturing,
            ]
        );
        assert_eq!(report.export.unwrap().files.records, 3);
        assert_eq!(report.capture.captured, 1);
        assert!(dir.path().join("live_2025-03-05.json").exists());
        assert!(!report.interrupted);
    }

    #[tokio::test]
    async fn test_passive_mode_skips_export() {
        let dir = tempdir().unwrap();
        let platform = platform();
        let (tx, rx) = event_queue();
        assert!(platform.replay(&tx, User::new("bot", "archiver"), Vec::new()).await);
        drop(tx);

        let report = Orchestrator::new(&platform, settings(dir.path(), RunMode::Passive))
            .run(rx, std::future::pending())
            .await;

        assert_eq!(report.state, ArchiverState::Capturing);
        assert!(report.export.is_none());
        assert!(platform.requests().is_empty());
    }

    #[tokio::test]
    async fn test_active_mode_stops_after_export() {
        let dir = tempdir().unwrap();
        let platform = platform();
        let (tx, rx) = event_queue();
        let live = vec![live_message(&platform, "live-1")];
        assert!(platform.replay(&tx, User::new("bot", "archiver"), live).await);

        let report = Orchestrator::new(&platform, settings(dir.path(), RunMode::Active))
            .run(rx, std::future::pending())
            .await;

        assert_eq!(report.state, ArchiverState::Done);
        assert_eq!(report.capture, CaptureStats::default());
        assert!(!dir.path().join("live_2025-03-05.json").exists());
    }

    #[tokio::test]
    async fn test_messages_before_ready_are_dropped() {
        let dir = tempdir().unwrap();
        let platform = platform();
        let mut orchestrator = Orchestrator::new(&platform, settings(dir.path(), RunMode::Passive));

        let flow = orchestrator
            .handle(PlatformEvent::MessageCreated(live_message(&platform, "early")))
            .await;

        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(orchestrator.state(), ArchiverState::Disconnected);
        assert_eq!(orchestrator.finish().dropped_before_ready, 1);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_waiting_loop() {
        let dir = tempdir().unwrap();
        let platform = platform();
        let (_tx, rx) = event_queue();

        let report = Orchestrator::new(&platform, settings(dir.path(), RunMode::Both))
            .run(rx, async {})
            .await;

        assert!(report.interrupted);
        assert_eq!(report.state, ArchiverState::Disconnected);
    }
}
