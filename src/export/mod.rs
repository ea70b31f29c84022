//! File sink for snapshots and live logs.
//!
//! Two write modes:
//! - **Snapshot**: a full JSON array plus a CSV table, each written as a new
//!   file (overwriting). An empty snapshot still produces the JSON file but no
//!   CSV file.
//! - **Append**: read the day's live log, append one record in memory, and
//!   rewrite the whole file. Unparseable prior content is discarded.
//!
//! Every write goes through a temporary file and an atomic rename. The append
//! path assumes one writer per file: two processes appending to the same live
//! log will lose records.

mod csv;
mod json;

pub use csv::*;
pub use json::*;

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;

/// Prefix of snapshot file names.
pub const SNAPSHOT_PREFIX: &str = "export_";

/// Prefix of live log file names.
pub const LIVE_LOG_PREFIX: &str = "live_";

/// Timestamp layout used in snapshot file names.
pub const SNAPSHOT_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Date layout used in live log file names.
pub const LIVE_LOG_DATE_FORMAT: &str = "%Y-%m-%d";

/// Output formats written by the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Indented JSON array.
    Json,
    /// CSV table with sorted union header.
    Csv,
}

impl ExportFormat {
    /// Get the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

/// Paths of one snapshot pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotPaths {
    /// JSON snapshot path.
    pub json: PathBuf,
    /// CSV snapshot path.
    pub csv: PathBuf,
}

/// Files actually produced by a snapshot write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotFiles {
    /// JSON snapshot, always written.
    pub json: PathBuf,
    /// CSV snapshot, `None` when there were no records.
    pub csv: Option<PathBuf>,
    /// Number of records written.
    pub records: usize,
}

/// Result of one live-log append.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendOutcome {
    /// Live log path.
    pub path: PathBuf,
    /// Number of records in the file after the append.
    pub total: usize,
    /// Whether unparseable prior content was discarded.
    pub recovered: bool,
}

/// Writes snapshots and live logs under one output directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    out_dir: PathBuf,
    json: JsonExporter,
    csv: CsvExporter,
}

impl FileSink {
    /// Create a sink rooted at `out_dir`. The directory is created on first write.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            json: JsonExporter::new().pretty(true),
            csv: CsvExporter::new(),
        }
    }

    /// Output directory.
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Snapshot file names derived from the creation instant.
    #[must_use]
    pub fn snapshot_paths(&self, at: DateTime<Utc>) -> SnapshotPaths {
        let stem = format!("{SNAPSHOT_PREFIX}{}", at.format(SNAPSHOT_TIMESTAMP_FORMAT));
        SnapshotPaths {
            json: self
                .out_dir
                .join(format!("{stem}.{}", ExportFormat::Json.extension())),
            csv: self
                .out_dir
                .join(format!("{stem}.{}", ExportFormat::Csv.extension())),
        }
    }

    /// Live log path for a UTC calendar day.
    #[must_use]
    pub fn live_log_path(&self, day: NaiveDate) -> PathBuf {
        self.out_dir.join(format!(
            "{LIVE_LOG_PREFIX}{}.{}",
            day.format(LIVE_LOG_DATE_FORMAT),
            ExportFormat::Json.extension()
        ))
    }

    /// Write a snapshot pair named after `at`.
    pub fn write_snapshot<T: Serialize>(&self, items: &[T], at: DateTime<Utc>) -> Result<SnapshotFiles> {
        let paths = self.snapshot_paths(at);
        write_json_snapshot(&self.json, &paths.json, items)?;
        let csv = write_csv_snapshot(&self.csv, &paths.csv, items)?.then_some(paths.csv);

        Ok(SnapshotFiles {
            json: paths.json,
            csv,
            records: items.len(),
        })
    }

    /// Append one item to the live log of `day`.
    pub fn append_live<T: Serialize>(&self, day: NaiveDate, item: &T) -> Result<AppendOutcome> {
        append_json(&self.json, &self.live_log_path(day), item)
    }
}

/// Write `items` as a JSON snapshot at `path`.
pub fn write_json_snapshot<T: Serialize>(exporter: &JsonExporter, path: &Path, items: &[T]) -> Result<()> {
    exporter.write_file(path, items)?;
    info!(path = %path.display(), records = items.len(), "Saved JSON");
    Ok(())
}

/// Write `items` as a CSV snapshot at `path`.
///
/// Returns `false` without touching the file system when `items` is empty.
pub fn write_csv_snapshot<T: Serialize>(exporter: &CsvExporter, path: &Path, items: &[T]) -> Result<bool> {
    if items.is_empty() {
        warn!(path = %path.display(), "No records to save to CSV, skipping");
        return Ok(false);
    }

    exporter.write_file(path, items)?;
    info!(path = %path.display(), records = items.len(), "Saved CSV");
    Ok(true)
}

/// Append one item to the JSON array at `path`, creating it if needed.
pub fn append_json<T: Serialize>(exporter: &JsonExporter, path: &Path, item: &T) -> Result<AppendOutcome> {
    let prior = read_prior_log(path)?;
    let recovered = matches!(prior, PriorLog::Corrupt { .. });
    if let PriorLog::Corrupt { reason } = &prior {
        warn!(
            path = %path.display(),
            %reason,
            "Existing live log is unreadable, starting it over"
        );
    }

    let mut items = prior.into_items();
    items.push(serde_json::to_value(item)?);
    exporter.write_file(path, &items)?;

    debug!(path = %path.display(), total = items.len(), "Appended record");
    Ok(AppendOutcome {
        path: path.to_path_buf(),
        total: items.len(),
        recovered,
    })
}
