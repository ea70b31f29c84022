//! Archiving pipeline.
//!
//! - [`BulkExporter`]: one pass over every in-scope text channel, written as a
//!   snapshot pair.
//! - [`LiveCapturer`]: appends each new in-scope message to the live log of its
//!   creation day.
//! - [`Orchestrator`]: drives both from platform events.

mod bulk;
mod live;
mod orchestrator;

pub use bulk::*;
pub use live::*;
pub use orchestrator::*;

use std::path::PathBuf;

use crate::config::{ArchiveConfig, RunMode};
use crate::export::FileSink;
use crate::filter::ChannelFilter;

/// Resolved settings for one archiver run.
#[derive(Debug, Clone)]
pub struct ArchiveSettings {
    /// Which halves of the pipeline run.
    pub mode: RunMode,
    /// Directory receiving snapshots and live logs.
    pub out_dir: PathBuf,
    /// Channel allow-list.
    pub filter: ChannelFilter,
    /// Messages fetched per channel during a bulk export.
    pub history_limit: usize,
}

impl ArchiveSettings {
    /// Sink writing under the output directory.
    #[must_use]
    pub fn sink(&self) -> FileSink {
        FileSink::new(&self.out_dir)
    }
}

impl From<&ArchiveConfig> for ArchiveSettings {
    fn from(config: &ArchiveConfig) -> Self {
        Self {
            mode: config.mode,
            out_dir: config.output_dir.clone(),
            filter: ChannelFilter::from_tokens(&config.channels),
            history_limit: config.history_limit,
        }
    }
}
