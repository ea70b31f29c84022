//! chat-snatch: archive chat server history and new messages to JSON and CSV.
//!
//! On connect the archiver can take a one-off snapshot of recent history from
//! every in-scope text channel, and then keep appending each new message to a
//! per-day live log.
//!
//! # Quick Start
//!
//! Replay an in-memory server through the full pipeline:
//!
//! ```rust,no_run
//! use chat_snatch::archive::{ArchiveSettings, Orchestrator};
//! use chat_snatch::config::RunMode;
//! use chat_snatch::filter::ChannelFilter;
//! use chat_snatch::platform::memory::MemoryPlatform;
//! use chat_snatch::platform::{event_queue, Channel, Server, User};
//!
//! # async fn demo() {
//! let platform = MemoryPlatform::new().with_server(Server {
//!     id: "1".into(),
//!     name: "home".into(),
//!     channels: vec![Channel::text("10", "general")],
//! });
//! let (tx, rx) = event_queue();
//! platform.replay(&tx, User::new("99", "archiver"), Vec::new()).await;
//! drop(tx);
//!
//! let settings = ArchiveSettings {
//!     mode: RunMode::Active,
//!     out_dir: "exports".into(),
//!     filter: ChannelFilter::all(),
//!     history_limit: 500,
//! };
//! let report = Orchestrator::new(&platform, settings)
//!     .run(rx, std::future::pending())
//!     .await;
//! println!("{:?}", report.export);
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`platform`]: collaborator contract (events, history streams) and backends
//! - [`model`]: the flat [`MessageRecord`](model::MessageRecord)
//! - [`filter`]: channel allow-list shared by both archiving modes
//! - [`export`]: JSON/CSV snapshot and live-log file sink
//! - [`archive`]: bulk exporter, live capturer, and the orchestrating event loop
//! - [`config`]: configuration file and credential loading
//! - [`cli`]: command-line interface
//! - [`error`]: error types and exit codes

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod model;
pub mod platform;
pub mod util;

// Re-export commonly used types at the crate root
pub use error::{Result, SnatchError};
pub use model::MessageRecord;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::archive::{ArchiveSettings, BulkExporter, LiveCapturer, Orchestrator, RunReport};
    pub use crate::config::{Config, RunMode};
    pub use crate::error::{Result, SnatchError};
    pub use crate::export::FileSink;
    pub use crate::filter::ChannelFilter;
    pub use crate::model::MessageRecord;
    pub use crate::platform::{HistorySource, PlatformEvent, PlatformMessage};
}
