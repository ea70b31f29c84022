//! JSON arrays of records.
//!
//! Snapshots and live logs share one layout: a single top-level array of
//! record objects, UTF-8, indented for humans.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::util::{atomic_write_with, read_optional_bytes};

/// JSON array exporter.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    /// Pretty-print the JSON output.
    pretty: bool,
}

impl Default for JsonExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonExporter {
    /// Create a new JSON exporter (compact output).
    #[must_use]
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Enable pretty-printing.
    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Serialize `items` as one JSON array.
    pub fn write_array<W: Write + ?Sized, T: Serialize>(&self, writer: &mut W, items: &[T]) -> Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *writer, items)?;
        } else {
            serde_json::to_writer(&mut *writer, items)?;
        }
        writeln!(writer)?;
        Ok(())
    }

    /// Atomically replace `path` with `items` as one JSON array.
    pub fn write_file<T: Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        atomic_write_with(path, |writer| self.write_array(writer, items))
    }
}

/// State of an existing JSON array file before an append.
#[derive(Debug, Clone, PartialEq)]
pub enum PriorLog {
    /// No file at the path yet.
    Missing,
    /// File parsed as a JSON array.
    Loaded(Vec<Value>),
    /// File exists but is not a JSON array; its content is discarded.
    Corrupt {
        /// Parser message, for logging.
        reason: String,
    },
}

impl PriorLog {
    /// Items to append to; empty unless the file parsed.
    #[must_use]
    pub fn into_items(self) -> Vec<Value> {
        match self {
            Self::Loaded(items) => items,
            Self::Missing | Self::Corrupt { .. } => Vec::new(),
        }
    }
}

/// Read an existing JSON array file.
///
/// Only I/O failures other than "not found" are errors; unparseable content,
/// invalid UTF-8 included, is reported as [`PriorLog::Corrupt`].
pub fn read_prior_log(path: &Path) -> Result<PriorLog> {
    let Some(bytes) = read_optional_bytes(path)? else {
        return Ok(PriorLog::Missing);
    };

    Ok(match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Array(items)) => PriorLog::Loaded(items),
        Ok(other) => PriorLog::Corrupt {
            reason: format!("expected a JSON array, found {}", json_kind(&other)),
        },
        Err(e) => PriorLog::Corrupt {
            reason: e.to_string(),
        },
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
