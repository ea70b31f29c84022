//! CSV export for record snapshots.
//!
//! The header is the sorted union of keys across all rows, so a field present
//! in only some rows still lines up. Missing keys render as empty cells.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, SnatchError};
use crate::util::atomic_write_with;

/// One CSV row keyed by column name.
pub type Row = Map<String, Value>;

/// CSV exporter for flat objects.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    /// Include header row.
    include_header: bool,
    /// Field delimiter.
    delimiter: char,
    /// Quote character.
    quote_char: char,
    /// Record terminator.
    line_terminator: &'static str,
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvExporter {
    /// Create a new CSV exporter (comma separated, CRLF rows, with header).
    #[must_use]
    pub fn new() -> Self {
        Self {
            include_header: true,
            delimiter: ',',
            quote_char: '"',
            line_terminator: "\r\n",
        }
    }

    /// Include or exclude header row.
    #[must_use]
    pub fn with_header(mut self, include: bool) -> Self {
        self.include_header = include;
        self
    }

    /// Set the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delim: char) -> Self {
        self.delimiter = delim;
        self
    }

    /// Escape a field value for CSV.
    fn escape_field<'a>(&self, value: &'a str) -> Cow<'a, str> {
        let needs_quoting = value.contains(self.delimiter)
            || value.contains(self.quote_char)
            || value.contains('\n')
            || value.contains('\r');

        if needs_quoting {
            let escaped = value.replace(
                self.quote_char,
                &format!("{}{}", self.quote_char, self.quote_char),
            );
            Cow::Owned(format!("{}{}{}", self.quote_char, escaped, self.quote_char))
        } else {
            Cow::Borrowed(value)
        }
    }

    /// Write a CSV row.
    fn write_row<W: Write + ?Sized, S: AsRef<str>>(&self, writer: &mut W, fields: &[S]) -> Result<()> {
        let line: Vec<Cow<'_, str>> = fields.iter().map(|f| self.escape_field(f.as_ref())).collect();
        write!(
            writer,
            "{}{}",
            line.join(&self.delimiter.to_string()),
            self.line_terminator
        )?;
        Ok(())
    }

    /// Write rows under the sorted union of their keys.
    pub fn write_rows<W: Write + ?Sized>(&self, writer: &mut W, rows: &[Row]) -> Result<()> {
        let columns = columns(rows);

        if self.include_header {
            self.write_row(writer, &columns)?;
        }

        for row in rows {
            let cells: Vec<Cow<'_, str>> = columns
                .iter()
                .map(|key| row.get(key).map_or(Cow::Borrowed(""), render_value))
                .collect();
            self.write_row(writer, &cells)?;
        }

        Ok(())
    }

    /// Atomically replace `path` with `items` as CSV.
    ///
    /// Every item must serialize to a JSON object.
    pub fn write_file<T: Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        let rows = to_rows(items)?;
        atomic_write_with(path, |writer| self.write_rows(writer, &rows))
    }
}

/// Sorted union of keys across rows.
#[must_use]
pub fn columns(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .flat_map(|row| row.keys().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Convert serializable items to CSV rows.
pub fn to_rows<T: Serialize>(items: &[T]) -> Result<Vec<Row>> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match serde_json::to_value(item)? {
            Value::Object(map) => Ok(map),
            _ => Err(SnatchError::export(format!(
                "CSV row {index} is not an object"
            ))),
        })
        .collect()
}

/// Render one cell: strings verbatim, scalars as text, nested values as compact JSON.
fn render_value(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s),
        Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
        Value::Number(n) => Cow::Owned(n.to_string()),
        Value::Array(_) | Value::Object(_) => Cow::Owned(value.to_string()),
    }
}
