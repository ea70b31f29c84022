//! Storage-ready data model.
//!
//! A [`MessageRecord`] is the flat, serializable form of one chat message.
//! Snapshots and live logs are JSON arrays of records; CSV snapshots are one
//! row per record.

mod record;

pub use record::*;
