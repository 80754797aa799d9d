//! Database layer for bulk-import
//!
//! Handles SQLite persistence for the queue and the durable in-flight marker.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`]: Database lifecycle, schema migrations
//! - [`entries`]: Queue entry snapshot
//! - [`state`]: Runtime state (in-flight marker, interactive flag)

use crate::types::{BundleEntry, EntryStatus};
use sqlx::{FromRow, sqlite::SqlitePool};
use std::path::PathBuf;

mod entries;
mod migrations;
mod state;

/// Queue entry record from database
#[derive(Debug, Clone, FromRow)]
pub struct EntryRow {
    /// Position in the queue (0-based)
    pub position: i64,
    /// Unique source key
    pub source_key: String,
    /// Bundle file path
    pub path: String,
    /// Display name
    pub display_name: String,
    /// Whether the entry takes part in a run
    pub enabled: bool,
    /// Status code (see [`EntryStatus::to_i32`])
    pub status: i32,
    /// Owned temp file
    pub temp_path: Option<String>,
    /// Display-only dependency row
    pub is_sub_entry: bool,
    /// Declared package id
    pub package_id: Option<String>,
    /// Key of the declaring bundle
    pub parent_key: Option<String>,
}

impl From<EntryRow> for BundleEntry {
    fn from(row: EntryRow) -> Self {
        BundleEntry {
            path: PathBuf::from(row.path),
            source_key: row.source_key,
            display_name: row.display_name,
            enabled: row.enabled,
            status: EntryStatus::from_i32(row.status),
            temp_path: row.temp_path.map(PathBuf::from),
            is_sub_entry: row.is_sub_entry,
            package_id: row.package_id,
            parent_key: row.parent_key,
        }
    }
}

/// Database handle for bulk-import
pub struct Database {
    pool: SqlitePool,
}
