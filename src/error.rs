//! Error types for bulk-import
//!
//! This module provides the error handling for the library:
//! - A top-level [`Error`] returned by every caller-facing operation
//! - Nested domain errors for persistence ([`DatabaseError`]) and queue rules ([`QueueError`])
//! - Machine-readable error codes for embedders that surface errors in a UI
//!
//! Per-entry import failures and inspection failures are never reported through
//! these types; they degrade to an entry status or an empty descriptor instead.

use thiserror::Error;

/// Result type alias for bulk-import operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for bulk-import
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "inspector.max_asset_bytes")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A queue rule rejected the requested edit
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outer container could not be read or a member could not be extracted
    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// The import call could not be issued
    #[error("import error: {0}")]
    Import(String),

    /// Entry, file or container member not found
    #[error("not found: {0}")]
    NotFound(String),

    /// External tool execution failed (importer or notification command)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Queue rule violations
///
/// Returned when a caller tries to edit the queue in a way that would break one
/// of its invariants (touching the in-flight entry, editing a display-only row,
/// clearing or restarting while a run is active).
#[derive(Debug, Error)]
pub enum QueueError {
    /// Operation is not allowed while a run is active
    #[error("cannot {operation} while the queue is running")]
    Running {
        /// The rejected operation (e.g., "clear", "start")
        operation: String,
    },

    /// The entry is the one currently being imported
    #[error("entry {key} is currently importing")]
    EntryInFlight {
        /// Source key of the in-flight entry
        key: String,
    },

    /// Sub-entries are display-only and cannot be edited directly
    #[error("entry {key} is a dependency row and cannot be edited")]
    SubEntry {
        /// Source key of the sub-entry
        key: String,
    },

    /// Index does not address an entry
    #[error("index {index} out of range for queue of {len} entries")]
    IndexOutOfRange {
        /// The requested index
        index: usize,
        /// Current queue length
        len: usize,
    },

    /// The queue cannot run until interrupted-import recovery has completed
    #[error("recovery has not completed")]
    RecoveryPending,
}

impl Error {
    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Queue(e) => match e {
                QueueError::Running { .. } => "queue_running",
                QueueError::EntryInFlight { .. } => "entry_in_flight",
                QueueError::SubEntry { .. } => "sub_entry",
                QueueError::IndexOutOfRange { .. } => "index_out_of_range",
                QueueError::RecoveryPending => "recovery_pending",
            },
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Archive(_) => "archive_error",
            Error::Import(_) => "import_error",
            Error::NotFound(_) => "not_found",
            Error::ExternalTool(_) => "external_tool_error",
            Error::Other(_) => "internal_error",
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn all_error_variants() -> Vec<(Error, &'static str)> {
        vec![
            (
                Error::Config {
                    message: "bad value".into(),
                    key: Some("import.bundle_extension".into()),
                },
                "config_error",
            ),
            (
                Error::Database(DatabaseError::QueryFailed("locked".into())),
                "database_error",
            ),
            (
                Error::Queue(QueueError::Running {
                    operation: "clear".into(),
                }),
                "queue_running",
            ),
            (
                Error::Queue(QueueError::EntryInFlight { key: "a".into() }),
                "entry_in_flight",
            ),
            (
                Error::Queue(QueueError::SubEntry { key: "vpm::a::b".into() }),
                "sub_entry",
            ),
            (
                Error::Queue(QueueError::IndexOutOfRange { index: 4, len: 2 }),
                "index_out_of_range",
            ),
            (Error::Queue(QueueError::RecoveryPending), "recovery_pending"),
            (
                Error::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone")),
                "io_error",
            ),
            (Error::Import("spawn failed".into()), "import_error"),
            (Error::NotFound("member".into()), "not_found"),
            (
                Error::ExternalTool("importer exited".into()),
                "external_tool_error",
            ),
            (Error::Other("unknown".into()), "internal_error"),
        ]
    }

    #[test]
    fn error_codes_match_variants() {
        for (error, expected) in all_error_variants() {
            assert_eq!(
                error.error_code(),
                expected,
                "wrong error code for {error:?}"
            );
        }
    }

    #[test]
    fn queue_error_messages_name_the_entry() {
        let err = Error::from(QueueError::EntryInFlight {
            key: "C:/bundles/A.unitypackage".into(),
        });
        assert_eq!(
            err.to_string(),
            "queue error: entry C:/bundles/A.unitypackage is currently importing"
        );

        let err = Error::from(QueueError::IndexOutOfRange { index: 3, len: 1 });
        assert_eq!(
            err.to_string(),
            "queue error: index 3 out of range for queue of 1 entries"
        );
    }

    #[test]
    fn config_error_display_omits_key() {
        let err = Error::Config {
            message: "max_asset_bytes must be greater than zero".into(),
            key: Some("inspector.max_asset_bytes".into()),
        };
        assert_eq!(
            err.to_string(),
            "configuration error: max_asset_bytes must be greater than zero"
        );
    }
}
