//! Core types for bulk-import

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Key prefix of display-only dependency rows
pub const SUB_ENTRY_PREFIX: &str = "vpm";

/// Separator between the parts of a composite key
pub const KEY_SEPARATOR: &str = "::";

/// Entry status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Waiting to be imported
    Pending,
    /// Handed to the importer, waiting for its outcome
    Importing,
    /// Imported successfully
    Done,
    /// Import failed or the bundle file was missing
    Failed,
    /// Import cancelled by the importer or the user
    Cancelled,
}

impl EntryStatus {
    /// Convert integer status code to EntryStatus
    pub fn from_i32(status: i32) -> Self {
        match status {
            0 => EntryStatus::Pending,
            1 => EntryStatus::Importing,
            2 => EntryStatus::Done,
            3 => EntryStatus::Failed,
            4 => EntryStatus::Cancelled,
            _ => EntryStatus::Failed, // corrupted rows surface as failures instead of re-importing
        }
    }

    /// Convert EntryStatus to integer status code
    pub fn to_i32(&self) -> i32 {
        match self {
            EntryStatus::Pending => 0,
            EntryStatus::Importing => 1,
            EntryStatus::Done => 2,
            EntryStatus::Failed => 3,
            EntryStatus::Cancelled => 4,
        }
    }

    /// Whether the status is an import outcome
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            EntryStatus::Done | EntryStatus::Failed | EntryStatus::Cancelled
        )
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Importing => "importing",
            EntryStatus::Done => "done",
            EntryStatus::Failed => "failed",
            EntryStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// One row of the import queue
///
/// Importable rows point at a bundle file on disk. Rows created from a declared
/// dependency (`is_sub_entry`) are display-only: they are disabled, never
/// handed to the importer, and removed together with their parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Bundle file to import
    pub path: PathBuf,
    /// Unique key (normalized path, `container::member`, or `vpm::parent::package`)
    pub source_key: String,
    /// Name shown to the user
    pub display_name: String,
    /// Whether the entry takes part in a run
    pub enabled: bool,
    /// Current status
    pub status: EntryStatus,
    /// Extracted temp file owned by this entry, deleted when the entry resolves
    pub temp_path: Option<PathBuf>,
    /// Display-only dependency row
    pub is_sub_entry: bool,
    /// Declared package id (sub-entries only)
    pub package_id: Option<String>,
    /// Key of the bundle that declared this dependency (sub-entries only)
    pub parent_key: Option<String>,
}

impl BundleEntry {
    /// Entry for a bundle file on disk
    pub fn bundle(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            source_key: normalize_path(&path),
            display_name: display_name_for(&path),
            path,
            enabled: true,
            status: EntryStatus::Pending,
            temp_path: None,
            is_sub_entry: false,
            package_id: None,
            parent_key: None,
        }
    }

    /// Entry for a bundle extracted from an outer container to `extracted`
    ///
    /// The entry owns the extracted file.
    pub fn archive_member(source_key: String, member: &str, extracted: PathBuf) -> Self {
        Self {
            path: extracted.clone(),
            source_key,
            display_name: display_name_for(Path::new(member)),
            enabled: true,
            status: EntryStatus::Pending,
            temp_path: Some(extracted),
            is_sub_entry: false,
            package_id: None,
            parent_key: None,
        }
    }

    /// Display-only row for a dependency declared by `parent_key`
    pub fn dependency(parent_key: &str, package_id: &str, installed: bool) -> Self {
        Self {
            path: PathBuf::new(),
            source_key: sub_entry_key(parent_key, package_id),
            display_name: package_id.to_string(),
            enabled: false,
            status: if installed {
                EntryStatus::Done
            } else {
                EntryStatus::Pending
            },
            temp_path: None,
            is_sub_entry: true,
            package_id: Some(package_id.to_string()),
            parent_key: Some(parent_key.to_string()),
        }
    }

    /// Identity stored in the durable marker: the source key, or the display
    /// name for entries without one
    pub fn identity(&self) -> &str {
        if self.source_key.is_empty() {
            &self.display_name
        } else {
            &self.source_key
        }
    }

    /// Whether the entry was extracted from an outer container
    pub fn is_archive_member(&self) -> bool {
        !self.is_sub_entry && self.source_key.contains(KEY_SEPARATOR)
    }

    /// Whether `advance` may pick this entry
    pub fn is_selectable(&self) -> bool {
        self.enabled && !self.is_sub_entry && self.status == EntryStatus::Pending
    }

    /// Delete the owned temp file, if any
    ///
    /// Best effort and idempotent: the path is released before deletion, so a
    /// second call is a no-op. Returns whether a file was actually removed.
    pub fn delete_temp(&mut self) -> bool {
        let Some(path) = self.temp_path.take() else {
            return false;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "deleted temp file");
                true
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "failed to delete temp file");
                false
            }
        }
    }
}

/// Key of the dependency row for `package_id` declared by `parent_key`
pub fn sub_entry_key(parent_key: &str, package_id: &str) -> String {
    format!("{SUB_ENTRY_PREFIX}{KEY_SEPARATOR}{parent_key}{KEY_SEPARATOR}{package_id}")
}

/// Path as a key: lossy UTF-8 with `\` replaced by `/`
pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// File name without its extension, treating `\` as a separator on every platform
pub fn display_name_for(path: &Path) -> String {
    let normalized = normalize_path(path);
    let file_name = normalized.rsplit('/').next().unwrap_or(&normalized);
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}

/// Opaque handle correlating an import call with its outcome signal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportJobId(pub u64);

impl std::fmt::Display for ImportJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an import call ended
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ImportOutcome {
    /// Bundle imported
    Completed,
    /// Import failed
    Failed {
        /// Importer's error message
        message: String,
    },
    /// Import cancelled before it finished
    Cancelled,
}

impl ImportOutcome {
    /// Entry status this outcome resolves to
    pub fn status(&self) -> EntryStatus {
        match self {
            ImportOutcome::Completed => EntryStatus::Done,
            ImportOutcome::Failed { .. } => EntryStatus::Failed,
            ImportOutcome::Cancelled => EntryStatus::Cancelled,
        }
    }
}

/// Asynchronous outcome of one import call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSignal {
    /// Job the outcome belongs to
    pub job: ImportJobId,
    /// Outcome
    pub outcome: ImportOutcome,
}

/// Orchestrator run state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// Not processing the queue
    #[default]
    Idle,
    /// Processing the queue one entry at a time
    Running,
}

/// Read-only view of the queue
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Entries in processing order
    pub entries: Vec<BundleEntry>,
    /// Interactive flag passed to the importer
    pub interactive: bool,
    /// Run state
    pub state: RunState,
    /// Identity of the entry being imported, if any
    pub current: Option<String>,
}

impl QueueSnapshot {
    /// Number of entries with the given status
    pub fn count(&self, status: EntryStatus) -> usize {
        self.entries.iter().filter(|e| e.status == status).count()
    }

    /// Entry with the given source key
    pub fn entry(&self, source_key: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|e| e.source_key == source_key)
    }
}

/// Importable-entry counts reported when the queue drains
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainSummary {
    /// Entries imported
    pub done: usize,
    /// Entries that failed
    pub failed: usize,
    /// Entries cancelled
    pub cancelled: usize,
    /// Entries still pending (disabled ones)
    pub pending: usize,
}

impl DrainSummary {
    /// Count the importable entries of a queue
    pub fn from_entries(entries: &[BundleEntry]) -> Self {
        let mut summary = Self::default();
        for entry in entries.iter().filter(|e| !e.is_sub_entry) {
            match entry.status {
                EntryStatus::Done => summary.done += 1,
                EntryStatus::Failed => summary.failed += 1,
                EntryStatus::Cancelled => summary.cancelled += 1,
                EntryStatus::Pending | EntryStatus::Importing => summary.pending += 1,
            }
        }
        summary
    }
}

/// Result of the interrupted-import recovery pass
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryReport {
    /// Identity of the entry resolved from the durable marker
    pub resolved: Option<String>,
    /// Status the marker entry was resolved to
    pub resolved_status: Option<EntryStatus>,
    /// Number of other interrupted entries returned to pending
    pub demoted: usize,
}

/// Event emitted after every queue or orchestrator state change
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Entry added to the queue
    EntryAdded {
        /// Source key
        key: String,
        /// Display name
        name: String,
        /// Whether the entry is a dependency row
        sub_entry: bool,
    },

    /// Entry removed (sub-entries removed with it are reported separately)
    EntryRemoved {
        /// Source key
        key: String,
    },

    /// Entry enabled or disabled
    EntryToggled {
        /// Source key
        key: String,
        /// New enabled flag
        enabled: bool,
    },

    /// All entries removed
    QueueCleared {
        /// Number of entries removed
        removed: usize,
    },

    /// Entry status changed
    StatusChanged {
        /// Source key
        key: String,
        /// New status
        status: EntryStatus,
    },

    /// Import call issued for an entry
    ImportStarted {
        /// Source key
        key: String,
        /// Job handle of the call
        job: ImportJobId,
    },

    /// Run started
    QueueStarted {
        /// Entries selectable at start
        pending: usize,
    },

    /// Run stopped by the user or the owner
    QueueStopped {
        /// Entry that was in flight, if any
        interrupted: Option<String>,
    },

    /// No selectable entries left; run finished
    QueueDrained {
        /// Final counts
        summary: DrainSummary,
    },

    /// Interrupted-import recovery ran
    Recovered {
        /// Recovery result
        report: RecoveryReport,
    },

    /// Interactive flag changed
    InteractiveChanged {
        /// New flag
        interactive: bool,
    },
}
