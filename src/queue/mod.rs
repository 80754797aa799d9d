//! Queue model
//!
//! [`BundleQueue`] owns the ordered entries, the interactive flag and the
//! identity of the entry being imported. It enforces the queue rules:
//! unique keys, at most one importing entry, display-only dependency rows,
//! and no edits to the in-flight entry. It does no I/O apart from deleting
//! temp files owned by removed or resolved entries.

mod collect;

pub use collect::collect_bundle_paths;

use crate::error::QueueError;
use crate::inspector::DependencyDescriptor;
use crate::probe::PackageProbe;
use crate::types::{BundleEntry, EntryStatus, sub_entry_key};

/// Ordered import queue
#[derive(Debug, Clone, Default)]
pub struct BundleQueue {
    entries: Vec<BundleEntry>,
    interactive: bool,
    in_flight: Option<String>,
}

impl BundleQueue {
    /// Create an empty queue
    pub fn new(interactive: bool) -> Self {
        Self {
            entries: vec![],
            interactive,
            in_flight: None,
        }
    }

    /// Rebuild a queue from persisted entries
    ///
    /// The in-flight identity is never persisted here; entries left importing
    /// are resolved by recovery.
    pub fn from_entries(entries: Vec<BundleEntry>, interactive: bool) -> Self {
        Self {
            entries,
            interactive,
            in_flight: None,
        }
    }

    /// Entries in processing order
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Number of entries, dependency rows included
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`
    pub fn get(&self, index: usize) -> Option<&BundleEntry> {
        self.entries.get(index)
    }

    /// Entry with the given source key
    pub fn get_by_key(&self, key: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|e| e.source_key == key)
    }

    /// Interactive flag passed to the importer
    pub fn interactive(&self) -> bool {
        self.interactive
    }

    /// Change the interactive flag
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    /// Identity of the entry being imported
    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    /// The entry being imported
    pub fn in_flight_entry(&self) -> Option<&BundleEntry> {
        let identity = self.in_flight.as_deref()?;
        self.entries.iter().find(|e| e.identity() == identity)
    }

    /// Whether an entry with this source key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.source_key == key)
    }

    /// Index of the entry with the given identity
    pub fn position_of(&self, identity: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.identity() == identity)
    }

    /// Number of entries currently importing
    pub fn importing_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Importing)
            .count()
    }

    /// Number of entries a run would pick
    pub fn selectable_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_selectable()).count()
    }

    /// Append an entry unless its key is already queued
    ///
    /// Returns whether the entry was added.
    pub fn push(&mut self, entry: BundleEntry) -> bool {
        if self.contains_key(&entry.source_key) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Add display-only rows for dependencies declared by `parent_key`
    ///
    /// Rows that already exist are left alone. Returns the keys added.
    pub fn attach_dependencies(
        &mut self,
        parent_key: &str,
        descriptor: &DependencyDescriptor,
        probe: &dyn PackageProbe,
    ) -> Vec<String> {
        let mut added = Vec::new();
        for package_id in descriptor.package_ids() {
            if self.contains_key(&sub_entry_key(parent_key, package_id)) {
                continue;
            }
            let row = BundleEntry::dependency(parent_key, package_id, probe.is_installed(package_id));
            added.push(row.source_key.clone());
            self.entries.push(row);
        }
        added
    }

    /// Re-read the install state of every dependency row
    ///
    /// Returns the keys whose status changed, with the new status.
    pub fn refresh_dependencies(&mut self, probe: &dyn PackageProbe) -> Vec<(String, EntryStatus)> {
        let mut changed = Vec::new();
        for entry in self.entries.iter_mut().filter(|e| e.is_sub_entry) {
            let Some(package_id) = entry.package_id.as_deref() else {
                continue;
            };
            let status = if probe.is_installed(package_id) {
                EntryStatus::Done
            } else {
                EntryStatus::Pending
            };
            if entry.status != status {
                entry.status = status;
                changed.push((entry.source_key.clone(), status));
            }
        }
        changed
    }

    fn check_editable(&self, index: usize) -> Result<&BundleEntry, QueueError> {
        let entry = self
            .entries
            .get(index)
            .ok_or(QueueError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })?;
        if entry.is_sub_entry {
            return Err(QueueError::SubEntry {
                key: entry.source_key.clone(),
            });
        }
        if self.in_flight.as_deref() == Some(entry.identity()) {
            return Err(QueueError::EntryInFlight {
                key: entry.source_key.clone(),
            });
        }
        Ok(entry)
    }

    /// Remove the entry at `index` together with its dependency rows
    ///
    /// Owned temp files are deleted. Returns the removed keys, the requested
    /// entry first.
    pub fn remove(&mut self, index: usize) -> Result<Vec<String>, QueueError> {
        self.check_editable(index)?;

        let mut entry = self.entries.remove(index);
        entry.delete_temp();
        let mut removed = vec![entry.source_key.clone()];

        self.entries.retain_mut(|e| {
            if e.parent_key.as_deref() == Some(entry.source_key.as_str()) {
                e.delete_temp();
                removed.push(e.source_key.clone());
                false
            } else {
                true
            }
        });

        Ok(removed)
    }

    /// Enable or disable the entry at `index`
    ///
    /// Returns whether the flag changed.
    pub fn set_enabled(&mut self, index: usize, enabled: bool) -> Result<bool, QueueError> {
        self.check_editable(index)?;
        let entry = &mut self.entries[index];
        let changed = entry.enabled != enabled;
        entry.enabled = enabled;
        Ok(changed)
    }

    /// Remove every entry, deleting owned temp files
    ///
    /// Returns the number of entries removed.
    pub fn clear(&mut self) -> Result<usize, QueueError> {
        if let Some(key) = &self.in_flight {
            return Err(QueueError::EntryInFlight { key: key.clone() });
        }
        let removed = self.entries.len();
        for entry in &mut self.entries {
            entry.delete_temp();
        }
        self.entries.clear();
        Ok(removed)
    }

    /// Index of the first entry a run would import
    pub fn next_selectable(&self) -> Option<usize> {
        self.entries.iter().position(BundleEntry::is_selectable)
    }

    /// Return failed and cancelled entries to pending for a new run
    ///
    /// Returns the keys reset.
    pub fn reset_for_run(&mut self) -> Vec<String> {
        let mut reset = Vec::new();
        for entry in &mut self.entries {
            if entry.enabled
                && !entry.is_sub_entry
                && matches!(entry.status, EntryStatus::Failed | EntryStatus::Cancelled)
            {
                entry.status = EntryStatus::Pending;
                reset.push(entry.source_key.clone());
            }
        }
        reset
    }

    /// Mark the entry at `index` importing and record it as in flight
    ///
    /// Returns its identity. Fails if another entry is already in flight.
    pub fn begin(&mut self, index: usize) -> Result<String, QueueError> {
        if let Some(key) = &self.in_flight {
            return Err(QueueError::EntryInFlight { key: key.clone() });
        }
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(QueueError::IndexOutOfRange { index, len })?;
        if entry.is_sub_entry {
            return Err(QueueError::SubEntry {
                key: entry.source_key.clone(),
            });
        }
        entry.status = EntryStatus::Importing;
        let identity = entry.identity().to_string();
        self.in_flight = Some(identity.clone());
        Ok(identity)
    }

    /// Resolve an entry that never reached the importer
    ///
    /// Returns the entry's key. The in-flight entry cannot be changed this way.
    pub fn reject(&mut self, index: usize, status: EntryStatus) -> Result<String, QueueError> {
        self.check_editable(index)?;
        let entry = &mut self.entries[index];
        entry.status = status;
        Ok(entry.source_key.clone())
    }

    /// Point the entry at `index` to a freshly extracted file it owns
    ///
    /// The previous temp file, if still present, is deleted first.
    pub fn rebind(&mut self, index: usize, extracted: std::path::PathBuf) -> Result<(), QueueError> {
        self.check_editable(index)?;
        let entry = &mut self.entries[index];
        entry.delete_temp();
        entry.path = extracted.clone();
        entry.temp_path = Some(extracted);
        Ok(())
    }

    /// Mutable access to the in-flight entry
    pub fn in_flight_entry_mut(&mut self) -> Option<&mut BundleEntry> {
        let identity = self.in_flight.clone()?;
        self.entries.iter_mut().find(|e| e.identity() == identity)
    }

    /// Resolve the in-flight entry to a terminal status
    ///
    /// Deletes its temp file and clears the in-flight identity. Returns the
    /// resolved entry's key, or `None` when nothing was in flight.
    pub fn finish(&mut self, status: EntryStatus) -> Option<String> {
        let identity = self.in_flight.take()?;
        let entry = self.entries.iter_mut().find(|e| e.identity() == identity)?;
        entry.status = status;
        entry.delete_temp();
        Some(entry.source_key.clone())
    }

    /// Resolve the in-flight entry without deleting its temp file
    ///
    /// Used when a run is stopped by the user, so a later run can retry the
    /// same extracted file.
    pub fn abandon(&mut self, status: EntryStatus) -> Option<String> {
        let identity = self.in_flight.take()?;
        let entry = self.entries.iter_mut().find(|e| e.identity() == identity)?;
        entry.status = status;
        Some(entry.source_key.clone())
    }

    /// Forget the in-flight identity, leaving statuses untouched
    pub fn release_in_flight(&mut self) -> Option<String> {
        self.in_flight.take()
    }

    /// Resolve an entry left importing by an interrupted process
    ///
    /// Only an entry whose identity matches and that is still importing is
    /// changed. `Done` deletes its temp file. Returns the entry's key.
    pub fn resolve_interrupted(&mut self, identity: &str, status: EntryStatus) -> Option<String> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.identity() == identity && e.status == EntryStatus::Importing)?;
        entry.status = status;
        if status == EntryStatus::Done {
            entry.delete_temp();
        }
        Some(entry.source_key.clone())
    }

    /// Return every entry still importing to pending
    ///
    /// Returns the keys demoted.
    pub fn demote_interrupted(&mut self) -> Vec<String> {
        let mut demoted = Vec::new();
        for entry in &mut self.entries {
            if entry.status == EntryStatus::Importing {
                entry.status = EntryStatus::Pending;
                demoted.push(entry.source_key.clone());
            }
        }
        demoted
    }
}
