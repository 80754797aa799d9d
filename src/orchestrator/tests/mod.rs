
use crate::types::{EntryStatus, QueueSnapshot};

/// Statuses of the importable entries, in queue order
fn statuses(snapshot: &QueueSnapshot) -> Vec<EntryStatus> {
    snapshot
        .entries
        .iter()
        .filter(|e| !e.is_sub_entry)
        .map(|e| e.status)
        .collect()
}

fn key_of(path: &std::path::Path) -> String {
    crate::types::normalize_path(path)
}
