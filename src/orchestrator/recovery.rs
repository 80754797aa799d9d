//! Resolving an import interrupted by a restart

use super::ImportOrchestrator;
use crate::error::Result;
use crate::types::{EntryStatus, Event, RecoveryReport};

impl ImportOrchestrator {
    /// Resolve entries left importing by a previous process
    ///
    /// The entry named by the durable marker is counted as imported unless
    /// the importer denies it, in which case it returns to pending. Every
    /// other importing entry returns to pending, the marker is cleared, and
    /// dependency install states are refreshed.
    ///
    /// Runs once; later calls return the first report.
    pub async fn recover(&self) -> Result<RecoveryReport> {
        let mut state = self.state.lock().await;
        if let Some(report) = &state.recovery {
            return Ok(report.clone());
        }

        let mut report = RecoveryReport::default();
        let mut changes = Vec::new();

        if let Some(identity) = self.db.get_in_flight_marker().await? {
            let interrupted = state
                .queue
                .entries()
                .iter()
                .find(|e| e.identity() == identity && e.status == EntryStatus::Importing)
                .cloned();
            match interrupted {
                Some(entry) => {
                    let confirmed = self.capabilities.importer.confirm_imported(&entry).await;
                    let status = if confirmed == Some(false) {
                        EntryStatus::Pending
                    } else {
                        EntryStatus::Done
                    };
                    if let Some(key) = state.queue.resolve_interrupted(&identity, status) {
                        tracing::info!(key = %key, status = %status, confirmed = ?confirmed, "resolved interrupted import");
                        report.resolved = Some(identity.clone());
                        report.resolved_status = Some(status);
                        changes.push((key, status));
                    }
                }
                None => {
                    tracing::debug!(marker = %identity, "in-flight marker matches no importing entry");
                }
            }
        }
        self.db.clear_in_flight_marker().await?;

        let demoted = state.queue.demote_interrupted();
        report.demoted = demoted.len();
        changes.extend(demoted.into_iter().map(|key| (key, EntryStatus::Pending)));
        changes.extend(
            state
                .queue
                .refresh_dependencies(self.capabilities.probe.as_ref()),
        );

        self.persist(&state).await?;
        state.recovery = Some(report.clone());
        drop(state);

        if report.demoted > 0 {
            tracing::warn!(demoted = report.demoted, "returned interrupted entries to pending");
        }
        for (key, status) in changes {
            self.emit_event(Event::StatusChanged { key, status });
        }
        self.emit_event(Event::Recovered {
            report: report.clone(),
        });
        Ok(report)
    }
}
