//! Run lifecycle and queue advancement

use super::{ImportOrchestrator, OrchestratorState};
use crate::container::{extract_to_temp, split_composite_key};
use crate::error::{Error, QueueError, Result};
use crate::types::{DrainSummary, EntryStatus, Event, ImportOutcome, ImportSignal, RunState};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

impl ImportOrchestrator {
    /// Start processing the queue
    ///
    /// Failed and cancelled entries are returned to pending first. The first
    /// selectable entry is handed to the importer before this returns; the
    /// rest follow as its outcome signals arrive. A queue with nothing to
    /// import drains immediately.
    pub async fn start(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.recovery.is_none() {
            return Err(QueueError::RecoveryPending.into());
        }
        if state.run_state == RunState::Running {
            return Err(QueueError::Running {
                operation: "start".to_string(),
            }
            .into());
        }
        if let Some(key) = state.queue.in_flight() {
            return Err(QueueError::EntryInFlight {
                key: key.to_string(),
            }
            .into());
        }

        for key in state.queue.reset_for_run() {
            self.emit_event(Event::StatusChanged {
                key,
                status: EntryStatus::Pending,
            });
        }

        let token = CancellationToken::new();
        self.spawn_listener(self.capabilities.importer.subscribe(), token.clone());
        state.listener = Some(token);
        state.run_state = RunState::Running;

        let pending = state.queue.selectable_count();
        tracing::info!(pending, interactive = state.queue.interactive(), "import queue started");
        self.emit_event(Event::QueueStarted { pending });

        if let Err(e) = self.advance(&mut state).await {
            self.halt(&mut state);
            self.persist_logged(&state).await;
            return Err(e);
        }
        self.persist(&state).await
    }

    /// Stop processing the queue
    ///
    /// The in-flight entry, if any, is marked cancelled and keeps its temp
    /// file so a later run can retry it. Outcome signals that arrive later are
    /// ignored. Stopping an idle queue does nothing.
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.run_state == RunState::Idle && state.queue.in_flight().is_none() {
            return Ok(());
        }

        self.halt(&mut state);
        self.db.clear_in_flight_marker().await?;
        let interrupted = state.queue.abandon(EntryStatus::Cancelled);
        if let Some(key) = &interrupted {
            self.emit_event(Event::StatusChanged {
                key: key.clone(),
                status: EntryStatus::Cancelled,
            });
        }
        self.persist(&state).await?;
        drop(state);

        tracing::info!(interrupted = ?interrupted, "import queue stopped");
        self.emit_event(Event::QueueStopped { interrupted });
        Ok(())
    }

    /// Stop listening without resolving the in-flight entry
    ///
    /// The durable marker and the importing status are kept, so the next
    /// process resolves the entry through recovery. Only [`stop`](Self::stop)
    /// can resume this instance afterwards.
    pub async fn suspend(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.halt(&mut state);
        self.persist(&state).await?;
        let interrupted = state.queue.in_flight().map(str::to_string);
        drop(state);

        tracing::info!(in_flight = ?interrupted, "import queue suspended");
        self.emit_event(Event::QueueStopped { interrupted });
        Ok(())
    }

    /// Stop the queue before the orchestrator is released
    pub async fn dispose(&self) -> Result<()> {
        self.stop().await
    }

    /// Cancel the listener and go idle
    fn halt(&self, state: &mut OrchestratorState) {
        if let Some(token) = state.listener.take() {
            token.cancel();
        }
        state.run_state = RunState::Idle;
        state.job = None;
    }

    fn spawn_listener(&self, mut signals: broadcast::Receiver<ImportSignal>, token: CancellationToken) {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    signal = signals.recv() => match signal {
                        Ok(signal) => orchestrator.handle_signal(signal, &token).await,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "import signal listener lagged");
                        }
                        Err(RecvError::Closed) => {
                            tracing::debug!("importer signal channel closed");
                            break;
                        }
                    },
                }
            }
        });
    }

    /// Resolve the in-flight entry from its outcome signal and move on
    async fn handle_signal(&self, signal: ImportSignal, token: &CancellationToken) {
        let mut state = self.state.lock().await;
        // stop() may have won the lock while this signal was pending
        if token.is_cancelled() || state.job != Some(signal.job) {
            tracing::debug!(job = %signal.job, "ignoring import signal");
            return;
        }

        state.job = None;
        if let Err(e) = self.db.clear_in_flight_marker().await {
            tracing::error!(error = %e, "failed to clear in-flight marker");
        }

        let status = signal.outcome.status();
        let Some(key) = state.queue.finish(status) else {
            tracing::debug!(job = %signal.job, "signal arrived with nothing in flight");
            return;
        };
        match &signal.outcome {
            ImportOutcome::Failed { message } => {
                tracing::warn!(key = %key, job = %signal.job, error = %message, "import failed");
            }
            _ => tracing::info!(key = %key, job = %signal.job, status = %status, "import finished"),
        }
        self.emit_event(Event::StatusChanged { key, status });

        if let Err(e) = self.advance(&mut state).await {
            tracing::error!(error = %e, "failed to advance import queue");
            self.halt(&mut state);
        }
        self.persist_logged(&state).await;
    }

    /// Hand the next selectable entry to the importer, or drain
    ///
    /// Entries whose file is gone, or whose import call cannot be issued, are
    /// failed on the spot and the next one is tried. Only a failure to write
    /// the durable marker is returned.
    pub(crate) async fn advance(&self, state: &mut OrchestratorState) -> Result<()> {
        if state.queue.in_flight().is_some() {
            return Ok(());
        }

        while let Some(index) = state.queue.next_selectable() {
            let Some(entry) = state.queue.get(index).cloned() else {
                break;
            };

            let path = if entry.path.is_file() {
                entry.path.clone()
            } else if entry.is_archive_member() {
                match self.reextract(&entry.source_key).await {
                    Ok(extracted) => {
                        tracing::info!(key = %entry.source_key, path = %extracted.display(), "re-extracted missing bundle");
                        state.queue.rebind(index, extracted.clone())?;
                        extracted
                    }
                    Err(e) => {
                        tracing::warn!(key = %entry.source_key, error = %e, "bundle missing and re-extraction failed");
                        self.reject(state, index)?;
                        continue;
                    }
                }
            } else {
                tracing::warn!(key = %entry.source_key, path = %entry.path.display(), "bundle file missing");
                self.reject(state, index)?;
                continue;
            };

            let key = entry.source_key.clone();
            let identity = state.queue.begin(index)?;
            if let Err(e) = self.record_in_flight(state, &identity).await {
                state.queue.abandon(EntryStatus::Pending);
                return Err(e);
            }
            self.emit_event(Event::StatusChanged {
                key: key.clone(),
                status: EntryStatus::Importing,
            });

            let interactive = state.queue.interactive();
            match self.capabilities.importer.import(&path, interactive).await {
                Ok(job) => {
                    state.job = Some(job);
                    tracing::info!(key = %key, job = %job, interactive, "import started");
                    self.emit_event(Event::ImportStarted { key, job });
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "import call could not be issued");
                    self.db.clear_in_flight_marker().await?;
                    if let Some(key) = state.queue.finish(EntryStatus::Failed) {
                        self.emit_event(Event::StatusChanged {
                            key,
                            status: EntryStatus::Failed,
                        });
                    }
                }
            }
        }

        self.drain(state).await;
        Ok(())
    }

    /// Make the in-flight entry durable before the import call is issued
    ///
    /// The snapshot goes first so that the marker never names an entry stored
    /// as anything but importing.
    async fn record_in_flight(&self, state: &OrchestratorState, identity: &str) -> Result<()> {
        self.persist(state).await?;
        self.db.set_in_flight_marker(identity).await
    }

    fn reject(&self, state: &mut OrchestratorState, index: usize) -> Result<()> {
        let key = state.queue.reject(index, EntryStatus::Failed)?;
        self.emit_event(Event::StatusChanged {
            key,
            status: EntryStatus::Failed,
        });
        Ok(())
    }

    /// Extract a container member again after its temp file disappeared
    async fn reextract(&self, source_key: &str) -> Result<PathBuf> {
        let (container, member) = split_composite_key(source_key)
            .ok_or_else(|| Error::NotFound(format!("no container in key {}", source_key)))?;
        let container = PathBuf::from(container);
        if !container.is_file() {
            return Err(Error::NotFound(format!("container {}", container.display())));
        }

        let reader = self.capabilities.containers.clone();
        let temp_dir = self.config.temp_dir().clone();
        let member = member.to_string();
        tokio::task::spawn_blocking(move || {
            extract_to_temp(reader.as_ref(), Path::new(&container), &member, &temp_dir)
        })
        .await
        .map_err(|e| Error::Other(format!("extraction task failed: {}", e)))?
    }

    /// Finish the run: go idle and notify once
    async fn drain(&self, state: &mut OrchestratorState) {
        let was_running = state.run_state == RunState::Running;
        self.halt(state);
        if let Err(e) = self.db.clear_in_flight_marker().await {
            tracing::error!(error = %e, "failed to clear in-flight marker");
        }
        if !was_running {
            return;
        }

        let summary = DrainSummary::from_entries(state.queue.entries());
        tracing::info!(
            done = summary.done,
            failed = summary.failed,
            cancelled = summary.cancelled,
            pending = summary.pending,
            notifier = self.capabilities.notifier.name(),
            "import queue drained"
        );
        self.capabilities.notifier.notify(&summary).await;
        self.emit_event(Event::QueueDrained { summary });
    }
}
