//! Queue orchestration
//!
//! [`ImportOrchestrator`] owns the [`BundleQueue`] and drives it through the
//! host's [`Importer`], one entry at a time. Its methods are organized by
//! domain:
//! - [`queue_ops`] - Adding, removing and editing entries
//! - [`control`] - Run lifecycle (start/stop/suspend) and advancement
//! - [`recovery`] - Resolving an import interrupted by a restart
//!
//! Every state change is written to the database and then broadcast as an
//! [`Event`].

mod control;
mod queue_ops;
mod recovery;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::config::Config;
use crate::container::{ContainerReader, ZipContainerReader};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::importer::{CommandImporter, Importer};
use crate::notify::{Notifier, notifier_from_config};
use crate::probe::{DirectoryPackageProbe, NoPackageProbe, PackageProbe};
use crate::queue::BundleQueue;
use crate::types::{Event, ImportJobId, RecoveryReport, RunState};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;

/// Pluggable capabilities the orchestrator depends on
#[derive(Clone)]
pub struct Capabilities {
    /// Host import capability
    pub importer: Arc<dyn Importer>,
    /// Outer container reader
    pub containers: Arc<dyn ContainerReader>,
    /// Drain notification backend
    pub notifier: Arc<dyn Notifier>,
    /// Install-state lookup for dependency rows
    pub probe: Arc<dyn PackageProbe>,
}

impl Capabilities {
    /// Default capabilities for a configuration around the given importer
    ///
    /// Zip containers, the notifier selected by [`notifier_from_config`], and a
    /// directory probe when `packages_dir` is set.
    pub fn from_config(config: &Config, importer: Arc<dyn Importer>) -> Self {
        let probe: Arc<dyn PackageProbe> = match &config.packages_dir {
            Some(dir) => Arc::new(DirectoryPackageProbe::new(dir)),
            None => Arc::new(NoPackageProbe),
        };
        Self {
            importer,
            containers: Arc::new(ZipContainerReader),
            notifier: notifier_from_config(&config.notifications),
            probe,
        }
    }
}

/// Mutable orchestrator state, guarded by one lock
pub(crate) struct OrchestratorState {
    pub(crate) queue: BundleQueue,
    pub(crate) run_state: RunState,
    /// Job handle of the outstanding import call
    pub(crate) job: Option<ImportJobId>,
    /// Cancels the signal listener of the current run
    pub(crate) listener: Option<CancellationToken>,
    /// Set once the recovery pass has run
    pub(crate) recovery: Option<RecoveryReport>,
}

/// Bulk import orchestrator (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ImportOrchestrator {
    /// Database holding the queue snapshot and the durable in-flight marker
    pub(crate) db: Arc<Database>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Configuration
    pub(crate) config: Arc<Config>,
    /// Queue and run state
    pub(crate) state: Arc<Mutex<OrchestratorState>>,
    /// Importer, container reader, notifier and probe
    pub(crate) capabilities: Capabilities,
}

impl ImportOrchestrator {
    /// Create an orchestrator that imports through the configured command
    ///
    /// Fails with a configuration error when `importer.program` is unset or
    /// cannot be found.
    pub async fn new(config: Config) -> Result<Self> {
        let importer = CommandImporter::from_config(&config.importer).ok_or_else(|| Error::Config {
            message: "no usable import program configured".to_string(),
            key: Some("importer.program".to_string()),
        })?;
        let capabilities = Capabilities::from_config(&config, Arc::new(importer));
        Self::with_capabilities(config, capabilities).await
    }

    /// Create an orchestrator around the given importer
    pub async fn with_importer(config: Config, importer: Arc<dyn Importer>) -> Result<Self> {
        let capabilities = Capabilities::from_config(&config, importer);
        Self::with_capabilities(config, capabilities).await
    }

    /// Create an orchestrator with explicit capabilities
    ///
    /// This:
    /// - Validates the configuration
    /// - Opens/creates the SQLite database and runs migrations
    /// - Restores the persisted queue and interactive flag
    /// - Runs the recovery pass for an import interrupted by a restart
    pub async fn with_capabilities(config: Config, capabilities: Capabilities) -> Result<Self> {
        let orchestrator = Self::open(config, capabilities).await?;
        orchestrator.recover().await?;
        Ok(orchestrator)
    }

    /// Open the database and restore the queue without running recovery
    pub(crate) async fn open(config: Config, capabilities: Capabilities) -> Result<Self> {
        config.validate()?;

        let db = Database::new(&config.persistence.database_path).await?;
        let entries = db.load_entries().await?;
        let interactive = db
            .get_interactive()
            .await?
            .unwrap_or(config.import.interactive);

        tracing::info!(
            entries = entries.len(),
            interactive,
            importer = capabilities.importer.name(),
            containers = capabilities.containers.name(),
            notifier = capabilities.notifier.name(),
            "opened import queue"
        );

        let (event_tx, _rx) = broadcast::channel(1000);

        Ok(Self {
            db: Arc::new(db),
            event_tx,
            config: Arc::new(config),
            state: Arc::new(Mutex::new(OrchestratorState {
                queue: BundleQueue::from_entries(entries, interactive),
                run_state: RunState::Idle,
                job: None,
                listener: None,
                recovery: None,
            })),
            capabilities,
        })
    }

    /// Subscribe to orchestrator events
    ///
    /// Each subscriber receives every event emitted after it subscribed.
    /// Slow subscribers may miss events once the buffer of 1000 fills.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Configuration the orchestrator was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn emit_event(&self, event: Event) {
        // No subscribers is fine
        self.event_tx.send(event).ok();
    }

    /// Write the queue snapshot
    pub(crate) async fn persist(&self, state: &OrchestratorState) -> Result<()> {
        self.db.save_entries(state.queue.entries()).await
    }

    /// Write the queue snapshot from a path that cannot report errors
    pub(crate) async fn persist_logged(&self, state: &OrchestratorState) {
        if let Err(e) = self.persist(state).await {
            tracing::error!(error = %e, "failed to persist import queue");
        }
    }
}
