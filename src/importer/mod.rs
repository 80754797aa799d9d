//! Host import capability
//!
//! The orchestrator never imports anything itself. It hands one bundle path at
//! a time to an [`Importer`] and waits for the matching [`ImportSignal`] on the
//! importer's broadcast channel before issuing the next call.

mod command;

pub use command::CommandImporter;

use crate::types::{BundleEntry, ImportJobId, ImportSignal};
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::broadcast;

/// Trait for the external import capability
///
/// `import` only issues the call; its outcome arrives later as an
/// [`ImportSignal`] carrying the returned job handle. Implementations must send
/// exactly one signal per successful `import` call, and must not send it
/// before `import` has returned to the caller's task (sending from a spawned
/// task is enough).
///
/// # Examples
///
/// ```no_run
/// use bulk_import::importer::{CommandImporter, Importer};
/// use std::path::{Path, PathBuf};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let importer = CommandImporter::new(PathBuf::from("/opt/host/bin/import-package"));
/// let mut signals = importer.subscribe();
///
/// let job = importer.import(Path::new("Shaders.unitypackage"), false).await?;
/// let signal = signals.recv().await?;
/// assert_eq!(signal.job, job);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Importer: Send + Sync {
    /// Receiver for completion, failure and cancellation signals
    fn subscribe(&self) -> broadcast::Receiver<ImportSignal>;

    /// Start importing a bundle
    ///
    /// # Arguments
    ///
    /// * `path` - Bundle file to import
    /// * `interactive` - Whether the host should let the user pick what to import
    ///
    /// # Returns
    ///
    /// Handle of the started job. An error means the call could not be issued
    /// and no signal will follow.
    ///
    /// The orchestrator holds its queue lock across this call, so `stop`,
    /// `snapshot` and every edit wait for it. Return as soon as the job is
    /// started and report the outcome through the signal channel.
    async fn import(&self, path: &Path, interactive: bool) -> crate::Result<ImportJobId>;

    /// Re-check whether an entry interrupted by a restart was imported
    ///
    /// `Some(true)` confirms the import, `Some(false)` denies it, `None` means
    /// the importer cannot tell. Recovery treats `None` as confirmed.
    async fn confirm_imported(&self, _entry: &BundleEntry) -> Option<bool> {
        None
    }

    /// Get the name of this importer implementation
    fn name(&self) -> &'static str;
}
