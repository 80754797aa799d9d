//! Drain notification
//!
//! When a run drains, the orchestrator calls [`Notifier::notify`] exactly once
//! with the final counts. The backend is chosen once from configuration by
//! [`notifier_from_config`].

mod command;

pub use command::CommandNotifier;

use crate::config::NotificationConfig;
use crate::types::DrainSummary;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for drain notification backends
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Report that the queue drained
    ///
    /// Must not fail; backends log their own problems. Called with the queue
    /// lock held, so slow backends bound their own run time.
    async fn notify(&self, summary: &DrainSummary);

    /// Get the name of this backend
    fn name(&self) -> &'static str;
}

/// Backend used when notifications are disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn notify(&self, _summary: &DrainSummary) {}

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Backend that only logs the summary
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, summary: &DrainSummary) {
        tracing::info!(
            done = summary.done,
            failed = summary.failed,
            cancelled = summary.cancelled,
            pending = summary.pending,
            "import queue finished"
        );
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

/// Select the notification backend for a configuration
///
/// Disabled notifications get [`NoOpNotifier`]. A configured command that
/// cannot be found degrades to [`LogNotifier`] with a warning.
pub fn notifier_from_config(config: &NotificationConfig) -> Arc<dyn Notifier> {
    if !config.enabled {
        return Arc::new(NoOpNotifier);
    }
    let Some(program) = &config.command else {
        return Arc::new(LogNotifier);
    };
    match CommandNotifier::from_config(config) {
        Some(notifier) => Arc::new(notifier),
        None => {
            tracing::warn!(command = ?program, "notification command not found, logging instead");
            Arc::new(LogNotifier)
        }
    }
}
