//! Notification backend that runs a command

use super::Notifier;
use crate::config::NotificationConfig;
use crate::types::DrainSummary;
use crate::utils::resolve_program;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

/// Runs a command when the queue drains, e.g. a sound player
///
/// The summary is passed in `BULK_IMPORT_DONE`, `BULK_IMPORT_FAILED`,
/// `BULK_IMPORT_CANCELLED` and `BULK_IMPORT_PENDING`. The command runs in the
/// background; failures and timeouts are logged.
#[derive(Debug, Clone)]
pub struct CommandNotifier {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandNotifier {
    /// Create a notifier for an explicit program path
    pub fn new(program: PathBuf, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program,
            args,
            timeout,
        }
    }

    /// Build from configuration; `None` when no command is configured or it cannot be found
    pub fn from_config(config: &NotificationConfig) -> Option<Self> {
        let program = resolve_program(config.command.as_deref()?)?;
        Some(Self::new(program, config.args.clone(), config.timeout))
    }

    fn env_vars(summary: &DrainSummary) -> HashMap<String, String> {
        HashMap::from([
            ("BULK_IMPORT_DONE".to_string(), summary.done.to_string()),
            ("BULK_IMPORT_FAILED".to_string(), summary.failed.to_string()),
            (
                "BULK_IMPORT_CANCELLED".to_string(),
                summary.cancelled.to_string(),
            ),
            ("BULK_IMPORT_PENDING".to_string(), summary.pending.to_string()),
        ])
    }

    /// Run the command and wait for it, bounded by the timeout
    ///
    /// Returns whether the command exited successfully.
    pub(crate) async fn run(&self, summary: &DrainSummary) -> bool {
        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.args)
                .envs(Self::env_vars(summary))
                .kill_on_drop(true)
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                tracing::debug!(command = ?self.program, "notification command finished");
                true
            }
            Ok(Ok(output)) => {
                tracing::warn!(
                    command = ?self.program,
                    code = ?output.status.code(),
                    "notification command failed"
                );
                false
            }
            Ok(Err(e)) => {
                tracing::warn!(command = ?self.program, error = %e, "failed to run notification command");
                false
            }
            Err(_) => {
                tracing::warn!(command = ?self.program, timeout = ?self.timeout, "notification command timed out");
                false
            }
        }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, summary: &DrainSummary) {
        let notifier = self.clone();
        let summary = *summary;
        tokio::spawn(async move {
            notifier.run(&summary).await;
        });
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
