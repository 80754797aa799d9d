//! Importer that runs a host-side import command

use super::Importer;
use crate::config::ImporterConfig;
use crate::types::{ImportJobId, ImportOutcome, ImportSignal};
use crate::utils::resolve_program;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::process::Command;
use tokio::sync::broadcast;

/// Importer that runs an external program once per bundle
///
/// The command line is `<program> <args...> <bundle path> [interactive arg]`.
/// Exit code 0 completes the job, any other exit code fails it with the
/// program's stderr, and a process killed by a signal counts as cancelled.
pub struct CommandImporter {
    program: PathBuf,
    args: Vec<String>,
    interactive_arg: Option<String>,
    next_job: AtomicU64,
    signal_tx: broadcast::Sender<ImportSignal>,
}

impl CommandImporter {
    /// Create an importer for an explicit program path
    pub fn new(program: PathBuf) -> Self {
        let (signal_tx, _rx) = broadcast::channel(64);
        Self {
            program,
            args: vec![],
            interactive_arg: None,
            next_job: AtomicU64::new(1),
            signal_tx,
        }
    }

    /// Arguments placed before the bundle path
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Argument appended when importing interactively
    pub fn with_interactive_arg(mut self, arg: Option<String>) -> Self {
        self.interactive_arg = arg;
        self
    }

    /// Build from configuration
    ///
    /// A bare program name is looked up on PATH with `which`.
    ///
    /// # Returns
    ///
    /// `None` when no program is configured or it cannot be found.
    pub fn from_config(config: &ImporterConfig) -> Option<Self> {
        let program = resolve_program(config.program.as_deref()?)?;
        Some(
            Self::new(program)
                .with_args(config.args.clone())
                .with_interactive_arg(config.interactive_arg.clone()),
        )
    }

    /// Program this importer runs
    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl Importer for CommandImporter {
    fn subscribe(&self) -> broadcast::Receiver<ImportSignal> {
        self.signal_tx.subscribe()
    }

    async fn import(&self, path: &Path, interactive: bool) -> crate::Result<ImportJobId> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        if interactive && let Some(arg) = &self.interactive_arg {
            command.arg(arg);
        }

        let child = command.spawn().map_err(|e| {
            crate::Error::ExternalTool(format!(
                "failed to run {}: {}",
                self.program.display(),
                e
            ))
        })?;

        let job = ImportJobId(self.next_job.fetch_add(1, Ordering::Relaxed));
        let signal_tx = self.signal_tx.clone();
        let bundle = path.to_path_buf();

        tokio::spawn(async move {
            let outcome = match child.wait_with_output().await {
                Ok(output) => match output.status.code() {
                    Some(0) => ImportOutcome::Completed,
                    Some(code) => {
                        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                        ImportOutcome::Failed {
                            message: if stderr.is_empty() {
                                format!("exit code {code}")
                            } else {
                                stderr
                            },
                        }
                    }
                    None => ImportOutcome::Cancelled,
                },
                Err(e) => ImportOutcome::Failed {
                    message: format!("failed to wait for importer: {e}"),
                },
            };
            tracing::debug!(job = %job, bundle = ?bundle, outcome = ?outcome, "import command finished");
            signal_tx.send(ImportSignal { job, outcome }).ok();
        });

        Ok(job)
    }

    fn name(&self) -> &'static str {
        "command"
    }
}
