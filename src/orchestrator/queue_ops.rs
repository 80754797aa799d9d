//! Adding, removing and editing queue entries

use super::ImportOrchestrator;
use crate::container::{composite_key, extract_to_temp};
use crate::error::{Error, QueueError, Result};
use crate::inspector::{DependencyDescriptor, inspect_with};
use crate::queue::collect_bundle_paths;
use crate::types::{BundleEntry, Event, QueueSnapshot, RunState};
use crate::utils::has_extension;
use std::path::{Path, PathBuf};

impl ImportOrchestrator {
    /// Add a bundle, a container or every bundle under a directory
    ///
    /// Returns the number of importable entries added. Paths that are neither
    /// are ignored.
    pub async fn add(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let import = &self.config.import;

        if path.is_dir() {
            self.add_folder(path).await
        } else if has_extension(path, &import.bundle_extension) {
            Ok(usize::from(self.add_bundle(path).await?))
        } else if has_extension(path, &import.archive_extension) {
            self.add_archive(path).await
        } else {
            tracing::debug!(path = %path.display(), "ignoring path that is not a bundle or container");
            Ok(0)
        }
    }

    /// Add a bundle file and the dependency rows it declares
    ///
    /// Returns `false` when an entry with the same key is already queued.
    pub async fn add_bundle(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::NotFound(format!("bundle {}", path.display())));
        }

        let entry = BundleEntry::bundle(path);
        if self.state.lock().await.queue.contains_key(&entry.source_key) {
            tracing::debug!(key = %entry.source_key, "bundle already queued");
            return Ok(false);
        }

        let descriptor = self.inspect_blocking(path.to_path_buf()).await;
        self.enqueue(entry, descriptor).await
    }

    /// Add every bundle stored in a container
    ///
    /// Returns the number of entries added.
    pub async fn add_archive(&self, container: impl AsRef<Path>) -> Result<usize> {
        let container = container.as_ref().to_path_buf();
        let reader = self.capabilities.containers.clone();
        let listed = container.clone();
        let members = tokio::task::spawn_blocking(move || reader.members(&listed))
            .await
            .map_err(|e| Error::Other(format!("container listing task failed: {}", e)))??;

        let mut added = 0;
        for member in members
            .iter()
            .filter(|m| has_extension(&m.name, &self.config.import.bundle_extension))
        {
            if self.add_archive_member(&container, &member.name).await? {
                added += 1;
            }
        }

        tracing::info!(
            container = %container.display(),
            members = members.len(),
            added,
            "added container"
        );
        Ok(added)
    }

    /// Extract one container member to a temp file and queue it
    ///
    /// Returns `false` when the member is already queued; nothing is extracted
    /// in that case.
    pub async fn add_archive_member(&self, container: impl AsRef<Path>, member: &str) -> Result<bool> {
        let container = container.as_ref().to_path_buf();
        let key = composite_key(&container, member);
        if self.state.lock().await.queue.contains_key(&key) {
            tracing::debug!(key = %key, "container member already queued");
            return Ok(false);
        }

        let reader = self.capabilities.containers.clone();
        let temp_dir = self.config.temp_dir().clone();
        let inspector = self.config.inspector.clone();
        let owned_member = member.to_string();
        let (extracted, descriptor) = tokio::task::spawn_blocking(move || {
            let extracted = extract_to_temp(reader.as_ref(), &container, &owned_member, &temp_dir)?;
            let descriptor = inspect_with(&extracted, &inspector);
            Ok::<_, Error>((extracted, descriptor))
        })
        .await
        .map_err(|e| Error::Other(format!("extraction task failed: {}", e)))??;

        self.enqueue(BundleEntry::archive_member(key, member, extracted), descriptor)
            .await
    }

    /// Add every bundle and container under a directory, recursively
    ///
    /// Bundles are added first, then containers. A container that cannot be
    /// read is skipped with a warning. Returns the number of entries added.
    pub async fn add_folder(&self, folder: impl AsRef<Path>) -> Result<usize> {
        let folder = folder.as_ref().to_path_buf();
        let bundle_extension = self.config.import.bundle_extension.clone();
        let archive_extension = self.config.import.archive_extension.clone();
        let walked = folder.clone();
        let paths = tokio::task::spawn_blocking(move || {
            collect_bundle_paths(&walked, &bundle_extension, &archive_extension)
        })
        .await
        .map_err(|e| Error::Other(format!("folder scan task failed: {}", e)))?;

        let mut added = 0;
        for path in &paths {
            if has_extension(path, &self.config.import.bundle_extension) {
                if self.add_bundle(path).await? {
                    added += 1;
                }
            } else {
                match self.add_archive(path).await {
                    Ok(n) => added += n,
                    Err(e) => {
                        tracing::warn!(container = %path.display(), error = %e, "skipping unreadable container");
                    }
                }
            }
        }

        tracing::info!(folder = %folder.display(), found = paths.len(), added, "added folder");
        Ok(added)
    }

    /// Remove the entry at `index` and its dependency rows
    pub async fn remove(&self, index: usize) -> Result<()> {
        let mut state = self.state.lock().await;
        let removed = state.queue.remove(index)?;
        self.persist(&state).await?;
        drop(state);

        tracing::info!(key = %removed[0], removed = removed.len(), "removed entry");
        for key in removed {
            self.emit_event(Event::EntryRemoved { key });
        }
        Ok(())
    }

    /// Enable or disable the entry at `index`
    pub async fn set_enabled(&self, index: usize, enabled: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        if !state.queue.set_enabled(index, enabled)? {
            return Ok(());
        }
        self.persist(&state).await?;
        let key = state
            .queue
            .get(index)
            .map(|e| e.source_key.clone())
            .unwrap_or_default();
        drop(state);

        tracing::debug!(key = %key, enabled, "toggled entry");
        self.emit_event(Event::EntryToggled { key, enabled });
        Ok(())
    }

    /// Change the interactive flag passed to the importer
    pub async fn set_interactive(&self, interactive: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.run_state == RunState::Running {
            return Err(QueueError::Running {
                operation: "change interactive mode".to_string(),
            }
            .into());
        }
        if state.queue.interactive() == interactive {
            return Ok(());
        }
        self.db.set_interactive(interactive).await?;
        state.queue.set_interactive(interactive);
        drop(state);

        tracing::info!(interactive, "interactive mode changed");
        self.emit_event(Event::InteractiveChanged { interactive });
        Ok(())
    }

    /// Remove every entry, deleting owned temp files
    ///
    /// Returns the number of entries removed.
    pub async fn clear(&self) -> Result<usize> {
        let mut state = self.state.lock().await;
        if state.run_state == RunState::Running {
            return Err(QueueError::Running {
                operation: "clear".to_string(),
            }
            .into());
        }
        let removed = state.queue.clear()?;
        self.persist(&state).await?;
        drop(state);

        tracing::info!(removed, "cleared queue");
        self.emit_event(Event::QueueCleared { removed });
        Ok(removed)
    }

    /// Current queue contents and run state
    pub async fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock().await;
        QueueSnapshot {
            entries: state.queue.entries().to_vec(),
            interactive: state.queue.interactive(),
            state: state.run_state,
            current: state.queue.in_flight().map(str::to_string),
        }
    }

    async fn inspect_blocking(&self, path: PathBuf) -> Option<DependencyDescriptor> {
        let inspector = self.config.inspector.clone();
        match tokio::task::spawn_blocking(move || inspect_with(&path, &inspector)).await {
            Ok(descriptor) => descriptor,
            Err(e) => {
                tracing::debug!(error = %e, "inspection task failed");
                None
            }
        }
    }

    /// Push an entry and its dependency rows, then persist and announce them
    ///
    /// Returns `false` if the key was queued by a concurrent add in the
    /// meantime, in which case the entry's temp file is released.
    async fn enqueue(&self, mut entry: BundleEntry, descriptor: Option<DependencyDescriptor>) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.queue.contains_key(&entry.source_key) {
            entry.delete_temp();
            return Ok(false);
        }

        let key = entry.source_key.clone();
        let name = entry.display_name.clone();
        state.queue.push(entry);
        let dependencies = match &descriptor {
            Some(descriptor) => {
                state
                    .queue
                    .attach_dependencies(&key, descriptor, self.capabilities.probe.as_ref())
            }
            None => vec![],
        };
        self.persist(&state).await?;

        let mut events = vec![Event::EntryAdded {
            key: key.clone(),
            name,
            sub_entry: false,
        }];
        for dep_key in &dependencies {
            if let Some(row) = state.queue.get_by_key(dep_key) {
                events.push(Event::EntryAdded {
                    key: row.source_key.clone(),
                    name: row.display_name.clone(),
                    sub_entry: true,
                });
            }
        }
        drop(state);

        tracing::info!(key = %key, dependencies = dependencies.len(), "added entry");
        for event in events {
            self.emit_event(event);
        }
        Ok(true)
    }
}
