//! Queue entry snapshot.

use crate::error::DatabaseError;
use crate::types::BundleEntry;
use crate::{Error, Result};

use super::{Database, EntryRow};

impl Database {
    /// Replace the stored queue with `entries`, in order
    ///
    /// Runs in one transaction, so a crash never leaves a half-written queue.
    pub async fn save_entries(&self, entries: &[BundleEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to begin transaction: {}",
                e
            )))
        })?;

        sqlx::query("DELETE FROM queue_entries")
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to clear queue entries: {}",
                    e
                )))
            })?;

        for (position, entry) in entries.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO queue_entries (
                    position, source_key, path, display_name, enabled, status,
                    temp_path, is_sub_entry, package_id, parent_key
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(position as i64)
            .bind(&entry.source_key)
            .bind(entry.path.to_string_lossy().into_owned())
            .bind(&entry.display_name)
            .bind(entry.enabled)
            .bind(entry.status.to_i32())
            .bind(
                entry
                    .temp_path
                    .as_ref()
                    .map(|p| p.to_string_lossy().into_owned()),
            )
            .bind(entry.is_sub_entry)
            .bind(&entry.package_id)
            .bind(&entry.parent_key)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to insert queue entry '{}': {}",
                    entry.source_key, e
                )))
            })?;
        }

        tx.commit().await.map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to commit queue entries: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Load the stored queue in order
    pub async fn load_entries(&self) -> Result<Vec<BundleEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT position, source_key, path, display_name, enabled, status,
                   temp_path, is_sub_entry, package_id, parent_key
            FROM queue_entries
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to load queue entries: {}",
                e
            )))
        })?;

        Ok(rows.into_iter().map(BundleEntry::from).collect())
    }
}
