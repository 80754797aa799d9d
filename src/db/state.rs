//! Runtime state tracking: durable in-flight marker, interactive flag.

use crate::error::DatabaseError;
use crate::{Error, Result};

use super::Database;

const IN_FLIGHT_MARKER: &str = "in_flight_marker";
const INTERACTIVE: &str = "interactive";

impl Database {
    /// Read the durable in-flight marker
    ///
    /// Returns the identity of the entry that was handed to the importer and
    /// has not resolved yet, if any.
    pub async fn get_in_flight_marker(&self) -> Result<Option<String>> {
        self.get_state(IN_FLIGHT_MARKER).await
    }

    /// Persist the durable in-flight marker
    pub async fn set_in_flight_marker(&self, identity: &str) -> Result<()> {
        self.set_state(IN_FLIGHT_MARKER, identity).await
    }

    /// Delete the durable in-flight marker
    ///
    /// Deleting a missing marker is not an error.
    pub async fn clear_in_flight_marker(&self) -> Result<()> {
        sqlx::query("DELETE FROM runtime_state WHERE key = ?")
            .bind(IN_FLIGHT_MARKER)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to clear in-flight marker: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Read the persisted interactive flag (None if never saved)
    pub async fn get_interactive(&self) -> Result<Option<bool>> {
        Ok(self.get_state(INTERACTIVE).await?.map(|v| v == "true"))
    }

    /// Persist the interactive flag
    pub async fn set_interactive(&self, interactive: bool) -> Result<()> {
        self.set_state(INTERACTIVE, if interactive { "true" } else { "false" })
            .await
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>> {
        sqlx::query_scalar("SELECT value FROM runtime_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to read runtime state '{}': {}",
                    key, e
                )))
            })
    }

    async fn set_state(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO runtime_state (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to write runtime state '{}': {}",
                key, e
            )))
        })?;

        Ok(())
    }
}
