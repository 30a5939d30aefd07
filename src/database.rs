// ABOUTME: Database management for journal entries and reflection outputs
// ABOUTME: Handles SQLite storage, migrations, and the two-record entry/output association
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Database Management
//!
//! SQLite-backed storage for the journaling pipeline. A `journal_entries` row
//! holds one piece of raw user writing; exactly one `journal_outputs` row holds
//! its reflection payload, keyed by entry id and carrying the same owner.
//! Entry and output are written inside a single transaction so partial failure
//! cannot leave an entry without its reflection.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{HistoryItem, JournalEntry};

/// Database manager for journal storage
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or a migration fails.
    pub async fn new(database_url: &str) -> Result<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:")
            && !database_url.contains("memory")
        {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        let pool = SqlitePool::connect(&connection_options).await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if a table or index creation fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS journal_entries (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                entry_text TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_journal_entries_user_id ON journal_entries(user_id)",
        )
        .execute(&self.pool)
        .await?;

        // One output per entry, same owner as the entry
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS journal_outputs (
                entry_id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                output TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (entry_id) REFERENCES journal_entries (id) ON DELETE CASCADE
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_journal_outputs_user_id ON journal_outputs(user_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Ping the database to verify the connection is usable
    ///
    /// # Errors
    ///
    /// Returns an error if the probe query fails.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    /// Write a new entry and its reflection output as one transaction
    ///
    /// # Errors
    ///
    /// Returns an error if either insert fails; neither row is kept in that
    /// case.
    pub async fn create_entry_with_output(
        &self,
        user_id: Uuid,
        entry_text: &str,
        output: &serde_json::Value,
    ) -> Result<Uuid> {
        let entry_id = Uuid::new_v4();
        let now = Utc::now().to_rfc3339();
        let payload = serde_json::to_string(output).context("Failed to serialize reflection")?;

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO journal_entries (id, user_id, entry_text, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(entry_id.to_string())
        .bind(user_id.to_string())
        .bind(entry_text)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Failed to save journal entry")?;

        sqlx::query(
            "INSERT INTO journal_outputs (entry_id, user_id, output, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(entry_id.to_string())
        .bind(user_id.to_string())
        .bind(&payload)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .context("Failed to save reflection output")?;

        tx.commit().await?;

        Ok(entry_id)
    }

    /// Get the owner of an entry, if the entry exists
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored id is malformed.
    pub async fn entry_owner(&self, entry_id: Uuid) -> Result<Option<Uuid>> {
        let row = sqlx::query("SELECT user_id FROM journal_entries WHERE id = ?1")
            .bind(entry_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let user_id: String = row.try_get("user_id")?;
                Ok(Some(Uuid::parse_str(&user_id)?))
            }
            None => Ok(None),
        }
    }

    /// Overwrite an entry's reflection payload in place
    ///
    /// No new record is created and no history of prior edits is retained.
    /// Returns whether a row was updated.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_output(&self, entry_id: Uuid, output: &serde_json::Value) -> Result<bool> {
        let payload = serde_json::to_string(output).context("Failed to serialize reflection")?;

        let result = sqlx::query(
            "UPDATE journal_outputs SET output = ?1, updated_at = ?2 WHERE entry_id = ?3",
        )
        .bind(&payload)
        .bind(Utc::now().to_rfc3339())
        .bind(entry_id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Read the stored reflection payload for an entry
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored payload is not JSON.
    pub async fn get_output(&self, entry_id: Uuid) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query("SELECT output FROM journal_outputs WHERE entry_id = ?1")
            .bind(entry_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let payload: String = row.try_get("output")?;
                let value = serde_json::from_str(&payload)
                    .context("Stored reflection payload is not valid JSON")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Read the owner's entries newest-first, each with its output if present
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed.
    pub async fn history(&self, user_id: Uuid, limit: i64) -> Result<Vec<HistoryItem>> {
        let rows = sqlx::query(
            r"
            SELECT e.id, e.user_id, e.entry_text, e.created_at, o.output
            FROM journal_entries e
            LEFT JOIN journal_outputs o ON o.entry_id = e.id
            WHERE e.user_id = ?1
            ORDER BY e.created_at DESC, e.rowid DESC
            LIMIT ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = Self::row_to_entry(&row)?;
            let reflection = match row.try_get::<Option<String>, _>("output")? {
                Some(payload) => Some(
                    serde_json::from_str(&payload)
                        .context("Stored reflection payload is not valid JSON")?,
                ),
                None => None,
            };
            items.push(HistoryItem { entry, reflection });
        }

        Ok(items)
    }

    /// Map a database row to a `JournalEntry`
    fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<JournalEntry> {
        let id: String = row.try_get("id")?;
        let user_id: String = row.try_get("user_id")?;
        let entry_text: String = row.try_get("entry_text")?;
        let created_at: String = row.try_get("created_at")?;

        Ok(JournalEntry {
            id: Uuid::parse_str(&id)?,
            user_id: Uuid::parse_str(&user_id)?,
            entry_text,
            created_at: DateTime::parse_from_rfc3339(&created_at)?.with_timezone(&Utc),
        })
    }
}
