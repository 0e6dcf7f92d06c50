/*!
 * Repository layer for translation records.
 *
 * This module provides the durable-store interface the pipeline depends on
 * and its SQLite implementation. Every successful create or delete is
 * announced to the registered [`RecordListener`]s after the write commits.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::RwLock;
use rusqlite::{Connection, OptionalExtension, Row, params};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use super::connection::DatabaseConnection;
use super::models::{NewTranslation, RecordEvent, TranslationRecord, timestamp_now};

/// Receives record change notifications
#[async_trait]
pub trait RecordListener: Send + Sync {
    async fn on_record_event(&self, event: &RecordEvent);
}

/// Durable store of finalized translations
#[async_trait]
pub trait TranslationStore: Send + Sync {
    /// Most recent record with exactly these fields
    async fn find_latest(
        &self,
        input_text: &str,
        source_lang: &str,
        target_lang: &str,
        level: &str,
    ) -> Result<Option<TranslationRecord>>;

    /// Insert a record and notify listeners
    async fn create(&self, record: NewTranslation) -> Result<TranslationRecord>;

    /// Delete a record by id and notify listeners. Returns the removed record.
    async fn delete(&self, id: i64) -> Result<Option<TranslationRecord>>;

    /// All records of an owner, newest first
    async fn list_for_owner(&self, owner: i64) -> Result<Vec<TranslationRecord>>;

    /// Delete every record of an owner, notifying once per record.
    /// Returns the number of removed records.
    async fn delete_for_owner(&self, owner: i64) -> Result<usize>;
}

const RECORD_COLUMNS: &str =
    "id, owner_id, input_text, output_text, source_lang, target_lang, level, created_at";

/// SQLite-backed [`TranslationStore`]
#[derive(Clone)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
    /// Change subscribers
    listeners: Arc<RwLock<Vec<Arc<dyn RecordListener>>>>,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("db", &self.db)
            .field("listeners", &self.listeners.read().len())
            .finish()
    }
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Create a repository with the default database location
    pub fn new_default() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_default()?))
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::new(DatabaseConnection::new_in_memory()?))
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Register a listener for record changes
    pub fn subscribe(&self, listener: Arc<dyn RecordListener>) {
        self.listeners.write().push(listener);
    }

    /// Compute SHA256 hash of text
    pub fn hash_text(text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    async fn notify(&self, event: RecordEvent) {
        let listeners: Vec<_> = self.listeners.read().iter().cloned().collect();
        debug!("Record {} -> {} listener(s)", event, listeners.len());

        for listener in listeners {
            listener.on_record_event(&event).await;
        }
    }

    fn parse_record_row(row: &Row) -> rusqlite::Result<TranslationRecord> {
        Ok(TranslationRecord {
            id: row.get(0)?,
            owner: row.get(1)?,
            input_text: row.get(2)?,
            output_text: row.get(3)?,
            source_lang: row.get(4)?,
            target_lang: row.get(5)?,
            level: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn get_record_sync(conn: &Connection, id: i64) -> Result<Option<TranslationRecord>> {
        let record = conn
            .query_row(
                &format!("SELECT {} FROM translations WHERE id = ?1", RECORD_COLUMNS),
                [id],
                Self::parse_record_row,
            )
            .optional()?;
        Ok(record)
    }

    fn list_for_owner_sync(conn: &Connection, owner: i64) -> Result<Vec<TranslationRecord>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM translations WHERE owner_id = ?1 ORDER BY id DESC",
            RECORD_COLUMNS
        ))?;

        let records = stmt
            .query_map([owner], Self::parse_record_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Get a record by id
    pub async fn get(&self, id: i64) -> Result<Option<TranslationRecord>> {
        self.db
            .execute_async(move |conn| Self::get_record_sync(conn, id))
            .await
    }
}

#[async_trait]
impl TranslationStore for Repository {
    async fn find_latest(
        &self,
        input_text: &str,
        source_lang: &str,
        target_lang: &str,
        level: &str,
    ) -> Result<Option<TranslationRecord>> {
        let input_hash = Self::hash_text(input_text);
        let input_text = input_text.to_string();
        let source_lang = source_lang.to_string();
        let target_lang = target_lang.to_string();
        let level = level.to_string();

        self.db
            .execute_async(move |conn| {
                let record = conn
                    .query_row(
                        &format!(
                            r#"
                            SELECT {} FROM translations
                            WHERE input_hash = ?1
                              AND input_text = ?2
                              AND source_lang = ?3
                              AND target_lang = ?4
                              AND level = ?5
                            ORDER BY id DESC
                            LIMIT 1
                            "#,
                            RECORD_COLUMNS
                        ),
                        params![input_hash, input_text, source_lang, target_lang, level],
                        Self::parse_record_row,
                    )
                    .optional()?;
                Ok(record)
            })
            .await
    }

    async fn create(&self, record: NewTranslation) -> Result<TranslationRecord> {
        let created_at = timestamp_now();
        let input_hash = Self::hash_text(&record.input_text);

        let record = self
            .db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO translations (
                        owner_id, input_hash, input_text, output_text,
                        source_lang, target_lang, level, created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    "#,
                    params![
                        record.owner,
                        input_hash,
                        record.input_text,
                        record.output_text,
                        record.source_lang,
                        record.target_lang,
                        record.level,
                        created_at,
                    ],
                )?;
                let id = conn.last_insert_rowid();
                Ok(record.into_record(id, created_at))
            })
            .await?;

        info!("Stored translation #{} for owner {}", record.id, record.owner);
        self.notify(RecordEvent::Created(record.clone())).await;
        Ok(record)
    }

    async fn delete(&self, id: i64) -> Result<Option<TranslationRecord>> {
        let removed = self
            .db
            .transaction_async(move |tx| {
                let record = Self::get_record_sync(tx, id)?;
                if record.is_some() {
                    tx.execute("DELETE FROM translations WHERE id = ?1", [id])?;
                }
                Ok(record)
            })
            .await?;

        if let Some(record) = &removed {
            info!("Deleted translation #{}", record.id);
            self.notify(RecordEvent::Deleted(record.clone())).await;
        }
        Ok(removed)
    }

    async fn list_for_owner(&self, owner: i64) -> Result<Vec<TranslationRecord>> {
        self.db
            .execute_async(move |conn| Self::list_for_owner_sync(conn, owner))
            .await
    }

    async fn delete_for_owner(&self, owner: i64) -> Result<usize> {
        let removed = self
            .db
            .transaction_async(move |tx| {
                let records = Self::list_for_owner_sync(tx, owner)?;
                tx.execute("DELETE FROM translations WHERE owner_id = ?1", [owner])?;
                Ok(records)
            })
            .await?;

        info!("Deleted {} translation(s) of owner {}", removed.len(), owner);
        let count = removed.len();
        for record in removed {
            self.notify(RecordEvent::Deleted(record)).await;
        }
        Ok(count)
    }
}
