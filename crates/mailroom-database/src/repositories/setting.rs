//! System settings repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use mailroom_core::error::{AppError, ErrorKind};
use mailroom_core::result::AppResult;
use mailroom_entity::setting::Setting;

use crate::params;
use crate::store::Store;
use crate::write_queue::{WriteQueue, WriteStmt};

use super::row_ts;

/// Repository for the process-wide key/value settings table.
#[derive(Clone)]
pub struct SettingRepository {
    store: Store,
    queue: Arc<WriteQueue>,
}

impl SettingRepository {
    /// Create a new settings repository.
    pub fn new(store: Store, queue: Arc<WriteQueue>) -> Self {
        Self { store, queue }
    }

    /// Read a setting. Tolerates the whole table being absent (older
    /// database snapshots predate it) by answering "not set".
    pub async fn get(&self, key: &str) -> AppResult<Option<Setting>> {
        let key = key.to_string();
        self.store
            .with_read(move |conn| {
                let result = conn
                    .query_row(
                        "SELECT key, value, updated_by, updated_at
                         FROM system_settings WHERE key = ?1",
                        [key],
                        |row| {
                            Ok(Setting {
                                key: row.get(0)?,
                                value: row.get(1)?,
                                updated_by: row.get(2)?,
                                updated_at: row_ts(row, 3)?,
                            })
                        },
                    )
                    .optional();
                match result {
                    Ok(setting) => Ok(setting),
                    Err(e) if e.to_string().contains("no such table") => Ok(None),
                    Err(e) => Err(AppError::with_source(
                        ErrorKind::Database,
                        "Failed to read setting",
                        e,
                    )),
                }
            })
            .await
    }

    /// Build the upsert statement for a setting.
    pub fn upsert_stmt(
        &self,
        key: &str,
        value: &str,
        updated_by: Uuid,
        now: DateTime<Utc>,
    ) -> WriteStmt {
        WriteStmt::new(
            "INSERT INTO system_settings (key, value, updated_by, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                 value = excluded.value,
                 updated_by = excluded.updated_by,
                 updated_at = excluded.updated_at",
            vec![
                params::text(key),
                params::text(value),
                params::text(updated_by.to_string()),
                params::timestamp(now),
            ],
        )
    }

    /// Apply an atomic batch (setting write plus its audit record).
    pub async fn apply_batch(&self, stmts: Vec<WriteStmt>) -> AppResult<()> {
        self.queue.submit_batch(stmts).await
    }
}
