//! Audit event repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;

use mailroom_core::error::{AppError, ErrorKind};
use mailroom_core::result::AppResult;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_entity::audit::{AuthEvent, AuthEventKind};

use crate::params;
use crate::store::Store;
use crate::write_queue::{WriteQueue, WriteStmt};

use super::{row_opt_uuid, row_parsed, row_ts, row_uuid};

fn map_event(row: &Row<'_>) -> rusqlite::Result<AuthEvent> {
    let details: Option<String> = row.get(5)?;
    Ok(AuthEvent {
        id: row_uuid(row, 0)?,
        user_id: row_opt_uuid(row, 1)?,
        event_type: row_parsed(row, 2)?,
        username: row.get(3)?,
        ip_address: row.get(4)?,
        details: details.and_then(|raw| serde_json::from_str(&raw).ok()),
        created_at: row_ts(row, 6)?,
    })
}

/// Repository for the append-only auth event log.
#[derive(Clone)]
pub struct AuditRepository {
    store: Store,
    queue: Arc<WriteQueue>,
}

impl AuditRepository {
    /// Create a new audit repository.
    pub fn new(store: Store, queue: Arc<WriteQueue>) -> Self {
        Self { store, queue }
    }

    /// Build an insert statement for an audit event, for inclusion in the
    /// same batch as the business write it accompanies.
    pub fn insert_stmt(&self, event: &AuthEvent) -> WriteStmt {
        WriteStmt::new(
            "INSERT INTO auth_events (id, user_id, event_type, username, ip_address, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            vec![
                params::uuid(event.id),
                params::opt_uuid(event.user_id),
                params::text(event.event_type.as_str()),
                params::opt_text(event.username.clone()),
                params::opt_text(event.ip_address.clone()),
                params::opt_text(event.details.as_ref().map(|d| d.to_string())),
                params::timestamp(event.created_at),
            ],
        )
    }

    /// Record one audit event through the queue.
    pub async fn insert(&self, event: &AuthEvent) -> AppResult<()> {
        self.queue
            .submit(self.insert_stmt(event))
            .await
            .map(|_| ())
    }

    /// Search the audit log, newest first.
    pub async fn search(
        &self,
        user_id: Option<Uuid>,
        event_type: Option<AuthEventKind>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        page: PageRequest,
    ) -> AppResult<PageResponse<AuthEvent>> {
        self.store
            .with_read(move |conn| {
                let mut conditions: Vec<&str> = Vec::new();
                let mut args: Vec<rusqlite::types::Value> = Vec::new();

                if let Some(uid) = user_id {
                    conditions.push("user_id = ?");
                    args.push(params::uuid(uid));
                }
                if let Some(kind) = event_type {
                    conditions.push("event_type = ?");
                    args.push(params::text(kind.as_str()));
                }
                if let Some(from) = from {
                    conditions.push("created_at >= ?");
                    args.push(params::timestamp(from));
                }
                if let Some(to) = to {
                    conditions.push("created_at <= ?");
                    args.push(params::timestamp(to));
                }

                let where_sql = if conditions.is_empty() {
                    "1=1".to_string()
                } else {
                    conditions.join(" AND ")
                };

                let total: i64 = conn
                    .query_row(
                        &format!("SELECT COUNT(*) FROM auth_events WHERE {where_sql}"),
                        rusqlite::params_from_iter(args.iter()),
                        |row| row.get(0),
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to count audit events", e)
                    })?;

                let sql = format!(
                    "SELECT id, user_id, event_type, username, ip_address, details, created_at \
                     FROM auth_events WHERE {where_sql} \
                     ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
                );
                args.push(params::integer(page.limit() as i64));
                args.push(params::integer(page.offset() as i64));

                let mut stmt = conn.prepare(&sql).map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to prepare audit search", e)
                })?;
                let events = stmt
                    .query_map(rusqlite::params_from_iter(args.iter()), map_event)
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to search audit log", e)
                    })?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to read audit rows", e)
                    })?;

                Ok(PageResponse::new(
                    events,
                    page.page,
                    page.limit(),
                    total as u64,
                ))
            })
            .await
    }
}
