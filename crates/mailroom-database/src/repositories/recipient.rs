//! Recipient repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use mailroom_core::error::{AppError, ErrorKind};
use mailroom_core::result::AppResult;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_entity::recipient::Recipient;

use crate::params;
use crate::store::Store;
use crate::write_queue::{WriteQueue, WriteStmt};

use super::{row_ts, row_uuid};

const RECIPIENT_COLUMNS: &str =
    "id, employee_id, name, email, department, phone, location, is_active, created_at, updated_at";

fn map_recipient(row: &Row<'_>) -> rusqlite::Result<Recipient> {
    Ok(Recipient {
        id: row_uuid(row, 0)?,
        employee_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        // Nullable in storage, mandatory at the service layer; the backfill
        // migration guarantees a value for pre-existing rows.
        department: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        phone: row.get(5)?,
        location: row.get(6)?,
        is_active: row.get(7)?,
        created_at: row_ts(row, 8)?,
        updated_at: row_ts(row, 9)?,
    })
}

/// Repository for recipient reads and writes.
#[derive(Clone)]
pub struct RecipientRepository {
    store: Store,
    queue: Arc<WriteQueue>,
}

impl RecipientRepository {
    /// Create a new recipient repository.
    pub fn new(store: Store, queue: Arc<WriteQueue>) -> Self {
        Self { store, queue }
    }

    /// Build the insert statement for a recipient (used standalone and in
    /// import batches).
    pub fn insert_stmt(&self, recipient: &Recipient) -> WriteStmt {
        WriteStmt::new(
            "INSERT INTO recipients
               (id, employee_id, name, email, department, phone, location,
                is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            vec![
                params::uuid(recipient.id),
                params::text(recipient.employee_id.clone()),
                params::text(recipient.name.clone()),
                params::text(recipient.email.clone()),
                params::text(recipient.department.clone()),
                params::opt_text(recipient.phone.clone()),
                params::opt_text(recipient.location.clone()),
                params::boolean(recipient.is_active),
                params::timestamp(recipient.created_at),
                params::timestamp(recipient.updated_at),
            ],
        )
    }

    /// Build the update statement for a recipient's mutable fields.
    /// `employee_id` is immutable and never touched.
    pub fn update_stmt(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
        department: &str,
        phone: Option<String>,
        location: Option<String>,
        now: DateTime<Utc>,
    ) -> WriteStmt {
        WriteStmt::new(
            "UPDATE recipients SET name = ?2, email = ?3, department = ?4,
                                   phone = ?5, location = ?6, updated_at = ?7
             WHERE id = ?1",
            vec![
                params::uuid(id),
                params::text(name),
                params::text(email),
                params::text(department),
                params::opt_text(phone),
                params::opt_text(location),
                params::timestamp(now),
            ],
        )
    }

    /// Insert one recipient.
    pub async fn insert(&self, recipient: &Recipient) -> AppResult<()> {
        self.queue
            .submit(self.insert_stmt(recipient))
            .await
            .map(|_| ())
    }

    /// Apply a pre-built statement through the queue.
    pub async fn apply(&self, stmt: WriteStmt) -> AppResult<usize> {
        self.queue.submit(stmt).await
    }

    /// Apply a chunk of statements atomically (bulk import).
    pub async fn apply_batch(&self, stmts: Vec<WriteStmt>) -> AppResult<()> {
        self.queue.submit_batch(stmts).await
    }

    /// Find a recipient by primary key.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Recipient>> {
        let sql = format!("SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE id = ?1");
        self.store
            .with_read(move |conn| {
                conn.query_row(&sql, [id.to_string()], map_recipient)
                    .optional()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to find recipient", e)
                    })
            })
            .await
    }

    /// Find a recipient by employee id.
    pub async fn find_by_employee_id(&self, employee_id: &str) -> AppResult<Option<Recipient>> {
        let sql = format!("SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE employee_id = ?1");
        let employee_id = employee_id.to_string();
        self.store
            .with_read(move |conn| {
                conn.query_row(&sql, [employee_id], map_recipient)
                    .optional()
                    .map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Database,
                            "Failed to find recipient by employee id",
                            e,
                        )
                    })
            })
            .await
    }

    /// Whether an email is in use, optionally excluding one recipient.
    pub async fn email_in_use(&self, email: &str, exclude: Option<Uuid>) -> AppResult<bool> {
        let email = email.to_string();
        self.store
            .with_read(move |conn| {
                let count: i64 = match exclude {
                    Some(id) => conn
                        .query_row(
                            "SELECT COUNT(*) FROM recipients WHERE email = ?1 AND id != ?2",
                            rusqlite::params![email, id.to_string()],
                            |row| row.get(0),
                        )
                        .map_err(|e| {
                            AppError::with_source(ErrorKind::Database, "Failed to check email", e)
                        })?,
                    None => conn
                        .query_row(
                            "SELECT COUNT(*) FROM recipients WHERE email = ?1",
                            [email],
                            |row| row.get(0),
                        )
                        .map_err(|e| {
                            AppError::with_source(ErrorKind::Database, "Failed to check email", e)
                        })?,
                };
                Ok(count > 0)
            })
            .await
    }

    /// Search recipients by name, employee id, or email.
    pub async fn search(
        &self,
        query: Option<String>,
        department: Option<String>,
        active_only: bool,
        page: PageRequest,
    ) -> AppResult<PageResponse<Recipient>> {
        self.store
            .with_read(move |conn| {
                let mut conditions: Vec<&str> = Vec::new();
                let mut args: Vec<rusqlite::types::Value> = Vec::new();

                if let Some(q) = &query {
                    conditions.push("(name LIKE ? OR employee_id LIKE ? OR email LIKE ?)");
                    let pattern = format!("%{q}%");
                    args.push(params::text(pattern.clone()));
                    args.push(params::text(pattern.clone()));
                    args.push(params::text(pattern));
                }
                if let Some(dept) = &department {
                    conditions.push("department = ?");
                    args.push(params::text(dept.clone()));
                }
                if active_only {
                    conditions.push("is_active = 1");
                }

                let where_sql = if conditions.is_empty() {
                    "1=1".to_string()
                } else {
                    conditions.join(" AND ")
                };

                let total: i64 = conn
                    .query_row(
                        &format!("SELECT COUNT(*) FROM recipients WHERE {where_sql}"),
                        rusqlite::params_from_iter(args.iter()),
                        |row| row.get(0),
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to count recipients", e)
                    })?;

                let sql = format!(
                    "SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE {where_sql} \
                     ORDER BY name ASC, id ASC LIMIT ? OFFSET ?"
                );
                args.push(params::integer(page.limit() as i64));
                args.push(params::integer(page.offset() as i64));

                let mut stmt = conn.prepare(&sql).map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to prepare recipient search",
                        e,
                    )
                })?;
                let recipients = stmt
                    .query_map(rusqlite::params_from_iter(args.iter()), map_recipient)
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to search recipients", e)
                    })?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Database,
                            "Failed to read recipient rows",
                            e,
                        )
                    })?;

                Ok(PageResponse::new(
                    recipients,
                    page.page,
                    page.limit(),
                    total as u64,
                ))
            })
            .await
    }

    /// Soft-deactivate a recipient.
    pub async fn deactivate(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let stmt = WriteStmt::new(
            "UPDATE recipients SET is_active = 0, updated_at = ?2 WHERE id = ?1",
            vec![params::uuid(id), params::timestamp(now)],
        );
        let rows = self.queue.submit(stmt).await?;
        if rows == 0 {
            return Err(AppError::not_found("Recipient not found"));
        }
        Ok(())
    }

    /// Count the recipient's packages in a non-terminal state. Deactivation
    /// is refused while this is non-zero.
    pub async fn open_package_count(&self, recipient_id: Uuid) -> AppResult<u64> {
        self.store
            .with_read(move |conn| {
                let count: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM packages
                         WHERE recipient_id = ?1
                           AND status IN ('registered', 'awaiting_pickup', 'out_for_delivery')",
                        [recipient_id.to_string()],
                        |row| row.get(0),
                    )
                    .map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Database,
                            "Failed to count open packages",
                            e,
                        )
                    })?;
                Ok(count as u64)
            })
            .await
    }

    /// Distinct department names, for filter dropdowns.
    pub async fn departments(&self) -> AppResult<Vec<String>> {
        self.store
            .with_read(|conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT DISTINCT department FROM recipients
                         WHERE department IS NOT NULL AND TRIM(department) != ''
                         ORDER BY department ASC",
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to prepare departments", e)
                    })?;
                let rows = stmt
                    .query_map([], |row| row.get::<_, String>(0))
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to list departments", e)
                    })?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to read departments", e)
                    });
                rows
            })
            .await
    }
}
