//! Package repository: lifecycle rows, the event log, attachments, and the
//! read projections (search, detail, dashboard, export).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use mailroom_core::error::{AppError, ErrorKind};
use mailroom_core::result::AppResult;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_entity::attachment::Attachment;
use mailroom_entity::package::{Package, PackageEvent, PackageStatus};

use crate::params::{self, format_ts};
use crate::store::Store;
use crate::write_queue::{WriteQueue, WriteStmt};

use super::{row_opt_parsed, row_parsed, row_ts, row_uuid};

const PACKAGE_COLUMNS: &str = "id, tracking_no, carrier, recipient_id, status, notes, \
     created_by, created_at, updated_at";

fn map_package(row: &Row<'_>) -> rusqlite::Result<Package> {
    Ok(Package {
        id: row_uuid(row, 0)?,
        tracking_no: row.get(1)?,
        carrier: row.get(2)?,
        recipient_id: row_uuid(row, 3)?,
        status: row_parsed(row, 4)?,
        notes: row.get(5)?,
        created_by: row_uuid(row, 6)?,
        created_at: row_ts(row, 7)?,
        updated_at: row_ts(row, 8)?,
    })
}

fn map_event(row: &Row<'_>) -> rusqlite::Result<PackageEvent> {
    Ok(PackageEvent {
        id: row_uuid(row, 0)?,
        package_id: row_uuid(row, 1)?,
        old_status: row_opt_parsed(row, 2)?,
        new_status: row_parsed(row, 3)?,
        notes: row.get(4)?,
        actor_id: row_uuid(row, 5)?,
        created_at: row_ts(row, 6)?,
    })
}

fn map_attachment(row: &Row<'_>) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row_uuid(row, 0)?,
        package_id: row_uuid(row, 1)?,
        filename: row.get(2)?,
        file_path: row.get(3)?,
        mime_type: row.get(4)?,
        file_size: row.get::<_, i64>(5)? as u64,
        uploaded_by: row_uuid(row, 6)?,
        created_at: row_ts(row, 7)?,
    })
}

/// List/search row: a package joined with its recipient and creator names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSummary {
    pub id: Uuid,
    pub tracking_no: String,
    pub carrier: String,
    pub recipient_id: Uuid,
    pub recipient_name: String,
    pub recipient_department: String,
    pub status: PackageStatus,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn map_summary(row: &Row<'_>) -> rusqlite::Result<PackageSummary> {
    Ok(PackageSummary {
        id: row_uuid(row, 0)?,
        tracking_no: row.get(1)?,
        carrier: row.get(2)?,
        recipient_id: row_uuid(row, 3)?,
        recipient_name: row.get(4)?,
        recipient_department: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        status: row_parsed(row, 6)?,
        notes: row.get(7)?,
        created_by: row_uuid(row, 8)?,
        created_by_name: row.get(9)?,
        created_at: row_ts(row, 10)?,
        updated_at: row_ts(row, 11)?,
    })
}

const SUMMARY_SELECT: &str = "SELECT p.id, p.tracking_no, p.carrier, p.recipient_id, \
            r.name, r.department, p.status, p.notes, p.created_by, u.full_name, \
            p.created_at, p.updated_at \
     FROM packages p \
     JOIN recipients r ON p.recipient_id = r.id \
     JOIN users u ON p.created_by = u.id";

/// Search filters for the package list projection.
#[derive(Debug, Clone, Default)]
pub struct PackageFilters {
    /// Free text matched against tracking number and recipient name.
    pub query: Option<String>,
    pub status: Option<PackageStatus>,
    pub department: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub recipient_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
}

/// One row of the report/export projection.
#[derive(Debug, Clone, Serialize)]
pub struct ExportRow {
    pub tracking_no: String,
    pub carrier: String,
    pub recipient_name: String,
    pub recipient_department: String,
    pub status: PackageStatus,
    pub created_by_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Repository for package reads and write-statement builders.
#[derive(Clone)]
pub struct PackageRepository {
    store: Store,
    queue: Arc<WriteQueue>,
}

impl PackageRepository {
    /// Create a new package repository.
    pub fn new(store: Store, queue: Arc<WriteQueue>) -> Self {
        Self { store, queue }
    }

    /// Build the insert statement for a package row.
    pub fn insert_stmt(&self, package: &Package) -> WriteStmt {
        WriteStmt::new(
            "INSERT INTO packages
               (id, tracking_no, carrier, recipient_id, status, notes,
                created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            vec![
                params::uuid(package.id),
                params::text(package.tracking_no.clone()),
                params::text(package.carrier.clone()),
                params::uuid(package.recipient_id),
                params::text(package.status.as_str()),
                params::opt_text(package.notes.clone()),
                params::uuid(package.created_by),
                params::timestamp(package.created_at),
                params::timestamp(package.updated_at),
            ],
        )
    }

    /// Build the insert statement for a lifecycle event.
    pub fn event_stmt(&self, event: &PackageEvent) -> WriteStmt {
        WriteStmt::new(
            "INSERT INTO package_events
               (id, package_id, old_status, new_status, notes, actor_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            vec![
                params::uuid(event.id),
                params::uuid(event.package_id),
                params::opt_text(event.old_status.map(|s| s.as_str().to_string())),
                params::text(event.new_status.as_str()),
                params::opt_text(event.notes.clone()),
                params::uuid(event.actor_id),
                params::timestamp(event.created_at),
            ],
        )
    }

    /// Build the status-update statement for a package.
    pub fn status_update_stmt(
        &self,
        package_id: Uuid,
        status: PackageStatus,
        now: DateTime<Utc>,
    ) -> WriteStmt {
        WriteStmt::new(
            "UPDATE packages SET status = ?2, updated_at = ?3 WHERE id = ?1",
            vec![
                params::uuid(package_id),
                params::text(status.as_str()),
                params::timestamp(now),
            ],
        )
    }

    /// Build the insert statement for an attachment row.
    pub fn attachment_stmt(&self, attachment: &Attachment) -> WriteStmt {
        WriteStmt::new(
            "INSERT INTO attachments
               (id, package_id, filename, file_path, mime_type, file_size,
                uploaded_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            vec![
                params::uuid(attachment.id),
                params::uuid(attachment.package_id),
                params::text(attachment.filename.clone()),
                params::text(attachment.file_path.clone()),
                params::text(attachment.mime_type.clone()),
                params::integer(attachment.file_size as i64),
                params::uuid(attachment.uploaded_by),
                params::timestamp(attachment.created_at),
            ],
        )
    }

    /// Apply an atomic batch (registration, transition).
    pub async fn apply_batch(&self, stmts: Vec<WriteStmt>) -> AppResult<()> {
        self.queue.submit_batch(stmts).await
    }

    /// Find a package by primary key.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Package>> {
        let sql = format!("SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?1");
        self.store
            .with_read(move |conn| {
                conn.query_row(&sql, [id.to_string()], map_package)
                    .optional()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to find package", e)
                    })
            })
            .await
    }

    /// Search packages, newest first with a stable id tie-break.
    pub async fn search(
        &self,
        filters: PackageFilters,
        page: PageRequest,
    ) -> AppResult<PageResponse<PackageSummary>> {
        self.store
            .with_read(move |conn| {
                let (where_sql, args) = build_filter_clause(&filters);

                let total: i64 = conn
                    .query_row(
                        &format!(
                            "SELECT COUNT(*) FROM packages p \
                             JOIN recipients r ON p.recipient_id = r.id \
                             WHERE {where_sql}"
                        ),
                        rusqlite::params_from_iter(args.iter()),
                        |row| row.get(0),
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to count packages", e)
                    })?;

                let sql = format!(
                    "{SUMMARY_SELECT} WHERE {where_sql} \
                     ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?"
                );
                let mut args = args;
                args.push(params::integer(page.limit() as i64));
                args.push(params::integer(page.offset() as i64));

                let mut stmt = conn.prepare(&sql).map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to prepare package search", e)
                })?;
                let packages = stmt
                    .query_map(rusqlite::params_from_iter(args.iter()), map_summary)
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to search packages", e)
                    })?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to read package rows", e)
                    })?;

                Ok(PageResponse::new(
                    packages,
                    page.page,
                    page.limit(),
                    total as u64,
                ))
            })
            .await
    }

    /// Detail projection for one package.
    pub async fn summary_by_id(&self, id: Uuid) -> AppResult<Option<PackageSummary>> {
        let sql = format!("{SUMMARY_SELECT} WHERE p.id = ?1");
        self.store
            .with_read(move |conn| {
                conn.query_row(&sql, [id.to_string()], map_summary)
                    .optional()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to load package detail", e)
                    })
            })
            .await
    }

    /// The package's event timeline: `created_at` ascending, ties broken by
    /// id so the order is total.
    pub async fn timeline(&self, package_id: Uuid) -> AppResult<Vec<PackageEvent>> {
        self.store
            .with_read(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, package_id, old_status, new_status, notes, actor_id, created_at
                         FROM package_events WHERE package_id = ?1
                         ORDER BY created_at ASC, id ASC",
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to prepare timeline", e)
                    })?;
                let rows = stmt
                    .query_map([package_id.to_string()], map_event)
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to load timeline", e)
                    })?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to read timeline rows", e)
                    });
                rows
            })
            .await
    }

    /// Attachments for a package, oldest first.
    pub async fn attachments(&self, package_id: Uuid) -> AppResult<Vec<Attachment>> {
        self.store
            .with_read(move |conn| {
                let mut stmt = conn
                    .prepare(
                        "SELECT id, package_id, filename, file_path, mime_type, file_size,
                                uploaded_by, created_at
                         FROM attachments WHERE package_id = ?1 ORDER BY created_at ASC",
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to prepare attachments", e)
                    })?;
                let rows = stmt
                    .query_map([package_id.to_string()], map_attachment)
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to load attachments", e)
                    })?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Database,
                            "Failed to read attachment rows",
                            e,
                        )
                    });
                rows
            })
            .await
    }

    /// Count packages per lifecycle state (dashboard).
    pub async fn status_counts(&self) -> AppResult<Vec<(PackageStatus, u64)>> {
        self.store
            .with_read(|conn| {
                let mut stmt = conn
                    .prepare("SELECT status, COUNT(*) FROM packages GROUP BY status")
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to prepare counts", e)
                    })?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((row_parsed::<PackageStatus>(row, 0)?, row.get::<_, i64>(1)?))
                    })
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to count by status", e)
                    })?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to read count rows", e)
                    })?;
                Ok(rows
                    .into_iter()
                    .map(|(status, count)| (status, count as u64))
                    .collect())
            })
            .await
    }

    /// Count packages registered at or after the given instant (dashboard).
    pub async fn count_created_since(&self, since: DateTime<Utc>) -> AppResult<u64> {
        self.store
            .with_read(move |conn| {
                let count: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM packages WHERE created_at >= ?1",
                        [format_ts(since)],
                        |row| row.get(0),
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to count recent", e)
                    })?;
                Ok(count as u64)
            })
            .await
    }

    /// Export rows for the reports surface, newest first.
    pub async fn export_rows(&self, filters: PackageFilters) -> AppResult<Vec<ExportRow>> {
        self.store
            .with_read(move |conn| {
                let (where_sql, args) = build_filter_clause(&filters);
                let sql = format!(
                    "SELECT p.tracking_no, p.carrier, r.name, r.department, p.status, \
                            u.full_name, p.created_at, p.updated_at \
                     FROM packages p \
                     JOIN recipients r ON p.recipient_id = r.id \
                     JOIN users u ON p.created_by = u.id \
                     WHERE {where_sql} ORDER BY p.created_at DESC, p.id DESC"
                );
                let mut stmt = conn.prepare(&sql).map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to prepare export", e)
                })?;
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(args.iter()), |row| {
                        Ok(ExportRow {
                            tracking_no: row.get(0)?,
                            carrier: row.get(1)?,
                            recipient_name: row.get(2)?,
                            recipient_department: row
                                .get::<_, Option<String>>(3)?
                                .unwrap_or_default(),
                            status: row_parsed(row, 4)?,
                            created_by_name: row.get(5)?,
                            created_at: row_ts(row, 6)?,
                            updated_at: row_ts(row, 7)?,
                        })
                    })
                    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to export", e))?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to read export rows", e)
                    });
                rows
            })
            .await
    }
}

fn build_filter_clause(filters: &PackageFilters) -> (String, Vec<rusqlite::types::Value>) {
    let mut conditions: Vec<&str> = Vec::new();
    let mut args: Vec<rusqlite::types::Value> = Vec::new();

    if let Some(q) = &filters.query {
        conditions.push("(p.tracking_no LIKE ? OR r.name LIKE ?)");
        let pattern = format!("%{q}%");
        args.push(params::text(pattern.clone()));
        args.push(params::text(pattern));
    }
    if let Some(status) = filters.status {
        conditions.push("p.status = ?");
        args.push(params::text(status.as_str()));
    }
    if let Some(dept) = &filters.department {
        conditions.push("r.department = ?");
        args.push(params::text(dept.clone()));
    }
    if let Some(from) = filters.date_from {
        conditions.push("p.created_at >= ?");
        args.push(params::timestamp(from));
    }
    if let Some(to) = filters.date_to {
        conditions.push("p.created_at <= ?");
        args.push(params::timestamp(to));
    }
    if let Some(recipient_id) = filters.recipient_id {
        conditions.push("p.recipient_id = ?");
        args.push(params::uuid(recipient_id));
    }
    if let Some(created_by) = filters.created_by {
        conditions.push("p.created_by = ?");
        args.push(params::uuid(created_by));
    }

    let where_sql = if conditions.is_empty() {
        "1=1".to_string()
    } else {
        conditions.join(" AND ")
    };
    (where_sql, args)
}
