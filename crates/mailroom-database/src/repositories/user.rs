//! User repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use mailroom_core::error::{AppError, ErrorKind};
use mailroom_core::result::AppResult;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_entity::user::{Role, User, UserPublic};

use crate::params;
use crate::store::Store;
use crate::write_queue::{WriteQueue, WriteStmt};

use super::{row_opt_ts, row_parsed, row_ts, row_uuid};

const USER_COLUMNS: &str = "id, username, password_hash, full_name, role, is_active, \
     must_change_password, password_history, failed_login_count, locked_until, \
     created_at, updated_at";

pub(crate) fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row_uuid(row, 0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        full_name: row.get(3)?,
        role: row_parsed(row, 4)?,
        is_active: row.get(5)?,
        must_change_password: row.get(6)?,
        password_history: row.get(7)?,
        failed_login_count: row.get::<_, i64>(8)? as u32,
        locked_until: row_opt_ts(row, 9)?,
        created_at: row_ts(row, 10)?,
        updated_at: row_ts(row, 11)?,
    })
}

/// Repository for user reads and single-statement user writes.
#[derive(Clone)]
pub struct UserRepository {
    store: Store,
    queue: Arc<WriteQueue>,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(store: Store, queue: Arc<WriteQueue>) -> Self {
        Self { store, queue }
    }

    /// Find a user by primary key.
    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        self.store
            .with_read(move |conn| {
                conn.query_row(&sql, [id.to_string()], map_user)
                    .optional()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to find user by id", e)
                    })
            })
            .await
    }

    /// Find a user by username (case-sensitive; usernames are immutable).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
        let username = username.to_string();
        self.store
            .with_read(move |conn| {
                conn.query_row(&sql, [username], map_user)
                    .optional()
                    .map_err(|e| {
                        AppError::with_source(
                            ErrorKind::Database,
                            "Failed to find user by username",
                            e,
                        )
                    })
            })
            .await
    }

    /// Whether a username is already taken.
    pub async fn username_exists(&self, username: &str) -> AppResult<bool> {
        let username = username.to_string();
        self.store
            .with_read(move |conn| {
                let count: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM users WHERE username = ?1",
                        [username],
                        |row| row.get(0),
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to check username", e)
                    })?;
                Ok(count > 0)
            })
            .await
    }

    /// Search and filter users, newest first.
    pub async fn search(
        &self,
        query: Option<String>,
        role: Option<Role>,
        is_active: Option<bool>,
        page: PageRequest,
    ) -> AppResult<PageResponse<UserPublic>> {
        self.store
            .with_read(move |conn| {
                let mut conditions: Vec<&str> = Vec::new();
                let mut args: Vec<rusqlite::types::Value> = Vec::new();

                if let Some(q) = &query {
                    conditions.push("(username LIKE ? OR full_name LIKE ?)");
                    let pattern = format!("%{q}%");
                    args.push(params::text(pattern.clone()));
                    args.push(params::text(pattern));
                }
                if let Some(role) = role {
                    conditions.push("role = ?");
                    args.push(params::text(role.as_str()));
                }
                if let Some(active) = is_active {
                    conditions.push("is_active = ?");
                    args.push(params::boolean(active));
                }

                let where_sql = if conditions.is_empty() {
                    "1=1".to_string()
                } else {
                    conditions.join(" AND ")
                };

                let total: i64 = conn
                    .query_row(
                        &format!("SELECT COUNT(*) FROM users WHERE {where_sql}"),
                        rusqlite::params_from_iter(args.iter()),
                        |row| row.get(0),
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to count users", e)
                    })?;

                let sql = format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE {where_sql} \
                     ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
                );
                args.push(params::integer(page.limit() as i64));
                args.push(params::integer(page.offset() as i64));

                let mut stmt = conn.prepare(&sql).map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to prepare user search", e)
                })?;
                let users = stmt
                    .query_map(rusqlite::params_from_iter(args.iter()), map_user)
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to search users", e)
                    })?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to read user rows", e)
                    })?;

                let items = users.iter().map(User::to_public).collect();
                Ok(PageResponse::new(
                    items,
                    page.page,
                    page.limit(),
                    total as u64,
                ))
            })
            .await
    }

    /// Insert a fully-populated user record.
    pub async fn insert(&self, user: &User) -> AppResult<()> {
        let stmt = WriteStmt::new(
            "INSERT INTO users
               (id, username, password_hash, full_name, role, is_active,
                must_change_password, password_history, failed_login_count,
                locked_until, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            vec![
                params::uuid(user.id),
                params::text(user.username.clone()),
                params::text(user.password_hash.clone()),
                params::text(user.full_name.clone()),
                params::text(user.role.as_str()),
                params::boolean(user.is_active),
                params::boolean(user.must_change_password),
                params::opt_text(user.password_history.clone()),
                params::integer(i64::from(user.failed_login_count)),
                params::opt_timestamp(user.locked_until),
                params::timestamp(user.created_at),
                params::timestamp(user.updated_at),
            ],
        );
        self.queue.submit(stmt).await.map(|_| ())
    }

    /// Update display name and/or role.
    pub async fn update_profile(
        &self,
        id: Uuid,
        full_name: Option<String>,
        role: Option<Role>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let stmt = WriteStmt::new(
            "UPDATE users SET full_name = COALESCE(?2, full_name),
                              role = COALESCE(?3, role),
                              updated_at = ?4
             WHERE id = ?1",
            vec![
                params::uuid(id),
                params::opt_text(full_name),
                params::opt_text(role.map(|r| r.as_str().to_string())),
                params::timestamp(now),
            ],
        );
        let rows = self.queue.submit(stmt).await?;
        if rows == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    /// Replace the password digest and history; optionally force a change on
    /// next login and clear any lockout.
    #[allow(clippy::too_many_arguments)]
    pub async fn set_password(
        &self,
        id: Uuid,
        password_hash: String,
        password_history: String,
        must_change_password: bool,
        clear_lockout: bool,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let sql = if clear_lockout {
            "UPDATE users SET password_hash = ?2, password_history = ?3,
                              must_change_password = ?4, failed_login_count = 0,
                              locked_until = NULL, updated_at = ?5
             WHERE id = ?1"
        } else {
            "UPDATE users SET password_hash = ?2, password_history = ?3,
                              must_change_password = ?4, updated_at = ?5
             WHERE id = ?1"
        };
        let stmt = WriteStmt::new(
            sql,
            vec![
                params::uuid(id),
                params::text(password_hash),
                params::text(password_history),
                params::boolean(must_change_password),
                params::timestamp(now),
            ],
        );
        let rows = self.queue.submit(stmt).await?;
        if rows == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    /// Soft-deactivate a user.
    pub async fn deactivate(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let stmt = WriteStmt::new(
            "UPDATE users SET is_active = 0, updated_at = ?2 WHERE id = ?1",
            vec![params::uuid(id), params::timestamp(now)],
        );
        let rows = self.queue.submit(stmt).await?;
        if rows == 0 {
            return Err(AppError::not_found("User not found"));
        }
        Ok(())
    }

    /// Record a failed login: bump the counter and, past the threshold, set
    /// the lockout timestamp.
    pub async fn record_failed_login(
        &self,
        username: &str,
        new_count: u32,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let stmt = match locked_until {
            Some(until) => WriteStmt::new(
                "UPDATE users SET failed_login_count = ?2, locked_until = ?3, updated_at = ?4
                 WHERE username = ?1",
                vec![
                    params::text(username),
                    params::integer(i64::from(new_count)),
                    params::timestamp(until),
                    params::timestamp(now),
                ],
            ),
            None => WriteStmt::new(
                "UPDATE users SET failed_login_count = ?2, updated_at = ?3 WHERE username = ?1",
                vec![
                    params::text(username),
                    params::integer(i64::from(new_count)),
                    params::timestamp(now),
                ],
            ),
        };
        self.queue.submit(stmt).await.map(|_| ())
    }

    /// Reset the failed-login counter and clear any lockout.
    pub async fn reset_failed_login(&self, username: &str, now: DateTime<Utc>) -> AppResult<()> {
        let stmt = WriteStmt::new(
            "UPDATE users SET failed_login_count = 0, locked_until = NULL, updated_at = ?2
             WHERE username = ?1",
            vec![params::text(username), params::timestamp(now)],
        );
        self.queue.submit(stmt).await.map(|_| ())
    }
}
