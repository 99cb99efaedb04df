//! Session repository.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Row};
use uuid::Uuid;

use mailroom_core::error::{AppError, ErrorKind};
use mailroom_core::result::AppResult;
use mailroom_entity::session::Session;
use mailroom_entity::user::User;

use crate::params::{self, format_ts};
use crate::store::Store;
use crate::write_queue::{WriteQueue, WriteStmt};

use super::{row_opt_ts, row_ts, row_uuid};

const SESSION_COLUMNS: &str =
    "id, user_id, token, expires_at, last_activity, ip_address, user_agent, created_at";

fn map_session(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row_uuid(row, 0)?,
        user_id: row_uuid(row, 1)?,
        token: row.get(2)?,
        expires_at: row_ts(row, 3)?,
        last_activity: row_ts(row, 4)?,
        ip_address: row.get(5)?,
        user_agent: row.get(6)?,
        created_at: row_ts(row, 7)?,
    })
}

fn map_session_with_user(row: &Row<'_>) -> rusqlite::Result<(Session, User)> {
    let session = Session {
        id: row_uuid(row, 0)?,
        user_id: row_uuid(row, 1)?,
        token: row.get(2)?,
        expires_at: row_ts(row, 3)?,
        last_activity: row_ts(row, 4)?,
        ip_address: row.get(5)?,
        user_agent: row.get(6)?,
        created_at: row_ts(row, 7)?,
    };
    let user = User {
        id: row_uuid(row, 8)?,
        username: row.get(9)?,
        password_hash: row.get(10)?,
        full_name: row.get(11)?,
        role: super::row_parsed(row, 12)?,
        is_active: row.get(13)?,
        must_change_password: row.get(14)?,
        password_history: row.get(15)?,
        failed_login_count: row.get::<_, i64>(16)? as u32,
        locked_until: row_opt_ts(row, 17)?,
        created_at: row_ts(row, 18)?,
        updated_at: row_ts(row, 19)?,
    };
    Ok((session, user))
}

/// Repository for session reads and writes.
#[derive(Clone)]
pub struct SessionRepository {
    store: Store,
    queue: Arc<WriteQueue>,
}

impl SessionRepository {
    /// Create a new session repository.
    pub fn new(store: Store, queue: Arc<WriteQueue>) -> Self {
        Self { store, queue }
    }

    /// Persist a new session. Awaited so the row is visible to read handles
    /// before the login response leaves the process.
    pub async fn insert(&self, session: &Session) -> AppResult<()> {
        let stmt = WriteStmt::new(
            "INSERT INTO sessions
               (id, user_id, token, expires_at, last_activity, ip_address, user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            vec![
                params::uuid(session.id),
                params::uuid(session.user_id),
                params::text(session.token.clone()),
                params::timestamp(session.expires_at),
                params::timestamp(session.last_activity),
                params::opt_text(session.ip_address.clone()),
                params::opt_text(session.user_agent.clone()),
                params::timestamp(session.created_at),
            ],
        );
        self.queue.submit(stmt).await.map(|_| ())
    }

    /// Look up a live session by token together with its owning user.
    /// Expired rows are treated as absent; the startup sweep removes them.
    pub async fn find_valid_by_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<Option<(Session, User)>> {
        let token = token.to_string();
        let sql = format!(
            "SELECT s.{}, u.id, u.username, u.password_hash, u.full_name, u.role, \
                    u.is_active, u.must_change_password, u.password_history, \
                    u.failed_login_count, u.locked_until, u.created_at, u.updated_at \
             FROM sessions s JOIN users u ON s.user_id = u.id \
             WHERE s.token = ?1 AND s.expires_at > ?2",
            SESSION_COLUMNS.replace(", ", ", s."),
        );
        self.store
            .with_read(move |conn| {
                conn.query_row(
                    &sql,
                    rusqlite::params![token, format_ts(now)],
                    map_session_with_user,
                )
                .optional()
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to look up session", e)
                })
            })
            .await
    }

    /// Count active sessions for a user.
    pub async fn count_active_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64> {
        self.store
            .with_read(move |conn| {
                let count: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM sessions WHERE user_id = ?1 AND expires_at > ?2",
                        rusqlite::params![user_id.to_string(), format_ts(now)],
                        |row| row.get(0),
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to count sessions", e)
                    })?;
                Ok(count as u64)
            })
            .await
    }

    /// Active sessions for a user, oldest first (for cap enforcement).
    pub async fn active_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE user_id = ?1 AND expires_at > ?2 ORDER BY created_at ASC, id ASC"
        );
        self.store
            .with_read(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to prepare session list", e)
                })?;
                let rows = stmt
                    .query_map(
                        rusqlite::params![user_id.to_string(), format_ts(now)],
                        map_session,
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to list sessions", e)
                    })?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to read session rows", e)
                    });
                rows
            })
            .await
    }

    /// Active sessions for a user, most recent activity first (self-service
    /// view).
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<Session>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions \
             WHERE user_id = ?1 AND expires_at > ?2 ORDER BY last_activity DESC"
        );
        self.store
            .with_read(move |conn| {
                let mut stmt = conn.prepare(&sql).map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to prepare session list", e)
                })?;
                let rows = stmt
                    .query_map(
                        rusqlite::params![user_id.to_string(), format_ts(now)],
                        map_session,
                    )
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to list sessions", e)
                    })?
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Failed to read session rows", e)
                    });
                rows
            })
            .await
    }

    /// Extend a live session's expiry and touch its activity watermark.
    /// Idempotent within the renewal window: the guard on `last_activity`
    /// keeps concurrent renewals down to at most one write per window.
    pub async fn renew(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
        activity_watermark: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let stmt = WriteStmt::new(
            "UPDATE sessions SET expires_at = ?2, last_activity = ?3
             WHERE token = ?1 AND expires_at > ?3 AND last_activity <= ?4",
            vec![
                params::text(token),
                params::timestamp(expires_at),
                params::timestamp(now),
                params::timestamp(activity_watermark),
            ],
        );
        self.queue.submit(stmt).await.map(|_| ())
    }

    /// Delete a session by its token.
    pub async fn delete_by_token(&self, token: &str) -> AppResult<()> {
        let stmt = WriteStmt::new(
            "DELETE FROM sessions WHERE token = ?1",
            vec![params::text(token)],
        );
        self.queue.submit(stmt).await.map(|_| ())
    }

    /// Delete one of a user's own sessions; ownership enforced in SQL.
    pub async fn delete_by_id_for_user(&self, session_id: Uuid, user_id: Uuid) -> AppResult<bool> {
        let stmt = WriteStmt::new(
            "DELETE FROM sessions WHERE id = ?1 AND user_id = ?2",
            vec![params::uuid(session_id), params::uuid(user_id)],
        );
        let rows = self.queue.submit(stmt).await?;
        Ok(rows > 0)
    }

    /// Delete all sessions for a user (logout everywhere, deactivation,
    /// password reset).
    pub async fn delete_for_user(&self, user_id: Uuid) -> AppResult<usize> {
        let stmt = WriteStmt::new(
            "DELETE FROM sessions WHERE user_id = ?1",
            vec![params::uuid(user_id)],
        );
        self.queue.submit(stmt).await
    }

    /// Delete specific sessions by id (oldest-first cap enforcement).
    pub async fn delete_ids(&self, ids: &[Uuid]) -> AppResult<()> {
        for id in ids {
            let stmt = WriteStmt::new(
                "DELETE FROM sessions WHERE id = ?1",
                vec![params::uuid(*id)],
            );
            self.queue.submit(stmt).await?;
        }
        Ok(())
    }
}
