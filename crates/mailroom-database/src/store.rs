//! Embedded store: one writer, many short-lived readers.
//!
//! The database is a single SQLite file in WAL mode. Readers never block the
//! writer and the writer never blocks readers. The only writer is the
//! [`crate::write_queue::WriteQueue`] worker; everything else must use
//! [`Store::with_read`], whose connections are pinned read-only with
//! `PRAGMA query_only`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::Connection;
use tracing::info;

use mailroom_core::error::{AppError, ErrorKind};
use mailroom_core::result::AppResult;

use crate::schema;

/// Handle to the embedded database. Cheap to clone; connections are opened
/// per use.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Open the store: refuse if another process is writing, create the
    /// schema if absent, run migrations, and sweep expired sessions.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { path };

        let conn = store.open_writer()?;
        store.probe_exclusive(&conn)?;
        schema::initialize(&conn)?;
        schema::run_migrations(&conn)?;
        let swept = schema::sweep_expired_sessions(&conn, Utc::now())?;
        if swept > 0 {
            info!(swept, "Swept expired sessions at startup");
        }

        info!(path = %store.path.display(), "Store opened");
        Ok(store)
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a read closure on a fresh read-only connection, off the async
    /// runtime. Safe for concurrent use from any number of tasks.
    pub async fn with_read<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open_read(&path)?;
            f(&conn)
        })
        .await
        .map_err(|e| AppError::internal(format!("Read task panicked: {e}")))?
    }

    /// Open the writer connection. Only the write queue worker (and startup
    /// bootstrap) may call this.
    pub fn open_writer(&self) -> AppResult<Connection> {
        let conn = Connection::open(&self.path).map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to open database", e)
        })?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to enable WAL", e))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set synchronous", e))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to enable FKs", e))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set busy timeout", e))?;
        Ok(conn)
    }

    /// Verify no other process currently holds the write lock.
    fn probe_exclusive(&self, conn: &Connection) -> AppResult<()> {
        conn.busy_timeout(std::time::Duration::ZERO)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set busy timeout", e))?;
        let probe = conn.execute_batch("BEGIN IMMEDIATE; COMMIT;");
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set busy timeout", e))?;
        probe.map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!(
                    "Another process holds the database file {}",
                    self.path.display()
                ),
                e,
            )
        })
    }
}

/// Open a read connection pinned read-only.
fn open_read(path: &Path) -> AppResult<Connection> {
    let conn = Connection::open(path)
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to open read handle", e))?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to set busy timeout", e))?;
    conn.pragma_update(None, "query_only", "ON")
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to pin read-only", e))?;
    Ok(conn)
}
