//! Database schema and one-time migrations.

use rusqlite::Connection;
use tracing::info;

use mailroom_core::error::{AppError, ErrorKind};
use mailroom_core::result::AppResult;

use crate::params::format_ts;

/// Base schema. Identifiers are hyphenated UUID text, timestamps RFC 3339
/// UTC text, booleans 0/1 integers. All ids and timestamps are generated by
/// the application, never by the database.
const SCHEMA_SQL: &str = "
-- Users
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    full_name TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('super_admin', 'admin', 'operator')),
    is_active INTEGER NOT NULL DEFAULT 1,
    must_change_password INTEGER NOT NULL DEFAULT 0,
    password_history TEXT,
    failed_login_count INTEGER NOT NULL DEFAULT 0,
    locked_until TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Sessions
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    token TEXT NOT NULL UNIQUE,
    expires_at TEXT NOT NULL,
    last_activity TEXT NOT NULL,
    ip_address TEXT,
    user_agent TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id)
);

-- Authentication / audit events
CREATE TABLE IF NOT EXISTS auth_events (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    event_type TEXT NOT NULL,
    username TEXT,
    ip_address TEXT,
    details TEXT,
    created_at TEXT NOT NULL
);

-- Recipients
CREATE TABLE IF NOT EXISTS recipients (
    id TEXT PRIMARY KEY,
    employee_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    department TEXT,
    phone TEXT,
    location TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Packages
CREATE TABLE IF NOT EXISTS packages (
    id TEXT PRIMARY KEY,
    tracking_no TEXT NOT NULL,
    carrier TEXT NOT NULL,
    recipient_id TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN
        ('registered', 'awaiting_pickup', 'out_for_delivery', 'delivered', 'returned')),
    notes TEXT,
    created_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (recipient_id) REFERENCES recipients(id),
    FOREIGN KEY (created_by) REFERENCES users(id)
);

-- Package events: append-only status history. No foreign keys so rows
-- survive any future package archival.
CREATE TABLE IF NOT EXISTS package_events (
    id TEXT PRIMARY KEY,
    package_id TEXT NOT NULL,
    old_status TEXT,
    new_status TEXT NOT NULL,
    notes TEXT,
    actor_id TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Attachments (package photos)
CREATE TABLE IF NOT EXISTS attachments (
    id TEXT PRIMARY KEY,
    package_id TEXT NOT NULL,
    filename TEXT NOT NULL,
    file_path TEXT NOT NULL,
    mime_type TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    uploaded_by TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);
CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
CREATE INDEX IF NOT EXISTS idx_users_is_active ON users(is_active);

CREATE INDEX IF NOT EXISTS idx_sessions_token ON sessions(token);
CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);

CREATE INDEX IF NOT EXISTS idx_auth_events_user_id ON auth_events(user_id);
CREATE INDEX IF NOT EXISTS idx_auth_events_event_type ON auth_events(event_type);
CREATE INDEX IF NOT EXISTS idx_auth_events_created_at ON auth_events(created_at);

CREATE INDEX IF NOT EXISTS idx_recipients_employee_id ON recipients(employee_id);
CREATE INDEX IF NOT EXISTS idx_recipients_is_active ON recipients(is_active);
CREATE INDEX IF NOT EXISTS idx_recipients_name ON recipients(name);
CREATE INDEX IF NOT EXISTS idx_recipients_department ON recipients(department);

CREATE INDEX IF NOT EXISTS idx_packages_tracking_no ON packages(tracking_no);
CREATE INDEX IF NOT EXISTS idx_packages_recipient_id ON packages(recipient_id);
CREATE INDEX IF NOT EXISTS idx_packages_status ON packages(status);
CREATE INDEX IF NOT EXISTS idx_packages_created_at ON packages(created_at);
CREATE INDEX IF NOT EXISTS idx_packages_created_by ON packages(created_by);

CREATE INDEX IF NOT EXISTS idx_package_events_package_id ON package_events(package_id);
CREATE INDEX IF NOT EXISTS idx_package_events_actor_id ON package_events(actor_id);
CREATE INDEX IF NOT EXISTS idx_package_events_created_at ON package_events(created_at);

CREATE INDEX IF NOT EXISTS idx_attachments_package_id ON attachments(package_id);
CREATE INDEX IF NOT EXISTS idx_attachments_uploaded_by ON attachments(uploaded_by);
";

/// Create the base schema if absent.
pub fn initialize(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create schema", e))
}

/// Run the one-time migrations. Every step is idempotent and runs at each
/// startup, in order.
pub fn run_migrations(conn: &Connection) -> AppResult<()> {
    // System settings arrived after the initial release; the read path
    // tolerates this table being absent in older snapshots.
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS system_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_by TEXT,
            updated_at TEXT NOT NULL
        );",
    )
    .map_err(|e| {
        AppError::with_source(ErrorKind::Database, "Failed to create system_settings", e)
    })?;

    // Department became mandatory at the service layer; backfill rows
    // imported before the rule existed.
    let backfilled = conn
        .execute(
            "UPDATE recipients SET department = 'Unassigned'
             WHERE department IS NULL OR TRIM(department) = ''",
            [],
        )
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to backfill departments", e)
        })?;

    if backfilled > 0 {
        info!(backfilled, "Backfilled recipient departments to 'Unassigned'");
    }

    Ok(())
}

/// Delete sessions whose expiry has passed. Called once at startup; expired
/// rows encountered later are treated as absent and left for the next sweep.
pub fn sweep_expired_sessions(
    conn: &Connection,
    now: chrono::DateTime<chrono::Utc>,
) -> AppResult<usize> {
    conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        [format_ts(now)],
    )
    .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to sweep sessions", e))
}
