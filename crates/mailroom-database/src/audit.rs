//! Audit sink: failure-tolerant recording of auth events.
//!
//! Business operations must not fail because audit recording failed; the
//! sink logs and swallows write errors. When a record must be durable with
//! the operation it accompanies, callers include [`AuditSink::stmt`] in the
//! same write batch instead.

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::warn;
use uuid::Uuid;

use mailroom_entity::audit::{AuthEvent, AuthEventKind};

use crate::repositories::audit::AuditRepository;
use crate::write_queue::WriteStmt;

/// Append-only recorder of security- and data-relevant events.
#[derive(Clone)]
pub struct AuditSink {
    repo: AuditRepository,
}

impl AuditSink {
    /// Create a new sink over the audit repository.
    pub fn new(repo: AuditRepository) -> Self {
        Self { repo }
    }

    /// Record an event through the write queue. Errors are logged, never
    /// propagated. Details must not contain secrets.
    pub async fn record(
        &self,
        kind: AuthEventKind,
        user_id: Option<Uuid>,
        username: Option<&str>,
        ip_address: Option<&str>,
        details: Option<JsonValue>,
    ) {
        let event = build_event(kind, user_id, username, ip_address, details);
        if let Err(e) = self.repo.insert(&event).await {
            warn!(kind = %kind, error = %e, "Failed to record audit event");
        }
    }

    /// Build the insert statement for an event, for inclusion in an atomic
    /// batch alongside the business write it describes.
    pub fn stmt(
        &self,
        kind: AuthEventKind,
        user_id: Option<Uuid>,
        username: Option<&str>,
        ip_address: Option<&str>,
        details: Option<JsonValue>,
    ) -> WriteStmt {
        let event = build_event(kind, user_id, username, ip_address, details);
        self.repo.insert_stmt(&event)
    }
}

fn build_event(
    kind: AuthEventKind,
    user_id: Option<Uuid>,
    username: Option<&str>,
    ip_address: Option<&str>,
    details: Option<JsonValue>,
) -> AuthEvent {
    AuthEvent {
        id: Uuid::new_v4(),
        user_id,
        event_type: kind,
        username: username.map(String::from),
        ip_address: ip_address.map(String::from),
        details,
        created_at: Utc::now(),
    }
}
