//! Audit event entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::kind::AuthEventKind;

/// An append-only record of a security- or data-relevant action.
///
/// Never contains secrets: no passwords, no raw tokens, no cookie values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// Acting user, when known.
    pub user_id: Option<Uuid>,
    /// Kind of event.
    pub event_type: AuthEventKind,
    /// Attempted username, for failures where no user resolved.
    pub username: Option<String>,
    /// Client IP, when known.
    pub ip_address: Option<String>,
    /// Bounded structured detail payload (JSON).
    pub details: Option<serde_json::Value>,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}
