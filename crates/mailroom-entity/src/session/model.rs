//! Session entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated browser session.
///
/// The token is opaque, high-entropy, and never reused; server-side expiry
/// is authoritative (the cookie itself is browser-session scoped).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: Uuid,
    /// Opaque session token. Never logged.
    #[serde(skip_serializing)]
    pub token: String,
    /// Hard expiry; a session whose `expires_at` equals now is expired.
    pub expires_at: DateTime<Utc>,
    /// Last request seen on this session.
    pub last_activity: DateTime<Utc>,
    /// Client IP at creation, if known.
    pub ip_address: Option<String>,
    /// Client user agent at creation, if known.
    pub user_agent: Option<String>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is still live at the given instant.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}
