//! Package entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::PackageStatus;

/// Maximum length of the free-form notes field.
pub const MAX_NOTES_LEN: usize = 500;

/// A tracked package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Unique package identifier.
    pub id: Uuid,
    /// Carrier tracking number. Not unique (carriers reuse them).
    pub tracking_no: String,
    /// Carrier name.
    pub carrier: String,
    /// Recipient reference; must be active at registration.
    pub recipient_id: Uuid,
    /// Current lifecycle state.
    pub status: PackageStatus,
    /// Free-form notes, at most [`MAX_NOTES_LEN`] characters.
    pub notes: Option<String>,
    /// User who registered the package.
    pub created_by: Uuid,
    /// When the package was registered.
    pub created_at: DateTime<Utc>,
    /// When the package was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to register a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackage {
    pub tracking_no: String,
    pub carrier: String,
    pub recipient_id: Uuid,
    #[serde(default)]
    pub notes: Option<String>,
}
