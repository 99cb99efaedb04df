//! Package status events: the append-only lifecycle log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::PackageStatus;

/// One entry in a package's immutable event log. Never updated or deleted.
///
/// Timeline ordering is by `created_at` ascending, ties broken by `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageEvent {
    /// Unique event identifier.
    pub id: Uuid,
    /// The package this event belongs to.
    pub package_id: Uuid,
    /// State before the transition; `None` only for the registration event.
    pub old_status: Option<PackageStatus>,
    /// State after the transition.
    pub new_status: PackageStatus,
    /// Optional operator notes recorded with the transition.
    pub notes: Option<String>,
    /// User who performed the transition.
    pub actor_id: Uuid,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}
