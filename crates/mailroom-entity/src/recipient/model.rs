//! Recipient entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An employee who can receive packages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    /// Unique recipient identifier.
    pub id: Uuid,
    /// Unique, immutable employee identifier.
    pub employee_id: String,
    /// Display name.
    pub name: String,
    /// Unique email address.
    pub email: String,
    /// Department. Mandatory at the service layer even though the column is
    /// nullable; a migration backfills missing values to "Unassigned".
    pub department: String,
    /// Phone number, if known.
    pub phone: Option<String>,
    /// Desk/building location, if known.
    pub location: Option<String>,
    /// Soft-deactivation flag; inactive recipients cannot receive packages.
    pub is_active: bool,
    /// When the recipient was created.
    pub created_at: DateTime<Utc>,
    /// When the recipient was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRecipient {
    pub employee_id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// Fields that may change on an existing recipient. `employee_id` is
/// immutable and therefore absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateRecipient {
    pub name: String,
    pub email: String,
    pub department: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}
