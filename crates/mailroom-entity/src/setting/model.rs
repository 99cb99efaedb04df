//! System setting entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A process-wide key/value tunable.
///
/// `updated_by` is stored as text without a foreign key so the settings
/// table survives user churn and can be created by a later migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// Setting key (primary).
    pub key: String,
    /// Setting value.
    pub value: String,
    /// Identifier of the last updater, as text.
    pub updated_by: Option<String>,
    /// When the value was last written.
    pub updated_at: DateTime<Utc>,
}

/// Key for the external base URL embedded in printable sticker deep links.
pub const QR_BASE_URL: &str = "qr_base_url";
