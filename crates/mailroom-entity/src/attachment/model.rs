//! Attachment entity model (package photos).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A photo attached to a package.
///
/// Content type is validated from bytes, never from the extension; the
/// stored path is an opaque name under the upload root and the original
/// filename never influences it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Unique attachment identifier.
    pub id: Uuid,
    /// The package the photo belongs to.
    pub package_id: Uuid,
    /// Original client-supplied filename, kept for display only.
    pub filename: String,
    /// Storage path relative to the upload root.
    pub file_path: String,
    /// Detected MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// User who uploaded the photo.
    pub uploaded_by: Uuid,
    /// When the attachment was created.
    pub created_at: DateTime<Utc>,
}
