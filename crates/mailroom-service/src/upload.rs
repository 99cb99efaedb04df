//! Upload validation and storage for package photos.
//!
//! Content type is inferred from magic bytes, never from the client's
//! filename or declared type. Stored names are opaque; the original
//! filename is kept only as display metadata.

use std::path::{Component, Path, PathBuf};

use chrono::{Datelike, Utc};
use uuid::Uuid;

use mailroom_core::config::AppConfig;
use mailroom_core::error::AppError;
use mailroom_core::result::AppResult;

/// A validated, persisted upload.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    /// Path relative to the upload root.
    pub relative_path: String,
    /// Detected MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
}

/// Validates and stores uploads under a fixed root, organized as
/// `<category>/YYYY/MM/<opaque>.<ext>`.
#[derive(Debug, Clone)]
pub struct UploadService {
    root: PathBuf,
    max_size: u64,
    allowed_types: Vec<String>,
}

impl UploadService {
    /// Creates the service from configuration.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            root: PathBuf::from(&config.upload_dir),
            max_size: config.max_upload_size,
            allowed_types: config.allowed_image_types_list(),
        }
    }

    /// Validates content and writes it under the given category. An upload
    /// of exactly the maximum size is accepted; one byte more is rejected.
    pub async fn save(&self, content: &[u8], category: &str) -> AppResult<StoredUpload> {
        if content.len() as u64 > self.max_size {
            return Err(AppError::validation(format!(
                "File size ({} bytes) exceeds maximum allowed size ({} bytes)",
                content.len(),
                self.max_size
            )));
        }

        let mime_type = sniff_mime(content).ok_or_else(|| {
            AppError::validation(format!(
                "File type is not allowed. Allowed types: {}",
                self.allowed_types.join(", ")
            ))
        })?;
        if !self.allowed_types.iter().any(|t| t == mime_type) {
            return Err(AppError::validation(format!(
                "File type '{mime_type}' is not allowed. Allowed types: {}",
                self.allowed_types.join(", ")
            )));
        }

        let now = Utc::now();
        let name = format!(
            "{}{}",
            Uuid::new_v4().simple(),
            extension_for(mime_type)
        );
        let relative = PathBuf::from(category)
            .join(format!("{:04}", now.year()))
            .join(format!("{:02}", now.month()))
            .join(name);

        let full = self.root.join(&relative);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&full, content).await?;

        Ok(StoredUpload {
            relative_path: relative.to_string_lossy().replace('\\', "/"),
            mime_type: mime_type.to_string(),
            size: content.len() as u64,
        })
    }

    /// Resolves a stored relative path against the root, rejecting any
    /// traversal outside it.
    pub fn resolve(&self, relative: &str) -> AppResult<PathBuf> {
        let candidate = Path::new(relative);
        if candidate.is_absolute()
            || candidate
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(AppError::validation("Invalid attachment path"));
        }
        Ok(self.root.join(candidate))
    }
}

/// Detect an image MIME type from leading magic bytes.
pub fn sniff_mime(content: &[u8]) -> Option<&'static str> {
    if content.starts_with(b"\xff\xd8\xff") {
        Some("image/jpeg")
    } else if content.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if content.len() >= 12 && content.starts_with(b"RIFF") && &content[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        _ => ".bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG: &[u8] = b"\xff\xd8\xff\xe0rest-of-jpeg";
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nrest-of-png";
    const WEBP: &[u8] = b"RIFF\x00\x00\x00\x00WEBPrest";

    fn service(max_size: u64) -> (tempfile::TempDir, UploadService) {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = UploadService {
            root: dir.path().to_path_buf(),
            max_size,
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
        };
        (dir, service)
    }

    #[test]
    fn sniffs_by_magic_bytes_not_extension() {
        assert_eq!(sniff_mime(JPEG), Some("image/jpeg"));
        assert_eq!(sniff_mime(PNG), Some("image/png"));
        assert_eq!(sniff_mime(WEBP), Some("image/webp"));
        assert_eq!(sniff_mime(b"GIF89a..."), None);
        assert_eq!(sniff_mime(b"<?php evil"), None);
    }

    #[tokio::test]
    async fn accepts_exactly_max_size_and_rejects_one_more() {
        let mut content = JPEG.to_vec();
        content.resize(64, 0);
        let (_dir, service) = service(64);
        assert!(service.save(&content, "packages").await.is_ok());

        content.push(0);
        assert!(service.save(&content, "packages").await.is_err());
    }

    #[tokio::test]
    async fn rejects_disallowed_content() {
        let (_dir, service) = service(1024);
        let result = service.save(b"GIF89a not an allowed type", "packages").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn stored_path_is_opaque_and_dated() {
        let (_dir, service) = service(1024);
        let stored = service.save(PNG, "packages").await.expect("save");
        assert!(stored.relative_path.starts_with("packages/"));
        assert!(stored.relative_path.ends_with(".png"));
        assert!(service.resolve(&stored.relative_path).is_ok());
    }

    #[test]
    fn traversal_is_rejected() {
        let (_dir, service) = service(1024);
        assert!(service.resolve("../../etc/passwd").is_err());
        assert!(service.resolve("packages/../../secret").is_err());
        assert!(service.resolve("/etc/passwd").is_err());
        assert!(service.resolve("packages/2026/01/photo.png").is_ok());
    }
}
