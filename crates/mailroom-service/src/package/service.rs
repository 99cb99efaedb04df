//! Package service: registration, status transitions, photos, and read
//! projections.
//!
//! Every mutation is one atomic batch through the write queue: the package
//! row, its lifecycle event, and the audit record land together or not at
//! all.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use mailroom_core::error::AppError;
use mailroom_core::result::AppResult;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_database::audit::AuditSink;
use mailroom_database::repositories::package::{
    PackageFilters, PackageRepository, PackageSummary,
};
use mailroom_database::repositories::recipient::RecipientRepository;
use mailroom_entity::attachment::Attachment;
use mailroom_entity::audit::AuthEventKind;
use mailroom_entity::package::model::MAX_NOTES_LEN;
use mailroom_entity::package::{CreatePackage, Package, PackageEvent, PackageStatus};
use mailroom_entity::user::User;

use crate::upload::UploadService;

/// Full detail projection: package summary plus its timeline and photos.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PackageDetail {
    pub package: PackageSummary,
    pub timeline: Vec<PackageEvent>,
    pub attachments: Vec<Attachment>,
}

/// Service for package lifecycle operations.
#[derive(Clone)]
pub struct PackageService {
    packages: PackageRepository,
    recipients: RecipientRepository,
    uploads: UploadService,
    audit: AuditSink,
}

impl PackageService {
    /// Creates the service.
    pub fn new(
        packages: PackageRepository,
        recipients: RecipientRepository,
        uploads: UploadService,
        audit: AuditSink,
    ) -> Self {
        Self {
            packages,
            recipients,
            uploads,
            audit,
        }
    }

    /// Registers a package with initial status `registered`, optionally
    /// attaching a content-validated photo. One atomic batch: package row,
    /// registration event, optional attachment, and the audit record.
    pub async fn register(
        &self,
        data: CreatePackage,
        photo: Option<(String, Vec<u8>)>,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<Package> {
        let tracking_no = data.tracking_no.trim().to_string();
        if tracking_no.is_empty() {
            return Err(AppError::validation("Tracking number is required"));
        }
        let carrier = data.carrier.trim().to_string();
        if carrier.is_empty() {
            return Err(AppError::validation("Carrier is required"));
        }
        validate_notes(data.notes.as_deref())?;

        let recipient = self
            .recipients
            .find_by_id(data.recipient_id)
            .await?
            .ok_or_else(|| AppError::validation("Recipient not found"))?;
        if !recipient.is_active {
            return Err(AppError::validation(format!(
                "Recipient '{}' is not active",
                recipient.name
            )));
        }

        let now = Utc::now();
        let package = Package {
            id: Uuid::new_v4(),
            tracking_no,
            carrier,
            recipient_id: recipient.id,
            status: PackageStatus::Registered,
            notes: data.notes.clone(),
            created_by: actor.id,
            created_at: now,
            updated_at: now,
        };
        let event = PackageEvent {
            id: Uuid::new_v4(),
            package_id: package.id,
            old_status: None,
            new_status: PackageStatus::Registered,
            notes: Some(format!("Package registered by {}", actor.full_name)),
            actor_id: actor.id,
            created_at: now,
        };

        let mut stmts = vec![
            self.packages.insert_stmt(&package),
            self.packages.event_stmt(&event),
        ];

        if let Some((filename, content)) = photo {
            let stored = self.uploads.save(&content, "packages").await?;
            let attachment = Attachment {
                id: Uuid::new_v4(),
                package_id: package.id,
                filename,
                file_path: stored.relative_path,
                mime_type: stored.mime_type,
                file_size: stored.size,
                uploaded_by: actor.id,
                created_at: now,
            };
            stmts.push(self.packages.attachment_stmt(&attachment));
        }

        stmts.push(self.audit.stmt(
            AuthEventKind::PackageCreated,
            Some(actor.id),
            Some(&actor.username),
            ip_address,
            Some(json!({
                "package_id": package.id,
                "tracking_no": package.tracking_no,
                "recipient_id": recipient.id,
            })),
        ));

        self.packages.apply_batch(stmts).await?;
        Ok(package)
    }

    /// Applies a status transition, enforcing the lifecycle policy.
    /// Terminal states accept no further transitions; an illegal request
    /// writes nothing.
    pub async fn update_status(
        &self,
        package_id: Uuid,
        new_status: PackageStatus,
        notes: Option<String>,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<Package> {
        validate_notes(notes.as_deref())?;

        let mut package = self
            .packages
            .find_by_id(package_id)
            .await?
            .ok_or_else(|| AppError::not_found("Package not found"))?;

        let old_status = package.status;
        if !old_status.can_transition_to(new_status) {
            return Err(AppError::validation(format!(
                "Cannot change status from '{old_status}' to '{new_status}'"
            )));
        }

        let now = Utc::now();
        let event = PackageEvent {
            id: Uuid::new_v4(),
            package_id,
            old_status: Some(old_status),
            new_status,
            notes: notes.clone(),
            actor_id: actor.id,
            created_at: now,
        };

        let stmts = vec![
            self.packages.status_update_stmt(package_id, new_status, now),
            self.packages.event_stmt(&event),
            self.audit.stmt(
                AuthEventKind::PackageStatusChanged,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({
                    "package_id": package_id,
                    "old_status": old_status,
                    "new_status": new_status,
                })),
            ),
        ];
        self.packages.apply_batch(stmts).await?;

        package.status = new_status;
        package.updated_at = now;
        Ok(package)
    }

    /// Attaches a content-validated photo to an existing package.
    pub async fn attach_photo(
        &self,
        package_id: Uuid,
        filename: String,
        content: Vec<u8>,
        actor: &User,
    ) -> AppResult<Attachment> {
        self.packages
            .find_by_id(package_id)
            .await?
            .ok_or_else(|| AppError::not_found("Package not found"))?;

        let stored = self.uploads.save(&content, "packages").await?;
        let attachment = Attachment {
            id: Uuid::new_v4(),
            package_id,
            filename,
            file_path: stored.relative_path,
            mime_type: stored.mime_type,
            file_size: stored.size,
            uploaded_by: actor.id,
            created_at: Utc::now(),
        };
        self.packages
            .apply_batch(vec![self.packages.attachment_stmt(&attachment)])
            .await?;
        Ok(attachment)
    }

    /// Search projection over packages, newest first.
    pub async fn search(
        &self,
        filters: PackageFilters,
        page: PageRequest,
    ) -> AppResult<PageResponse<PackageSummary>> {
        self.packages.search(filters, page).await
    }

    /// Raw package row by id.
    pub async fn get(&self, package_id: Uuid) -> AppResult<Option<Package>> {
        self.packages.find_by_id(package_id).await
    }

    /// Detail projection: summary, ordered timeline, attachments.
    pub async fn detail(&self, package_id: Uuid) -> AppResult<Option<PackageDetail>> {
        let Some(summary) = self.packages.summary_by_id(package_id).await? else {
            return Ok(None);
        };
        let timeline = self.packages.timeline(package_id).await?;
        let attachments = self.packages.attachments(package_id).await?;
        Ok(Some(PackageDetail {
            package: summary,
            timeline,
            attachments,
        }))
    }
}

fn validate_notes(notes: Option<&str>) -> AppResult<()> {
    if let Some(notes) = notes {
        if notes.chars().count() > MAX_NOTES_LEN {
            return Err(AppError::validation(format!(
                "Notes must be at most {MAX_NOTES_LEN} characters"
            )));
        }
    }
    Ok(())
}
