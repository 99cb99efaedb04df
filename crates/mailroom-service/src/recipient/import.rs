//! Bulk recipient import.
//!
//! Two-step flow: `validate_rows` produces a per-row report without
//! writing; `apply_rows` upserts by employee id in chunked transactions
//! and emits a summary. Parsing the uploaded CSV into rows is the caller's
//! concern.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use mailroom_core::result::AppResult;
use mailroom_database::audit::AuditSink;
use mailroom_database::repositories::recipient::RecipientRepository;
use mailroom_database::write_queue::WriteStmt;
use mailroom_entity::audit::AuthEventKind;
use mailroom_entity::recipient::Recipient;
use mailroom_entity::user::User;

use super::service::is_valid_email;

/// Rows per write transaction. Bounds writer stall time on large files.
const CHUNK_SIZE: usize = 500;

/// One parsed import row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRow {
    pub employee_id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

/// What applying a row would do (or did).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAction {
    Insert,
    Update,
    Error,
}

/// Per-row validation/apply outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportReport {
    /// 1-based row number.
    pub row: usize,
    pub employee_id: String,
    pub action: RowAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Whole-file apply summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
    pub reports: Vec<ImportReport>,
}

/// Bulk import over the recipient directory.
#[derive(Clone)]
pub struct RecipientImporter {
    recipients: RecipientRepository,
    audit: AuditSink,
}

enum PlannedRow {
    Insert(Box<Recipient>),
    Update { id: Uuid, row: ImportRow },
}

impl RecipientImporter {
    /// Creates the importer.
    pub fn new(recipients: RecipientRepository, audit: AuditSink) -> Self {
        Self { recipients, audit }
    }

    /// Validates rows without writing, reporting what applying each would
    /// do. Duplicate employee ids and emails within the file are errors.
    pub async fn validate_rows(&self, rows: &[ImportRow]) -> AppResult<Vec<ImportReport>> {
        let mut reports = Vec::with_capacity(rows.len());
        let mut seen_employee_ids = std::collections::HashSet::new();
        let mut seen_emails = std::collections::HashSet::new();

        for (idx, row) in rows.iter().enumerate() {
            let number = idx + 1;
            let report = match self
                .plan_row(row, &mut seen_employee_ids, &mut seen_emails)
                .await?
            {
                Ok(PlannedRow::Insert(_)) => ImportReport {
                    row: number,
                    employee_id: row.employee_id.clone(),
                    action: RowAction::Insert,
                    message: None,
                },
                Ok(PlannedRow::Update { .. }) => ImportReport {
                    row: number,
                    employee_id: row.employee_id.clone(),
                    action: RowAction::Update,
                    message: None,
                },
                Err(message) => ImportReport {
                    row: number,
                    employee_id: row.employee_id.clone(),
                    action: RowAction::Error,
                    message: Some(message),
                },
            };
            reports.push(report);
        }
        Ok(reports)
    }

    /// Applies rows: existing employee ids are updated, new ones inserted.
    /// Valid rows are written in chunked transactions; invalid rows are
    /// reported and skipped. Emits one `recipient_imported` audit event.
    pub async fn apply_rows(
        &self,
        rows: Vec<ImportRow>,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<ImportSummary> {
        let mut summary = ImportSummary {
            inserted: 0,
            updated: 0,
            failed: 0,
            reports: Vec::new(),
        };
        let mut seen_employee_ids = std::collections::HashSet::new();
        let mut seen_emails = std::collections::HashSet::new();
        let mut pending: Vec<WriteStmt> = Vec::new();
        let now = Utc::now();

        for (idx, row) in rows.iter().enumerate() {
            let number = idx + 1;
            match self
                .plan_row(row, &mut seen_employee_ids, &mut seen_emails)
                .await?
            {
                Ok(PlannedRow::Insert(recipient)) => {
                    pending.push(self.recipients.insert_stmt(&recipient));
                    summary.inserted += 1;
                    summary.reports.push(ImportReport {
                        row: number,
                        employee_id: row.employee_id.clone(),
                        action: RowAction::Insert,
                        message: None,
                    });
                }
                Ok(PlannedRow::Update { id, row: planned }) => {
                    pending.push(self.recipients.update_stmt(
                        id,
                        planned.name.trim(),
                        planned.email.trim(),
                        planned.department.trim(),
                        planned.phone.clone(),
                        planned.location.clone(),
                        now,
                    ));
                    summary.updated += 1;
                    summary.reports.push(ImportReport {
                        row: number,
                        employee_id: row.employee_id.clone(),
                        action: RowAction::Update,
                        message: None,
                    });
                }
                Err(message) => {
                    summary.failed += 1;
                    summary.reports.push(ImportReport {
                        row: number,
                        employee_id: row.employee_id.clone(),
                        action: RowAction::Error,
                        message: Some(message),
                    });
                }
            }

            if pending.len() >= CHUNK_SIZE {
                self.recipients
                    .apply_batch(std::mem::take(&mut pending))
                    .await?;
            }
        }

        if !pending.is_empty() {
            self.recipients.apply_batch(pending).await?;
        }

        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            failed = summary.failed,
            "Recipient import applied"
        );
        self.audit
            .record(
                AuthEventKind::RecipientImported,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({
                    "inserted": summary.inserted,
                    "updated": summary.updated,
                    "failed": summary.failed,
                })),
            )
            .await;

        Ok(summary)
    }

    async fn plan_row(
        &self,
        row: &ImportRow,
        seen_employee_ids: &mut std::collections::HashSet<String>,
        seen_emails: &mut std::collections::HashSet<String>,
    ) -> AppResult<Result<PlannedRow, String>> {
        let employee_id = row.employee_id.trim().to_string();
        if employee_id.is_empty() {
            return Ok(Err("employee_id is required".to_string()));
        }
        if row.name.trim().is_empty() {
            return Ok(Err("name is required".to_string()));
        }
        let email = row.email.trim().to_string();
        if !is_valid_email(&email) {
            return Ok(Err(format!("invalid email '{email}'")));
        }
        if row.department.trim().is_empty() {
            return Ok(Err("department is required".to_string()));
        }
        if !seen_employee_ids.insert(employee_id.clone()) {
            return Ok(Err(format!("duplicate employee_id '{employee_id}' in file")));
        }
        if !seen_emails.insert(email.to_lowercase()) {
            return Ok(Err(format!("duplicate email '{email}' in file")));
        }

        let existing = self.recipients.find_by_employee_id(&employee_id).await?;
        match existing {
            Some(recipient) => {
                if self
                    .recipients
                    .email_in_use(&email, Some(recipient.id))
                    .await?
                {
                    return Ok(Err(format!("email '{email}' belongs to another recipient")));
                }
                Ok(Ok(PlannedRow::Update {
                    id: recipient.id,
                    row: row.clone(),
                }))
            }
            None => {
                if self.recipients.email_in_use(&email, None).await? {
                    return Ok(Err(format!("email '{email}' belongs to another recipient")));
                }
                let now = Utc::now();
                Ok(Ok(PlannedRow::Insert(Box::new(Recipient {
                    id: Uuid::new_v4(),
                    employee_id,
                    name: row.name.trim().to_string(),
                    email,
                    department: row.department.trim().to_string(),
                    phone: row.phone.clone(),
                    location: row.location.clone(),
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                }))))
            }
        }
    }
}
