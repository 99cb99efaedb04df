//! Recipient service: directory invariants and soft deactivation.

use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde_json::json;
use uuid::Uuid;

use mailroom_core::error::AppError;
use mailroom_core::result::AppResult;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_database::audit::AuditSink;
use mailroom_database::repositories::recipient::RecipientRepository;
use mailroom_entity::audit::AuthEventKind;
use mailroom_entity::recipient::{CreateRecipient, Recipient, UpdateRecipient};
use mailroom_entity::user::User;

/// Basic email shape check; uniqueness is the storage layer's job.
pub(crate) fn is_valid_email(email: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .expect("email pattern is valid")
    });
    re.is_match(email)
}

/// Service for recipient directory operations.
#[derive(Clone)]
pub struct RecipientService {
    recipients: RecipientRepository,
    audit: AuditSink,
}

impl RecipientService {
    /// Creates the service.
    pub fn new(recipients: RecipientRepository, audit: AuditSink) -> Self {
        Self { recipients, audit }
    }

    /// Creates a recipient. Department is mandatory and trimmed;
    /// employee id and email must be unique.
    pub async fn create(
        &self,
        data: CreateRecipient,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<Recipient> {
        let department = require_department(&data.department)?;
        let email = data.email.trim().to_string();
        if !is_valid_email(&email) {
            return Err(AppError::validation(format!(
                "Invalid email format: {email}"
            )));
        }
        let employee_id = data.employee_id.trim().to_string();
        if employee_id.is_empty() {
            return Err(AppError::validation("Employee ID is required"));
        }

        if self
            .recipients
            .find_by_employee_id(&employee_id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(format!(
                "Employee ID '{employee_id}' already exists"
            )));
        }
        if self.recipients.email_in_use(&email, None).await? {
            return Err(AppError::conflict(format!("Email '{email}' already exists")));
        }

        let now = Utc::now();
        let recipient = Recipient {
            id: Uuid::new_v4(),
            employee_id,
            name: data.name.trim().to_string(),
            email,
            department,
            phone: data.phone,
            location: data.location,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.recipients.insert(&recipient).await?;

        self.audit
            .record(
                AuthEventKind::RecipientCreated,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({
                    "recipient_id": recipient.id,
                    "employee_id": recipient.employee_id,
                })),
            )
            .await;

        Ok(recipient)
    }

    /// Updates a recipient's mutable fields. The employee id is immutable;
    /// department stays mandatory.
    pub async fn update(
        &self,
        id: Uuid,
        data: UpdateRecipient,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<Recipient> {
        let existing = self
            .recipients
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipient not found"))?;

        let department = require_department(&data.department)?;
        let email = data.email.trim().to_string();
        if !is_valid_email(&email) {
            return Err(AppError::validation(format!(
                "Invalid email format: {email}"
            )));
        }
        if self.recipients.email_in_use(&email, Some(id)).await? {
            return Err(AppError::conflict(format!("Email '{email}' already exists")));
        }

        let now = Utc::now();
        let name = data.name.trim().to_string();
        let stmt = self.recipients.update_stmt(
            id,
            &name,
            &email,
            &department,
            data.phone.clone(),
            data.location.clone(),
            now,
        );
        self.recipients.apply(stmt).await?;

        self.audit
            .record(
                AuthEventKind::RecipientUpdated,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({
                    "recipient_id": id,
                    "employee_id": existing.employee_id,
                })),
            )
            .await;

        Ok(Recipient {
            name,
            email,
            department,
            phone: data.phone,
            location: data.location,
            updated_at: now,
            ..existing
        })
    }

    /// Deactivates a recipient. Refused while the recipient still has any
    /// package in a non-terminal state.
    pub async fn deactivate(
        &self,
        id: Uuid,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<()> {
        let recipient = self
            .recipients
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Recipient not found"))?;

        let open = self.recipients.open_package_count(id).await?;
        if open > 0 {
            return Err(AppError::validation("has_open_packages"));
        }

        self.recipients.deactivate(id, Utc::now()).await?;

        self.audit
            .record(
                AuthEventKind::RecipientUpdated,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({
                    "recipient_id": id,
                    "employee_id": recipient.employee_id,
                    "action": "deactivated",
                })),
            )
            .await;
        Ok(())
    }

    /// Find a recipient by id.
    pub async fn get(&self, id: Uuid) -> AppResult<Option<Recipient>> {
        self.recipients.find_by_id(id).await
    }

    /// Search the directory.
    pub async fn search(
        &self,
        query: Option<String>,
        department: Option<String>,
        active_only: bool,
        page: PageRequest,
    ) -> AppResult<PageResponse<Recipient>> {
        self.recipients
            .search(query, department, active_only, page)
            .await
    }

    /// Distinct department names.
    pub async fn departments(&self) -> AppResult<Vec<String>> {
        self.recipients.departments().await
    }
}

pub(crate) fn require_department(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(
            "Department is required and cannot be empty",
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("pat@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("@example.com"));
    }

    #[test]
    fn department_must_survive_trimming() {
        assert!(require_department("  ").is_err());
        assert_eq!(require_department(" Finance ").unwrap(), "Finance");
    }
}
