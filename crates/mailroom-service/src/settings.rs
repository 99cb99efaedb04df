//! System settings: process-wide tunables behind the write queue.
//!
//! Currently one setting exists: the external base URL embedded into
//! package deep links on printed stickers.

use chrono::Utc;
use serde_json::json;
use tracing::info;

use mailroom_core::error::AppError;
use mailroom_core::result::AppResult;
use mailroom_database::audit::AuditSink;
use mailroom_database::repositories::setting::SettingRepository;
use mailroom_entity::audit::AuthEventKind;
use mailroom_entity::setting::QR_BASE_URL;
use mailroom_entity::user::User;

/// Service over the key/value settings store.
#[derive(Clone)]
pub struct SettingsService {
    settings: SettingRepository,
    audit: AuditSink,
}

impl SettingsService {
    /// Creates the service.
    pub fn new(settings: SettingRepository, audit: AuditSink) -> Self {
        Self { settings, audit }
    }

    /// The configured sticker base URL, or `None` when not set (callers
    /// fall back to the request's own base). Tolerates the settings table
    /// being absent.
    pub async fn qr_base_url(&self) -> AppResult<Option<String>> {
        Ok(self
            .settings
            .get(QR_BASE_URL)
            .await?
            .map(|setting| setting.value))
    }

    /// Sets the sticker base URL. Policy gating (super admin only) happens
    /// at the route; this validates the URL shape, strips a trailing
    /// slash, and writes the value and its audit record in one batch.
    pub async fn set_qr_base_url(
        &self,
        url: &str,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<String> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AppError::validation(
                "Invalid URL format. Must start with http:// or https://",
            ));
        }
        let normalized = url.trim_end_matches('/').to_string();

        let old_value = self.qr_base_url().await?;
        let action = if old_value.is_some() {
            "qr_base_url_updated"
        } else {
            "qr_base_url_created"
        };

        let stmts = vec![
            self.settings
                .upsert_stmt(QR_BASE_URL, &normalized, actor.id, Utc::now()),
            self.audit.stmt(
                AuthEventKind::SystemSettingsChange,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({
                    "action": action,
                    "setting_key": QR_BASE_URL,
                    "old_value": old_value,
                    "new_value": normalized,
                })),
            ),
        ];
        self.settings.apply_batch(stmts).await?;

        info!(new_value = %normalized, "Sticker base URL updated");
        Ok(normalized)
    }

    /// The deep link printed on a package sticker.
    pub fn package_link(base_url: &str, package_id: uuid::Uuid) -> String {
        format!("{}/packages/{}", base_url.trim_end_matches('/'), package_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_link_joins_cleanly() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            SettingsService::package_link("https://mail.example.com/", id),
            format!("https://mail.example.com/packages/{id}")
        );
        assert_eq!(
            SettingsService::package_link("https://mail.example.com", id),
            format!("https://mail.example.com/packages/{id}")
        );
    }
}
