//! Audit event kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of a recorded security- or data-relevant event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    Login,
    LoginFailed,
    Logout,
    PasswordChanged,
    PasswordReset,
    UserCreated,
    UserUpdated,
    UserDeactivated,
    AccountLocked,
    AccountUnlocked,
    PackageCreated,
    PackageStatusChanged,
    RecipientCreated,
    RecipientUpdated,
    RecipientImported,
    ExportGenerated,
    SystemSettingsChange,
}

impl AuthEventKind {
    /// Database/string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::LoginFailed => "login_failed",
            Self::Logout => "logout",
            Self::PasswordChanged => "password_changed",
            Self::PasswordReset => "password_reset",
            Self::UserCreated => "user_created",
            Self::UserUpdated => "user_updated",
            Self::UserDeactivated => "user_deactivated",
            Self::AccountLocked => "account_locked",
            Self::AccountUnlocked => "account_unlocked",
            Self::PackageCreated => "package_created",
            Self::PackageStatusChanged => "package_status_changed",
            Self::RecipientCreated => "recipient_created",
            Self::RecipientUpdated => "recipient_updated",
            Self::RecipientImported => "recipient_imported",
            Self::ExportGenerated => "export_generated",
            Self::SystemSettingsChange => "system_settings_change",
        }
    }
}

impl fmt::Display for AuthEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "login" => Ok(Self::Login),
            "login_failed" => Ok(Self::LoginFailed),
            "logout" => Ok(Self::Logout),
            "password_changed" => Ok(Self::PasswordChanged),
            "password_reset" => Ok(Self::PasswordReset),
            "user_created" => Ok(Self::UserCreated),
            "user_updated" => Ok(Self::UserUpdated),
            "user_deactivated" => Ok(Self::UserDeactivated),
            "account_locked" => Ok(Self::AccountLocked),
            "account_unlocked" => Ok(Self::AccountUnlocked),
            "package_created" => Ok(Self::PackageCreated),
            "package_status_changed" => Ok(Self::PackageStatusChanged),
            "recipient_created" => Ok(Self::RecipientCreated),
            "recipient_updated" => Ok(Self::RecipientUpdated),
            "recipient_imported" => Ok(Self::RecipientImported),
            "export_generated" => Ok(Self::ExportGenerated),
            "system_settings_change" => Ok(Self::SystemSettingsChange),
            other => Err(format!("unknown auth event kind '{other}'")),
        }
    }
}
