//! Application configuration.
//!
//! Settings are loaded from environment variables (optionally via a `.env`
//! file sourced by the process manager) through the `config` crate. Every key
//! has a default except `SECRET_KEY`, which must always be provided.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Deployment environment, gating cookie flags, HSTS, and boot strictness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    /// Local development.
    Development,
    /// Production deployment behind the reverse proxy.
    Production,
    /// Automated test runs.
    Testing,
}

/// Application settings, one field per recognized environment key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    // Application
    #[serde(default = "default_app_env")]
    pub app_env: AppEnv,
    #[serde(default = "default_host")]
    pub app_host: String,
    #[serde(default = "default_port")]
    pub app_port: u16,
    /// Required; used for cookie integrity and CSRF token derivation.
    pub secret_key: String,

    // Database
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Seconds between write-ahead-log checkpoints.
    #[serde(default = "default_checkpoint_interval")]
    pub database_checkpoint_interval: u64,

    // File storage
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size: u64,
    /// Comma-separated list of allowed image MIME types.
    #[serde(default = "default_allowed_image_types")]
    pub allowed_image_types: String,

    // Security
    /// Session lifetime in seconds.
    #[serde(default = "default_session_timeout")]
    pub session_timeout: u64,
    /// Maximum concurrent sessions per user.
    #[serde(default = "default_max_concurrent_sessions")]
    pub max_concurrent_sessions: u64,
    /// Failed logins before the account is locked.
    #[serde(default = "default_max_failed_logins")]
    pub max_failed_logins: u32,
    /// Lockout duration in seconds.
    #[serde(default = "default_lockout_duration")]
    pub account_lockout_duration: u64,
    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,
    /// Number of previous password digests a new password may not match.
    #[serde(default = "default_password_history_count")]
    pub password_history_count: usize,

    // Argon2
    #[serde(default = "default_argon2_time_cost")]
    pub argon2_time_cost: u32,
    /// Memory cost in KiB.
    #[serde(default = "default_argon2_memory_cost")]
    pub argon2_memory_cost: u32,
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    // Rate limiting (requests per minute)
    #[serde(default = "default_rate_limit_login")]
    pub rate_limit_login: u32,
    #[serde(default = "default_rate_limit_api")]
    pub rate_limit_api: u32,

    // Logging
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
    #[serde(default = "default_log_rotation")]
    pub log_rotation: String,
    #[serde(default = "default_log_retention_days")]
    pub log_retention_days: u32,
}

impl AppConfig {
    /// Load and validate settings from environment variables.
    pub fn load() -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::Environment::default().try_parsing(true))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let settings: Self = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        settings.validate()?;
        settings.ensure_directories()?;
        Ok(settings)
    }

    /// Validate settings, applying production strictness rules.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.secret_key.is_empty() {
            return Err(AppError::configuration("SECRET_KEY must be set"));
        }

        if self.is_production()
            && (self.secret_key.len() < 32 || self.secret_key.to_lowercase().contains("change-this"))
        {
            return Err(AppError::configuration(
                "SECRET_KEY must be changed from default and be at least 32 characters in production",
            ));
        }

        Ok(())
    }

    /// Create the directories the service writes into.
    pub fn ensure_directories(&self) -> Result<(), AppError> {
        if let Some(parent) = Path::new(&self.database_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.upload_dir)?;
        if let Some(parent) = Path::new(&self.log_file).parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Whether the service runs in production mode.
    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }

    /// Allowed image MIME types as a list.
    pub fn allowed_image_types_list(&self) -> Vec<String> {
        self.allowed_image_types
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_env: default_app_env(),
            app_host: default_host(),
            app_port: default_port(),
            secret_key: "insecure-dev-secret-change-this".to_string(),
            database_path: default_database_path(),
            database_checkpoint_interval: default_checkpoint_interval(),
            upload_dir: default_upload_dir(),
            max_upload_size: default_max_upload_size(),
            allowed_image_types: default_allowed_image_types(),
            session_timeout: default_session_timeout(),
            max_concurrent_sessions: default_max_concurrent_sessions(),
            max_failed_logins: default_max_failed_logins(),
            account_lockout_duration: default_lockout_duration(),
            password_min_length: default_password_min_length(),
            password_history_count: default_password_history_count(),
            argon2_time_cost: default_argon2_time_cost(),
            argon2_memory_cost: default_argon2_memory_cost(),
            argon2_parallelism: default_argon2_parallelism(),
            rate_limit_login: default_rate_limit_login(),
            rate_limit_api: default_rate_limit_api(),
            log_level: default_log_level(),
            log_file: default_log_file(),
            log_rotation: default_log_rotation(),
            log_retention_days: default_log_retention_days(),
        }
    }
}

fn default_app_env() -> AppEnv {
    AppEnv::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_database_path() -> String {
    "./data/mailroom.db".to_string()
}

fn default_checkpoint_interval() -> u64 {
    300
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    5 * 1024 * 1024
}

fn default_allowed_image_types() -> String {
    "image/jpeg,image/png,image/webp".to_string()
}

fn default_session_timeout() -> u64 {
    1800
}

fn default_max_concurrent_sessions() -> u64 {
    3
}

fn default_max_failed_logins() -> u32 {
    5
}

fn default_lockout_duration() -> u64 {
    1800
}

fn default_password_min_length() -> usize {
    12
}

fn default_password_history_count() -> usize {
    3
}

fn default_argon2_time_cost() -> u32 {
    3
}

fn default_argon2_memory_cost() -> u32 {
    19456
}

fn default_argon2_parallelism() -> u32 {
    1
}

fn default_rate_limit_login() -> u32 {
    10
}

fn default_rate_limit_api() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "./logs/mailroom.log".to_string()
}

fn default_log_rotation() -> String {
    "weekly".to_string()
}

fn default_log_retention_days() -> u32 {
    365
}
