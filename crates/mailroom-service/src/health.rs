//! Health checks for the monitoring endpoint.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

use mailroom_core::config::AppConfig;
use mailroom_core::error::{AppError, ErrorKind};
use mailroom_database::store::Store;

/// One named check's outcome.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
}

/// The `/health` payload.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    pub checks: HealthChecks,
}

/// Individual subsystem checks.
#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub database: CheckResult,
    pub disk_space: CheckResult,
    pub uptime: UptimeInfo,
}

/// Process uptime.
#[derive(Debug, Clone, Serialize)]
pub struct UptimeInfo {
    pub status: String,
    pub seconds: u64,
}

/// Produces health snapshots; unauthenticated and cheap.
#[derive(Clone)]
pub struct HealthService {
    store: Store,
    upload_dir: PathBuf,
    started: Instant,
}

impl HealthService {
    /// Creates the service; uptime counts from construction.
    pub fn new(store: Store, config: &AppConfig) -> Self {
        Self {
            store,
            upload_dir: PathBuf::from(&config.upload_dir),
            started: Instant::now(),
        }
    }

    /// A full health snapshot.
    pub async fn status(&self, version: &str) -> HealthStatus {
        let database = self.check_database().await;
        let disk_space = self.check_directories();

        let healthy = database.status == "healthy" && disk_space.status == "healthy";
        HealthStatus {
            status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: version.to_string(),
            checks: HealthChecks {
                database,
                disk_space,
                uptime: UptimeInfo {
                    status: "healthy".to_string(),
                    seconds: self.started.elapsed().as_secs(),
                },
            },
        }
    }

    async fn check_database(&self) -> CheckResult {
        let result = self
            .store
            .with_read(|conn| {
                conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                    .map_err(|e| {
                        AppError::with_source(ErrorKind::Database, "Health probe failed", e)
                    })
            })
            .await;
        match result {
            Ok(1) => CheckResult {
                status: "healthy".to_string(),
                message: "Database connection successful".to_string(),
            },
            Ok(_) | Err(_) => CheckResult {
                status: "unhealthy".to_string(),
                message: "Database connection failed".to_string(),
            },
        }
    }

    fn check_directories(&self) -> CheckResult {
        let db_dir = self
            .store
            .path()
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        for dir in [&db_dir, &self.upload_dir] {
            if !dir.exists() {
                return CheckResult {
                    status: "unhealthy".to_string(),
                    message: format!("Required directory missing: {}", dir.display()),
                };
            }
        }
        CheckResult {
            status: "healthy".to_string(),
            message: "Data directories present".to_string(),
        }
    }
}
