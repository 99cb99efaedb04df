//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Duration;

use mailroom_auth::password::{PasswordHasher, PasswordValidator};
use mailroom_auth::rbac::AccessPolicy;
use mailroom_auth::session::SessionManager;
use mailroom_core::config::AppConfig;
use mailroom_core::result::AppResult;
use mailroom_database::audit::AuditSink;
use mailroom_database::repositories::audit::AuditRepository;
use mailroom_database::repositories::package::PackageRepository;
use mailroom_database::repositories::recipient::RecipientRepository;
use mailroom_database::repositories::session::SessionRepository;
use mailroom_database::repositories::setting::SettingRepository;
use mailroom_database::repositories::user::UserRepository;
use mailroom_database::{Store, WriteQueue};
use mailroom_service::dashboard::DashboardService;
use mailroom_service::health::HealthService;
use mailroom_service::package::PackageService;
use mailroom_service::recipient::{RecipientImporter, RecipientService};
use mailroom_service::report::ReportService;
use mailroom_service::settings::SettingsService;
use mailroom_service::upload::UploadService;
use mailroom_service::user::UserService;

use crate::middleware::rate_limit::RateLimiter;

/// Application state containing all shared dependencies.
///
/// Passed to every handler via `State<AppState>`. Everything inside is
/// cheap to clone; the heavyweight pieces are `Arc`-wrapped or internally
/// reference-counted. Tests construct their own instance over a private
/// database path.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// The embedded store (read handles).
    pub store: Store,
    /// The serialized write path.
    pub queue: Arc<WriteQueue>,

    /// Audit sink.
    pub audit: AuditSink,
    /// Audit log reads (the super-admin surface).
    pub audit_logs: AuditRepository,
    /// Pure access policy.
    pub policy: AccessPolicy,
    /// Session lifecycle manager.
    pub sessions: SessionManager,
    /// User repository (read-side lookups in middleware).
    pub users: UserRepository,

    /// User administration service.
    pub user_service: UserService,
    /// Package lifecycle service.
    pub package_service: PackageService,
    /// Recipient directory service.
    pub recipient_service: RecipientService,
    /// Bulk recipient import.
    pub recipient_importer: RecipientImporter,
    /// System settings service.
    pub settings_service: SettingsService,
    /// Dashboard projection.
    pub dashboard_service: DashboardService,
    /// Reports and CSV export.
    pub report_service: ReportService,
    /// Health snapshot service.
    pub health_service: HealthService,
    /// Upload storage (attachment downloads resolve through it).
    pub uploads: UploadService,

    /// In-memory sliding-window rate limiter.
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Open the store, start the write queue, and wire every service.
    ///
    /// Startup ordering per the concurrency model: store (schema,
    /// migrations, session sweep) → write queue worker → policy and
    /// services → router.
    pub fn build(config: AppConfig) -> AppResult<Self> {
        let config = Arc::new(config);

        let store = Store::open(&config.database_path)?;
        let queue = WriteQueue::start(
            store.clone(),
            Duration::from_secs(config.database_checkpoint_interval),
        );

        let users = UserRepository::new(store.clone(), Arc::clone(&queue));
        let sessions_repo = SessionRepository::new(store.clone(), Arc::clone(&queue));
        let recipients_repo = RecipientRepository::new(store.clone(), Arc::clone(&queue));
        let packages_repo = PackageRepository::new(store.clone(), Arc::clone(&queue));
        let audit_repo = AuditRepository::new(store.clone(), Arc::clone(&queue));
        let settings_repo = SettingRepository::new(store.clone(), Arc::clone(&queue));

        let audit = AuditSink::new(audit_repo.clone());
        let hasher = PasswordHasher::new(&config);
        let validator = PasswordValidator::new(&config);
        let policy = AccessPolicy::new();
        let uploads = UploadService::new(&config);

        let sessions = SessionManager::new(
            users.clone(),
            sessions_repo,
            hasher.clone(),
            audit.clone(),
            &config,
        );

        let user_service = UserService::new(
            users.clone(),
            sessions.clone(),
            hasher,
            validator,
            policy.clone(),
            audit.clone(),
            &config,
        );
        let package_service = PackageService::new(
            packages_repo.clone(),
            recipients_repo.clone(),
            uploads.clone(),
            audit.clone(),
        );
        let recipient_service = RecipientService::new(recipients_repo.clone(), audit.clone());
        let recipient_importer = RecipientImporter::new(recipients_repo, audit.clone());
        let settings_service = SettingsService::new(settings_repo, audit.clone());
        let dashboard_service = DashboardService::new(packages_repo.clone());
        let report_service = ReportService::new(packages_repo, audit.clone());
        let health_service = HealthService::new(store.clone(), &config);

        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_login,
            config.rate_limit_api,
        ));

        Ok(Self {
            config,
            store,
            queue,
            audit,
            audit_logs: audit_repo,
            policy,
            sessions,
            users,
            user_service,
            package_service,
            recipient_service,
            recipient_importer,
            settings_service,
            dashboard_service,
            report_service,
            health_service,
            uploads,
            rate_limiter,
        })
    }

    /// Drain and stop the write path. Called after the server stops
    /// accepting connections.
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}
