//! Session lifecycle manager: login outcome, session issuance, validation
//! with sliding renewal, and termination.

use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use mailroom_core::config::AppConfig;
use mailroom_core::error::AppError;
use mailroom_core::result::AppResult;
use mailroom_database::audit::AuditSink;
use mailroom_database::params::format_ts;
use mailroom_database::repositories::session::SessionRepository;
use mailroom_database::repositories::user::UserRepository;
use mailroom_entity::audit::AuthEventKind;
use mailroom_entity::session::Session;
use mailroom_entity::user::User;

use crate::password::PasswordHasher;
use crate::session::token::generate_token;

/// Fixed delay on unknown-user failures so response timing does not reveal
/// whether a username exists.
const LOGIN_FAILURE_DELAY: Duration = Duration::from_millis(100);

/// Minimum interval between successive expiry-extension writes per session.
const RENEW_WINDOW_SECS: i64 = 60;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    /// The authenticated user.
    pub user: User,
    /// The freshly created session.
    pub session: Session,
}

/// Manages the complete session lifecycle.
#[derive(Clone)]
pub struct SessionManager {
    users: UserRepository,
    sessions: SessionRepository,
    hasher: PasswordHasher,
    audit: AuditSink,
    session_timeout_secs: i64,
    max_sessions: u64,
    max_failed_logins: u32,
    lockout_duration_secs: i64,
}

impl SessionManager {
    /// Creates a session manager wired to its repositories.
    pub fn new(
        users: UserRepository,
        sessions: SessionRepository,
        hasher: PasswordHasher,
        audit: AuditSink,
        config: &AppConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            audit,
            session_timeout_secs: config.session_timeout as i64,
            max_sessions: config.max_concurrent_sessions,
            max_failed_logins: config.max_failed_logins,
            lockout_duration_secs: config.account_lockout_duration as i64,
        }
    }

    /// Performs the complete login flow:
    ///
    /// 1. Resolve the user; unknown names get a constant-time delay and the
    ///    same generic failure as bad passwords.
    /// 2. Reject locked and inactive accounts.
    /// 3. Verify the password, counting failures and locking past the
    ///    threshold.
    /// 4. On success, reset the failure counter and issue a session,
    ///    evicting the oldest sessions beyond the concurrency cap.
    ///
    /// Every outcome records exactly one `login` or `login_failed` event.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> AppResult<LoginSuccess> {
        let Some(user) = self.users.find_by_username(username).await? else {
            self.audit
                .record(
                    AuthEventKind::LoginFailed,
                    None,
                    Some(username),
                    ip_address,
                    Some(json!({ "reason": "invalid_username" })),
                )
                .await;
            tokio::time::sleep(LOGIN_FAILURE_DELAY).await;
            return Err(AppError::unauthenticated("Invalid username or password"));
        };

        let now = Utc::now();

        if let Some(locked_until) = user.locked_until.filter(|until| *until > now) {
            self.audit
                .record(
                    AuthEventKind::LoginFailed,
                    Some(user.id),
                    Some(username),
                    ip_address,
                    Some(json!({
                        "reason": "account_locked",
                        "locked_until": format_ts(locked_until),
                    })),
                )
                .await;
            return Err(AppError::locked(format!(
                "Account is locked until {}. Please try again later.",
                locked_until.format("%Y-%m-%d %H:%M:%S UTC")
            )));
        }

        if !user.is_active {
            self.audit
                .record(
                    AuthEventKind::LoginFailed,
                    Some(user.id),
                    Some(username),
                    ip_address,
                    Some(json!({ "reason": "account_inactive" })),
                )
                .await;
            return Err(AppError::forbidden(
                "Account is inactive. Please contact an administrator.",
            ));
        }

        if !self.hasher.verify(password, &user.password_hash)? {
            self.handle_failed_password(&user, username, ip_address, now)
                .await?;
            return Err(AppError::unauthenticated("Invalid username or password"));
        }

        if user.failed_login_count > 0 || user.locked_until.is_some() {
            self.users.reset_failed_login(username, now).await?;
        }

        let session = self
            .create_session(user.id, ip_address, user_agent)
            .await?;

        self.audit
            .record(
                AuthEventKind::Login,
                Some(user.id),
                Some(username),
                ip_address,
                Some(json!({ "session_id": session.id })),
            )
            .await;

        info!(user_id = %user.id, "Login successful");
        Ok(LoginSuccess { user, session })
    }

    /// Issues a new session, enforcing the per-user concurrency cap by
    /// deleting the oldest active sessions first.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> AppResult<Session> {
        let now = Utc::now();

        let active = self.sessions.active_for_user(user_id, now).await?;
        if active.len() as u64 >= self.max_sessions {
            let excess = active.len() - (self.max_sessions as usize - 1);
            let evict: Vec<Uuid> = active.iter().take(excess).map(|s| s.id).collect();
            info!(user_id = %user_id, evicted = evict.len(), "Session cap reached; evicting oldest");
            self.sessions.delete_ids(&evict).await?;
        }

        let session = Session {
            id: Uuid::new_v4(),
            user_id,
            token: generate_token(),
            expires_at: now + ChronoDuration::seconds(self.session_timeout_secs),
            last_activity: now,
            ip_address: ip_address.map(String::from),
            user_agent: user_agent.map(String::from),
            created_at: now,
        };
        self.sessions.insert(&session).await?;
        Ok(session)
    }

    /// Validates a session token: the session must be unexpired and its
    /// owner active. Renews the expiry when enough time has passed since
    /// the last renewal; the renewal write is idempotent within the window.
    pub async fn validate(&self, token: &str) -> AppResult<Option<(Session, User)>> {
        let now = Utc::now();
        let Some((mut session, user)) = self.sessions.find_valid_by_token(token, now).await? else {
            return Ok(None);
        };
        if !user.is_active {
            return Ok(None);
        }

        let renew_threshold =
            ChronoDuration::seconds(self.session_timeout_secs - RENEW_WINDOW_SECS);
        if session.expires_at - now < renew_threshold {
            let new_expiry = now + ChronoDuration::seconds(self.session_timeout_secs);
            let watermark = now - ChronoDuration::seconds(RENEW_WINDOW_SECS);
            // A failed renewal must not fail the request; the session is
            // still valid until its current expiry.
            if let Err(e) = self.sessions.renew(token, new_expiry, watermark, now).await {
                warn!(error = %e, "Session renewal write failed");
            } else {
                session.expires_at = new_expiry;
                session.last_activity = now;
            }
        }

        Ok(Some((session, user)))
    }

    /// Terminates the session behind a token, recording a `logout` event
    /// when the token still resolves to a user.
    pub async fn logout(&self, token: &str, ip_address: Option<&str>) -> AppResult<()> {
        let now = Utc::now();
        if let Some((session, user)) = self.sessions.find_valid_by_token(token, now).await? {
            self.audit
                .record(
                    AuthEventKind::Logout,
                    Some(user.id),
                    Some(&user.username),
                    ip_address,
                    Some(json!({ "session_id": session.id })),
                )
                .await;
        }
        self.sessions.delete_by_token(token).await
    }

    /// Active sessions for a user, most recently active first.
    pub async fn sessions_for_user(&self, user_id: Uuid) -> AppResult<Vec<Session>> {
        self.sessions.list_for_user(user_id, Utc::now()).await
    }

    /// Terminates one of the user's own sessions. Returns whether a row was
    /// deleted; a foreign session id deletes nothing.
    pub async fn terminate_session_by_id(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<bool> {
        self.sessions.delete_by_id_for_user(session_id, user_id).await
    }

    /// Deletes all of a user's sessions (deactivation, password reset).
    pub async fn terminate_all_for_user(&self, user_id: Uuid) -> AppResult<usize> {
        self.sessions.delete_for_user(user_id).await
    }

    async fn handle_failed_password(
        &self,
        user: &User,
        username: &str,
        ip_address: Option<&str>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let new_count = user.failed_login_count + 1;
        let locked_until = (new_count >= self.max_failed_logins)
            .then(|| now + ChronoDuration::seconds(self.lockout_duration_secs));

        self.users
            .record_failed_login(username, new_count, locked_until, now)
            .await?;

        if let Some(until) = locked_until {
            warn!(
                user_id = %user.id,
                attempts = new_count,
                locked_until = %format_ts(until),
                "Account locked after repeated failed logins"
            );
            self.audit
                .record(
                    AuthEventKind::AccountLocked,
                    Some(user.id),
                    Some(username),
                    ip_address,
                    Some(json!({
                        "failed_attempts": new_count,
                        "locked_until": format_ts(until),
                    })),
                )
                .await;
        }

        self.audit
            .record(
                AuthEventKind::LoginFailed,
                Some(user.id),
                Some(username),
                ip_address,
                Some(json!({ "reason": "invalid_password" })),
            )
            .await;
        Ok(())
    }
}
