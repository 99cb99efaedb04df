//! User administration (create, edit, deactivate, reset password) and the
//! self-service password change.
//!
//! Every operation consults [`AccessPolicy`] before touching state; route
//! guards add nothing beyond calling this service with the actor.

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use mailroom_auth::password::{PasswordHasher, PasswordValidator, history};
use mailroom_auth::rbac::AccessPolicy;
use mailroom_auth::session::SessionManager;
use mailroom_core::config::AppConfig;
use mailroom_core::error::AppError;
use mailroom_core::result::AppResult;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_database::audit::AuditSink;
use mailroom_database::repositories::user::UserRepository;
use mailroom_entity::audit::AuthEventKind;
use mailroom_entity::user::{CreateUser, Role, User, UserPublic};

/// Service for user management operations.
#[derive(Clone)]
pub struct UserService {
    users: UserRepository,
    sessions: SessionManager,
    hasher: PasswordHasher,
    validator: PasswordValidator,
    policy: AccessPolicy,
    audit: AuditSink,
    history_count: usize,
}

impl UserService {
    /// Creates the service.
    pub fn new(
        users: UserRepository,
        sessions: SessionManager,
        hasher: PasswordHasher,
        validator: PasswordValidator,
        policy: AccessPolicy,
        audit: AuditSink,
        config: &AppConfig,
    ) -> Self {
        Self {
            users,
            sessions,
            hasher,
            validator,
            policy,
            audit,
            history_count: config.password_history_count,
        }
    }

    /// Creates a user. The initial digest seeds the password history and
    /// the account must change its password on first login.
    pub async fn create(
        &self,
        data: CreateUser,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<User> {
        self.policy
            .can_create_user_with_role(actor.role, data.role)
            .into_result()?;
        self.validator.validate(&data.password)?;

        let username = data.username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::validation("Username is required"));
        }
        if self.users.username_exists(&username).await? {
            return Err(AppError::conflict(format!(
                "Username '{username}' already exists"
            )));
        }

        let password_hash = self.hasher.hash(&data.password)?;
        let password_history = history::push(&password_hash, None, self.history_count);

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username,
            password_hash,
            full_name: data.full_name.trim().to_string(),
            role: data.role,
            is_active: true,
            must_change_password: true,
            password_history: Some(password_history),
            failed_login_count: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        };
        self.users.insert(&user).await?;

        self.audit
            .record(
                AuthEventKind::UserCreated,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({
                    "target_user_id": user.id,
                    "target_username": user.username,
                    "role": user.role,
                })),
            )
            .await;

        Ok(user)
    }

    /// Updates a user's display name and, for super admins, their role.
    pub async fn update(
        &self,
        target_id: Uuid,
        full_name: Option<String>,
        role: Option<Role>,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<User> {
        let target = self.require_target(target_id).await?;
        self.policy
            .can_manage_user(actor.role, target.role)
            .into_result()?;

        if let Some(new_role) = role {
            self.policy
                .can_change_role(actor.id, actor.role, target_id)
                .into_result()?;
            // A no-op "change" to the current role is fine; anything else
            // must also be a role the actor could create.
            if new_role != target.role {
                self.policy
                    .can_create_user_with_role(actor.role, new_role)
                    .into_result()?;
            }
        }

        let now = Utc::now();
        self.users
            .update_profile(target_id, full_name.clone(), role, now)
            .await?;

        self.audit
            .record(
                AuthEventKind::UserUpdated,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({
                    "target_user_id": target_id,
                    "target_username": target.username,
                    "full_name": full_name,
                    "role": role,
                })),
            )
            .await;

        let updated = self.require_target(target_id).await?;
        Ok(updated)
    }

    /// Soft-deactivates a user and terminates all of their sessions.
    pub async fn deactivate(
        &self,
        target_id: Uuid,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<()> {
        let target = self.require_target(target_id).await?;
        self.policy
            .can_deactivate(actor.id, actor.role, target_id, target.role)
            .into_result()?;

        self.users.deactivate(target_id, Utc::now()).await?;
        self.sessions.terminate_all_for_user(target_id).await?;

        self.audit
            .record(
                AuthEventKind::UserDeactivated,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({
                    "target_user_id": target_id,
                    "target_username": target.username,
                })),
            )
            .await;
        Ok(())
    }

    /// Resets another user's password. Forces a change on next login,
    /// clears any lockout, and terminates the target's sessions.
    pub async fn reset_password(
        &self,
        target_id: Uuid,
        new_password: &str,
        actor: &User,
        ip_address: Option<&str>,
    ) -> AppResult<()> {
        let target = self.require_target(target_id).await?;
        self.policy
            .can_manage_user(actor.role, target.role)
            .into_result()?;

        self.validator.validate(new_password)?;
        if history::contains(
            &self.hasher,
            new_password,
            target.password_history.as_deref(),
            self.history_count,
        ) {
            return Err(AppError::validation(
                "Password was used recently. Please choose a different password.",
            ));
        }

        let new_hash = self.hasher.hash(new_password)?;
        let new_history = history::push(
            &new_hash,
            target.password_history.as_deref(),
            self.history_count,
        );
        self.users
            .set_password(target_id, new_hash, new_history, true, true, Utc::now())
            .await?;
        self.sessions.terminate_all_for_user(target_id).await?;

        self.audit
            .record(
                AuthEventKind::PasswordReset,
                Some(actor.id),
                Some(&actor.username),
                ip_address,
                Some(json!({
                    "target_user_id": target_id,
                    "target_username": target.username,
                    "force_change": true,
                })),
            )
            .await;
        Ok(())
    }

    /// Self-service password change. Verifies the current password, then
    /// applies the strength and reuse policies. Clears the forced-change
    /// flag.
    pub async fn change_own_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
        ip_address: Option<&str>,
    ) -> AppResult<()> {
        if !self.hasher.verify(current_password, &user.password_hash)? {
            return Err(AppError::validation("Current password is incorrect"));
        }
        self.validator.validate(new_password)?;
        if history::contains(
            &self.hasher,
            new_password,
            user.password_history.as_deref(),
            self.history_count,
        ) {
            return Err(AppError::validation(
                "Password was used recently. Please choose a different password.",
            ));
        }

        let new_hash = self.hasher.hash(new_password)?;
        let new_history = history::push(
            &new_hash,
            user.password_history.as_deref(),
            self.history_count,
        );
        self.users
            .set_password(user.id, new_hash, new_history, false, false, Utc::now())
            .await?;

        self.audit
            .record(
                AuthEventKind::PasswordChanged,
                Some(user.id),
                Some(&user.username),
                ip_address,
                Some(json!({ "self_service": true })),
            )
            .await;
        Ok(())
    }

    /// Find a user by id.
    pub async fn get(&self, id: Uuid) -> AppResult<Option<User>> {
        self.users.find_by_id(id).await
    }

    /// Search users for the admin list.
    pub async fn search(
        &self,
        query: Option<String>,
        role: Option<Role>,
        is_active: Option<bool>,
        page: PageRequest,
    ) -> AppResult<PageResponse<UserPublic>> {
        self.users.search(query, role, is_active, page).await
    }

    async fn require_target(&self, target_id: Uuid) -> AppResult<User> {
        self.users
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }
}
