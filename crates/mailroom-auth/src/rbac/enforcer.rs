//! The access policy: a pure function over (actor, action, target).
//!
//! Route guards are thin wrappers that call into this module; no
//! authorization decision lives anywhere else.

use std::fmt;

use uuid::Uuid;

use mailroom_core::error::AppError;
use mailroom_entity::user::Role;

use super::policies::{Permission, role_permissions};

/// Stable reason code for a denial. The code never reveals the target's
/// role to an unauthorized actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The actor's role lacks the permission.
    PermissionDenied,
    /// The actor may not manage the target user.
    TargetNotManageable,
    /// Role changes require a super admin.
    RoleChangeRequiresSuperAdmin,
    /// Actors may not deactivate their own account.
    SelfDeactivation,
    /// Actors may not change their own role.
    SelfRoleChange,
}

impl DenyReason {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission_denied",
            Self::TargetNotManageable => "target_not_manageable",
            Self::RoleChangeRequiresSuperAdmin => "role_change_requires_super_admin",
            Self::SelfDeactivation => "self_deactivation",
            Self::SelfRoleChange => "self_role_change",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    /// Convert into a result, mapping denial to a `Forbidden` error that
    /// carries only the stable reason code.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny(reason) => Err(AppError::forbidden(reason.code())),
        }
    }
}

/// Pure decision module owning the role hierarchy and the user-management
/// matrix. Stateless; construct once at boot and share.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    /// Create the policy.
    pub fn new() -> Self {
        Self
    }

    /// Whether the role holds the permission.
    pub fn decide(&self, role: Role, permission: Permission) -> Decision {
        if role_permissions(role).contains(&permission) {
            Decision::Allow
        } else {
            Decision::Deny(DenyReason::PermissionDenied)
        }
    }

    /// Require a permission, or fail with a `Forbidden` error.
    pub fn require(&self, role: Role, permission: Permission) -> Result<(), AppError> {
        self.decide(role, permission).into_result()
    }

    /// Whether the actor may manage (edit, deactivate, reset the password
    /// of) the target user.
    ///
    /// Super admins manage anyone; admins manage operators only; operators
    /// manage no one. Self-recovery is protected separately by
    /// [`Self::can_deactivate`].
    pub fn can_manage_user(&self, actor_role: Role, target_role: Role) -> Decision {
        match actor_role {
            Role::SuperAdmin => Decision::Allow,
            Role::Admin if target_role == Role::Operator => Decision::Allow,
            _ => Decision::Deny(DenyReason::TargetNotManageable),
        }
    }

    /// Whether the actor may create a user with the given role.
    pub fn can_create_user_with_role(&self, actor_role: Role, new_role: Role) -> Decision {
        self.can_manage_user(actor_role, new_role)
    }

    /// Whether the actor may change the target's role to `new_role`.
    /// Only super admins change roles, and never their own.
    pub fn can_change_role(
        &self,
        actor_id: Uuid,
        actor_role: Role,
        target_id: Uuid,
    ) -> Decision {
        if actor_role != Role::SuperAdmin {
            return Decision::Deny(DenyReason::RoleChangeRequiresSuperAdmin);
        }
        if actor_id == target_id {
            return Decision::Deny(DenyReason::SelfRoleChange);
        }
        Decision::Allow
    }

    /// Whether the actor may deactivate the target. Self-deactivation is
    /// always denied so an actor cannot lock themselves out.
    pub fn can_deactivate(
        &self,
        actor_id: Uuid,
        actor_role: Role,
        target_id: Uuid,
        target_role: Role,
    ) -> Decision {
        if actor_id == target_id {
            return Decision::Deny(DenyReason::SelfDeactivation);
        }
        self.can_manage_user(actor_role, target_role)
    }
}
