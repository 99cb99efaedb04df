//! Fixed permission sets per role.

use mailroom_entity::user::Role;

/// A system-level permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ViewDashboard,
    ViewPackages,
    RegisterPackage,
    UpdatePackageStatus,
    SearchRecipients,
    ChangeOwnPassword,
    ManageRecipients,
    ImportRecipients,
    ViewReports,
    ExportReports,
    ManageOperators,
    ManageAdmins,
    ManageSuperAdmins,
    ViewAuditLogs,
    EditSettings,
}

impl Permission {
    /// Every permission, for exhaustive checks.
    pub fn all() -> &'static [Permission] {
        use Permission::*;
        &[
            ViewDashboard,
            ViewPackages,
            RegisterPackage,
            UpdatePackageStatus,
            SearchRecipients,
            ChangeOwnPassword,
            ManageRecipients,
            ImportRecipients,
            ViewReports,
            ExportReports,
            ManageOperators,
            ManageAdmins,
            ManageSuperAdmins,
            ViewAuditLogs,
            EditSettings,
        ]
    }
}

/// The fixed permission set for a role. Permissions are cumulative up the
/// hierarchy: everything an operator may do, an admin may do, and so on.
pub fn role_permissions(role: Role) -> &'static [Permission] {
    use Permission::*;
    match role {
        Role::Operator => &[
            ViewDashboard,
            ViewPackages,
            RegisterPackage,
            UpdatePackageStatus,
            SearchRecipients,
            ChangeOwnPassword,
        ],
        Role::Admin => &[
            ViewDashboard,
            ViewPackages,
            RegisterPackage,
            UpdatePackageStatus,
            SearchRecipients,
            ChangeOwnPassword,
            ManageRecipients,
            ImportRecipients,
            ViewReports,
            ExportReports,
            ManageOperators,
        ],
        Role::SuperAdmin => Permission::all(),
    }
}
