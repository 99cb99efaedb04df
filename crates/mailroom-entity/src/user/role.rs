//! User roles and the role hierarchy.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A user's role. The hierarchy is `super_admin > admin > operator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Handles packages; no management surface.
    Operator,
    /// Manages recipients, reports, and operator accounts.
    Admin,
    /// Full control including admin accounts, audit logs, and settings.
    SuperAdmin,
}

impl Role {
    /// Numeric level for hierarchy comparison. Higher means more privileged.
    pub fn level(&self) -> u8 {
        match self {
            Self::Operator => 1,
            Self::Admin => 2,
            Self::SuperAdmin => 3,
        }
    }

    /// Database/string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Operator => "operator",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }

    /// All roles, lowest to highest.
    pub fn all() -> [Role; 3] {
        [Self::Operator, Self::Admin, Self::SuperAdmin]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "operator" => Ok(Self::Operator),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}
