//! Request-scoped identity context.
//!
//! Built by the authentication middleware and threaded explicitly through
//! handlers and services; never a global.

use mailroom_entity::session::Session;
use mailroom_entity::user::{Role, User};
use uuid::Uuid;

/// The authenticated caller of the current request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The authenticated user.
    pub user: User,
    /// The session the request rode in on.
    pub session: Session,
    /// Client IP, as reported by the proxy or socket.
    pub ip_address: Option<String>,
    /// Client user agent.
    pub user_agent: Option<String>,
}

impl RequestContext {
    /// The acting user's id.
    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    /// The acting user's role.
    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Client IP as a borrowed string, for audit records.
    pub fn ip(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }
}
