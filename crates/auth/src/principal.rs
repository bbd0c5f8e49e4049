use serde::{Deserialize, Serialize};

use emporium_core::UserId;

use crate::roles::{PermissionGrant, RoleName};

/// An already-authenticated actor, as handed over by the authentication layer.
///
/// `permissions` are direct grants that exist independently of role
/// membership; both sources are merged on every authorization check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub roles: Vec<RoleName>,
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
}

impl Principal {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<RoleName>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_grant(mut self, grant: PermissionGrant) -> Self {
        self.permissions.push(grant);
        self
    }
}
