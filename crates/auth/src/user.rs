//! User records as far as authorization cares about them.
//!
//! Account management lives elsewhere; this crate only needs to know which
//! roles and direct grants a user carries, and whether the account is active.

use serde::{Deserialize, Serialize};

use emporium_core::{Lifecycle, SoftDelete, UserId};

use crate::principal::Principal;
use crate::roles::{PermissionGrant, RoleName};

/// A user with its role assignments and direct grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub display_name: String,
    pub roles: Vec<RoleName>,
    #[serde(default)]
    pub permissions: Vec<PermissionGrant>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl UserRecord {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            display_name: display_name.into(),
            roles: Vec::new(),
            permissions: Vec::new(),
            lifecycle: Lifecycle::now(),
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

    pub fn has_any_role(&self, names: &[RoleName]) -> bool {
        self.roles.iter().any(|r| names.contains(r))
    }

    /// The principal handed to the authorization gate for this user.
    pub fn to_principal(&self) -> Principal {
        Principal {
            id: self.id,
            roles: self.roles.clone(),
            permissions: self.permissions.clone(),
        }
    }
}

impl SoftDelete for UserRecord {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}
