//! In-memory adapters for the authorization stores. Intended for tests/dev.

use emporium_core::{LiveTable, StoreError, StoreResult, UserId, Visibility};

use crate::principal::Principal;
use crate::registry::{EntityCode, EntityDescriptor};
use crate::roles::{Role, RoleName};
use crate::store::{EntityStore, RoleAssignments, RoleHolder, RoleStore};
use crate::user::UserRecord;

#[derive(Debug, Default)]
pub struct InMemoryRoleStore {
    table: LiveTable<RoleName, Role>,
}

impl InMemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoleStore for InMemoryRoleStore {
    fn find_by_names(&self, names: &[RoleName]) -> StoreResult<Vec<Role>> {
        self.table.read(|rows| {
            names
                .iter()
                .filter_map(|n| rows.get(n, Visibility::Live).cloned())
                .collect()
        })
    }

    fn get(&self, name: &RoleName) -> StoreResult<Option<Role>> {
        self.table.read(|rows| rows.get(name, Visibility::Live).cloned())
    }

    fn list(&self) -> StoreResult<Vec<Role>> {
        self.table
            .read(|rows| rows.iter(Visibility::Live).cloned().collect())
    }

    fn insert(&self, role: Role) -> StoreResult<()> {
        let key = role.name.clone();
        let inserted = self.table.write(|rows| rows.insert(key.clone(), role))?;
        if inserted {
            Ok(())
        } else {
            Err(StoreError::Duplicate(format!("role {key}")))
        }
    }

    fn replace(&self, role: Role) -> StoreResult<bool> {
        self.table.write(|rows| match rows.get_mut(&role.name) {
            Some(slot) => {
                *slot = role;
                true
            }
            None => false,
        })
    }

    fn soft_delete(&self, names: &[RoleName]) -> StoreResult<Vec<RoleName>> {
        self.table.write(|rows| {
            names
                .iter()
                .filter(|n| rows.soft_delete(n))
                .cloned()
                .collect()
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    table: LiveTable<EntityCode, EntityDescriptor>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get(&self, code: &EntityCode) -> StoreResult<Option<EntityDescriptor>> {
        self.table.read(|rows| rows.get(code, Visibility::Live).cloned())
    }

    fn list(&self) -> StoreResult<Vec<EntityDescriptor>> {
        self.table
            .read(|rows| rows.iter(Visibility::Live).cloned().collect())
    }

    fn insert(&self, entity: EntityDescriptor) -> StoreResult<()> {
        let key = entity.code_name.clone();
        let inserted = self.table.write(|rows| rows.insert(key.clone(), entity))?;
        if inserted {
            Ok(())
        } else {
            Err(StoreError::Duplicate(format!("entity {key}")))
        }
    }
}

/// Users and their role assignments.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    table: LiveTable<UserId, UserRecord>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: UserRecord) -> StoreResult<()> {
        let id = user.id;
        let inserted = self.table.write(|rows| rows.insert(id, user))?;
        if inserted {
            Ok(())
        } else {
            Err(StoreError::Duplicate(format!("user {id}")))
        }
    }

    pub fn get(&self, id: UserId) -> StoreResult<Option<UserRecord>> {
        self.table.read(|rows| rows.get(&id, Visibility::Live).cloned())
    }

    /// Principal for an active user; `None` for unknown, disabled or deleted users.
    pub fn principal(&self, id: UserId) -> StoreResult<Option<Principal>> {
        Ok(self
            .get(id)?
            .filter(|u| u.lifecycle.is_active())
            .map(|u| u.to_principal()))
    }
}

impl RoleAssignments for InMemoryUserDirectory {
    fn holders_of(&self, names: &[RoleName]) -> StoreResult<Vec<RoleHolder>> {
        self.table.read(|rows| {
            rows.iter(Visibility::Live)
                .filter(|u| u.has_any_role(names))
                .map(|u| RoleHolder {
                    user_id: u.id,
                    roles: u.roles.clone(),
                })
                .collect()
        })
    }
}
