//! Storage seams for the authorization core.
//!
//! Adapters apply the soft-delete filter themselves: every lookup here sees
//! live records only.

use std::sync::Arc;

use emporium_core::{StoreResult, UserId};

use crate::registry::{EntityCode, EntityDescriptor};
use crate::roles::{Role, RoleName};

/// Role persistence, keyed by role name.
pub trait RoleStore: Send + Sync {
    /// Live roles whose name is in `names`, in any order. Unknown names are skipped.
    fn find_by_names(&self, names: &[RoleName]) -> StoreResult<Vec<Role>>;
    fn get(&self, name: &RoleName) -> StoreResult<Option<Role>>;
    fn list(&self) -> StoreResult<Vec<Role>>;
    /// Insert a new role; `StoreError::Duplicate` if a live role has the name.
    fn insert(&self, role: Role) -> StoreResult<()>;
    /// Replace a live role in place. Returns `false` if no row was affected.
    fn replace(&self, role: Role) -> StoreResult<bool>;
    /// Soft-delete the named roles, returning the names actually deleted.
    fn soft_delete(&self, names: &[RoleName]) -> StoreResult<Vec<RoleName>>;
}

/// Entity catalogue persistence.
pub trait EntityStore: Send + Sync {
    fn get(&self, code: &EntityCode) -> StoreResult<Option<EntityDescriptor>>;
    fn list(&self) -> StoreResult<Vec<EntityDescriptor>>;
    fn insert(&self, entity: EntityDescriptor) -> StoreResult<()>;
}

/// A user and the role names currently assigned to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHolder {
    pub user_id: UserId,
    pub roles: Vec<RoleName>,
}

/// Lookup of which users reference which roles (owned by the user module).
pub trait RoleAssignments: Send + Sync {
    /// Users whose role list contains at least one of `names`.
    fn holders_of(&self, names: &[RoleName]) -> StoreResult<Vec<RoleHolder>>;
}

impl<S> RoleStore for Arc<S>
where
    S: RoleStore + ?Sized,
{
    fn find_by_names(&self, names: &[RoleName]) -> StoreResult<Vec<Role>> {
        (**self).find_by_names(names)
    }

    fn get(&self, name: &RoleName) -> StoreResult<Option<Role>> {
        (**self).get(name)
    }

    fn list(&self) -> StoreResult<Vec<Role>> {
        (**self).list()
    }

    fn insert(&self, role: Role) -> StoreResult<()> {
        (**self).insert(role)
    }

    fn replace(&self, role: Role) -> StoreResult<bool> {
        (**self).replace(role)
    }

    fn soft_delete(&self, names: &[RoleName]) -> StoreResult<Vec<RoleName>> {
        (**self).soft_delete(names)
    }
}

impl<S> EntityStore for Arc<S>
where
    S: EntityStore + ?Sized,
{
    fn get(&self, code: &EntityCode) -> StoreResult<Option<EntityDescriptor>> {
        (**self).get(code)
    }

    fn list(&self) -> StoreResult<Vec<EntityDescriptor>> {
        (**self).list()
    }

    fn insert(&self, entity: EntityDescriptor) -> StoreResult<()> {
        (**self).insert(entity)
    }
}

impl<S> RoleAssignments for Arc<S>
where
    S: RoleAssignments + ?Sized,
{
    fn holders_of(&self, names: &[RoleName]) -> StoreResult<Vec<RoleHolder>> {
        (**self).holders_of(names)
    }
}
