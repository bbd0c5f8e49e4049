//! Role definitions: create, update, delete.
//!
//! Every permission list is validated against the entity registry before it
//! is persisted. Roles still assigned to users survive bulk deletion.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use emporium_core::{DomainError, DomainResult, StoreError, UserId};

use crate::registry::EntityRegistry;
use crate::roles::{PermissionGrant, Role, RoleName, merge_grants};
use crate::store::{EntityStore, RoleAssignments, RoleStore};

/// Input of [`RoleLifecycleManager::create_role`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRole {
    pub name: RoleName,
    pub permissions: Vec<PermissionGrant>,
    #[serde(default)]
    pub priority: Option<i32>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePatch {
    pub permissions: Option<Vec<PermissionGrant>>,
    pub priority: Option<i32>,
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct RoleLifecycleManager<R, E, U> {
    roles: R,
    registry: EntityRegistry<E>,
    users: U,
}

impl<R, E, U> RoleLifecycleManager<R, E, U>
where
    R: RoleStore,
    E: EntityStore,
    U: RoleAssignments,
{
    pub fn new(roles: R, registry: EntityRegistry<E>, users: U) -> Self {
        Self {
            roles,
            registry,
            users,
        }
    }

    pub fn registry(&self) -> &EntityRegistry<E> {
        &self.registry
    }

    pub fn create_role(&self, new: NewRole) -> DomainResult<Role> {
        if new.name.as_str().trim().is_empty() {
            return Err(DomainError::validation("role name must not be empty"));
        }
        let permissions = merge_grants(new.permissions);
        self.registry.validate_grants(&permissions)?;

        if self.roles.get(&new.name)?.is_some() {
            return Err(DomainError::conflict(format!("role {} already exists", new.name)));
        }

        let mut role = Role::new(new.name, permissions);
        role.priority = new.priority;

        match self.roles.insert(role.clone()) {
            Ok(()) => {}
            Err(StoreError::Duplicate(_)) => {
                return Err(DomainError::conflict(format!("role {} already exists", role.name)));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(role = %role.name, grants = role.permissions.len(), "role created");
        Ok(role)
    }

    pub fn get_role(&self, name: &RoleName) -> DomainResult<Role> {
        self.roles
            .get(name)?
            .ok_or_else(|| DomainError::not_found("role", name))
    }

    /// Live roles, highest priority first, then by name.
    pub fn list_roles(&self) -> DomainResult<Vec<Role>> {
        let mut roles = self.roles.list()?;
        roles.sort_by(|a, b| {
            Reverse(a.priority)
                .cmp(&Reverse(b.priority))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(roles)
    }

    pub fn update_role(&self, name: &RoleName, patch: RolePatch) -> DomainResult<Role> {
        let mut role = self.get_role(name)?;

        if let Some(permissions) = patch.permissions {
            let permissions = merge_grants(permissions);
            self.registry.validate_grants(&permissions)?;
            role.permissions = permissions;
        }
        if let Some(priority) = patch.priority {
            role.priority = Some(priority);
        }
        if let Some(enabled) = patch.enabled {
            role.lifecycle.enabled = enabled;
        }

        if !self.roles.replace(role.clone())? {
            return Err(DomainError::UpdateFailed(format!("role {name}")));
        }

        tracing::info!(role = %role.name, enabled = role.lifecycle.enabled, "role updated");
        Ok(role)
    }

    /// Soft-delete one role. Does not consult user assignments.
    pub fn soft_delete_role(&self, name: &RoleName) -> DomainResult<bool> {
        let deleted = self.roles.soft_delete(std::slice::from_ref(name))?;
        if deleted.is_empty() {
            return Err(DomainError::DeleteFailed(format!("role {name}")));
        }
        tracing::info!(role = %name, "role deleted");
        Ok(true)
    }

    /// Soft-delete every named role no user references.
    ///
    /// Unreferenced roles are committed even when others are blocked; the
    /// blocked ones are then reported through `RolesHaveUser`.
    pub fn bulk_delete_roles(&self, names: &[RoleName]) -> DomainResult<Vec<RoleName>> {
        let requested: Vec<RoleName> = names
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let holders = self.users.holders_of(&requested)?;
        let referenced: BTreeSet<&RoleName> = holders.iter().flat_map(|h| h.roles.iter()).collect();

        let (blocked, deletable): (Vec<RoleName>, Vec<RoleName>) = requested
            .into_iter()
            .partition(|name| referenced.contains(name));

        let deleted = self.roles.soft_delete(&deletable)?;
        tracing::info!(deleted = deleted.len(), blocked = blocked.len(), "bulk role delete");

        if blocked.is_empty() {
            return Ok(deleted);
        }

        let users: Vec<UserId> = holders
            .iter()
            .filter(|h| h.roles.iter().any(|r| blocked.contains(r)))
            .map(|h| h.user_id)
            .collect();
        tracing::warn!(
            blocked = ?blocked.iter().map(RoleName::as_str).collect::<Vec<_>>(),
            users = users.len(),
            "roles still assigned to users"
        );
        Err(DomainError::RolesHaveUser {
            deleted: deleted.iter().map(|n| n.to_string()).collect(),
            blocked: blocked.iter().map(|n| n.to_string()).collect(),
            users,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::memory::{InMemoryEntityStore, InMemoryRoleStore, InMemoryUserDirectory};
    use crate::registry::EntityDescriptor;
    use crate::user::UserRecord;

    type Manager = RoleLifecycleManager<
        Arc<InMemoryRoleStore>,
        InMemoryEntityStore,
        Arc<InMemoryUserDirectory>,
    >;

    fn setup() -> (Manager, Arc<InMemoryRoleStore>, Arc<InMemoryUserDirectory>) {
        let entities = InMemoryEntityStore::new();
        entities
            .insert(EntityDescriptor::new(
                "category",
                ["list", "create", "read", "update", "delete"],
            ))
            .unwrap();
        entities
            .insert(EntityDescriptor::new("store", ["list", "read"]))
            .unwrap();
        let roles = Arc::new(InMemoryRoleStore::new());
        let users = Arc::new(InMemoryUserDirectory::new());
        let manager = RoleLifecycleManager::new(
            roles.clone(),
            EntityRegistry::new(entities),
            users.clone(),
        );
        (manager, roles, users)
    }

    fn new_role(name: &'static str, grants: Vec<PermissionGrant>) -> NewRole {
        NewRole {
            name: name.into(),
            permissions: grants,
            priority: None,
        }
    }

    #[test]
    fn create_rejects_unknown_rule() {
        let (manager, roles, _) = setup();
        let err = manager
            .create_role(new_role("flyer", vec![PermissionGrant::new("category", ["fly"])]))
            .unwrap_err();

        assert_eq!(err.http_status(), 422);
        assert!(matches!(
            &err,
            DomainError::UnknownRules { rules, .. } if rules == &vec!["fly".to_string()]
        ));
        assert!(roles.list().unwrap().is_empty());
    }

    #[test]
    fn create_rejects_unknown_entity_and_duplicates() {
        let (manager, _, _) = setup();
        let err = manager
            .create_role(new_role("x", vec![PermissionGrant::new("spaceship", ["read"])]))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { kind: "entity", .. }));

        manager.create_role(new_role("vendor", vec![])).unwrap();
        let err = manager.create_role(new_role("vendor", vec![])).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn create_merges_duplicate_grants() {
        let (manager, _, _) = setup();
        let role = manager
            .create_role(new_role(
                "editor",
                vec![
                    PermissionGrant::new("category", ["read"]),
                    PermissionGrant::new("category", ["update"]),
                ],
            ))
            .unwrap();

        assert_eq!(
            role.permissions,
            vec![PermissionGrant::new("category", ["read", "update"])]
        );
    }

    #[test]
    fn update_validates_and_locates_by_name() {
        let (manager, _, _) = setup();
        manager.create_role(new_role("vendor", vec![])).unwrap();

        let err = manager
            .update_role(&"missing".into(), RolePatch::default())
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { kind: "role", .. }));

        let err = manager
            .update_role(
                &"vendor".into(),
                RolePatch {
                    permissions: Some(vec![PermissionGrant::new("store", ["delete"])]),
                    ..RolePatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::UnknownRules { .. }));

        let updated = manager
            .update_role(
                &"vendor".into(),
                RolePatch {
                    permissions: Some(vec![PermissionGrant::new("store", ["read"])]),
                    priority: Some(5),
                    enabled: Some(false),
                },
            )
            .unwrap();
        assert_eq!(updated.priority, Some(5));
        assert!(!updated.lifecycle.enabled);
        assert_eq!(manager.get_role(&"vendor".into()).unwrap(), updated);
    }

    #[test]
    fn list_orders_by_priority_then_name() {
        let (manager, _, _) = setup();
        for (name, priority) in [("b", Some(1)), ("a", Some(1)), ("c", None), ("d", Some(9))] {
            manager
                .create_role(NewRole {
                    name: name.into(),
                    permissions: vec![],
                    priority,
                })
                .unwrap();
        }
        let names: Vec<String> = manager
            .list_roles()
            .unwrap()
            .into_iter()
            .map(|r| r.name.to_string())
            .collect();
        assert_eq!(names, vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn soft_delete_missing_role_fails() {
        let (manager, _, _) = setup();
        manager.create_role(new_role("temp", vec![])).unwrap();

        assert!(manager.soft_delete_role(&"temp".into()).unwrap());
        let err = manager.soft_delete_role(&"temp".into()).unwrap_err();
        assert!(matches!(err, DomainError::DeleteFailed(_)));
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn bulk_delete_keeps_roles_assigned_to_users() {
        let (manager, roles, users) = setup();
        manager.create_role(new_role("vendor", vec![])).unwrap();
        manager.create_role(new_role("unused_role", vec![])).unwrap();
        let user = UserRecord::new("U").with_role("vendor");
        let user_id = user.id;
        users.insert(user).unwrap();

        let err = manager
            .bulk_delete_roles(&["vendor".into(), "unused_role".into()])
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::RolesHaveUser {
                deleted: vec!["unused_role".to_string()],
                blocked: vec!["vendor".to_string()],
                users: vec![user_id],
            }
        );
        assert_eq!(err.http_status(), 400);
        assert!(roles.get(&"unused_role".into()).unwrap().is_none());
        assert!(roles.get(&"vendor".into()).unwrap().is_some());
    }

    #[test]
    fn bulk_delete_without_references_succeeds() {
        let (manager, _, _) = setup();
        manager.create_role(new_role("a", vec![])).unwrap();
        manager.create_role(new_role("b", vec![])).unwrap();

        let deleted = manager
            .bulk_delete_roles(&["b".into(), "a".into(), "a".into()])
            .unwrap();
        assert_eq!(deleted, vec![RoleName::new("a"), RoleName::new("b")]);
        assert!(manager.list_roles().unwrap().is_empty());
    }
}
