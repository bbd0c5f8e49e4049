//! Composition root for the admin backend.
//!
//! Every operation declares the `(entity, rule)` scope it needs and passes
//! the caller's principal through the authorization gate before touching any
//! domain state.

use std::sync::Arc;

use emporium_auth::fixtures::{SeedReport, seed_defaults};
use emporium_auth::memory::{InMemoryEntityStore, InMemoryRoleStore, InMemoryUserDirectory};
use emporium_auth::{
    AuthorizationExplanation, AuthorizationGate, EntityDescriptor, EntityRegistry, NewRole,
    PermissionResolver, Principal, Role, RoleLifecycleManager, RoleName, RolePatch, Scope,
    UserRecord,
};
use emporium_core::{DomainError, DomainResult, NodeId, UserId};
use emporium_hierarchy::memory::{InMemoryDependentIndex, InMemoryTreeStore};
use emporium_hierarchy::{
    Category, CategoryPatch, ConfirmStatus, Hierarchy, NoDependents, NodeUpdate, Organization,
    OrganizationPatch, RepairReport, TreeNode, TreeView,
};

use crate::config::Settings;

type Roles = Arc<InMemoryRoleStore>;
type Entities = Arc<InMemoryEntityStore>;
type Users = Arc<InMemoryUserDirectory>;

pub type CategoryTree =
    Hierarchy<Category, Arc<InMemoryTreeStore<Category>>, Arc<InMemoryDependentIndex>>;
pub type OrganizationTree =
    Hierarchy<Organization, Arc<InMemoryTreeStore<Organization>>, NoDependents>;

fn scope(entity: &'static str, rule: &'static str) -> Scope {
    Scope::new(entity, rule)
}

pub struct AdminServices {
    gate: AuthorizationGate<Roles>,
    roles: RoleLifecycleManager<Roles, Entities, Users>,
    categories: CategoryTree,
    organizations: OrganizationTree,
    users: Users,
    products: Arc<InMemoryDependentIndex>,
}

impl AdminServices {
    /// In-memory wiring (dev/test).
    pub fn in_memory(settings: &Settings) -> DomainResult<Self> {
        let roles: Roles = Arc::new(InMemoryRoleStore::new());
        let entities: Entities = Arc::new(InMemoryEntityStore::new());
        let users: Users = Arc::new(InMemoryUserDirectory::new());
        let products = Arc::new(InMemoryDependentIndex::new());

        if settings.seed_defaults {
            let SeedReport {
                entities_created,
                roles_created,
            } = seed_defaults(&entities, &roles)?;
            tracing::debug!(entities_created, roles_created, "seeded in-memory stores");
        }

        let gate = AuthorizationGate::new(PermissionResolver::new(
            roles.clone(),
            settings.permission_merge,
        ));
        let role_manager =
            RoleLifecycleManager::new(roles, EntityRegistry::new(entities), users.clone());

        tracing::info!(
            permission_merge = %settings.permission_merge,
            seed_defaults = settings.seed_defaults,
            "admin services ready"
        );

        Ok(Self {
            gate,
            roles: role_manager,
            categories: Hierarchy::new(Arc::new(InMemoryTreeStore::new()), products.clone()),
            organizations: Hierarchy::new(Arc::new(InMemoryTreeStore::new()), NoDependents),
            users,
            products,
        })
    }

    fn authorize(
        &self,
        principal: &Principal,
        entity: &'static str,
        rule: &'static str,
    ) -> DomainResult<()> {
        self.gate.check(principal, Some(&scope(entity, rule)))?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Principals
    // ─────────────────────────────────────────────────────────────────────────

    /// User directory the authentication layer resolves principals from.
    pub fn users(&self) -> &Users {
        &self.users
    }

    /// Index of products filed under categories.
    pub fn products(&self) -> &Arc<InMemoryDependentIndex> {
        &self.products
    }

    pub fn register_user(&self, user: UserRecord) -> DomainResult<Principal> {
        let principal = user.to_principal();
        self.users.insert(user)?;
        Ok(principal)
    }

    /// Principal of an active user.
    pub fn principal_for(&self, user_id: UserId) -> DomainResult<Principal> {
        self.users
            .principal(user_id)?
            .ok_or_else(|| DomainError::not_found("user", user_id))
    }

    /// Audit view of a decision; needs only an authenticated principal.
    pub fn explain(
        &self,
        principal: &Principal,
        scope: Option<&Scope>,
    ) -> DomainResult<AuthorizationExplanation> {
        self.gate.check(principal, None)?;
        self.gate.explain(principal, scope)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Categories
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_category(
        &self,
        principal: &Principal,
        data: Category,
        parent: Option<NodeId>,
    ) -> DomainResult<TreeNode<Category>> {
        self.authorize(principal, "category", "create")?;
        self.categories.create(data, parent)
    }

    pub fn get_category(
        &self,
        principal: &Principal,
        id: NodeId,
    ) -> DomainResult<TreeNode<Category>> {
        self.authorize(principal, "category", "read")?;
        self.categories.get(id)
    }

    pub fn category_tree(
        &self,
        principal: &Principal,
        parent: Option<NodeId>,
        depth: usize,
    ) -> DomainResult<Vec<TreeView<Category>>> {
        self.authorize(principal, "category", "list")?;
        self.categories.tree(parent, depth)
    }

    /// Ids along a `"A > B > C"` title path.
    pub fn resolve_category_path(
        &self,
        principal: &Principal,
        path: &str,
    ) -> DomainResult<Vec<NodeId>> {
        self.authorize(principal, "category", "read")?;
        self.categories.resolve_path(path, '>')
    }

    pub fn update_category(
        &self,
        principal: &Principal,
        id: NodeId,
        change: NodeUpdate<CategoryPatch>,
    ) -> DomainResult<TreeNode<Category>> {
        self.authorize(principal, "category", "update")?;
        self.categories.update(id, change)
    }

    pub fn delete_category(&self, principal: &Principal, id: NodeId) -> DomainResult<()> {
        self.authorize(principal, "category", "delete")?;
        self.categories.delete(id)
    }

    pub fn bulk_delete_categories(
        &self,
        principal: &Principal,
        ids: &[NodeId],
    ) -> DomainResult<Vec<NodeId>> {
        self.authorize(principal, "category", "delete")?;
        self.categories.bulk_delete(ids)
    }

    pub fn repair_categories(&self, principal: &Principal) -> DomainResult<RepairReport> {
        self.authorize(principal, "category", "update")?;
        self.categories.repair()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Organizations
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_organization(
        &self,
        principal: &Principal,
        data: Organization,
        parent: Option<NodeId>,
    ) -> DomainResult<TreeNode<Organization>> {
        self.authorize(principal, "organization", "create")?;
        self.organizations.create(data, parent)
    }

    pub fn get_organization(
        &self,
        principal: &Principal,
        id: NodeId,
    ) -> DomainResult<TreeNode<Organization>> {
        self.authorize(principal, "organization", "read")?;
        self.organizations.get(id)
    }

    pub fn organization_tree(
        &self,
        principal: &Principal,
        parent: Option<NodeId>,
        depth: usize,
    ) -> DomainResult<Vec<TreeView<Organization>>> {
        self.authorize(principal, "organization", "list")?;
        self.organizations.tree(parent, depth)
    }

    pub fn update_organization(
        &self,
        principal: &Principal,
        id: NodeId,
        change: NodeUpdate<OrganizationPatch>,
    ) -> DomainResult<TreeNode<Organization>> {
        self.authorize(principal, "organization", "update")?;
        self.organizations.update(id, change)
    }

    pub fn confirm_organization(
        &self,
        principal: &Principal,
        id: NodeId,
        status: ConfirmStatus,
    ) -> DomainResult<TreeNode<Organization>> {
        self.authorize(principal, "organization", "confirm")?;
        self.organizations.confirm(id, status)
    }

    pub fn delete_organization(&self, principal: &Principal, id: NodeId) -> DomainResult<()> {
        self.authorize(principal, "organization", "delete")?;
        self.organizations.delete(id)
    }

    pub fn bulk_delete_organizations(
        &self,
        principal: &Principal,
        ids: &[NodeId],
    ) -> DomainResult<Vec<NodeId>> {
        self.authorize(principal, "organization", "delete")?;
        self.organizations.bulk_delete(ids)
    }

    pub fn repair_organizations(&self, principal: &Principal) -> DomainResult<RepairReport> {
        self.authorize(principal, "organization", "update")?;
        self.organizations.repair()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roles & entities
    // ─────────────────────────────────────────────────────────────────────────

    pub fn create_role(&self, principal: &Principal, new: NewRole) -> DomainResult<Role> {
        self.authorize(principal, "role", "create")?;
        self.roles.create_role(new)
    }

    pub fn get_role(&self, principal: &Principal, name: &RoleName) -> DomainResult<Role> {
        self.authorize(principal, "role", "read")?;
        self.roles.get_role(name)
    }

    pub fn list_roles(&self, principal: &Principal) -> DomainResult<Vec<Role>> {
        self.authorize(principal, "role", "list")?;
        self.roles.list_roles()
    }

    pub fn update_role(
        &self,
        principal: &Principal,
        name: &RoleName,
        patch: RolePatch,
    ) -> DomainResult<Role> {
        self.authorize(principal, "role", "update")?;
        self.roles.update_role(name, patch)
    }

    pub fn delete_role(&self, principal: &Principal, name: &RoleName) -> DomainResult<bool> {
        self.authorize(principal, "role", "delete")?;
        self.roles.soft_delete_role(name)
    }

    pub fn bulk_delete_roles(
        &self,
        principal: &Principal,
        names: &[RoleName],
    ) -> DomainResult<Vec<RoleName>> {
        self.authorize(principal, "role", "delete")?;
        self.roles.bulk_delete_roles(names)
    }

    pub fn list_entities(&self, principal: &Principal) -> DomainResult<Vec<EntityDescriptor>> {
        self.authorize(principal, "entity", "list")?;
        let registry = self.roles.registry();
        registry
            .list_entity_codes()?
            .iter()
            .map(|code| registry.get_entity(code))
            .collect()
    }
}
