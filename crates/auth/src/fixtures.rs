//! Default reference data: the entity catalogue, rule descriptors and the
//! built-in administrator roles.

use serde::Serialize;

use emporium_core::{DomainResult, Lifecycle};

use crate::registry::{EntityDescriptor, Rule, RuleDescriptor};
use crate::roles::{DefaultRoleName, PermissionGrant, Role};
use crate::store::{EntityStore, RoleStore};

const CRUD_MENU: &[&str] = &["list", "create", "read", "update", "delete", "menu"];

const CATALOGUE: &[(&str, &[&str], &str)] = &[
    ("entity", CRUD_MENU, "Resource kinds known to the permission system"),
    ("config", CRUD_MENU, "Admin settings"),
    ("file", CRUD_MENU, "Uploaded files"),
    ("role", CRUD_MENU, "Roles and their grants"),
    ("log", CRUD_MENU, "Audit logs"),
    ("rule", &["list", "read", "menu"], "Verbs known to the permission system"),
    (
        "user",
        &[
            "list",
            "create",
            "read",
            "update",
            "confirm",
            "delete",
            "export-csv",
            "menu",
            "activation",
            "blocking",
            "change_password",
        ],
        "User accounts",
    ),
    ("dashboard", CRUD_MENU, "Dashboard widgets"),
    ("city", CRUD_MENU, "Cities"),
    ("state", CRUD_MENU, "States"),
    (
        "organization",
        &["list", "create", "read", "update", "delete", "menu", "confirm"],
        "Organizations",
    ),
    ("profile", &["update"], "The caller's own profile"),
    (
        "product",
        &["list", "create", "read", "update", "delete", "menu", "confirm"],
        "Products",
    ),
    ("category", CRUD_MENU, "Product categories"),
    ("report", CRUD_MENU, "Reports"),
    ("store", CRUD_MENU, "Stores"),
    ("invoice", CRUD_MENU, "Invoices"),
];

const RULES: &[(&str, &str)] = &[
    ("list", "List records"),
    ("create", "Create records"),
    ("read", "Read a single record"),
    ("update", "Update records"),
    ("delete", "Delete records"),
    ("menu", "Show in the admin menu"),
    ("confirm", "Confirm or reject records"),
    ("export-csv", "Export records as CSV"),
    ("activation", "Activate or deactivate accounts"),
    ("blocking", "Block or unblock accounts"),
    ("change_password", "Change another user's password"),
];

/// The default entity catalogue.
pub fn default_entities() -> Vec<EntityDescriptor> {
    CATALOGUE
        .iter()
        .map(|(code, rules, description)| {
            EntityDescriptor::new(*code, rules.iter().copied()).with_description(*description)
        })
        .collect()
}

pub fn default_rules() -> Vec<RuleDescriptor> {
    RULES
        .iter()
        .map(|(code, description)| RuleDescriptor {
            code_name: Rule::new(*code),
            description: (*description).to_string(),
            lifecycle: Lifecycle::now(),
        })
        .collect()
}

/// Every rule on every default entity.
pub fn admin_permissions() -> Vec<PermissionGrant> {
    CATALOGUE
        .iter()
        .map(|(code, rules, _)| PermissionGrant::new(*code, rules.iter().copied()))
        .collect()
}

/// `super_admin` and `admin`, both holding [`admin_permissions`].
pub fn default_roles() -> Vec<Role> {
    [DefaultRoleName::SuperAdmin, DefaultRoleName::Admin]
        .into_iter()
        .map(|name| Role::new(name, admin_permissions()))
        .collect()
}

/// Counts of records created by [`seed_defaults`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub entities_created: usize,
    pub roles_created: usize,
}

/// Insert missing default entities and roles. Existing records are left as is,
/// so running it twice is a no-op.
pub fn seed_defaults<E, R>(entities: &E, roles: &R) -> DomainResult<SeedReport>
where
    E: EntityStore,
    R: RoleStore,
{
    let mut report = SeedReport::default();

    for entity in default_entities() {
        if entities.get(&entity.code_name)?.is_none() {
            entities.insert(entity)?;
            report.entities_created += 1;
        }
    }
    for role in default_roles() {
        if roles.get(&role.name)?.is_none() {
            roles.insert(role)?;
            report.roles_created += 1;
        }
    }

    tracing::info!(
        entities = report.entities_created,
        roles = report.roles_created,
        "default fixtures seeded"
    );
    Ok(report)
}
