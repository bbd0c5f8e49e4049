use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use emporium_core::{Lifecycle, SoftDelete};

use crate::registry::{EntityCode, Rule};

string_newtype!(
    /// Role name; the stable key of a role across updates.
    RoleName
);

/// Well-known role names shipped with the default fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultRoleName {
    SuperAdmin,
    Admin,
    Vendor,
    Customer,
}

impl DefaultRoleName {
    pub const ALL: [DefaultRoleName; 4] = [
        DefaultRoleName::SuperAdmin,
        DefaultRoleName::Admin,
        DefaultRoleName::Vendor,
        DefaultRoleName::Customer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DefaultRoleName::SuperAdmin => "super_admin",
            DefaultRoleName::Admin => "admin",
            DefaultRoleName::Vendor => "vendor",
            DefaultRoleName::Customer => "customer",
        }
    }
}

impl From<DefaultRoleName> for RoleName {
    fn from(value: DefaultRoleName) -> Self {
        RoleName::new(value.as_str())
    }
}

/// A set of rules granted on one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub entity: EntityCode,
    pub rules: BTreeSet<Rule>,
}

impl PermissionGrant {
    pub fn new<I, R>(entity: impl Into<EntityCode>, rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        Self {
            entity: entity.into(),
            rules: rules.into_iter().map(Into::into).collect(),
        }
    }
}

/// Merge grants that name the same entity (union of their rules), keeping the
/// position of each entity's first occurrence.
pub fn merge_grants(grants: Vec<PermissionGrant>) -> Vec<PermissionGrant> {
    let mut merged: Vec<PermissionGrant> = Vec::with_capacity(grants.len());
    for grant in grants {
        match merged.iter_mut().find(|g| g.entity == grant.entity) {
            Some(existing) => existing.rules.extend(grant.rules),
            None => merged.push(grant),
        }
    }
    merged
}

/// Named bundle of permission grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub name: RoleName,
    pub permissions: Vec<PermissionGrant>,
    pub priority: Option<i32>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl Role {
    pub fn new(name: impl Into<RoleName>, permissions: Vec<PermissionGrant>) -> Self {
        Self {
            name: name.into(),
            permissions,
            priority: None,
            lifecycle: Lifecycle::now(),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Whether any grant of this role covers `(entity, rule)`.
    pub fn grants(&self, entity: &str, rule: &str) -> bool {
        self.permissions
            .iter()
            .any(|g| g.entity.as_str() == entity && g.rules.contains(rule))
    }
}

impl SoftDelete for Role {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}
