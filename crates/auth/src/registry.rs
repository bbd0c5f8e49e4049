//! Entity registry: resource kinds and the rules (verbs) each supports.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use emporium_core::{DomainError, DomainResult, Lifecycle, SoftDelete};

use crate::roles::PermissionGrant;
use crate::store::EntityStore;

string_newtype!(
    /// Code name of a resource kind (e.g. `"category"`).
    EntityCode
);

string_newtype!(
    /// A verb on an entity (e.g. `"list"`, `"update"`, `"confirm"`).
    Rule
);

/// Reference record describing a resource kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub code_name: EntityCode,
    pub rules: BTreeSet<Rule>,
    pub description: Option<String>,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl EntityDescriptor {
    pub fn new<I, R>(code_name: impl Into<EntityCode>, rules: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Rule>,
    {
        Self {
            code_name: code_name.into(),
            rules: rules.into_iter().map(Into::into).collect(),
            description: None,
            lifecycle: Lifecycle::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl SoftDelete for EntityDescriptor {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

/// Reference record describing a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub code_name: Rule,
    pub description: String,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
}

impl SoftDelete for RuleDescriptor {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}

/// Read-mostly lookup over the entity catalogue.
///
/// Disabled or soft-deleted entities are treated as unknown.
#[derive(Debug, Clone)]
pub struct EntityRegistry<S> {
    store: S,
}

impl<S: EntityStore> EntityRegistry<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn get_entity(&self, code: &EntityCode) -> DomainResult<EntityDescriptor> {
        self.store
            .get(code)?
            .filter(|e| e.lifecycle.is_active())
            .ok_or_else(|| DomainError::not_found("entity", code))
    }

    /// Allowed verbs for an entity; `NotFound` if the code is unknown.
    pub fn get_rules(&self, code: &EntityCode) -> DomainResult<BTreeSet<Rule>> {
        Ok(self.get_entity(code)?.rules)
    }

    pub fn list_entity_codes(&self) -> DomainResult<Vec<EntityCode>> {
        Ok(self
            .store
            .list()?
            .into_iter()
            .filter(|e| e.lifecycle.is_active())
            .map(|e| e.code_name)
            .collect())
    }

    /// Check that every grant only uses rules its entity supports.
    ///
    /// Fails on the first offending grant, naming all of its unknown rules.
    pub fn validate_grants(&self, grants: &[PermissionGrant]) -> DomainResult<()> {
        for grant in grants {
            let allowed = self.get_rules(&grant.entity)?;
            let unknown: Vec<String> = grant
                .rules
                .difference(&allowed)
                .map(|r| r.to_string())
                .collect();
            if !unknown.is_empty() {
                return Err(DomainError::UnknownRules {
                    entity: grant.entity.to_string(),
                    rules: unknown,
                });
            }
        }
        Ok(())
    }
}
