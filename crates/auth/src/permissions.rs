//! Effective-permission resolution.
//!
//! A principal's effective permissions are its direct grants merged with the
//! grants of every active role it holds. How two grants for the same entity
//! combine is decided by [`MergePolicy`].

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use emporium_core::{DomainError, DomainResult};

use crate::principal::Principal;
use crate::registry::{EntityCode, Rule};
use crate::roles::PermissionGrant;
use crate::store::RoleStore;

/// How rule sets for the same entity combine across grant sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Rules accumulate; the result does not depend on role order.
    #[default]
    Union,
    /// A later grant replaces the entity's accumulated rule set. Sources are
    /// applied direct grants first, then roles in the principal's order.
    LastWins,
}

impl MergePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            MergePolicy::Union => "union",
            MergePolicy::LastWins => "last_wins",
        }
    }
}

impl core::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MergePolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "union" => Ok(MergePolicy::Union),
            "last_wins" | "last-wins" => Ok(MergePolicy::LastWins),
            other => Err(DomainError::validation(format!(
                "MergePolicy: expected 'union' or 'last_wins', got '{other}'"
            ))),
        }
    }
}

/// Entity -> allowed rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PermissionMap(BTreeMap<EntityCode, BTreeSet<Rule>>);

impl PermissionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_grants<'a>(
        grants: impl IntoIterator<Item = &'a PermissionGrant>,
        policy: MergePolicy,
    ) -> Self {
        let mut map = Self::new();
        for grant in grants {
            map.merge(grant, policy);
        }
        map
    }

    pub fn merge(&mut self, grant: &PermissionGrant, policy: MergePolicy) {
        match policy {
            MergePolicy::Union => {
                self.0
                    .entry(grant.entity.clone())
                    .or_default()
                    .extend(grant.rules.iter().cloned());
            }
            MergePolicy::LastWins => {
                self.0.insert(grant.entity.clone(), grant.rules.clone());
            }
        }
    }

    pub fn allows(&self, entity: &str, rule: &str) -> bool {
        self.0.get(entity).is_some_and(|rules| rules.contains(rule))
    }

    pub fn rules(&self, entity: &str) -> Option<&BTreeSet<Rule>> {
        self.0.get(entity)
    }

    pub fn entities(&self) -> impl Iterator<Item = &EntityCode> {
        self.0.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sorted `"entity.rule"` strings, for display and audit.
    pub fn flatten(&self) -> Vec<String> {
        self.0
            .iter()
            .flat_map(|(entity, rules)| rules.iter().map(move |r| format!("{entity}.{r}")))
            .collect()
    }
}

/// Computes a principal's effective permissions from role storage.
#[derive(Debug, Clone)]
pub struct PermissionResolver<R> {
    roles: R,
    policy: MergePolicy,
}

impl<R: RoleStore> PermissionResolver<R> {
    pub fn new(roles: R, policy: MergePolicy) -> Self {
        Self { roles, policy }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn roles(&self) -> &R {
        &self.roles
    }

    /// Effective permissions of `principal`.
    ///
    /// Unknown, soft-deleted and disabled role names contribute nothing.
    pub fn resolve(&self, principal: &Principal) -> DomainResult<PermissionMap> {
        let mut map = PermissionMap::from_grants(&principal.permissions, self.policy);

        let mut loaded = self.roles.find_by_names(&principal.roles)?;
        loaded.retain(|r| r.lifecycle.is_active());

        for name in &principal.roles {
            if let Some(role) = loaded.iter().find(|r| &r.name == name) {
                for grant in &role.permissions {
                    map.merge(grant, self.policy);
                }
            }
        }

        tracing::debug!(
            principal = %principal.id,
            roles = principal.roles.len(),
            active_roles = loaded.len(),
            entities = map.0.len(),
            policy = %self.policy,
            "resolved permissions"
        );
        Ok(map)
    }

    pub fn is_allowed(
        &self,
        principal: &Principal,
        entity: &str,
        rule: &str,
    ) -> DomainResult<bool> {
        Ok(self.resolve(principal)?.allows(entity, rule))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRoleStore;
    use crate::roles::Role;
    use emporium_core::UserId;
    use proptest::prelude::*;

    fn store_with(roles: Vec<Role>) -> InMemoryRoleStore {
        let store = InMemoryRoleStore::new();
        for role in roles {
            store.insert(role).unwrap();
        }
        store
    }

    fn r1_r2() -> InMemoryRoleStore {
        store_with(vec![
            Role::new("r1", vec![PermissionGrant::new("x", ["read"])]),
            Role::new("r2", vec![PermissionGrant::new("x", ["write"])]),
        ])
    }

    fn principal(roles: &[&'static str]) -> Principal {
        roles
            .iter()
            .fold(Principal::new(UserId::new()), |p, r| p.with_role(*r))
    }

    fn rules_of(map: &PermissionMap, entity: &str) -> Vec<String> {
        map.rules(entity)
            .map(|rs| rs.iter().map(|r| r.to_string()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn union_is_order_independent() {
        let resolver = PermissionResolver::new(r1_r2(), MergePolicy::Union);

        let a = resolver.resolve(&principal(&["r1", "r2"])).unwrap();
        let b = resolver.resolve(&principal(&["r2", "r1"])).unwrap();

        assert_eq!(rules_of(&a, "x"), vec!["read", "write"]);
        assert_eq!(a, b);
    }

    #[test]
    fn last_wins_depends_on_role_order() {
        let resolver = PermissionResolver::new(r1_r2(), MergePolicy::LastWins);

        let a = resolver.resolve(&principal(&["r1", "r2"])).unwrap();
        let b = resolver.resolve(&principal(&["r2", "r1"])).unwrap();

        assert_eq!(rules_of(&a, "x"), vec!["write"]);
        assert_eq!(rules_of(&b, "x"), vec!["read"]);
    }

    #[test]
    fn direct_grants_merge_with_roles() {
        let resolver = PermissionResolver::new(r1_r2(), MergePolicy::Union);
        let p = principal(&["r1"]).with_grant(PermissionGrant::new("report", ["list"]));

        let map = resolver.resolve(&p).unwrap();
        assert!(map.allows("report", "list"));
        assert!(map.allows("x", "read"));
        assert_eq!(map.flatten(), vec!["report.list", "x.read"]);
    }

    #[test]
    fn last_wins_roles_override_direct_grants() {
        let resolver = PermissionResolver::new(r1_r2(), MergePolicy::LastWins);
        let p = principal(&["r2"]).with_grant(PermissionGrant::new("x", ["read"]));

        let map = resolver.resolve(&p).unwrap();
        assert_eq!(rules_of(&map, "x"), vec!["write"]);
    }

    #[test]
    fn unknown_deleted_and_disabled_roles_contribute_nothing() {
        let mut disabled = Role::new("disabled", vec![PermissionGrant::new("x", ["delete"])]);
        disabled.lifecycle.enabled = false;
        let store = store_with(vec![
            Role::new("gone", vec![PermissionGrant::new("x", ["update"])]),
            disabled,
        ]);
        store.soft_delete(&["gone".into()]).unwrap();
        let resolver = PermissionResolver::new(store, MergePolicy::Union);

        let p = principal(&["ghost", "gone", "disabled"]);
        let map = resolver.resolve(&p).unwrap();
        assert!(map.is_empty());
        assert!(!resolver.is_allowed(&p, "x", "delete").unwrap());
    }

    #[test]
    fn merge_policy_parses_from_config_strings() {
        assert_eq!("union".parse::<MergePolicy>().unwrap(), MergePolicy::Union);
        assert_eq!("LAST_WINS".parse::<MergePolicy>().unwrap(), MergePolicy::LastWins);
        assert!("random".parse::<MergePolicy>().is_err());
        assert_eq!(MergePolicy::LastWins.to_string(), "last_wins");
    }

    fn arb_grants() -> impl Strategy<Value = Vec<(u8, Vec<u8>)>> {
        prop::collection::vec((0u8..4, prop::collection::vec(0u8..6, 0..4)), 0..5)
    }

    fn grants_from(raw: &[(u8, Vec<u8>)]) -> Vec<PermissionGrant> {
        raw.iter()
            .map(|(e, rs)| {
                PermissionGrant::new(
                    format!("e{e}"),
                    rs.iter().map(|r| format!("r{r}")).collect::<Vec<_>>(),
                )
            })
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn union_resolution_ignores_role_order(
            roles in prop::collection::vec(arb_grants(), 1..5),
            seed in any::<u64>(),
        ) {
            let store = InMemoryRoleStore::new();
            let mut names: Vec<String> = Vec::new();
            for (i, raw) in roles.iter().enumerate() {
                let name = format!("role{i}");
                store.insert(Role::new(name.clone(), grants_from(raw))).unwrap();
                names.push(name);
            }
            let resolver = PermissionResolver::new(store, MergePolicy::Union);

            let forward = names
                .iter()
                .fold(Principal::new(UserId::new()), |p, n| p.with_role(n.clone()));
            let mut shuffled = names.clone();
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
            shuffled.reverse();
            let backward = shuffled
                .iter()
                .fold(Principal::new(UserId::new()), |p, n| p.with_role(n.clone()));

            prop_assert_eq!(
                resolver.resolve(&forward).unwrap(),
                resolver.resolve(&backward).unwrap()
            );
        }
    }
}
