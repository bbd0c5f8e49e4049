use serde::Serialize;

use emporium_core::{DomainError, DomainResult, UserId};

use crate::permissions::{PermissionMap, PermissionResolver};
use crate::principal::Principal;
use crate::registry::{EntityCode, Rule};
use crate::store::RoleStore;

/// Required `(entity, rule)` pair declared by a protected operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Scope {
    pub entity: EntityCode,
    pub rule: Rule,
}

impl Scope {
    pub fn new(entity: impl Into<EntityCode>, rule: impl Into<Rule>) -> Self {
        Self {
            entity: entity.into(),
            rule: rule.into(),
        }
    }
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}", self.entity, self.rule)
    }
}

/// Enforcement point for every protected operation.
///
/// - No mutation of the principal
/// - No IO beyond the role reads done by the resolver
#[derive(Debug, Clone)]
pub struct AuthorizationGate<R> {
    resolver: PermissionResolver<R>,
}

impl<R: RoleStore> AuthorizationGate<R> {
    pub fn new(resolver: PermissionResolver<R>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &PermissionResolver<R> {
        &self.resolver
    }

    /// Pass `principal` through if it holds `scope`.
    ///
    /// `None` means the operation only requires an authenticated principal.
    pub fn check<'p>(
        &self,
        principal: &'p Principal,
        scope: Option<&Scope>,
    ) -> DomainResult<&'p Principal> {
        let Some(scope) = scope else {
            return Ok(principal);
        };

        if self
            .resolver
            .is_allowed(principal, scope.entity.as_str(), scope.rule.as_str())?
        {
            Ok(principal)
        } else {
            tracing::warn!(
                principal = %principal.id,
                entity = %scope.entity,
                rule = %scope.rule,
                "permission denied"
            );
            Err(DomainError::permission_denied(
                scope.entity.as_str(),
                scope.rule.as_str(),
            ))
        }
    }

    /// Explain why `check` would pass or fail for `principal` and `scope`.
    pub fn explain(
        &self,
        principal: &Principal,
        scope: Option<&Scope>,
    ) -> DomainResult<AuthorizationExplanation> {
        let effective = self.resolver.resolve(principal)?;
        let state = PrincipalState::new(principal, &effective);

        let Some(scope) = scope else {
            return Ok(AuthorizationExplanation {
                required_scope: None,
                granted: true,
                reason: "Operation only requires an authenticated principal".to_string(),
                principal: state,
                denial_reason: None,
            });
        };

        let required = scope.to_string();
        let entity = scope.entity.as_str();
        let rule = scope.rule.as_str();

        if effective.allows(entity, rule) {
            let direct =
                PermissionMap::from_grants(&principal.permissions, self.resolver.policy());
            let reason = if direct.allows(entity, rule) {
                format!("Principal has direct grant '{required}'")
            } else {
                format!("Principal holds a role granting '{required}'")
            };
            return Ok(AuthorizationExplanation {
                required_scope: Some(required),
                granted: true,
                reason,
                principal: state,
                denial_reason: None,
            });
        }

        // Roles that would grant this scope if assigned.
        let granting_roles: Vec<String> = self
            .resolver
            .roles()
            .list()?
            .into_iter()
            .filter(|r| r.lifecycle.is_active() && r.grants(entity, rule))
            .map(|r| r.name.to_string())
            .collect();

        let mut suggestions = vec![
            format!("Grant '{rule}' on '{entity}' directly to the principal"),
        ];
        if !granting_roles.is_empty() {
            suggestions.insert(
                0,
                format!("Assign one of the roles granting this scope: {granting_roles:?}"),
            );
        }

        Ok(AuthorizationExplanation {
            reason: format!(
                "Principal does not hold '{required}'. Current permissions: {:?}",
                state.effective_permissions
            ),
            required_scope: Some(required.clone()),
            granted: false,
            principal: state,
            denial_reason: Some(DenialReason {
                message: format!("Missing required scope: '{required}'"),
                granting_roles,
                suggestions,
            }),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Detailed explanation of an authorization decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    /// `"entity.rule"`, or `None` for authentication-only operations.
    pub required_scope: Option<String>,
    pub granted: bool,
    pub reason: String,
    pub principal: PrincipalState,
    pub denial_reason: Option<DenialReason>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub principal_id: UserId,
    pub roles: Vec<String>,
    pub effective_permissions: Vec<String>,
}

impl PrincipalState {
    fn new(principal: &Principal, effective: &PermissionMap) -> Self {
        Self {
            principal_id: principal.id,
            roles: principal.roles.iter().map(|r| r.to_string()).collect(),
            effective_permissions: effective.flatten(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub message: String,
    pub granting_roles: Vec<String>,
    pub suggestions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRoleStore;
    use crate::permissions::MergePolicy;
    use crate::roles::{PermissionGrant, Role};

    fn gate() -> AuthorizationGate<InMemoryRoleStore> {
        let store = InMemoryRoleStore::new();
        store
            .insert(Role::new(
                "editor",
                vec![PermissionGrant::new("category", ["list", "read", "update"])],
            ))
            .unwrap();
        store
            .insert(Role::new(
                "remover",
                vec![PermissionGrant::new("category", ["delete"])],
            ))
            .unwrap();
        AuthorizationGate::new(PermissionResolver::new(store, MergePolicy::Union))
    }

    #[test]
    fn unscoped_check_passes_any_principal() {
        let p = Principal::new(UserId::new());
        let passed = gate().check(&p, None).unwrap();
        assert_eq!(passed, &p);
    }

    #[test]
    fn check_returns_principal_unchanged_when_allowed() {
        let p = Principal::new(UserId::new()).with_role("editor");
        let scope = Scope::new("category", "update");
        let passed = gate().check(&p, Some(&scope)).unwrap();
        assert!(std::ptr::eq(passed, &p));
    }

    #[test]
    fn denial_is_permission_denied_403() {
        let p = Principal::new(UserId::new()).with_role("editor");
        let err = gate()
            .check(&p, Some(&Scope::new("category", "delete")))
            .unwrap_err();

        assert_eq!(err, DomainError::permission_denied("category", "delete"));
        let body = err.to_body();
        assert_eq!((body.kind, body.http_status), ("PermissionDenied", 403));
    }

    #[test]
    fn explain_denial_suggests_granting_roles() {
        let p = Principal::new(UserId::new()).with_role("editor");
        let explanation = gate()
            .explain(&p, Some(&Scope::new("category", "delete")))
            .unwrap();

        assert!(!explanation.granted);
        let denial = explanation.denial_reason.unwrap();
        assert_eq!(denial.granting_roles, vec!["remover".to_string()]);
        assert!(denial.suggestions[0].contains("remover"));
        assert!(explanation
            .principal
            .effective_permissions
            .contains(&"category.update".to_string()));
    }

    #[test]
    fn explain_grant_distinguishes_direct_grants() {
        let p = Principal::new(UserId::new()).with_grant(PermissionGrant::new("report", ["read"]));
        let explanation = gate()
            .explain(&p, Some(&Scope::new("report", "read")))
            .unwrap();

        assert!(explanation.granted);
        assert!(explanation.reason.contains("direct grant"));
        assert_eq!(explanation.required_scope.as_deref(), Some("report.read"));
    }
}
