//! Integration tests for the full admin flow.
//!
//! Tests: Principal → AuthorizationGate → domain operation → store
//!
//! Verifies:
//! - Every operation is gated by its declared scope
//! - Role changes take effect on the next check
//! - Tree and role deletions report partial results

#[cfg(test)]
mod tests {
    use emporium_auth::{
        DefaultRoleName, MergePolicy, NewRole, PermissionGrant, Principal, RoleName, RolePatch,
        Scope, UserRecord,
    };
    use emporium_core::{DependentRef, DomainError, RecordId};
    use emporium_hierarchy::{
        Category, ConfirmStatus, NodeUpdate, Organization, OrganizationCategory, ParentChange,
    };

    use crate::config::Settings;
    use crate::services::AdminServices;

    fn setup() -> (AdminServices, Principal) {
        setup_with(Settings::default())
    }

    fn setup_with(settings: Settings) -> (AdminServices, Principal) {
        let services = AdminServices::in_memory(&settings).unwrap();
        let admin = services
            .register_user(UserRecord::new("root").with_role(DefaultRoleName::SuperAdmin))
            .unwrap();
        (services, admin)
    }

    fn user_with(services: &AdminServices, roles: &[&'static str]) -> Principal {
        let user = roles
            .iter()
            .fold(UserRecord::new("user"), |u, r| u.with_role(*r));
        services.register_user(user).unwrap()
    }

    fn new_role(name: &'static str, grants: Vec<PermissionGrant>) -> NewRole {
        NewRole {
            name: name.into(),
            permissions: grants,
            priority: None,
        }
    }

    #[test]
    fn admin_reparents_subtree_and_cascade_is_visible() {
        let (services, admin) = setup();
        let a = services.create_category(&admin, Category::new("A"), None).unwrap();
        let b = services.create_category(&admin, Category::new("B"), Some(a.id)).unwrap();
        let c = services.create_category(&admin, Category::new("C"), Some(b.id)).unwrap();
        let d = services.create_category(&admin, Category::new("D"), Some(c.id)).unwrap();
        let x = services.create_category(&admin, Category::new("X"), None).unwrap();

        services
            .update_category(&admin, b.id, NodeUpdate::reparent(ParentChange::MoveTo(x.id)))
            .unwrap();

        let d = services.get_category(&admin, d.id).unwrap();
        assert_eq!(d.ancestors, vec![x.id, b.id, c.id]);
        assert_eq!(
            services.resolve_category_path(&admin, "x > b > c > d").unwrap(),
            vec![x.id, b.id, c.id, d.id]
        );
        let tree = services.category_tree(&admin, None, 10).unwrap();
        assert_eq!(tree.len(), 2);
        assert!(tree[0].children.is_empty());
    }

    #[test]
    fn principal_without_scope_is_denied_and_nothing_changes() {
        let (services, admin) = setup();
        let root = services.create_category(&admin, Category::new("Root"), None).unwrap();
        let reader = user_with(&services, &[]);

        let err = services
            .create_category(&reader, Category::new("Sneaky"), Some(root.id))
            .unwrap_err();
        assert_eq!(err, DomainError::permission_denied("category", "create"));
        assert_eq!(err.to_body().http_status, 403);
        assert!(services.category_tree(&admin, Some(root.id), 1).unwrap().is_empty());
    }

    #[test]
    fn custom_role_grants_then_disabling_revokes() {
        let (services, admin) = setup();
        services
            .create_role(
                &admin,
                new_role("catalog", vec![PermissionGrant::new("category", ["create", "read"])]),
            )
            .unwrap();
        let editor = user_with(&services, &["catalog"]);

        let tea = services.create_category(&editor, Category::new("Tea"), None).unwrap();
        assert_eq!(services.get_category(&editor, tea.id).unwrap().data.title, "Tea");

        services
            .update_role(
                &admin,
                &"catalog".into(),
                RolePatch {
                    enabled: Some(false),
                    ..RolePatch::default()
                },
            )
            .unwrap();
        assert!(matches!(
            services.get_category(&editor, tea.id),
            Err(DomainError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn role_with_unknown_rule_is_rejected() {
        let (services, admin) = setup();
        let err = services
            .create_role(&admin, new_role("flyer", vec![PermissionGrant::new("category", ["fly"])]))
            .unwrap_err();

        let body = err.to_body();
        assert_eq!((body.kind, body.http_status), ("ValidationError", 422));
        assert_eq!(body.detail, vec!["fly".to_string()]);
    }

    #[test]
    fn bulk_role_delete_keeps_assigned_roles() {
        let (services, admin) = setup();
        services.create_role(&admin, new_role("vendor", vec![])).unwrap();
        services.create_role(&admin, new_role("unused_role", vec![])).unwrap();
        let vendor = user_with(&services, &["vendor"]);

        let err = services
            .bulk_delete_roles(&admin, &["vendor".into(), "unused_role".into()])
            .unwrap_err();
        match err {
            DomainError::RolesHaveUser {
                deleted,
                blocked,
                users,
            } => {
                assert_eq!(deleted, vec!["unused_role".to_string()]);
                assert_eq!(blocked, vec!["vendor".to_string()]);
                assert_eq!(users, vec![vendor.id]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let names: Vec<RoleName> = services
            .list_roles(&admin)
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert!(names.contains(&"vendor".into()));
        assert!(!names.contains(&"unused_role".into()));
    }

    #[test]
    fn category_with_products_cannot_be_deleted() {
        let (services, admin) = setup();
        let tea = services.create_category(&admin, Category::new("Tea"), None).unwrap();
        let mugs = services.create_category(&admin, Category::new("Mugs"), None).unwrap();
        let empty = services.create_category(&admin, Category::new("Empty"), None).unwrap();
        services
            .products()
            .link(
                DependentRef {
                    id: RecordId::new(),
                    kind: "product".into(),
                    title: "Sencha".into(),
                },
                [tea.id],
            )
            .unwrap();

        let err = services.delete_category(&admin, tea.id).unwrap_err();
        assert_eq!(err.kind(), "HasDependents");
        assert_eq!(err.detail().len(), 1);
        assert!(err.detail()[0].contains("Sencha"));

        let err = services
            .bulk_delete_categories(&admin, &[tea.id, mugs.id, empty.id])
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::BulkDeleteBlocked {
                deleted: vec![mugs.id, empty.id],
                has_children: vec![],
                has_dependents: vec![tea.id],
            }
        );
    }

    #[test]
    fn last_wins_policy_is_order_dependent_end_to_end() {
        let (services, admin) = setup_with(Settings {
            permission_merge: MergePolicy::LastWins,
            ..Settings::default()
        });
        services
            .create_role(&admin, new_role("reader", vec![PermissionGrant::new("report", ["read"])]))
            .unwrap();
        services
            .create_role(&admin, new_role("lister", vec![PermissionGrant::new("report", ["list"])]))
            .unwrap();

        let a = user_with(&services, &["reader", "lister"]);
        let b = user_with(&services, &["lister", "reader"]);
        let read = Scope::new("report", "read");

        assert!(!services.explain(&a, Some(&read)).unwrap().granted);
        assert!(services.explain(&b, Some(&read)).unwrap().granted);
    }

    #[test]
    fn organizations_need_confirm_scope() {
        let (services, admin) = setup();
        let org = services
            .create_organization(
                &admin,
                Organization::new("Ministry", "M-1")
                    .with_category(OrganizationCategory::Government),
                None,
            )
            .unwrap();
        services
            .create_role(
                &admin,
                new_role(
                    "org_editor",
                    vec![PermissionGrant::new("organization", ["update", "read"])],
                ),
            )
            .unwrap();
        let editor = user_with(&services, &["org_editor"]);

        assert!(matches!(
            services.confirm_organization(&editor, org.id, ConfirmStatus::Confirmed),
            Err(DomainError::PermissionDenied { .. })
        ));
        let confirmed = services
            .confirm_organization(&admin, org.id, ConfirmStatus::Confirmed)
            .unwrap();
        assert_eq!(confirmed.data.confirm_status, ConfirmStatus::Confirmed);
        assert_eq!(
            services.get_organization(&editor, org.id).unwrap().data.confirm_status,
            ConfirmStatus::Confirmed
        );
    }

    #[test]
    fn entity_catalogue_is_gated_and_seeded() {
        let (services, admin) = setup();
        let entities = services.list_entities(&admin).unwrap();
        assert!(entities.iter().any(|e| e.code_name.as_str() == "organization"));

        let nobody = user_with(&services, &[]);
        assert!(services.list_entities(&nobody).is_err());
    }

    #[test]
    fn unseeded_services_deny_everything() {
        let (services, admin) = setup_with(Settings {
            seed_defaults: false,
            ..Settings::default()
        });
        assert!(matches!(
            services.list_roles(&admin),
            Err(DomainError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn disabled_user_has_no_principal() {
        let (services, _) = setup();
        let mut user = UserRecord::new("gone").with_role(DefaultRoleName::Admin);
        user.lifecycle.enabled = false;
        let id = user.id;
        services.register_user(user).unwrap();

        assert!(matches!(
            services.principal_for(id),
            Err(DomainError::NotFound { kind: "user", .. })
        ));
    }
}
