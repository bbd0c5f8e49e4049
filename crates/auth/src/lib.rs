//! `emporium-auth`: authorization boundary of the admin backend.
//!
//! Resource kinds ("entities") and their verbs ("rules"), roles bundling
//! `(entity, rules)` grants, permission resolution for a principal, the
//! authorization gate every protected operation goes through, and role
//! lifecycle management.
//!
//! This crate is intentionally decoupled from HTTP and storage: token
//! verification happens upstream, persistence sits behind the traits in
//! [`store`].

macro_rules! string_newtype {
    ($(#[$meta:meta])* $t:ident) => {
        $(#[$meta])*
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $t(std::borrow::Cow<'static, str>);

        impl $t {
            pub fn new(name: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                Self(name.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::borrow::Borrow<str> for $t {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&'static str> for $t {
            fn from(value: &'static str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $t {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

pub mod authorize;
pub mod fixtures;
pub mod memory;
pub mod permissions;
pub mod principal;
pub mod registry;
pub mod role_lifecycle;
pub mod roles;
pub mod store;
pub mod user;

pub use authorize::{AuthorizationExplanation, AuthorizationGate, Scope};
pub use permissions::{MergePolicy, PermissionMap, PermissionResolver};
pub use principal::Principal;
pub use registry::{EntityCode, EntityDescriptor, EntityRegistry, Rule, RuleDescriptor};
pub use role_lifecycle::{NewRole, RoleLifecycleManager, RolePatch};
pub use roles::{DefaultRoleName, PermissionGrant, Role, RoleName};
pub use store::{EntityStore, RoleAssignments, RoleHolder, RoleStore};
pub use user::UserRecord;
