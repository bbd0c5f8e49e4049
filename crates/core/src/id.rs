//! Identifiers of tree nodes, users and foreign leaf records.
//!
//! All three wrap a UUIDv7, so ids sort by creation time.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Label used when a malformed id is rejected.
            pub const LABEL: &'static str = $label;

            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
                    DomainError::validation(format!("invalid {} '{s}': {e}", Self::LABEL))
                })
            }
        }
    };
}

define_id!(
    /// A category or organization node.
    NodeId,
    "node id"
);

define_id!(
    /// The user behind a principal.
    UserId,
    "user id"
);

define_id!(
    /// A record owned elsewhere that can pin a node (a product filed under a
    /// category, for instance).
    RecordId,
    "record id"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_what_it_displays() {
        let id = NodeId::new();
        assert_eq!(format!(" {id} ").parse::<NodeId>().unwrap(), id);
    }

    #[test]
    fn malformed_id_is_a_validation_error() {
        let err = "not-a-uuid".parse::<UserId>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(msg) if msg.starts_with("invalid user id")));
    }
}
