//! Enable / soft-delete lifecycle shared by every stored record.
//!
//! Soft-deleted records stay in storage but are excluded from every query
//! unless the caller explicitly asks for [`Visibility::IncludeDeleted`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle flags carried by roles, entities, rules and tree nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lifecycle {
    pub enabled: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Lifecycle {
    pub fn new(created_at: DateTime<Utc>) -> Self {
        Self {
            enabled: true,
            deleted: false,
            created_at,
        }
    }

    pub fn now() -> Self {
        Self::new(Utc::now())
    }

    /// Enabled and not soft-deleted.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.deleted
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::now()
    }
}

/// Which records a query may see.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Only records that are not soft-deleted.
    #[default]
    Live,
    /// Everything, soft-deleted records included.
    IncludeDeleted,
}

impl Visibility {
    pub fn admits(self, lifecycle: &Lifecycle) -> bool {
        match self {
            Visibility::Live => !lifecycle.deleted,
            Visibility::IncludeDeleted => true,
        }
    }
}

/// Access to a record's lifecycle flags.
pub trait SoftDelete {
    fn lifecycle(&self) -> &Lifecycle;
    fn lifecycle_mut(&mut self) -> &mut Lifecycle;

    fn is_deleted(&self) -> bool {
        self.lifecycle().deleted
    }
}
