//! `emporium-hierarchy`: self-referential trees of categories and organizations.
//!
//! Every node carries its parent pointer and the materialized chain of
//! ancestor ids (root-ward first). [`Hierarchy`] keeps that chain consistent
//! across create, reparent and delete, for any node kind implementing
//! [`NodeData`].

pub mod category;
pub mod memory;
pub mod node;
pub mod organization;
pub mod store;
pub mod tree;

pub use category::{Category, CategoryPatch};
pub use node::{NodeData, TreeNode};
pub use organization::{ConfirmStatus, Organization, OrganizationCategory, OrganizationPatch};
pub use store::{CommitOutcome, DependentLookup, NoDependents, NodeDependent, NodeWrite, TreeStore};
pub use tree::{Hierarchy, NodeUpdate, ParentChange, RepairReport, TreeView};
