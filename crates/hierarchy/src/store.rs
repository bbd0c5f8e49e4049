//! Storage seams for tree nodes and the leaf records that hang off them.
//!
//! Implementations only ever return live (not soft-deleted) nodes.

use std::sync::Arc;

use emporium_core::{DependentRef, ExpectedVersion, NodeId, StoreResult};

use crate::node::TreeNode;

/// One node write inside an atomic [`TreeStore::commit`] batch.
#[derive(Debug, Clone)]
pub struct NodeWrite<D> {
    pub node: TreeNode<D>,
    pub expected: ExpectedVersion,
}

impl<D> NodeWrite<D> {
    pub fn exact(node: TreeNode<D>) -> Self {
        let expected = ExpectedVersion::Exact(node.version);
        Self { node, expected }
    }
}

/// Result of a commit: either every write landed, or none did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome<D> {
    /// Written nodes with their new versions, in batch order.
    Committed(Vec<TreeNode<D>>),
    /// A node was missing or at another version; nothing was written.
    Stale {
        id: NodeId,
        expected: ExpectedVersion,
        actual: Option<u64>,
    },
}

/// Per-kind node repository.
pub trait TreeStore<D>: Send + Sync {
    fn get(&self, id: NodeId) -> StoreResult<Option<TreeNode<D>>>;

    /// All live nodes, in insertion order.
    fn list(&self) -> StoreResult<Vec<TreeNode<D>>>;

    /// Insert a new node; `StoreError::Duplicate` if the id is taken.
    ///
    /// The parent, if any, must still be live (`StoreError::Conflict`
    /// otherwise) and its version is bumped in the same write, so a batch
    /// planned against the parent's old child set goes stale.
    fn insert(&self, node: TreeNode<D>) -> StoreResult<TreeNode<D>>;

    /// Apply every write atomically, checking each expected version first.
    fn commit(&self, writes: Vec<NodeWrite<D>>) -> StoreResult<CommitOutcome<D>>;

    /// Soft-delete the given nodes in one write; returns the ids actually
    /// deleted. Nodes that have a live child at write time are skipped.
    fn soft_delete(&self, ids: &[NodeId]) -> StoreResult<Vec<NodeId>>;

    /// Live nodes whose parent is one of `parents`.
    fn find_children(&self, parents: &[NodeId]) -> StoreResult<Vec<TreeNode<D>>>;

    /// Live nodes whose ancestor chain contains `id`.
    fn find_descendants(&self, id: NodeId) -> StoreResult<Vec<TreeNode<D>>>;
}

/// A leaf record filed under a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDependent {
    pub node: NodeId,
    pub dependent: DependentRef,
}

/// Lookup of leaf records (e.g. products) that reference tree nodes.
pub trait DependentLookup: Send + Sync {
    /// Every live dependent referencing any of `nodes`, one entry per
    /// (node, record) pair.
    fn find_dependents(&self, nodes: &[NodeId]) -> StoreResult<Vec<NodeDependent>>;
}

/// For node kinds nothing else references.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDependents;

impl DependentLookup for NoDependents {
    fn find_dependents(&self, _nodes: &[NodeId]) -> StoreResult<Vec<NodeDependent>> {
        Ok(Vec::new())
    }
}

impl<D, S> TreeStore<D> for Arc<S>
where
    S: TreeStore<D> + ?Sized,
{
    fn get(&self, id: NodeId) -> StoreResult<Option<TreeNode<D>>> {
        (**self).get(id)
    }

    fn list(&self) -> StoreResult<Vec<TreeNode<D>>> {
        (**self).list()
    }

    fn insert(&self, node: TreeNode<D>) -> StoreResult<TreeNode<D>> {
        (**self).insert(node)
    }

    fn commit(&self, writes: Vec<NodeWrite<D>>) -> StoreResult<CommitOutcome<D>> {
        (**self).commit(writes)
    }

    fn soft_delete(&self, ids: &[NodeId]) -> StoreResult<Vec<NodeId>> {
        (**self).soft_delete(ids)
    }

    fn find_children(&self, parents: &[NodeId]) -> StoreResult<Vec<TreeNode<D>>> {
        (**self).find_children(parents)
    }

    fn find_descendants(&self, id: NodeId) -> StoreResult<Vec<TreeNode<D>>> {
        (**self).find_descendants(id)
    }
}

impl<S> DependentLookup for Arc<S>
where
    S: DependentLookup + ?Sized,
{
    fn find_dependents(&self, nodes: &[NodeId]) -> StoreResult<Vec<NodeDependent>> {
        (**self).find_dependents(nodes)
    }
}
