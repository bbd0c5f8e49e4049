//! Tree maintenance shared by every node kind.
//!
//! Reparenting rewrites the ancestor chain of the whole subtree. The target
//! and every descendant are committed in one batch guarded by per-node
//! versions, so a concurrent writer makes the update fail instead of leaving
//! a half-cascaded subtree behind.

use std::collections::{HashMap, HashSet, VecDeque};
use std::marker::PhantomData;

use serde::Serialize;

use emporium_core::{DomainError, DomainResult, ExpectedVersion, NodeId, StoreError};

use crate::node::{NodeData, TreeNode};
use crate::store::{CommitOutcome, DependentLookup, NodeWrite, TreeStore};

/// What an update does with the node's parent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParentChange {
    #[default]
    Keep,
    MoveTo(NodeId),
    /// Detach from the current parent; the node becomes a root.
    MakeRoot,
}

/// Input of [`Hierarchy::update`].
#[derive(Debug, Clone)]
pub struct NodeUpdate<P> {
    pub patch: P,
    pub parent: ParentChange,
    pub expected: ExpectedVersion,
}

impl<P: Default> Default for NodeUpdate<P> {
    fn default() -> Self {
        Self {
            patch: P::default(),
            parent: ParentChange::Keep,
            expected: ExpectedVersion::Any,
        }
    }
}

impl<P: Default> NodeUpdate<P> {
    pub fn patch(patch: P) -> Self {
        Self {
            patch,
            ..Self::default()
        }
    }

    pub fn reparent(parent: ParentChange) -> Self {
        Self {
            parent,
            ..Self::default()
        }
    }
}

impl<P> NodeUpdate<P> {
    pub fn with_parent(mut self, parent: ParentChange) -> Self {
        self.parent = parent;
        self
    }

    pub fn expecting(mut self, expected: ExpectedVersion) -> Self {
        self.expected = expected;
        self
    }
}

/// Nested view of a (sub)tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeView<D> {
    #[serde(flatten)]
    pub node: TreeNode<D>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeView<D>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Nodes whose ancestor chain was rewritten.
    pub repaired: Vec<NodeId>,
    /// Nodes not reachable from any root (missing or deleted parent, or a cycle).
    pub orphaned: Vec<NodeId>,
}

/// Tree operations for one node kind.
#[derive(Debug, Clone)]
pub struct Hierarchy<D, S, P> {
    store: S,
    dependents: P,
    _kind: PhantomData<fn() -> D>,
}

impl<D, S, P> Hierarchy<D, S, P>
where
    D: NodeData,
    S: TreeStore<D>,
    P: DependentLookup,
{
    pub fn new(store: S, dependents: P) -> Self {
        Self {
            store,
            dependents,
            _kind: PhantomData,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get(&self, id: NodeId) -> DomainResult<TreeNode<D>> {
        self.store
            .get(id)?
            .ok_or_else(|| DomainError::not_found(D::KIND, id))
    }

    pub fn children(&self, id: NodeId) -> DomainResult<Vec<TreeNode<D>>> {
        self.get(id)?;
        Ok(self.store.find_children(&[id])?)
    }

    /// The whole subtree below `id` (`ancestors contains id`).
    pub fn descendants(&self, id: NodeId) -> DomainResult<Vec<TreeNode<D>>> {
        self.get(id)?;
        Ok(self.store.find_descendants(id)?)
    }

    pub fn create(&self, data: D, parent: Option<NodeId>) -> DomainResult<TreeNode<D>> {
        data.validate()?;

        let ancestors = match parent {
            Some(parent_id) => self
                .store
                .get(parent_id)?
                .ok_or(DomainError::ParentNotFound { parent: parent_id })?
                .chain(),
            None => Vec::new(),
        };

        let node = self
            .store
            .insert(TreeNode::new(data, parent, ancestors))
            .map_err(|err| match (err, parent) {
                (StoreError::Conflict(_), Some(parent)) => DomainError::ParentNotFound { parent },
                (err, _) => err.into(),
            })?;
        tracing::info!(
            kind = D::KIND,
            node = %node.id,
            parent = ?node.parent,
            depth = node.depth(),
            "node created"
        );
        Ok(node)
    }

    /// Apply a patch and/or move the node.
    ///
    /// When the placement changes, every descendant gets its chain rebuilt
    /// in the same atomic commit.
    pub fn update(&self, id: NodeId, change: NodeUpdate<D::Patch>) -> DomainResult<TreeNode<D>> {
        let mut target = self.get(id)?;
        change.expected.check(target.version)?;

        let (parent, ancestors) = self.placement(&target, change.parent)?;
        target.data.apply(change.patch);
        target.data.validate()?;

        let moved = parent != target.parent || ancestors != target.ancestors;
        target.parent = parent;
        target.ancestors = ancestors;

        let mut writes = vec![NodeWrite::exact(target.clone())];
        if moved {
            writes.extend(self.cascade(&target)?);
        }
        let cascaded = writes.len() - 1;

        match self.store.commit(writes)? {
            CommitOutcome::Committed(nodes) => {
                let node = nodes.into_iter().next().ok_or_else(|| {
                    DomainError::UpdateFailed(format!("{} {id}: empty commit", D::KIND))
                })?;
                tracing::info!(
                    kind = D::KIND,
                    node = %id,
                    moved,
                    cascaded,
                    "node updated"
                );
                Ok(node)
            }
            CommitOutcome::Stale {
                id: stale,
                expected,
                actual,
            } => {
                tracing::warn!(
                    kind = D::KIND,
                    node = %id,
                    stale = %stale,
                    "update lost a race, nothing written"
                );
                Err(DomainError::UpdateFailed(format!(
                    "{} {stale} changed concurrently (expected {expected:?}, found {actual:?})",
                    D::KIND
                )))
            }
        }
    }

    /// New `(parent, ancestors)` for `target`, rejecting cycles.
    fn placement(
        &self,
        target: &TreeNode<D>,
        change: ParentChange,
    ) -> DomainResult<(Option<NodeId>, Vec<NodeId>)> {
        match change {
            ParentChange::Keep => Ok((target.parent, target.ancestors.clone())),
            ParentChange::MakeRoot => Ok((None, Vec::new())),
            ParentChange::MoveTo(parent_id) => {
                if parent_id == target.id {
                    return Err(DomainError::RecursiveParent {
                        node: target.id,
                        parent: parent_id,
                    });
                }
                let parent = self
                    .store
                    .get(parent_id)?
                    .ok_or(DomainError::ParentNotFound { parent: parent_id })?;
                if parent.ancestors.contains(&target.id) {
                    return Err(DomainError::RecursiveParent {
                        node: target.id,
                        parent: parent_id,
                    });
                }
                Ok((Some(parent_id), parent.chain()))
            }
        }
    }

    /// Breadth-first over the subtree of `root` (already carrying its new
    /// chain). Each descendant is visited once, parents before children.
    fn cascade(&self, root: &TreeNode<D>) -> DomainResult<Vec<NodeWrite<D>>> {
        let mut chains: HashMap<NodeId, Vec<NodeId>> = HashMap::from([(root.id, root.chain())]);
        let mut visited: HashSet<NodeId> = HashSet::from([root.id]);
        let mut frontier = vec![root.id];
        let mut writes = Vec::new();

        while !frontier.is_empty() {
            let children = self.store.find_children(&frontier)?;
            let mut next = Vec::with_capacity(children.len());
            for mut child in children {
                if !visited.insert(child.id) {
                    continue;
                }
                let Some(chain) = child.parent.and_then(|p| chains.get(&p)).cloned() else {
                    continue;
                };
                child.ancestors = chain;
                chains.insert(child.id, child.chain());
                next.push(child.id);
                writes.push(NodeWrite::exact(child));
            }
            frontier = next;
        }
        Ok(writes)
    }

    /// Soft-delete a node with no children and no dependents.
    pub fn delete(&self, id: NodeId) -> DomainResult<()> {
        self.get(id)?;

        let children = self.store.find_children(&[id])?;
        if !children.is_empty() {
            tracing::warn!(
                kind = D::KIND,
                node = %id,
                children = children.len(),
                "delete blocked by children"
            );
            return Err(DomainError::HasChildren {
                node: id,
                children: children.into_iter().map(|c| c.id).collect(),
            });
        }

        let dependents = self.dependents.find_dependents(&[id])?;
        if !dependents.is_empty() {
            tracing::warn!(
                kind = D::KIND,
                node = %id,
                dependents = dependents.len(),
                "delete blocked by dependents"
            );
            return Err(DomainError::HasDependents {
                node: id,
                dependents: dependents.into_iter().map(|d| d.dependent).collect(),
            });
        }

        if self.store.soft_delete(&[id])?.is_empty() {
            tracing::warn!(kind = D::KIND, node = %id, "delete lost a race, nothing written");
            return Err(DomainError::DeleteFailed(format!(
                "{} {id} changed before it could be deleted",
                D::KIND
            )));
        }
        tracing::info!(kind = D::KIND, node = %id, "node deleted");
        Ok(())
    }

    /// Soft-delete every requested node that has no live child and no
    /// dependent.
    ///
    /// Both dependency sets are read once, before any write. The safe subset
    /// is committed even when other ids are blocked; in that case the result
    /// is `BulkDeleteBlocked` carrying the committed and the blocked ids. A
    /// node that gains a child between the read and the write is skipped by
    /// the store and reported under `has_children`.
    pub fn bulk_delete(&self, ids: &[NodeId]) -> DomainResult<Vec<NodeId>> {
        let mut seen = HashSet::new();
        let requested: Vec<NodeId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let parents: HashSet<NodeId> = self
            .store
            .find_children(&requested)?
            .into_iter()
            .filter_map(|c| c.parent)
            .collect();
        let referenced: HashSet<NodeId> = self
            .dependents
            .find_dependents(&requested)?
            .into_iter()
            .map(|d| d.node)
            .collect();

        let has_dependents: Vec<NodeId> = requested
            .iter()
            .copied()
            .filter(|id| referenced.contains(id))
            .collect();
        let safe: Vec<NodeId> = requested
            .iter()
            .copied()
            .filter(|id| !parents.contains(id) && !referenced.contains(id))
            .collect();

        let deleted = self.store.soft_delete(&safe)?;

        // Safe ids the store refused gained a child after the read above.
        let lost: Vec<NodeId> = safe.iter().copied().filter(|id| !deleted.contains(id)).collect();
        let late_parents: HashSet<NodeId> = if lost.is_empty() {
            HashSet::new()
        } else {
            self.store
                .find_children(&lost)?
                .into_iter()
                .filter_map(|c| c.parent)
                .collect()
        };
        let has_children: Vec<NodeId> = requested
            .iter()
            .copied()
            .filter(|id| parents.contains(id) || late_parents.contains(id))
            .collect();
        tracing::info!(
            kind = D::KIND,
            requested = requested.len(),
            deleted = deleted.len(),
            "bulk delete"
        );

        if has_children.is_empty() && has_dependents.is_empty() {
            return Ok(deleted);
        }
        tracing::warn!(
            kind = D::KIND,
            has_children = has_children.len(),
            has_dependents = has_dependents.len(),
            "bulk delete partially blocked"
        );
        Err(DomainError::BulkDeleteBlocked {
            deleted,
            has_children,
            has_dependents,
        })
    }

    /// Enabled nodes below `parent` (or the roots), nested `depth` levels
    /// deep. `depth == 0` returns the top level only.
    pub fn tree(&self, parent: Option<NodeId>, depth: usize) -> DomainResult<Vec<TreeView<D>>> {
        let nodes = match parent {
            Some(id) => self.descendants(id)?,
            None => self.store.list()?,
        };

        let mut by_parent: HashMap<Option<NodeId>, Vec<TreeNode<D>>> = HashMap::new();
        for node in nodes.into_iter().filter(|n| n.lifecycle.is_active()) {
            by_parent.entry(node.parent).or_default().push(node);
        }
        Ok(nest(&mut by_parent, parent, depth))
    }

    /// Resolve a title path such as `"Drinks > Tea > Green"` to node ids.
    ///
    /// Titles match case-insensitively. Each step must sit exactly under the
    /// chain resolved so far, starting from a root.
    pub fn resolve_path(&self, path: &str, separator: char) -> DomainResult<Vec<NodeId>> {
        let segments: Vec<&str> = path
            .split(separator)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if segments.is_empty() {
            return Err(DomainError::validation(format!("empty {} path", D::KIND)));
        }

        let nodes = self.store.list()?;
        let mut chain: Vec<NodeId> = Vec::with_capacity(segments.len());
        for segment in segments {
            let wanted = segment.to_lowercase();
            let found = nodes
                .iter()
                .find(|n| n.ancestors == chain && n.data.title().to_lowercase() == wanted)
                .ok_or_else(|| DomainError::not_found(D::KIND, segment))?;
            chain.push(found.id);
        }
        Ok(chain)
    }

    /// Recompute every live node's ancestor chain from parent pointers.
    ///
    /// Nodes that cannot be reached from a root are reported, not modified.
    pub fn repair(&self) -> DomainResult<RepairReport> {
        let nodes = self.store.list()?;

        let mut children_of: HashMap<NodeId, Vec<usize>> = HashMap::new();
        let mut queue: VecDeque<(usize, Vec<NodeId>)> = VecDeque::new();
        for (i, node) in nodes.iter().enumerate() {
            match node.parent {
                Some(p) => children_of.entry(p).or_default().push(i),
                None => queue.push_back((i, Vec::new())),
            }
        }

        let mut reached = vec![false; nodes.len()];
        let mut writes = Vec::new();
        while let Some((i, expected)) = queue.pop_front() {
            if std::mem::replace(&mut reached[i], true) {
                continue;
            }
            let node = &nodes[i];
            let mut chain = expected.clone();
            chain.push(node.id);
            for &child in children_of.get(&node.id).into_iter().flatten() {
                queue.push_back((child, chain.clone()));
            }
            if node.ancestors != expected {
                let mut fixed = node.clone();
                fixed.ancestors = expected;
                writes.push(NodeWrite::exact(fixed));
            }
        }

        let orphaned: Vec<NodeId> = nodes
            .iter()
            .zip(&reached)
            .filter(|(_, reached)| !**reached)
            .map(|(n, _)| n.id)
            .collect();
        let repaired: Vec<NodeId> = writes.iter().map(|w| w.node.id).collect();

        if !writes.is_empty() {
            if let CommitOutcome::Stale { id, .. } = self.store.commit(writes)? {
                return Err(DomainError::UpdateFailed(format!(
                    "{} {id} changed during repair",
                    D::KIND
                )));
            }
        }

        if !orphaned.is_empty() {
            tracing::warn!(kind = D::KIND, orphaned = orphaned.len(), "orphaned nodes found");
        }
        tracing::info!(kind = D::KIND, repaired = repaired.len(), "ancestor chains repaired");
        Ok(RepairReport { repaired, orphaned })
    }
}

fn nest<D>(
    by_parent: &mut HashMap<Option<NodeId>, Vec<TreeNode<D>>>,
    parent: Option<NodeId>,
    depth: usize,
) -> Vec<TreeView<D>> {
    let level = by_parent.remove(&parent).unwrap_or_default();
    level
        .into_iter()
        .map(|node| {
            let children = if depth > 0 {
                nest(by_parent, Some(node.id), depth - 1)
            } else {
                Vec::new()
            };
            TreeView { node, children }
        })
        .collect()
}
