use serde::{Deserialize, Serialize};

use emporium_core::{DomainResult, Lifecycle, NodeId, SoftDelete};

/// Domain payload of a tree node kind (category, organization, ...).
pub trait NodeData: Clone + Send + Sync + 'static {
    /// Kind name used in errors and logs, e.g. `"category"`.
    const KIND: &'static str;

    /// Partial update; every field optional.
    type Patch: Default;

    /// Display title, used for path resolution and dependent reports.
    fn title(&self) -> &str;

    fn apply(&mut self, patch: Self::Patch);

    fn validate(&self) -> DomainResult<()> {
        Ok(())
    }
}

/// A stored tree node.
///
/// Invariant: `ancestors == parent.ancestors + [parent.id]`, or `[]` for roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode<D> {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub ancestors: Vec<NodeId>,
    /// Bumped by the store on every committed write.
    pub version: u64,
    #[serde(flatten)]
    pub lifecycle: Lifecycle,
    #[serde(flatten)]
    pub data: D,
}

impl<D> TreeNode<D> {
    pub fn new(data: D, parent: Option<NodeId>, ancestors: Vec<NodeId>) -> Self {
        Self {
            id: NodeId::new(),
            parent,
            ancestors,
            version: 0,
            lifecycle: Lifecycle::now(),
            data,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Ancestor chain handed down to this node's children.
    pub fn chain(&self) -> Vec<NodeId> {
        let mut chain = self.ancestors.clone();
        chain.push(self.id);
        chain
    }

    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }
}

impl<D> SoftDelete for TreeNode<D> {
    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn lifecycle_mut(&mut self) -> &mut Lifecycle {
        &mut self.lifecycle
    }
}
