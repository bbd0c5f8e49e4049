//! In-memory adapters for tests/dev. Not optimized for performance.

use std::collections::HashSet;
use std::sync::RwLock;

use emporium_core::{
    DependentRef, LiveTable, NodeId, RecordId, StoreError, StoreResult, Visibility,
};

use crate::node::TreeNode;
use crate::store::{CommitOutcome, DependentLookup, NodeDependent, NodeWrite, TreeStore};

#[derive(Debug)]
pub struct InMemoryTreeStore<D> {
    table: LiveTable<NodeId, TreeNode<D>>,
}

impl<D> InMemoryTreeStore<D> {
    pub fn new() -> Self {
        Self {
            table: LiveTable::new(),
        }
    }
}

impl<D> Default for InMemoryTreeStore<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> TreeStore<D> for InMemoryTreeStore<D>
where
    D: Clone + Send + Sync,
{
    fn get(&self, id: NodeId) -> StoreResult<Option<TreeNode<D>>> {
        self.table.read(|rows| rows.get(&id, Visibility::Live).cloned())
    }

    fn list(&self) -> StoreResult<Vec<TreeNode<D>>> {
        self.table
            .read(|rows| rows.iter(Visibility::Live).cloned().collect())
    }

    fn insert(&self, mut node: TreeNode<D>) -> StoreResult<TreeNode<D>> {
        node.version = 1;
        let id = node.id;
        let stored = node.clone();
        self.table.write(|rows| {
            if rows.get(&id, Visibility::Live).is_some() {
                return Err(StoreError::Duplicate(format!("node {id}")));
            }
            if let Some(parent_id) = node.parent {
                let parent = rows.get_mut(&parent_id).ok_or_else(|| {
                    StoreError::Conflict(format!("parent {parent_id} of node {id} is gone"))
                })?;
                parent.version += 1;
            }
            rows.insert(id, node);
            Ok(())
        })??;
        Ok(stored)
    }

    fn commit(&self, writes: Vec<NodeWrite<D>>) -> StoreResult<CommitOutcome<D>> {
        self.table.write(|rows| {
            for write in &writes {
                let actual = rows.get(&write.node.id, Visibility::Live).map(|n| n.version);
                if !actual.is_some_and(|v| write.expected.matches(v)) {
                    return CommitOutcome::Stale {
                        id: write.node.id,
                        expected: write.expected,
                        actual,
                    };
                }
            }

            let mut committed = Vec::with_capacity(writes.len());
            for write in writes {
                if let Some(slot) = rows.get_mut(&write.node.id) {
                    let mut node = write.node;
                    node.version = slot.version + 1;
                    *slot = node.clone();
                    committed.push(node);
                }
            }
            CommitOutcome::Committed(committed)
        })
    }

    fn soft_delete(&self, ids: &[NodeId]) -> StoreResult<Vec<NodeId>> {
        self.table.write(|rows| {
            ids.iter()
                .copied()
                .filter(|id| {
                    let has_children = rows
                        .iter(Visibility::Live)
                        .any(|n| n.parent == Some(*id));
                    !has_children && rows.soft_delete(id)
                })
                .collect()
        })
    }

    fn find_children(&self, parents: &[NodeId]) -> StoreResult<Vec<TreeNode<D>>> {
        self.table.read(|rows| {
            rows.iter(Visibility::Live)
                .filter(|n| n.parent.is_some_and(|p| parents.contains(&p)))
                .cloned()
                .collect()
        })
    }

    fn find_descendants(&self, id: NodeId) -> StoreResult<Vec<TreeNode<D>>> {
        self.table.read(|rows| {
            rows.iter(Visibility::Live)
                .filter(|n| n.ancestors.contains(&id))
                .cloned()
                .collect()
        })
    }
}

#[derive(Debug, Clone)]
struct Link {
    record: DependentRef,
    nodes: HashSet<NodeId>,
}

/// Leaf records and the nodes each is filed under (e.g. a product's
/// `category_ids`).
#[derive(Debug, Default)]
pub struct InMemoryDependentIndex {
    inner: RwLock<Vec<Link>>,
}

impl InMemoryDependentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// File `record` under `nodes`, replacing any previous filing.
    pub fn link(
        &self,
        record: DependentRef,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> StoreResult<()> {
        let mut links = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("dependent index lock poisoned".to_string()))?;
        links.retain(|l| l.record.id != record.id);
        links.push(Link {
            record,
            nodes: nodes.into_iter().collect(),
        });
        Ok(())
    }

    /// Remove a record from the index. Returns `false` if it was not filed.
    pub fn unlink(&self, record: RecordId) -> StoreResult<bool> {
        let mut links = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("dependent index lock poisoned".to_string()))?;
        let before = links.len();
        links.retain(|l| l.record.id != record);
        Ok(links.len() != before)
    }
}

impl DependentLookup for InMemoryDependentIndex {
    fn find_dependents(&self, nodes: &[NodeId]) -> StoreResult<Vec<NodeDependent>> {
        let links = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("dependent index lock poisoned".to_string()))?;
        Ok(nodes
            .iter()
            .flat_map(|node| {
                links
                    .iter()
                    .filter(move |l| l.nodes.contains(node))
                    .map(move |l| NodeDependent {
                        node: *node,
                        dependent: l.record.clone(),
                    })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emporium_core::ExpectedVersion;

    fn node(title: &'static str) -> TreeNode<&'static str> {
        TreeNode::new(title, None, vec![])
    }

    #[test]
    fn commit_is_all_or_nothing() {
        let store = InMemoryTreeStore::new();
        let a = store.insert(node("a")).unwrap();
        let b = store.insert(node("b")).unwrap();

        let mut a2 = a.clone();
        a2.data = "a2";
        let mut b2 = b.clone();
        b2.data = "b2";
        let outcome = store
            .commit(vec![
                NodeWrite::exact(a2.clone()),
                NodeWrite {
                    node: b2,
                    expected: ExpectedVersion::Exact(7),
                },
            ])
            .unwrap();

        assert_eq!(
            outcome,
            CommitOutcome::Stale {
                id: b.id,
                expected: ExpectedVersion::Exact(7),
                actual: Some(1),
            }
        );
        assert_eq!(store.get(a.id).unwrap().unwrap().data, "a");

        let outcome = store.commit(vec![NodeWrite::exact(a2)]).unwrap();
        let CommitOutcome::Committed(nodes) = outcome else {
            panic!("expected commit");
        };
        assert_eq!(nodes[0].version, 2);
        assert_eq!(store.get(a.id).unwrap().unwrap().data, "a2");
    }

    #[test]
    fn deleted_nodes_drop_out_of_queries() {
        let store = InMemoryTreeStore::new();
        let root = store.insert(node("root")).unwrap();
        let child = store
            .insert(TreeNode::new("child", Some(root.id), vec![root.id]))
            .unwrap();

        assert_eq!(store.find_children(&[root.id]).unwrap().len(), 1);
        assert_eq!(store.soft_delete(&[child.id, child.id]).unwrap(), vec![child.id]);
        assert!(store.find_children(&[root.id]).unwrap().is_empty());
        assert!(store.find_descendants(root.id).unwrap().is_empty());
        assert!(store.get(child.id).unwrap().is_none());
    }

    #[test]
    fn inserting_a_child_bumps_the_parent_version() {
        let store = InMemoryTreeStore::new();
        let root = store.insert(node("root")).unwrap();
        assert_eq!(root.version, 1);

        store
            .insert(TreeNode::new("child", Some(root.id), vec![root.id]))
            .unwrap();
        assert_eq!(store.get(root.id).unwrap().unwrap().version, 2);

        // A batch planned before the child existed no longer applies.
        let outcome = store.commit(vec![NodeWrite::exact(root.clone())]).unwrap();
        assert!(matches!(outcome, CommitOutcome::Stale { actual: Some(2), .. }));
    }

    #[test]
    fn insert_under_deleted_parent_conflicts() {
        let store = InMemoryTreeStore::new();
        let root = store.insert(node("root")).unwrap();
        store.soft_delete(&[root.id]).unwrap();

        let err = store
            .insert(TreeNode::new("late", Some(root.id), vec![root.id]))
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn soft_delete_skips_nodes_with_live_children() {
        let store = InMemoryTreeStore::new();
        let root = store.insert(node("root")).unwrap();
        let child = store
            .insert(TreeNode::new("child", Some(root.id), vec![root.id]))
            .unwrap();

        assert!(store.soft_delete(&[root.id]).unwrap().is_empty());
        assert!(store.get(root.id).unwrap().is_some());

        assert_eq!(
            store.soft_delete(&[child.id, root.id]).unwrap(),
            vec![child.id, root.id]
        );
    }

    #[test]
    fn dependent_index_reports_each_node_record_pair() {
        let index = InMemoryDependentIndex::new();
        let (x, y) = (NodeId::new(), NodeId::new());
        let tea = DependentRef {
            id: RecordId::new(),
            kind: "product".into(),
            title: "Green tea".into(),
        };
        index.link(tea.clone(), [x, y]).unwrap();

        let found = index.find_dependents(&[x, y, NodeId::new()]).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].node, x);

        assert!(index.unlink(tea.id).unwrap());
        assert!(index.find_dependents(&[x]).unwrap().is_empty());
    }
}
