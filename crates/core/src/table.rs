//! Soft-delete aware in-memory table used by the reference storage adapters.
//!
//! The live/deleted filter is applied here, once, so adapters never repeat it
//! per query. Intended for tests/dev. Not optimized for performance.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::lifecycle::{SoftDelete, Visibility};

#[derive(Debug, Clone)]
struct Row<V> {
    seq: u64,
    value: V,
}

/// Rows of a [`LiveTable`], visible only inside `read`/`write` closures.
#[derive(Debug)]
pub struct Rows<K, V> {
    next_seq: u64,
    map: HashMap<K, Row<V>>,
}

impl<K, V> Rows<K, V>
where
    K: Eq + Hash + Clone,
    V: SoftDelete,
{
    fn new() -> Self {
        Self {
            next_seq: 0,
            map: HashMap::new(),
        }
    }

    pub fn get(&self, key: &K, visibility: Visibility) -> Option<&V> {
        self.map
            .get(key)
            .map(|row| &row.value)
            .filter(|v| visibility.admits(v.lifecycle()))
    }

    /// Mutable access to a live row.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.map
            .get_mut(key)
            .map(|row| &mut row.value)
            .filter(|v| !v.is_deleted())
    }

    /// Rows in insertion order.
    pub fn iter(&self, visibility: Visibility) -> impl Iterator<Item = &V> + '_ {
        let mut rows: Vec<&Row<V>> = self
            .map
            .values()
            .filter(|row| visibility.admits(row.value.lifecycle()))
            .collect();
        rows.sort_by_key(|row| row.seq);
        rows.into_iter().map(|row| &row.value)
    }

    /// Insert a new row. A live row under the same key is a duplicate; a
    /// soft-deleted one is replaced.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        if self.get(&key, Visibility::Live).is_some() {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.map.insert(key, Row { seq, value });
        true
    }

    /// Mark a live row deleted. Returns `false` if there was nothing to delete.
    pub fn soft_delete(&mut self, key: &K) -> bool {
        match self.get_mut(key) {
            Some(value) => {
                value.lifecycle_mut().deleted = true;
                true
            }
            None => false,
        }
    }
}

/// Thread-safe table of soft-deletable records.
#[derive(Debug)]
pub struct LiveTable<K, V> {
    inner: RwLock<Rows<K, V>>,
}

impl<K, V> LiveTable<K, V>
where
    K: Eq + Hash + Clone,
    V: SoftDelete,
{
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Rows::new()),
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&Rows<K, V>) -> R) -> StoreResult<R> {
        let rows = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("table lock poisoned".to_string()))?;
        Ok(f(&rows))
    }

    /// Run `f` under the write lock; everything `f` does is applied atomically.
    pub fn write<R>(&self, f: impl FnOnce(&mut Rows<K, V>) -> R) -> StoreResult<R> {
        let mut rows = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("table lock poisoned".to_string()))?;
        Ok(f(&mut rows))
    }
}

impl<K, V> Default for LiveTable<K, V>
where
    K: Eq + Hash + Clone,
    V: SoftDelete,
{
    fn default() -> Self {
        Self::new()
    }
}
