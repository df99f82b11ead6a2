//! Entry Store Module
//!
//! Key index of the cache: maps each live key to its node in the recency list.

use std::collections::HashMap;

use crate::cache::NodeId;

// == Entry Store ==
/// Authoritative answer to "is this key cached?".
///
/// Holds node handles only; the recency list owns the entries themselves.
#[derive(Debug, Default)]
pub struct EntryStore {
    index: HashMap<String, NodeId>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            index: HashMap::with_capacity(capacity),
        }
    }

    /// Stores the node for a key, returning the node it replaced.
    pub fn insert(&mut self, key: String, node: NodeId) -> Option<NodeId> {
        self.index.insert(key, node)
    }

    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    pub fn remove(&mut self, key: &str) -> Option<NodeId> {
        self.index.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.index.keys()
    }

    pub fn clear(&mut self) {
        self.index.clear();
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
