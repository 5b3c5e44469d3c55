use core::hash::{BuildHasherDefault, Hasher};
use std::collections::HashMap;

use super::node::Node;
use super::ordtree::OrdTreeKey;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct IdentityHasher(usize);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0 as u64
    }

    fn write(&mut self, _bytes: &[u8]) {
        unimplemented!("IdentityHasher only supports usize keys")
    }

    fn write_usize(&mut self, i: usize) {
        self.0 = i;
    }
}

pub(crate) type BuildIdentityHasher = BuildHasherDefault<IdentityHasher>;

/// Every node of a tree, keyed by node index.
///
/// Indices are handed out in increasing order and never reused, so a stale index simply fails
/// to resolve.
#[derive(Debug)]
pub(crate) struct SparseNodes<T> {
    nodes: HashMap<usize, Node<T>, BuildIdentityHasher>,
    index: usize,
}

impl<T> SparseNodes<T>
where
    T: OrdTreeKey,
{
    pub(crate) fn new() -> Self {
        Self {
            nodes: HashMap::default(),
            index: 1,
        }
    }

    /// Store a node under a fresh index and point its children back at it.
    pub(crate) fn add(&mut self, mut node: Node<T>) -> usize {
        let idx = self.index;
        self.index += 1;
        node.set_index(idx);
        let children = node.children().to_vec();
        self.nodes.insert(idx, node);
        for child in children {
            self.get_mut(child).set_parent(Some(idx));
        }
        idx
    }

    pub(crate) fn try_get(&self, idx: usize) -> Option<&Node<T>> {
        self.nodes.get(&idx)
    }

    pub(crate) fn get(&self, idx: usize) -> &Node<T> {
        self.try_get(idx)
            .unwrap_or_else(|| panic!("no node with index: {idx}"))
    }

    pub(crate) fn get_mut(&mut self, idx: usize) -> &mut Node<T> {
        self.nodes
            .get_mut(&idx)
            .unwrap_or_else(|| panic!("no node with index: {idx}"))
    }

    /// Remove a node from the store, handing ownership to the caller.
    pub(crate) fn take(&mut self, idx: usize) -> Node<T> {
        self.nodes
            .remove(&idx)
            .unwrap_or_else(|| panic!("no node with index: {idx}"))
    }

    pub(crate) fn free(&mut self, idx: usize) {
        drop(self.take(idx));
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node. The index counter keeps running.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
    }
}
