//! B-Tree Node Type

use std::mem;

use super::order::Order;
use super::ordtree::OrdTreeKey;

/// A B-Tree node.
///
/// Keys are always sorted. A node with no children is a leaf, otherwise it has exactly one more
/// child than it has keys. Children are stored as indices into the tree's node store. The parent
/// index is a back link only, the parent owns its children and never the reverse.
#[derive(Clone, Debug)]
pub(crate) struct Node<T> {
    keys: Vec<T>,
    children: Vec<usize>,
    order: Order,
    parent: Option<usize>,
    idx: usize,
}

impl<T> Node<T>
where
    T: OrdTreeKey,
{
    /// An empty leaf. Capacity leaves room for one key past the maximum, which is where a node
    /// sits between an insertion and the split that fixes it.
    pub(crate) fn leaf(order: Order, parent: Option<usize>) -> Self {
        Node {
            keys: Vec::with_capacity(order.max_keys() + 1),
            children: Vec::new(),
            order,
            parent,
            idx: 0,
        }
    }

    pub(crate) fn internal(
        order: Order,
        parent: Option<usize>,
        keys: Vec<T>,
        children: Vec<usize>,
    ) -> Self {
        assert_eq!(keys.len() + 1, children.len());
        Self::from_parts(order, parent, keys, children)
    }

    fn from_parts(order: Order, parent: Option<usize>, keys: Vec<T>, children: Vec<usize>) -> Self {
        let mut node = Node::leaf(order, parent);
        node.keys.extend(keys);
        if !children.is_empty() {
            node.children.reserve_exact(order.max_children() + 1);
            node.children.extend(children);
        }
        node
    }

    pub(crate) fn index(&self) -> usize {
        self.idx
    }

    pub(crate) fn set_index(&mut self, idx: usize) {
        self.idx = idx;
    }

    pub(crate) fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<usize>) {
        self.parent = parent;
    }

    pub(crate) fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub(crate) fn keys(&self) -> &[T] {
        &self.keys
    }

    pub(crate) fn children(&self) -> &[usize] {
        &self.children
    }

    pub(crate) fn child_count(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn child(&self, pos: usize) -> Option<usize> {
        self.children.get(pos).copied()
    }

    pub(crate) fn first_child(&self) -> Option<usize> {
        self.children.first().copied()
    }

    pub(crate) fn last_child(&self) -> Option<usize> {
        self.children.last().copied()
    }

    pub(crate) fn child_position(&self, idx: usize) -> Option<usize> {
        self.children.iter().position(|child| *child == idx)
    }

    /// The child slot a value descends into: the number of keys strictly less than the value.
    /// Values equal to a key therefore go to the left of that key.
    pub(crate) fn slot(&self, value: &T) -> usize {
        self.keys.partition_point(|key| key < value)
    }

    /// Locate the first key equal to `value`, or the slot it would descend into.
    pub(crate) fn find(&self, value: &T) -> Result<usize, usize> {
        let pos = self.slot(value);
        match self.keys.get(pos) {
            Some(key) if key == value => Ok(pos),
            _ => Err(pos),
        }
    }

    /// Insert a key in order, to the left of any equal keys. Returns the key's position.
    pub(crate) fn insert_key(&mut self, value: T) -> usize {
        let pos = self.slot(&value);
        self.keys.insert(pos, value);
        pos
    }

    pub(crate) fn insert_key_at(&mut self, pos: usize, value: T) {
        self.keys.insert(pos, value);
    }

    pub(crate) fn remove_key_at(&mut self, pos: usize) -> T {
        self.keys.remove(pos)
    }

    pub(crate) fn replace_key(&mut self, pos: usize, value: T) -> T {
        mem::replace(&mut self.keys[pos], value)
    }

    pub(crate) fn pop_key(&mut self) -> Option<T> {
        self.keys.pop()
    }

    pub(crate) fn insert_child_at(&mut self, pos: usize, child: usize) {
        self.children.insert(pos, child);
    }

    pub(crate) fn remove_child_at(&mut self, pos: usize) -> usize {
        self.children.remove(pos)
    }

    /// Too many keys, must be split.
    pub(crate) fn is_full(&self) -> bool {
        self.keys.len() > self.order.max_keys()
    }

    /// Too many children, must be split.
    pub(crate) fn has_child_overflow(&self) -> bool {
        self.children.len() > self.order.max_children()
    }

    /// Too few keys for a non-root node. The root is never below minimum.
    pub(crate) fn is_minimum(&self) -> bool {
        !self.is_root() && self.keys.len() < self.order.min_keys()
    }

    /// Can give a key to a sibling and stay within bounds.
    pub(crate) fn can_lend(&self) -> bool {
        self.keys.len() > self.order.min_keys()
    }

    /// Remove the smallest key, and the leftmost child if this is an internal node.
    pub(crate) fn take_first(&mut self) -> (T, Option<usize>) {
        let key = self.keys.remove(0);
        let child = if self.is_leaf() {
            None
        } else {
            Some(self.children.remove(0))
        };
        (key, child)
    }

    /// Remove the largest key, and the rightmost child if this is an internal node.
    pub(crate) fn take_last(&mut self) -> (T, Option<usize>) {
        let key = self.keys.pop().expect("a lending node has keys");
        (key, self.children.pop())
    }

    pub(crate) fn push_back(&mut self, key: T, child: Option<usize>) {
        self.keys.push(key);
        if let Some(child) = child {
            self.children.push(child);
        }
    }

    pub(crate) fn push_front(&mut self, key: T, child: Option<usize>) {
        self.keys.insert(0, key);
        if let Some(child) = child {
            self.children.insert(0, child);
        }
    }

    /// Split an overfull node around its median key.
    ///
    /// Returns the median and two new nodes: `left` holds the keys before the median (and the
    /// children up to and including the median position), `right` holds the rest. Both keep this
    /// node's parent. Neither has an index yet.
    pub(crate) fn split(self) -> (T, Node<T>, Node<T>) {
        let median_idx = self.keys.len() / 2;

        tracing::debug!("Splitting node: {:?}, median index: {}", self, median_idx);
        let Node {
            mut keys,
            mut children,
            order,
            parent,
            ..
        } = self;

        let right_keys = keys.split_off(median_idx + 1);
        let median = keys.pop().expect("an overfull node has a median");
        let right_children = if children.is_empty() {
            vec![]
        } else {
            children.split_off(median_idx + 1)
        };

        let left = Node::from_parts(order, parent, keys, children);
        let right = Node::from_parts(order, parent, right_keys, right_children);
        tracing::debug!("After split: median: {:?}", median);
        tracing::debug!("After split: left: {:?}", left);
        tracing::debug!("After split: right: {:?}", right);
        (median, left, right)
    }

    /// Absorb the sibling immediately to our right, with `separator` (the parent key between us)
    /// pulled down between the two key runs.
    pub(crate) fn merge_right(&mut self, separator: T, other: Node<T>) {
        assert_eq!(self.order, other.order);
        self.keys.push(separator);
        self.keys.extend(other.keys);
        self.children.extend(other.children);
        assert!(!self.is_full());
    }

    /// Absorb the sibling immediately to our left, with `separator` pulled down between them.
    pub(crate) fn merge_left(&mut self, other: Node<T>, separator: T) {
        assert_eq!(self.order, other.order);
        let mut keys = other.keys;
        keys.push(separator);
        keys.append(&mut self.keys);
        self.keys = keys;

        let mut children = other.children;
        children.append(&mut self.children);
        self.children = children;
        assert!(!self.is_full());
    }

    pub(crate) fn verify_keys(&self) -> bool {
        self.keys.windows(2).all(|pair| pair[0] <= pair[1])
    }
}
