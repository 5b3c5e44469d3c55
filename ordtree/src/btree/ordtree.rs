//! B-Tree implementation
//!
//! This is the main data structure exposed by the library.
//!

use std::ops::ControlFlow;

use anyhow::Result;
use strum::EnumString;
use thiserror::Error;

use super::node::Node;
use super::order::Order;
use super::sparse::SparseNodes;

/// When visiting tree contents serially, ascending or descending order.
///
/// Parses from text with `str::parse`, ignoring ASCII case (`"ascending"`, `"Descending"`), so a
/// caller can take the direction from user input when calling [`OrdTree::print_nodes`].
#[derive(Clone, Copy, Debug, EnumString, PartialEq)]
#[strum(ascii_case_insensitive)]
pub enum Direction {
    /// Process in ascending order.
    Ascending,
    /// Process in descending order.
    Descending,
}

/// Values which we wish to store in an OrdTree.
///
/// `Ord` and `Eq` must agree (a total order). The tree does not check this: if they disagree the
/// tree may lose track of values.
pub trait OrdTreeKey: Ord + std::fmt::Debug {}

// Blanket implementation which satisfies the compiler
impl<T> OrdTreeKey for T
where
    T: Ord + std::fmt::Debug,
{
    // Nothing to implement, since T already supports the other traits.
}

/// OrdTree specific errors.
#[derive(Error, Debug, PartialEq)]
pub enum OrdTreeError {
    /// Supplied minimum key count too small
    #[error("min_keys: {0} must be >=1")]
    OrderTooSmall(usize),

    /// Supplied minimum key count too large
    #[error("min_keys: {0} is too large")]
    OrderTooLarge(usize),

    /// A node refers to a node which isn't stored
    #[error("could not find node with index: {0}")]
    LostNode(usize),

    /// A node's parent doesn't list it as a child
    #[error("could not find parent for node with index: {0}")]
    LostParent(usize),

    /// A node holds more keys than the maximum
    #[error("node with index: {idx} holds {len} keys, maximum is {max}")]
    Overflow {
        /// Node index
        idx: usize,
        /// Key count
        len: usize,
        /// Maximum key count
        max: usize,
    },

    /// A non-root node holds fewer keys than the minimum
    #[error("node with index: {idx} holds {len} keys, minimum is {min}")]
    Underflow {
        /// Node index
        idx: usize,
        /// Key count
        len: usize,
        /// Minimum key count
        min: usize,
    },

    /// The root of a non-empty tree holds no keys
    #[error("root node with index: {0} is empty")]
    EmptyRoot(usize),

    /// An internal node doesn't have one more child than it has keys
    #[error("node with index: {idx} has {keys} keys and {children} children")]
    ChildCount {
        /// Node index
        idx: usize,
        /// Key count
        keys: usize,
        /// Child count
        children: usize,
    },

    /// Nodes are stored which can't be reached from the root
    #[error("{stored} nodes are stored but only {reachable} are reachable")]
    LeakedNodes {
        /// Stored nodes
        stored: usize,
        /// Nodes reachable from the root
        reachable: usize,
    },

    /// Keys are not in order
    #[error("keys out of order at node with index: {0}")]
    OutOfOrder(usize),

    /// Leaves are at different depths
    #[error("leaf with index: {idx} is at depth {depth}, expected {expected}")]
    UnevenLeaves {
        /// Leaf index
        idx: usize,
        /// Depth of this leaf
        depth: usize,
        /// Depth of the first leaf
        expected: usize,
    },

    /// The recorded size doesn't match the stored keys
    #[error("tree records {size} keys but stores {count}")]
    SizeMismatch {
        /// Recorded size
        size: usize,
        /// Stored keys
        count: usize,
    },
}

/// An opaque reference to a node of an [`OrdTree`].
///
/// Handles can be compared and used to inspect a tree through [`OrdTree::node_keys`] and
/// friends. They never allow modification. Once the node is discarded (split, merged away or
/// cleared) the handle no longer resolves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeHandle(usize);

/// A B-Tree.
#[derive(Debug)]
pub struct OrdTree<T>
where
    T: OrdTreeKey,
{
    pub(crate) nodes: SparseNodes<T>,
    pub(crate) root: Option<usize>,
    order: Order,
    size: usize,
}

impl<T> Default for OrdTree<T>
where
    T: OrdTreeKey,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OrdTree<T>
where
    T: OrdTreeKey,
{
    /// Create an empty 2-3 tree (minimum of one key per node).
    pub fn new() -> Self {
        Self::with_order(Order::default())
    }

    /// Create an empty tree with the specified minimum number of keys per non-root node.
    pub fn try_new(min_keys: usize) -> Result<Self> {
        let order = Order::try_new(min_keys)?;
        tracing::info!(
            min_keys = order.min_keys(),
            max_keys = order.max_keys(),
            "Creating B-Tree"
        );
        Ok(Self::with_order(order))
    }

    /// Create an empty tree with the specified order.
    pub fn with_order(order: Order) -> Self {
        Self {
            nodes: SparseNodes::new(),
            root: None,
            order,
            size: 0,
        }
    }

    /// The order of this tree.
    pub fn order(&self) -> Order {
        self.order
    }

    /// Return count of entries.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Is the tree empty?
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Clear our tree.
    pub fn clear(&mut self) {
        tracing::debug!("Clearing {} nodes", self.nodes.len());
        self.nodes.clear();
        self.root = None;
        self.size = 0;
    }

    /// Add a value.
    ///
    /// Values equal to values already in the tree are stored as well, to the left of the
    /// existing copies.
    pub fn add(&mut self, value: T) {
        tracing::debug!("ADDING: {:?}", value);
        match self.root {
            None => {
                let mut root = Node::leaf(self.order, None);
                root.insert_key(value);
                self.root = Some(self.nodes.add(root));
            }
            Some(root) => {
                let mut idx = root;
                loop {
                    let node = self.nodes.get(idx);
                    if node.is_leaf() {
                        break;
                    }
                    // Internal nodes have one more child than keys, so every slot has a child
                    idx = node.children()[node.slot(&value)];
                }
                let node = self.nodes.get_mut(idx);
                node.insert_key(value);
                if node.is_full() {
                    self.split(idx);
                }
            }
        }
        self.size += 1;
    }

    /// Does the tree contain this value?
    pub fn contains(&self, value: &T) -> bool {
        self.search_node(value).is_some()
    }

    /// Return the node holding this value.
    pub fn get_node(&self, value: &T) -> Option<NodeHandle> {
        self.search_node(value).map(NodeHandle)
    }

    /// Remove one copy of a value and return the node which held it.
    ///
    /// The returned handle identifies the node as it was before the removal. Rebalancing may have
    /// discarded that node since, in which case the handle no longer resolves.
    pub fn remove(&mut self, value: &T) -> Option<NodeHandle> {
        let idx = self.search_node(value)?;
        tracing::debug!("REMOVING: {:?} from node: {}", value, idx);

        let node = self.nodes.get_mut(idx);
        let pos = node.find(value).ok()?;
        node.remove_key_at(pos);

        if node.is_leaf() {
            if node.is_minimum() {
                self.combine(idx);
            } else if node.is_root() && node.is_empty() {
                tracing::debug!("Removed last value, tree is empty");
                self.nodes.free(idx);
                self.root = None;
            }
        } else {
            // Replace the removed key with its in-order predecessor, taken from the greatest leaf
            // below the child to its left.
            let lesser = node.children()[pos];
            let greatest = self.greatest_leaf(lesser);
            let replacement = self
                .nodes
                .get_mut(greatest)
                .pop_key()
                .expect("non-root leaves are never empty");
            self.nodes.get_mut(idx).insert_key_at(pos, replacement);

            if self.nodes.get(greatest).is_minimum() {
                self.combine(greatest);
            }
            if self
                .nodes
                .try_get(greatest)
                .is_some_and(|leaf| leaf.has_child_overflow())
            {
                self.split(greatest);
            }
        }
        self.size -= 1;
        Some(NodeHandle(idx))
    }

    /// The root node, if the tree isn't empty.
    pub fn root_node(&self) -> Option<NodeHandle> {
        self.root.map(NodeHandle)
    }

    /// The keys of a node, in order.
    pub fn node_keys(&self, handle: NodeHandle) -> Option<&[T]> {
        self.nodes.try_get(handle.0).map(|node| node.keys())
    }

    /// The children of a node, in order. Leaves have no children.
    pub fn node_children(&self, handle: NodeHandle) -> Option<Vec<NodeHandle>> {
        self.nodes
            .try_get(handle.0)
            .map(|node| node.children().iter().copied().map(NodeHandle).collect())
    }

    /// The parent of a node. `None` for the root or a discarded node.
    pub fn node_parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.nodes
            .try_get(handle.0)
            .and_then(|node| node.parent())
            .map(NodeHandle)
    }

    /// Return the smallest value.
    pub fn first(&self) -> Option<&T> {
        self.first_leaf()
            .and_then(|idx| self.nodes.get(idx).keys().first())
    }

    /// Return the greatest value.
    pub fn last(&self) -> Option<&T> {
        self.root
            .map(|root| self.greatest_leaf(root))
            .and_then(|idx| self.nodes.get(idx).keys().last())
    }

    /// Number of levels in the tree. An empty tree has height 0.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut next = self.root;
        while let Some(idx) = next {
            height += 1;
            next = self.nodes.get(idx).first_child();
        }
        height
    }

    /// Return count of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Return leaf node utilization: keys held by leaves as a fraction of leaf key capacity.
    pub fn utilization(&self) -> f64 {
        let mut used = 0;
        let mut total = 0;

        let callback = |node: &Node<T>| {
            used += node.len();
            total += self.order.max_keys();
            ControlFlow::Continue(())
        };
        self.traverse_leaf_nodes(Direction::Ascending, callback);
        if total == 0 {
            0.0
        } else {
            used as f64 / total as f64
        }
    }

    /// Log basic information about our B-Tree.
    pub fn info(&self) {
        tracing::info!(
            min_keys = self.order.min_keys(),
            max_keys = self.order.max_keys(),
            size = self.size,
            node_count = self.node_count(),
            height = self.height(),
            "B-Tree"
        );
    }

    /// Print to stdout all the nodes in the tree.
    pub fn print_nodes(&self, direction: Direction) {
        let callback = |node: &Node<T>| {
            println!("node: {node:?}");
            ControlFlow::Continue(())
        };
        self.traverse_nodes(direction, callback)
    }

    /// Verify all the nodes in the tree.
    ///
    /// Checks key counts, child counts, parent links, key order (within nodes and across the whole
    /// tree), that all leaves share a depth and that the recorded size matches the stored keys.
    pub fn verify(&self) -> Result<()> {
        let Some(root) = self.root else {
            if self.size != 0 || !self.nodes.is_empty() {
                return Err(OrdTreeError::SizeMismatch {
                    size: self.size,
                    count: 0,
                }
                .into());
            }
            return Ok(());
        };

        let root_node = self
            .nodes
            .try_get(root)
            .ok_or(OrdTreeError::LostNode(root))?;
        if !root_node.is_root() {
            return Err(OrdTreeError::LostParent(root).into());
        }
        if root_node.is_empty() {
            return Err(OrdTreeError::EmptyRoot(root).into());
        }

        let mut stack = vec![(root, 1)];
        let mut leaf_depth = None;
        let mut reachable = 0;
        while let Some((idx, depth)) = stack.pop() {
            let node = self
                .nodes
                .try_get(idx)
                .filter(|node| node.index() == idx)
                .ok_or(OrdTreeError::LostNode(idx))?;
            reachable += 1;
            if node.is_full() {
                return Err(OrdTreeError::Overflow {
                    idx,
                    len: node.len(),
                    max: self.order.max_keys(),
                }
                .into());
            }
            if node.is_minimum() {
                return Err(OrdTreeError::Underflow {
                    idx,
                    len: node.len(),
                    min: self.order.min_keys(),
                }
                .into());
            }
            if !node.verify_keys() {
                return Err(OrdTreeError::OutOfOrder(idx).into());
            }
            if node.is_leaf() {
                match leaf_depth {
                    None => leaf_depth = Some(depth),
                    Some(expected) if expected != depth => {
                        return Err(OrdTreeError::UnevenLeaves {
                            idx,
                            depth,
                            expected,
                        }
                        .into());
                    }
                    Some(_) => (),
                }
                continue;
            }
            if node.child_count() != node.len() + 1 {
                return Err(OrdTreeError::ChildCount {
                    idx,
                    keys: node.len(),
                    children: node.child_count(),
                }
                .into());
            }
            for &child in node.children() {
                let child_node = self
                    .nodes
                    .try_get(child)
                    .ok_or(OrdTreeError::LostNode(child))?;
                if child_node.parent() != Some(idx) {
                    return Err(OrdTreeError::LostParent(child).into());
                }
                stack.push((child, depth + 1));
            }
        }
        if reachable != self.nodes.len() {
            return Err(OrdTreeError::LeakedNodes {
                stored: self.nodes.len(),
                reachable,
            }
            .into());
        }

        let mut count = 0;
        let mut previous: Option<&T> = None;
        let mut out_of_order = false;
        self.traverse_keys(Direction::Ascending, |key| {
            count += 1;
            if previous.is_some_and(|prev| prev > key) {
                out_of_order = true;
                return ControlFlow::Break(());
            }
            previous = Some(key);
            ControlFlow::Continue(())
        });
        if out_of_order {
            return Err(OrdTreeError::OutOfOrder(root).into());
        }
        if count != self.size {
            return Err(OrdTreeError::SizeMismatch {
                size: self.size,
                count,
            }
            .into());
        }
        Ok(())
    }

    /// Search our tree from the root for the node holding `value`.
    fn search_node(&self, value: &T) -> Option<usize> {
        let mut idx = self.root?;
        loop {
            let node = self.nodes.get(idx);
            match node.find(value) {
                Ok(_) => return Some(idx),
                // A leaf has no child in any slot, so the search ends there
                Err(pos) => idx = node.child(pos)?,
            }
        }
    }

    /// Follow the last child links down from `idx` to a leaf.
    fn greatest_leaf(&self, mut idx: usize) -> usize {
        while let Some(child) = self.nodes.get(idx).last_child() {
            idx = child;
        }
        idx
    }

    /// Split an overfull node, pushing its median into the parent. Repeats up the tree while the
    /// parent overflows in turn, growing a new root if the old root splits.
    fn split(&mut self, mut idx: usize) {
        loop {
            let node = self.nodes.take(idx);
            let p_opt = node.parent();
            let (median, left, right) = node.split();
            let left_idx = self.nodes.add(left);
            let right_idx = self.nodes.add(right);
            match p_opt {
                Some(p_idx) => {
                    let parent = self.nodes.get_mut(p_idx);
                    let pos = parent
                        .child_position(idx)
                        .unwrap_or_else(|| panic!("node {idx} is not a child of {p_idx}"));
                    parent.remove_child_at(pos);
                    parent.insert_key_at(pos, median);
                    parent.insert_child_at(pos, left_idx);
                    parent.insert_child_at(pos + 1, right_idx);
                    if !parent.is_full() {
                        break;
                    }
                    idx = p_idx;
                }
                None => {
                    self.add_root(median, left_idx, right_idx);
                    break;
                }
            }
        }
    }

    fn add_root(&mut self, median: T, left_idx: usize, right_idx: usize) {
        tracing::debug!(
            "Adding a new root: key: {:?}, children: {:?}",
            median,
            [left_idx, right_idx]
        );
        let root = Node::internal(self.order, None, vec![median], vec![left_idx, right_idx]);
        self.root = Some(self.nodes.add(root));
    }

    /// Restore the minimum key count of an underflowing non-root node.
    ///
    /// In order of preference: borrow from the right sibling, borrow from the left sibling, merge
    /// with the right sibling, merge with the left sibling. A merge takes a key from the parent,
    /// so this repeats up the tree while the parent underflows in turn. A root emptied by a merge
    /// is replaced by the merged node.
    fn combine(&mut self, mut idx: usize) {
        loop {
            let Some(p_idx) = self.nodes.get(idx).parent() else {
                return;
            };
            let parent = self.nodes.get(p_idx);
            let pos = parent
                .child_position(idx)
                .unwrap_or_else(|| panic!("node {idx} is not a child of {p_idx}"));
            let right = parent.child(pos + 1);
            let left = pos.checked_sub(1).and_then(|l_pos| parent.child(l_pos));
            let parent_len = parent.len();

            if let Some(r_idx) = right.filter(|r_idx| self.nodes.get(*r_idx).can_lend()) {
                self.borrow_from_right(idx, p_idx, pos, r_idx);
                return;
            }
            if let Some(l_idx) = left.filter(|l_idx| self.nodes.get(*l_idx).can_lend()) {
                self.borrow_from_left(idx, p_idx, pos, l_idx);
                return;
            }
            if parent_len == 0 {
                return;
            }
            match (right, left) {
                (Some(r_idx), _) => self.merge_right(idx, p_idx, pos, r_idx),
                (None, Some(l_idx)) => self.merge_left(idx, p_idx, pos, l_idx),
                (None, None) => return,
            }

            let parent = self.nodes.get(p_idx);
            if parent.is_minimum() {
                idx = p_idx;
                continue;
            }
            if parent.is_empty() {
                tracing::debug!("Promoting node: {} to root", idx);
                self.nodes.free(p_idx);
                self.nodes.get_mut(idx).set_parent(None);
                self.root = Some(idx);
            }
            return;
        }
    }

    /// Rotate the separator down into our node and the right sibling's first key up into the
    /// parent.
    fn borrow_from_right(&mut self, idx: usize, p_idx: usize, pos: usize, r_idx: usize) {
        tracing::debug!("Node: {} borrowing from right neighbour: {}", idx, r_idx);
        let (key, child) = self.nodes.get_mut(r_idx).take_first();
        let separator = self.nodes.get_mut(p_idx).replace_key(pos, key);
        self.nodes.get_mut(idx).push_back(separator, child);
        if let Some(child) = child {
            self.nodes.get_mut(child).set_parent(Some(idx));
        }
    }

    /// Rotate the separator down into our node and the left sibling's last key up into the
    /// parent.
    fn borrow_from_left(&mut self, idx: usize, p_idx: usize, pos: usize, l_idx: usize) {
        tracing::debug!("Node: {} borrowing from left neighbour: {}", idx, l_idx);
        let (key, child) = self.nodes.get_mut(l_idx).take_last();
        let separator = self.nodes.get_mut(p_idx).replace_key(pos - 1, key);
        self.nodes.get_mut(idx).push_front(separator, child);
        if let Some(child) = child {
            self.nodes.get_mut(child).set_parent(Some(idx));
        }
    }

    fn merge_right(&mut self, idx: usize, p_idx: usize, pos: usize, r_idx: usize) {
        tracing::debug!("Node: {} merging right neighbour: {}", idx, r_idx);
        let neighbour = self.nodes.take(r_idx);
        let parent = self.nodes.get_mut(p_idx);
        let separator = parent.remove_key_at(pos);
        parent.remove_child_at(pos + 1);
        self.adopt(idx, neighbour.children());
        self.nodes.get_mut(idx).merge_right(separator, neighbour);
    }

    fn merge_left(&mut self, idx: usize, p_idx: usize, pos: usize, l_idx: usize) {
        tracing::debug!("Node: {} merging left neighbour: {}", idx, l_idx);
        let neighbour = self.nodes.take(l_idx);
        let parent = self.nodes.get_mut(p_idx);
        let separator = parent.remove_key_at(pos - 1);
        parent.remove_child_at(pos - 1);
        self.adopt(idx, neighbour.children());
        self.nodes.get_mut(idx).merge_left(neighbour, separator);
    }

    fn adopt(&mut self, idx: usize, children: &[usize]) {
        for &child in children {
            self.nodes.get_mut(child).set_parent(Some(idx));
        }
    }
}

#[cfg(test)]
mod tests;
