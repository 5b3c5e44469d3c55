#![warn(missing_docs)]
//! OrdTree B-Tree
//!
//! # Implementation Details
//!
//! Provides a simple, in-memory B-Tree for storing ordered values.
//!
//! The tree is configured with a minimum key count per node (the "order"). Every node other than
//! the root holds between `min_keys` and `2 * min_keys` keys. The default order of 1 gives a 2-3
//! tree.
//!
//! (If you aren't sure what that means, you can read more about B-Trees here: <https://en.wikipedia.org/wiki/B-tree>.)
//!
//! The B-Tree is composed of nodes, which are all stored in a single index keyed store owned by
//! the tree. Each node has a unique index and the index is used to reference the nodes from their
//! parent. A node also records the index of its parent, which is only used to walk back up the
//! tree when rebalancing.
//!
//! A node is either:
//!  - Leaf node, contains keys and no children
//!  - Internal node, contains keys and exactly one more child than it has keys
//!
//! Insertions which overflow a node split it and push the median key up into the parent.
//! Removals which underflow a node borrow a key from a sibling (right sibling first) or merge
//! with a sibling, pulling the separating key down from the parent.
//!
//! Equal values may be added more than once. Each copy is stored, counted and removed
//! separately.
//!
//! The tree is not synchronised. If you need to share it between threads, wrap it in a lock.
//!
//! Note: Nodes are tucked away inside the implementation. Callers only ever see opaque
//! [`btree::NodeHandle`] values, which can be used to inspect (never modify) the tree.
//!

pub mod btree;
