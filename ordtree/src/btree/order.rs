//! B-Tree Order Parameters

use anyhow::Result;

use super::ordtree::OrdTreeError;

/// Minimum number of keys in a non-root node when no order is specified.
///
/// An order of 1 gives a 2-3 tree: every node holds 1 or 2 keys and every internal node has 2 or
/// 3 children.
pub const DEFAULT_MIN_KEYS: usize = 1;

/// Largest accepted minimum number of keys per non-root node.
///
/// Nodes reserve room for their maximum number of keys when they are created, so the order is
/// capped to keep that reservation bounded.
pub const MAX_MIN_KEYS: usize = u16::MAX as usize;

/// The order of a B-Tree.
///
/// All four bounds are derived from `min_keys` and are fixed for the lifetime of a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Order {
    min_keys: usize,
}

impl Order {
    /// Create an order with the specified minimum number of keys per non-root node.
    pub fn try_new(min_keys: usize) -> Result<Self> {
        if min_keys < 1 {
            return Err(OrdTreeError::OrderTooSmall(min_keys).into());
        }
        if min_keys > MAX_MIN_KEYS {
            return Err(OrdTreeError::OrderTooLarge(min_keys).into());
        }
        Ok(Self { min_keys })
    }

    /// Minimum number of keys in a non-root node.
    pub fn min_keys(&self) -> usize {
        self.min_keys
    }

    /// Maximum number of keys in any node.
    pub fn max_keys(&self) -> usize {
        2 * self.min_keys
    }

    /// Minimum number of children of a non-root internal node.
    pub fn min_children(&self) -> usize {
        self.min_keys + 1
    }

    /// Maximum number of children of any internal node.
    pub fn max_children(&self) -> usize {
        self.max_keys() + 1
    }
}

impl Default for Order {
    fn default() -> Self {
        Self {
            min_keys: DEFAULT_MIN_KEYS,
        }
    }
}
