//! B-Tree implementation
//!

// Re-export
pub use self::order::Order;
pub use self::order::DEFAULT_MIN_KEYS;
pub use self::order::MAX_MIN_KEYS;
pub use self::ordtree::Direction;
pub use self::ordtree::NodeHandle;
pub use self::ordtree::OrdTree;
pub use self::ordtree::OrdTreeError;
pub use self::ordtree::OrdTreeKey;

mod node;
mod order;
pub mod ordtree;
mod sparse;
mod walk;
