use anyhow::Result;

use ordtree::btree::Direction;
use ordtree::btree::OrdTree;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let value = "something".to_string();

    // Create a tree with at least 2 keys in every non-root node
    let mut tree = OrdTree::<String>::try_new(2)?;

    // Make sure we can't find "something" in our tree
    assert!(!tree.contains(&value));
    assert_eq!(tree.get_node(&value), None);

    // Add "something", twice
    tree.add(value.clone());
    tree.add(value.clone());
    assert_eq!(tree.size(), 2);

    // Make sure we can find "something" in our tree
    assert!(tree.contains(&value));

    // Remove one copy of "something", the other is still there
    let node = tree.remove(&value);
    assert!(node.is_some());
    assert!(tree.contains(&value));

    for word in ["the", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog"] {
        tree.add(word.to_string());
    }
    tree.verify()?;
    tree.info();
    tree.print_nodes(Direction::Ascending);

    tree.clear();
    assert!(!tree.contains(&value));
    Ok(())
}
