use super::*;

use std::collections::BTreeMap;
use std::str::FromStr;

use proptest::prelude::*;
use rand::Rng;

type Levels<T> = Vec<Vec<Vec<T>>>;

// The keys of every node, level by level, left to right.
fn levels<T: OrdTreeKey + Clone>(tree: &OrdTree<T>) -> Levels<T> {
    let mut levels = vec![];
    let mut current: Vec<NodeHandle> = tree.root_node().into_iter().collect();
    while !current.is_empty() {
        levels.push(
            current
                .iter()
                .map(|handle| tree.node_keys(*handle).expect("handle resolves").to_vec())
                .collect(),
        );
        current = current
            .iter()
            .flat_map(|handle| tree.node_children(*handle).expect("handle resolves"))
            .collect();
    }
    levels
}

fn build(min_keys: usize, input: &[i32]) -> OrdTree<i32> {
    let mut tree = OrdTree::try_new(min_keys).expect("creates tree");
    for i in input {
        tree.add(*i);
        tree.verify().expect("tree is valid");
    }
    tree
}

fn in_order(tree: &OrdTree<i32>) -> Vec<i32> {
    let mut keys = vec![];
    tree.traverse_keys(Direction::Ascending, |key| {
        keys.push(*key);
        ControlFlow::Continue(())
    });
    keys
}

#[test]
fn it_creates_tree() {
    let tree = OrdTree::<i32>::new();
    assert_eq!(tree.size(), 0);
    assert!(tree.is_empty());
    assert_eq!(tree.order(), Order::default());
    assert_eq!(tree.root_node(), None);
    tree.verify().expect("empty tree is valid");
}

#[test]
fn it_creates_tree_with_order() {
    let tree = OrdTree::<i32>::try_new(3).expect("creates tree");
    assert_eq!(tree.order().min_keys(), 3);
    assert_eq!(tree.order().max_keys(), 6);
}

#[test]
fn it_wont_create_tree_with_zero_order() {
    let err = OrdTree::<i32>::try_new(0).expect_err("order is too small");
    assert_eq!(
        err.downcast_ref::<OrdTreeError>(),
        Some(&OrdTreeError::OrderTooSmall(0))
    );
}

#[test]
fn it_searches_empty_tree() {
    let tree = OrdTree::<String>::new();
    assert!(!tree.contains(&"something".to_string()));
    assert_eq!(tree.get_node(&"something".to_string()), None);
    assert_eq!(tree.first(), None);
    assert_eq!(tree.last(), None);
    assert_eq!(tree.height(), 0);
    assert_eq!(tree.utilization(), 0.0);
}

#[test_log::test]
fn it_splits_the_root() {
    let tree = build(1, &[1, 2, 3]);
    assert_eq!(levels(&tree), vec![vec![vec![2]], vec![vec![1], vec![3]]]);
    assert_eq!(tree.size(), 3);
    assert_eq!(tree.height(), 2);
}

#[test_log::test]
fn it_splits_a_leaf_into_its_parent() {
    let tree = build(1, &[1, 2, 3, 4, 5]);
    assert_eq!(
        levels(&tree),
        vec![vec![vec![2, 4]], vec![vec![1], vec![3], vec![5]]]
    );
    assert_eq!(tree.size(), 5);
}

#[test_log::test]
fn it_merges_an_empty_leaf_with_its_right_neighbour() {
    let mut tree = build(1, &[1, 2, 3, 4, 5]);
    assert!(tree.remove(&1).is_some());
    tree.verify().expect("tree is valid");
    assert_eq!(levels(&tree), vec![vec![vec![4]], vec![vec![2, 3], vec![5]]]);
    assert_eq!(tree.size(), 4);
    assert!(!tree.contains(&1));
}

#[test_log::test]
fn it_removes_the_only_value() {
    let mut tree = build(1, &[42]);
    let handle = tree.remove(&42).expect("value was present");
    tree.verify().expect("tree is valid");
    assert_eq!(tree.size(), 0);
    assert!(tree.is_empty());
    assert_eq!(tree.root_node(), None);
    assert_eq!(tree.node_count(), 0);
    assert_eq!(tree.node_keys(handle), None);
    for i in 0..100 {
        assert!(!tree.contains(&i));
    }
}

#[test_log::test]
fn it_keeps_duplicates() {
    let mut tree = build(1, &[5, 5]);
    assert_eq!(tree.size(), 2);
    assert_eq!(levels(&tree), vec![vec![vec![5, 5]]]);
    assert!(tree.remove(&5).is_some());
    assert_eq!(tree.size(), 1);
    assert!(tree.contains(&5));
    assert!(tree.remove(&5).is_some());
    assert_eq!(tree.size(), 0);
    assert!(!tree.contains(&5));
}

#[test_log::test]
fn it_keeps_duplicates_across_nodes() {
    let mut tree = build(1, &[5, 5, 5, 5, 5, 5, 5]);
    assert_eq!(tree.size(), 7);
    for remaining in (0..7).rev() {
        assert!(tree.remove(&5).is_some());
        tree.verify().expect("tree is valid");
        assert_eq!(tree.size(), remaining);
        assert_eq!(tree.contains(&5), remaining > 0);
    }
    assert!(tree.remove(&5).is_none());
}

#[test]
fn it_returns_the_node_it_removed_from() {
    let mut tree = build(1, &[1, 2]);
    let found = tree.get_node(&2);
    assert!(found.is_some());
    assert_eq!(found, tree.remove(&2));
}

#[test]
fn it_ignores_removal_of_absent_values() {
    let mut tree = build(2, &[10, 20, 30, 40, 50, 60, 70]);
    let before = levels(&tree);
    assert_eq!(tree.remove(&35), None);
    assert_eq!(tree.remove(&0), None);
    assert_eq!(tree.remove(&100), None);
    assert_eq!(tree.size(), 7);
    assert_eq!(levels(&tree), before);
}

#[test_log::test]
fn it_borrows_from_the_right_neighbour() {
    let mut tree = build(1, &[1, 2, 3, 4, 5, 6]);
    assert_eq!(
        levels(&tree),
        vec![vec![vec![2, 4]], vec![vec![1], vec![3], vec![5, 6]]]
    );
    tree.remove(&3).expect("value was present");
    tree.verify().expect("tree is valid");
    assert_eq!(
        levels(&tree),
        vec![vec![vec![2, 5]], vec![vec![1], vec![4], vec![6]]]
    );
}

#[test_log::test]
fn it_borrows_from_the_left_neighbour() {
    let mut tree = build(1, &[1, 2, 3, 4, 5, 0]);
    assert_eq!(
        levels(&tree),
        vec![vec![vec![2, 4]], vec![vec![0, 1], vec![3], vec![5]]]
    );
    tree.remove(&3).expect("value was present");
    tree.verify().expect("tree is valid");
    assert_eq!(
        levels(&tree),
        vec![vec![vec![1, 4]], vec![vec![0], vec![2], vec![5]]]
    );
}

#[test_log::test]
fn it_prefers_to_borrow_from_the_right() {
    let mut tree = build(1, &[1, 2, 3, 4, 5, 0, 6]);
    assert_eq!(
        levels(&tree),
        vec![vec![vec![2, 4]], vec![vec![0, 1], vec![3], vec![5, 6]]]
    );
    tree.remove(&3).expect("value was present");
    tree.verify().expect("tree is valid");
    assert_eq!(
        levels(&tree),
        vec![vec![vec![2, 5]], vec![vec![0, 1], vec![4], vec![6]]]
    );
}

#[test_log::test]
fn it_prefers_to_merge_with_the_right() {
    let mut tree = build(1, &[1, 2, 3, 4, 5]);
    tree.remove(&3).expect("value was present");
    tree.verify().expect("tree is valid");
    assert_eq!(levels(&tree), vec![vec![vec![2]], vec![vec![1], vec![4, 5]]]);
}

#[test_log::test]
fn it_merges_with_the_left_neighbour() {
    let mut tree = build(1, &[1, 2, 3, 4, 5]);
    tree.remove(&5).expect("value was present");
    tree.verify().expect("tree is valid");
    assert_eq!(levels(&tree), vec![vec![vec![2]], vec![vec![1], vec![3, 4]]]);
}

#[test_log::test]
fn it_substitutes_the_predecessor_for_an_internal_key() {
    let mut tree = build(1, &[1, 2, 3, 4, 5]);
    let root = tree.root_node();
    assert_eq!(tree.get_node(&4), root);
    assert_eq!(tree.remove(&4), root);
    tree.verify().expect("tree is valid");
    assert_eq!(levels(&tree), vec![vec![vec![2]], vec![vec![1], vec![3, 5]]]);
    assert_eq!(tree.size(), 4);
}

#[test_log::test]
fn it_substitutes_the_predecessor_from_a_deep_leaf() {
    let mut tree = build(1, &[1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(
        levels(&tree),
        vec![
            vec![vec![4]],
            vec![vec![2], vec![6]],
            vec![vec![1], vec![3], vec![5], vec![7]]
        ]
    );
    tree.remove(&4).expect("value was present");
    tree.verify().expect("tree is valid");
    assert!(!tree.contains(&4));
    assert_eq!(in_order(&tree), vec![1, 2, 3, 5, 6, 7]);
    assert_eq!(tree.size(), 6);
}

#[test_log::test]
fn it_shrinks_when_merges_cascade_to_the_root() {
    let mut tree = build(1, &[1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(tree.height(), 3);
    tree.remove(&1).expect("value was present");
    tree.verify().expect("tree is valid");
    assert_eq!(
        levels(&tree),
        vec![vec![vec![4, 6]], vec![vec![2, 3], vec![5], vec![7]]]
    );
    assert_eq!(tree.height(), 2);
    let root = tree.root_node().expect("tree has a root");
    assert_eq!(tree.node_parent(root), None);
}

#[test_log::test]
fn it_rotates_children_from_the_right_internal_neighbour() {
    let mut tree = build(1, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(
        levels(&tree),
        vec![
            vec![vec![4]],
            vec![vec![2], vec![6, 8]],
            vec![vec![1], vec![3], vec![5], vec![7], vec![9]]
        ]
    );
    tree.remove(&1).expect("value was present");
    tree.verify().expect("tree is valid");
    assert_eq!(
        levels(&tree),
        vec![
            vec![vec![6]],
            vec![vec![4], vec![8]],
            vec![vec![2, 3], vec![5], vec![7], vec![9]]
        ]
    );
}

#[test_log::test]
fn it_rotates_children_from_the_left_internal_neighbour() {
    let mut tree = build(1, &[1, 2, 3, 4, 5, 6, 7, 0, -1]);
    assert_eq!(
        levels(&tree),
        vec![
            vec![vec![4]],
            vec![vec![0, 2], vec![6]],
            vec![vec![-1], vec![1], vec![3], vec![5], vec![7]]
        ]
    );
    tree.remove(&7).expect("value was present");
    tree.verify().expect("tree is valid");
    assert_eq!(
        levels(&tree),
        vec![
            vec![vec![2]],
            vec![vec![0], vec![4]],
            vec![vec![-1], vec![1], vec![3], vec![5, 6]]
        ]
    );
}

#[test]
fn it_forgets_discarded_nodes() {
    let mut tree = build(1, &[1, 2]);
    let old_root = tree.root_node().expect("tree has a root");
    tree.add(3);
    assert_eq!(tree.node_keys(old_root), None);
    assert_eq!(tree.node_children(old_root), None);
    let new_root = tree.root_node().expect("tree has a root");
    assert_ne!(old_root, new_root);
    for child in tree.node_children(new_root).expect("root resolves") {
        assert_eq!(tree.node_parent(child), Some(new_root));
    }
}

#[test_log::test]
fn it_inserts_into_empty_tree_random() {
    let mut tree = OrdTree::<usize>::try_new(4).expect("creates tree");
    let mut input = vec![];
    for _i in 0..400 {
        let i = rand::thread_rng().gen_range(0..100_000);
        tree.add(i);
        input.push(i);
    }
    tree.verify().expect("tree is valid");
    for i in &input {
        assert!(tree.contains(i));
    }
    assert_eq!(tree.size(), input.len());
    tree.info();
}

#[test_log::test]
fn it_inserts_into_empty_tree_reverse() {
    let mut tree = OrdTree::<usize>::try_new(2).expect("creates tree");
    for i in (0..400).rev() {
        tree.add(i);
    }
    tree.verify().expect("tree is valid");
    for i in 0..400 {
        assert!(tree.contains(&i));
    }
    assert!(!tree.contains(&400));
    assert_eq!(tree.first(), Some(&0));
    assert_eq!(tree.last(), Some(&399));
}

#[test_log::test]
fn it_inserts_into_empty_tree_string() {
    let mut tree = OrdTree::<String>::try_new(3).expect("creates tree");
    for i in (0..400).rev() {
        tree.add(format!("something_{i}"));
    }
    tree.verify().expect("tree is valid");
    assert!(tree.contains(&"something_0".to_string()));
    assert!(tree.contains(&"something_13".to_string()));
    assert!(tree.contains(&"something_319".to_string()));
    assert!(!tree.contains(&"something_400".to_string()));
    assert_eq!(tree.first(), Some(&"something_0".to_string()));
    assert_eq!(tree.last(), Some(&"something_99".to_string()));
}

#[test_log::test]
fn it_inserts_and_removes_random() {
    for min_keys in 1..5 {
        let mut tree = OrdTree::<usize>::try_new(min_keys).expect("creates tree");
        let mut input = vec![];
        for _i in 0..300 {
            let i = rand::thread_rng().gen_range(0..200);
            tree.add(i);
            input.push(i);
        }
        tree.verify().expect("tree is valid");
        for (count, i) in input.iter().enumerate() {
            assert!(tree.remove(i).is_some());
            assert_eq!(tree.size(), input.len() - count - 1);
            if count % 10 == 0 {
                tree.verify().expect("tree is valid");
            }
        }
        tree.verify().expect("tree is valid");
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
    }
}

#[test_log::test]
fn it_inserts_and_clears_random() {
    let mut tree = OrdTree::<usize>::new();
    let mut input = vec![];
    for _i in 0..200 {
        let i = rand::thread_rng().gen_range(0..200);
        tree.add(i);
        input.push(i);
    }
    for i in &input {
        assert!(tree.contains(i));
    }
    let root = tree.root_node().expect("tree has a root");
    tree.clear();
    tree.verify().expect("tree is valid");
    assert_eq!(tree.size(), 0);
    assert_eq!(tree.node_keys(root), None);
    for i in &input {
        assert!(!tree.contains(i));
    }
    tree.add(7);
    assert_ne!(tree.root_node(), Some(root));
    assert_eq!(tree.size(), 1);
}

#[test]
fn it_reports_shape() {
    let mut tree = build(1, &[1, 2, 3, 4, 5]);
    assert_eq!(tree.height(), 2);
    assert_eq!(tree.node_count(), 4);
    assert_eq!(tree.utilization(), 0.5);
    tree.add(6);
    assert!((tree.utilization() - 4.0 / 6.0).abs() < f64::EPSILON);
    assert_eq!(tree.first(), Some(&1));
    assert_eq!(tree.last(), Some(&6));
    tree.print_nodes(Direction::Descending);
}

#[test]
fn it_parses_directions() {
    assert_eq!(
        Direction::from_str("ascending").expect("parses"),
        Direction::Ascending
    );
    assert_eq!(
        Direction::from_str("DESCENDING").expect("parses"),
        Direction::Descending
    );
    assert!(Direction::from_str("sideways").is_err());
}

#[test]
fn it_detects_keys_out_of_order() {
    let mut tree = build(1, &[1, 2, 3, 4, 5]);
    let leaf = tree.first_leaf().expect("tree has a leaf");
    tree.nodes.get_mut(leaf).insert_key_at(0, 100);
    tree.size += 1;
    let err = tree.verify().expect_err("tree is invalid");
    assert_eq!(
        err.downcast_ref::<OrdTreeError>(),
        Some(&OrdTreeError::OutOfOrder(leaf))
    );
}

#[test]
fn it_detects_underflow() {
    let mut tree = build(1, &[1, 2, 3, 4, 5]);
    let leaf = tree.first_leaf().expect("tree has a leaf");
    tree.nodes.get_mut(leaf).pop_key();
    tree.size -= 1;
    let err = tree.verify().expect_err("tree is invalid");
    assert_eq!(
        err.downcast_ref::<OrdTreeError>(),
        Some(&OrdTreeError::Underflow {
            idx: leaf,
            len: 0,
            min: 1
        })
    );
}

#[test]
fn it_detects_size_mismatch() {
    let mut tree = build(1, &[1, 2, 3, 4, 5]);
    tree.size += 1;
    let err = tree.verify().expect_err("tree is invalid");
    assert_eq!(
        err.downcast_ref::<OrdTreeError>(),
        Some(&OrdTreeError::SizeMismatch { size: 6, count: 5 })
    );
}

#[derive(Clone, Debug)]
enum Operation {
    Add(i32),
    Remove(i32),
}

fn operation() -> impl Strategy<Value = Operation> {
    prop_oneof![
        3 => (0..60i32).prop_map(Operation::Add),
        2 => (0..60i32).prop_map(Operation::Remove),
    ]
}

proptest! {
    #[test]
    fn it_behaves_like_a_multiset(
        min_keys in 1..5usize,
        operations in prop::collection::vec(operation(), 0..200),
    ) {
        let mut tree = OrdTree::try_new(min_keys).expect("creates tree");
        let mut model: BTreeMap<i32, usize> = BTreeMap::new();

        for operation in operations {
            match operation {
                Operation::Add(value) => {
                    tree.add(value);
                    *model.entry(value).or_default() += 1;
                }
                Operation::Remove(value) => {
                    let removed = tree.remove(&value);
                    match model.get_mut(&value) {
                        Some(count) => {
                            prop_assert!(removed.is_some());
                            *count -= 1;
                            if *count == 0 {
                                model.remove(&value);
                            }
                        }
                        None => prop_assert!(removed.is_none()),
                    }
                }
            }

            prop_assert!(tree.verify().is_ok(), "{:?}", tree.verify());
            prop_assert_eq!(tree.size(), model.values().sum::<usize>());
            for value in 0..60 {
                prop_assert_eq!(tree.contains(&value), model.contains_key(&value));
            }
        }

        let expected: Vec<i32> = model
            .iter()
            .flat_map(|(value, count)| std::iter::repeat(*value).take(*count))
            .collect();
        prop_assert_eq!(in_order(&tree), expected);
    }
}
