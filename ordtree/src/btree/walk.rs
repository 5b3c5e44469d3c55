use std::ops::ControlFlow;

use super::node::Node;
use super::ordtree::Direction;
use super::ordtree::OrdTree;
use super::ordtree::OrdTreeKey;

impl<T> OrdTree<T>
where
    T: OrdTreeKey,
{
    /// Traverse all nodes in a tree (depth first, parents before children) using the callback.
    pub(crate) fn traverse_nodes<'a>(
        &'a self,
        direction: Direction,
        mut f: impl FnMut(&'a Node<T>) -> ControlFlow<()>,
    ) {
        let mut stack: Vec<usize> = self.root.into_iter().collect();
        while let Some(idx) = stack.pop() {
            let node = self.nodes.get(idx);
            if f(node).is_break() {
                break;
            }
            // The stack pops in reverse, so push the children we want first last
            match direction {
                Direction::Ascending => stack.extend(node.children().iter().rev()),
                Direction::Descending => stack.extend(node.children().iter()),
            }
        }
    }

    /// Traverse all leaf nodes in a tree, in key order, using the callback.
    pub(crate) fn traverse_leaf_nodes<'a>(
        &'a self,
        direction: Direction,
        mut f: impl FnMut(&'a Node<T>) -> ControlFlow<()>,
    ) {
        self.traverse_nodes(direction, |node| {
            if node.is_leaf() {
                f(node)
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    /// Traverse all keys in a tree, in key order, until exhausted or the callback returns break.
    pub(crate) fn traverse_keys<'a>(
        &'a self,
        direction: Direction,
        mut f: impl FnMut(&'a T) -> ControlFlow<()>,
    ) {
        // Each entry is a node and the number of its keys already visited. Between two keys of an
        // internal node we must visit the whole child subtree which separates them (i.e.: a loop
        // within a loop).
        let mut stack: Vec<(usize, usize)> = vec![];
        if let Some(root) = self.root {
            self.descend(root, direction, &mut stack);
        }
        while let Some((idx, visited)) = stack.pop() {
            let node = self.nodes.get(idx);
            if visited == node.len() {
                continue;
            }
            let (key, next_child) = match direction {
                Direction::Ascending => (&node.keys()[visited], node.child(visited + 1)),
                Direction::Descending => {
                    let pos = node.len() - 1 - visited;
                    (&node.keys()[pos], node.child(pos))
                }
            };
            stack.push((idx, visited + 1));
            if f(key).is_break() {
                break;
            }
            if let Some(child) = next_child {
                self.descend(child, direction, &mut stack);
            }
        }
    }

    /// Push `idx` and its leftmost (or rightmost) descendants onto the stack.
    fn descend(&self, mut idx: usize, direction: Direction, stack: &mut Vec<(usize, usize)>) {
        loop {
            stack.push((idx, 0));
            let node = self.nodes.get(idx);
            let next = match direction {
                Direction::Ascending => node.first_child(),
                Direction::Descending => node.last_child(),
            };
            match next {
                Some(child) => idx = child,
                None => break,
            }
        }
    }

    pub(crate) fn first_leaf(&self) -> Option<usize> {
        let mut idx = self.root?;
        while let Some(child) = self.nodes.get(idx).first_child() {
            idx = child;
        }
        Some(idx)
    }
}
