//! Tree traversal helpers.

use super::NodeRef;

/// Iterator for traversing a tree in depth-first pre-order.
pub struct DfsTreeIterator {
    /// Stack of (node, next_child_index) pairs for iterating.
    stack: Vec<(NodeRef, usize)>,
}

impl DfsTreeIterator {
    /// Creates a new DFS iterator starting at the given root.
    pub fn new(root: NodeRef) -> Self {
        DfsTreeIterator {
            stack: vec![(root, 0)],
        }
    }
}

impl Iterator for DfsTreeIterator {
    type Item = NodeRef;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, child_idx)) = self.stack.pop() {
            let child_count = node.borrow().child_count();

            if child_idx == 0 {
                // First visit to this node - return it
                if child_count > 0 {
                    self.stack.push((node.clone(), 1));
                    let first_child = node.borrow().child(0).cloned();
                    if let Some(child) = first_child {
                        self.stack.push((child, 0));
                    }
                }
                return Some(node);
            } else if child_idx < child_count {
                let next_child = node.borrow().child(child_idx).cloned();
                self.stack.push((node, child_idx + 1));
                if let Some(child) = next_child {
                    self.stack.push((child, 0));
                }
            }
        }
        None
    }
}

/// Collects the subtree rooted at `root` in pre-order.
pub fn pre_order(root: &NodeRef) -> Vec<NodeRef> {
    DfsTreeIterator::new(root.clone()).collect()
}

/// Collects the subtree rooted at `root` in post-order.
pub fn post_order(root: &NodeRef) -> Vec<NodeRef> {
    let mut result = Vec::new();
    let mut stack: Vec<(NodeRef, bool)> = vec![(root.clone(), false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            result.push(node);
            continue;
        }
        let children = node.borrow().children().to_vec();
        stack.push((node, true));
        for child in children.into_iter().rev() {
            stack.push((child, false));
        }
    }
    result
}

/// Returns the ancestors of a node, nearest first.
pub fn ancestors(node: &NodeRef) -> Vec<NodeRef> {
    let mut result = Vec::new();
    let mut current = node.borrow().parent();
    while let Some(parent) = current {
        current = parent.borrow().parent();
        result.push(parent);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{new_element, NodeInner};

    // Build tree:
    //       root
    //      /    \
    //     a      b
    //    / \
    //   c   d
    fn build() -> NodeRef {
        let root = new_element("root", &[], None);
        let a = new_element("a", &[], None);
        let b = new_element("b", &[], None);
        let c = new_element("c", &[], None);
        let d = new_element("d", &[], None);
        NodeInner::append_child(&root, a.clone());
        NodeInner::append_child(&root, b);
        NodeInner::append_child(&a, c);
        NodeInner::append_child(&a, d);
        root
    }

    fn labels(nodes: &[NodeRef]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| n.borrow().label().to_string())
            .collect()
    }

    #[test]
    fn test_dfs_iterator_single_node() {
        let root = new_element("root", &[], None);
        let nodes: Vec<NodeRef> = DfsTreeIterator::new(root.clone()).collect();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].borrow().id(), root.borrow().id());
    }

    #[test]
    fn test_pre_order() {
        let root = build();
        assert_eq!(labels(&pre_order(&root)), vec!["root", "a", "c", "d", "b"]);
    }

    #[test]
    fn test_post_order() {
        let root = build();
        assert_eq!(labels(&post_order(&root)), vec!["c", "d", "a", "b", "root"]);
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let root = build();
        let d = pre_order(&root)[3].clone();
        assert_eq!(labels(&ancestors(&d)), vec!["a", "root"]);
        assert!(ancestors(&root).is_empty());
    }
}
