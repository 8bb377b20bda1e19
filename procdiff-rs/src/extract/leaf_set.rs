//! Leaf activities contained in a subtree.

use std::rc::Rc;

use rustc_hash::FxHashSet;

use super::{Extractor, Memo};
use crate::node::NodeRef;

/// Ids of all leaf activities (calls, scripts, ...) below and including a node.
#[derive(Debug)]
pub struct LeafSetExtractor {
    memo: Memo<Rc<FxHashSet<u64>>>,
}

impl LeafSetExtractor {
    pub fn new() -> Self {
        LeafSetExtractor { memo: Memo::new() }
    }
}

impl Default for LeafSetExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for LeafSetExtractor {
    type Output = Rc<FxHashSet<u64>>;

    fn get(&self, node: &NodeRef) -> Rc<FxHashSet<u64>> {
        let id = node.borrow().id();
        self.memo.get_or_insert_with(id, || {
            let (is_leaf, children) = {
                let borrowed = node.borrow();
                (borrowed.is_leaf(), borrowed.children().to_vec())
            };
            let mut leaves = FxHashSet::default();
            if is_leaf {
                leaves.insert(id);
            } else {
                for child in &children {
                    leaves.extend(self.get(child).iter().copied());
                }
            }
            Rc::new(leaves)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{new_element, NodeInner};

    #[test]
    fn test_leaf_set() {
        let root = new_element("description", &[], None);
        let lp = new_element("loop", &[], None);
        let a = new_element("call", &[("endpoint", "A")], None);
        let b = new_element("manipulate", &[], Some("data.x = 1"));
        NodeInner::append_child(&a, new_element("parameters", &[], None));
        NodeInner::append_child(&lp, a.clone());
        NodeInner::append_child(&lp, b.clone());
        NodeInner::append_child(&root, lp.clone());

        let extractor = LeafSetExtractor::new();
        let leaves = extractor.get(&root);
        assert_eq!(leaves.len(), 2);
        assert!(leaves.contains(&a.borrow().id()));
        assert!(leaves.contains(&b.borrow().id()));
        assert_eq!(extractor.get(&a).len(), 1);
    }
}
