//! Subtree size extractors.

use super::{Extractor, Memo};
use crate::node::NodeRef;

/// Number of nodes in a subtree, property nodes included.
#[derive(Debug)]
pub struct SizeExtractor {
    memo: Memo<usize>,
}

impl SizeExtractor {
    pub fn new() -> Self {
        SizeExtractor { memo: Memo::new() }
    }
}

impl Default for SizeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for SizeExtractor {
    type Output = usize;

    fn get(&self, node: &NodeRef) -> usize {
        let id = node.borrow().id();
        self.memo.get_or_insert_with(id, || {
            let children = node.borrow().children().to_vec();
            1 + children.iter().map(|c| self.get(c)).sum::<usize>()
        })
    }
}

/// Number of process elements (non-property nodes) in a subtree.
#[derive(Debug)]
pub struct ElementSizeExtractor {
    memo: Memo<usize>,
}

impl ElementSizeExtractor {
    pub fn new() -> Self {
        ElementSizeExtractor { memo: Memo::new() }
    }
}

impl Default for ElementSizeExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for ElementSizeExtractor {
    type Output = usize;

    fn get(&self, node: &NodeRef) -> usize {
        let id = node.borrow().id();
        self.memo.get_or_insert_with(id, || {
            let (own, children) = {
                let borrowed = node.borrow();
                let own = usize::from(!borrowed.is_property());
                (own, borrowed.children().to_vec())
            };
            own + children.iter().map(|c| self.get(c)).sum::<usize>()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{new_element, NodeInner};

    #[test]
    fn test_sizes() {
        let root = new_element("description", &[], None);
        let call = new_element("call", &[("endpoint", "E")], None);
        let params = new_element("parameters", &[], None);
        let label = new_element("label", &[], Some("Book"));
        NodeInner::append_child(&params, label);
        NodeInner::append_child(&call, params);
        NodeInner::append_child(&root, call.clone());

        let size = SizeExtractor::new();
        let element_size = ElementSizeExtractor::new();
        assert_eq!(size.get(&root), 4);
        assert_eq!(size.get(&call), 3);
        assert_eq!(element_size.get(&root), 2);
        assert_eq!(element_size.get(&call), 1);
    }
}
