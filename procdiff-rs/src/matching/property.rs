//! Matching of property nodes below matched nodes.

use super::{Matcher, Matching};
use crate::compare::Comparator;
use crate::error::Result;
use crate::node::{pre_order, NodeRef};

/// Matches the property children of matched nodes by label.
///
/// Runs last, so that properties follow the element they describe. Nested
/// properties are handled as well because a property matched here is
/// visited later in the same pre-order walk.
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyMatcher;

impl Matcher for PropertyMatcher {
    fn match_trees(
        &self,
        _old: &NodeRef,
        new: &NodeRef,
        matching: &mut Matching,
        _comparator: &Comparator,
    ) -> Result<()> {
        for new_node in pre_order(new) {
            let Some(old_node) = matching.get_match_of_new(&new_node).cloned() else {
                continue;
            };
            let new_children = new_node.borrow().children().to_vec();
            let old_children = old_node.borrow().children().to_vec();

            for new_child in &new_children {
                if !new_child.borrow().is_property() || matching.is_matched(new_child) {
                    continue;
                }
                let label = new_child.borrow().label().clone();
                let candidate = old_children.iter().find(|old_child| {
                    old_child.borrow().is_property()
                        && *old_child.borrow().label() == label
                        && !matching.is_matched(old_child)
                });
                if let Some(old_child) = candidate {
                    matching.match_nodes(new_child, old_child)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiffConfig;
    use crate::node::{new_element, NodeInner};

    fn call_with_params(label: &str) -> (NodeRef, NodeRef, NodeRef) {
        let call = new_element("call", &[("endpoint", "E")], None);
        let parameters = new_element("parameters", &[], None);
        let text = new_element("label", &[], Some(label));
        NodeInner::append_child(&parameters, text.clone());
        NodeInner::append_child(&call, parameters.clone());
        (call, parameters, text)
    }

    #[test]
    fn test_nested_properties() {
        let (old_call, old_params, old_label) = call_with_params("Book");
        let (new_call, new_params, new_label) = call_with_params("Book flight");

        let comparator = Comparator::new(&DiffConfig::default()).unwrap();
        let mut matching = Matching::new();
        matching.match_nodes(&new_call, &old_call).unwrap();
        PropertyMatcher
            .match_trees(&old_call, &new_call, &mut matching, &comparator)
            .unwrap();

        assert_eq!(matching.get_match_of_new(&new_params).unwrap().borrow().id(), old_params.borrow().id());
        assert_eq!(matching.get_match_of_new(&new_label).unwrap().borrow().id(), old_label.borrow().id());
    }

    #[test]
    fn test_unmatched_parent_keeps_properties_unmatched() {
        let (old_call, _, _) = call_with_params("Book");
        let (new_call, new_params, _) = call_with_params("Book");

        let comparator = Comparator::new(&DiffConfig::default()).unwrap();
        let mut matching = Matching::new();
        PropertyMatcher
            .match_trees(&old_call, &new_call, &mut matching, &comparator)
            .unwrap();
        assert!(!matching.is_matched(&new_params));
    }
}
