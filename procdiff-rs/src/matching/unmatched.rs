//! Structural inference for inner nodes the other matchers left behind.

use tracing::trace;

use super::{Matcher, Matching};
use crate::compare::Comparator;
use crate::error::Result;
use crate::node::{pre_order, Label, NodeInner, NodeRef};

/// Matches unmatched inner nodes whose counterpart is implied by their
/// matched neighbourhood. Runs until no more pairs are found.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnmatchedMatcher;

impl Matcher for UnmatchedMatcher {
    fn match_trees(
        &self,
        _old: &NodeRef,
        new: &NodeRef,
        matching: &mut Matching,
        _comparator: &Comparator,
    ) -> Result<()> {
        loop {
            let mut changed = false;
            for node in pre_order(new) {
                if !node.borrow().is_inner() || matching.is_matched(&node) {
                    continue;
                }
                let found = vertical_sandwich(&node, matching)
                    .or_else(|| horizontal_sandwich(&node, matching))
                    .or_else(|| single_unmatched_child(&node, matching))
                    .or_else(|| otherwise_branch(&node, matching));
                if let Some(old_node) = found {
                    trace!(label = %node.borrow().label(), "matching implied inner node");
                    matching.match_nodes(&node, &old_node)?;
                    changed = true;
                }
            }
            if !changed {
                return Ok(());
            }
        }
    }
}

fn same_label(a: &NodeRef, b: &NodeRef) -> bool {
    a.borrow().label() == b.borrow().label()
}

fn is_candidate(node: &NodeRef, old: &NodeRef, matching: &Matching) -> bool {
    !matching.is_matched(old) && same_label(node, old)
}

fn matched_parent(node: &NodeRef, matching: &Matching) -> Option<NodeRef> {
    let parent = node.borrow().parent()?;
    matching.get_match_of_new(&parent).cloned()
}

/// Parent and some child are matched, and the old child hangs below an old
/// node that hangs below the old parent.
fn vertical_sandwich(node: &NodeRef, matching: &Matching) -> Option<NodeRef> {
    let old_parent = matched_parent(node, matching)?;
    let children = node.borrow().children().to_vec();
    children.iter().find_map(|child| {
        let old_child = matching.get_match_of_new(child)?;
        let old_node = old_child.borrow().parent()?;
        let grandparent_id = old_node.borrow().parent()?.borrow().id();
        let below_parent = grandparent_id == old_parent.borrow().id();
        (below_parent && is_candidate(node, &old_node, matching)).then_some(old_node)
    })
}

/// Both siblings are matched to old siblings with exactly one node between
/// them.
fn horizontal_sandwich(node: &NodeRef, matching: &Matching) -> Option<NodeRef> {
    let left = NodeInner::left_sibling_of_ref(node)?;
    let right = NodeInner::right_sibling_of_ref(node)?;
    let old_left = matching.get_match_of_new(&left)?;
    let old_right = matching.get_match_of_new(&right)?;

    let old_parent = old_left.borrow().parent()?;
    let right_parent = old_right.borrow().parent()?;
    if old_parent.borrow().id() != right_parent.borrow().id() {
        return None;
    }
    let left_index = old_left.borrow().index();
    if old_right.borrow().index() != left_index + 2 {
        return None;
    }
    let old_node = old_parent.borrow().child(left_index + 1).cloned()?;
    is_candidate(node, &old_node, matching).then_some(old_node)
}

/// The node is the only unmatched process child of its parent, and so is
/// some node of the same label below the old parent.
fn single_unmatched_child(node: &NodeRef, matching: &Matching) -> Option<NodeRef> {
    let old_parent = matched_parent(node, matching)?;
    let parent = node.borrow().parent()?;

    let unmatched_new = unmatched_process_children(&parent, matching);
    if unmatched_new.len() != 1 {
        return None;
    }
    let unmatched_old = unmatched_process_children(&old_parent, matching);
    match unmatched_old.as_slice() {
        [old_node] if same_label(node, old_node) => Some(old_node.clone()),
        _ => None,
    }
}

/// The default branch of a matched choice.
fn otherwise_branch(node: &NodeRef, matching: &Matching) -> Option<NodeRef> {
    if *node.borrow().label() != Label::Otherwise {
        return None;
    }
    let old_parent = matched_parent(node, matching)?;
    if *old_parent.borrow().label() != Label::Choose {
        return None;
    }
    let children = old_parent.borrow().children().to_vec();
    children
        .into_iter()
        .find(|child| is_candidate(node, child, matching))
}

fn unmatched_process_children(node: &NodeRef, matching: &Matching) -> Vec<NodeRef> {
    node.borrow()
        .children()
        .iter()
        .filter(|c| !c.borrow().is_property() && !matching.is_matched(c))
        .cloned()
        .collect()
}
