//! Matching of inner nodes along the paths of matched leaves.
//!
//! If two leaves are matched, their ancestors are likely to correspond as
//! well. Every unmatched new ancestor collects the unmatched old ancestors
//! with the same label as candidates, keeping the ancestor order intact.
//! Nodes with few candidates are resolved first since their choice is the
//! least ambiguous.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use super::{Matcher, Matching};
use crate::compare::Comparator;
use crate::error::Result;
use crate::extract::Extractor;
use crate::node::{ancestors, pre_order, NodeRef};

/// Resolves ancestor candidates by their comparison value.
#[derive(Debug, Default, Clone, Copy)]
pub struct PathMatcher;

/// Resolves ancestor candidates by their comparison value blended with the
/// share of matched leaves both subtrees have in common.
#[derive(Debug, Default, Clone, Copy)]
pub struct CommonalityPathMatcher;

impl Matcher for PathMatcher {
    fn match_trees(
        &self,
        old: &NodeRef,
        new: &NodeRef,
        matching: &mut Matching,
        comparator: &Comparator,
    ) -> Result<()> {
        match_paths(old, new, matching, comparator, false)
    }
}

impl Matcher for CommonalityPathMatcher {
    fn match_trees(
        &self,
        old: &NodeRef,
        new: &NodeRef,
        matching: &mut Matching,
        comparator: &Comparator,
    ) -> Result<()> {
        match_paths(old, new, matching, comparator, true)
    }
}

/// Unmatched new node with its candidate old nodes.
struct Candidates {
    new: NodeRef,
    olds: Vec<NodeRef>,
    seen: FxHashSet<u64>,
}

fn match_paths(
    _old: &NodeRef,
    new: &NodeRef,
    matching: &mut Matching,
    comparator: &Comparator,
    commonality: bool,
) -> Result<()> {
    let mut candidates: Vec<Candidates> = Vec::new();
    let mut index_of: FxHashMap<u64, usize> = FxHashMap::default();

    for new_leaf in pre_order(new) {
        if !new_leaf.borrow().is_leaf() {
            continue;
        }
        let Some(old_leaf) = matching.get_match_of_new(&new_leaf).cloned() else {
            continue;
        };
        let old_ancestors = ancestors(&old_leaf);
        let old_position: FxHashMap<u64, usize> = old_ancestors
            .iter()
            .enumerate()
            .map(|(i, n)| (n.borrow().id(), i))
            .collect();

        // Old ancestors below `floor` are already used by a nearer new ancestor
        let mut floor = 0;
        for new_ancestor in ancestors(&new_leaf) {
            if let Some(matched) = matching.get_match_of_new(&new_ancestor) {
                if let Some(&i) = old_position.get(&matched.borrow().id()) {
                    floor = floor.max(i + 1);
                }
                continue;
            }
            let label = new_ancestor.borrow().label().clone();
            let mut nearest = None;
            for (i, old_ancestor) in old_ancestors.iter().enumerate().skip(floor) {
                if matching.is_matched(old_ancestor) || *old_ancestor.borrow().label() != label {
                    continue;
                }
                nearest.get_or_insert(i);

                let new_id = new_ancestor.borrow().id();
                let slot = *index_of.entry(new_id).or_insert_with(|| {
                    candidates.push(Candidates {
                        new: new_ancestor.clone(),
                        olds: Vec::new(),
                        seen: FxHashSet::default(),
                    });
                    candidates.len() - 1
                });
                let entry = &mut candidates[slot];
                if entry.seen.insert(old_ancestor.borrow().id()) {
                    entry.olds.push(old_ancestor.clone());
                }
            }
            if let Some(i) = nearest {
                floor = i + 1;
            }
        }
    }

    candidates.sort_by_key(|c| c.olds.len());

    let threshold = comparator.config().comparison_threshold;
    for entry in &candidates {
        if matching.is_matched(&entry.new) {
            continue;
        }
        let mut best: Option<(&NodeRef, f64)> = None;
        for old_node in &entry.olds {
            if matching.is_matched(old_node) {
                continue;
            }
            let mut value = comparator.compare(old_node, &entry.new);
            if commonality {
                let common = leaf_commonality(old_node, &entry.new, matching, comparator);
                value = (value + common) / 2.0;
            }
            if best.map_or(true, |(_, best_value)| value < best_value) {
                best = Some((old_node, value));
            }
        }
        if let Some((old_node, value)) = best {
            if value <= threshold {
                trace!(value, label = %entry.new.borrow().label(), "matching ancestors");
                matching.match_nodes(&entry.new, old_node)?;
            }
        }
    }
    Ok(())
}

/// `1 - common / max(|leaves(old)|, |leaves(new)|)`, where `common` counts
/// the new leaves matched to a leaf below `old`.
fn leaf_commonality(
    old: &NodeRef,
    new: &NodeRef,
    matching: &Matching,
    comparator: &Comparator,
) -> f64 {
    let leaf_set = &comparator.extractors().leaf_set;
    let old_leaves = leaf_set.get(old);
    let new_leaves = leaf_set.get(new);
    let max = old_leaves.len().max(new_leaves.len());
    if max == 0 {
        return 1.0;
    }

    let common = pre_order(new)
        .iter()
        .filter(|n| new_leaves.contains(&n.borrow().id()))
        .filter_map(|n| matching.get_match_of_new(n))
        .filter(|o| old_leaves.contains(&o.borrow().id()))
        .count();
    1.0 - common as f64 / max as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiffConfig;
    use crate::node::{new_element, NodeInner};

    /// description > loop > critical > call, on both sides.
    fn nested() -> (NodeRef, NodeRef, NodeRef, NodeRef) {
        let root = new_element("description", &[], None);
        let lp = new_element("loop", &[("mode", "pre_test"), ("condition", "data.i < 3")], None);
        let critical = new_element("critical", &[("sid", "s1")], None);
        let call = new_element("call", &[("endpoint", "A")], None);
        NodeInner::append_child(&critical, call.clone());
        NodeInner::append_child(&lp, critical.clone());
        NodeInner::append_child(&root, lp.clone());
        (root, lp, critical, call)
    }

    fn matched_roots_and_leaves(
        old: &(NodeRef, NodeRef, NodeRef, NodeRef),
        new: &(NodeRef, NodeRef, NodeRef, NodeRef),
    ) -> Matching {
        let mut matching = Matching::new();
        matching.match_nodes(&new.0, &old.0).unwrap();
        matching.match_nodes(&new.3, &old.3).unwrap();
        matching
    }

    #[test]
    fn test_ancestors_matched() {
        let old = nested();
        let new = nested();
        // Same variables, different bound
        new.1.borrow_mut().set_attribute("condition", "data.i < 5");

        let comparator = Comparator::new(&DiffConfig::default()).unwrap();
        let mut matching = matched_roots_and_leaves(&old, &new);
        PathMatcher.match_trees(&old.0, &new.0, &mut matching, &comparator).unwrap();

        assert_eq!(matching.get_match_of_new(&new.1).unwrap().borrow().id(), old.1.borrow().id());
        assert_eq!(matching.get_match_of_new(&new.2).unwrap().borrow().id(), old.2.borrow().id());
    }

    #[test]
    fn test_commonality_variant() {
        let old = nested();
        let new = nested();

        let comparator = Comparator::new(&DiffConfig::default()).unwrap();
        let mut matching = matched_roots_and_leaves(&old, &new);
        CommonalityPathMatcher
            .match_trees(&old.0, &new.0, &mut matching, &comparator)
            .unwrap();
        assert_eq!(matching.len(), 4);
    }

    #[test]
    fn test_labels_must_agree() {
        let old = nested();
        let new_root = new_element("description", &[], None);
        let choose = new_element("choose", &[("mode", "exclusive")], None);
        let alternative = new_element("alternative", &[("condition", "true")], None);
        let new_call = new_element("call", &[("endpoint", "A")], None);
        NodeInner::append_child(&alternative, new_call.clone());
        NodeInner::append_child(&choose, alternative.clone());
        NodeInner::append_child(&new_root, choose.clone());

        let comparator = Comparator::new(&DiffConfig::default()).unwrap();
        let mut matching = Matching::new();
        matching.match_nodes(&new_root, &old.0).unwrap();
        matching.match_nodes(&new_call, &old.3).unwrap();
        PathMatcher.match_trees(&old.0, &new_root, &mut matching, &comparator).unwrap();

        assert!(!matching.is_matched(&choose));
        assert!(!matching.is_matched(&alternative));
    }
}
