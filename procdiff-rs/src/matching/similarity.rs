//! Matching of similar leaf activities.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use tracing::trace;

use super::{Matcher, Matching};
use crate::compare::Comparator;
use crate::error::Result;
use crate::node::{pre_order, Label, NodeRef};

/// Matches every unmatched new leaf to the most similar unmatched old leaf
/// with the same label.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimilarityMatcher;

/// Like [`SimilarityMatcher`], but calls are only compared to calls of the
/// same endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct FastSimilarityMatcher;

impl Matcher for SimilarityMatcher {
    fn match_trees(
        &self,
        old: &NodeRef,
        new: &NodeRef,
        matching: &mut Matching,
        comparator: &Comparator,
    ) -> Result<()> {
        match_leaves(old, new, matching, comparator, false)
    }
}

impl Matcher for FastSimilarityMatcher {
    fn match_trees(
        &self,
        old: &NodeRef,
        new: &NodeRef,
        matching: &mut Matching,
        comparator: &Comparator,
    ) -> Result<()> {
        match_leaves(old, new, matching, comparator, true)
    }
}

type BucketKey = (Label, Option<String>);

fn bucket_key(node: &NodeRef, with_endpoint: bool) -> BucketKey {
    let borrowed = node.borrow();
    let endpoint = if with_endpoint && *borrowed.label() == Label::Call {
        borrowed.attribute("endpoint").map(str::to_string)
    } else {
        None
    };
    (borrowed.label().clone(), endpoint)
}

/// A provisional assignment of an old leaf to a new leaf.
struct Claim {
    old: NodeRef,
    new: NodeRef,
    value: f64,
}

fn match_leaves(
    old: &NodeRef,
    new: &NodeRef,
    matching: &mut Matching,
    comparator: &Comparator,
    with_endpoint: bool,
) -> Result<()> {
    let mut candidates: FxHashMap<BucketKey, Vec<NodeRef>> = FxHashMap::default();
    for node in pre_order(old) {
        if node.borrow().is_leaf() && !matching.is_matched(&node) {
            candidates
                .entry(bucket_key(&node, with_endpoint))
                .or_default()
                .push(node);
        }
    }

    // Keyed by old node id, which follows creation order
    let mut claims: BTreeMap<u64, Claim> = BTreeMap::new();

    for new_node in pre_order(new) {
        if !new_node.borrow().is_leaf() || matching.is_matched(&new_node) {
            continue;
        }
        let Some(bucket) = candidates.get(&bucket_key(&new_node, with_endpoint)) else {
            continue;
        };

        let mut best: Option<(&NodeRef, f64)> = None;
        for old_node in bucket {
            if matching.is_matched(old_node) {
                continue;
            }
            let value = comparator.compare(old_node, &new_node);
            let claimed = claims.get(&old_node.borrow().id()).map(|claim| claim.value);
            if claimed.is_some_and(|claimed| value > claimed) {
                continue;
            }
            if best.map_or(true, |(_, best_value)| value < best_value) {
                best = Some((old_node, value));
                if value == 0.0 {
                    break;
                }
            }
        }

        let Some((old_node, value)) = best else {
            continue;
        };
        let old_id = old_node.borrow().id();
        if value == 0.0 {
            claims.remove(&old_id);
            matching.match_nodes(&new_node, old_node)?;
            continue;
        }
        claims.insert(
            old_id,
            Claim {
                old: old_node.clone(),
                new: new_node.clone(),
                value,
            },
        );
    }

    let threshold = comparator.config().comparison_threshold;
    for claim in claims.into_values() {
        if claim.value <= threshold {
            trace!(value = claim.value, "matching similar leaves");
            matching.match_nodes(&claim.new, &claim.old)?;
        }
    }
    Ok(())
}
