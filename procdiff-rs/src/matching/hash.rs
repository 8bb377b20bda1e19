//! Matching of identical subtrees.

use rustc_hash::FxHashMap;
use tracing::trace;

use super::{Matcher, Matching};
use crate::compare::Comparator;
use crate::error::{Error, Result};
use crate::extract::{Extractor, HashExtractor};
use crate::node::{pre_order, DfsTreeIterator, NodeRef};

/// Matches structurally identical subtrees by their hash.
///
/// Candidates are grouped by hash and the groups are processed from the
/// largest subtree down, so a big identical region is claimed as a whole
/// before its parts could be matched elsewhere. Within a group, pairs at a
/// similar position are preferred.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashMatcher;

impl Matcher for HashMatcher {
    fn match_trees(
        &self,
        old: &NodeRef,
        new: &NodeRef,
        matching: &mut Matching,
        comparator: &Comparator,
    ) -> Result<()> {
        let extractors = comparator.extractors();
        let hasher = &extractors.hash;

        // hash -> (old candidates, new candidates), in order of first appearance
        let mut buckets: FxHashMap<u64, (Vec<NodeRef>, Vec<NodeRef>)> = FxHashMap::default();
        let mut order: Vec<u64> = Vec::new();
        for node in pre_order(new) {
            if node.borrow().is_property() || matching.is_matched(&node) {
                continue;
            }
            let hash = hasher.get(&node);
            let bucket = buckets.entry(hash).or_insert_with(|| {
                order.push(hash);
                (Vec::new(), Vec::new())
            });
            bucket.1.push(node);
        }
        for node in pre_order(old) {
            if node.borrow().is_property() || matching.is_matched(&node) {
                continue;
            }
            if let Some(bucket) = buckets.get_mut(&hasher.get(&node)) {
                bucket.0.push(node);
            }
        }

        // Largest subtrees first
        order.retain(|hash| buckets.get(hash).is_some_and(|(olds, _)| !olds.is_empty()));
        order.sort_by_key(|hash| {
            let size = buckets
                .get(hash)
                .and_then(|(_, news)| news.first())
                .map(|n| extractors.element_size.get(n))
                .unwrap_or(0);
            std::cmp::Reverse(size)
        });

        for hash in order {
            let Some((olds, news)) = buckets.get(&hash) else {
                continue;
            };
            let mut pairs: Vec<(f64, &NodeRef, &NodeRef)> = Vec::with_capacity(olds.len() * news.len());
            for new_node in news {
                for old_node in olds {
                    let position = comparator
                        .compare_position(old_node, new_node)
                        .unwrap_or(0.0);
                    pairs.push((position, old_node, new_node));
                }
            }
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            for (_, old_node, new_node) in pairs {
                if !is_wholly_unmatched(old_node, matching) || !is_wholly_unmatched(new_node, matching)
                {
                    continue;
                }
                let (old_size, new_size) = (extractors.size.get(old_node), extractors.size.get(new_node));
                if old_size != new_size {
                    return Err(Error::HashCollision { old_size, new_size });
                }
                trace!(hash, size = old_size, "matching identical subtrees");
                match_subtrees(old_node, new_node, matching, hasher)?;
            }
        }
        Ok(())
    }
}

fn is_wholly_unmatched(root: &NodeRef, matching: &Matching) -> bool {
    DfsTreeIterator::new(root.clone()).all(|node| !matching.is_matched(&node))
}

/// Matches two subtrees with equal hash node by node, in parallel pre-order.
fn match_subtrees(
    old: &NodeRef,
    new: &NodeRef,
    matching: &mut Matching,
    hasher: &HashExtractor,
) -> Result<()> {
    matching.match_nodes(new, old)?;

    let old_children = sorted_children(old, hasher);
    let new_children = sorted_children(new, hasher);
    if old_children.len() != new_children.len() {
        return Err(Error::HashCollision {
            old_size: old_children.len(),
            new_size: new_children.len(),
        });
    }
    for (old_child, new_child) in old_children.iter().zip(&new_children) {
        match_subtrees(old_child, new_child, matching, hasher)?;
    }
    Ok(())
}

/// Children in document order, or stably sorted by hash if their order
/// carries no meaning.
fn sorted_children(node: &NodeRef, hasher: &HashExtractor) -> Vec<NodeRef> {
    let (ordered, mut children) = {
        let borrowed = node.borrow();
        (borrowed.has_internal_ordering(), borrowed.children().to_vec())
    };
    if !ordered {
        children.sort_by_cached_key(|child| hasher.get(child));
    }
    children
}
