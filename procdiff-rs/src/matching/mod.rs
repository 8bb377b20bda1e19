//! Tree matching.
//!
//! A [`Matching`] is a partial bijection between the nodes of the old and the
//! new tree. It is built by a [`MatchPipeline`] of [`Matcher`]s, each of which
//! only adds pairs between nodes that are still unmatched. Later stages build
//! on the evidence of earlier ones: identical subtrees first, then similar
//! leaves, then the inner nodes above matched leaves.

mod fixed;
mod hash;
mod path;
mod pipeline;
mod property;
mod similarity;
mod unmatched;

pub use fixed::FixedMatcher;
pub use hash::HashMatcher;
pub use path::{CommonalityPathMatcher, PathMatcher};
pub use pipeline::{MatchPipeline, Stage};
pub use property::PropertyMatcher;
pub use similarity::{FastSimilarityMatcher, SimilarityMatcher};
pub use unmatched::UnmatchedMatcher;

use rustc_hash::FxHashMap;

use crate::compare::Comparator;
use crate::error::{Error, Result};
use crate::node::NodeRef;

/// Trait for tree matching algorithms.
///
/// Implementations never overwrite an existing pair and are idempotent:
/// running a matcher twice adds nothing the second time.
pub trait Matcher {
    /// Adds pairs between unmatched nodes of `old` and `new` to `matching`.
    fn match_trees(
        &self,
        old: &NodeRef,
        new: &NodeRef,
        matching: &mut Matching,
        comparator: &Comparator,
    ) -> Result<()>;
}

/// Bidirectional node matching keyed by node id.
#[derive(Debug, Default, Clone)]
pub struct Matching {
    old_to_new: FxHashMap<u64, NodeRef>,
    new_to_old: FxHashMap<u64, NodeRef>,
}

impl Matching {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `new <-> old`.
    ///
    /// Fails if either node already takes part in a pair.
    pub fn match_nodes(&mut self, new: &NodeRef, old: &NodeRef) -> Result<()> {
        let (new_id, old_id) = (new.borrow().id(), old.borrow().id());
        if self.new_to_old.contains_key(&new_id) || self.old_to_new.contains_key(&old_id) {
            return Err(Error::AlreadyMatched {
                old: old_id,
                new: new_id,
            });
        }
        self.new_to_old.insert(new_id, old.clone());
        self.old_to_new.insert(old_id, new.clone());
        Ok(())
    }

    /// Returns true if the node is matched, on either side.
    pub fn is_matched(&self, node: &NodeRef) -> bool {
        let id = node.borrow().id();
        self.new_to_old.contains_key(&id) || self.old_to_new.contains_key(&id)
    }

    /// Returns the old node matched to a new node.
    pub fn get_match_of_new(&self, new: &NodeRef) -> Option<&NodeRef> {
        self.new_to_old.get(&new.borrow().id())
    }

    /// Returns the new node matched to an old node.
    pub fn get_match_of_old(&self, old: &NodeRef) -> Option<&NodeRef> {
        self.old_to_new.get(&old.borrow().id())
    }

    /// Returns the number of matched pairs.
    pub fn len(&self) -> usize {
        self.new_to_old.len()
    }

    pub fn is_empty(&self) -> bool {
        self.new_to_old.is_empty()
    }

    /// Iterates over all `(old, new)` pairs in unspecified order.
    pub fn pairs(&self) -> impl Iterator<Item = (&NodeRef, &NodeRef)> {
        self.old_to_new.values().filter_map(move |new| {
            self.new_to_old
                .get(&new.borrow().id())
                .map(|old| (old, new))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::new_element;

    #[test]
    fn test_match_is_bidirectional() {
        let old = new_element("call", &[], None);
        let new = new_element("call", &[], None);
        let mut matching = Matching::new();
        matching.match_nodes(&new, &old).unwrap();

        assert!(matching.is_matched(&old));
        assert!(matching.is_matched(&new));
        assert_eq!(matching.get_match_of_new(&new).unwrap().borrow().id(), old.borrow().id());
        assert_eq!(matching.get_match_of_old(&old).unwrap().borrow().id(), new.borrow().id());
        assert_eq!(matching.len(), 1);
        assert_eq!(matching.pairs().count(), 1);
    }

    #[test]
    fn test_double_match_fails() {
        let old = new_element("call", &[], None);
        let other_old = new_element("call", &[], None);
        let new = new_element("call", &[], None);
        let mut matching = Matching::new();
        matching.match_nodes(&new, &old).unwrap();

        let err = matching.match_nodes(&new, &other_old).unwrap_err();
        assert!(matches!(err, Error::AlreadyMatched { .. }));
        assert_eq!(matching.len(), 1);
        assert!(!matching.is_matched(&other_old));
    }
}
