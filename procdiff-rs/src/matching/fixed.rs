//! Matches nodes whose correspondence is known up front.

use super::{Matcher, Matching};
use crate::compare::Comparator;
use crate::error::Result;
use crate::node::NodeRef;

/// Id of the initialisation activity CPEE places first in a process.
const INIT_ID: &str = "init";

/// Matches the two roots, and the first children of both roots when both
/// are the initialisation activity.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedMatcher;

impl Matcher for FixedMatcher {
    fn match_trees(
        &self,
        old: &NodeRef,
        new: &NodeRef,
        matching: &mut Matching,
        _comparator: &Comparator,
    ) -> Result<()> {
        if !matching.is_matched(old) && !matching.is_matched(new) {
            matching.match_nodes(new, old)?;
        }

        let first_old = old.borrow().child(0).cloned();
        let first_new = new.borrow().child(0).cloned();
        if let (Some(first_old), Some(first_new)) = (first_old, first_new) {
            let is_init = |node: &NodeRef| node.borrow().attribute("id") == Some(INIT_ID);
            if is_init(&first_old)
                && is_init(&first_new)
                && !matching.is_matched(&first_old)
                && !matching.is_matched(&first_new)
            {
                matching.match_nodes(&first_new, &first_old)?;
            }
        }
        Ok(())
    }
}
