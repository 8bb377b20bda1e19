//! Edit script generation.
//!
//! The generator replays the difference on a copy of the old tree, the
//! working tree, so that every recorded path is valid at the moment its
//! operation is applied:
//!
//! 1. A pre-order walk of the new tree moves matched nodes below the
//!    counterpart of their new parent, updates changed content and inserts
//!    unmatched nodes.
//! 2. A post-order walk of the working tree deletes the unmatched subtrees
//!    that are left.
//! 3. The children of ordered nodes are aligned with the new tree, keeping
//!    the longest increasing subsequence in place.
//!
//! Finally the script is replayed on the old tree and the result is checked
//! against the new tree.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::{EditOperation, EditScript, Patcher};
use crate::config::DiffConfig;
use crate::error::{Error, Result};
use crate::extract::{Extractor, HashExtractor};
use crate::matching::Matching;
use crate::node::{
    deep_copy, deep_copy_with_map, path, post_order, pre_order, subtree_size, DfsTreeIterator,
    NodeInner, NodeRef,
};
use crate::sequence::longest_increasing_subsequence;

/// Generates edit scripts from matchings.
#[derive(Debug, Clone)]
pub struct EditScriptGenerator {
    /// Align the children of unordered nodes as well.
    exact: bool,
}

impl EditScriptGenerator {
    pub fn new(config: &DiffConfig) -> Self {
        EditScriptGenerator {
            exact: config.exact_edit_script,
        }
    }

    /// Generates the script that turns `old` into `new`.
    ///
    /// `matching` pairs nodes of `old` with nodes of `new`. Neither tree is
    /// modified.
    pub fn generate(&self, old: &NodeRef, new: &NodeRef, matching: &Matching) -> Result<EditScript> {
        let mut state = GeneratorState::new(old, new, matching)?;

        state.insert_move_update(new)?;
        debug!(
            insertions = state.script.insertions(),
            moves = state.script.moves(),
            updates = state.script.updates(),
            "placed new tree nodes"
        );

        state.delete_unmatched()?;
        debug!(deletions = state.script.deletions(), "deleted unmatched subtrees");

        let before = state.script.moves();
        state.align_all(self.exact)?;
        debug!(moves = state.script.moves() - before, "aligned child order");

        let script = state.script;
        verify(old, new, &script)?;
        debug!(operations = script.len(), cost = script.cost(), "edit script generated");
        Ok(script)
    }
}

struct GeneratorState {
    working: NodeRef,
    /// Pairs of new nodes with working tree nodes.
    matching: Matching,
    script: EditScript,
}

impl GeneratorState {
    fn new(old: &NodeRef, new: &NodeRef, matching: &Matching) -> Result<Self> {
        let mut copies = FxHashMap::default();
        let working = deep_copy_with_map(old, &mut copies);

        let mut translated = Matching::new();
        for (old_node, new_node) in matching.pairs() {
            let copy = copies
                .get(&old_node.borrow().id())
                .ok_or_else(|| Error::Invariant("matched node is not part of the old tree".to_string()))?;
            translated.match_nodes(new_node, copy)?;
        }

        match translated.get_match_of_new(new) {
            Some(root_match) if root_match.borrow().id() == working.borrow().id() => {}
            Some(_) => {
                return Err(Error::Invariant(
                    "the new root is matched to a node other than the old root".to_string(),
                ))
            }
            None => translated.match_nodes(new, &working)?,
        }

        Ok(GeneratorState {
            working,
            matching: translated,
            script: EditScript::new(),
        })
    }

    /// First pass over the new tree in pre-order.
    fn insert_move_update(&mut self, new: &NodeRef) -> Result<()> {
        for node in pre_order(new) {
            let parent = node.borrow().parent();
            let Some(parent) = parent else {
                let root = self.working.clone();
                self.update_if_changed(&node, &root);
                continue;
            };
            let target_parent = self.matching.get_match_of_new(&parent).cloned().ok_or_else(|| {
                Error::Invariant("parent of a new node has no working counterpart".to_string())
            })?;

            match self.matching.get_match_of_new(&node).cloned() {
                Some(working_node) => {
                    let current_parent = working_node.borrow().parent();
                    let in_place = current_parent
                        .is_some_and(|p| p.borrow().id() == target_parent.borrow().id());
                    if !in_place {
                        let old_path = path(&working_node);
                        NodeInner::detach(&working_node);
                        let index = self.target_index(&node);
                        NodeInner::insert_child(&target_parent, index, working_node.clone());
                        self.script
                            .push(EditOperation::moved(old_path, path(&working_node)), 1);
                    }
                    self.update_if_changed(&node, &working_node);
                }
                None => {
                    let mut pairs = Vec::new();
                    let copy = self.pruned_copy(&node, &mut pairs);
                    let index = self.target_index(&node);
                    NodeInner::insert_child(&target_parent, index, copy.clone());
                    self.script.push(
                        EditOperation::insert(path(&copy), deep_copy(&copy)),
                        subtree_size(&copy),
                    );
                    for (new_node, inserted) in pairs {
                        self.matching.match_nodes(&new_node, &inserted)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Second pass: removes every maximal unmatched subtree.
    fn delete_unmatched(&mut self) -> Result<()> {
        for node in post_order(&self.working) {
            if self.matching.is_matched(&node) {
                continue;
            }
            let parent = node.borrow().parent();
            let Some(parent) = parent else {
                return Err(Error::Invariant("the working root is unmatched".to_string()));
            };
            if !self.matching.is_matched(&parent) {
                continue;
            }
            if DfsTreeIterator::new(node.clone()).any(|n| self.matching.is_matched(&n)) {
                return Err(Error::Invariant(
                    "a matched node is left inside a deleted subtree".to_string(),
                ));
            }
            let old_path = path(&node);
            let size = subtree_size(&node);
            NodeInner::detach(&node);
            self.script.push(EditOperation::delete(old_path), size);
        }
        Ok(())
    }

    /// Third pass over the working tree.
    fn align_all(&mut self, exact: bool) -> Result<()> {
        for node in pre_order(&self.working) {
            let (ordered, child_count) = {
                let borrowed = node.borrow();
                (borrowed.has_internal_ordering(), borrowed.child_count())
            };
            if (ordered || exact) && child_count > 1 {
                self.align_children(&node)?;
            }
        }
        Ok(())
    }

    /// Moves children outside the longest increasing run of targets into place.
    ///
    /// Each one goes before the first placed sibling with a larger target, which
    /// keeps the order monotonic even when its predecessor is not placed yet.
    fn align_children(&mut self, parent: &NodeRef) -> Result<()> {
        let children = parent.borrow().children().to_vec();
        let mut targets: FxHashMap<u64, usize> = FxHashMap::default();
        let mut sequence = Vec::with_capacity(children.len());
        for child in &children {
            let target = self
                .matching
                .get_match_of_old(child)
                .map(|n| n.borrow().index())
                .ok_or_else(|| Error::Invariant("unmatched node left after deletion".to_string()))?;
            targets.insert(child.borrow().id(), target);
            sequence.push(target);
        }

        let mut in_place: FxHashSet<u64> = longest_increasing_subsequence(&sequence)
            .into_iter()
            .map(|i| children[i].borrow().id())
            .collect();

        for child in &children {
            let id = child.borrow().id();
            if in_place.contains(&id) {
                continue;
            }
            let target = targets[&id];
            let old_path = path(child);
            NodeInner::detach(child);
            let index = {
                let borrowed = parent.borrow();
                borrowed
                    .children()
                    .iter()
                    .position(|c| {
                        let c_id = c.borrow().id();
                        in_place.contains(&c_id) && targets[&c_id] > target
                    })
                    .unwrap_or(borrowed.child_count())
            };
            NodeInner::insert_child(parent, index, child.clone());
            self.script.push(EditOperation::moved(old_path, path(child)), 1);
            in_place.insert(id);
        }

        let aligned = parent
            .borrow()
            .children()
            .windows(2)
            .all(|pair| targets[&pair[0].borrow().id()] < targets[&pair[1].borrow().id()]);
        if !aligned {
            return Err(Error::Invariant("child order is not monotonic after alignment".to_string()));
        }
        Ok(())
    }

    /// Position below the target parent: right after the counterpart of the
    /// left sibling in the new tree, or first.
    fn target_index(&self, new_node: &NodeRef) -> usize {
        NodeInner::left_sibling_of_ref(new_node)
            .and_then(|left| {
                self.matching
                    .get_match_of_new(&left)
                    .map(|w| w.borrow().index() + 1)
            })
            .unwrap_or(0)
    }

    /// Copies a new node together with its unmatched descendants. Matched
    /// descendants are moved in later.
    fn pruned_copy(&self, node: &NodeRef, pairs: &mut Vec<(NodeRef, NodeRef)>) -> NodeRef {
        let (copy, children) = {
            let borrowed = node.borrow();
            (
                Rc::new(RefCell::new(borrowed.shallow_copy())),
                borrowed.children().to_vec(),
            )
        };
        pairs.push((node.clone(), copy.clone()));
        for child in &children {
            if !self.matching.is_matched(child) {
                let child_copy = self.pruned_copy(child, pairs);
                NodeInner::append_child(&copy, child_copy);
            }
        }
        copy
    }

    fn update_if_changed(&mut self, new_node: &NodeRef, working_node: &NodeRef) {
        if working_node.borrow().content_equals(&new_node.borrow()) {
            return;
        }
        let payload = Rc::new(RefCell::new(new_node.borrow().shallow_copy()));
        self.script
            .push(EditOperation::update(path(working_node), payload), 1);
        working_node.borrow_mut().copy_content_from(&new_node.borrow());
    }
}

/// Replays the script on the old tree and compares the result with the new
/// tree.
fn verify(old: &NodeRef, new: &NodeRef, script: &EditScript) -> Result<()> {
    let patched = Patcher::new(old).apply(script)?;
    let hasher = HashExtractor::new();
    if hasher.get(&patched) != hasher.get(new) {
        return Err(Error::Invariant(
            "replaying the edit script does not yield the new tree".to_string(),
        ));
    }
    Ok(())
}
