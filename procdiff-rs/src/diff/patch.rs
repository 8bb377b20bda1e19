//! Replay of edit scripts.

use tracing::debug;

use super::{EditKind, EditOperation, EditScript};
use crate::error::{Error, Result};
use crate::node::{deep_copy, parse_path, resolve_path, NodeInner, NodeRef};

/// Applies edit scripts to a copy of an old tree.
pub struct Patcher {
    old: NodeRef,
}

impl Patcher {
    /// Creates a patcher for the given old tree. The tree itself is never
    /// modified.
    pub fn new(old: &NodeRef) -> Self {
        Patcher { old: old.clone() }
    }

    /// Replays the script in order and returns the patched tree.
    pub fn apply(&self, script: &EditScript) -> Result<NodeRef> {
        let root = deep_copy(&self.old);
        for (i, operation) in script.iter().enumerate() {
            apply_operation(&root, operation)
                .map_err(|e| Error::Patch(format!("operation {} ({}): {}", i, operation, e)))?;
        }
        debug!(operations = script.len(), "patch applied");
        Ok(root)
    }
}

fn apply_operation(root: &NodeRef, operation: &EditOperation) -> Result<()> {
    match operation.kind() {
        EditKind::Insert => {
            let payload = payload(operation)?;
            let (parent, index) = insertion_point(root, new_path(operation)?)?;
            NodeInner::insert_child(&parent, index, deep_copy(payload));
        }
        EditKind::Delete => {
            let node = resolve_non_root(root, old_path(operation)?)?;
            NodeInner::detach(&node);
        }
        EditKind::Move => {
            let node = resolve_non_root(root, old_path(operation)?)?;
            NodeInner::detach(&node);
            let (parent, index) = insertion_point(root, new_path(operation)?)?;
            NodeInner::insert_child(&parent, index, node);
        }
        EditKind::Update => {
            let payload = payload(operation)?;
            let node = resolve(root, old_path(operation)?)?;
            node.borrow_mut().copy_content_from(&payload.borrow());
        }
    }
    Ok(())
}

fn payload(operation: &EditOperation) -> Result<&NodeRef> {
    operation
        .payload()
        .ok_or_else(|| Error::Patch("missing payload".to_string()))
}

fn old_path(operation: &EditOperation) -> Result<&str> {
    operation
        .old_path()
        .ok_or_else(|| Error::Patch("missing old path".to_string()))
}

fn new_path(operation: &EditOperation) -> Result<&str> {
    operation
        .new_path()
        .ok_or_else(|| Error::Patch("missing new path".to_string()))
}

fn resolve(root: &NodeRef, path: &str) -> Result<NodeRef> {
    resolve_path(root, path).ok_or_else(|| Error::Patch(format!("no node at path \"{}\"", path)))
}

fn resolve_non_root(root: &NodeRef, path: &str) -> Result<NodeRef> {
    if path.is_empty() {
        return Err(Error::Patch("the root cannot be moved or deleted".to_string()));
    }
    resolve(root, path)
}

/// Splits a path into the parent node and the child index to insert at.
fn insertion_point(root: &NodeRef, path: &str) -> Result<(NodeRef, usize)> {
    let mut indices =
        parse_path(path).ok_or_else(|| Error::Patch(format!("malformed path \"{}\"", path)))?;
    let index = indices
        .pop()
        .ok_or_else(|| Error::Patch("cannot insert at the root".to_string()))?;

    let mut parent = root.clone();
    for i in indices {
        let next = parent
            .borrow()
            .child(i)
            .cloned()
            .ok_or_else(|| Error::Patch(format!("no node at path \"{}\"", path)))?;
        parent = next;
    }
    if index > parent.borrow().child_count() {
        return Err(Error::Patch(format!("index out of range in path \"{}\"", path)));
    }
    Ok((parent, index))
}
