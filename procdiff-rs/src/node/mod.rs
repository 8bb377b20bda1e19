//! Node structures for process tree representation.
//!
//! A process tree is a tree of `NodeInner` values behind `Rc<RefCell<_>>`.
//! Parents own their children; a child only keeps a weak reference to its
//! parent plus its position among its siblings. Both are maintained by the
//! structural helpers on `NodeInner`, which are the only way to change the
//! shape of a tree.

mod label;
mod traverse;

pub use label::{Label, LabelTraits};
pub use traverse::{ancestors, post_order, pre_order, DfsTreeIterator};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use rustc_hash::FxHashMap;

/// Global counter for generating unique node IDs.
static NODE_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Generates a unique node ID.
fn next_node_id() -> u64 {
    NODE_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// A reference-counted pointer to a node.
pub type NodeRef = Rc<RefCell<NodeInner>>;

/// A weak reference to a node, used for parent links.
pub type WeakNodeRef = Weak<RefCell<NodeInner>>;

/// The inner data of a node in a process tree.
#[derive(Debug)]
pub struct NodeInner {
    /// Unique identifier for this node.
    id: u64,
    label: Label,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    children: Vec<NodeRef>,
    /// Weak reference to parent node.
    parent: WeakNodeRef,
    /// Zero-based position among siblings (0 for the root).
    index: usize,
}

impl NodeInner {
    /// Creates a detached node with the given label.
    pub fn new(label: Label) -> Self {
        NodeInner {
            id: next_node_id(),
            label,
            attributes: BTreeMap::new(),
            text: None,
            children: Vec::new(),
            parent: Weak::new(),
            index: 0,
        }
    }

    /// Returns the unique ID of this node.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn set_label(&mut self, label: Label) {
        self.label = label;
    }

    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn set_attributes(&mut self, attributes: BTreeMap<String, String>) {
        self.attributes = attributes;
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn set_text(&mut self, text: Option<String>) {
        self.text = text;
    }

    /// Returns the number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Returns a reference to the child at the given index.
    pub fn child(&self, index: usize) -> Option<&NodeRef> {
        self.children.get(index)
    }

    /// Returns the children as a slice.
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Returns the parent, if this node is attached to one.
    pub fn parent(&self) -> Option<NodeRef> {
        self.parent.upgrade()
    }

    /// Returns true if this node has no parent.
    pub fn is_root(&self) -> bool {
        self.parent.upgrade().is_none()
    }

    /// Returns the position of this node among its siblings.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_leaf(&self) -> bool {
        self.label.is_leaf()
    }

    pub fn is_inner(&self) -> bool {
        self.label.is_inner()
    }

    pub fn is_property(&self) -> bool {
        self.label.is_property()
    }

    pub fn has_internal_ordering(&self) -> bool {
        self.label.has_internal_ordering()
    }

    /// Tests label, attribute and text equality, ignoring children.
    pub fn content_equals(&self, other: &NodeInner) -> bool {
        self.label == other.label && self.attributes == other.attributes && self.text == other.text
    }

    /// Copies label, attributes and text from another node.
    pub fn copy_content_from(&mut self, other: &NodeInner) {
        self.label = other.label.clone();
        self.attributes = other.attributes.clone();
        self.text = other.text.clone();
    }

    /// Creates a detached node with the same content but a fresh identity.
    pub fn shallow_copy(&self) -> NodeInner {
        let mut copy = NodeInner::new(self.label.clone());
        copy.attributes = self.attributes.clone();
        copy.text = self.text.clone();
        copy
    }
}

/// Structural helpers that work on `NodeRef`.
impl NodeInner {
    /// Appends a child node.
    pub fn append_child(parent_ref: &NodeRef, child_ref: NodeRef) {
        let index = parent_ref.borrow().children.len();
        Self::insert_child(parent_ref, index, child_ref);
    }

    /// Inserts a child at the given index (clamped to the child count).
    pub fn insert_child(parent_ref: &NodeRef, index: usize, child_ref: NodeRef) {
        let index = index.min(parent_ref.borrow().children.len());
        {
            let mut child = child_ref.borrow_mut();
            child.parent = Rc::downgrade(parent_ref);
            child.index = index;
        }
        let mut parent = parent_ref.borrow_mut();
        parent.children.insert(index, child_ref);
        // Update child positions for siblings after the insertion point
        for i in (index + 1)..parent.children.len() {
            parent.children[i].borrow_mut().index = i;
        }
    }

    /// Removes and returns the child at the given index.
    pub fn remove_child(parent_ref: &NodeRef, index: usize) -> Option<NodeRef> {
        let removed = {
            let mut parent = parent_ref.borrow_mut();
            if index >= parent.children.len() {
                return None;
            }
            let removed = parent.children.remove(index);
            for i in index..parent.children.len() {
                parent.children[i].borrow_mut().index = i;
            }
            removed
        };
        {
            let mut child = removed.borrow_mut();
            child.parent = Weak::new();
            child.index = 0;
        }
        Some(removed)
    }

    /// Detaches a node from its parent. Does nothing for a root.
    pub fn detach(node_ref: &NodeRef) {
        let (parent, index) = {
            let node = node_ref.borrow();
            (node.parent.upgrade(), node.index)
        };
        if let Some(parent) = parent {
            Self::remove_child(&parent, index);
        }
    }

    /// Gets the left sibling of a node.
    pub fn left_sibling_of_ref(node_ref: &NodeRef) -> Option<NodeRef> {
        let node = node_ref.borrow();
        if node.index == 0 {
            return None;
        }
        let parent = node.parent.upgrade()?;
        let sibling = parent.borrow().children.get(node.index - 1).cloned();
        sibling
    }

    /// Gets the right sibling of a node.
    pub fn right_sibling_of_ref(node_ref: &NodeRef) -> Option<NodeRef> {
        let node = node_ref.borrow();
        let parent = node.parent.upgrade()?;
        let sibling = parent.borrow().children.get(node.index + 1).cloned();
        sibling
    }
}

/// Creates a new detached node wrapped in a `NodeRef`.
pub fn new_node(label: Label) -> NodeRef {
    Rc::new(RefCell::new(NodeInner::new(label)))
}

/// Creates a new node from a tag name, attributes and optional text.
pub fn new_element(tag: &str, attributes: &[(&str, &str)], text: Option<&str>) -> NodeRef {
    let node = new_node(Label::parse(tag));
    {
        let mut inner = node.borrow_mut();
        for (key, value) in attributes {
            inner.set_attribute(*key, *value);
        }
        inner.set_text(text.map(str::to_string));
    }
    node
}

/// Returns the slash separated child index path of a node, "" for the root.
pub fn path(node: &NodeRef) -> String {
    let mut indices = Vec::new();
    let mut current = node.clone();
    loop {
        let parent = current.borrow().parent();
        match parent {
            Some(parent) => {
                indices.push(current.borrow().index().to_string());
                current = parent;
            }
            None => break,
        }
    }
    indices.reverse();
    indices.join("/")
}

/// Parses a path produced by [`path`] into child indices.
pub fn parse_path(path: &str) -> Option<Vec<usize>> {
    if path.is_empty() {
        return Some(Vec::new());
    }
    path.split('/').map(|part| part.parse().ok()).collect()
}

/// Resolves a path relative to the given root.
pub fn resolve_path(root: &NodeRef, path: &str) -> Option<NodeRef> {
    let mut current = root.clone();
    for index in parse_path(path)? {
        let next = current.borrow().child(index).cloned()?;
        current = next;
    }
    Some(current)
}

/// Returns the number of nodes in the subtree rooted at `node`.
pub fn subtree_size(node: &NodeRef) -> usize {
    DfsTreeIterator::new(node.clone()).count()
}

/// Deep copies a subtree. The copy has fresh node identities.
pub fn deep_copy(node: &NodeRef) -> NodeRef {
    deep_copy_with_map(node, &mut FxHashMap::default())
}

/// Deep copies a subtree, recording `original id -> copy` for every node.
pub fn deep_copy_with_map(node: &NodeRef, map: &mut FxHashMap<u64, NodeRef>) -> NodeRef {
    let (copy, children) = {
        let borrowed = node.borrow();
        let copy = Rc::new(RefCell::new(borrowed.shallow_copy()));
        map.insert(borrowed.id(), copy.clone());
        (copy, borrowed.children().to_vec())
    };
    for child in &children {
        let child_copy = deep_copy_with_map(child, map);
        NodeInner::append_child(&copy, child_copy);
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> (NodeRef, NodeRef, NodeRef, NodeRef) {
        let root = new_element("description", &[], None);
        let a = new_element("call", &[("id", "a1")], None);
        let b = new_element("loop", &[("mode", "pre_test")], None);
        let c = new_element("manipulate", &[("id", "a2")], Some("data.x = 1"));
        NodeInner::append_child(&root, a.clone());
        NodeInner::append_child(&root, b.clone());
        NodeInner::append_child(&b, c.clone());
        (root, a, b, c)
    }

    #[test]
    fn test_add_child() {
        let (root, a, b, _) = sample_tree();
        assert_eq!(root.borrow().child_count(), 2);
        assert_eq!(a.borrow().index(), 0);
        assert_eq!(b.borrow().index(), 1);
        assert!(root.borrow().is_root());
        assert!(!a.borrow().is_root());
    }

    #[test]
    fn test_siblings() {
        let (_root, a, b, c) = sample_tree();
        assert!(NodeInner::left_sibling_of_ref(&a).is_none());
        let right = NodeInner::right_sibling_of_ref(&a).unwrap();
        assert_eq!(right.borrow().id(), b.borrow().id());
        assert!(NodeInner::right_sibling_of_ref(&b).is_none());
        assert!(NodeInner::left_sibling_of_ref(&c).is_none());
    }

    #[test]
    fn test_insert_and_remove_fix_indices() {
        let (root, a, b, _) = sample_tree();
        let inserted = new_element("stop", &[], None);
        NodeInner::insert_child(&root, 1, inserted.clone());
        assert_eq!(a.borrow().index(), 0);
        assert_eq!(inserted.borrow().index(), 1);
        assert_eq!(b.borrow().index(), 2);

        let removed = NodeInner::remove_child(&root, 0).unwrap();
        assert_eq!(removed.borrow().id(), a.borrow().id());
        assert!(a.borrow().parent().is_none());
        assert_eq!(inserted.borrow().index(), 0);
        assert_eq!(b.borrow().index(), 1);
        assert!(NodeInner::remove_child(&root, 5).is_none());
    }

    #[test]
    fn test_detach() {
        let (root, a, b, _) = sample_tree();
        NodeInner::detach(&a);
        assert_eq!(root.borrow().child_count(), 1);
        assert_eq!(b.borrow().index(), 0);
        // Detaching a root is a no-op
        NodeInner::detach(&root);
        assert_eq!(root.borrow().child_count(), 1);
    }

    #[test]
    fn test_paths() {
        let (root, a, b, c) = sample_tree();
        assert_eq!(path(&root), "");
        assert_eq!(path(&a), "0");
        assert_eq!(path(&c), "1/0");

        let resolved = resolve_path(&root, "1/0").unwrap();
        assert_eq!(resolved.borrow().id(), c.borrow().id());
        let resolved = resolve_path(&root, "1").unwrap();
        assert_eq!(resolved.borrow().id(), b.borrow().id());
        assert!(resolve_path(&root, "3").is_none());
        assert!(resolve_path(&root, "x/1").is_none());
        assert!(resolve_path(&root, "").is_some());
    }

    #[test]
    fn test_deep_copy_preserves_structure() {
        let (root, _, _, c) = sample_tree();
        let mut map = FxHashMap::default();
        let copy = deep_copy_with_map(&root, &mut map);

        assert_eq!(subtree_size(&copy), 4);
        assert_eq!(map.len(), 4);
        assert_ne!(copy.borrow().id(), root.borrow().id());

        let c_copy = map.get(&c.borrow().id()).unwrap();
        assert!(c_copy.borrow().content_equals(&c.borrow()));
        assert_eq!(path(c_copy), "1/0");
    }

    #[test]
    fn test_unique_node_ids() {
        let n1 = new_node(Label::Call);
        let n2 = new_node(Label::Call);
        assert_ne!(n1.borrow().id(), n2.borrow().id());
    }
}
