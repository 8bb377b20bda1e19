//! Edit scripts and their XML form.

use std::fmt;
use std::io::Write;

use tracing::trace;

use super::{COST_ATTR, DELTA_ROOT_TAG, NEW_PATH_ATTR, OLD_PATH_ATTR};
use crate::error::{Error, Result};
use crate::node::{deep_copy, new_element, NodeInner, NodeRef};
use crate::xml::{Preprocessor, XmlPrinter};

/// Kind of an edit operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    Insert,
    Delete,
    Move,
    Update,
}

impl EditKind {
    /// Tag name of the operation in a delta document.
    pub fn tag(&self) -> &'static str {
        match self {
            EditKind::Insert => "insert",
            EditKind::Delete => "delete",
            EditKind::Move => "move",
            EditKind::Update => "update",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "insert" => Some(EditKind::Insert),
            "delete" => Some(EditKind::Delete),
            "move" => Some(EditKind::Move),
            "update" => Some(EditKind::Update),
            _ => None,
        }
    }
}

impl fmt::Display for EditKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag().to_ascii_uppercase())
    }
}

/// A single edit operation.
///
/// Paths are slash separated child indices and refer to the tree as it is
/// when the operation is applied, after all previous operations.
#[derive(Debug, Clone)]
pub struct EditOperation {
    kind: EditKind,
    old_path: Option<String>,
    new_path: Option<String>,
    /// Inserted subtree, or the new content of an updated node.
    payload: Option<NodeRef>,
}

impl EditOperation {
    pub fn insert(new_path: String, payload: NodeRef) -> Self {
        EditOperation {
            kind: EditKind::Insert,
            old_path: None,
            new_path: Some(new_path),
            payload: Some(payload),
        }
    }

    pub fn delete(old_path: String) -> Self {
        EditOperation {
            kind: EditKind::Delete,
            old_path: Some(old_path),
            new_path: None,
            payload: None,
        }
    }

    pub fn moved(old_path: String, new_path: String) -> Self {
        EditOperation {
            kind: EditKind::Move,
            old_path: Some(old_path),
            new_path: Some(new_path),
            payload: None,
        }
    }

    pub fn update(old_path: String, payload: NodeRef) -> Self {
        EditOperation {
            kind: EditKind::Update,
            old_path: Some(old_path),
            new_path: None,
            payload: Some(payload),
        }
    }

    pub fn kind(&self) -> EditKind {
        self.kind
    }

    pub fn old_path(&self) -> Option<&str> {
        self.old_path.as_deref()
    }

    pub fn new_path(&self) -> Option<&str> {
        self.new_path.as_deref()
    }

    pub fn payload(&self) -> Option<&NodeRef> {
        self.payload.as_ref()
    }

    /// Converts the operation into its delta element.
    fn to_element(&self) -> NodeRef {
        let element = new_element(self.kind.tag(), &[], None);
        {
            let mut inner = element.borrow_mut();
            if let Some(old_path) = &self.old_path {
                inner.set_attribute(OLD_PATH_ATTR, old_path.as_str());
            }
            if let Some(new_path) = &self.new_path {
                inner.set_attribute(NEW_PATH_ATTR, new_path.as_str());
            }
        }
        if let Some(payload) = &self.payload {
            NodeInner::append_child(&element, deep_copy(payload));
        }
        element
    }

    /// Reads an operation from its delta element.
    fn from_element(element: &NodeRef) -> Result<Self> {
        let borrowed = element.borrow();
        let tag = borrowed.label().as_str();
        let kind = EditKind::from_tag(tag)
            .ok_or_else(|| Error::Parse(format!("unknown edit operation: {}", tag)))?;
        let attribute = |key: &str| -> Result<String> {
            borrowed
                .attribute(key)
                .map(str::to_string)
                .ok_or_else(|| Error::Parse(format!("{} without {}", tag, key)))
        };
        let payload = || -> Result<NodeRef> {
            let child = borrowed
                .child(0)
                .ok_or_else(|| Error::Parse(format!("{} without payload", tag)))?;
            Ok(deep_copy(child))
        };

        Ok(match kind {
            EditKind::Insert => Self::insert(attribute(NEW_PATH_ATTR)?, payload()?),
            EditKind::Delete => Self::delete(attribute(OLD_PATH_ATTR)?),
            EditKind::Move => Self::moved(attribute(OLD_PATH_ATTR)?, attribute(NEW_PATH_ATTR)?),
            EditKind::Update => Self::update(attribute(OLD_PATH_ATTR)?, payload()?),
        })
    }
}

impl fmt::Display for EditOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(old_path) = &self.old_path {
            write!(f, " {}=\"{}\"", OLD_PATH_ATTR, old_path)?;
        }
        if let Some(new_path) = &self.new_path {
            write!(f, " {}=\"{}\"", NEW_PATH_ATTR, new_path)?;
        }
        if let Some(payload) = &self.payload {
            write!(f, " <{}>", payload.borrow().label())?;
        }
        Ok(())
    }
}

/// An ordered list of edit operations with its total cost.
///
/// Inserts and deletes cost the size of the affected subtree, moves and
/// updates cost 1.
#[derive(Debug, Clone, Default)]
pub struct EditScript {
    operations: Vec<EditOperation>,
    cost: usize,
    insertions: usize,
    deletions: usize,
    moves: usize,
    updates: usize,
}

impl EditScript {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Appends an operation with its cost.
    pub(crate) fn push(&mut self, operation: EditOperation, cost: usize) {
        trace!(cost, "{}", operation);
        match operation.kind {
            EditKind::Insert => self.insertions += 1,
            EditKind::Delete => self.deletions += 1,
            EditKind::Move => self.moves += 1,
            EditKind::Update => self.updates += 1,
        }
        self.cost += cost;
        self.operations.push(operation);
    }

    pub fn operations(&self) -> &[EditOperation] {
        &self.operations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, EditOperation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn cost(&self) -> usize {
        self.cost
    }

    pub fn insertions(&self) -> usize {
        self.insertions
    }

    pub fn deletions(&self) -> usize {
        self.deletions
    }

    pub fn moves(&self) -> usize {
        self.moves
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Builds the delta document of this script.
    pub fn to_delta_tree(&self) -> NodeRef {
        let root = new_element(DELTA_ROOT_TAG, &[], None);
        root.borrow_mut()
            .set_attribute(COST_ATTR, self.cost.to_string());
        for operation in &self.operations {
            NodeInner::append_child(&root, operation.to_element());
        }
        root
    }

    /// Writes the delta document.
    pub fn write_xml<W: Write>(&self, writer: W) -> Result<()> {
        XmlPrinter::new(writer).print(&self.to_delta_tree())?;
        Ok(())
    }

    /// Returns the delta document as a string.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut output = Vec::new();
        self.write_xml(&mut output)?;
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    /// Reads a script from a delta document.
    ///
    /// The total cost is taken from the document root.
    pub fn from_xml_str(xml: &str) -> Result<Self> {
        let root = Preprocessor::raw().parse_str(xml)?;
        let borrowed = root.borrow();
        if borrowed.label().as_str() != DELTA_ROOT_TAG {
            return Err(Error::Parse(format!(
                "expected <{}>, found <{}>",
                DELTA_ROOT_TAG,
                borrowed.label()
            )));
        }

        let mut script = EditScript::new();
        for element in borrowed.children() {
            script.push(EditOperation::from_element(element)?, 0);
        }
        if let Some(cost) = borrowed.attribute(COST_ATTR) {
            script.cost = cost
                .parse()
                .map_err(|_| Error::Parse(format!("invalid cost: {}", cost)))?;
        }
        Ok(script)
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a EditOperation;
    type IntoIter = std::slice::Iter<'a, EditOperation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}
