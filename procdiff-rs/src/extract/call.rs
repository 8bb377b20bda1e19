//! Service call properties.
//!
//! A `call` keeps its parameters in property children:
//!
//! ```xml
//! <call id="a1" endpoint="bookAir">
//!   <parameters>
//!     <label>Book flight</label>
//!     <method>:post</method>
//!     <arguments><from>data.from</from><to>data.to</to></arguments>
//!   </parameters>
//!   <code><finalize output="result">data.ticket = result</finalize></code>
//! </call>
//! ```

use std::rc::Rc;

use super::{Extractor, Memo};
use crate::node::{Label, NodeRef};

const CODE_BLOCKS: [&str; 4] = ["prepare", "finalize", "update", "rescue"];

/// Flattened parameters of a service call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallProperties {
    pub endpoint: Option<String>,
    pub label: Option<String>,
    pub method: Option<String>,
    /// Argument names in document order.
    pub arg_keys: Vec<String>,
    /// Argument values in document order.
    pub arg_values: Vec<String>,
    /// Code of all code blocks, joined by newlines.
    pub code: Option<String>,
}

/// Extracts [`CallProperties`] from `call` nodes.
#[derive(Debug)]
pub struct CallPropertiesExtractor {
    memo: Memo<Option<Rc<CallProperties>>>,
}

impl CallPropertiesExtractor {
    pub fn new() -> Self {
        CallPropertiesExtractor { memo: Memo::new() }
    }

    fn extract(node: &NodeRef) -> Option<Rc<CallProperties>> {
        let borrowed = node.borrow();
        if *borrowed.label() != Label::Call {
            return None;
        }

        let mut props = CallProperties {
            endpoint: borrowed.attribute("endpoint").map(str::to_string),
            label: borrowed.attribute("label").map(str::to_string),
            ..CallProperties::default()
        };

        if let Some(parameters) = find_child(node, "parameters") {
            if let Some(label) = find_child(&parameters, "label") {
                props.label = label.borrow().text().map(str::to_string);
            }
            if let Some(method) = find_child(&parameters, "method") {
                props.method = method.borrow().text().map(str::to_string);
            }
            if let Some(arguments) = find_child(&parameters, "arguments") {
                for arg in arguments.borrow().children() {
                    let arg = arg.borrow();
                    props.arg_keys.push(arg.label().to_string());
                    props.arg_values.push(arg.text().unwrap_or_default().to_string());
                }
            }
        }

        if let Some(code) = find_child(node, "code") {
            let blocks: Vec<String> = code
                .borrow()
                .children()
                .iter()
                .filter(|block| CODE_BLOCKS.contains(&block.borrow().label().as_str()))
                .filter_map(|block| block.borrow().text().map(str::to_string))
                .collect();
            if !blocks.is_empty() {
                props.code = Some(blocks.join("\n"));
            }
        }

        Some(Rc::new(props))
    }
}

impl Default for CallPropertiesExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for CallPropertiesExtractor {
    type Output = Option<Rc<CallProperties>>;

    fn get(&self, node: &NodeRef) -> Option<Rc<CallProperties>> {
        let id = node.borrow().id();
        self.memo.get_or_insert_with(id, || Self::extract(node))
    }
}

/// Returns the first child with the given tag.
fn find_child(node: &NodeRef, tag: &str) -> Option<NodeRef> {
    node.borrow()
        .children()
        .iter()
        .find(|c| c.borrow().label().as_str() == tag)
        .cloned()
}
