//! Variables read and written by activities and conditions.
//!
//! Process variables are recognised by a configurable prefix (`data.` in
//! CPEE). An occurrence followed by a plain assignment is a write, one
//! followed by a compound assignment (`+=`, `<<`, `++`, ...) is both a read
//! and a write, anything else is a read.

use std::collections::BTreeSet;
use std::rc::Rc;

use regex::Regex;

use super::{CallPropertiesExtractor, Extractor, Memo};
use crate::error::{Error, Result};
use crate::node::{Label, NodeRef};

/// Variables referenced by a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    pub read: BTreeSet<String>,
    pub written: BTreeSet<String>,
}

/// Extracts [`Variables`] from scripts, call code, arguments and conditions.
#[derive(Debug)]
pub struct VariableExtractor {
    occurrence: Regex,
    assignment: Regex,
    call_properties: Rc<CallPropertiesExtractor>,
    memo: Memo<Rc<Variables>>,
}

impl VariableExtractor {
    pub fn new(prefix: &str, call_properties: Rc<CallPropertiesExtractor>) -> Result<Self> {
        let occurrence = Regex::new(&format!(
            r"(?:^|[^A-Za-z0-9_.$@])({})([A-Za-z_][A-Za-z0-9_]*)",
            regex::escape(prefix)
        ))
        .map_err(|e| Error::Config(format!("invalid variable prefix: {}", e)))?;
        let assignment = Regex::new(
            r"^\s*(?:(=)(?:[^=~>]|$)|(\+=|-=|\*=|/=|%=|\|\|=|&&=|<<|\+\+|--))",
        )
        .map_err(|e| Error::Config(e.to_string()))?;

        Ok(VariableExtractor {
            occurrence,
            assignment,
            call_properties,
            memo: Memo::new(),
        })
    }

    /// Scans a piece of code and records every variable occurrence.
    pub fn scan_code(&self, code: &str, vars: &mut Variables) {
        for captures in self.occurrence.captures_iter(code) {
            let Some(name) = captures.get(2) else {
                continue;
            };
            let rest = &code[name.end()..];
            match self.assignment.captures(rest) {
                Some(op) if op.get(1).is_some() => {
                    vars.written.insert(name.as_str().to_string());
                }
                Some(_) => {
                    vars.written.insert(name.as_str().to_string());
                    vars.read.insert(name.as_str().to_string());
                }
                None => {
                    vars.read.insert(name.as_str().to_string());
                }
            }
        }
    }

    /// Records every variable occurrence as a read.
    pub fn scan_expression(&self, expression: &str, vars: &mut Variables) {
        for captures in self.occurrence.captures_iter(expression) {
            if let Some(name) = captures.get(2) {
                vars.read.insert(name.as_str().to_string());
            }
        }
    }

    fn extract(&self, node: &NodeRef) -> Variables {
        let mut vars = Variables::default();
        let label = node.borrow().label().clone();
        match label {
            Label::Call => {
                if let Some(props) = self.call_properties.get(node) {
                    for value in &props.arg_values {
                        self.scan_expression(value, &mut vars);
                    }
                    if let Some(code) = &props.code {
                        self.scan_code(code, &mut vars);
                    }
                }
            }
            Label::Manipulate => {
                if let Some(code) = node.borrow().text() {
                    self.scan_code(code, &mut vars);
                }
            }
            Label::Loop | Label::Alternative => {
                if let Some(condition) = node.borrow().attribute("condition") {
                    self.scan_expression(condition, &mut vars);
                }
            }
            Label::Description
            | Label::Parallel
            | Label::ParallelBranch
            | Label::Choose
            | Label::Otherwise
            | Label::Critical
            | Label::Stop
            | Label::Escape
            | Label::Terminate
            | Label::Property(_) => {}
        }
        vars
    }
}

impl Extractor for VariableExtractor {
    type Output = Rc<Variables>;

    fn get(&self, node: &NodeRef) -> Rc<Variables> {
        let id = node.borrow().id();
        self.memo
            .get_or_insert_with(id, || Rc::new(self.extract(node)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::new_element;

    fn extractor() -> VariableExtractor {
        VariableExtractor::new("data.", Rc::new(CallPropertiesExtractor::new())).unwrap()
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_script_reads_and_writes() {
        let script = new_element(
            "manipulate",
            &[],
            Some("data.total = data.price * data.amount; data.count += 1; if data.x == 3"),
        );
        let vars = extractor().get(&script);
        assert_eq!(vars.written, set(&["count", "total"]));
        assert_eq!(vars.read, set(&["amount", "count", "price", "x"]));
    }

    #[test]
    fn test_condition_is_read_only() {
        let lp = new_element("loop", &[("condition", "data.i < data.max")], None);
        let vars = extractor().get(&lp);
        assert_eq!(vars.read, set(&["i", "max"]));
        assert!(vars.written.is_empty());
    }

    #[test]
    fn test_prefix_needs_word_boundary() {
        let script = new_element("manipulate", &[], Some("metadata.x = 1; data.y << 2"));
        let vars = extractor().get(&script);
        assert_eq!(vars.written, set(&["y"]));
        assert_eq!(vars.read, set(&["y"]));
    }

    #[test]
    fn test_custom_prefix() {
        let ex = VariableExtractor::new("$", Rc::new(CallPropertiesExtractor::new())).unwrap();
        let script = new_element("manipulate", &[], Some("$a = $b"));
        let vars = ex.get(&script);
        assert_eq!(vars.written, set(&["a"]));
        assert_eq!(vars.read, set(&["b"]));
    }

    #[test]
    fn test_other_labels_have_no_variables() {
        let stop = new_element("stop", &[], None);
        assert_eq!(*extractor().get(&stop), Variables::default());
    }
}
