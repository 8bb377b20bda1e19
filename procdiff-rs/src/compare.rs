//! Node similarity comparison.
//!
//! The comparator scores how different two nodes are, from 0.0 (equal) to
//! 1.0 (unrelated). The score is a weighted average of a content comparison,
//! which depends on the label, and a positional comparison over the
//! ancestors of both nodes. Components that compare to exactly 0 get their
//! weight boosted so that strong evidence of equality dominates.

use std::collections::BTreeSet;

use crate::config::{ComparatorWeights, DiffConfig};
use crate::error::Result;
use crate::extract::{Extractor, Extractors};
use crate::node::{ancestors, Label, NodeRef};
use crate::sequence::lcs_distance;

/// Attributes a `parallel` must agree on.
const PARALLEL_MODE_ATTRIBUTES: [&str; 2] = ["wait", "cancel"];

/// Attributes a `choose` must agree on.
const CHOOSE_MODE_ATTRIBUTES: [&str; 1] = ["mode"];

/// Compares nodes of one diff run.
///
/// Owns the extractors of the run, so a comparator must not be shared
/// between runs over different trees.
pub struct Comparator {
    config: DiffConfig,
    extractors: Extractors,
}

impl Comparator {
    /// Creates a comparator with fresh extractors.
    pub fn new(config: &DiffConfig) -> Result<Self> {
        config.validate()?;
        Ok(Comparator {
            config: config.clone(),
            extractors: Extractors::new(config)?,
        })
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    pub fn extractors(&self) -> &Extractors {
        &self.extractors
    }

    fn weights(&self) -> &ComparatorWeights {
        &self.config.weights
    }

    /// Overall comparison value in `[0, 1]`.
    pub fn compare(&self, a: &NodeRef, b: &NodeRef) -> f64 {
        let weights = self.weights();
        let content = self.compare_content(a, b);
        let position = self.compare_position(a, b);
        weighted_average(
            &[
                (Some(content), weights.content),
                (position, weights.position),
            ],
            weights.zero_boost,
        )
        .unwrap_or(content)
    }

    /// Label specific content comparison in `[0, 1]`.
    pub fn compare_content(&self, a: &NodeRef, b: &NodeRef) -> f64 {
        let (label_a, label_b) = (a.borrow().label().clone(), b.borrow().label().clone());
        if label_a != label_b {
            return 1.0;
        }
        match label_a {
            Label::Call => self.compare_calls(a, b),
            Label::Manipulate => self.compare_scripts(a, b),
            Label::Loop | Label::Alternative => self.compare_conditions(a, b),
            Label::Parallel => compare_mode_attributes(a, b, &PARALLEL_MODE_ATTRIBUTES),
            Label::Choose => compare_mode_attributes(a, b, &CHOOSE_MODE_ATTRIBUTES),
            Label::Description
            | Label::ParallelBranch
            | Label::Otherwise
            | Label::Critical
            | Label::Stop
            | Label::Escape
            | Label::Terminate
            | Label::Property(_) => 0.0,
        }
    }

    /// LCS distance of the content hashes of the nearest ancestors.
    ///
    /// Returns `None` if neither node has an ancestor.
    pub fn compare_position(&self, a: &NodeRef, b: &NodeRef) -> Option<f64> {
        let range = self.config.path_compare_range;
        let hash = &self.extractors.hash;
        let path_a: Vec<u64> = ancestors(a)
            .iter()
            .take(range)
            .map(|n| hash.content_hash(n))
            .collect();
        let path_b: Vec<u64> = ancestors(b)
            .iter()
            .take(range)
            .map(|n| hash.content_hash(n))
            .collect();
        lcs_distance(&path_a, &path_b, None)
    }

    fn compare_calls(&self, a: &NodeRef, b: &NodeRef) -> f64 {
        let extractor = &self.extractors.call_properties;
        let (Some(props_a), Some(props_b)) = (extractor.get(a), extractor.get(b)) else {
            return 0.0;
        };
        let weights = self.weights();

        let label_a: Vec<char> = props_a.label.as_deref().unwrap_or_default().chars().collect();
        let label_b: Vec<char> = props_b.label.as_deref().unwrap_or_default().chars().collect();
        let service = weighted_average(
            &[
                (
                    compare_string(props_a.endpoint.as_deref(), props_b.endpoint.as_deref(), None),
                    weights.call_endpoint,
                ),
                (lcs_distance(&label_a, &label_b, None), weights.call_label),
                (
                    compare_string(props_a.method.as_deref(), props_b.method.as_deref(), None),
                    weights.call_method,
                ),
                (
                    lcs_distance(&props_a.arg_keys, &props_b.arg_keys, None),
                    weights.call_args,
                ),
            ],
            1.0,
        );
        if service == Some(0.0) {
            return 0.0;
        }

        let vars_a = self.extractors.variables.get(a);
        let vars_b = self.extractors.variables.get(b);
        let value = weighted_average(
            &[
                (service, weights.call_service),
                (
                    compare_set(&vars_a.written, &vars_b.written, None),
                    weights.written_variables,
                ),
                (
                    compare_set(&vars_a.read, &vars_b.read, None),
                    weights.read_variables,
                ),
            ],
            1.0,
        )
        .unwrap_or(0.0);

        let penalty = if props_a.code != props_b.code {
            weights.code_penalty
        } else {
            0.0
        };
        (value + penalty).min(1.0)
    }

    fn compare_scripts(&self, a: &NodeRef, b: &NodeRef) -> f64 {
        let weights = self.weights();
        let vars_a = self.extractors.variables.get(a);
        let vars_b = self.extractors.variables.get(b);
        let value = weighted_average(
            &[
                (
                    compare_set(&vars_a.written, &vars_b.written, None),
                    weights.written_variables,
                ),
                (
                    compare_set(&vars_a.read, &vars_b.read, None),
                    weights.read_variables,
                ),
            ],
            1.0,
        )
        .unwrap_or(0.0);

        let penalty = if a.borrow().text() != b.borrow().text() {
            weights.code_penalty
        } else {
            0.0
        };
        (value + penalty).min(1.0)
    }

    fn compare_conditions(&self, a: &NodeRef, b: &NodeRef) -> f64 {
        let weights = self.weights();
        let mode = compare_string(
            a.borrow().attribute("mode"),
            b.borrow().attribute("mode"),
            None,
        );
        let vars_a = self.extractors.variables.get(a);
        let vars_b = self.extractors.variables.get(b);
        weighted_average(
            &[
                (mode, weights.mode),
                (compare_set(&vars_a.read, &vars_b.read, None), weights.condition),
            ],
            1.0,
        )
        .unwrap_or(0.0)
    }
}

/// 0 if all listed attributes agree, 1 otherwise.
fn compare_mode_attributes(a: &NodeRef, b: &NodeRef, keys: &[&str]) -> f64 {
    let (a, b) = (a.borrow(), b.borrow());
    if keys.iter().all(|key| a.attribute(key) == b.attribute(key)) {
        0.0
    } else {
        1.0
    }
}

/// Weighted average over the present components.
///
/// A component equal to 0 has its weight multiplied by `zero_boost`.
/// Returns `None` if no component is present or all weights are 0.
pub fn weighted_average(components: &[(Option<f64>, f64)], zero_boost: f64) -> Option<f64> {
    let mut sum = 0.0;
    let mut total_weight = 0.0;
    for &(value, weight) in components {
        let Some(value) = value else {
            continue;
        };
        let weight = if value == 0.0 { weight * zero_boost } else { weight };
        sum += value * weight;
        total_weight += weight;
    }
    if total_weight > 0.0 {
        Some(sum / total_weight)
    } else {
        None
    }
}

/// Set distance `(max(|a|, |b|) - |a ∩ b|) / max(|a|, |b|)`.
///
/// Returns `default` if both sets are empty.
pub fn compare_set<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>, default: Option<f64>) -> Option<f64> {
    let max = a.len().max(b.len());
    if max == 0 {
        return default;
    }
    let common = a.intersection(b).count();
    Some((max - common) as f64 / max as f64)
}

/// 0 for equal strings, 1 for different ones, `default` if both are absent.
pub fn compare_string(a: Option<&str>, b: Option<&str>, default: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => default,
        (a, b) if a == b => Some(0.0),
        _ => Some(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::node::{new_element, NodeInner};

    fn comparator() -> Comparator {
        Comparator::new(&DiffConfig::default()).unwrap()
    }

    fn call(endpoint: &str, label: &str, code: Option<&str>) -> NodeRef {
        let node = new_element("call", &[("endpoint", endpoint)], None);
        let parameters = new_element("parameters", &[], None);
        NodeInner::append_child(&parameters, new_element("label", &[], Some(label)));
        NodeInner::append_child(&parameters, new_element("method", &[], Some(":post")));
        NodeInner::append_child(&node, parameters);
        if let Some(code) = code {
            let block = new_element("code", &[], None);
            NodeInner::append_child(&block, new_element("finalize", &[], Some(code)));
            NodeInner::append_child(&node, block);
        }
        node
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compare_set() {
        assert_eq!(compare_set(&set(&[]), &set(&[]), None), None);
        assert_eq!(compare_set(&set(&[]), &set(&[]), Some(0.5)), Some(0.5));
        assert_eq!(compare_set(&set(&["a", "b"]), &set(&["a", "b"]), None), Some(0.0));
        assert_eq!(compare_set(&set(&["a", "b"]), &set(&["a"]), None), Some(0.5));
        assert_eq!(compare_set(&set(&["a"]), &set(&["b"]), None), Some(1.0));
    }

    #[test]
    fn test_compare_string() {
        assert_eq!(compare_string(None, None, Some(0.3)), Some(0.3));
        assert_eq!(compare_string(Some("x"), Some("x"), None), Some(0.0));
        assert_eq!(compare_string(Some("x"), None, None), Some(1.0));
        assert_eq!(compare_string(Some("x"), Some("y"), None), Some(1.0));
    }

    #[test]
    fn test_weighted_average_zero_boost() {
        let value = weighted_average(&[(Some(0.0), 1.0), (Some(1.0), 1.0)], 2.0).unwrap();
        assert!((value - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(weighted_average(&[(None, 1.0)], 2.0), None);
        assert_eq!(weighted_average(&[(Some(0.5), 1.0), (None, 5.0)], 2.0), Some(0.5));
    }

    #[test]
    fn test_self_comparison_is_zero() {
        let c = comparator();
        let root = new_element("description", &[], None);
        let node = call("bookAir", "Book flight", Some("data.ticket = result"));
        NodeInner::append_child(&root, node.clone());
        assert_eq!(c.compare(&node, &node), 0.0);
        assert_eq!(c.compare(&root, &root), 0.0);
    }

    #[test]
    fn test_different_labels() {
        let c = comparator();
        let a = new_element("call", &[("endpoint", "E")], None);
        let b = new_element("manipulate", &[], None);
        assert_eq!(c.compare_content(&a, &b), 1.0);
        assert!(c.compare(&a, &b) > 0.0);
    }

    #[test]
    fn test_call_service_equality_wins() {
        let c = comparator();
        let a = call("bookAir", "Book flight", Some("data.a = result"));
        let b = call("bookAir", "Book flight", Some("data.b = result"));
        assert_eq!(c.compare_content(&a, &b), 0.0);
    }

    #[test]
    fn test_call_endpoint_change() {
        let c = comparator();
        let a = call("bookAir", "Book flight", None);
        let b = call("bookHotel", "Book flight", None);
        let value = c.compare_content(&a, &b);
        assert!(value > 0.0 && value <= 1.0);
    }

    #[test]
    fn test_script_code_penalty() {
        let c = comparator();
        let a = new_element("manipulate", &[], Some("data.x = data.y"));
        let b = new_element("manipulate", &[], Some("data.x = data.y + 1"));
        let value = c.compare_content(&a, &b);
        assert!((value - DiffConfig::default().weights.code_penalty).abs() < 1e-12);
    }

    #[test]
    fn test_negative_weights_fail_construction() {
        let mut config = DiffConfig::default();
        config.weights.zero_boost = -1.0;
        config.weights.code_penalty = -5.0;
        assert!(matches!(Comparator::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_parallel_modes() {
        let c = comparator();
        let a = new_element("parallel", &[("wait", "-1"), ("cancel", "last")], None);
        let b = new_element("parallel", &[("wait", "-1"), ("cancel", "last")], None);
        let d = new_element("parallel", &[("wait", "1"), ("cancel", "last")], None);
        assert_eq!(c.compare_content(&a, &b), 0.0);
        assert_eq!(c.compare_content(&a, &d), 1.0);
    }

    #[test]
    fn test_loop_mode_and_condition() {
        let c = comparator();
        let a = new_element("loop", &[("mode", "pre_test"), ("condition", "data.i < 3")], None);
        let b = new_element("loop", &[("mode", "post_test"), ("condition", "data.i < 3")], None);
        let value = c.compare_content(&a, &b);
        assert!(value > 0.0 && value < 1.0);
    }

    #[test]
    fn test_position_uses_ancestors() {
        let c = comparator();
        let root_a = new_element("description", &[], None);
        let root_b = new_element("description", &[], None);
        let lp = new_element("loop", &[("mode", "pre_test")], None);
        let a = new_element("stop", &[], None);
        let b = new_element("stop", &[], None);
        NodeInner::append_child(&root_a, lp.clone());
        NodeInner::append_child(&lp, a.clone());
        NodeInner::append_child(&root_b, b.clone());

        assert_eq!(c.compare_position(&root_a, &root_b), None);
        assert_eq!(c.compare_position(&a, &b), Some(0.5));
        assert_eq!(c.compare_position(&a, &a), Some(0.0));
    }
}
