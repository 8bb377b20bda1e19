//! Memoizing extractors for derived node properties.
//!
//! Matchers and the comparator ask the same questions about the same nodes
//! many times (subtree size, variables read by a script, structural hash).
//! Each extractor caches its answer per node id. Caches are keyed by
//! identity, not content, so an `Extractors` value belongs to exactly one
//! diff run and must not be reused for another pair of trees.

mod call;
mod hash;
mod leaf_set;
mod size;
mod variables;

pub use call::{CallProperties, CallPropertiesExtractor};
pub use hash::{string_hash, HashExtractor};
pub use leaf_set::LeafSetExtractor;
pub use size::{ElementSizeExtractor, SizeExtractor};
pub use variables::{VariableExtractor, Variables};

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::config::DiffConfig;
use crate::error::Result;
use crate::node::NodeRef;

/// A function from a node to a derived value.
pub trait Extractor {
    type Output;

    fn get(&self, node: &NodeRef) -> Self::Output;
}

/// Per-node cache shared by the extractors.
#[derive(Debug)]
pub(crate) struct Memo<T> {
    values: RefCell<FxHashMap<u64, T>>,
}

impl<T: Clone> Memo<T> {
    pub(crate) fn new() -> Self {
        Memo {
            values: RefCell::new(FxHashMap::default()),
        }
    }

    /// Returns the cached value for `id`, computing it with `f` on a miss.
    ///
    /// `f` may recurse into the same cache; no borrow is held while it runs.
    pub(crate) fn get_or_insert_with(&self, id: u64, f: impl FnOnce() -> T) -> T {
        let cached = self.values.borrow().get(&id).cloned();
        if let Some(value) = cached {
            return value;
        }
        let value = f();
        self.values.borrow_mut().insert(id, value.clone());
        value
    }
}

/// The set of extractors used by one diff run.
pub struct Extractors {
    pub size: SizeExtractor,
    pub element_size: ElementSizeExtractor,
    pub call_properties: Rc<CallPropertiesExtractor>,
    pub variables: VariableExtractor,
    pub leaf_set: LeafSetExtractor,
    pub hash: HashExtractor,
}

impl Extractors {
    /// Creates fresh, empty extractors.
    pub fn new(config: &DiffConfig) -> Result<Self> {
        let call_properties = Rc::new(CallPropertiesExtractor::new());
        Ok(Extractors {
            size: SizeExtractor::new(),
            element_size: ElementSizeExtractor::new(),
            variables: VariableExtractor::new(&config.variable_prefix, call_properties.clone())?,
            call_properties,
            leaf_set: LeafSetExtractor::new(),
            hash: HashExtractor::new(),
        })
    }
}
