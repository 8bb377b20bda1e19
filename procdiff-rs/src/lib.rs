//! procdiff - structural diff for process trees
//!
//! This library computes the difference between two versions of a CPEE
//! process model as an edit script of inserts, deletes, moves and updates.
//!
//! # Overview
//!
//! Both versions are parsed into trees of labeled nodes. A pipeline of
//! matchers pairs the nodes that correspond to each other: identical
//! subtrees by their structural hash, similar activities by a weighted
//! comparison of their content and position, and control flow constructs
//! through the activities they contain. The edit script generator then
//! turns the matching into a script whose replay on the old tree yields the
//! new tree.
//!
//! # Example
//!
//! ```
//! use procdiff::{diff, parse_str, DiffConfig};
//!
//! let old = parse_str(r#"<description><call id="a1" endpoint="E"/></description>"#).unwrap();
//! let new = parse_str(
//!     r#"<description><call id="a2" endpoint="E"/><call id="a1" endpoint="E"/></description>"#,
//! )
//! .unwrap();
//!
//! let script = diff(&old, &new, &DiffConfig::default()).unwrap();
//! assert_eq!(script.len(), 1);
//! assert_eq!(script.operations()[0].new_path(), Some("0"));
//! ```

pub mod compare;
pub mod config;
pub mod diff;
pub mod error;
pub mod extract;
pub mod matching;
pub mod node;
pub mod sequence;
pub mod xml;

use tracing::debug;

// Re-export commonly used types
pub use compare::Comparator;
pub use config::{ComparatorWeights, DiffConfig, MatchMode};
pub use diff::{EditKind, EditOperation, EditScript, EditScriptGenerator, Patcher};
pub use error::{Error, Result};
pub use matching::{MatchPipeline, Matcher, Matching, Stage};
pub use node::{new_element, new_node, Label, NodeInner, NodeRef, WeakNodeRef};
pub use xml::{parse_file, parse_str, Preprocessor, XmlPrinter};

/// Matches two process trees with the pipeline of the configured mode.
pub fn match_trees(old: &NodeRef, new: &NodeRef, config: &DiffConfig) -> Result<Matching> {
    let comparator = Comparator::new(config)?;
    MatchPipeline::for_mode(config.match_mode).execute(old, new, &comparator)
}

/// Computes the edit script that turns `old` into `new`.
pub fn diff(old: &NodeRef, new: &NodeRef, config: &DiffConfig) -> Result<EditScript> {
    diff_with_pipeline(old, new, config, &MatchPipeline::for_mode(config.match_mode))
}

/// Computes the edit script with a custom matcher pipeline.
pub fn diff_with_pipeline(
    old: &NodeRef,
    new: &NodeRef,
    config: &DiffConfig,
    pipeline: &MatchPipeline,
) -> Result<EditScript> {
    let comparator = Comparator::new(config)?;
    let matching = pipeline.execute(old, new, &comparator)?;
    debug!(pairs = matching.len(), mode = %config.match_mode, "matching complete");
    EditScriptGenerator::new(config).generate(old, new, &matching)
}
