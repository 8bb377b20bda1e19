//! Ordered composition of matchers.

use std::fmt;
use std::str::FromStr;

use tracing::debug;

use super::{
    CommonalityPathMatcher, FastSimilarityMatcher, FixedMatcher, HashMatcher, Matcher, Matching,
    PathMatcher, PropertyMatcher, SimilarityMatcher, UnmatchedMatcher,
};
use crate::compare::Comparator;
use crate::config::MatchMode;
use crate::error::{Error, Result};
use crate::node::NodeRef;

/// One stage of a [`MatchPipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Fixed,
    Hash,
    Similarity,
    FastSimilarity,
    CommonalityPath,
    Path,
    Unmatched,
    Property,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Fixed => "fixed",
            Stage::Hash => "hash",
            Stage::Similarity => "similarity",
            Stage::FastSimilarity => "fast-similarity",
            Stage::CommonalityPath => "commonality-path",
            Stage::Path => "path",
            Stage::Unmatched => "unmatched",
            Stage::Property => "property",
        }
    }

    fn matcher(&self) -> Box<dyn Matcher> {
        match self {
            Stage::Fixed => Box::new(FixedMatcher),
            Stage::Hash => Box::new(HashMatcher),
            Stage::Similarity => Box::new(SimilarityMatcher),
            Stage::FastSimilarity => Box::new(FastSimilarityMatcher),
            Stage::CommonalityPath => Box::new(CommonalityPathMatcher),
            Stage::Path => Box::new(PathMatcher),
            Stage::Unmatched => Box::new(UnmatchedMatcher),
            Stage::Property => Box::new(PropertyMatcher),
        }
    }
}

impl FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "fixed" => Ok(Stage::Fixed),
            "hash" => Ok(Stage::Hash),
            "similarity" => Ok(Stage::Similarity),
            "fast-similarity" => Ok(Stage::FastSimilarity),
            "commonality-path" => Ok(Stage::CommonalityPath),
            "path" => Ok(Stage::Path),
            "unmatched" => Ok(Stage::Unmatched),
            "property" => Ok(Stage::Property),
            _ => Err(Error::Config(format!("unknown matcher: {}", s))),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An ordered list of matchers that together build a [`Matching`].
///
/// The fixed matcher always runs first and the property matcher always runs
/// last; every stage runs at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPipeline {
    stages: Vec<Stage>,
}

impl MatchPipeline {
    /// Builds a pipeline from the given stages.
    pub fn new(stages: impl IntoIterator<Item = Stage>) -> Self {
        let mut ordered = vec![Stage::Fixed];
        for stage in stages {
            if !matches!(stage, Stage::Fixed | Stage::Property) && !ordered.contains(&stage) {
                ordered.push(stage);
            }
        }
        ordered.push(Stage::Property);
        MatchPipeline { stages: ordered }
    }

    /// Returns the preset pipeline of a match mode.
    pub fn for_mode(mode: MatchMode) -> Self {
        match mode {
            MatchMode::Fast => Self::new([Stage::Hash, Stage::FastSimilarity, Stage::Path]),
            MatchMode::Balanced => Self::new([
                Stage::Hash,
                Stage::Similarity,
                Stage::Path,
                Stage::Unmatched,
            ]),
            MatchMode::Quality => Self::new([
                Stage::Hash,
                Stage::Similarity,
                Stage::CommonalityPath,
                Stage::Unmatched,
            ]),
        }
    }

    /// Builds a pipeline from stage names such as `"hash"` or `"path"`.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let stages = names
            .iter()
            .map(|name| name.as_ref().parse())
            .collect::<Result<Vec<Stage>>>()?;
        Ok(Self::new(stages))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Runs all stages and returns the resulting matching.
    pub fn execute(&self, old: &NodeRef, new: &NodeRef, comparator: &Comparator) -> Result<Matching> {
        let mut matching = Matching::new();
        for stage in &self.stages {
            let before = matching.len();
            stage.matcher().match_trees(old, new, &mut matching, comparator)?;
            debug!(
                stage = stage.name(),
                added = matching.len() - before,
                total = matching.len(),
                "matcher finished"
            );
        }
        Ok(matching)
    }
}

impl Default for MatchPipeline {
    fn default() -> Self {
        Self::for_mode(MatchMode::default())
    }
}
