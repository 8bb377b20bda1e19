//! Diff configuration.
//!
//! The defaults are tuned for CPEE process models. A configuration can be
//! loaded from TOML; missing keys fall back to their defaults.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Matcher pipeline preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Skips the all-pairs matchers, suited for very large trees.
    Fast,
    #[default]
    Balanced,
    /// Runs every matcher, including the commonality-aware path matcher.
    Quality,
}

impl FromStr for MatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(MatchMode::Fast),
            "balanced" => Ok(MatchMode::Balanced),
            "quality" => Ok(MatchMode::Quality),
            other => Err(Error::Config(format!("unknown match mode: {}", other))),
        }
    }
}

impl MatchMode {
    /// Comparison threshold the preset runs with unless one is configured.
    ///
    /// Fast mode has no all-pairs fallback, so it only accepts close
    /// candidates; quality mode accepts looser ones.
    pub fn default_threshold(self) -> f64 {
        match self {
            MatchMode::Fast => 0.3,
            MatchMode::Balanced => 0.4,
            MatchMode::Quality => 0.5,
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchMode::Fast => "fast",
            MatchMode::Balanced => "balanced",
            MatchMode::Quality => "quality",
        };
        f.write_str(name)
    }
}

/// Weights used by the comparator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorWeights {
    /// Weight of the content comparison in the overall value.
    pub content: f64,
    /// Weight of the positional comparison in the overall value.
    pub position: f64,
    /// Multiplier applied to the weight of a component that compares to 0.
    pub zero_boost: f64,
    pub call_endpoint: f64,
    pub call_label: f64,
    pub call_method: f64,
    pub call_args: f64,
    /// Weight of the combined endpoint/label/method/args value of a call.
    pub call_service: f64,
    pub written_variables: f64,
    pub read_variables: f64,
    /// Weight of mode attributes (loop mode).
    pub mode: f64,
    /// Weight of the variables read by a loop or branch condition.
    pub condition: f64,
    /// Added to the content value when the code of two activities differs.
    pub code_penalty: f64,
}

impl ComparatorWeights {
    fn named(&self) -> [(&'static str, f64); 13] {
        [
            ("content", self.content),
            ("position", self.position),
            ("zero_boost", self.zero_boost),
            ("call_endpoint", self.call_endpoint),
            ("call_label", self.call_label),
            ("call_method", self.call_method),
            ("call_args", self.call_args),
            ("call_service", self.call_service),
            ("written_variables", self.written_variables),
            ("read_variables", self.read_variables),
            ("mode", self.mode),
            ("condition", self.condition),
            ("code_penalty", self.code_penalty),
        ]
    }
}

impl Default for ComparatorWeights {
    fn default() -> Self {
        ComparatorWeights {
            content: 6.0,
            position: 1.0,
            zero_boost: 2.0,
            call_endpoint: 2.0,
            call_label: 1.0,
            call_method: 1.5,
            call_args: 1.5,
            call_service: 3.0,
            written_variables: 2.0,
            read_variables: 1.0,
            mode: 2.0,
            condition: 1.0,
            code_penalty: 0.01,
        }
    }
}

/// Configuration of a diff run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Comparison values at or below this threshold count as a match.
    pub comparison_threshold: f64,
    /// Number of ancestors considered by the positional comparison.
    pub path_compare_range: usize,
    /// Prefix that marks a process variable inside code and conditions.
    pub variable_prefix: String,
    /// Align the children of every node, not only of ordered ones.
    pub exact_edit_script: bool,
    pub match_mode: MatchMode,
    pub weights: ComparatorWeights,
}

impl Default for DiffConfig {
    fn default() -> Self {
        DiffConfig {
            comparison_threshold: MatchMode::Balanced.default_threshold(),
            path_compare_range: 2,
            variable_prefix: "data.".to_string(),
            exact_edit_script: false,
            match_mode: MatchMode::Balanced,
            weights: ComparatorWeights::default(),
        }
    }
}

impl DiffConfig {
    /// Returns the default configuration for the given preset.
    pub fn for_mode(mode: MatchMode) -> Self {
        DiffConfig {
            comparison_threshold: mode.default_threshold(),
            match_mode: mode,
            ..Self::default()
        }
    }

    /// Parses a configuration from TOML.
    ///
    /// Without an explicit `comparison_threshold` the preset threshold of
    /// the configured match mode applies.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Self::from_toml_with_mode(source, None)
    }

    /// Parses a configuration from TOML, overriding its match mode.
    pub fn from_toml_with_mode(source: &str, mode: Option<MatchMode>) -> Result<Self> {
        let table: toml::Table = toml::from_str(source).map_err(|e| Error::Config(e.to_string()))?;
        let explicit_threshold = table.contains_key("comparison_threshold");
        let mut config: DiffConfig = toml::Value::Table(table)
            .try_into()
            .map_err(|e: toml::de::Error| Error::Config(e.to_string()))?;
        if let Some(mode) = mode {
            config.match_mode = mode;
        }
        if !explicit_threshold {
            config.comparison_threshold = config.match_mode.default_threshold();
        }
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_file_with_mode(path, None)
    }

    /// Reads a configuration from a TOML file, overriding its match mode.
    pub fn from_file_with_mode<P: AsRef<Path>>(path: P, mode: Option<MatchMode>) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_with_mode(&source, mode)
    }

    /// Rejects values the matchers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.comparison_threshold) {
            return Err(Error::Config(format!(
                "comparison_threshold must be within [0, 1], got {}",
                self.comparison_threshold
            )));
        }
        for (name, value) in self.weights.named() {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "weight {} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.weights.zero_boost <= 0.0 {
            return Err(Error::Config(format!(
                "weight zero_boost must be positive, got {}",
                self.weights.zero_boost
            )));
        }
        if self.variable_prefix.is_empty() {
            return Err(Error::Config("variable_prefix must not be empty".to_string()));
        }
        Ok(())
    }
}
