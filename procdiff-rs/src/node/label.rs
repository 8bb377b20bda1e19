//! Node labels of the CPEE process description language.
//!
//! Every element of a process tree carries a [`Label`]. The DSL keywords form
//! a closed set; any other tag (endpoint parameters, arguments, code blocks,
//! ...) is a property node that describes its parent rather than being a
//! process step of its own.

use std::fmt;

use bitflags::bitflags;

bitflags! {
    /// Structural traits derived from a label.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LabelTraits: u8 {
        /// Control flow construct that contains process steps.
        const INNER = 1;
        /// Activity that carries the full content of a process step.
        const LEAF = 1 << 1;
        /// Structural child that encodes parameters of its parent.
        const PROPERTY = 1 << 2;
        /// The relative order of the children carries semantics.
        const ORDERED = 1 << 3;
    }
}

/// Label of a process tree node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// Root of a process description.
    Description,
    /// Service call.
    Call,
    /// Script task.
    Manipulate,
    /// Parallel split, its branches are unordered.
    Parallel,
    /// One branch of a parallel split.
    ParallelBranch,
    /// Choice between alternatives.
    Choose,
    /// Guarded branch of a choice.
    Alternative,
    /// Default branch of a choice.
    Otherwise,
    /// Pre- or post-tested loop.
    Loop,
    /// Critical section.
    Critical,
    /// Stop the process instance.
    Stop,
    /// Escape the enclosing loop.
    Escape,
    /// Terminate the process instance.
    Terminate,
    /// Any tag outside the DSL vocabulary.
    Property(String),
}

impl Label {
    /// Parses a tag name into a label.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "description" => Label::Description,
            "call" => Label::Call,
            "manipulate" => Label::Manipulate,
            "parallel" => Label::Parallel,
            "parallel_branch" => Label::ParallelBranch,
            "choose" => Label::Choose,
            "alternative" => Label::Alternative,
            "otherwise" => Label::Otherwise,
            "loop" => Label::Loop,
            "critical" => Label::Critical,
            "stop" => Label::Stop,
            "escape" => Label::Escape,
            "terminate" => Label::Terminate,
            other => Label::Property(other.to_string()),
        }
    }

    /// Returns the tag name of this label.
    pub fn as_str(&self) -> &str {
        match self {
            Label::Description => "description",
            Label::Call => "call",
            Label::Manipulate => "manipulate",
            Label::Parallel => "parallel",
            Label::ParallelBranch => "parallel_branch",
            Label::Choose => "choose",
            Label::Alternative => "alternative",
            Label::Otherwise => "otherwise",
            Label::Loop => "loop",
            Label::Critical => "critical",
            Label::Stop => "stop",
            Label::Escape => "escape",
            Label::Terminate => "terminate",
            Label::Property(name) => name,
        }
    }

    /// Returns the structural traits of this label.
    pub fn traits(&self) -> LabelTraits {
        match self {
            Label::Parallel | Label::Choose => LabelTraits::INNER,
            Label::Description
            | Label::ParallelBranch
            | Label::Alternative
            | Label::Otherwise
            | Label::Loop
            | Label::Critical => LabelTraits::INNER | LabelTraits::ORDERED,
            Label::Call | Label::Manipulate | Label::Stop | Label::Escape | Label::Terminate => {
                LabelTraits::LEAF | LabelTraits::ORDERED
            }
            Label::Property(_) => LabelTraits::PROPERTY | LabelTraits::ORDERED,
        }
    }

    pub fn is_inner(&self) -> bool {
        self.traits().contains(LabelTraits::INNER)
    }

    pub fn is_leaf(&self) -> bool {
        self.traits().contains(LabelTraits::LEAF)
    }

    pub fn is_property(&self) -> bool {
        self.traits().contains(LabelTraits::PROPERTY)
    }

    /// Returns true if the order of children under this label is significant.
    pub fn has_internal_ordering(&self) -> bool {
        self.traits().contains(LabelTraits::ORDERED)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
