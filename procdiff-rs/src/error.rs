//! Error types for procdiff.

use thiserror::Error;

/// Result type alias for procdiff operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while diffing or patching process trees.
#[derive(Error, Debug)]
pub enum Error {
    /// A node that already takes part in a match was matched again.
    #[error("node already matched (old: {old}, new: {new})")]
    AlreadyMatched { old: u64, new: u64 },

    /// Two subtrees share a structural hash but differ in size.
    #[error("hash collision between subtrees of size {old_size} and {new_size}")]
    HashCollision { old_size: usize, new_size: usize },

    /// The matching or edit script generation broke one of its invariants.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Invalid configuration or pipeline option.
    #[error("configuration error: {0}")]
    Config(String),

    /// An edit operation could not be replayed.
    #[error("patch error: {0}")]
    Patch(String),

    /// XML parsing error.
    #[error("XML parse error: {0}")]
    Parse(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML error from quick-xml.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
}
