//! Edit script generation and replay.
//!
//! [`EditScriptGenerator`] turns a matching between two process trees into
//! an [`EditScript`] of inserts, deletes, moves and updates. [`Patcher`]
//! replays such a script on the old tree.

mod edit_script;
mod generator;
mod patch;

pub use edit_script::{EditKind, EditOperation, EditScript};
pub use generator::EditScriptGenerator;
pub use patch::Patcher;

/// Root tag of a delta document.
pub const DELTA_ROOT_TAG: &str = "delta";

/// Attribute names used by delta documents.
pub const COST_ATTR: &str = "cost";
pub const OLD_PATH_ATTR: &str = "oldPath";
pub const NEW_PATH_ATTR: &str = "newPath";
