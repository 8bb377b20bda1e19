//! Sequence alignment primitives.
//!
//! The comparator scores sequences (argument keys, ancestor paths, label
//! text) by their longest common subsequence. The edit script generator
//! keeps the longest increasing subsequence of a child list in place and
//! moves everything else.

mod lcs;
mod lis;

pub use lcs::{lcs_distance, lcs_len};
pub use lis::longest_increasing_subsequence;
