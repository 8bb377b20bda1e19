//! Structural subtree hashing.
//!
//! `hash(node) = content_hash(node) + child_hash(node)`. For unordered
//! labels the child hashes are summed, so any permutation of the children
//! hashes the same. For ordered labels child `i` is weighted with the
//! `i`-th prime, which makes permutations distinguishable.

use std::cell::RefCell;

use super::{Extractor, Memo};
use crate::node::NodeRef;

/// Separates the fields of the hashed content string.
const FIELD_SEPARATOR: char = '\u{1f}';

/// String hash over UTF-16 code units with multiplier 31, in 64 bits.
pub fn string_hash(s: &str) -> u64 {
    let mut hash: u64 = 0;
    for code in s.encode_utf16() {
        hash = hash.wrapping_mul(31).wrapping_add(code as u64);
    }
    hash
}

/// Spreads the bits of a hash value (splitmix64 finalizer).
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Memoizing structural hash.
#[derive(Debug)]
pub struct HashExtractor {
    hashes: Memo<u64>,
    content_hashes: Memo<u64>,
    primes: RefCell<Vec<u64>>,
}

impl HashExtractor {
    pub fn new() -> Self {
        HashExtractor {
            hashes: Memo::new(),
            content_hashes: Memo::new(),
            primes: RefCell::new(vec![2]),
        }
    }

    /// Hash of label, attributes and text, ignoring children.
    pub fn content_hash(&self, node: &NodeRef) -> u64 {
        let id = node.borrow().id();
        self.content_hashes.get_or_insert_with(id, || {
            let borrowed = node.borrow();
            let mut content = String::from(borrowed.label().as_str());
            for (key, value) in borrowed.attributes() {
                if key == "xmlns" || key.starts_with("xmlns:") {
                    continue;
                }
                content.push(FIELD_SEPARATOR);
                content.push_str(key);
                content.push('=');
                content.push_str(value);
            }
            if let Some(text) = borrowed.text() {
                content.push(FIELD_SEPARATOR);
                content.push_str(text);
            }
            mix(string_hash(&content))
        })
    }

    /// Returns the `index`-th prime, extending the table as needed.
    fn prime(&self, index: usize) -> u64 {
        let mut primes = self.primes.borrow_mut();
        let mut candidate = primes.last().copied().unwrap_or(2);
        while primes.len() <= index {
            candidate += 1;
            if primes
                .iter()
                .take_while(|&&p| p * p <= candidate)
                .all(|&p| candidate % p != 0)
            {
                primes.push(candidate);
            }
        }
        primes[index]
    }

    fn child_hash(&self, node: &NodeRef) -> u64 {
        let (ordered, children) = {
            let borrowed = node.borrow();
            (borrowed.has_internal_ordering(), borrowed.children().to_vec())
        };
        children
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, child)| {
                let hash = self.get(child);
                if ordered {
                    acc.wrapping_add(hash.wrapping_mul(self.prime(i)))
                } else {
                    acc.wrapping_add(hash)
                }
            })
    }
}

impl Default for HashExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for HashExtractor {
    type Output = u64;

    fn get(&self, node: &NodeRef) -> u64 {
        let id = node.borrow().id();
        self.hashes.get_or_insert_with(id, || {
            self.content_hash(node).wrapping_add(self.child_hash(node))
        })
    }
}
