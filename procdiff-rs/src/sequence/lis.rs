//! Longest increasing subsequence.

/// Returns the positions of a longest strictly increasing subsequence of
/// `seq`, in ascending order.
///
/// Patience sorting with predecessor links, O(n log n).
pub fn longest_increasing_subsequence<T: Ord>(seq: &[T]) -> Vec<usize> {
    // tails[k] = position of the smallest tail of an increasing run of length k + 1
    let mut tails: Vec<usize> = Vec::new();
    let mut predecessor: Vec<Option<usize>> = vec![None; seq.len()];

    for (pos, value) in seq.iter().enumerate() {
        let k = tails.partition_point(|&t| seq[t] < *value);
        if k > 0 {
            predecessor[pos] = Some(tails[k - 1]);
        }
        if k == tails.len() {
            tails.push(pos);
        } else {
            tails[k] = pos;
        }
    }

    let mut result = Vec::with_capacity(tails.len());
    let mut current = tails.last().copied();
    while let Some(pos) = current {
        result.push(pos);
        current = predecessor[pos];
    }
    result.reverse();
    result
}
