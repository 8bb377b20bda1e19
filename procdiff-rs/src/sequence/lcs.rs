//! Longest common subsequence.

/// Returns the length of the longest common subsequence of `a` and `b`.
///
/// Runs in O(n·m) time and O(min(n, m)) space.
pub fn lcs_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    // Keep the shorter sequence in the row
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    if inner.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; inner.len() + 1];
    let mut curr = vec![0usize; inner.len() + 1];

    for x in outer {
        for (j, y) in inner.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[inner.len()]
}

/// Normalized LCS distance in `[0, 1]`: `1 - lcs / max(len)`.
///
/// Returns `default` if both sequences are empty.
pub fn lcs_distance<T: PartialEq>(a: &[T], b: &[T], default: Option<f64>) -> Option<f64> {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return default;
    }
    Some(1.0 - lcs_len(a, b) as f64 / max_len as f64)
}
