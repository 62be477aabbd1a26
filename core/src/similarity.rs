//! Shingling and set similarity shared by near-duplicate detection and
//! spell correction.

use std::collections::HashSet;
use std::hash::Hash;

/// Distinct contiguous substrings of `k` characters.
///
/// Strings shorter than `k` (and `k == 0`) have no shingles.
pub fn shingle(text: &str, k: usize) -> HashSet<String> {
    if k == 0 {
        return HashSet::new();
    }
    let chars: Vec<char> = text.chars().collect();
    chars.windows(k).map(|window| window.iter().collect()).collect()
}

/// `|A ∩ B| / |A ∪ B|`, defined as 0 when both sets are empty.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|item| large.contains(*item)).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
