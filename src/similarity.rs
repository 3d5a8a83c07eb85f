//! String similarity primitives
//!
//! `fuzzy_ratio` is the normalized indel similarity on a 0-100 scale, the
//! same measure used for pattern matching and accuracy scoring.
//! `edit_distance` is the optimal-string-alignment distance used by the
//! spelling sources.

/// Similarity of two strings on a 0.0-100.0 scale.
///
/// Computed as `100 * (1 - indel / (len(a) + len(b)))` where `indel` is the
/// minimum number of insertions and deletions turning `a` into `b`. Two empty
/// strings are identical (100.0).
pub fn fuzzy_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }

    let lcs = longest_common_subsequence(&a, &b);
    let indel = total - 2 * lcs;
    100.0 * (1.0 - indel as f64 / total as f64)
}

/// Accuracy of `predicted` against `truth` in [0.0, 1.0].
///
/// An empty ground truth only matches an empty prediction.
pub fn levenshtein_accuracy(predicted: &str, truth: &str) -> f64 {
    if truth.is_empty() {
        return if predicted.is_empty() { 1.0 } else { 0.0 };
    }
    fuzzy_ratio(predicted, truth) / 100.0
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Optimal string alignment distance (Damerau-Levenshtein restricted to
/// non-overlapping adjacent transpositions).
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let width = b.len() + 1;
    let mut d = vec![0usize; (a.len() + 1) * width];
    for i in 0..=a.len() {
        d[i * width] = i;
    }
    for j in 0..=b.len() {
        d[j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[(i - 1) * width + j] + 1)
                .min(d[i * width + j - 1] + 1)
                .min(d[(i - 1) * width + j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[(i - 2) * width + j - 2] + 1);
            }
            d[i * width + j] = best;
        }
    }
    d[a.len() * width + b.len()]
}
