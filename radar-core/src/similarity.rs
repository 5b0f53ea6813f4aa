//! Gestalt (Ratcliff/Obershelp) string similarity
//!
//! `ratio = 2·M / (|a| + |b|)`, where `M` is the number of characters covered
//! by the matching blocks found by repeatedly taking the longest common
//! substring and recursing on both sides of it. Two empty strings are
//! identical (ratio 1.0).

use std::collections::HashMap;

/// Similarity of two strings in `[0, 1]`, computed over Unicode scalar values
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Case-insensitive similarity
pub fn similarity_ratio_folded(a: &str, b: &str) -> f64 {
    similarity_ratio(&a.to_lowercase(), &b.to_lowercase())
}

/// Reusable matcher for comparing one candidate against many stored strings
///
/// Comparisons are filtered by two cheap upper bounds before the full ratio:
/// the length bound and the shared character multiset.
pub struct SimilarityMatcher {
    candidate: Vec<char>,
    counts: HashMap<char, usize>,
    threshold: f64,
}

impl SimilarityMatcher {
    /// Case-folds the candidate once up front
    pub fn new(candidate: &str, threshold: f64) -> Self {
        let candidate: Vec<char> = candidate.to_lowercase().chars().collect();
        let counts = char_counts(&candidate);
        Self {
            candidate,
            counts,
            threshold,
        }
    }

    /// Similarity between the candidate and a (case-folded) other string
    pub fn ratio(&self, other: &str) -> f64 {
        let other: Vec<char> = other.to_lowercase().chars().collect();
        self.ratio_chars(&other)
    }

    pub fn matches(&self, other: &str) -> bool {
        let other: Vec<char> = other.to_lowercase().chars().collect();
        let total = self.candidate.len() + other.len();
        if total == 0 {
            return 1.0 >= self.threshold;
        }

        // M can never exceed the shorter length
        let length_bound = 2.0 * self.candidate.len().min(other.len()) as f64 / total as f64;
        if length_bound < self.threshold {
            return false;
        }

        // nor the size of the shared character multiset
        if self.quick_ratio(&other) < self.threshold {
            return false;
        }

        self.ratio_chars(&other) >= self.threshold
    }

    /// Upper bound on the ratio from character counts alone
    fn quick_ratio(&self, other: &[char]) -> f64 {
        let total = self.candidate.len() + other.len();
        if total == 0 {
            return 1.0;
        }
        let shared: usize = char_counts(other)
            .iter()
            .map(|(c, n)| (*n).min(self.counts.get(c).copied().unwrap_or(0)))
            .sum();
        2.0 * shared as f64 / total as f64
    }

    fn ratio_chars(&self, other: &[char]) -> f64 {
        let total = self.candidate.len() + other.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * matching_chars(&self.candidate, other) as f64 / total as f64
    }
}

/// Strings at least this long have their most frequent characters ignored
/// when searching for matching blocks
pub const AUTOJUNK_MIN_LEN: usize = 200;

fn char_counts(chars: &[char]) -> HashMap<char, usize> {
    let mut counts = HashMap::new();
    for c in chars {
        *counts.entry(*c).or_insert(0) += 1;
    }
    counts
}

/// Positions of each character of `b`, minus popular characters
///
/// In strings of [`AUTOJUNK_MIN_LEN`] or more, a character occurring more than
/// `1 + len / 100` times cannot start or extend a matching block.
fn index_positions(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    if b.len() >= AUTOJUNK_MIN_LEN {
        let popular = b.len() / 100 + 1;
        b2j.retain(|_, positions| positions.len() <= popular);
    }

    b2j
}

/// Match lengths ending at each position of `b`, for the previous and
/// current row of `a`; only touched slots are reset between rows
struct RunLengths {
    prev: Vec<usize>,
    next: Vec<usize>,
    prev_touched: Vec<usize>,
    next_touched: Vec<usize>,
}

impl RunLengths {
    fn new(len: usize) -> Self {
        Self {
            prev: vec![0; len + 1],
            next: vec![0; len + 1],
            prev_touched: Vec::new(),
            next_touched: Vec::new(),
        }
    }

    fn advance(&mut self) {
        for slot in self.prev_touched.drain(..) {
            self.prev[slot] = 0;
        }
        std::mem::swap(&mut self.prev, &mut self.next);
        std::mem::swap(&mut self.prev_touched, &mut self.next_touched);
    }

    fn reset(&mut self) {
        for slot in self.prev_touched.drain(..) {
            self.prev[slot] = 0;
        }
        for slot in self.next_touched.drain(..) {
            self.next[slot] = 0;
        }
    }
}

/// Total size of all matching blocks
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let b2j = index_positions(b);
    let mut runs = RunLengths::new(b.len());

    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b2j, &mut runs, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`
///
/// Ties resolve to the earliest start in `a`, then in `b`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    runs: &mut RunLengths,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                // slot j + 1 holds the run ending at b[j]
                let k = runs.prev[j] + 1;
                runs.next[j + 1] = k;
                runs.next_touched.push(j + 1);
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        runs.advance();
    }
    runs.reset();

    (best_i, best_j, best_k)
}
