//! String similarity scoring for district names
//!
//! The default metric is the Ratcliff/Obershelp sequence ratio: find the
//! longest common block, recurse on the pieces to its left and right, and
//! score `2 * matched / (len(a) + len(b))`. Characters are compared as
//! Unicode scalar values. Jaro-Winkler and normalized Levenshtein from
//! `strsim` are available as alternatives.

use crate::error::{AtlasError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use strsim::{jaro_winkler, normalized_levenshtein};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Longest-matching-block sequence ratio
    #[default]
    Sequence,
    JaroWinkler,
    Levenshtein,
}

impl SimilarityMetric {
    /// Score two strings in [0, 1]. Identical strings always score 1.0.
    pub fn score(&self, a: &str, b: &str) -> f64 {
        match self {
            SimilarityMetric::Sequence => sequence_ratio(a, b),
            SimilarityMetric::JaroWinkler => jaro_winkler(a, b),
            SimilarityMetric::Levenshtein => normalized_levenshtein(a, b),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SimilarityMetric::Sequence => "sequence",
            SimilarityMetric::JaroWinkler => "jaro_winkler",
            SimilarityMetric::Levenshtein => "levenshtein",
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SimilarityMetric {
    type Err = AtlasError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sequence" | "ratio" => Ok(SimilarityMetric::Sequence),
            "jaro_winkler" | "jarowinkler" => Ok(SimilarityMetric::JaroWinkler),
            "levenshtein" => Ok(SimilarityMetric::Levenshtein),
            other => Err(AtlasError::Config(format!(
                "unknown similarity metric '{}' (expected sequence, jaro_winkler or levenshtein)",
                other
            ))),
        }
    }
}

/// Ratcliff/Obershelp similarity of two strings.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// Total size of the matching blocks between `a` and `b`.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b2j.entry(*c).or_default().push(j);
    }

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, &b2j, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest block `a[i..i+size] == b[j..j+size]` inside the given window.
/// Earliest start in `a` wins, then earliest start in `b`.
fn longest_match(
    a: &[char],
    b2j: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    // run length of the match ending at b[j], for the previous row of a
    let mut j2len: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_j2len = HashMap::new();
        if let Some(positions) = b2j.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let prev = if j > 0 {
                    j2len.get(&(j - 1)).copied().unwrap_or(0)
                } else {
                    0
                };
                let size = prev + 1;
                next_j2len.insert(j, size);
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            }
        }
        j2len = next_j2len;
    }

    (best_i, best_j, best_size)
}
