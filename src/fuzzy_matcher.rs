use crate::identity::{canonicalize, IdentityIndex};
use crate::similarity::SimilarityMetric;
use serde::{Deserialize, Serialize};

/// Default similarity cutoff for accepting a district match
pub const DEFAULT_THRESHOLD: f64 = 0.85;

/// Fuzzy matcher for district names with spelling/transliteration drift
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyMatcher {
    /// Similarity threshold (0.0-1.0); a score equal to it is a match
    pub similarity_threshold: f64,
    pub metric: SimilarityMetric,
}

impl Default for FuzzyMatcher {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_THRESHOLD,
            metric: SimilarityMetric::Sequence,
        }
    }
}

/// A canonical id chosen for a normalized district name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistrictMatch {
    pub canonical_id: String,
    pub score: f64,
}

impl FuzzyMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            similarity_threshold: threshold,
            ..Self::default()
        }
    }

    pub fn with_metric(mut self, metric: SimilarityMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Similarity of `name` to `candidate` after canonicalization.
    ///
    /// The sequence ratio is order-sensitive: the candidate id is the first
    /// sequence and the name being looked up is the second.
    pub fn similarity(&self, candidate: &str, name: &str) -> f64 {
        self.metric.score(&canonicalize(candidate), &canonicalize(name))
    }

    pub fn is_match(&self, candidate: &str, name: &str) -> bool {
        self.similarity(candidate, name) >= self.similarity_threshold
    }

    /// Find the best canonical id for `name`.
    ///
    /// Returns the highest-scoring id whose score is at least the threshold.
    /// Among equal scores the lexicographically smallest id wins, since the
    /// index iterates in order and only a strictly better score replaces
    /// the current best.
    pub fn find_best_match(&self, name: &str, index: &IdentityIndex) -> Option<DistrictMatch> {
        let target = canonicalize(name);

        if index.contains(&target) {
            return Some(DistrictMatch {
                canonical_id: target,
                score: 1.0,
            });
        }

        let mut best: Option<(&str, f64)> = None;
        for candidate in index.iter() {
            let score = self.metric.score(candidate, &target);
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((candidate, score)),
            }
        }

        best.filter(|(_, score)| *score >= self.similarity_threshold)
            .map(|(id, score)| DistrictMatch {
                canonical_id: id.to_string(),
                score,
            })
    }
}
