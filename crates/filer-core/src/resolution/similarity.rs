//! Pairwise similarity scoring and fuzzy merge proposals

use std::fmt;

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use super::grouping::{EntityGroup, GroupId};
use super::tokens::TokenRule;
use crate::config::MatchingConfig;

/// String similarity metric applied to normalized keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// 2·LCS / (|a| + |b|): insertion/deletion edit ratio
    #[default]
    Indel,
    /// 1 - levenshtein / max(|a|, |b|)
    Levenshtein,
    /// Jaro-Winkler, favours shared prefixes
    JaroWinkler,
}

impl SimilarityMetric {
    /// Similarity in [0, 1]; identical strings score 1.0
    pub fn score(&self, a: &str, b: &str) -> f64 {
        match self {
            SimilarityMetric::Indel => indel_ratio(a, b),
            SimilarityMetric::Levenshtein => normalized_levenshtein(a, b),
            SimilarityMetric::JaroWinkler => jaro_winkler(a, b),
        }
    }
}

/// Insertion/deletion similarity ratio, `2·LCS / (|a| + |b|)`
///
/// Equivalent to one minus the indel distance over the combined length.
/// Two empty strings are identical.
pub fn indel_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    // Longest common subsequence, two rolling rows
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                previous[j + 1].max(current[j])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }
    let lcs = previous[b.len()];

    (2 * lcs) as f64 / total as f64
}

/// Why two groups are proposed as the same entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeReason {
    /// Identical normalized keys
    Exact,
    /// Generic similarity at or above the threshold
    Fuzzy { score: f64 },
    /// A token-level precision rule fired
    Token { rule: TokenRule },
}

impl fmt::Display for MergeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeReason::Exact => write!(f, "exact"),
            MergeReason::Fuzzy { score } => write!(f, "fuzzy:{:.3}", score),
            MergeReason::Token { rule } => write!(f, "token:{}", rule),
        }
    }
}

/// Candidate edge asserting two groups are the same company
///
/// Symmetric: `left` is always the smaller id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeProposal {
    pub left: GroupId,
    pub right: GroupId,
    pub reason: MergeReason,
    /// Confidence in [0, 1]
    pub confidence: f64,
}

impl MergeProposal {
    pub fn new(a: GroupId, b: GroupId, reason: MergeReason, confidence: f64) -> Self {
        let (left, right) = if a <= b { (a, b) } else { (b, a) };
        Self {
            left,
            right,
            reason,
            confidence,
        }
    }
}

/// Proposes merges between groups whose keys are nearly identical
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    threshold: f64,
    metric: SimilarityMetric,
}

impl FuzzyMatcher {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            threshold: config.similarity_threshold,
            metric: config.metric,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare two groups, proposing a merge when they clear the threshold
    pub fn compare(&self, left: &EntityGroup, right: &EntityGroup) -> Option<MergeProposal> {
        if left.normalized_key == right.normalized_key {
            return Some(MergeProposal::new(
                left.id,
                right.id,
                MergeReason::Exact,
                1.0,
            ));
        }

        let score = self
            .metric
            .score(left.normalized_key.as_str(), right.normalized_key.as_str());
        (score >= self.threshold).then(|| {
            MergeProposal::new(left.id, right.id, MergeReason::Fuzzy { score }, score)
        })
    }

    /// Compare every pair of groups once
    ///
    /// Proposal order follows group order; with the `parallel` feature the
    /// outer loop is sharded across threads and the order is unchanged.
    pub fn propose(&self, groups: &[EntityGroup]) -> Vec<MergeProposal> {
        #[cfg(feature = "parallel")]
        let proposals: Vec<MergeProposal> = {
            use rayon::prelude::*;
            (0..groups.len())
                .into_par_iter()
                .flat_map_iter(|i| self.proposals_for(groups, i))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let proposals: Vec<MergeProposal> = (0..groups.len())
            .flat_map(|i| self.proposals_for(groups, i))
            .collect();

        tracing::debug!(
            "Fuzzy matcher: {} proposals over {} groups (threshold {})",
            proposals.len(),
            groups.len(),
            self.threshold
        );
        proposals
    }

    fn proposals_for(&self, groups: &[EntityGroup], i: usize) -> Vec<MergeProposal> {
        let left = &groups[i];
        groups[i + 1..]
            .iter()
            .filter_map(|right| self.compare(left, right))
            .collect()
    }
}
