//! Token-level precision rules
//!
//! Generic similarity is tuned to avoid false merges, so it misses some
//! variants a human would accept on sight. These rules look at token
//! structure instead of character distance.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::grouping::EntityGroup;
use super::normalization::NormalizedKey;
use super::similarity::{MergeProposal, MergeReason, SimilarityMetric};
use crate::config::MatchingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRule {
    /// Keys differ only by a trailing "s" on one token
    Plural,
}

impl fmt::Display for TokenRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenRule::Plural => write!(f, "plural"),
        }
    }
}

/// "stratus networks" vs "stratus network": same token count, exactly one
/// differing position, and there one token is the other plus "s"
pub fn plural_variant(a: &NormalizedKey, b: &NormalizedKey) -> bool {
    let left: Vec<&str> = a.tokens().collect();
    let right: Vec<&str> = b.tokens().collect();
    if left.len() != right.len() || left.is_empty() {
        return false;
    }

    let mut differing = left.iter().zip(&right).filter(|(x, y)| x != y);
    match (differing.next(), differing.next()) {
        (Some((x, y)), None) => is_plural_of(x, y) || is_plural_of(y, x),
        _ => false,
    }
}

fn is_plural_of(plural: &str, singular: &str) -> bool {
    plural.len() == singular.len() + 1
        && plural.starts_with(singular)
        && plural.ends_with('s')
}

/// Proposes merges between groups related by a token rule
#[derive(Debug, Clone)]
pub struct TokenAnalyzer {
    enabled: bool,
    /// Used only to report a confidence for fired rules
    metric: SimilarityMetric,
}

impl TokenAnalyzer {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            enabled: config.plural_rule,
            metric: config.metric,
        }
    }

    pub fn compare(&self, left: &EntityGroup, right: &EntityGroup) -> Option<MergeProposal> {
        if !self.enabled || !plural_variant(&left.normalized_key, &right.normalized_key) {
            return None;
        }

        let confidence = self
            .metric
            .score(left.normalized_key.as_str(), right.normalized_key.as_str());
        Some(MergeProposal::new(
            left.id,
            right.id,
            MergeReason::Token {
                rule: TokenRule::Plural,
            },
            confidence,
        ))
    }

    /// Only groups with the same token count can be plural variants, so pairs
    /// are compared within token-count blocks.
    pub fn propose(&self, groups: &[EntityGroup]) -> Vec<MergeProposal> {
        if !self.enabled {
            return Vec::new();
        }

        let mut blocks: BTreeMap<usize, Vec<&EntityGroup>> = BTreeMap::new();
        for group in groups {
            blocks
                .entry(group.normalized_key.token_count())
                .or_default()
                .push(group);
        }

        let mut proposals = Vec::new();
        for block in blocks.values() {
            for (i, left) in block.iter().enumerate() {
                for right in &block[i + 1..] {
                    if let Some(proposal) = self.compare(left, right) {
                        proposals.push(proposal);
                    }
                }
            }
        }

        tracing::debug!(
            "Token analyzer: {} proposals across {} blocks",
            proposals.len(),
            blocks.len()
        );
        proposals
    }
}
