//! Entity resolution stages
//!
//! Normalization, exact-key grouping, candidate matching (fuzzy and
//! plural-token) and cluster merging. Each stage takes the previous stage's
//! output by value or reference and returns a fresh result.

pub(crate) mod clustering;
pub(crate) mod grouping;
pub(crate) mod normalization;
pub(crate) mod similarity;
pub(crate) mod tokens;

pub use clustering::{Cluster, ClusterMerger};
pub use grouping::{EntityGroup, GroupId, Grouper, GroupingOutcome};
pub use normalization::{fold_tokens, NormalizedKey, Normalizer};
pub use similarity::{indel_ratio, FuzzyMatcher, MergeProposal, MergeReason, SimilarityMetric};
pub use tokens::{plural_variant, TokenAnalyzer, TokenRule};
