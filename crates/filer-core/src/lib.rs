//! filer-core: entity resolution for regulatory filing records
//!
//! Turns event-level filing records (one row per submission) into deduplicated
//! company entities with attached filing histories:
//! - Record intake: JSON objects to `RawFilingRecord`, malformed rows reported
//! - Inclusion filter and individual-vs-company classification
//! - Normalization of filer names to comparison keys
//! - Grouping, fuzzy matching, plural-token matching, cluster merging
//! - Canonical company synthesis with stable ids
//! - Star-schema export (companies dimension, filings fact) and nested form
//!
//! # Architecture
//!
//! ```text
//! intake → filter → normalize/group → fuzzy + token proposals → union-find → canonical → export
//! ```
//!
//! Every stage consumes an immutable snapshot of the previous stage's output.
//! The whole run is deterministic for a fixed input order.

pub mod canonical;
pub mod classify;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod record;
pub mod resolution;

pub use canonical::{CanonicalCompany, CanonicalRecordBuilder, FilingRecord};
pub use classify::{EntityClassifier, EntityType, FilterDecision, InclusionFilter, SubmissionClass};
pub use config::{
    ClassificationConfig, FilterConfig, MatchingConfig, NormalizationConfig, ResolverConfig,
};
pub use enrichment::{enrich_all, Enrichment, EnrichmentOutcome, EnrichmentProvider, EnrichmentRequest};
pub use error::{ConfigError, ExportError, FilerError, MalformedRecord, RecordProblem, Result};
pub use export::{
    CompanyRow, DocumentManifest, FilingRow, NestedCompany, ResolvedDataset, ValidationIssue,
};
pub use pipeline::{
    FunnelCounts, MergeDecision, Resolution, ResolutionReport, Resolver, UnclassifiedSubmission,
};
pub use record::{parse_records, parse_records_json, ParsedInput, RawFilingRecord};
pub use resolution::{
    Cluster, ClusterMerger, EntityGroup, FuzzyMatcher, GroupId, Grouper, GroupingOutcome,
    MergeProposal, MergeReason, NormalizedKey, Normalizer, SimilarityMetric, TokenAnalyzer,
    TokenRule,
};

/// Returns the version of filer-core
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
