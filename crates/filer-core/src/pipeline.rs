//! End-to-end resolution run
//!
//! `Resolver` wires the stages together:
//!
//! ```text
//! intake → filter → group → fuzzy + token proposals → merge → canonical → validate
//! ```
//!
//! Each stage consumes the previous stage's complete output. The run never
//! aborts on bad data: malformed and unclassified records are reported in the
//! `ResolutionReport` alongside funnel counts and every merge decision.

use serde::Serialize;
use serde_json::Value;

use crate::canonical::CanonicalRecordBuilder;
use crate::classify::{EntityClassifier, EntityType, FilterDecision, InclusionFilter};
use crate::config::ResolverConfig;
use crate::error::{ConfigError, MalformedRecord, RecordProblem, Result};
use crate::export::{ResolvedDataset, ValidationIssue};
use crate::record::{parse_records, parse_records_json, ParsedInput, RawFilingRecord};
use crate::resolution::{
    Cluster, ClusterMerger, FuzzyMatcher, Grouper, MergeProposal, NormalizedKey, Normalizer,
    TokenAnalyzer,
};

/// Record and entity counts at each stage of one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FunnelCounts {
    /// Input objects seen
    pub raw: usize,
    /// Rejected at intake or unnamed after normalization
    pub malformed: usize,
    /// Filed under an unrelated proceeding
    pub out_of_proceeding: usize,
    pub third_party: usize,
    pub unclassified: usize,
    pub excluded_filers: usize,
    /// Applicant records that passed the filter with a usable name
    pub included: usize,
    /// Records held out as individuals
    pub individuals_excluded: usize,
    pub groups: usize,
    pub proposals: usize,
    pub companies: usize,
    pub filings: usize,
}

impl FunnelCounts {
    /// Records accounted for by the intake and filter stages
    ///
    /// Every raw record lands in exactly one of these buckets, so this equals
    /// `raw` for every run.
    pub fn accounted(&self) -> usize {
        self.malformed
            + self.out_of_proceeding
            + self.third_party
            + self.unclassified
            + self.excluded_filers
            + self.included
    }
}

/// A record whose submission type matched neither token set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnclassifiedSubmission {
    pub position: usize,
    pub submission_id: Option<String>,
    pub filer_name: String,
    pub submission_type: String,
}

/// One merge that joined two previously separate clusters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeDecision {
    pub left_name: String,
    pub left_key: NormalizedKey,
    pub right_name: String,
    pub right_key: NormalizedKey,
    /// "exact", "fuzzy:0.960", "token:plural"
    pub reason: String,
    pub confidence: f64,
}

/// Audit trail of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolutionReport {
    pub counts: FunnelCounts,
    pub malformed: Vec<MalformedRecord>,
    pub unclassified: Vec<UnclassifiedSubmission>,
    pub decisions: Vec<MergeDecision>,
    pub validation_issues: Vec<ValidationIssue>,
}

impl ResolutionReport {
    /// Whether the run saw anything worth a second look
    pub fn has_warnings(&self) -> bool {
        !self.malformed.is_empty()
            || !self.unclassified.is_empty()
            || !self.validation_issues.is_empty()
    }
}

/// Output of one run
#[derive(Debug, Clone)]
pub struct Resolution {
    pub dataset: ResolvedDataset,
    pub report: ResolutionReport,
}

/// Entity resolution engine
///
/// Built once from a validated configuration; every run is a pure function of
/// its input.
#[derive(Debug, Clone)]
pub struct Resolver {
    config: ResolverConfig,
    normalizer: Normalizer,
    filter: InclusionFilter,
    classifier: EntityClassifier,
    fuzzy: FuzzyMatcher,
    tokens: TokenAnalyzer,
    merger: ClusterMerger,
    builder: CanonicalRecordBuilder,
}

impl Resolver {
    /// Validate the configuration and build every stage
    pub fn new(config: ResolverConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            normalizer: Normalizer::new(&config.normalization),
            filter: InclusionFilter::new(&config.filter)?,
            classifier: EntityClassifier::new(&config.normalization, &config.classification),
            fuzzy: FuzzyMatcher::new(&config.matching),
            tokens: TokenAnalyzer::new(&config.matching),
            merger: ClusterMerger::new(),
            builder: CanonicalRecordBuilder::new(),
            config,
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Comparison key for a raw filer name
    pub fn normalize(&self, name: &str) -> NormalizedKey {
        self.normalizer.normalize(name)
    }

    /// Company-vs-individual verdict for a raw filer name
    pub fn classify(&self, name: &str) -> EntityType {
        self.classifier.classify(name)
    }

    /// Resolve already-decoded records
    pub fn resolve(&self, records: Vec<RawFilingRecord>) -> Resolution {
        self.resolve_parsed(ParsedInput {
            records,
            malformed: Vec::new(),
        })
    }

    /// Resolve a collection of JSON filing objects
    pub fn resolve_values(&self, values: &[Value]) -> Resolution {
        self.resolve_parsed(parse_records(values))
    }

    /// Resolve a JSON document holding an array of filing objects
    pub fn resolve_json(&self, json: &str) -> Result<Resolution> {
        Ok(self.resolve_parsed(parse_records_json(json)?))
    }

    pub fn resolve_parsed(&self, input: ParsedInput) -> Resolution {
        let mut report = ResolutionReport::default();
        report.counts.raw = input.total();
        report.malformed = input.malformed;

        // Filter
        let mut included = Vec::new();
        for record in input.records {
            match self.filter.evaluate(&record) {
                FilterDecision::Include => included.push(record),
                FilterDecision::OutOfProceeding => {
                    tracing::debug!(
                        "Skipping record #{} from '{}': unrelated proceeding",
                        record.position,
                        record.filer_name
                    );
                    report.counts.out_of_proceeding += 1;
                }
                FilterDecision::ThirdParty => report.counts.third_party += 1,
                FilterDecision::ExcludedFiler => {
                    tracing::debug!("Excluding filer '{}'", record.filer_name);
                    report.counts.excluded_filers += 1;
                }
                FilterDecision::Unclassified => {
                    tracing::warn!(
                        "Unclassified submission type '{}' from '{}' (record #{})",
                        record.submission_type,
                        record.filer_name,
                        record.position
                    );
                    report.unclassified.push(UnclassifiedSubmission {
                        position: record.position,
                        submission_id: record.submission_id,
                        filer_name: record.filer_name,
                        submission_type: record.submission_type,
                    });
                }
            }
        }
        report.counts.unclassified = report.unclassified.len();
        let passed = included.len();

        // Group
        let grouper = Grouper::new(
            &self.normalizer,
            &self.classifier,
            self.config.classification.exclude_individuals,
        );
        let grouping = grouper.group(included);
        report.counts.included = passed - grouping.unnamed.len();
        for record in grouping.unnamed {
            let malformed = MalformedRecord {
                position: record.position,
                submission_id: record.submission_id,
                problem: RecordProblem::InvalidField {
                    field: "filer_name",
                    message: format!("'{}' has no comparable characters", record.filer_name),
                },
            };
            tracing::warn!("Skipping malformed input: {}", malformed);
            report.malformed.push(malformed);
        }
        report.malformed.sort_by_key(|m| m.position);
        report.counts.malformed = report.malformed.len();
        tracing::info!(
            "Filtered {} records: {} included, {} malformed, {} out of proceeding, \
             {} third-party, {} unclassified, {} excluded filers",
            report.counts.raw,
            report.counts.included,
            report.counts.malformed,
            report.counts.out_of_proceeding,
            report.counts.third_party,
            report.counts.unclassified,
            report.counts.excluded_filers
        );
        report.counts.individuals_excluded = grouping
            .individuals
            .iter()
            .map(|g| g.filing_count())
            .sum();
        report.counts.groups = grouping.groups.len();
        tracing::info!(
            "Grouped into {} entity groups ({} individual filings held out)",
            report.counts.groups,
            report.counts.individuals_excluded
        );

        // Propose
        let mut proposals = self.fuzzy.propose(&grouping.groups);
        proposals.extend(self.tokens.propose(&grouping.groups));
        report.counts.proposals = proposals.len();

        // Merge
        let clusters = self.merger.merge(grouping.groups, &proposals);
        report.decisions = clusters.iter().flat_map(merge_decisions).collect();

        // Canonical records
        let dataset = self.builder.build(clusters);
        report.counts.companies = dataset.companies.len();
        report.counts.filings = dataset.filings.len();
        report.validation_issues = dataset.validate();

        tracing::info!(
            "Resolved {} raw records into {} companies with {} filings ({} merges)",
            report.counts.raw,
            report.counts.companies,
            report.counts.filings,
            report.decisions.len()
        );
        if report.counts.malformed > 0 {
            tracing::warn!("{} malformed records skipped", report.counts.malformed);
        }
        if report.counts.unclassified > 0 {
            tracing::warn!(
                "{} records with unclassified submission types skipped",
                report.counts.unclassified
            );
        }
        for issue in &report.validation_issues {
            tracing::warn!("Validation issue: {}", issue);
        }

        Resolution { dataset, report }
    }
}

fn merge_decisions(cluster: &Cluster) -> Vec<MergeDecision> {
    cluster
        .decisions
        .iter()
        .filter_map(|proposal| merge_decision(cluster, proposal))
        .collect()
}

fn merge_decision(cluster: &Cluster, proposal: &MergeProposal) -> Option<MergeDecision> {
    let left = cluster.group(proposal.left)?;
    let right = cluster.group(proposal.right)?;
    Some(MergeDecision {
        left_name: left.representative_name.clone(),
        left_key: left.normalized_key.clone(),
        right_name: right.representative_name.clone(),
        right_key: right.normalized_key.clone(),
        reason: proposal.reason.to_string(),
        confidence: proposal.confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(position: usize, name: &str, submission_type: &str) -> RawFilingRecord {
        RawFilingRecord::new(position, name, submission_type)
            .with_submission_id(format!("s{}", position))
            .with_docket("INBOX-52.15")
            .with_date(NaiveDate::from_ymd_opt(2024, 1, 1 + position as u32).unwrap())
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let mut config = ResolverConfig::default();
        config.matching.similarity_threshold = 2.0;
        assert!(matches!(
            Resolver::new(config),
            Err(ConfigError::ThresholdOutOfRange(_))
        ));

        let mut config = ResolverConfig::default();
        config.filter.excluded_filer_patterns.push("[".to_string());
        assert!(matches!(
            Resolver::new(config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_funnel_counts() {
        let resolver = Resolver::new(ResolverConfig::default()).unwrap();
        let resolution = resolver.resolve(vec![
            record(0, "Twilio Inc.", "APPLICATION"),
            record(1, "Twilio, Inc", "REQUEST FOR WAIVER"),
            record(2, "Acme Networks", "COMMENT"),
            record(3, "Wireline Competition Bureau", "PETITION"),
            record(4, "John Smith", "APPLICATION"),
            record(5, "Acme Networks", "NOTICE"),
            record(6, "---", "APPLICATION"),
            record(7, "Twilio Inc.", "APPLICATION").with_docket("24-200"),
        ]);

        let counts = &resolution.report.counts;
        assert_eq!(counts.raw, 8);
        assert_eq!(counts.out_of_proceeding, 1);
        assert_eq!(counts.third_party, 1);
        assert_eq!(counts.excluded_filers, 1);
        assert_eq!(counts.unclassified, 1);
        assert_eq!(counts.included, 3);
        assert_eq!(counts.malformed, 1);
        assert_eq!(counts.accounted(), counts.raw);
        assert_eq!(counts.individuals_excluded, 1);
        assert_eq!(counts.groups, 1);
        assert_eq!(counts.companies, 1);
        assert_eq!(counts.filings, 2);

        assert_eq!(resolution.report.unclassified[0].position, 5);
        assert_eq!(resolution.report.malformed[0].position, 6);
        assert!(resolution.report.has_warnings());
        assert!(resolution.report.validation_issues.is_empty());
    }

    #[test]
    fn test_unnamed_records_counted_once() {
        let resolver = Resolver::new(ResolverConfig::default()).unwrap();
        let resolution = resolver.resolve(vec![
            record(0, "---", "APPLICATION"),
            record(1, "Acme Networks", "APPLICATION"),
        ]);

        let counts = &resolution.report.counts;
        assert_eq!(counts.raw, 2);
        assert_eq!(counts.malformed, 1);
        assert_eq!(counts.included, 1);
        assert_eq!(counts.accounted(), counts.raw);
        assert_eq!(counts.filings, 1);
    }

    #[test]
    fn test_merge_decisions_reported() {
        let resolver = Resolver::new(ResolverConfig::default()).unwrap();
        let resolution = resolver.resolve(vec![
            record(0, "Stratus Networks", "APPLICATION"),
            record(1, "Stratus Network", "APPLICATION"),
        ]);

        assert_eq!(resolution.dataset.companies.len(), 1);
        let decisions = &resolution.report.decisions;
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].left_name, "Stratus Networks");
        assert_eq!(decisions[0].right_name, "Stratus Network");
        assert!(decisions[0].reason.starts_with("fuzzy:"));
    }

    #[test]
    fn test_plural_rule_below_threshold() {
        let mut config = ResolverConfig::default();
        config.matching.similarity_threshold = 0.99;
        let resolver = Resolver::new(config).unwrap();

        let resolution = resolver.resolve(vec![
            record(0, "Stratus Networks", "APPLICATION"),
            record(1, "Stratus Network", "APPLICATION"),
        ]);

        assert_eq!(resolution.dataset.companies.len(), 1);
        assert_eq!(resolution.report.decisions[0].reason, "token:plural");
        assert_eq!(
            resolution.dataset.companies[0].merge_reasons,
            vec!["token:plural"]
        );
    }

    #[test]
    fn test_individuals_kept_when_configured() {
        let mut config = ResolverConfig::default();
        config.classification.exclude_individuals = false;
        let resolver = Resolver::new(config).unwrap();

        let resolution = resolver.resolve(vec![record(0, "John Smith", "APPLICATION")]);
        assert_eq!(resolution.dataset.companies.len(), 1);
        assert_eq!(
            resolution.dataset.companies[0].entity_type,
            EntityType::Individual
        );
    }

    #[test]
    fn test_normalize_delegates() {
        let resolver = Resolver::new(ResolverConfig::default()).unwrap();
        assert_eq!(resolver.normalize("Twilio, Inc.").as_str(), "twilio");
        assert_eq!(resolver.classify("Twilio, Inc."), EntityType::Company);
        assert_eq!(resolver.classify("Jane Doe"), EntityType::Individual);
    }

    #[test]
    fn test_resolve_json_rejects_non_array() {
        let resolver = Resolver::new(ResolverConfig::default()).unwrap();
        assert!(resolver.resolve_json("{}").is_err());
        assert!(resolver.resolve_json("[]").unwrap().dataset.companies.is_empty());
    }
}
