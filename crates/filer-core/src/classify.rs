//! Record and name classification predicates
//!
//! - Inclusion filter: proceeding relevance, applicant vs third-party
//!   submissions, excluded filers
//! - Entity classifier: company vs individual filer names
//!
//! Both are pure and total; decisions are returned, never applied here.

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::config::{ClassificationConfig, FilterConfig, NormalizationConfig};
use crate::error::ConfigError;
use crate::record::RawFilingRecord;
use crate::resolution::normalization::{fold_tokens, Normalizer};

/// Whether a resolved entity is an organization or a natural person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Company,
    Individual,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Company => "Company",
            EntityType::Individual => "Individual",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bucket a submission type falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionClass {
    /// Filed by the applicant itself (application, request, petition)
    Applicant,
    /// Filed about someone else's application (comment, reply, opposition)
    ThirdParty,
    /// Matches neither token set
    Unclassified,
}

/// Outcome of the inclusion filter for one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterDecision {
    Include,
    /// Filed under a proceeding outside the configured relevance patterns
    OutOfProceeding,
    ThirdParty,
    Unclassified,
    /// Applicant filing by a filer that is never a company (e.g. the regulator)
    ExcludedFiler,
}

/// Decides which raw records enter the company dimension
#[derive(Debug, Clone)]
pub struct InclusionFilter {
    proceeding_patterns: Vec<String>,
    docket_patterns: Vec<String>,
    applicant_tokens: Vec<String>,
    third_party_tokens: Vec<String>,
    excluded_filers: Vec<Regex>,
}

impl InclusionFilter {
    /// Build the filter, compiling exclusion patterns case-insensitively
    pub fn new(config: &FilterConfig) -> Result<Self, ConfigError> {
        let excluded_filers = config
            .excluded_filer_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidPattern {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            proceeding_patterns: lower_trimmed(&config.relevant_proceeding_patterns),
            docket_patterns: lower_trimmed(&config.relevant_docket_patterns),
            applicant_tokens: upper_trimmed(&config.applicant_tokens),
            third_party_tokens: upper_trimmed(&config.third_party_tokens),
            excluded_filers,
        })
    }

    /// Whether the record was filed under a relevant proceeding
    ///
    /// Case-insensitive substring match on the proceeding description or the
    /// docket number. Always true when no patterns are configured.
    pub fn is_relevant_proceeding(&self, record: &RawFilingRecord) -> bool {
        if self.proceeding_patterns.is_empty() && self.docket_patterns.is_empty() {
            return true;
        }

        let description = record
            .proceeding_description
            .as_deref()
            .unwrap_or("")
            .to_lowercase();
        let docket = record.docket_number.to_lowercase();

        self.proceeding_patterns
            .iter()
            .any(|p| description.contains(p.as_str()))
            || self.docket_patterns.iter().any(|p| docket.contains(p.as_str()))
    }

    /// Classify a submission type by case-insensitive substring match.
    /// Third-party tokens win when both sets match ("REPLY TO PETITION").
    pub fn classify_submission(&self, submission_type: &str) -> SubmissionClass {
        let upper = submission_type.to_uppercase();

        if self.third_party_tokens.iter().any(|t| upper.contains(t)) {
            SubmissionClass::ThirdParty
        } else if self.applicant_tokens.iter().any(|t| upper.contains(t)) {
            SubmissionClass::Applicant
        } else {
            SubmissionClass::Unclassified
        }
    }

    /// Whether the filer name matches any exclusion pattern
    pub fn is_excluded_filer(&self, filer_name: &str) -> bool {
        let name = filer_name.trim();
        self.excluded_filers.iter().any(|re| re.is_match(name))
    }

    pub fn evaluate(&self, record: &RawFilingRecord) -> FilterDecision {
        if !self.is_relevant_proceeding(record) {
            return FilterDecision::OutOfProceeding;
        }

        match self.classify_submission(&record.submission_type) {
            SubmissionClass::ThirdParty => FilterDecision::ThirdParty,
            SubmissionClass::Unclassified => FilterDecision::Unclassified,
            SubmissionClass::Applicant if self.is_excluded_filer(&record.filer_name) => {
                FilterDecision::ExcludedFiler
            }
            SubmissionClass::Applicant => FilterDecision::Include,
        }
    }
}

fn upper_trimmed(tokens: &[String]) -> Vec<String> {
    tokens
        .iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn lower_trimmed(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Company-likelihood heuristic over raw filer names
///
/// A name is a company when any of these hold:
/// - it contains a legal-suffix token sequence ("llc", "l l c", "inc", ...)
/// - a token starts with a business-indicator stem ("network" matches "networks")
/// - it has more than `max_individual_tokens` tokens
///
/// Everything else ("John Smith", "Jane Q Doe") is an individual.
#[derive(Debug, Clone)]
pub struct EntityClassifier {
    normalizer: Normalizer,
    indicators: Vec<Vec<String>>,
    max_individual_tokens: usize,
}

impl EntityClassifier {
    pub fn new(normalization: &NormalizationConfig, classification: &ClassificationConfig) -> Self {
        Self {
            normalizer: Normalizer::new(normalization),
            indicators: classification
                .business_indicators
                .iter()
                .map(|s| fold_tokens(s))
                .filter(|tokens| !tokens.is_empty())
                .collect(),
            max_individual_tokens: classification.max_individual_tokens,
        }
    }

    pub fn classify(&self, raw_name: &str) -> EntityType {
        let tokens = fold_tokens(raw_name);

        if tokens.len() > self.max_individual_tokens
            || self.normalizer.has_legal_suffix(&tokens)
            || self.has_business_indicator(&tokens)
        {
            EntityType::Company
        } else {
            EntityType::Individual
        }
    }

    /// Indicator sequences match exactly except the last token, which is a stem
    fn has_business_indicator(&self, tokens: &[String]) -> bool {
        self.indicators.iter().any(|indicator| {
            tokens.windows(indicator.len()).any(|window| {
                let last = indicator.len() - 1;
                window[..last] == indicator[..last] && window[last].starts_with(&indicator[last])
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn filter() -> InclusionFilter {
        InclusionFilter::new(&FilterConfig::default()).unwrap()
    }

    fn classifier() -> EntityClassifier {
        EntityClassifier::new(
            &NormalizationConfig::default(),
            &ClassificationConfig::default(),
        )
    }

    #[rstest]
    #[case("APPLICATION", SubmissionClass::Applicant)]
    #[case("Application for Authorization", SubmissionClass::Applicant)]
    #[case("REQUEST FOR WAIVER", SubmissionClass::Applicant)]
    #[case("petition", SubmissionClass::Applicant)]
    #[case("COMMENT", SubmissionClass::ThirdParty)]
    #[case("REPLY TO COMMENTS", SubmissionClass::ThirdParty)]
    #[case("OPPOSITION", SubmissionClass::ThirdParty)]
    #[case("REPLY TO PETITION", SubmissionClass::ThirdParty)]
    #[case("NOTICE OF EX PARTE", SubmissionClass::Unclassified)]
    #[case("", SubmissionClass::Unclassified)]
    fn test_classify_submission(#[case] submission_type: &str, #[case] expected: SubmissionClass) {
        assert_eq!(filter().classify_submission(submission_type), expected);
    }

    #[test]
    fn test_excluded_filers() {
        let filter = filter();
        assert!(filter.is_excluded_filer("Wireline Competition Bureau"));
        assert!(filter.is_excluded_filer("FCC Office of the Secretary"));
        assert!(!filter.is_excluded_filer("FCCX Telecom LLC"));
        assert!(!filter.is_excluded_filer("Twilio Inc."));
    }

    fn voip(record: RawFilingRecord) -> RawFilingRecord {
        record.with_proceeding("Interconnected VoIP Numbering")
    }

    #[test]
    fn test_evaluate_record() {
        let filter = filter();
        let applicant = voip(RawFilingRecord::new(0, "Twilio Inc.", "APPLICATION"));
        let comment = voip(RawFilingRecord::new(1, "Twilio Inc.", "COMMENT"));
        let regulator = voip(RawFilingRecord::new(
            2,
            "Wireline Competition Bureau",
            "PETITION",
        ));
        let other = voip(RawFilingRecord::new(3, "Twilio Inc.", "LETTER"));

        assert_eq!(filter.evaluate(&applicant), FilterDecision::Include);
        assert_eq!(filter.evaluate(&comment), FilterDecision::ThirdParty);
        assert_eq!(filter.evaluate(&regulator), FilterDecision::ExcludedFiler);
        assert_eq!(filter.evaluate(&other), FilterDecision::Unclassified);
    }

    #[test]
    fn test_proceeding_relevance() {
        let filter = filter();
        let by_description = RawFilingRecord::new(0, "Twilio Inc.", "APPLICATION")
            .with_proceeding("Numbering Policies, Section 52.15(g)");
        let by_docket = RawFilingRecord::new(1, "Twilio Inc.", "APPLICATION")
            .with_docket("24-118; INBOX-52.15");
        let unrelated = RawFilingRecord::new(2, "Twilio Inc.", "APPLICATION")
            .with_proceeding("Rural Broadband Support")
            .with_docket("24-200");
        let bare = RawFilingRecord::new(3, "Twilio Inc.", "COMMENT");

        assert!(filter.is_relevant_proceeding(&by_description));
        assert!(filter.is_relevant_proceeding(&by_docket));
        assert_eq!(filter.evaluate(&by_docket), FilterDecision::Include);
        assert_eq!(filter.evaluate(&unrelated), FilterDecision::OutOfProceeding);
        assert_eq!(filter.evaluate(&bare), FilterDecision::OutOfProceeding);
    }

    #[test]
    fn test_empty_relevance_patterns_keep_everything() {
        let filter = InclusionFilter::new(&FilterConfig {
            relevant_proceeding_patterns: Vec::new(),
            relevant_docket_patterns: Vec::new(),
            ..Default::default()
        })
        .unwrap();
        let record = RawFilingRecord::new(0, "Twilio Inc.", "APPLICATION").with_docket("24-200");
        assert!(filter.is_relevant_proceeding(&record));
        assert_eq!(filter.evaluate(&record), FilterDecision::Include);
    }

    #[test]
    fn test_invalid_pattern_fails_fast() {
        let config = FilterConfig {
            excluded_filer_patterns: vec!["(unclosed".to_string()],
            ..Default::default()
        };
        let err = InclusionFilter::new(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[rstest]
    #[case("Twilio Inc.", EntityType::Company)]
    #[case("Acme L.L.C.", EntityType::Company)]
    #[case("Stratus Networks", EntityType::Company)]
    #[case("Acme Telecommunications", EntityType::Company)]
    #[case("Bright Path Voice and Data", EntityType::Company)]
    #[case("John Smith", EntityType::Individual)]
    #[case("Jane Q. Doe", EntityType::Individual)]
    #[case("Twilio", EntityType::Individual)]
    fn test_classify_entity(#[case] name: &str, #[case] expected: EntityType) {
        assert_eq!(classifier().classify(name), expected);
    }

    #[test]
    fn test_classification_is_configurable() {
        let classification = ClassificationConfig {
            business_indicators: vec!["twilio".to_string()],
            max_individual_tokens: 1,
            ..Default::default()
        };
        let classifier = EntityClassifier::new(&NormalizationConfig::default(), &classification);
        assert_eq!(classifier.classify("Twilio"), EntityType::Company);
        assert_eq!(classifier.classify("John Smith"), EntityType::Company);
        assert_eq!(classifier.classify("Smith"), EntityType::Individual);
    }
}
