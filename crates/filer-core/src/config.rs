//! Configuration for filer-core
//!
//! One immutable value carries every tunable of a resolution run: the
//! legal-suffix list, inclusion token sets, the individual heuristic and the
//! matching threshold. Components receive the section they need by reference.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::resolution::normalization::fold_tokens;
use crate::resolution::SimilarityMetric;

/// Resolution-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ResolverConfig {
    /// Name normalization settings
    pub normalization: NormalizationConfig,
    /// Submission-type inclusion and filer exclusion
    pub filter: FilterConfig,
    /// Individual-vs-company heuristic
    pub classification: ClassificationConfig,
    /// Candidate matching settings
    pub matching: MatchingConfig,
}

/// Name normalization configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Trailing legal-suffix tokens stripped from keys, repeatedly
    pub legal_suffixes: Vec<String>,
    /// Drop "d/b/a ..." trade-name tails and keep the legal name
    pub strip_dba: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            legal_suffixes: to_strings(&[
                "llc",
                "l.l.c.",
                "inc",
                "incorporated",
                "co",
                "corp",
                "corporation",
                "company",
                "ltd",
                "limited",
                "lp",
                "l.p.",
                "llp",
                "l.l.p.",
                "pllc",
                "plc",
            ]),
            strip_dba: true,
        }
    }
}

/// Inclusion filter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Proceeding-description substrings marking a relevant filing
    pub relevant_proceeding_patterns: Vec<String>,
    /// Docket-number substrings marking a relevant filing
    ///
    /// With both relevance lists empty every proceeding is relevant.
    pub relevant_docket_patterns: Vec<String>,
    /// Submission-type substrings marking an applicant filing
    pub applicant_tokens: Vec<String>,
    /// Submission-type substrings marking a third-party filing
    pub third_party_tokens: Vec<String>,
    /// Case-insensitive regular expressions for filers that are never companies
    pub excluded_filer_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            relevant_proceeding_patterns: to_strings(&["voip", "52.15"]),
            relevant_docket_patterns: to_strings(&["inbox-52.15"]),
            applicant_tokens: to_strings(&["APPLICATION", "REQUEST", "PETITION"]),
            third_party_tokens: to_strings(&["COMMENT", "REPLY", "OPPOSITION"]),
            excluded_filer_patterns: to_strings(&[
                r"wireline competition bureau",
                r"^fcc\b",
                r"federal communications commission",
                r"national telecommunications and information",
                r"department of justice",
                r"national association of regulatory",
            ]),
        }
    }
}

/// Individual-vs-company heuristic configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Token stems that mark an organization ("network" matches "networks")
    pub business_indicators: Vec<String>,
    /// Names with more tokens than this are treated as organizations
    pub max_individual_tokens: usize,
    /// Drop groups classified as individuals instead of flagging them
    pub exclude_individuals: bool,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            business_indicators: to_strings(&[
                "communication",
                "telecom",
                "voip",
                "network",
                "service",
                "solution",
                "system",
                "technolog",
                "wireless",
                "telephone",
                "broadband",
                "cloud",
                "digital",
                "group",
                "holding",
                "partner",
                "enterprise",
                "global",
                "international",
                "carrier",
                "connect",
                "media",
                "mobile",
                "data",
            ]),
            max_individual_tokens: 3,
            exclude_individuals: true,
        }
    }
}

/// Candidate matching configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum similarity for a fuzzy merge proposal (0.0 - 1.0)
    pub similarity_threshold: f64,
    /// Similarity metric applied to normalized keys
    pub metric: SimilarityMetric,
    /// Merge keys differing only by a singular/plural token
    pub plural_rule: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.95,
            metric: SimilarityMetric::default(),
            plural_rule: true,
        }
    }
}

impl ResolverConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Validate configuration values
    ///
    /// Exclusion patterns are compiled by `InclusionFilter::new`, which runs
    /// this first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.matching.similarity_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }

        if self.normalization.legal_suffixes.is_empty() {
            return Err(ConfigError::EmptySuffixList);
        }
        check_blank("legal_suffixes", &self.normalization.legal_suffixes)?;

        if self.filter.applicant_tokens.is_empty() {
            return Err(ConfigError::EmptyApplicantTokens);
        }
        check_blank("applicant_tokens", &self.filter.applicant_tokens)?;
        check_blank("third_party_tokens", &self.filter.third_party_tokens)?;
        check_blank(
            "relevant_proceeding_patterns",
            &self.filter.relevant_proceeding_patterns,
        )?;
        check_blank(
            "relevant_docket_patterns",
            &self.filter.relevant_docket_patterns,
        )?;
        check_blank(
            "business_indicators",
            &self.classification.business_indicators,
        )?;

        Ok(())
    }
}

fn check_blank(list: &'static str, entries: &[String]) -> Result<(), ConfigError> {
    if entries.iter().any(|entry| fold_tokens(entry).is_empty()) {
        return Err(ConfigError::BlankToken { list });
    }
    Ok(())
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.matching.similarity_threshold, 0.95);
    }

    #[test]
    fn test_json_serialization() {
        let config = ResolverConfig::default();
        let json = config.to_json().unwrap();
        let parsed = ResolverConfig::from_json(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ResolverConfig::from_toml(
            r#"
            [matching]
            similarity_threshold = 0.9
            metric = "jaro_winkler"
            "#,
        )
        .unwrap();
        assert_eq!(config.matching.similarity_threshold, 0.9);
        assert_eq!(config.matching.metric, SimilarityMetric::JaroWinkler);
        assert!(config.matching.plural_rule);
        assert_eq!(
            config.normalization.legal_suffixes,
            NormalizationConfig::default().legal_suffixes
        );
    }

    #[test]
    fn test_toml_roundtrip_of_defaults() {
        let config = ResolverConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(ResolverConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = ResolverConfig::default();
        config.matching.similarity_threshold = 1.5;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange(1.5))
        );

        config.matching.similarity_threshold = -0.1;
        assert!(config.validate().is_err());

        config.matching.similarity_threshold = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_suffix_list() {
        let mut config = ResolverConfig::default();
        config.normalization.legal_suffixes.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptySuffixList));
    }

    #[test]
    fn test_blank_suffix_entry() {
        let mut config = ResolverConfig::default();
        config.normalization.legal_suffixes.push(" ., ".to_string());
        assert_eq!(
            config.validate(),
            Err(ConfigError::BlankToken {
                list: "legal_suffixes"
            })
        );
    }

    #[test]
    fn test_empty_applicant_tokens() {
        let mut config = ResolverConfig::default();
        config.filter.applicant_tokens.clear();
        assert_eq!(config.validate(), Err(ConfigError::EmptyApplicantTokens));
    }

    #[test]
    fn test_relevance_patterns() {
        let mut config = ResolverConfig::default();
        assert_eq!(
            config.filter.relevant_docket_patterns,
            vec!["inbox-52.15".to_string()]
        );

        config.filter.relevant_proceeding_patterns.clear();
        config.filter.relevant_docket_patterns.clear();
        assert!(config.validate().is_ok());

        config.filter.relevant_docket_patterns.push("--".to_string());
        assert_eq!(
            config.validate(),
            Err(ConfigError::BlankToken {
                list: "relevant_docket_patterns"
            })
        );
    }

    #[test]
    fn test_unparseable_toml() {
        let result = ResolverConfig::from_toml("[matching\nsimilarity_threshold = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
