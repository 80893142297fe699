//! Error types for filer-core

use serde::Serialize;
use thiserror::Error;

/// Result type alias for filer operations
pub type Result<T> = std::result::Result<T, FilerError>;

/// Main error type for filer operations
#[derive(Error, Debug)]
pub enum FilerError {
    /// Configuration rejected before any record was processed
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Writing a projection failed
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Input could not be decoded at all
    #[error("Input error: {0}")]
    Input(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Enrichment collaborator failure
    #[error("Enrichment error: {0}")]
    Enrichment(String),
}

/// Configuration validation error
///
/// Raised by `ResolverConfig::validate` and every component constructor that
/// compiles configuration, so a bad configuration fails before the first record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Similarity threshold outside [0.0, 1.0] or not a number
    #[error("similarity threshold must be within [0.0, 1.0], got {0}")]
    ThresholdOutOfRange(f64),

    /// No legal suffixes configured
    #[error("legal suffix list must not be empty")]
    EmptySuffixList,

    /// No applicant tokens configured, so nothing could ever be included
    #[error("applicant token set must not be empty")]
    EmptyApplicantTokens,

    /// A token list contains an entry with no comparable characters
    #[error("{list} contains a blank entry")]
    BlankToken { list: &'static str },

    /// A filer exclusion pattern is not a valid regular expression
    #[error("invalid filer exclusion pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Configuration text could not be parsed
    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Export-specific errors
#[derive(Error, Debug)]
pub enum ExportError {
    /// CSV writer error
    #[error("CSV error: {0}")]
    Csv(String),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

/// What is wrong with a malformed input record
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecordProblem {
    /// A required field is absent or empty
    #[error("missing required field '{field}'")]
    MissingField { field: &'static str },

    /// A field is present but cannot be used
    #[error("invalid field '{field}': {message}")]
    InvalidField { field: &'static str, message: String },

    /// The record does not decode into the expected shape
    #[error("undecodable record: {message}")]
    Undecodable { message: String },
}

/// A record excluded from processing because it is malformed
///
/// Carries the record's position in the input and its upstream identifier
/// when one could be read, so the offending row can be found again.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[error(
    "record #{position} ({}): {problem}",
    .submission_id.as_deref().unwrap_or("no submission id")
)]
pub struct MalformedRecord {
    pub position: usize,
    pub submission_id: Option<String>,
    pub problem: RecordProblem,
}

impl From<csv::Error> for ExportError {
    fn from(err: csv::Error) -> Self {
        ExportError::Csv(err.to_string())
    }
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Json(err.to_string())
    }
}

impl From<serde_json::Error> for FilerError {
    fn from(err: serde_json::Error) -> Self {
        FilerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_record_display() {
        let err = MalformedRecord {
            position: 4,
            submission_id: Some("1021".to_string()),
            problem: RecordProblem::MissingField {
                field: "filer_name",
            },
        };
        assert_eq!(
            err.to_string(),
            "record #4 (1021): missing required field 'filer_name'"
        );

        let anonymous = MalformedRecord {
            submission_id: None,
            ..err
        };
        assert!(anonymous.to_string().contains("no submission id"));
    }

    #[test]
    fn test_config_error_converts() {
        let err: FilerError = ConfigError::EmptySuffixList.into();
        assert!(matches!(err, FilerError::Config(ConfigError::EmptySuffixList)));
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
