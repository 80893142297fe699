//! Validation-stats history
//!
//! Every `resolve` run appends one summary to a JSON array on disk, so data
//! quality can be compared across fetches.

use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use filer_core::{FunnelCounts, ResolutionReport};
use serde::Serialize;
use serde_json::Value;

/// Number of validation issues copied into each history entry
const SAMPLE_ISSUES: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    pub timestamp: DateTime<Utc>,
    pub input: String,
    pub counts: FunnelCounts,
    pub merges: usize,
    pub validation_issue_count: usize,
    pub sample_issues: Vec<String>,
}

impl RunStats {
    pub fn from_report(input: &Path, report: &ResolutionReport) -> Self {
        Self {
            timestamp: Utc::now(),
            input: input.display().to_string(),
            counts: report.counts.clone(),
            merges: report.decisions.len(),
            validation_issue_count: report.validation_issues.len(),
            sample_issues: report
                .validation_issues
                .iter()
                .take(SAMPLE_ISSUES)
                .map(|issue| issue.to_string())
                .collect(),
        }
    }
}

/// Append a run to the history file, creating it when absent
///
/// An unreadable history is replaced rather than failing the run.
pub fn append_history(path: &Path, stats: &RunStats) -> io::Result<usize> {
    let mut history: Vec<Value> = match fs::read_to_string(path) {
        Ok(text) => match serde_json::from_str(&text) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("Replacing unreadable stats history {:?}: {}", path, e);
                Vec::new()
            }
        },
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };

    history.push(serde_json::to_value(stats)?);
    fs::write(path, serde_json::to_string_pretty(&history)?)?;
    Ok(history.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn stats() -> RunStats {
        RunStats::from_report(&PathBuf::from("dump.json"), &ResolutionReport::default())
    }

    #[test]
    fn test_append_creates_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validation_stats.json");

        assert_eq!(append_history(&path, &stats()).unwrap(), 1);
        assert_eq!(append_history(&path, &stats()).unwrap(), 2);

        let history: Vec<Value> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["input"], "dump.json");
        assert_eq!(history[0]["counts"]["raw"], 0);
    }

    #[test]
    fn test_unreadable_history_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validation_stats.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(append_history(&path, &stats()).unwrap(), 1);
    }
}
