//! Test fixture loading utilities

use std::path::PathBuf;

use filer_core::{parse_records_json, ParsedInput};

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_fixtures")
        .join(name)
}

/// Load a fixture file as a string
pub fn load_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|_| panic!("Failed to load fixture: {}", name))
}

/// Load and decode a filing dump fixture
#[allow(dead_code)]
pub fn load_filings_fixture(name: &str) -> ParsedInput {
    parse_records_json(&load_fixture(name))
        .unwrap_or_else(|e| panic!("Fixture {} is not a filing array: {}", name, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_path() {
        let path = fixture_path("raw_filings.json");
        assert!(path.to_string_lossy().contains("test_fixtures"));
    }
}
