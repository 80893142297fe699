//! Star-schema projection of resolved companies
//!
//! A `ResolvedDataset` is the company dimension plus the filing fact table.
//! Everything here is a pure re-projection of it: CSV rows, the nested
//! one-object-per-company form, the document manifest and row validation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io::Write;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canonical::{CanonicalCompany, FilingRecord};
use crate::classify::EntityType;
use crate::enrichment::Enrichment;
use crate::error::ExportError;
use crate::resolution::NormalizedKey;

/// Companies dimension and filings fact table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolvedDataset {
    pub companies: Vec<CanonicalCompany>,
    pub filings: Vec<FilingRecord>,
}

/// `companies.csv` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyRow {
    pub id: Uuid,
    pub entity_name: String,
    pub normalized_name: String,
    pub entity_type: EntityType,
    pub filing_count: usize,
    pub latest_filing_date: Option<NaiveDate>,
}

impl CompanyRow {
    pub const HEADERS: [&'static str; 6] = [
        "id",
        "entity_name",
        "normalized_name",
        "entity_type",
        "filing_count",
        "latest_filing_date",
    ];
}

/// `filings.csv` row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilingRow {
    pub company_id: Uuid,
    pub filing_id: String,
    pub date_received: Option<NaiveDate>,
    pub docket_number: String,
    pub submission_type: String,
    pub status: Option<String>,
    pub primary_doc_url: String,
}

impl FilingRow {
    pub const HEADERS: [&'static str; 7] = [
        "company_id",
        "filing_id",
        "date_received",
        "docket_number",
        "submission_type",
        "status",
        "primary_doc_url",
    ];
}

/// One company with its filings embedded
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedCompany {
    pub id: Uuid,
    pub entity_name: String,
    pub normalized_name: NormalizedKey,
    pub entity_type: EntityType,
    pub filing_count: usize,
    pub latest_filing_date: Option<NaiveDate>,
    pub name_variants: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment: Option<Enrichment>,
    pub filings: Vec<FilingRecord>,
}

/// Document URLs to fetch, keyed by filing id
///
/// Filings without documents are left out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentManifest {
    pub entries: BTreeMap<String, Vec<String>>,
}

impl DocumentManifest {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn urls(&self, filing_id: &str) -> Option<&[String]> {
        self.entries.get(filing_id).map(Vec::as_slice)
    }

    /// Total number of documents across all filings
    pub fn document_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// A row that breaks a dataset invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// "companies" or "filings"
    pub table: &'static str,
    /// Company id or filing id of the offending row
    pub key: String,
    pub message: String,
}

impl ValidationIssue {
    fn company(key: impl fmt::Display, message: impl Into<String>) -> Self {
        Self {
            table: "companies",
            key: key.to_string(),
            message: message.into(),
        }
    }

    fn filing(key: impl fmt::Display, message: impl Into<String>) -> Self {
        Self {
            table: "filings",
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.table, self.key, self.message)
    }
}

impl ResolvedDataset {
    pub fn company(&self, id: Uuid) -> Option<&CanonicalCompany> {
        self.companies.iter().find(|c| c.id == id)
    }

    /// Fact rows of one company, in table order
    pub fn filings_of(&self, company_id: Uuid) -> impl Iterator<Item = &FilingRecord> {
        self.filings
            .iter()
            .filter(move |f| f.company_id == company_id)
    }

    pub fn company_rows(&self) -> Vec<CompanyRow> {
        self.companies
            .iter()
            .map(|c| CompanyRow {
                id: c.id,
                entity_name: c.entity_name.clone(),
                normalized_name: c.normalized_name.to_string(),
                entity_type: c.entity_type,
                filing_count: c.filing_count,
                latest_filing_date: c.latest_filing_date,
            })
            .collect()
    }

    pub fn filing_rows(&self) -> Vec<FilingRow> {
        self.filings
            .iter()
            .map(|f| FilingRow {
                company_id: f.company_id,
                filing_id: f.filing_id.clone(),
                date_received: f.date_received,
                docket_number: f.docket_number.clone(),
                submission_type: f.submission_type.clone(),
                status: f.filing_status.clone(),
                primary_doc_url: f.primary_document_url().to_string(),
            })
            .collect()
    }

    /// One object per company, filings embedded
    pub fn nested(&self) -> Vec<NestedCompany> {
        self.nested_with(&BTreeMap::new())
    }

    /// Nested form with enrichment attached where available
    pub fn nested_with(&self, enrichments: &BTreeMap<Uuid, Enrichment>) -> Vec<NestedCompany> {
        let mut by_company: HashMap<Uuid, Vec<FilingRecord>> = HashMap::new();
        for filing in &self.filings {
            by_company
                .entry(filing.company_id)
                .or_default()
                .push(filing.clone());
        }

        self.companies
            .iter()
            .map(|c| NestedCompany {
                id: c.id,
                entity_name: c.entity_name.clone(),
                normalized_name: c.normalized_name.clone(),
                entity_type: c.entity_type,
                filing_count: c.filing_count,
                latest_filing_date: c.latest_filing_date,
                name_variants: c.name_variants.clone(),
                enrichment: enrichments.get(&c.id).cloned(),
                filings: by_company.remove(&c.id).unwrap_or_default(),
            })
            .collect()
    }

    pub fn document_manifest(&self) -> DocumentManifest {
        DocumentManifest {
            entries: self
                .filings
                .iter()
                .filter(|f| !f.document_urls.is_empty())
                .map(|f| (f.filing_id.clone(), f.document_urls.clone()))
                .collect(),
        }
    }

    /// Check dimension and fact invariants
    ///
    /// Problems are reported, never repaired: the dataset is written as is.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        let mut companies: HashMap<Uuid, &CanonicalCompany> = HashMap::new();
        let mut claimed: HashMap<&str, Uuid> = HashMap::new();

        for company in &self.companies {
            if company.id.is_nil() {
                issues.push(ValidationIssue::company(company.id, "empty company id"));
            }
            if companies.insert(company.id, company).is_some() {
                issues.push(ValidationIssue::company(company.id, "duplicate company id"));
            }
            if company.entity_name.trim().is_empty() {
                issues.push(ValidationIssue::company(company.id, "empty entity name"));
            }
            if company.filing_count != company.filing_ids.len() {
                issues.push(ValidationIssue::company(
                    company.id,
                    format!(
                        "filing_count {} but {} distinct filing ids",
                        company.filing_count,
                        company.filing_ids.len()
                    ),
                ));
            }
            for filing_id in &company.filing_ids {
                if let Some(other) = claimed.insert(filing_id, company.id) {
                    if other != company.id {
                        issues.push(ValidationIssue::filing(
                            filing_id,
                            format!("claimed by companies {} and {}", other, company.id),
                        ));
                    }
                }
            }
        }

        let mut seen: HashSet<&str> = HashSet::new();
        let mut fact_counts: HashMap<Uuid, usize> = HashMap::new();
        for filing in &self.filings {
            if filing.filing_id.trim().is_empty() {
                issues.push(ValidationIssue::filing(&filing.filing_id, "empty filing id"));
            }
            if !seen.insert(&filing.filing_id) {
                issues.push(ValidationIssue::filing(&filing.filing_id, "duplicate filing id"));
            }
            match companies.get(&filing.company_id) {
                None => issues.push(ValidationIssue::filing(
                    &filing.filing_id,
                    format!("dangling company id {}", filing.company_id),
                )),
                Some(company) if !company.filing_ids.contains(&filing.filing_id) => {
                    issues.push(ValidationIssue::filing(
                        &filing.filing_id,
                        format!("not listed on company {}", company.id),
                    ))
                }
                Some(_) => {}
            }
            *fact_counts.entry(filing.company_id).or_default() += 1;
        }

        for company in &self.companies {
            let rows = fact_counts.get(&company.id).copied().unwrap_or(0);
            if rows != company.filing_count {
                issues.push(ValidationIssue::company(
                    company.id,
                    format!(
                        "filing_count {} but {} fact rows",
                        company.filing_count, rows
                    ),
                ));
            }
        }

        issues
    }

    /// Write the companies dimension as CSV (header always present)
    pub fn write_companies_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        write_csv(writer, &self.company_rows(), &CompanyRow::HEADERS)
    }

    /// Write the filings fact table as CSV (header always present)
    pub fn write_filings_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        write_csv(writer, &self.filing_rows(), &FilingRow::HEADERS)
    }

    /// Write the nested projection as pretty-printed JSON
    pub fn write_nested_json<W: Write>(
        &self,
        mut writer: W,
        enrichments: &BTreeMap<Uuid, Enrichment>,
    ) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(&mut writer, &self.nested_with(enrichments))?;
        writer.flush()?;
        Ok(())
    }
}

fn write_csv<W: Write, R: Serialize>(
    writer: W,
    rows: &[R],
    headers: &[&str],
) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    // Serialized rows carry their own header; an empty table still gets one
    if rows.is_empty() {
        csv_writer.write_record(headers)?;
    }
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::company_id;
    use std::collections::BTreeSet;

    fn key(text: &str) -> NormalizedKey {
        NormalizedKey::from_tokens(&text.split(' ').map(str::to_string).collect::<Vec<_>>())
    }

    fn filing(id: &str, company: Uuid, urls: &[&str]) -> FilingRecord {
        FilingRecord {
            filing_id: id.to_string(),
            company_id: company,
            date_received: NaiveDate::from_ymd_opt(2024, 3, 1),
            docket_number: "24-101".to_string(),
            submission_type: "APPLICATION".to_string(),
            filing_status: Some("ACCEPTED".to_string()),
            document_urls: urls.iter().map(|u| u.to_string()).collect(),
            detail_url: None,
        }
    }

    fn dataset() -> ResolvedDataset {
        let twilio = company_id(&key("twilio"));
        let acme = company_id(&key("acme network"));
        ResolvedDataset {
            companies: vec![
                CanonicalCompany {
                    id: twilio,
                    entity_name: "Twilio Inc.".to_string(),
                    normalized_name: key("twilio"),
                    entity_type: EntityType::Company,
                    name_variants: vec!["Twilio Inc.".to_string()],
                    filing_ids: BTreeSet::from(["t1".to_string(), "t2".to_string()]),
                    filing_count: 2,
                    latest_filing_date: NaiveDate::from_ymd_opt(2024, 3, 1),
                    merge_reasons: Vec::new(),
                },
                CanonicalCompany {
                    id: acme,
                    entity_name: "Acme Networks".to_string(),
                    normalized_name: key("acme network"),
                    entity_type: EntityType::Company,
                    name_variants: vec!["Acme Networks".to_string()],
                    filing_ids: BTreeSet::from(["a1".to_string()]),
                    filing_count: 1,
                    latest_filing_date: NaiveDate::from_ymd_opt(2024, 3, 1),
                    merge_reasons: vec!["token:plural".to_string()],
                },
            ],
            filings: vec![
                filing("t1", twilio, &["https://example.test/t1.pdf"]),
                filing("t2", twilio, &[]),
                filing("a1", acme, &["https://example.test/a1.pdf", "https://example.test/a1b.pdf"]),
            ],
        }
    }

    #[test]
    fn test_companies_csv_layout() {
        let mut buffer = Vec::new();
        dataset().write_companies_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("id,entity_name,normalized_name,entity_type,filing_count,latest_filing_date")
        );
        let first = lines.next().unwrap();
        assert!(first.ends_with(",Twilio Inc.,twilio,Company,2,2024-03-01"));
        assert_eq!(lines.count(), 1);
    }

    #[test]
    fn test_filings_csv_layout() {
        let mut buffer = Vec::new();
        dataset().write_filings_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "company_id,filing_id,date_received,docket_number,submission_type,status,primary_doc_url"
        );
        assert!(lines[1].ends_with(",t1,2024-03-01,24-101,APPLICATION,ACCEPTED,https://example.test/t1.pdf"));
        assert!(lines[2].ends_with(",t2,2024-03-01,24-101,APPLICATION,ACCEPTED,"));
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_empty_tables_keep_headers() {
        let empty = ResolvedDataset::default();
        let mut buffer = Vec::new();
        empty.write_filings_csv(&mut buffer).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap().trim_end(),
            FilingRow::HEADERS.join(",")
        );
    }

    #[test]
    fn test_nested_projection() {
        let data = dataset();
        let nested = data.nested();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].filings.len(), 2);
        assert_eq!(nested[1].filings[0].filing_id, "a1");
        assert!(nested.iter().all(|n| n.enrichment.is_none()));

        let json = serde_json::to_value(&nested).unwrap();
        assert_eq!(json[0]["normalized_name"], "twilio");
        assert!(json[0].get("enrichment").is_none());
    }

    #[test]
    fn test_nested_with_enrichment() {
        let data = dataset();
        let mut enrichments = BTreeMap::new();
        enrichments.insert(
            data.companies[1].id,
            Enrichment {
                industry_segment: Some("VoIP".to_string()),
                ..Default::default()
            },
        );
        let nested = data.nested_with(&enrichments);
        assert!(nested[0].enrichment.is_none());
        assert_eq!(
            nested[1]
                .enrichment
                .as_ref()
                .and_then(|e| e.industry_segment.as_deref()),
            Some("VoIP")
        );
    }

    #[test]
    fn test_document_manifest_skips_empty() {
        let manifest = dataset().document_manifest();
        assert_eq!(manifest.len(), 2);
        assert!(manifest.urls("t2").is_none());
        assert_eq!(manifest.urls("a1").map(|u| u.len()), Some(2));
        assert_eq!(manifest.document_count(), 3);
    }

    #[test]
    fn test_valid_dataset_has_no_issues() {
        assert!(dataset().validate().is_empty());
    }

    #[test]
    fn test_validation_reports_problems() {
        let mut data = dataset();
        data.companies[0].entity_name = "  ".to_string();
        data.companies[1].filing_count = 3;
        data.filings.push(filing("a1", data.companies[1].id, &[]));
        data.filings.push(filing("x9", Uuid::nil(), &[]));

        let issues = data.validate();
        let messages: Vec<String> = issues.iter().map(|i| i.to_string()).collect();

        assert!(messages.iter().any(|m| m.contains("empty entity name")));
        assert!(messages
            .iter()
            .any(|m| m.contains("filing_count 3 but 1 distinct filing ids")));
        assert!(messages
            .iter()
            .any(|m| m == "filings [a1]: duplicate filing id"));
        assert!(messages.iter().any(|m| m.starts_with("filings [x9]: dangling company id")));
    }

    #[test]
    fn test_validation_reports_shared_filing_id() {
        let mut data = dataset();
        data.companies[1].filing_ids.insert("t1".to_string());
        data.companies[1].filing_count = 2;

        let issues = data.validate();
        assert!(issues
            .iter()
            .any(|i| i.key == "t1" && i.message.starts_with("claimed by companies")));
    }
}
