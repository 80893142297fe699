//! Canonical company records and the filing fact table
//!
//! Each cluster becomes one `CanonicalCompany`; each member record becomes one
//! `FilingRecord` pointing at it. Identifiers are derived from content only,
//! so the same input always produces the same ids.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::EntityType;
use crate::export::ResolvedDataset;
use crate::record::RawFilingRecord;
use crate::resolution::{Cluster, EntityGroup, NormalizedKey};

/// One resolved company (dimension row)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalCompany {
    /// UUID v5 of the canonical key under the DNS namespace
    pub id: Uuid,
    pub entity_name: String,
    /// Smallest normalized key among the merged groups
    pub normalized_name: NormalizedKey,
    pub entity_type: EntityType,
    /// Every raw spelling seen, in arrival order
    pub name_variants: Vec<String>,
    pub filing_ids: BTreeSet<String>,
    pub filing_count: usize,
    pub latest_filing_date: Option<NaiveDate>,
    /// Distinct merge reasons that joined the cluster ("fuzzy:0.960", "token:plural")
    pub merge_reasons: Vec<String>,
}

/// One submission by a resolved company (fact row)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingRecord {
    pub filing_id: String,
    pub company_id: Uuid,
    pub date_received: Option<NaiveDate>,
    pub docket_number: String,
    pub submission_type: String,
    pub filing_status: Option<String>,
    pub document_urls: Vec<String>,
    pub detail_url: Option<String>,
}

impl FilingRecord {
    fn from_raw(record: RawFilingRecord, company_id: Uuid) -> Self {
        Self {
            filing_id: record.filing_id(),
            company_id,
            date_received: record.date_received,
            docket_number: record.docket_number,
            submission_type: record.submission_type,
            filing_status: record.filing_status,
            document_urls: record.document_urls,
            detail_url: record.detail_url,
        }
    }

    /// First document URL, empty when the filing has none
    pub fn primary_document_url(&self) -> &str {
        self.document_urls.first().map(String::as_str).unwrap_or("")
    }
}

/// Stable company id for a canonical key
pub fn company_id(key: &NormalizedKey) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, key.as_str().as_bytes())
}

/// Builds the company dimension and the filing fact table from clusters
#[derive(Debug, Clone, Default)]
pub struct CanonicalRecordBuilder;

impl CanonicalRecordBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, clusters: Vec<Cluster>) -> ResolvedDataset {
        let mut dataset = ResolvedDataset::default();

        for cluster in clusters {
            let Some((company, filings)) = self.build_one(cluster) else {
                continue;
            };
            dataset.companies.push(company);
            dataset.filings.extend(filings);
        }

        tracing::debug!(
            "Built {} companies with {} filings",
            dataset.companies.len(),
            dataset.filings.len()
        );
        dataset
    }

    fn build_one(&self, cluster: Cluster) -> Option<(CanonicalCompany, Vec<FilingRecord>)> {
        let canonical_key = cluster
            .groups
            .iter()
            .map(|g| &g.normalized_key)
            .min()?
            .clone();
        let entity_name = naming_group(&cluster.groups)?.representative_name.clone();
        let id = company_id(&canonical_key);

        let entity_type = if cluster
            .groups
            .iter()
            .any(|g| g.entity_type == EntityType::Company)
        {
            EntityType::Company
        } else {
            EntityType::Individual
        };

        let mut arrivals: Vec<(usize, &str)> = cluster
            .groups
            .iter()
            .flat_map(|g| g.member_records.iter())
            .map(|r| (r.position, r.filer_name.as_str()))
            .collect();
        arrivals.sort_by_key(|&(position, _)| position);
        let mut name_variants: Vec<String> = Vec::new();
        for (_, name) in arrivals {
            if !name_variants.iter().any(|v| v == name) {
                name_variants.push(name.to_string());
            }
        }

        let mut merge_reasons: Vec<String> = Vec::new();
        for decision in &cluster.decisions {
            let tag = decision.reason.to_string();
            if !merge_reasons.contains(&tag) {
                merge_reasons.push(tag);
            }
        }

        let mut records: Vec<RawFilingRecord> = cluster
            .groups
            .into_iter()
            .flat_map(|g| g.member_records)
            .collect();
        // Newest first, undated last, arrival order within a day
        records.sort_by(|a, b| {
            b.date_received
                .cmp(&a.date_received)
                .then(a.position.cmp(&b.position))
        });

        let filings: Vec<FilingRecord> = records
            .into_iter()
            .map(|r| FilingRecord::from_raw(r, id))
            .collect();

        let company = CanonicalCompany {
            id,
            entity_name,
            normalized_name: canonical_key,
            entity_type,
            name_variants,
            filing_ids: filings.iter().map(|f| f.filing_id.clone()).collect(),
            filing_count: filings.len(),
            latest_filing_date: filings.iter().filter_map(|f| f.date_received).max(),
            merge_reasons,
        };

        Some((company, filings))
    }
}

/// The group whose first-seen name becomes the company name: most filings,
/// ties broken by the lexicographically smallest key.
fn naming_group(groups: &[EntityGroup]) -> Option<&EntityGroup> {
    groups.iter().min_by(|a, b| {
        b.filing_count()
            .cmp(&a.filing_count())
            .then_with(|| a.normalized_key.cmp(&b.normalized_key))
    })
}
