//! Enrichment collaborator interface
//!
//! Resolved companies can be enriched with market information by an external
//! provider (a search API, an LLM, a curated table). Resolution never reads
//! these fields; they ride along in the nested projection only.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::export::ResolvedDataset;

/// Number of dockets handed to a provider per company
const MAX_DOCKETS: usize = 3;

/// What a provider is told about one company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    pub company_id: Uuid,
    pub entity_name: String,
    /// A few dockets the company filed in, for context
    pub docket_numbers: BTreeSet<String>,
}

impl EnrichmentRequest {
    /// One request per company, in dimension order
    pub fn for_dataset(dataset: &ResolvedDataset) -> Vec<Self> {
        dataset
            .companies
            .iter()
            .map(|company| {
                let mut docket_numbers = BTreeSet::new();
                for filing in dataset.filings_of(company.id) {
                    for docket in filing
                        .docket_number
                        .split(';')
                        .map(str::trim)
                        .filter(|d| !d.is_empty())
                    {
                        if docket_numbers.len() < MAX_DOCKETS {
                            docket_numbers.insert(docket.to_string());
                        }
                    }
                }

                EnrichmentRequest {
                    company_id: company.id,
                    entity_name: company.entity_name.clone(),
                    docket_numbers,
                }
            })
            .collect()
    }
}

/// Market information about one company
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub industry_segment: Option<String>,
    pub market_position: Option<String>,
    pub is_active: Option<bool>,
    pub product_summary: Option<String>,
}

/// Source of company enrichment
///
/// `Ok(None)` means the provider knows nothing about the company; an error is
/// a provider failure for that company only.
pub trait EnrichmentProvider {
    fn enrich(&self, request: &EnrichmentRequest) -> Result<Option<Enrichment>>;
}

/// Results of enriching a whole dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentOutcome {
    pub enrichments: BTreeMap<Uuid, Enrichment>,
    /// Companies the provider had nothing for
    pub missing: Vec<Uuid>,
    /// Per-company provider failures
    pub failures: Vec<(Uuid, String)>,
}

/// Ask the provider about every company; a failure never stops the run
pub fn enrich_all<P: EnrichmentProvider + ?Sized>(
    dataset: &ResolvedDataset,
    provider: &P,
) -> EnrichmentOutcome {
    let mut outcome = EnrichmentOutcome::default();

    for request in EnrichmentRequest::for_dataset(dataset) {
        match provider.enrich(&request) {
            Ok(Some(enrichment)) => {
                outcome.enrichments.insert(request.company_id, enrichment);
            }
            Ok(None) => outcome.missing.push(request.company_id),
            Err(e) => {
                tracing::warn!("Enrichment failed for '{}': {}", request.entity_name, e);
                outcome.failures.push((request.company_id, e.to_string()));
            }
        }
    }

    tracing::info!(
        "Enriched {} companies ({} missing, {} failed)",
        outcome.enrichments.len(),
        outcome.missing.len(),
        outcome.failures.len()
    );
    outcome
}
