//! Exact-key grouping of included filing records

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::normalization::{NormalizedKey, Normalizer};
use crate::classify::{EntityClassifier, EntityType};
use crate::record::RawFilingRecord;

/// Identifier of an entity group: its rank in first-seen order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub usize);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// All included records sharing one normalized key
#[derive(Debug, Clone, PartialEq)]
pub struct EntityGroup {
    pub id: GroupId,
    /// First-seen raw name
    pub representative_name: String,
    pub normalized_key: NormalizedKey,
    pub entity_type: EntityType,
    /// Members in arrival order
    pub member_records: Vec<RawFilingRecord>,
}

impl EntityGroup {
    pub fn filing_count(&self) -> usize {
        self.member_records.len()
    }

    /// Distinct raw spellings, in arrival order
    pub fn name_variants(&self) -> Vec<&str> {
        let mut variants: Vec<&str> = Vec::new();
        for record in &self.member_records {
            if !variants.contains(&record.filer_name.as_str()) {
                variants.push(&record.filer_name);
            }
        }
        variants
    }
}

/// Result of grouping one batch of included records
#[derive(Debug, Clone, Default)]
pub struct GroupingOutcome {
    /// Groups entering matching, in first-seen order
    pub groups: Vec<EntityGroup>,
    /// Groups classified as individuals and held out of the dimension
    pub individuals: Vec<EntityGroup>,
    /// Records whose name has no comparable characters
    pub unnamed: Vec<RawFilingRecord>,
}

/// Partitions records by normalized key
///
/// Group order and member order follow input order, so ids are stable across
/// runs over the same input.
pub struct Grouper<'a> {
    normalizer: &'a Normalizer,
    classifier: &'a EntityClassifier,
    exclude_individuals: bool,
}

impl<'a> Grouper<'a> {
    pub fn new(
        normalizer: &'a Normalizer,
        classifier: &'a EntityClassifier,
        exclude_individuals: bool,
    ) -> Self {
        Self {
            normalizer,
            classifier,
            exclude_individuals,
        }
    }

    pub fn group(&self, records: Vec<RawFilingRecord>) -> GroupingOutcome {
        let mut outcome = GroupingOutcome::default();
        let mut index: HashMap<NormalizedKey, usize> = HashMap::new();
        let mut groups: Vec<EntityGroup> = Vec::new();

        for record in records {
            let key = self.normalizer.normalize(&record.filer_name);
            if key.is_empty() {
                outcome.unnamed.push(record);
                continue;
            }

            match index.get(&key) {
                Some(&slot) => groups[slot].member_records.push(record),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(EntityGroup {
                        id: GroupId(groups.len()),
                        representative_name: record.filer_name.clone(),
                        normalized_key: key,
                        entity_type: EntityType::Individual,
                        member_records: vec![record],
                    });
                }
            }
        }

        for mut group in groups {
            group.entity_type = self.classify_group(&group);

            if self.exclude_individuals && group.entity_type == EntityType::Individual {
                tracing::debug!(
                    "Holding out '{}' ({} filings) as an individual",
                    group.representative_name,
                    group.filing_count()
                );
                outcome.individuals.push(group);
            } else {
                outcome.groups.push(group);
            }
        }

        outcome
    }

    /// A group is a company when any spelling of its name looks like one
    fn classify_group(&self, group: &EntityGroup) -> EntityType {
        let any_company = group
            .name_variants()
            .iter()
            .any(|name| self.classifier.classify(name) == EntityType::Company);

        if any_company {
            EntityType::Company
        } else {
            EntityType::Individual
        }
    }
}
