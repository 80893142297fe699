//! Transitive closure of merge proposals into clusters

use std::collections::HashMap;

use petgraph::unionfind::UnionFind;

use super::grouping::{EntityGroup, GroupId};
use super::similarity::MergeProposal;

/// A set of groups resolved to one company
#[derive(Debug, Clone, Default)]
pub struct Cluster {
    /// Member groups, ordered by id
    pub groups: Vec<EntityGroup>,
    /// Proposals that joined previously separate components
    pub decisions: Vec<MergeProposal>,
}

impl Cluster {
    pub fn filing_count(&self) -> usize {
        self.groups.iter().map(EntityGroup::filing_count).sum()
    }

    pub fn group_ids(&self) -> Vec<GroupId> {
        self.groups.iter().map(|g| g.id).collect()
    }

    pub fn group(&self, id: GroupId) -> Option<&EntityGroup> {
        self.groups.iter().find(|g| g.id == id)
    }
}

/// Merges groups connected by proposals, transitively
///
/// The resulting partition depends only on the set of proposals, not their
/// order. Clusters come out ordered by their smallest group id.
#[derive(Debug, Clone, Default)]
pub struct ClusterMerger;

impl ClusterMerger {
    pub fn new() -> Self {
        Self
    }

    pub fn merge(&self, groups: Vec<EntityGroup>, proposals: &[MergeProposal]) -> Vec<Cluster> {
        let slots: HashMap<GroupId, usize> = groups
            .iter()
            .enumerate()
            .map(|(slot, group)| (group.id, slot))
            .collect();

        let mut components = UnionFind::<usize>::new(groups.len());
        let mut decisions: Vec<(usize, MergeProposal)> = Vec::new();

        for proposal in proposals {
            let (Some(&left), Some(&right)) = (slots.get(&proposal.left), slots.get(&proposal.right))
            else {
                tracing::warn!(
                    "Ignoring proposal between unknown groups {} and {}",
                    proposal.left,
                    proposal.right
                );
                continue;
            };

            if components.union(left, right) {
                tracing::info!(
                    "Merging '{}' with '{}' ({}, confidence {:.3})",
                    groups[right].representative_name,
                    groups[left].representative_name,
                    proposal.reason,
                    proposal.confidence
                );
                decisions.push((left, proposal.clone()));
            } else {
                tracing::debug!(
                    "Groups {} and {} already clustered ({})",
                    proposal.left,
                    proposal.right,
                    proposal.reason
                );
            }
        }

        let labels = components.into_labeling();

        let mut order: Vec<usize> = (0..groups.len()).collect();
        order.sort_by_key(|&slot| groups[slot].id);

        let mut pending: Vec<Option<EntityGroup>> = groups.into_iter().map(Some).collect();
        let mut cluster_of: HashMap<usize, usize> = HashMap::new();
        let mut clusters: Vec<Cluster> = Vec::new();

        for slot in order {
            let index = *cluster_of.entry(labels[slot]).or_insert_with(|| {
                clusters.push(Cluster::default());
                clusters.len() - 1
            });
            if let Some(group) = pending[slot].take() {
                clusters[index].groups.push(group);
            }
        }

        for (slot, proposal) in decisions {
            if let Some(&index) = cluster_of.get(&labels[slot]) {
                clusters[index].decisions.push(proposal);
            }
        }

        tracing::debug!("Merged into {} clusters", clusters.len());
        clusters
    }
}
