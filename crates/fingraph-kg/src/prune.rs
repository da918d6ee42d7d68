//! Isolated-node pruning
//!
//! Deterministic cleanup applied after extraction: every entity and
//! measurement that no fact references is removed. Facts are never touched
//! and missing referents are never created.

use fingraph_core::{KnowledgeGraph, NodeId};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Result of one pruning pass.
#[derive(Clone, Debug, Default)]
pub struct Pruned {
    pub graph: KnowledgeGraph,
    pub removed_entities: Vec<NodeId>,
    pub removed_measurements: Vec<NodeId>,
    /// Fact endpoints declared in neither map. Reported, left as is.
    pub dangling: Vec<NodeId>,
}

impl Pruned {
    pub fn removed_count(&self) -> usize {
        self.removed_entities.len() + self.removed_measurements.len()
    }
}

/// Entity references are every subject plus every `E`-prefixed object;
/// measurement references are `M`-prefixed objects.
pub fn prune_isolated_nodes(mut graph: KnowledgeGraph) -> Pruned {
    let mut used_entities: BTreeSet<NodeId> = BTreeSet::new();
    let mut used_measurements: BTreeSet<NodeId> = BTreeSet::new();

    for fact in &graph.facts {
        used_entities.insert(fact.subject.clone());
        if fact.object.is_entity() {
            used_entities.insert(fact.object.clone());
        } else if fact.object.is_measurement() {
            used_measurements.insert(fact.object.clone());
        }
    }

    let mut dangling: BTreeSet<NodeId> = BTreeSet::new();
    for id in graph.referenced_ids() {
        if !graph.contains(id) {
            dangling.insert(id.clone());
        }
    }

    let mut removed_entities = Vec::new();
    graph.entities.retain(|id, _| {
        let keep = used_entities.contains(id);
        if !keep {
            removed_entities.push(id.clone());
        }
        keep
    });

    let mut removed_measurements = Vec::new();
    graph.measurements.retain(|id, _| {
        let keep = used_measurements.contains(id);
        if !keep {
            removed_measurements.push(id.clone());
        }
        keep
    });

    if !removed_entities.is_empty() || !removed_measurements.is_empty() {
        debug!(
            "Pruned {} entities {:?} and {} measurements {:?}",
            removed_entities.len(),
            removed_entities,
            removed_measurements.len(),
            removed_measurements
        );
    }
    if !dangling.is_empty() {
        warn!("Facts reference undeclared nodes: {:?}", dangling);
    }

    Pruned {
        graph,
        removed_entities,
        removed_measurements,
        dangling: dangling.into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fingraph_core::{Entity, Fact, Measurement};

    #[test]
    fn measurement_as_subject_is_not_a_measurement_reference() {
        let mut g = KnowledgeGraph::default();
        g.entities.insert(NodeId::entity(1), Entity::new("A", "COMPANY"));
        g.measurements
            .insert(NodeId::measurement(1), Measurement::new("REVENUE", 1u64, "USD"));
        g.facts.push(Fact::new("M1", "REPORTED_IN_PERIOD", "E1"));

        let pruned = prune_isolated_nodes(g);
        assert!(pruned.graph.entities.contains_key(&NodeId::entity(1)));
        assert!(pruned.graph.measurements.is_empty());
        assert_eq!(pruned.removed_measurements, vec![NodeId::measurement(1)]);
    }
}
