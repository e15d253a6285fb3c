use blake3::Hasher;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::{
    config::LearningConfig,
    node::{Node, NodeId},
    task::TaskId,
    tensor::ParameterBundle,
};

/// How the per-node RNG for a local update is seeded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SeedPolicy {
    /// Seed from the node id alone: a node draws the same delta every round.
    #[default]
    NodeDerived,
    /// Mix the task, the task's round index and a caller salt into the seed.
    RoundSalted { salt: u64 },
}

impl SeedPolicy {
    pub fn rng_for(&self, node_id: &NodeId, task_id: &TaskId, round_index: u64) -> ChaCha20Rng {
        let mut hasher = Hasher::new();
        hasher.update(b"voltmesh/local-update");
        hasher.update(node_id.as_str().as_bytes());
        if let SeedPolicy::RoundSalted { salt } = self {
            hasher.update(task_id.as_str().as_bytes());
            hasher.update(&round_index.to_le_bytes());
            hasher.update(&salt.to_le_bytes());
        }
        ChaCha20Rng::from_seed(*hasher.finalize().as_bytes())
    }
}

/// One node's simulated contribution to a round.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalUpdate {
    pub node_id: NodeId,
    pub delta: ParameterBundle,
    pub improvement: f64,
}

/// Deterministic performance gain for a node given its current state.
pub fn improvement_for(node: &Node, config: &LearningConfig) -> f64 {
    config.base_improvement * node.segment.improvement_multiplier()
        + config.connection_bonus * node.connection_count() as f64
        + config.reputation_bonus * (node.reputation - 1.0)
}

pub fn simulate_local_update(node: &Node, config: &LearningConfig, rng: &mut ChaCha20Rng) -> LocalUpdate {
    let delta = match Normal::new(0.0, config.delta_std) {
        Ok(noise) => node.parameters.map_like(|_, _| noise.sample(rng)),
        Err(_) => node.parameters.map_like(|_, _| 0.0),
    };
    LocalUpdate {
        node_id: node.id.clone(),
        delta,
        improvement: improvement_for(node, config),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use chrono::Utc;

    use super::*;
    use crate::{
        segment::{LearningMode, Segment},
        tensor::Tensor,
    };

    fn node(id: &str, segment: Segment, neighbors: usize, reputation: f64) -> Node {
        let mut parameters = ParameterBundle::new();
        parameters.insert("head", Tensor::zeros(&[4, 2]));
        Node {
            id: NodeId::from(id),
            segment,
            capabilities: BTreeSet::new(),
            modes: BTreeSet::from([LearningMode::Federated]),
            parameters,
            metrics: Node::baseline_metrics(),
            neighbors: (0..neighbors).map(|i| NodeId(format!("peer-{i}"))).collect(),
            contribution_score: 0.0,
            reputation,
            registered_at: Utc::now(),
            last_update: Utc::now(),
        }
    }

    #[test]
    fn improvement_combines_segment_connections_and_reputation() {
        let config = LearningConfig::default();
        let grid = node("grid-1", Segment::EnergyGrid, 3, 1.1);
        let expected = 0.02 * 1.2 + 0.002 * 3.0 + 0.05 * (1.1 - 1.0);
        assert!((improvement_for(&grid, &config) - expected).abs() < 1e-12);

        let retail = node("shop-1", Segment::Retail, 0, 1.0);
        assert!((improvement_for(&retail, &config) - 0.02).abs() < 1e-12);
    }

    #[test]
    fn node_derived_seed_repeats_across_rounds() {
        let config = LearningConfig::default();
        let n = node("grid-1", Segment::EnergyGrid, 0, 1.0);
        let task = TaskId("task-a".into());
        let policy = SeedPolicy::NodeDerived;
        let first = simulate_local_update(&n, &config, &mut policy.rng_for(&n.id, &task, 0));
        let second = simulate_local_update(&n, &config, &mut policy.rng_for(&n.id, &task, 1));
        assert_eq!(first, second);
        assert_eq!(first.delta.shapes(), n.parameters.shapes());
    }

    #[test]
    fn salted_seed_varies_by_round() {
        let config = LearningConfig::default();
        let n = node("grid-1", Segment::EnergyGrid, 0, 1.0);
        let task = TaskId("task-a".into());
        let policy = SeedPolicy::RoundSalted { salt: 9 };
        let first = simulate_local_update(&n, &config, &mut policy.rng_for(&n.id, &task, 0));
        let second = simulate_local_update(&n, &config, &mut policy.rng_for(&n.id, &task, 1));
        assert_ne!(first.delta, second.delta);
        assert_eq!(first.improvement, second.improvement);
    }

    #[test]
    fn different_nodes_draw_different_deltas() {
        let config = LearningConfig::default();
        let task = TaskId("task-a".into());
        let a = node("grid-1", Segment::EnergyGrid, 0, 1.0);
        let b = node("grid-2", Segment::EnergyGrid, 0, 1.0);
        let policy = SeedPolicy::default();
        let da = simulate_local_update(&a, &config, &mut policy.rng_for(&a.id, &task, 0));
        let db = simulate_local_update(&b, &config, &mut policy.rng_for(&b.id, &task, 0));
        assert_ne!(da.delta, db.delta);
    }
}
