use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
};

use blake3::Hasher;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    config::RegistryConfig,
    error::{FederationError, FederationResult},
    node::{Node, NodeId},
    segment::{synergy, LearningMode, Segment},
    tensor::{ParameterBundle, Tensor},
    update::TopologySnapshot,
};

/// Decides whether a newly registered node links to an existing one.
pub trait ConnectionPolicy: Send {
    fn connect(&mut self, newcomer: &Node, existing: &Node, probability: f64) -> bool;
}

/// Bernoulli draws from a ChaCha20 stream. `None` seeds from OS entropy.
pub struct SeededConnections {
    rng: ChaCha20Rng,
}

impl SeededConnections {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        Self { rng }
    }
}

impl ConnectionPolicy for SeededConnections {
    fn connect(&mut self, _newcomer: &Node, _existing: &Node, probability: f64) -> bool {
        self.rng.gen::<f64>() < probability.clamp(0.0, 1.0)
    }
}

/// Deterministic: connect whenever the probability reaches `threshold`.
#[derive(Clone, Copy, Debug)]
pub struct ThresholdConnections {
    pub threshold: f64,
}

impl ConnectionPolicy for ThresholdConnections {
    fn connect(&mut self, _newcomer: &Node, _existing: &Node, probability: f64) -> bool {
        probability >= self.threshold
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationResult {
    pub node_id: NodeId,
    pub segment: Segment,
    pub network_size: usize,
    pub initial_connections: usize,
}

pub(crate) type NodeHandle = Arc<Mutex<Node>>;

/// Participating nodes keyed by id.
///
/// Each node sits behind its own mutex so rounds on disjoint node sets run
/// in parallel. Lock order is map, then nodes in ascending id order.
pub struct NodeRegistry {
    config: RegistryConfig,
    policy: Mutex<Box<dyn ConnectionPolicy>>,
    nodes: RwLock<BTreeMap<NodeId, NodeHandle>>,
}

impl NodeRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        let policy = Box::new(SeededConnections::new(config.seed));
        Self::with_policy(config, policy)
    }

    pub fn with_policy(config: RegistryConfig, policy: Box<dyn ConnectionPolicy>) -> Self {
        Self {
            config,
            policy: Mutex::new(policy),
            nodes: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn set_policy(&self, policy: Box<dyn ConnectionPolicy>) {
        *self.policy.lock() = policy;
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn register(
        &self,
        id: NodeId,
        segment: Segment,
        capabilities: BTreeSet<String>,
        modes: BTreeSet<LearningMode>,
    ) -> FederationResult<RegistrationResult> {
        let mut nodes = self.nodes.write();
        if nodes.contains_key(&id) {
            return Err(FederationError::DuplicateNode(id));
        }

        let now = Utc::now();
        let mut node = Node {
            parameters: self.initial_parameters(&id),
            id: id.clone(),
            segment,
            capabilities,
            modes,
            metrics: Node::baseline_metrics(),
            neighbors: BTreeSet::new(),
            contribution_score: 0.0,
            reputation: 1.0,
            registered_at: now,
            last_update: now,
        };

        let mut policy = self.policy.lock();
        for (existing_id, handle) in nodes.iter() {
            let mut existing = handle.lock();
            let probability = self.config.connection_base
                + self.config.connection_synergy_weight * synergy(segment, existing.segment);
            if policy.connect(&node, &existing, probability) {
                existing.neighbors.insert(id.clone());
                node.neighbors.insert(existing_id.clone());
                debug!(node = %id, peer = %existing_id, probability, "connected");
            }
        }
        drop(policy);

        let initial_connections = node.neighbors.len();
        nodes.insert(id.clone(), Arc::new(Mutex::new(node)));
        let network_size = nodes.len();
        info!(
            node = %id,
            segment = %segment,
            network_size,
            initial_connections,
            "registered node"
        );
        Ok(RegistrationResult {
            node_id: id,
            segment,
            network_size,
            initial_connections,
        })
    }

    /// Parameters drawn from `Normal(0, initial_weight_std)` seeded by the
    /// node id, so a node's starting weights do not depend on arrival order.
    fn initial_parameters(&self, id: &NodeId) -> ParameterBundle {
        let mut hasher = Hasher::new();
        hasher.update(b"voltmesh/init-params");
        hasher.update(id.as_str().as_bytes());
        let mut rng = ChaCha20Rng::from_seed(*hasher.finalize().as_bytes());
        let noise = Normal::new(0.0, self.config.initial_weight_std).ok();

        let mut bundle = ParameterBundle::new();
        for (name, shape) in &self.config.tensor_shapes {
            let tensor = match &noise {
                Some(noise) => Tensor::from_fn(shape, |_| noise.sample(&mut rng)),
                None => Tensor::zeros(shape),
            };
            bundle.insert(name.clone(), tensor);
        }
        bundle
    }

    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.read().is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.read().contains_key(id)
    }

    pub fn node(&self, id: &NodeId) -> Option<Node> {
        let handle = self.nodes.read().get(id).cloned()?;
        let node = handle.lock().clone();
        Some(node)
    }

    /// Point-in-time copies of every node, ordered by id.
    pub fn snapshot(&self) -> Vec<Node> {
        self.handles_where(|_| true)
            .into_iter()
            .map(|(_, handle)| handle.lock().clone())
            .collect()
    }

    /// Handles of nodes matching `filter`, ordered by id. The map lock is
    /// released before returning.
    pub(crate) fn handles_where(&self, filter: impl Fn(&Node) -> bool) -> Vec<(NodeId, NodeHandle)> {
        let nodes = self.nodes.read();
        nodes
            .iter()
            .filter(|(_, handle)| filter(&*handle.lock()))
            .map(|(id, handle)| (id.clone(), Arc::clone(handle)))
            .collect()
    }

    pub fn topology(&self) -> TopologySnapshot {
        topology_of(&self.snapshot())
    }
}

pub(crate) fn topology_of(nodes: &[Node]) -> TopologySnapshot {
    let node_count = nodes.len();
    let degree_sum: usize = nodes.iter().map(Node::connection_count).sum();
    let connection_count = degree_sum / 2;
    let possible = node_count * node_count.saturating_sub(1) / 2;
    let connection_density = if possible == 0 {
        0.0
    } else {
        connection_count as f64 / possible as f64
    };
    let active_segments = nodes
        .iter()
        .map(|node| node.segment)
        .collect::<BTreeSet<_>>()
        .len();
    TopologySnapshot {
        node_count,
        connection_count,
        connection_density,
        active_segments,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn modes() -> BTreeSet<LearningMode> {
        BTreeSet::from([LearningMode::Federated])
    }

    fn register(registry: &NodeRegistry, id: &str, segment: Segment) -> RegistrationResult {
        registry
            .register(NodeId::from(id), segment, BTreeSet::new(), modes())
            .unwrap()
    }

    #[test]
    fn rejects_duplicate_ids() {
        let registry = NodeRegistry::new(RegistryConfig::default());
        register(&registry, "grid-1", Segment::EnergyGrid);
        let err = registry
            .register(NodeId::from("grid-1"), Segment::Retail, BTreeSet::new(), modes())
            .unwrap_err();
        assert!(matches!(err, FederationError::DuplicateNode(id) if id.as_str() == "grid-1"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.node(&NodeId::from("grid-1")).unwrap().segment, Segment::EnergyGrid);
    }

    #[test]
    fn initialises_parameters_and_metrics() {
        let registry = NodeRegistry::new(RegistryConfig::default());
        register(&registry, "grid-1", Segment::EnergyGrid);
        let node = registry.node(&NodeId::from("grid-1")).unwrap();
        assert_eq!(node.parameters.shapes(), registry.config().tensor_shapes);
        assert_eq!(node.metrics, Node::baseline_metrics());
        assert_eq!(node.reputation, 1.0);
        assert!(node.neighbors.is_empty());
    }

    #[test]
    fn threshold_policy_connects_high_synergy_pairs_only() {
        // probability = 0.3 + 0.4 × synergy; 0.9 synergy → 0.66, default → 0.46
        let registry = NodeRegistry::with_policy(
            RegistryConfig::default(),
            Box::new(ThresholdConnections { threshold: 0.6 }),
        );
        register(&registry, "grid-1", Segment::EnergyGrid);
        register(&registry, "shop-1", Segment::Retail);
        let result = register(&registry, "bus-1", Segment::Transportation);
        assert_eq!(result.network_size, 3);
        assert_eq!(result.initial_connections, 1);

        let grid = registry.node(&NodeId::from("grid-1")).unwrap();
        let bus = registry.node(&NodeId::from("bus-1")).unwrap();
        assert!(grid.neighbors.contains(&bus.id));
        assert!(bus.neighbors.contains(&grid.id));

        let topology = registry.topology();
        assert_eq!(topology.node_count, 3);
        assert_eq!(topology.connection_count, 1);
        assert!((topology.connection_density - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(topology.active_segments, 3);
    }

    #[test]
    fn seeded_registries_build_identical_graphs() {
        let build = || {
            let registry = NodeRegistry::new(RegistryConfig {
                seed: Some(7),
                ..RegistryConfig::default()
            });
            for i in 0..12 {
                let segment = Segment::ALL[i % Segment::ALL.len()];
                register(&registry, &format!("node-{i:02}"), segment);
            }
            registry
                .snapshot()
                .into_iter()
                .map(|node| (node.id, node.neighbors, node.parameters))
                .collect::<Vec<_>>()
        };
        let first = build();
        assert_eq!(first.len(), 12);
        assert_eq!(first, build());
    }
}
