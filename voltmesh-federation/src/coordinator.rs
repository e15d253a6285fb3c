use std::{collections::BTreeSet, sync::Arc};

use blake3::Hasher;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use parking_lot::{MutexGuard, RwLock};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use voltmesh_telemetry::{TelemetryConfig, TelemetryHandle};

use crate::{
    aggregation::{aggregator_for, Contribution},
    analytics::EcosystemAnalytics,
    config::FederationConfig,
    error::{FederationError, FederationResult},
    network_effect::{EmergencePotential, NetworkEffectEngine, NetworkValue},
    node::{Node, NodeId, ACCURACY},
    registry::{ConnectionPolicy, NodeRegistry, RegistrationResult},
    segment::{LearningMode, Segment},
    simulation::{simulate_local_update, LocalUpdate, SeedPolicy},
    task::{ConvergenceStatus, LearningTask, TaskId, TaskSpec},
    update::{NetworkUpdate, UpdateId, ValidationResults},
};

const NODES_REGISTERED: &str = "registry.nodes_registered";
const TASKS_CREATED: &str = "tasks.created";
const ROUNDS_EXECUTED: &str = "rounds.executed";
const ROUNDS_INSUFFICIENT: &str = "rounds.insufficient_nodes";
const SAMPLE_NETWORK_EFFECT: &str = "round.network_effect";
const SAMPLE_GLOBAL_ACCURACY: &str = "round.global_accuracy";

struct TaskState {
    task: Arc<LearningTask>,
    /// Rounds started for this task; feeds round-salted seeding.
    rounds_started: u64,
}

/// Owns the registry, the task table and the append-only round history.
///
/// All operations take `&self`; rounds on disjoint node sets proceed in
/// parallel while rounds sharing a node serialise on that node's lock.
pub struct FederatedCoordinator {
    config: FederationConfig,
    registry: NodeRegistry,
    effects: NetworkEffectEngine,
    tasks: DashMap<TaskId, TaskState>,
    history: RwLock<Vec<NetworkUpdate>>,
    telemetry: TelemetryHandle,
}

impl FederatedCoordinator {
    pub fn new(config: FederationConfig) -> FederationResult<Self> {
        config.validate()?;
        Ok(Self {
            registry: NodeRegistry::new(config.registry.clone()),
            effects: NetworkEffectEngine::new(config.network.clone()),
            tasks: DashMap::new(),
            history: RwLock::new(Vec::new()),
            telemetry: TelemetryHandle::from_config(TelemetryConfig::sample("voltmesh-federation")),
            config,
        })
    }

    pub fn with_telemetry(mut self, telemetry: TelemetryHandle) -> Self {
        self.telemetry = telemetry;
        self
    }

    pub fn with_connection_policy(self, policy: Box<dyn ConnectionPolicy>) -> Self {
        self.registry.set_policy(policy);
        self
    }

    pub fn with_seed_policy(mut self, policy: SeedPolicy) -> Self {
        self.config.learning.seed_policy = policy;
        self
    }

    pub fn config(&self) -> &FederationConfig {
        &self.config
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    pub fn register_node(
        &self,
        id: impl Into<NodeId>,
        segment: Segment,
        capabilities: impl IntoIterator<Item = String>,
        modes: impl IntoIterator<Item = LearningMode>,
    ) -> FederationResult<RegistrationResult> {
        let result = self.registry.register(
            id.into(),
            segment,
            capabilities.into_iter().collect(),
            modes.into_iter().collect(),
        )?;
        self.telemetry.record_counter(NODES_REGISTERED, 1)?;
        Ok(result)
    }

    pub fn create_task(
        &self,
        mode: LearningMode,
        objective: impl Into<String>,
        segments: impl IntoIterator<Item = Segment>,
    ) -> FederationResult<LearningTask> {
        self.create_task_with(TaskSpec::new(mode, objective, segments))
    }

    pub fn create_task_with(&self, spec: TaskSpec) -> FederationResult<LearningTask> {
        if spec.segments.is_empty() {
            return Err(FederationError::EmptySegments);
        }
        let ordinal = self.tasks.len() as u64 + 1;
        let id = self.next_task_id(ordinal, &spec.objective);
        let task = LearningTask {
            id: id.clone(),
            mode: spec.mode,
            objective: spec.objective,
            segments: spec.segments,
            architecture: spec.architecture.unwrap_or_else(|| self.default_architecture()),
            convergence: spec.convergence,
            privacy_requirement: spec.privacy_requirement,
            strategy: spec.strategy.unwrap_or(self.config.learning.default_strategy),
            created_at: Utc::now(),
        };
        self.tasks.insert(
            id.clone(),
            TaskState {
                task: Arc::new(task.clone()),
                rounds_started: 0,
            },
        );
        self.telemetry.record_counter(TASKS_CREATED, 1)?;
        info!(
            task = %id,
            mode = %task.mode,
            segments = task.segments.len(),
            strategy = %task.strategy,
            eligible = self.eligible_count(&task),
            "created learning task"
        );
        Ok(task)
    }

    fn next_task_id(&self, ordinal: u64, objective: &str) -> TaskId {
        let mut hasher = Hasher::new();
        hasher.update(b"voltmesh/task");
        hasher.update(&ordinal.to_le_bytes());
        hasher.update(objective.as_bytes());
        hasher.update(&Utc::now().timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
        let digest = hasher.finalize();
        let mut id = TaskId(format!("task-{ordinal:04}-{}", hex::encode(&digest.as_bytes()[..4])));
        while self.tasks.contains_key(&id) {
            id = TaskId(format!("{id}x"));
        }
        id
    }

    fn default_architecture(&self) -> Value {
        let tensors: serde_json::Map<String, Value> = self
            .config
            .registry
            .tensor_shapes
            .iter()
            .map(|(name, shape)| (name.clone(), json!(shape)))
            .collect();
        let parameter_count: usize = self
            .config
            .registry
            .tensor_shapes
            .values()
            .map(|shape| shape.iter().product::<usize>())
            .sum();
        json!({ "tensors": tensors, "parameter_count": parameter_count })
    }

    /// Nodes that would take part in a round of `task` right now.
    pub fn eligible_count(&self, task: &LearningTask) -> usize {
        self.registry
            .handles_where(|node| task.admits(node.segment, &node.modes))
            .len()
    }

    /// Run one round of `task_id`.
    ///
    /// Participants are locked in ascending id order for the whole
    /// read-compute-write section. Every failure path returns before the
    /// first node is written.
    pub fn execute_round(&self, task_id: &TaskId) -> FederationResult<NetworkUpdate> {
        let task = self
            .tasks
            .get(task_id)
            .map(|state| Arc::clone(&state.task))
            .ok_or_else(|| FederationError::UnknownTask(task_id.clone()))?;

        let mut handles = self
            .registry
            .handles_where(|node| task.admits(node.segment, &node.modes));
        if let Some(cap) = self.config.learning.max_nodes_per_round {
            handles.truncate(cap);
        }
        if handles.len() < 2 {
            self.telemetry.record_counter(ROUNDS_INSUFFICIENT, 1)?;
            warn!(task = %task.id, eligible = handles.len(), "not enough eligible nodes for a round");
            return Err(FederationError::InsufficientNodes {
                task_id: task.id.clone(),
                eligible: handles.len(),
            });
        }
        // Only attempts that reach aggregation consume a round index.
        let round_index = {
            let mut state = self
                .tasks
                .get_mut(task_id)
                .ok_or_else(|| FederationError::UnknownTask(task_id.clone()))?;
            let index = state.rounds_started;
            state.rounds_started += 1;
            index
        };

        let mut guards: Vec<MutexGuard<'_, Node>> =
            handles.iter().map(|(_, handle)| handle.lock()).collect();
        let learning = &self.config.learning;

        let locals: Vec<LocalUpdate> = guards
            .iter()
            .map(|node| {
                let mut rng = learning.seed_policy.rng_for(&node.id, &task.id, round_index);
                simulate_local_update(node, learning, &mut rng)
            })
            .collect();
        let contributions: Vec<Contribution<'_>> = locals
            .iter()
            .zip(guards.iter())
            .map(|(local, node)| Contribution {
                node_id: &local.node_id,
                delta: &local.delta,
                reputation: node.reputation,
                contribution_score: node.contribution_score,
            })
            .collect();
        let kind = task.strategy.resolve(&learning.adaptive, &contributions);
        let aggregated = aggregator_for(kind, learning.variance_damping).aggregate(&contributions)?;
        for node in &guards {
            node.parameters.ensure_same_shape(&aggregated)?;
        }

        let participant_value = self.effects.network_value(guards.iter().map(|node| &**node));
        let mean_improvement =
            locals.iter().map(|local| local.improvement).sum::<f64>() / locals.len() as f64;
        let network_effect = mean_improvement * (1.0 + participant_value.total.ln_1p());
        if !network_effect.is_finite() {
            return Err(FederationError::NonFiniteNetworkEffect {
                task_id: task.id.clone(),
                participant_value: participant_value.total,
            });
        }

        let now = Utc::now();
        let step = learning.learning_rate * (1.0 + network_effect);
        let reputation_up = network_effect > learning.reputation_threshold;
        for (node, local) in guards.iter_mut().zip(&locals) {
            node.parameters.add_scaled(&aggregated, step);
            let accuracy = (node.accuracy() + network_effect * learning.accuracy_gain).min(1.0);
            node.metrics.insert(ACCURACY.to_owned(), accuracy);
            if reputation_up {
                node.reputation += learning.reputation_step;
            }
            node.contribution_score += local.improvement.max(0.0);
            node.last_update = now;
        }
        let global_accuracy =
            guards.iter().map(|node| node.accuracy()).sum::<f64>() / guards.len() as f64;
        let source_nodes: Vec<NodeId> = guards.iter().map(|node| node.id.clone()).collect();
        drop(guards);

        let topology = self.registry.topology();
        let improvements = locals
            .iter()
            .map(|local| (local.node_id.clone(), local.improvement))
            .collect();

        let update = {
            let mut history = self.history.write();
            let (sequence, created_at) = match history.last() {
                Some(last) if last.created_at >= now => {
                    (last.sequence + 1, last.created_at + Duration::microseconds(1))
                }
                Some(last) => (last.sequence + 1, now),
                None => (1, now),
            };
            let update = NetworkUpdate {
                id: UpdateId::for_sequence(sequence),
                sequence,
                task_id: task.id.clone(),
                source_nodes,
                aggregated,
                improvements,
                network_effect_score: network_effect,
                validation: ValidationResults {
                    global_accuracy,
                    mean_improvement,
                    participant_network_value: participant_value.total,
                },
                strategy: kind,
                topology,
                created_at,
            };
            history.push(update.clone());
            update
        };

        // The round is committed; telemetry failures must not turn it into an error.
        if let Err(err) = self.record_round(network_effect, global_accuracy) {
            warn!(task = %task.id, update = %update.id, error = %err, "round telemetry dropped");
        }
        info!(
            task = %task.id,
            update = %update.id,
            participants = update.source_nodes.len(),
            strategy = %kind,
            network_effect,
            global_accuracy,
            "round complete"
        );
        debug!(reputation_up, step, "round applied");
        Ok(update)
    }

    fn record_round(&self, network_effect: f64, global_accuracy: f64) -> FederationResult<()> {
        self.telemetry.record_counter(ROUNDS_EXECUTED, 1)?;
        self.telemetry.record_sample(SAMPLE_NETWORK_EFFECT, network_effect)?;
        self.telemetry.record_sample(SAMPLE_GLOBAL_ACCURACY, global_accuracy)?;
        Ok(())
    }

    pub fn task(&self, id: &TaskId) -> Option<LearningTask> {
        self.tasks.get(id).map(|state| state.task.as_ref().clone())
    }

    /// All tasks ordered by id.
    pub fn tasks(&self) -> Vec<LearningTask> {
        let mut tasks: Vec<LearningTask> = self
            .tasks
            .iter()
            .map(|entry| entry.task.as_ref().clone())
            .collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        tasks
    }

    pub fn history(&self) -> Vec<NetworkUpdate> {
        self.history.read().clone()
    }

    pub fn history_for(&self, task_id: &TaskId) -> Vec<NetworkUpdate> {
        self.history
            .read()
            .iter()
            .filter(|update| &update.task_id == task_id)
            .cloned()
            .collect()
    }

    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.registry.node(id)
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.registry.snapshot()
    }

    pub fn network_value(&self) -> NetworkValue {
        self.effects.network_value(&self.registry.snapshot())
    }

    pub fn emergence_potential(&self) -> EmergencePotential {
        self.effects.emergence_potential(&self.history.read())
    }

    /// Compare a task's accuracy series against its criteria. Stopping is up
    /// to the caller.
    pub fn convergence_status(&self, task_id: &TaskId) -> FederationResult<ConvergenceStatus> {
        let task = self
            .task(task_id)
            .ok_or_else(|| FederationError::UnknownTask(task_id.clone()))?;
        let history = self.history.read();
        let accuracies = history
            .iter()
            .filter(|update| &update.task_id == task_id)
            .map(|update| update.validation.global_accuracy);
        Ok(ConvergenceStatus::evaluate(&task, accuracies))
    }

    pub fn ecosystem_analytics(&self) -> EcosystemAnalytics {
        let nodes = self.registry.snapshot();
        let history = self.history.read();
        EcosystemAnalytics::compute(&nodes, self.tasks.len(), &history)
    }

    /// Distinct segments with at least one node, for callers building tasks.
    pub fn active_segments(&self) -> BTreeSet<Segment> {
        self.registry
            .snapshot()
            .into_iter()
            .map(|node| node.segment)
            .collect()
    }
}
