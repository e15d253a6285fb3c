use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    aggregation::AggregationKind,
    analytics::EcosystemAnalytics,
    api::ApiResponse,
    coordinator::FederatedCoordinator,
    config::FederationConfig,
    error::FederationResult,
    network_effect::{EmergencePotential, NetworkValue},
    node::NodeId,
    registry::RegistrationResult,
    segment::{LearningMode, Segment},
    task::{TaskId, TaskSpec},
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskCreated {
    pub task_id: TaskId,
    pub eligible_nodes: usize,
    pub architecture: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub update_id: String,
    pub participating_nodes: Vec<NodeId>,
    pub network_effect_score: f64,
    pub global_accuracy: f64,
    pub per_node_improvement: BTreeMap<NodeId, f64>,
    pub aggregation_strategy: AggregationKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkReport {
    pub value: NetworkValue,
    pub emergence: EmergencePotential,
}

/// String-keyed façade over a [`FederatedCoordinator`] for service layers
/// that receive segment and mode names as text.
pub struct LearningNetworkOrchestrator {
    coordinator: FederatedCoordinator,
}

impl LearningNetworkOrchestrator {
    pub fn new(config: FederationConfig) -> FederationResult<Self> {
        Ok(Self::from_coordinator(FederatedCoordinator::new(config)?))
    }

    pub fn from_coordinator(coordinator: FederatedCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &FederatedCoordinator {
        &self.coordinator
    }

    pub fn register_node(
        &self,
        node_id: &str,
        segment: &str,
        capabilities: &[&str],
        modes: &[&str],
    ) -> FederationResult<RegistrationResult> {
        let segment: Segment = segment.parse()?;
        let modes = modes
            .iter()
            .map(|mode| mode.parse::<LearningMode>())
            .collect::<FederationResult<Vec<_>>>()?;
        self.coordinator.register_node(
            node_id,
            segment,
            capabilities.iter().map(|c| (*c).to_owned()),
            modes,
        )
    }

    pub fn create_task(
        &self,
        mode: &str,
        objective: &str,
        segments: &[&str],
    ) -> FederationResult<TaskCreated> {
        let mode: LearningMode = mode.parse()?;
        let segments = segments
            .iter()
            .map(|segment| segment.parse::<Segment>())
            .collect::<FederationResult<Vec<_>>>()?;
        self.create_task_with(TaskSpec::new(mode, objective, segments))
    }

    pub fn create_task_with(&self, spec: TaskSpec) -> FederationResult<TaskCreated> {
        let task = self.coordinator.create_task_with(spec)?;
        Ok(TaskCreated {
            eligible_nodes: self.coordinator.eligible_count(&task),
            task_id: task.id,
            architecture: task.architecture,
        })
    }

    pub fn execute_round(&self, task_id: &str) -> FederationResult<RoundReport> {
        let update = self.coordinator.execute_round(&TaskId::from(task_id))?;
        Ok(RoundReport {
            update_id: update.id.0,
            participating_nodes: update.source_nodes,
            network_effect_score: update.network_effect_score,
            global_accuracy: update.validation.global_accuracy,
            per_node_improvement: update.improvements,
            aggregation_strategy: update.strategy,
        })
    }

    /// [`Self::execute_round`] wrapped in the `{ "error": ... }` envelope.
    pub fn execute_round_response(&self, task_id: &str) -> ApiResponse<RoundReport> {
        self.execute_round(task_id).into()
    }

    pub fn ecosystem_analytics(&self) -> EcosystemAnalytics {
        self.coordinator.ecosystem_analytics()
    }

    pub fn network_report(&self) -> NetworkReport {
        NetworkReport {
            value: self.coordinator.network_value(),
            emergence: self.coordinator.emergence_potential(),
        }
    }
}
