use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{aggregation::AggregationKind, node::NodeId, task::TaskId, tensor::ParameterBundle};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UpdateId(pub String);

impl UpdateId {
    pub fn for_sequence(sequence: u64) -> Self {
        Self(format!("update-{sequence:06}"))
    }
}

impl fmt::Display for UpdateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResults {
    /// Mean accuracy of the participants after the update was applied.
    pub global_accuracy: f64,
    pub mean_improvement: f64,
    pub participant_network_value: f64,
}

/// Registry-wide topology at the moment a round was recorded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub node_count: usize,
    pub connection_count: usize,
    pub connection_density: f64,
    pub active_segments: usize,
}

/// One executed round. Append-only: records are never edited once pushed
/// to the coordinator history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NetworkUpdate {
    pub id: UpdateId,
    /// Strictly increasing across the whole coordinator history.
    pub sequence: u64,
    pub task_id: TaskId,
    pub source_nodes: Vec<NodeId>,
    pub aggregated: ParameterBundle,
    pub improvements: BTreeMap<NodeId, f64>,
    pub network_effect_score: f64,
    pub validation: ValidationResults,
    pub strategy: AggregationKind,
    pub topology: TopologySnapshot,
    pub created_at: DateTime<Utc>,
}
