use thiserror::Error;
use voltmesh_telemetry::TelemetryError;

use crate::{node::NodeId, task::TaskId};

pub type FederationResult<T> = Result<T, FederationError>;

#[derive(Debug, Error)]
pub enum FederationError {
    #[error("node {0} is already registered")]
    DuplicateNode(NodeId),
    #[error("unknown segment `{0}`")]
    UnknownSegment(String),
    #[error("unknown learning mode `{0}`")]
    UnknownMode(String),
    #[error("unknown aggregation strategy `{0}`")]
    UnknownStrategy(String),
    #[error("unknown task {0}")]
    UnknownTask(TaskId),
    #[error("a learning task needs at least one eligible segment")]
    EmptySegments,
    #[error("task {task_id} has {eligible} eligible node(s); a round needs at least 2")]
    InsufficientNodes { task_id: TaskId, eligible: usize },
    /// Aggregation produced parameters that no longer match the participants.
    /// Nothing is written when this is returned.
    #[error("aggregated tensor `{tensor}` has shape {found:?}, expected {expected:?}")]
    AggregationShapeMismatch {
        tensor: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("configuration invalid: {0}")]
    InvalidConfig(String),
    /// The participants' network value left the domain of `ln(1 + v)`.
    /// Nothing is written when this is returned.
    #[error("round of task {task_id} produced a non-finite network effect (participant value {participant_value})")]
    NonFiniteNetworkEffect {
        task_id: TaskId,
        participant_value: f64,
    },
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}
