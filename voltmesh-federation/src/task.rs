use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use voltmesh_privacy::PrivacyTier;

use crate::{
    aggregation::AggregationStrategy,
    segment::{LearningMode, Segment},
};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Thresholds recorded with a task. The coordinator never stops a task on
/// its own; callers read [`ConvergenceStatus`] and decide.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConvergenceCriteria {
    pub min_improvement: f64,
    pub patience: u32,
    pub max_rounds: u32,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            min_improvement: 0.001,
            patience: 5,
            max_rounds: 100,
        }
    }
}

/// Everything a caller may specify when creating a task.
#[derive(Clone, Debug, PartialEq)]
pub struct TaskSpec {
    pub mode: LearningMode,
    pub objective: String,
    pub segments: BTreeSet<Segment>,
    pub architecture: Option<Value>,
    pub convergence: ConvergenceCriteria,
    pub privacy_requirement: PrivacyTier,
    pub strategy: Option<AggregationStrategy>,
}

impl TaskSpec {
    pub fn new(
        mode: LearningMode,
        objective: impl Into<String>,
        segments: impl IntoIterator<Item = Segment>,
    ) -> Self {
        Self {
            mode,
            objective: objective.into(),
            segments: segments.into_iter().collect(),
            architecture: None,
            convergence: ConvergenceCriteria::default(),
            privacy_requirement: PrivacyTier::Differential,
            strategy: None,
        }
    }

    pub fn with_architecture(mut self, architecture: Value) -> Self {
        self.architecture = Some(architecture);
        self
    }

    pub fn with_convergence(mut self, convergence: ConvergenceCriteria) -> Self {
        self.convergence = convergence;
        self
    }

    pub fn with_privacy(mut self, tier: PrivacyTier) -> Self {
        self.privacy_requirement = tier;
        self
    }

    pub fn with_strategy(mut self, strategy: AggregationStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearningTask {
    pub id: TaskId,
    pub mode: LearningMode,
    pub objective: String,
    pub segments: BTreeSet<Segment>,
    /// Opaque to the coordinator; kept for bookkeeping only.
    pub architecture: Value,
    pub convergence: ConvergenceCriteria,
    pub privacy_requirement: PrivacyTier,
    pub strategy: AggregationStrategy,
    pub created_at: DateTime<Utc>,
}

impl LearningTask {
    pub fn admits(&self, segment: Segment, modes: &BTreeSet<LearningMode>) -> bool {
        self.segments.contains(&segment) && modes.contains(&self.mode)
    }
}

/// Progress of a task measured against its [`ConvergenceCriteria`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConvergenceStatus {
    pub task_id: TaskId,
    pub rounds_completed: u32,
    pub best_accuracy: f64,
    pub rounds_since_improvement: u32,
    pub max_rounds_reached: bool,
    pub patience_exhausted: bool,
}

impl ConvergenceStatus {
    /// Walk a task's accuracy series in round order.
    pub fn evaluate(task: &LearningTask, accuracies: impl IntoIterator<Item = f64>) -> Self {
        let mut rounds_completed = 0u32;
        let mut best = f64::NEG_INFINITY;
        let mut since_improvement = 0u32;
        for accuracy in accuracies {
            rounds_completed += 1;
            if rounds_completed == 1 || accuracy - best >= task.convergence.min_improvement {
                since_improvement = 0;
            } else {
                since_improvement += 1;
            }
            best = best.max(accuracy);
        }
        Self {
            task_id: task.id.clone(),
            rounds_completed,
            best_accuracy: if rounds_completed == 0 { 0.0 } else { best },
            rounds_since_improvement: since_improvement,
            max_rounds_reached: rounds_completed >= task.convergence.max_rounds,
            patience_exhausted: since_improvement >= task.convergence.patience,
        }
    }

    pub fn should_stop(&self) -> bool {
        self.max_rounds_reached || self.patience_exhausted
    }
}
