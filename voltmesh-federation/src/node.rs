use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    segment::{LearningMode, Segment},
    tensor::ParameterBundle,
};

pub const ACCURACY: &str = "accuracy";
pub const LOSS: &str = "loss";
pub const EFFICIENCY: &str = "efficiency";

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub segment: Segment,
    pub capabilities: BTreeSet<String>,
    pub modes: BTreeSet<LearningMode>,
    pub parameters: ParameterBundle,
    pub metrics: BTreeMap<String, f64>,
    /// Undirected: if `a` lists `b`, `b` lists `a`.
    pub neighbors: BTreeSet<NodeId>,
    pub contribution_score: f64,
    pub reputation: f64,
    pub registered_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl Node {
    pub fn baseline_metrics() -> BTreeMap<String, f64> {
        BTreeMap::from([
            (ACCURACY.to_owned(), 0.70),
            (LOSS.to_owned(), 0.35),
            (EFFICIENCY.to_owned(), 0.80),
        ])
    }

    pub fn accuracy(&self) -> f64 {
        self.metrics.get(ACCURACY).copied().unwrap_or(0.0)
    }

    pub fn connection_count(&self) -> usize {
        self.neighbors.len()
    }

    pub fn supports(&self, mode: LearningMode) -> bool {
        self.modes.contains(&mode)
    }
}
