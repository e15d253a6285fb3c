use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{FederationError, FederationResult},
    node::NodeId,
    tensor::ParameterBundle,
};

/// A participant's delta plus the state the weighting strategies read.
#[derive(Clone, Copy, Debug)]
pub struct Contribution<'a> {
    pub node_id: &'a NodeId,
    pub delta: &'a ParameterBundle,
    pub reputation: f64,
    pub contribution_score: f64,
}

/// Combines many deltas into one bundle shaped like every input.
pub trait Aggregator: Send + Sync {
    fn kind(&self) -> AggregationKind;

    fn aggregate(&self, contributions: &[Contribution<'_>]) -> FederationResult<ParameterBundle>;
}

/// Concrete algorithms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationKind {
    SimpleAverage,
    ReputationWeighted,
    VarianceReduced,
}

impl AggregationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationKind::SimpleAverage => "simple-average",
            AggregationKind::ReputationWeighted => "reputation-weighted",
            AggregationKind::VarianceReduced => "variance-reduced",
        }
    }
}

impl fmt::Display for AggregationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a task or coordinator is configured with. `Adaptive` is resolved to
/// a concrete [`AggregationKind`] by [`AdaptivePolicy::choose`] at round time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AggregationStrategy {
    SimpleAverage,
    ReputationWeighted,
    VarianceReduced,
    #[default]
    Adaptive,
}

impl AggregationStrategy {
    pub const ALL: [AggregationStrategy; 4] = [
        AggregationStrategy::SimpleAverage,
        AggregationStrategy::ReputationWeighted,
        AggregationStrategy::VarianceReduced,
        AggregationStrategy::Adaptive,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationStrategy::SimpleAverage => "simple-average",
            AggregationStrategy::ReputationWeighted => "reputation-weighted",
            AggregationStrategy::VarianceReduced => "variance-reduced",
            AggregationStrategy::Adaptive => "adaptive",
        }
    }

    pub fn resolve(
        self,
        policy: &AdaptivePolicy,
        contributions: &[Contribution<'_>],
    ) -> AggregationKind {
        match self {
            AggregationStrategy::SimpleAverage => AggregationKind::SimpleAverage,
            AggregationStrategy::ReputationWeighted => AggregationKind::ReputationWeighted,
            AggregationStrategy::VarianceReduced => AggregationKind::VarianceReduced,
            AggregationStrategy::Adaptive => policy.choose(contributions),
        }
    }
}

impl fmt::Display for AggregationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationStrategy {
    type Err = FederationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        AggregationStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == normalized)
            .ok_or_else(|| FederationError::UnknownStrategy(s.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdaptivePolicy {
    /// Below this many participants a plain mean is used.
    pub min_participants: usize,
    /// Mean reputation above which variance reduction kicks in.
    pub reputation_cutoff: f64,
}

impl Default for AdaptivePolicy {
    fn default() -> Self {
        Self {
            min_participants: 5,
            reputation_cutoff: 1.2,
        }
    }
}

impl AdaptivePolicy {
    pub fn choose(&self, contributions: &[Contribution<'_>]) -> AggregationKind {
        if contributions.len() < self.min_participants {
            return AggregationKind::SimpleAverage;
        }
        let mean_reputation = contributions.iter().map(|c| c.reputation).sum::<f64>()
            / contributions.len() as f64;
        if mean_reputation > self.reputation_cutoff {
            AggregationKind::VarianceReduced
        } else {
            AggregationKind::ReputationWeighted
        }
    }
}

pub fn aggregator_for(kind: AggregationKind, variance_damping: f64) -> Box<dyn Aggregator> {
    match kind {
        AggregationKind::SimpleAverage => Box::new(SimpleAverage),
        AggregationKind::ReputationWeighted => Box::new(ReputationWeighted),
        AggregationKind::VarianceReduced => Box::new(VarianceReduced {
            damping: variance_damping,
        }),
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleAverage;

impl Aggregator for SimpleAverage {
    fn kind(&self) -> AggregationKind {
        AggregationKind::SimpleAverage
    }

    fn aggregate(&self, contributions: &[Contribution<'_>]) -> FederationResult<ParameterBundle> {
        combine(contributions, mean)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ReputationWeighted;

impl ReputationWeighted {
    /// `reputation × (1 + contribution_score)`, normalised to sum to one.
    /// Falls back to uniform weights when every raw weight is zero.
    pub fn weights(contributions: &[Contribution<'_>]) -> Vec<f64> {
        let raw: Vec<f64> = contributions
            .iter()
            .map(|c| (c.reputation * (1.0 + c.contribution_score)).max(0.0))
            .collect();
        let total: f64 = raw.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            let uniform = 1.0 / contributions.len().max(1) as f64;
            return vec![uniform; contributions.len()];
        }
        raw.into_iter().map(|w| w / total).collect()
    }
}

impl Aggregator for ReputationWeighted {
    fn kind(&self) -> AggregationKind {
        AggregationKind::ReputationWeighted
    }

    fn aggregate(&self, contributions: &[Contribution<'_>]) -> FederationResult<ParameterBundle> {
        let weights = Self::weights(contributions);
        combine(contributions, |column| {
            column.iter().zip(&weights).map(|(v, w)| v * w).sum()
        })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct VarianceReduced {
    pub damping: f64,
}

impl Default for VarianceReduced {
    fn default() -> Self {
        Self { damping: 0.1 }
    }
}

impl Aggregator for VarianceReduced {
    fn kind(&self) -> AggregationKind {
        AggregationKind::VarianceReduced
    }

    /// Mean pulled toward zero by `min(|mean|, damping × variance)`; the
    /// adjustment never flips the sign.
    fn aggregate(&self, contributions: &[Contribution<'_>]) -> FederationResult<ParameterBundle> {
        combine(contributions, |column| {
            let m = mean(column);
            let variance = column.iter().map(|v| (v - m).powi(2)).sum::<f64>() / column.len() as f64;
            m - m.signum() * m.abs().min(self.damping * variance)
        })
    }
}

fn mean(column: &[f64]) -> f64 {
    column.iter().sum::<f64>() / column.len() as f64
}

/// Validate that every delta shares the first delta's shapes, then reduce
/// each parameter position across participants with `reduce`.
fn combine(
    contributions: &[Contribution<'_>],
    reduce: impl Fn(&[f64]) -> f64,
) -> FederationResult<ParameterBundle> {
    let Some(first) = contributions.first() else {
        return Ok(ParameterBundle::new());
    };
    for contribution in &contributions[1..] {
        first.delta.ensure_same_shape(contribution.delta)?;
    }
    let mut column = Vec::with_capacity(contributions.len());
    Ok(first.delta.map_like(|name, idx| {
        column.clear();
        column.extend(contributions.iter().map(|c| {
            c.delta
                .get(name)
                .map(|tensor| tensor.values()[idx])
                .unwrap_or(0.0)
        }));
        reduce(&column)
    }))
}
